//! Parameter resolution with per-mode defaults

use serde::{Deserialize, Serialize};

use crate::config::{GenerationConfig, ModeDefaults};
use crate::error::{AppError, Result};
use crate::gateway::mode::Mode;

/// Caller-supplied sampling parameters. `None` means unset; zero is a real value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialParams {
    pub guidance_scale: Option<f32>,
    pub num_inference_steps: Option<u32>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Fully resolved parameters for one generation
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResolvedParameters {
    pub mode: Mode,
    pub guidance_scale: f32,
    pub num_inference_steps: u32,
    pub width: u32,
    pub height: u32,
    pub seed: u64,
}

/// Default table consulted when a caller leaves a field unset
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterDefaults {
    pub generate: ModeDefaults,
    pub edit: ModeDefaults,
    pub variation: ModeDefaults,
    pub canvas: (u32, u32),
}

impl ParameterDefaults {
    pub fn for_mode(&self, mode: Mode) -> ModeDefaults {
        match mode {
            Mode::Generate => self.generate,
            Mode::Edit => self.edit,
            Mode::Variation => self.variation,
        }
    }
}

impl From<&GenerationConfig> for ParameterDefaults {
    fn from(config: &GenerationConfig) -> Self {
        Self {
            generate: config.generate,
            edit: config.edit,
            variation: config.variation,
            canvas: (config.canvas_width, config.canvas_height),
        }
    }
}

impl Default for ParameterDefaults {
    fn default() -> Self {
        Self::from(&GenerationConfig::default())
    }
}

impl PartialParams {
    /// Explicit zero dimensions are rejected rather than replaced.
    pub fn validate(&self) -> Result<()> {
        if self.width == Some(0) || self.height == Some(0) {
            return Err(AppError::InvalidRequest("width and height must be positive".to_string()));
        }
        if let Some(guidance) = self.guidance_scale {
            if !guidance.is_finite() {
                return Err(AppError::InvalidRequest("guidance_scale must be a finite number".to_string()));
            }
        }
        Ok(())
    }
}

/// Fill unset fields. Edit and variation take missing dimensions from the source
/// image; generate uses the fixed canvas.
pub fn resolve_params(
    mode: Mode,
    requested: &PartialParams,
    source_dimensions: Option<(u32, u32)>,
    seed: u64,
    defaults: &ParameterDefaults,
) -> ResolvedParameters {
    let mode_defaults = defaults.for_mode(mode);
    let (default_width, default_height) = match (mode, source_dimensions) {
        (Mode::Edit | Mode::Variation, Some(dimensions)) => dimensions,
        _ => defaults.canvas,
    };

    ResolvedParameters {
        mode,
        guidance_scale: requested.guidance_scale.unwrap_or(mode_defaults.guidance_scale),
        num_inference_steps: requested
            .num_inference_steps
            .unwrap_or(mode_defaults.num_inference_steps),
        width: requested.width.unwrap_or(default_width),
        height: requested.height.unwrap_or(default_height),
        seed,
    }
}
