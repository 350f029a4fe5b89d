//! Common traits and types for generation backends

use async_trait::async_trait;
use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::config::{BackendConfig, LoraConfig};
use crate::error::Result;
use crate::gateway::seed::GeneratorState;

/// Identity of the model a backend serves
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub base_model: String,
    #[serde(default)]
    pub loras: Vec<LoraConfig>,
}

impl From<&BackendConfig> for ModelInfo {
    fn from(config: &BackendConfig) -> Self {
        Self {
            base_model: config.base_model.clone(),
            loras: config.loras.clone(),
        }
    }
}

/// Opaque representation a prior backend derives from a source image
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Conditioning(pub serde_json::Map<String, serde_json::Value>);

/// One call into an image backend.
///
/// Text-to-image sets only `prompt`, edit sets `prompt` and `image`, variation
/// sets only `conditioning`.
#[derive(Debug, Clone, Copy)]
pub struct RenderRequest<'a> {
    pub prompt: Option<&'a str>,
    pub image: Option<&'a RgbImage>,
    pub conditioning: Option<&'a Conditioning>,
    pub generator: GeneratorState,
    pub guidance_scale: f32,
    pub num_inference_steps: u32,
    pub width: u32,
    pub height: u32,
}

/// Image-producing backend.
///
/// Handles are shared across requests; implementations serialize concurrent
/// calls themselves if the underlying model needs it.
#[async_trait]
pub trait ImageBackend: Send + Sync {
    /// Get the backend name
    fn name(&self) -> &str;

    /// Model and adapters this backend runs
    fn model(&self) -> &ModelInfo;

    /// Produce one image. Deterministic for identical generator state and parameters.
    async fn render(&self, request: RenderRequest<'_>) -> Result<RgbImage>;
}

/// Backend turning a source image into conditioning for variations
#[async_trait]
pub trait PriorBackend: Send + Sync {
    fn name(&self) -> &str;

    fn model(&self) -> &ModelInfo;

    async fn condition(&self, image: &RgbImage) -> Result<Conditioning>;
}
