//! Request orchestration: mode, input, parameters, seed, dispatch

use image::RgbImage;
use tracing::{debug, info};

use crate::backend::PipelineRegistry;
use crate::config::Settings;
use crate::error::{AppError, Result};
use crate::gateway::dispatcher::{Dispatcher, GenerationResult};
use crate::gateway::input::{ImageSource, InputAcquirer};
use crate::gateway::mode::{resolve_mode, Mode};
use crate::gateway::params::{resolve_params, ParameterDefaults, PartialParams};
use crate::gateway::seed::derive_seed;

/// Canonical request every endpoint adapter produces
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationRequest {
    /// Uploaded image; takes precedence over `image_url`
    pub image_bytes: Option<Vec<u8>>,
    pub image_url: Option<String>,
    /// Sent as `Authorization: Bearer` when fetching `image_url`
    pub bearer_token: Option<String>,
    pub prompt: Option<String>,
    pub seed: Option<u64>,
    pub params: PartialParams,
    pub batch_index: u32,
}

impl GenerationRequest {
    /// Empty uploads and empty URLs count as absent
    pub fn image_source(&self) -> ImageSource<'_> {
        if let Some(bytes) = self.image_bytes.as_deref().filter(|b| !b.is_empty()) {
            return ImageSource::Upload(bytes);
        }
        match self.image_url.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
            Some(url) => ImageSource::Url {
                url,
                bearer_token: self.bearer_token.as_deref().filter(|t| !t.is_empty()),
            },
            None => ImageSource::Absent,
        }
    }

    /// Empty prompts count as absent
    pub fn prompt(&self) -> Option<&str> {
        self.prompt.as_deref().filter(|p| !p.is_empty())
    }

    /// Mode this request runs in; invalid when it has neither image nor prompt
    pub fn mode(&self) -> Result<Mode> {
        resolve_mode(self.image_source().is_present(), self.prompt().is_some())
            .ok_or_else(|| AppError::InvalidRequest("Provide an input image, a prompt, or both".to_string()))
    }
}

/// A request whose mode is known and whose source image is decoded
pub struct PreparedRequest<'r> {
    request: &'r GenerationRequest,
    mode: Mode,
    image: Option<RgbImage>,
}

impl PreparedRequest<'_> {
    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn source_dimensions(&self) -> Option<(u32, u32)> {
        self.image.as_ref().map(|image| image.dimensions())
    }
}

/// Runs canonical requests through the pipelines. Holds no per-request state.
pub struct Orchestrator {
    acquirer: InputAcquirer,
    dispatcher: Dispatcher,
    defaults: ParameterDefaults,
}

impl Orchestrator {
    pub fn new(pipelines: PipelineRegistry, acquirer: InputAcquirer, defaults: ParameterDefaults) -> Self {
        Self {
            acquirer,
            dispatcher: Dispatcher::new(pipelines),
            defaults,
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(Self::new(
            PipelineRegistry::from_config(&settings.backends)?,
            InputAcquirer::new(&settings.fetch)?,
            ParameterDefaults::from(&settings.generation),
        ))
    }

    /// Resolve the mode and acquire the source image once, for any number of batch items
    pub async fn prepare<'r>(&self, request: &'r GenerationRequest) -> Result<PreparedRequest<'r>> {
        request.params.validate()?;
        let mode = request.mode()?;

        let image = self.acquirer.acquire(&request.image_source()).await?;
        if mode.needs_image() && image.is_none() {
            return Err(AppError::Internal(format!("{} request without a source image", mode)));
        }

        debug!(
            mode = %mode,
            source = ?image.as_ref().map(|i| i.dimensions()),
            "Prepared request"
        );

        Ok(PreparedRequest { request, mode, image })
    }

    /// Generate the item at `batch_index` of a prepared request
    pub async fn generate(&self, prepared: &PreparedRequest<'_>, batch_index: u32) -> Result<GenerationResult> {
        let generator = derive_seed(prepared.request.seed, batch_index);
        let params = resolve_params(
            prepared.mode,
            &prepared.request.params,
            prepared.source_dimensions(),
            generator.seed(),
            &self.defaults,
        );

        info!(
            mode = %params.mode,
            seed = params.seed,
            batch_index,
            width = params.width,
            height = params.height,
            guidance_scale = params.guidance_scale,
            steps = params.num_inference_steps,
            "Dispatching generation"
        );

        self.dispatcher
            .dispatch(&params, prepared.image.as_ref(), prepared.request.prompt(), generator)
            .await
    }

    /// Prepare and generate a single request at its own batch index
    pub async fn run(&self, request: &GenerationRequest) -> Result<GenerationResult> {
        let prepared = self.prepare(request).await?;
        self.generate(&prepared, request.batch_index).await
    }
}
