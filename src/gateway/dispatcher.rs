//! Routes resolved requests to the backend serving their mode

use image::RgbImage;
use tracing::{debug, info};

use crate::backend::traits::{Conditioning, ModelInfo, RenderRequest};
use crate::backend::PipelineRegistry;
use crate::error::{AppError, Result};
use crate::gateway::mode::Mode;
use crate::gateway::params::ResolvedParameters;
use crate::gateway::seed::GeneratorState;

/// One generated image with everything needed to report it
#[derive(Debug, Clone)]
pub struct GenerationResult {
    pub image: RgbImage,
    pub params: ResolvedParameters,
    pub model: ModelInfo,
    /// Model that produced the variation conditioning
    pub prior_model: Option<String>,
}

impl GenerationResult {
    pub fn seed(&self) -> u64 {
        self.params.seed
    }

    pub fn mode(&self) -> Mode {
        self.params.mode
    }
}

/// Invokes exactly one backend path per call. Failures propagate; nothing is retried.
pub struct Dispatcher {
    pipelines: PipelineRegistry,
}

impl Dispatcher {
    pub fn new(pipelines: PipelineRegistry) -> Self {
        Self { pipelines }
    }

    pub async fn dispatch(
        &self,
        params: &ResolvedParameters,
        image: Option<&RgbImage>,
        prompt: Option<&str>,
        generator: GeneratorState,
    ) -> Result<GenerationResult> {
        let (backend, output, prior_model) = match params.mode {
            Mode::Generate => {
                let backend = &self.pipelines.generate;
                (backend, backend.render(render_request(params, generator, prompt, None, None)).await?, None)
            }
            Mode::Edit => {
                let source = require_image(image, Mode::Edit)?;
                let backend = &self.pipelines.edit;
                (backend, backend.render(render_request(params, generator, prompt, Some(source), None)).await?, None)
            }
            Mode::Variation => {
                let source = require_image(image, Mode::Variation)?;
                let prior = &self.pipelines.prior;
                let conditioning = prior.condition(source).await?;
                debug!(backend = %prior.name(), keys = conditioning.0.len(), "Derived variation conditioning");

                let backend = &self.pipelines.variation;
                let output = backend
                    .render(render_request(params, generator, None, None, Some(&conditioning)))
                    .await?;
                (backend, output, Some(prior.model().base_model.clone()))
            }
        };

        info!(
            mode = %params.mode,
            backend = %backend.name(),
            seed = generator.seed(),
            width = output.width(),
            height = output.height(),
            "Generation finished"
        );

        Ok(GenerationResult {
            image: output,
            params: *params,
            model: backend.model().clone(),
            prior_model,
        })
    }
}

fn render_request<'a>(
    params: &ResolvedParameters,
    generator: GeneratorState,
    prompt: Option<&'a str>,
    image: Option<&'a RgbImage>,
    conditioning: Option<&'a Conditioning>,
) -> RenderRequest<'a> {
    RenderRequest {
        prompt,
        image,
        conditioning,
        generator,
        guidance_scale: params.guidance_scale,
        num_inference_steps: params.num_inference_steps,
        width: params.width,
        height: params.height,
    }
}

fn require_image(image: Option<&RgbImage>, mode: Mode) -> Result<&RgbImage> {
    image.ok_or_else(|| AppError::Internal(format!("{} dispatched without a source image", mode)))
}
