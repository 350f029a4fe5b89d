//! OpenAI-compatible image endpoints
//!
//! `generations`, `edits` and `variations` share one adapter. Each endpoint
//! serves exactly one mode; a request resolving to another mode is a 400.
//! Bodies are JSON (image as base64 or a data URL) or multipart (image as a
//! file part).

use async_trait::async_trait;
use axum::{
    body::Bytes,
    extract::{FromRequest, Request, State},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::api::extract::{is_json, FormFields};
use crate::config::GenerationConfig;
use crate::error::{AppError, Result};
use crate::gateway::{GenerationRequest, GenerationResult, Mode, PartialParams};
use crate::response::{base64, Delivery, MaterializedOutput, ResponseFormat};
use crate::AppState;

/// The three image endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageEndpoint {
    Generations,
    Edits,
    Variations,
}

impl ImageEndpoint {
    pub fn mode(&self) -> Mode {
        match self {
            ImageEndpoint::Generations => Mode::Generate,
            ImageEndpoint::Edits => Mode::Edit,
            ImageEndpoint::Variations => Mode::Variation,
        }
    }

    fn requirement(&self) -> &'static str {
        match self {
            ImageEndpoint::Generations => "a prompt",
            ImageEndpoint::Edits => "an image and a prompt",
            ImageEndpoint::Variations => "an image",
        }
    }
}

/// JSON body of an image request. Unknown OpenAI fields are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct OpenAiJsonBody {
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub n: Option<u32>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub response_format: Option<String>,
    #[serde(default)]
    pub seed: Option<u64>,
    /// Base64 or data URL
    #[serde(default)]
    pub image: Option<String>,
}

/// Image request fields, independent of the body encoding
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OpenAiImageRequest {
    pub prompt: Option<String>,
    pub n: Option<u32>,
    pub size: Option<String>,
    pub response_format: Option<String>,
    pub seed: Option<u64>,
    pub image: Option<Vec<u8>>,
}

impl OpenAiImageRequest {
    pub fn from_json(body: OpenAiJsonBody) -> Result<Self> {
        let image = body
            .image
            .as_deref()
            .map(str::trim)
            .filter(|image| !image.is_empty())
            .map(decode_image)
            .transpose()?;

        Ok(Self {
            prompt: body.prompt,
            n: body.n,
            size: body.size,
            response_format: body.response_format,
            seed: body.seed,
            image,
        })
    }

    pub fn from_form(mut fields: FormFields) -> Result<Self> {
        let image = match fields.take_file("image") {
            Some(file) => Some(file.data),
            None => fields.text("image").map(decode_image).transpose()?,
        };

        Ok(Self {
            prompt: fields.text("prompt").map(str::to_string),
            n: fields.parse("n")?,
            size: fields.text("size").map(str::to_string),
            response_format: fields.text("response_format").map(str::to_string),
            seed: fields.parse("seed")?,
            image,
        })
    }
}

fn decode_image(encoded: &str) -> Result<Vec<u8>> {
    base64::decode(encoded)
        .map_err(|e| AppError::InvalidRequest(format!("'image' must be base64 or a data URL: {}", e)))
}

/// A validated batch: the canonical request, how many items, and how to deliver them
#[derive(Debug, Clone, PartialEq)]
pub struct ImageJob {
    pub request: GenerationRequest,
    pub n: u32,
    pub delivery: Delivery,
}

/// Parse `"WxH"`. Absent, empty and `"auto"` yield `None`.
pub fn parse_size(size: Option<&str>) -> Result<Option<(u32, u32)>> {
    let size = match size.map(str::trim) {
        None | Some("") => return Ok(None),
        Some(s) if s.eq_ignore_ascii_case("auto") => return Ok(None),
        Some(s) => s,
    };

    let invalid = || AppError::InvalidRequest(format!("Invalid size '{}'. Expected WIDTHxHEIGHT", size));
    let (width, height) = size.split_once(['x', 'X']).ok_or_else(invalid)?;
    let width: u32 = width.trim().parse().map_err(|_| invalid())?;
    let height: u32 = height.trim().parse().map_err(|_| invalid())?;
    if width == 0 || height == 0 {
        return Err(invalid());
    }

    Ok(Some((width, height)))
}

/// Validate an image request against the endpoint it arrived on.
///
/// An absent `size` renders on the configured canvas for every endpoint;
/// `"auto"` leaves edits and variations at the source image size.
pub fn image_job(endpoint: ImageEndpoint, request: OpenAiImageRequest, config: &GenerationConfig) -> Result<ImageJob> {
    let n = request.n.unwrap_or(1);
    if n == 0 || n > config.max_images {
        return Err(AppError::InvalidRequest(format!(
            "'n' must be between 1 and {}, got {}",
            config.max_images, n
        )));
    }

    let delivery = match request.response_format.as_deref() {
        Some(format) => format.parse::<ResponseFormat>()?.into(),
        None => Delivery::External,
    };

    let dimensions = match request.size.as_deref().map(str::trim).filter(|size| !size.is_empty()) {
        Some(size) => parse_size(Some(size))?,
        None => Some((config.canvas_width, config.canvas_height)),
    };

    let (image_bytes, prompt) = match endpoint {
        ImageEndpoint::Generations => (None, request.prompt),
        ImageEndpoint::Edits => (request.image, request.prompt),
        ImageEndpoint::Variations => (request.image, None),
    };

    let generation = GenerationRequest {
        image_bytes,
        prompt,
        seed: request.seed,
        params: PartialParams {
            width: dimensions.map(|(w, _)| w),
            height: dimensions.map(|(_, h)| h),
            ..Default::default()
        },
        ..Default::default()
    };

    let mode = generation.mode()?;
    if mode != endpoint.mode() {
        return Err(AppError::InvalidRequest(format!(
            "This endpoint requires {}; the request resolves to {}",
            endpoint.requirement(),
            mode
        )));
    }

    Ok(ImageJob {
        request: generation,
        n,
        delivery,
    })
}

/// Reply of the image endpoints
#[derive(Debug, Serialize)]
pub struct ImagesResponse {
    pub created: i64,
    pub data: Vec<ImageData>,
}

#[derive(Debug, Serialize)]
pub struct ImageData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub b64_json: Option<String>,
    pub seed: u64,
}

pub fn image_data(result: &GenerationResult, output: MaterializedOutput) -> Result<ImageData> {
    let (url, b64_json) = match output {
        MaterializedOutput::Url(url) => (Some(url), None),
        MaterializedOutput::Base64(b64) => (None, Some(b64)),
        MaterializedOutput::Raw(_) => {
            return Err(AppError::Internal("raw output cannot be embedded in JSON".to_string()));
        }
    };
    Ok(ImageData {
        url,
        b64_json,
        seed: result.seed(),
    })
}

/// JSON or form body of an image request
pub enum ImageRequestBody {
    Json(OpenAiJsonBody),
    Form(FormFields),
}

impl ImageRequestBody {
    pub fn into_request(self) -> Result<OpenAiImageRequest> {
        match self {
            ImageRequestBody::Json(body) => OpenAiImageRequest::from_json(body),
            ImageRequestBody::Form(fields) => OpenAiImageRequest::from_form(fields),
        }
    }
}

#[async_trait]
impl<S> FromRequest<S> for ImageRequestBody
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self> {
        if is_json(&req) {
            let body = Bytes::from_request(req, state)
                .await
                .map_err(|e| AppError::InvalidRequest(e.body_text()))?;
            Ok(ImageRequestBody::Json(serde_json::from_slice(&body)?))
        } else {
            Ok(ImageRequestBody::Form(FormFields::from_request(req, state).await?))
        }
    }
}

pub async fn generations(
    State(state): State<Arc<AppState>>,
    body: ImageRequestBody,
) -> Result<Json<ImagesResponse>> {
    images(&state, ImageEndpoint::Generations, body).await
}

pub async fn edits(State(state): State<Arc<AppState>>, body: ImageRequestBody) -> Result<Json<ImagesResponse>> {
    images(&state, ImageEndpoint::Edits, body).await
}

pub async fn variations(
    State(state): State<Arc<AppState>>,
    body: ImageRequestBody,
) -> Result<Json<ImagesResponse>> {
    images(&state, ImageEndpoint::Variations, body).await
}

async fn images(state: &AppState, endpoint: ImageEndpoint, body: ImageRequestBody) -> Result<Json<ImagesResponse>> {
    let job = image_job(endpoint, body.into_request()?, &state.settings.generation)?;

    // Refuse before generating anything that could not be delivered
    if job.delivery == Delivery::External && !state.materializer.external_available() {
        return Err(AppError::ArtifactStore(
            "response_format 'url' requires an artifact store; request 'b64_json' instead".to_string(),
        ));
    }

    let prepared = state.orchestrator.prepare(&job.request).await?;
    info!(mode = %prepared.mode(), n = job.n, "Running image batch");

    let mut data = Vec::with_capacity(job.n as usize);
    for batch_index in 0..job.n {
        let result = state.orchestrator.generate(&prepared, batch_index).await?;
        let output = state.materializer.materialize(&result, job.delivery).await?;
        data.push(image_data(&result, output)?);
    }

    Ok(Json(ImagesResponse {
        created: Utc::now().timestamp(),
        data,
    }))
}
