//! Native form endpoints: `/process` and `/process/raw`

use axum::{
    extract::State,
    http::{
        header::{HeaderName, CONTENT_TYPE},
        HeaderValue,
    },
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::api::extract::FormFields;
use crate::config::LoraConfig;
use crate::error::{AppError, Result};
use crate::gateway::{GenerationRequest, GenerationResult, Mode, PartialParams};
use crate::response::{png, Delivery, MaterializedOutput};
use crate::AppState;

pub const SEED_HEADER: &str = "x-seed";
pub const MODE_HEADER: &str = "x-generation-mode";

/// JSON reply of `/process`
#[derive(Debug, Serialize)]
pub struct NativeResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_image_base64: Option<String>,
    pub seed: u64,
    pub mode: Mode,
    pub width: u32,
    pub height: u32,
    pub guidance_scale: f32,
    pub num_inference_steps: u32,
    pub model: ModelReport,
}

#[derive(Debug, Serialize)]
pub struct ModelReport {
    pub base_model: String,
    pub loras: Vec<LoraConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prior_model: Option<String>,
}

/// Build the canonical request from the native form fields
pub fn native_request(mut fields: FormFields) -> Result<GenerationRequest> {
    Ok(GenerationRequest {
        image_bytes: fields.take_file("input_file").map(|file| file.data),
        image_url: fields.text("input_image_url").map(str::to_string),
        bearer_token: fields.text("bearer_token").map(str::to_string),
        prompt: fields.text("prompt").map(str::to_string),
        seed: fields.parse("seed")?,
        params: PartialParams {
            guidance_scale: fields.parse("guidance_scale")?,
            num_inference_steps: fields.parse("num_inference_steps")?,
            width: fields.parse("width")?,
            height: fields.parse("height")?,
        },
        batch_index: 0,
    })
}

pub fn native_response(result: &GenerationResult, output: MaterializedOutput) -> Result<NativeResponse> {
    let (result_image_url, result_image_base64) = match output {
        MaterializedOutput::Url(url) => (Some(url), None),
        MaterializedOutput::Base64(b64) => (None, Some(b64)),
        MaterializedOutput::Raw(_) => {
            return Err(AppError::Internal("raw output cannot be embedded in JSON".to_string()));
        }
    };

    Ok(NativeResponse {
        result_image_url,
        result_image_base64,
        seed: result.seed(),
        mode: result.mode(),
        width: result.params.width,
        height: result.params.height,
        guidance_scale: result.params.guidance_scale,
        num_inference_steps: result.params.num_inference_steps,
        model: ModelReport {
            base_model: result.model.base_model.clone(),
            loras: result.model.loras.clone(),
            prior_model: result.prior_model.clone(),
        },
    })
}

/// PNG body tagged with the seed and mode that produced it
pub fn raw_response(result: &GenerationResult, output: MaterializedOutput) -> Result<Response> {
    let MaterializedOutput::Raw(bytes) = output else {
        return Err(AppError::Internal("expected raw output".to_string()));
    };

    let headers = [
        (CONTENT_TYPE, HeaderValue::from_static(png::MEDIA_TYPE)),
        (HeaderName::from_static(SEED_HEADER), HeaderValue::from(result.seed())),
        (HeaderName::from_static(MODE_HEADER), HeaderValue::from_static(result.mode().as_str())),
    ];
    Ok((headers, bytes).into_response())
}

pub async fn process(State(state): State<Arc<AppState>>, fields: FormFields) -> Result<Json<NativeResponse>> {
    let request = native_request(fields)?;
    let delivery = state.materializer.preferred_delivery();

    let result = state.orchestrator.run(&request).await?;
    let output = state.materializer.materialize(&result, delivery).await?;

    Ok(Json(native_response(&result, output)?))
}

pub async fn process_raw(State(state): State<Arc<AppState>>, fields: FormFields) -> Result<Response> {
    let request = native_request(fields)?;

    let result = state.orchestrator.run(&request).await?;
    let output = state.materializer.materialize(&result, Delivery::Raw).await?;

    raw_response(&result, output)
}
