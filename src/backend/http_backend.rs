//! HTTP model worker client

use async_trait::async_trait;
use image::RgbImage;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::debug;

use crate::backend::traits::{Conditioning, ImageBackend, ModelInfo, PriorBackend, RenderRequest};
use crate::config::{BackendConfig, LoraConfig};
use crate::error::{AppError, Result};
use crate::response::{base64, png};

/// Backend reached over HTTP. Requests rotate over the configured endpoints.
pub struct HttpBackend {
    name: String,
    client: Client,
    endpoints: Vec<String>,
    model: ModelInfo,
    next_endpoint: AtomicUsize,
}

/// Body of `POST {endpoint}/render`
#[derive(Debug, Serialize)]
struct ApiRenderRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    prompt: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    conditioning: Option<&'a Conditioning>,
    seed: u64,
    guidance_scale: f32,
    num_inference_steps: u32,
    width: u32,
    height: u32,
    base_model: &'a str,
    loras: &'a [LoraConfig],
}

#[derive(Debug, Deserialize)]
struct ApiRenderResponse {
    #[serde(default, alias = "b64_json")]
    image: Option<String>,
}

/// Body of `POST {endpoint}/prior`
#[derive(Debug, Serialize)]
struct ApiPriorRequest<'a> {
    image: String,
    base_model: &'a str,
}

#[derive(Debug, Deserialize)]
struct ApiPriorResponse {
    conditioning: Conditioning,
}

impl HttpBackend {
    /// Create a new HTTP backend from configuration
    pub fn new(name: impl Into<String>, config: &BackendConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        let endpoints: Vec<String> = config
            .endpoints
            .iter()
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .collect();

        Ok(Self {
            name: name.into(),
            client,
            endpoints,
            model: ModelInfo::from(config),
            next_endpoint: AtomicUsize::new(0),
        })
    }

    /// Round-robin over endpoints
    fn endpoint(&self) -> Result<&str> {
        if self.endpoints.is_empty() {
            return Err(AppError::Backend(format!("Backend '{}' has no endpoints", self.name)));
        }
        let index = self.next_endpoint.fetch_add(1, Ordering::Relaxed) % self.endpoints.len();
        Ok(&self.endpoints[index])
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let endpoint = self.endpoint()?;
        let url = format!("{}{}", endpoint, path);

        debug!(backend = %self.name, endpoint = %endpoint, path = %path, "Sending backend request");

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::Backend(format!("Request to {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Backend(format!("Backend returned {}: {}", status, body)));
        }

        response
            .json::<R>()
            .await
            .map_err(|e| AppError::Backend(format!("Failed to parse response from {}: {}", url, e)))
    }
}

fn encode_image(image: &RgbImage) -> Result<String> {
    Ok(base64::encode(&png::encode(image)?))
}

fn decode_image(encoded: &str) -> Result<RgbImage> {
    let bytes = base64::decode(encoded)
        .map_err(|e| AppError::Backend(format!("Backend returned invalid image data: {}", e)))?;
    png::decode(&bytes).map_err(|e| AppError::Backend(format!("Backend returned an undecodable image: {}", e)))
}

#[async_trait]
impl ImageBackend for HttpBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &ModelInfo {
        &self.model
    }

    async fn render(&self, request: RenderRequest<'_>) -> Result<RgbImage> {
        let api_request = ApiRenderRequest {
            prompt: request.prompt,
            image: request.image.map(encode_image).transpose()?,
            conditioning: request.conditioning,
            seed: request.generator.seed(),
            guidance_scale: request.guidance_scale,
            num_inference_steps: request.num_inference_steps,
            width: request.width,
            height: request.height,
            base_model: &self.model.base_model,
            loras: &self.model.loras,
        };

        let response: ApiRenderResponse = self.post("/render", &api_request).await?;
        let encoded = response
            .image
            .ok_or_else(|| AppError::Backend(format!("Backend '{}' returned no image", self.name)))?;

        decode_image(&encoded)
    }
}

#[async_trait]
impl PriorBackend for HttpBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &ModelInfo {
        &self.model
    }

    async fn condition(&self, image: &RgbImage) -> Result<Conditioning> {
        let api_request = ApiPriorRequest {
            image: encode_image(image)?,
            base_model: &self.model.base_model,
        };
        let response: ApiPriorResponse = self.post("/prior", &api_request).await?;
        Ok(response.conditioning)
    }
}
