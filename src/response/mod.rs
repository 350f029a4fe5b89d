//! Response handling module - PNG encoding, base64 embedding, and artifact upload

pub mod artifact;
pub mod base64;
pub mod png;

use std::str::FromStr;
use tracing::debug;

use crate::config::ArtifactStoreConfig;
use crate::error::{AppError, Result};
use crate::gateway::GenerationResult;
use artifact::ArtifactStoreClient;

/// OpenAI `response_format` values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    /// Base64 encoded JSON
    Base64Json,
    /// URL to the generated image
    Url,
}

impl FromStr for ResponseFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "b64_json" => Ok(Self::Base64Json),
            "url" => Ok(Self::Url),
            other => Err(AppError::InvalidRequest(format!(
                "Unsupported response_format '{}'. Must be 'url' or 'b64_json'",
                other
            ))),
        }
    }
}

/// How a generated image reaches the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// PNG, base64 encoded, inline in a JSON envelope
    Embedded,
    /// PNG bytes as the response body
    Raw,
    /// PNG uploaded to the artifact store, URL returned
    External,
}

impl From<ResponseFormat> for Delivery {
    fn from(format: ResponseFormat) -> Self {
        match format {
            ResponseFormat::Base64Json => Delivery::Embedded,
            ResponseFormat::Url => Delivery::External,
        }
    }
}

/// Exactly one caller-consumable form of an image
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MaterializedOutput {
    Url(String),
    Base64(String),
    Raw(Vec<u8>),
}

/// Turns generation results into deliverable outputs
pub struct Materializer {
    artifact_store: Option<ArtifactStoreClient>,
}

impl Materializer {
    pub fn new(artifact_store: Option<ArtifactStoreClient>) -> Self {
        Self { artifact_store }
    }

    pub fn from_config(config: &ArtifactStoreConfig) -> Result<Self> {
        Ok(Self::new(ArtifactStoreClient::from_config(config)?))
    }

    pub fn external_available(&self) -> bool {
        self.artifact_store.is_some()
    }

    /// Delivery for callers that did not ask for a particular format
    pub fn preferred_delivery(&self) -> Delivery {
        if self.external_available() {
            Delivery::External
        } else {
            Delivery::Embedded
        }
    }

    pub async fn materialize(&self, result: &GenerationResult, delivery: Delivery) -> Result<MaterializedOutput> {
        match delivery {
            Delivery::External => {
                let store = self.artifact_store.as_ref().ok_or_else(|| {
                    AppError::ArtifactStore("URL delivery requested but no artifact store is configured".to_string())
                })?;
                let encoded = encode(result, delivery)?;
                Ok(MaterializedOutput::Url(store.publish_png(encoded).await?))
            }
            Delivery::Raw => Ok(MaterializedOutput::Raw(encode(result, delivery)?)),
            Delivery::Embedded => Ok(MaterializedOutput::Base64(base64::encode(&encode(result, delivery)?))),
        }
    }
}

fn encode(result: &GenerationResult, delivery: Delivery) -> Result<Vec<u8>> {
    let encoded = png::encode(&result.image)?;
    debug!(
        mode = %result.params.mode,
        seed = result.params.seed,
        bytes = encoded.len(),
        delivery = ?delivery,
        "Materializing output"
    );
    Ok(encoded)
}
