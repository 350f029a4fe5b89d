//! Client for the artifact store that hosts URL-delivered images

use reqwest::{
    multipart::{Form, Part},
    Client,
};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use crate::config::ArtifactStoreConfig;
use crate::error::{AppError, Result};
use crate::response::png;

/// Reply of `POST /upload`
#[derive(Debug, Clone, Deserialize)]
pub struct UploadReceipt {
    /// Server-relative location, e.g. `/i/<id>.png`
    pub url: String,
}

pub struct ArtifactStoreClient {
    base_url: String,
    client: Client,
}

impl ArtifactStoreClient {
    /// `None` when no store is configured
    pub fn from_config(config: &ArtifactStoreConfig) -> Result<Option<Self>> {
        let Some(base_url) = config.base_url.as_deref().map(str::trim).filter(|u| !u.is_empty()) else {
            return Ok(None);
        };

        let mut builder = Client::builder().danger_accept_invalid_certs(config.accept_invalid_certs);
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Some(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Upload bytes under a suggested file name
    pub async fn upload(&self, data: Vec<u8>, suggested_name: &str, media_type: &str) -> Result<UploadReceipt> {
        let url = format!("{}/upload", self.base_url);
        let part = Part::bytes(data)
            .file_name(suggested_name.to_string())
            .mime_str(media_type)
            .map_err(|e| AppError::Internal(format!("Invalid media type {}: {}", media_type, e)))?;

        let response = self
            .client
            .post(&url)
            .multipart(Form::new().part("file", part))
            .send()
            .await
            .map_err(|e| AppError::ArtifactStore(format!("Upload to {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ArtifactStore(format!("Artifact store returned {}: {}", status, body)));
        }

        response
            .json::<UploadReceipt>()
            .await
            .map_err(|e| AppError::ArtifactStore(format!("Unexpected upload reply: {}", e)))
    }

    /// Upload a PNG and return its fully-qualified URL
    pub async fn publish_png(&self, data: Vec<u8>) -> Result<String> {
        let name = format!("{}.png", Uuid::new_v4());
        let receipt = self.upload(data, &name, png::MEDIA_TYPE).await?;
        let url = self.qualify(&receipt.url);
        debug!(url = %url, "Published artifact");
        Ok(url)
    }

    fn qualify(&self, location: &str) -> String {
        if location.starts_with("http://") || location.starts_with("https://") {
            location.to_string()
        } else if location.starts_with('/') {
            format!("{}{}", self.base_url, location)
        } else {
            format!("{}/{}", self.base_url, location)
        }
    }
}
