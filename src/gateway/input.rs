//! Source image acquisition from uploads or remote URLs

use image::RgbImage;
use reqwest::{header::AUTHORIZATION, Client};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::FetchConfig;
use crate::error::{AppError, Result};
use crate::response::png;

/// Where the source image of a request comes from
#[derive(Debug, Clone, PartialEq)]
pub enum ImageSource<'a> {
    Upload(&'a [u8]),
    Url {
        url: &'a str,
        bearer_token: Option<&'a str>,
    },
    Absent,
}

impl ImageSource<'_> {
    pub fn is_present(&self) -> bool {
        !matches!(self, ImageSource::Absent)
    }
}

/// Fetches and decodes source images
pub struct InputAcquirer {
    client: Client,
}

impl InputAcquirer {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        if config.accept_invalid_certs {
            warn!("TLS certificate verification is disabled for input image fetches");
        }

        let mut builder = Client::builder().danger_accept_invalid_certs(config.accept_invalid_certs);
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// Decoded RGB image, or `None` when the request carries no image
    pub async fn acquire(&self, source: &ImageSource<'_>) -> Result<Option<RgbImage>> {
        match source {
            ImageSource::Upload(bytes) => png::decode(bytes)
                .map(Some)
                .map_err(|e| AppError::InvalidImage(e.to_string())),
            ImageSource::Url { url, bearer_token } => self.fetch(url, *bearer_token).await.map(Some),
            ImageSource::Absent => Ok(None),
        }
    }

    async fn fetch(&self, url: &str, bearer_token: Option<&str>) -> Result<RgbImage> {
        debug!(url = %url, authenticated = bearer_token.is_some(), "Fetching input image");

        let mut request = self.client.get(url);
        if let Some(token) = bearer_token {
            request = request.header(AUTHORIZATION, format!("Bearer {}", token));
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::ImageFetch(format!("{}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::ImageFetch(format!("{} returned {}", url, status)));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| AppError::ImageFetch(format!("{}: {}", url, e)))?;

        png::decode(&body).map_err(|e| AppError::ImageFetch(format!("{} is not a decodable image: {}", url, e)))
    }
}
