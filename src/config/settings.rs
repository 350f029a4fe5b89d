//! Application settings and configuration management

use crate::error::{AppError, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    pub backends: BackendsConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub artifact_store: ArtifactStoreConfig,
    #[serde(default)]
    pub file_server: FileServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Imaging API server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Upper bound for request bodies, uploads included
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_max_upload_bytes() -> usize {
    32 * 1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

/// One model worker pool per pipeline stage
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendsConfig {
    pub generate: BackendConfig,
    pub edit: BackendConfig,
    pub prior: BackendConfig,
    pub variation: BackendConfig,
}

/// Model worker configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    pub endpoints: Vec<String>,
    /// Model the worker serves, reported alongside results
    pub base_model: String,
    #[serde(default)]
    pub loras: Vec<LoraConfig>,
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,
}

fn default_timeout() -> u64 {
    300_000
}

/// LoRA adapter loaded by a worker
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LoraConfig {
    pub weight_name: String,
    #[serde(default = "default_adapter_weight")]
    pub adapter_weight: f32,
}

fn default_adapter_weight() -> f32 {
    1.0
}

/// Per-mode sampling defaults
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct ModeDefaults {
    pub guidance_scale: f32,
    pub num_inference_steps: u32,
}

/// Request-time defaults and limits
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GenerationConfig {
    #[serde(default = "default_generate_mode")]
    pub generate: ModeDefaults,
    #[serde(default = "default_edit_mode")]
    pub edit: ModeDefaults,
    #[serde(default = "default_variation_mode")]
    pub variation: ModeDefaults,
    /// Canvas used by text-to-image when the caller gives no size
    #[serde(default = "default_canvas")]
    pub canvas_width: u32,
    #[serde(default = "default_canvas")]
    pub canvas_height: u32,
    /// Largest `n` accepted by the OpenAI-compatible endpoints
    #[serde(default = "default_max_images")]
    pub max_images: u32,
}

fn default_generate_mode() -> ModeDefaults {
    ModeDefaults {
        guidance_scale: 3.5,
        num_inference_steps: 8,
    }
}

fn default_edit_mode() -> ModeDefaults {
    ModeDefaults {
        guidance_scale: 2.5,
        num_inference_steps: 8,
    }
}

fn default_variation_mode() -> ModeDefaults {
    ModeDefaults {
        guidance_scale: 2.5,
        num_inference_steps: 8,
    }
}

fn default_canvas() -> u32 {
    1024
}

fn default_max_images() -> u32 {
    10
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            generate: default_generate_mode(),
            edit: default_edit_mode(),
            variation: default_variation_mode(),
            canvas_width: default_canvas(),
            canvas_height: default_canvas(),
            max_images: default_max_images(),
        }
    }
}

/// Outbound fetch of caller-supplied image URLs
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FetchConfig {
    /// Skip TLS certificate verification for image URLs
    #[serde(default)]
    pub accept_invalid_certs: bool,
    /// No timeout when unset
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// Where produced images are uploaded for URL delivery
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ArtifactStoreConfig {
    /// Base address of the artifact store; embedded-only delivery when unset
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub accept_invalid_certs: bool,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// Companion artifact store service
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FileServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_file_server_port")]
    pub port: u16,
    #[serde(default = "default_storage_dir")]
    pub storage_dir: String,
    /// Secret for the `/latest` lookups; every token is refused when unset
    #[serde(default)]
    pub bearer_token: Option<String>,
    /// Prefix for URLs returned by `/latest`; `https://<Host>/` when unset
    #[serde(default)]
    pub public_base_url: Option<String>,
    /// Offset of the zone `updated_at` timestamps are rendered in
    #[serde(default = "default_utc_offset_hours")]
    pub utc_offset_hours: i32,
    /// Files older than this are swept; kept forever when unset
    #[serde(default)]
    pub max_age_secs: Option<u64>,
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_file_server_port() -> u16 {
    8010
}

fn default_storage_dir() -> String {
    "/tmp/imgtmp".to_string()
}

fn default_utc_offset_hours() -> i32 {
    9
}

fn default_sweep_interval() -> u64 {
    600
}

impl Default for FileServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_file_server_port(),
            storage_dir: default_storage_dir(),
            bearer_token: None,
            public_base_url: None,
            utc_offset_hours: default_utc_offset_hours(),
            max_age_secs: None,
            sweep_interval_secs: default_sweep_interval(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Settings {
    /// Load settings from configuration files and environment variables
    pub fn load() -> Result<Self> {
        let path = std::env::var("FLUX_IMAGING_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from_path(path)
    }

    /// Load settings from a specific configuration file path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            // Worker pools, models and LoRAs when nothing overrides them
            .add_source(Config::try_from(&BackendDefaults {
                backends: BackendsConfig::default(),
            })?)
            // Load from configuration file
            .add_source(File::with_name(path.as_ref().to_str().unwrap_or(DEFAULT_CONFIG_PATH)).required(false))
            // Override with environment variables (prefixed with FLUX_IMAGING__)
            .add_source(
                Environment::with_prefix("FLUX_IMAGING")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("backends.generate.endpoints")
                    .with_list_parse_key("backends.edit.endpoints")
                    .with_list_parse_key("backends.prior.endpoints")
                    .with_list_parse_key("backends.variation.endpoints"),
            )
            // Deployment names used by existing installs
            .set_override_option("artifact_store.base_url", non_empty_env("FILE_SERVER"))?
            .set_override_option("file_server.bearer_token", non_empty_env("BEARER_TOKEN"))?
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 || self.file_server.port == 0 {
            return Err(invalid("Server port cannot be 0"));
        }

        for (name, backend) in self.backends.iter() {
            if backend.endpoints.iter().all(|e| e.trim().is_empty()) {
                return Err(invalid(format!("Backend '{}' must have at least one endpoint", name)));
            }
        }

        if self.generation.max_images == 0 {
            return Err(invalid("generation.max_images must be at least 1"));
        }
        if self.generation.canvas_width == 0 || self.generation.canvas_height == 0 {
            return Err(invalid("Canvas dimensions must be positive"));
        }

        if self.file_server.utc_offset_hours.abs() > 23 {
            return Err(invalid(format!(
                "file_server.utc_offset_hours {} is out of range",
                self.file_server.utc_offset_hours
            )));
        }

        if self.file_server.sweep_interval_secs == 0 {
            return Err(invalid("file_server.sweep_interval_secs must be positive"));
        }

        if let Some(base_url) = &self.artifact_store.base_url {
            if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
                return Err(invalid(format!("artifact_store.base_url '{}' must be an http(s) URL", base_url)));
            }
        }

        Ok(())
    }
}

#[derive(Serialize)]
struct BackendDefaults {
    backends: BackendsConfig,
}

/// Unset and blank variables both count as absent
fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn invalid(message: impl Into<String>) -> AppError {
    AppError::Config(config::ConfigError::Message(message.into()))
}

impl BackendsConfig {
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &BackendConfig)> {
        [
            ("generate", &self.generate),
            ("edit", &self.edit),
            ("prior", &self.prior),
            ("variation", &self.variation),
        ]
        .into_iter()
    }
}

impl Default for BackendsConfig {
    fn default() -> Self {
        let turbo = vec![LoraConfig {
            weight_name: "FLUX.1-Turbo-Alpha.safetensors".to_string(),
            adapter_weight: 1.0,
        }];
        let backend = |endpoint: &str, base_model: &str, loras: Vec<LoraConfig>| BackendConfig {
            endpoints: vec![endpoint.to_string()],
            base_model: base_model.to_string(),
            loras,
            timeout_ms: default_timeout(),
        };

        Self {
            generate: backend("http://127.0.0.1:9100", "black-forest-labs/FLUX.1-dev", turbo.clone()),
            edit: backend("http://127.0.0.1:9101", "LPX55/FLUX.1_Kontext-Lightning", vec![]),
            prior: backend("http://127.0.0.1:9102", "black-forest-labs/FLUX.1-Redux-dev", vec![]),
            variation: backend("http://127.0.0.1:9102", "black-forest-labs/FLUX.1-dev", turbo),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            backends: BackendsConfig::default(),
            generation: GenerationConfig::default(),
            fetch: FetchConfig::default(),
            artifact_store: ArtifactStoreConfig::default(),
            file_server: FileServerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
