//! Configuration module

pub mod settings;

pub use settings::{
    ArtifactStoreConfig, BackendConfig, BackendsConfig, FetchConfig, FileServerConfig,
    GenerationConfig, LoggingConfig, LoraConfig, ModeDefaults, ServerConfig, Settings,
};
