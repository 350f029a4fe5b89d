//! Flux Imaging Gateway
//!
//! Serves text-to-image, prompt-guided edit and prompt-free variation
//! through native and OpenAI-compatible HTTP endpoints, delegating the
//! model work to remote workers. A companion artifact store keeps produced
//! images addressable by URL.

pub mod api;
pub mod backend;
pub mod config;
pub mod error;
pub mod file_server;
pub mod gateway;
pub mod middleware;
pub mod response;

pub use error::{AppError, Result};

use std::sync::Arc;

use gateway::Orchestrator;
use response::Materializer;

/// Application state shared across all handlers
pub struct AppState {
    pub settings: Arc<config::Settings>,
    pub orchestrator: Arc<Orchestrator>,
    pub materializer: Arc<Materializer>,
}

impl AppState {
    pub fn new(settings: config::Settings, orchestrator: Orchestrator, materializer: Materializer) -> Self {
        Self {
            settings: Arc::new(settings),
            orchestrator: Arc::new(orchestrator),
            materializer: Arc::new(materializer),
        }
    }

    /// Build every collaborator from the loaded settings
    pub fn from_settings(settings: config::Settings) -> Result<Self> {
        let orchestrator = Orchestrator::from_settings(&settings)?;
        let materializer = Materializer::from_config(&settings.artifact_store)?;
        Ok(Self::new(settings, orchestrator, materializer))
    }
}
