//! Process-wide pipeline handles, built once at startup

use std::sync::Arc;
use tracing::info;

use crate::backend::http_backend::HttpBackend;
use crate::backend::traits::{ImageBackend, PriorBackend};
use crate::config::BackendsConfig;
use crate::error::Result;

/// The backends each mode dispatches to
#[derive(Clone)]
pub struct PipelineRegistry {
    pub generate: Arc<dyn ImageBackend>,
    pub edit: Arc<dyn ImageBackend>,
    pub prior: Arc<dyn PriorBackend>,
    pub variation: Arc<dyn ImageBackend>,
}

impl PipelineRegistry {
    pub fn new(
        generate: Arc<dyn ImageBackend>,
        edit: Arc<dyn ImageBackend>,
        prior: Arc<dyn PriorBackend>,
        variation: Arc<dyn ImageBackend>,
    ) -> Self {
        Self {
            generate,
            edit,
            prior,
            variation,
        }
    }

    /// Connect every pipeline to its configured model workers
    pub fn from_config(config: &BackendsConfig) -> Result<Self> {
        for (name, backend) in config.iter() {
            info!(
                backend = %name,
                model = %backend.base_model,
                loras = backend.loras.len(),
                endpoints = ?backend.endpoints,
                "Registering backend"
            );
        }

        Ok(Self::new(
            Arc::new(HttpBackend::new("generate", &config.generate)?),
            Arc::new(HttpBackend::new("edit", &config.edit)?),
            Arc::new(HttpBackend::new("prior", &config.prior)?),
            Arc::new(HttpBackend::new("variation", &config.variation)?),
        ))
    }
}
