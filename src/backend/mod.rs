//! Backend module - Traits, HTTP model worker client, and registry

pub mod http_backend;
pub mod registry;
pub mod traits;

pub use registry::PipelineRegistry;
pub use traits::{Conditioning, ImageBackend, ModelInfo, PriorBackend, RenderRequest};
