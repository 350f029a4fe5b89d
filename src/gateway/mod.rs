//! Gateway module - Request orchestration from inputs to generated images

pub mod dispatcher;
pub mod input;
pub mod mode;
pub mod orchestrator;
pub mod params;
pub mod seed;

pub use dispatcher::{Dispatcher, GenerationResult};
pub use input::{ImageSource, InputAcquirer};
pub use mode::{resolve_mode, Mode};
pub use orchestrator::{GenerationRequest, Orchestrator, PreparedRequest};
pub use params::{resolve_params, ParameterDefaults, PartialParams, ResolvedParameters};
pub use seed::{derive_seed, GeneratorState};
