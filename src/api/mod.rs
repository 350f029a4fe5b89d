//! HTTP surface of the imaging gateway

pub mod extract;
pub mod native;
pub mod openai;
pub mod routes;

pub use routes::create_router;
