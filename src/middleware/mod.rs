//! Middleware module - Bearer authentication

pub mod auth;

pub use auth::BearerAuthLayer;
