//! # API Shared
//!
//! Shared definitions for the registry's outer surfaces.
//!
//! Contains:
//! - JSON request/response bodies with OpenAPI schemas (`dto` module)
//! - Shared services like `HealthService`
//! - API key checking
//!
//! Used by `api-rest` and the `clinica` CLI.

pub mod auth;
pub mod dto;
pub mod health;

pub use auth::{validate_api_key, AuthError, API_KEY_HEADER};
pub use dto::*;
pub use health::{HealthRes, HealthService};
