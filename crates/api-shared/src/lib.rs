//! # API Shared
//!
//! Shared definitions for the clinic APIs.
//!
//! Contains:
//! - Wire DTOs (`dto` module) with OpenAPI schemas and conversions from core types
//! - Shared services like `HealthService`
//! - Caller identification helpers
//!
//! Used by `api-rest` and `clinic-cli`.

pub mod auth;
pub mod dto;
pub mod health;

pub use auth::{requester_id, AuthError, USER_ID_HEADER};
pub use dto::*;
pub use health::HealthService;
