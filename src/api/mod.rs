//! API layer - backend REST client
//!
//! This module contains the HTTP client for the inventory backend.
//! It includes:
//! - Auth endpoints (login, token renewal)
//! - Item endpoints, including spreadsheet import/export
//! - Admin endpoints (users, activity logs, statistics)
//! - Normalization of the backend's varying response shapes

pub mod client;
pub mod error;
pub mod responses;

pub use client::ApiClient;
pub use error::ApiError;
pub use responses::{FieldError, MutationOutcome};
