//! Axum route handlers.
//!
//! Handlers return [`crate::errors::Error`], which renders as the standard JSON error envelope
//! with the error's suggested status.

pub mod files;
pub mod slugs;
