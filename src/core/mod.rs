//! Core types shared across the controller.
//!
//! Currently this is the error model: [`DrError`] for library callers and
//! [`ErrorContext`] for CLI presentation.

pub mod error;

pub use error::{DrError, ErrorContext, user_friendly_error};

/// Result alias used by the site operations.
pub type Result<T, E = DrError> = std::result::Result<T, E>;
