//! Error types for the observer registry.

use crate::observer::InvalidObserver;
use thiserror::Error;

/// Main error type for registry operations.
///
/// Only add-time validation crosses the registry boundary. Probe and
/// delivery failures are absorbed and turned into removals.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(#[from] InvalidObserver),
}

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;
