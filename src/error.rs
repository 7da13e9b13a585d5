//! Crate error taxonomy
//!
//! Client-facing failures carry a stable machine-readable code alongside the
//! human-readable message, so every outcome is observable as either a
//! delivered frame, a control frame, or an explicit structured error.

use thiserror::Error;

use crate::phase::PhaseError;
use crate::registry::RegistryError;

/// Error type for the notification core's client-facing surfaces
#[derive(Debug, Error)]
pub enum Error {
    /// No verified caller identity; rejected before any registry access
    #[error("authentication required")]
    Authentication,

    /// Malformed request
    #[error("invalid request: {0}")]
    Validation(String),

    /// Registry lookup or authorization failure
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Phase channel provisioning or transition failure
    #[error(transparent)]
    Phase(#[from] PhaseError),
}

impl Error {
    /// Stable machine-readable code for structured responses
    pub fn code(&self) -> &'static str {
        match self {
            Error::Authentication => "AUTHENTICATION_ERROR",
            Error::Validation(_) => "VALIDATION_ERROR",
            Error::Registry(RegistryError::NotFound(_)) => "NOT_FOUND",
            Error::Registry(RegistryError::Unauthorized(_)) => "AUTHORIZATION_ERROR",
            Error::Phase(PhaseError::Provisioning { .. }) => "PROVISIONING_ERROR",
            Error::Phase(PhaseError::Provider(_)) => "CHANNEL_ERROR",
        }
    }
}

/// Result alias for the crate's fallible operations
pub type Result<T> = std::result::Result<T, Error>;
