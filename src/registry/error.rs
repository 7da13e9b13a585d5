//! Registry error types

use thiserror::Error;

use super::connection::ConnectionId;

/// Error type for registry operations
#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    /// The connection id is not registered
    #[error("connection not found: {0}")]
    NotFound(ConnectionId),

    /// The requester does not own the target connection
    #[error("connection {0} is not owned by the requester")]
    Unauthorized(ConnectionId),
}
