//! Phase controller error types

use thiserror::Error;

use super::phase::TripPhase;
use super::provider::ProviderError;

/// Error type for phase controller operations
#[derive(Debug, Clone, Error)]
pub enum PhaseError {
    /// A phase channel failed during initial creation. Fatal for the whole
    /// provisioning call: a trip must have full phase coverage or none, and
    /// the caller retries the entire operation.
    #[error("provisioning failed for {phase} channel of trip {trip_id}: {source}")]
    Provisioning {
        trip_id: String,
        phase: TripPhase,
        #[source]
        source: ProviderError,
    },

    /// Provider failure outside provisioning (lookups, updates)
    #[error(transparent)]
    Provider(#[from] ProviderError),
}
