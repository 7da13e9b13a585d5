//! Trip phase lifecycle
//!
//! A trip moves through three time-boxed phases, each bound to its own
//! communication channel at an external provider. The controller keeps the
//! invariant that at most one phase channel per trip is unfrozen, and feeds
//! phase-transition events into the broadcast hub.

pub mod controller;
pub mod error;
#[allow(clippy::module_inception)]
pub mod phase;
pub mod provider;

pub use controller::{PhaseChannelDescriptor, PhaseChannelSet, PhaseController, TransitionReport};
pub use error::PhaseError;
pub use phase::{compute_current_phase, PhaseBlueprint, TripPhase};
pub use provider::{
    ChannelMetadata, ChannelProvider, ChannelUpdate, CreateChannelRequest,
    InMemoryChannelProvider, ProviderChannel, ProviderError, SystemMessage,
};
