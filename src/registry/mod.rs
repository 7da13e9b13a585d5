//! Subscription registry
//!
//! The registry owns every open connection's record: identity, subscribed
//! booking/trip ids, allowed event kinds, preference flags, and liveness
//! bookkeeping. The broadcast hub consults it on every publish; the lifecycle
//! manager is the only component that inserts and removes records.
//!
//! # Architecture
//!
//! ```text
//!                      Arc<ConnectionRegistry>
//!                 ┌──────────────────────────────┐
//!                 │ connections: HashMap<Id,     │
//!                 │   Connection {               │
//!                 │     owner, subscriptions,    │
//!                 │     sender: mpsc::Tx,        │
//!                 │   }                          │
//!                 │ >                            │
//!                 └──────────────┬───────────────┘
//!                                │
//!        ┌───────────────────────┼───────────────────────┐
//!        │                       │                       │
//!        ▼                       ▼                       ▼
//!   [BroadcastHub]       [ConnectionManager]      [management API]
//!   publish() fan-out    heartbeats + reaping     apply() mutations
//! ```
//!
//! Connection records are addressed by opaque [`ConnectionId`] handles rather
//! than direct references; each record carries its own lock so a slow mutation
//! on one connection never blocks the map.

pub mod connection;
pub mod error;
pub mod store;
pub mod subscription;

pub use connection::{Connection, ConnectionId, DeliveryFailure};
pub use error::RegistryError;
pub use store::ConnectionRegistry;
pub use subscription::{
    Preferences, PreferencesUpdate, SubscriptionAction, SubscriptionCounts, SubscriptionFilters,
    SubscriptionSnapshot,
};
