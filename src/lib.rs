//! # tripcast
//!
//! Trip lifecycle notification core: a phase state machine governing which of
//! a trip's three time-boxed communication channels is live, and a
//! server-push broadcast hub fanning booking/trip lifecycle events out to
//! concurrently connected clients, each with its own subscription filter and
//! liveness contract.
//!
//! ```text
//!  booking / payment / weather workflows          PhaseController
//!                │                                      │
//!                ▼                                      ▼
//!         BroadcastHub::publish ◄──────── trip_status_changed events
//!                │
//!                ▼ matches(connection, event)
//!        ConnectionRegistry ◄──── ConnectionManager (open/close,
//!                │                 heartbeats, staleness reaper)
//!                ▼
//!        per-connection mpsc stream ──► client (PushFrame frames)
//! ```
//!
//! Delivery is single-process, best-effort, and at-most-once: a dropped
//! connection is torn down and the client reopens a new one; there is no
//! replay of missed events.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use tripcast::config::HubConfig;
//! use tripcast::event::{BookingEvent, EventType};
//! use tripcast::hub::BroadcastHub;
//! use tripcast::lifecycle::ConnectionManager;
//! use tripcast::registry::SubscriptionFilters;
//!
//! #[tokio::main]
//! async fn main() {
//!     let manager = Arc::new(ConnectionManager::new(HubConfig::default()));
//!     let hub = BroadcastHub::new(Arc::clone(&manager));
//!
//!     let (_id, mut rx) = manager
//!         .open_connection("user_1", SubscriptionFilters::for_bookings(["b1"]))
//!         .await;
//!
//!     let event = BookingEvent::new(EventType::BookingConfirmed, "b1", "user_1");
//!     hub.publish(&event).await;
//!
//!     while let Some(frame) = rx.recv().await {
//!         println!("{}: {}", frame.event, frame.data);
//!     }
//! }
//! ```

pub mod config;
pub mod error;
pub mod event;
pub mod hub;
pub mod lifecycle;
pub mod phase;
pub mod registry;

pub use config::HubConfig;
pub use error::{Error, Result};
pub use event::{BookingEvent, EventCategory, EventPriority, EventType};
pub use hub::{BroadcastHub, PushFrame};
pub use lifecycle::{
    ConnectionManager, SubscriptionActionKind, SubscriptionRequest, SubscriptionResponse,
};
pub use phase::{
    compute_current_phase, ChannelProvider, PhaseController, PhaseError, TripPhase,
};
pub use registry::{
    ConnectionId, ConnectionRegistry, Preferences, RegistryError, SubscriptionFilters,
    SubscriptionSnapshot,
};
