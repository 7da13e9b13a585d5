//! Broadcast hub
//!
//! Accepts domain events from external workflows, matches each one against
//! every live registration in the subscription registry, and pushes typed
//! frames to the matches. One broken client never blocks delivery to the rest;
//! broken connections are pruned as they are found.
//!
//! Delivery is explicitly best-effort and at-most-once: there is no replay of
//! missed events, and a dropped connection must be reopened by the client.

pub mod frame;
pub mod publisher;

pub use frame::{ConnectedPayload, HeartbeatPayload, PushFrame, EVENT_CONNECTED, EVENT_HEARTBEAT};
pub use publisher::BroadcastHub;
