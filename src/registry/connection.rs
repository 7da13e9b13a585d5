//! Connection record and matching predicate
//!
//! One `Connection` per open push stream. The record is owned exclusively by
//! the registry and mutated only through registry operations; the frame sender
//! is the single serialized writer for that stream.

use std::collections::HashSet;
use std::str::FromStr;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use uuid::Uuid;

use crate::event::BookingEvent;
use crate::hub::frame::PushFrame;

use super::subscription::{
    Preferences, SubscriptionCounts, SubscriptionFilters, SubscriptionSnapshot,
};

/// Opaque handle identifying an open connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub(crate) fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for ConnectionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::from_str(s)?))
    }
}

/// Push failure on a connection's frame stream.
///
/// Any failure (closed or full buffer) tears the connection down; there is no
/// retry and no distinction the caller could act on.
#[derive(Debug, Clone, Copy, thiserror::Error)]
#[error("push stream closed or full")]
pub struct DeliveryFailure;

/// Per-connection state: identity, subscriptions, preferences, liveness
pub struct Connection {
    /// Opaque connection id
    pub id: ConnectionId,

    /// User who opened the connection; only this user's events are delivered
    pub owner_user_id: String,

    /// Booking ids this connection is subscribed to
    pub subscribed_booking_ids: HashSet<String>,

    /// Trip ids this connection is subscribed to
    pub subscribed_trip_ids: HashSet<String>,

    /// Event kinds this connection accepts; empty means all kinds
    pub allowed_event_types: HashSet<crate::event::EventType>,

    /// Per-category preference flags
    pub preferences: Preferences,

    /// Last successful keep-alive push
    pub last_heartbeat_at: Instant,

    /// Single serialized writer for this connection's stream
    pub(crate) sender: mpsc::Sender<PushFrame>,

    /// Heartbeat task, aborted on close
    pub(crate) heartbeat: Option<JoinHandle<()>>,
}

impl Connection {
    /// Create a connection record seeded from the initial filters
    pub(crate) fn new(
        owner_user_id: String,
        filters: SubscriptionFilters,
        sender: mpsc::Sender<PushFrame>,
    ) -> Self {
        Self {
            id: ConnectionId::generate(),
            owner_user_id,
            subscribed_booking_ids: filters.booking_ids.into_iter().collect(),
            subscribed_trip_ids: filters.trip_ids.into_iter().collect(),
            allowed_event_types: filters.event_types.into_iter().collect(),
            preferences: filters.preferences,
            last_heartbeat_at: Instant::now(),
            sender,
            heartbeat: None,
        }
    }

    /// Whether an event should be delivered to this connection.
    ///
    /// Ownership is checked first and fails closed; then the allowed-type set,
    /// the booking/trip subscription sets, and the per-category preference
    /// gate.
    pub fn matches(&self, event: &BookingEvent) -> bool {
        if event.owner_user_id != self.owner_user_id {
            return false;
        }

        if !self.allowed_event_types.is_empty()
            && !self.allowed_event_types.contains(&event.event_type)
        {
            return false;
        }

        let id_match = self.subscribed_booking_ids.contains(&event.booking_id)
            || event
                .trip_id
                .as_ref()
                .is_some_and(|trip_id| self.subscribed_trip_ids.contains(trip_id));
        if !id_match {
            return false;
        }

        self.preferences.allows(event.event_type)
    }

    /// Attempt a non-blocking frame delivery
    pub(crate) fn try_push(&self, frame: PushFrame) -> Result<(), DeliveryFailure> {
        self.sender.try_send(frame).map_err(|_| DeliveryFailure)
    }

    /// Current subscription counts
    pub fn counts(&self) -> SubscriptionCounts {
        SubscriptionCounts {
            bookings: self.subscribed_booking_ids.len(),
            trips: self.subscribed_trip_ids.len(),
        }
    }

    /// Snapshot of the current subscription state
    pub fn snapshot(&self) -> SubscriptionSnapshot {
        SubscriptionSnapshot::from_sets(
            self.id.to_string(),
            &self.subscribed_booking_ids,
            &self.subscribed_trip_ids,
            self.preferences,
        )
    }
}
