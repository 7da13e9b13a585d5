//! Connection registry implementation
//!
//! The central registry that owns all live connection records. Every mutation
//! goes through registry operations so that concurrent publishers, management
//! requests, heartbeat timers, and connect/disconnect handlers observe a
//! consistent snapshot.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::connection::{Connection, ConnectionId};
use super::error::RegistryError;
use super::subscription::{SubscriptionAction, SubscriptionSnapshot};

/// Central registry for all open connections
///
/// Thread-safe via `RwLock`. Read-heavy workloads (broadcast fan-out,
/// staleness scans) benefit from the concurrent read access; each record is
/// individually locked so per-connection mutation never blocks the map.
pub struct ConnectionRegistry {
    /// Map of connection id to connection record
    connections: RwLock<HashMap<ConnectionId, Arc<RwLock<Connection>>>>,
}

impl ConnectionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Register a connection record
    pub(crate) async fn insert(&self, connection: Connection) -> ConnectionId {
        let id = connection.id;
        let mut connections = self.connections.write().await;
        connections.insert(id, Arc::new(RwLock::new(connection)));
        id
    }

    /// Remove a connection record, returning it for final cleanup
    pub(crate) async fn remove(&self, id: ConnectionId) -> Option<Arc<RwLock<Connection>>> {
        let mut connections = self.connections.write().await;
        connections.remove(&id)
    }

    /// Look up a connection record
    pub(crate) async fn get(&self, id: ConnectionId) -> Option<Arc<RwLock<Connection>>> {
        let connections = self.connections.read().await;
        connections.get(&id).cloned()
    }

    /// Snapshot of all live connections for fan-out iteration
    pub(crate) async fn all(&self) -> Vec<(ConnectionId, Arc<RwLock<Connection>>)> {
        let connections = self.connections.read().await;
        connections
            .iter()
            .map(|(id, entry)| (*id, Arc::clone(entry)))
            .collect()
    }

    /// Attach the heartbeat task handle to a connection
    pub(crate) async fn set_heartbeat_handle(&self, id: ConnectionId, handle: JoinHandle<()>) {
        if let Some(entry) = self.get(id).await {
            let mut connection = entry.write().await;
            connection.heartbeat = Some(handle);
        } else {
            // Connection was closed before the task handle landed
            handle.abort();
        }
    }

    /// Apply a subscription mutation on behalf of `requester_user_id`.
    ///
    /// Fails with `NotFound` for unknown connections and `Unauthorized` when
    /// the requester is not the connection's owner.
    pub async fn apply(
        &self,
        id: ConnectionId,
        requester_user_id: &str,
        action: &SubscriptionAction,
    ) -> Result<SubscriptionSnapshot, RegistryError> {
        let entry = self.get(id).await.ok_or(RegistryError::NotFound(id))?;
        let mut connection = entry.write().await;

        if connection.owner_user_id != requester_user_id {
            tracing::warn!(
                connection_id = %id,
                requester = %requester_user_id,
                "Subscription update rejected: requester is not the owner"
            );
            return Err(RegistryError::Unauthorized(id));
        }

        match action {
            SubscriptionAction::SubscribeBookings(ids) => {
                connection.subscribed_booking_ids.extend(ids.iter().cloned());
            }
            SubscriptionAction::UnsubscribeBookings(ids) => {
                for booking_id in ids {
                    connection.subscribed_booking_ids.remove(booking_id);
                }
            }
            SubscriptionAction::SubscribeTrips(ids) => {
                connection.subscribed_trip_ids.extend(ids.iter().cloned());
            }
            SubscriptionAction::UnsubscribeTrips(ids) => {
                for trip_id in ids {
                    connection.subscribed_trip_ids.remove(trip_id);
                }
            }
            SubscriptionAction::UpdatePreferences(update) => {
                connection.preferences.merge(update);
            }
        }

        tracing::debug!(
            connection_id = %id,
            bookings = connection.subscribed_booking_ids.len(),
            trips = connection.subscribed_trip_ids.len(),
            "Subscription updated"
        );

        Ok(connection.snapshot())
    }

    /// Record a successful keep-alive push
    pub(crate) async fn touch_heartbeat(&self, id: ConnectionId) {
        if let Some(entry) = self.get(id).await {
            let mut connection = entry.write().await;
            connection.last_heartbeat_at = Instant::now();
        }
    }

    /// Snapshot of one connection's subscription state
    pub async fn snapshot(&self, id: ConnectionId) -> Option<SubscriptionSnapshot> {
        let entry = self.get(id).await?;
        let connection = entry.read().await;
        Some(connection.snapshot())
    }

    /// Ids of connections without a successful heartbeat for longer than `max_age`
    pub(crate) async fn stale_ids(&self, max_age: Duration) -> Vec<ConnectionId> {
        let now = Instant::now();
        let connections = self.connections.read().await;
        let mut stale = Vec::new();

        for (id, entry) in connections.iter() {
            let connection = entry.read().await;
            if now.duration_since(connection.last_heartbeat_at) > max_age {
                stale.push(*id);
            }
        }

        stale
    }

    /// Number of live connections
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
