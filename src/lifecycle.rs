//! Connection lifecycle manager
//!
//! Opens and closes connections, owns the per-connection heartbeat timers, and
//! guarantees cleanup on every exit path: explicit disconnect, failed push,
//! and heartbeat staleness. Also exposes the management surface for
//! subscription mutations.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::HubConfig;
use crate::error::Error;
use crate::hub::frame::PushFrame;
use crate::registry::{
    Connection, ConnectionId, ConnectionRegistry, PreferencesUpdate, SubscriptionAction,
    SubscriptionFilters, SubscriptionSnapshot,
};

/// Opens, monitors, and closes push-stream connections
pub struct ConnectionManager {
    registry: Arc<ConnectionRegistry>,
    config: HubConfig,
}

impl ConnectionManager {
    /// Create a manager with a fresh registry
    pub fn new(config: HubConfig) -> Self {
        Self {
            registry: Arc::new(ConnectionRegistry::new()),
            config,
        }
    }

    /// The registry this manager maintains
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// The manager's configuration
    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Open a connection for `owner_user_id`.
    ///
    /// Seeds the subscription state from `filters`, pushes the
    /// `booking-connected` acknowledgement frame before anything else, and
    /// starts the connection's heartbeat timer. The returned receiver is the
    /// single reader of the connection's serialized frame stream; dropping it
    /// is the client-initiated disconnect.
    pub async fn open_connection(
        self: &Arc<Self>,
        owner_user_id: impl Into<String>,
        filters: SubscriptionFilters,
    ) -> (ConnectionId, mpsc::Receiver<PushFrame>) {
        let owner_user_id = owner_user_id.into();
        let (tx, rx) = mpsc::channel(self.config.connection_buffer);

        let connection = Connection::new(owner_user_id.clone(), filters, tx);
        let id = connection.id;

        // Acknowledgement goes out first; the buffer floor guarantees room
        let ack = PushFrame::connected(id, connection.counts());
        if connection.try_push(ack).is_err() {
            tracing::warn!(connection_id = %id, "Connected ack not delivered");
        }

        self.registry.insert(connection).await;

        let heartbeat = self.spawn_heartbeat(id);
        self.registry.set_heartbeat_handle(id, heartbeat).await;

        tracing::info!(
            connection_id = %id,
            owner = %owner_user_id,
            "Connection opened"
        );

        (id, rx)
    }

    /// Close a connection: cancel its heartbeat timer, remove it from the
    /// registry, and release the stream handle. Idempotent.
    pub async fn close_connection(&self, id: ConnectionId) {
        if let Some(entry) = self.registry.remove(id).await {
            let mut connection = entry.write().await;
            if let Some(handle) = connection.heartbeat.take() {
                handle.abort();
            }
            tracing::info!(connection_id = %id, "Connection closed");
        }
    }

    /// Per-connection heartbeat timer.
    ///
    /// Each tick pushes a keep-alive frame with current subscription counts
    /// and records the liveness timestamp. A failed push means the stream is
    /// already gone and is treated identically to an explicit disconnect.
    fn spawn_heartbeat(self: &Arc<Self>, id: ConnectionId) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        let interval = self.config.heartbeat_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // interval fires immediately; the connected ack covers that slot
            ticker.tick().await;

            loop {
                ticker.tick().await;

                let Some(entry) = manager.registry.get(id).await else {
                    break;
                };

                let pushed = {
                    let connection = entry.read().await;
                    connection.try_push(PushFrame::heartbeat(connection.counts()))
                };

                match pushed {
                    Ok(()) => manager.registry.touch_heartbeat(id).await,
                    Err(_) => {
                        tracing::info!(
                            connection_id = %id,
                            "Heartbeat push failed, closing connection"
                        );
                        manager.close_connection(id).await;
                        break;
                    }
                }
            }
        })
    }

    /// Close every connection whose last successful heartbeat is older than
    /// the configured staleness window
    pub async fn reap_stale(&self) {
        let max_age = self.config.stale_timeout();

        for id in self.registry.stale_ids(max_age).await {
            tracing::warn!(
                connection_id = %id,
                max_age_secs = max_age.as_secs(),
                "Connection stale, purging"
            );
            self.close_connection(id).await;
        }
    }

    /// Spawn the background staleness reaper
    ///
    /// Returns a handle that can be used to abort the task.
    pub fn spawn_reaper_task(self: &Arc<Self>) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        let interval = self.config.reaper_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                manager.reap_stale().await;
            }
        })
    }

    /// Handle a management request against a connection's subscription state.
    ///
    /// Every outcome is a structured response: success with the resulting
    /// snapshot, or a failure with a human-readable message and a stable code.
    pub async fn handle_request(
        &self,
        requester_user_id: Option<&str>,
        request: SubscriptionRequest,
    ) -> SubscriptionResponse {
        match self.process_request(requester_user_id, request).await {
            Ok(snapshot) => SubscriptionResponse::updated(snapshot),
            Err(e) => SubscriptionResponse::rejected(&e),
        }
    }

    async fn process_request(
        &self,
        requester_user_id: Option<&str>,
        request: SubscriptionRequest,
    ) -> Result<SubscriptionSnapshot, Error> {
        // Identity is checked before any registry access
        let requester = requester_user_id.ok_or(Error::Authentication)?;

        let raw_id = request
            .connection_id
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::Validation("missing connectionId".into()))?;
        let id: ConnectionId = raw_id
            .parse()
            .map_err(|_| Error::Validation(format!("malformed connectionId: {raw_id}")))?;

        let action = request.into_action()?;

        Ok(self.registry.apply(id, requester, &action).await?)
    }
}

/// Kind of subscription mutation requested by a client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionActionKind {
    SubscribeBookings,
    UnsubscribeBookings,
    SubscribeTrips,
    UnsubscribeTrips,
    UpdatePreferences,
}

/// A management request mutating a connection's subscription state
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionRequest {
    /// Target connection
    #[serde(default)]
    pub connection_id: Option<String>,
    /// Requested mutation
    pub action: SubscriptionActionKind,
    /// Booking ids, required for booking actions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub booking_ids: Option<Vec<String>>,
    /// Trip ids, required for trip actions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trip_ids: Option<Vec<String>>,
    /// Preference patch, required for `update_preferences`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferences: Option<PreferencesUpdate>,
}

impl SubscriptionRequest {
    /// Convenience constructor for a booking-id action
    pub fn bookings(
        connection_id: ConnectionId,
        action: SubscriptionActionKind,
        booking_ids: Vec<String>,
    ) -> Self {
        Self {
            connection_id: Some(connection_id.to_string()),
            action,
            booking_ids: Some(booking_ids),
            trip_ids: None,
            preferences: None,
        }
    }

    fn into_action(self) -> Result<SubscriptionAction, Error> {
        match self.action {
            SubscriptionActionKind::SubscribeBookings => self
                .booking_ids
                .map(SubscriptionAction::SubscribeBookings)
                .ok_or_else(|| Error::Validation("missing bookingIds".into())),
            SubscriptionActionKind::UnsubscribeBookings => self
                .booking_ids
                .map(SubscriptionAction::UnsubscribeBookings)
                .ok_or_else(|| Error::Validation("missing bookingIds".into())),
            SubscriptionActionKind::SubscribeTrips => self
                .trip_ids
                .map(SubscriptionAction::SubscribeTrips)
                .ok_or_else(|| Error::Validation("missing tripIds".into())),
            SubscriptionActionKind::UnsubscribeTrips => self
                .trip_ids
                .map(SubscriptionAction::UnsubscribeTrips)
                .ok_or_else(|| Error::Validation("missing tripIds".into())),
            SubscriptionActionKind::UpdatePreferences => self
                .preferences
                .map(SubscriptionAction::UpdatePreferences)
                .ok_or_else(|| Error::Validation("missing preferences".into())),
        }
    }
}

/// Structured outcome of a management request
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionResponse {
    /// Whether the mutation was applied
    pub success: bool,
    /// Human-readable outcome
    pub message: String,
    /// Machine-readable failure code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
    /// Resulting subscription state on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscriptions: Option<SubscriptionSnapshot>,
}

impl SubscriptionResponse {
    fn updated(snapshot: SubscriptionSnapshot) -> Self {
        Self {
            success: true,
            message: "subscription updated".into(),
            code: None,
            subscriptions: Some(snapshot),
        }
    }

    fn rejected(error: &Error) -> Self {
        Self {
            success: false,
            message: error.to_string(),
            code: Some(error.code()),
            subscriptions: None,
        }
    }
}
