//! Push frame types for the client-facing wire protocol
//!
//! Every frame carries an `id`, an `event` name, and a JSON-encoded `data`
//! field. Domain frames use `booking-<type>` event names; control frames use
//! `booking-connected` and `booking-heartbeat`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::event::BookingEvent;
use crate::registry::{ConnectionId, SubscriptionCounts};

/// Event name of the connection acknowledgement frame
pub const EVENT_CONNECTED: &str = "booking-connected";

/// Event name of the keep-alive frame
pub const EVENT_HEARTBEAT: &str = "booking-heartbeat";

/// A single frame on a connection's push stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushFrame {
    /// Frame id; the event id for domain frames, a fresh id for control frames
    pub id: String,
    /// Frame name (`booking-<type>`, `booking-connected`, `booking-heartbeat`)
    pub event: String,
    /// JSON-encoded event or control payload
    pub data: String,
}

/// Payload of the `booking-connected` acknowledgement frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedPayload {
    /// Id of the newly opened connection
    pub connection_id: String,
    /// Active subscription counts at open time
    pub subscriptions: SubscriptionCounts,
}

/// Payload of the `booking-heartbeat` keep-alive frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatPayload {
    /// Server time of the tick
    pub timestamp: DateTime<Utc>,
    /// Current subscription counts
    pub subscriptions: SubscriptionCounts,
}

impl PushFrame {
    /// Frame carrying a domain event.
    ///
    /// The frame id is the event id, so a client sees stable ids across
    /// connections that receive the same event.
    pub fn event(event: &BookingEvent) -> Result<Self, serde_json::Error> {
        Ok(Self {
            id: event.id.clone(),
            event: format!("booking-{}", event.event_type),
            data: serde_json::to_string(event)?,
        })
    }

    /// Connection acknowledgement frame, pushed immediately on open
    pub fn connected(connection_id: ConnectionId, subscriptions: SubscriptionCounts) -> Self {
        let payload = ConnectedPayload {
            connection_id: connection_id.to_string(),
            subscriptions,
        };

        Self {
            id: Uuid::new_v4().to_string(),
            event: EVENT_CONNECTED.to_string(),
            data: serde_json::to_string(&payload).unwrap_or_else(|_| "{}".into()),
        }
    }

    /// Keep-alive frame, pushed on every heartbeat tick
    pub fn heartbeat(subscriptions: SubscriptionCounts) -> Self {
        let payload = HeartbeatPayload {
            timestamp: Utc::now(),
            subscriptions,
        };

        Self {
            id: Uuid::new_v4().to_string(),
            event: EVENT_HEARTBEAT.to_string(),
            data: serde_json::to_string(&payload).unwrap_or_else(|_| "{}".into()),
        }
    }

    /// Whether this is a control frame rather than a domain event
    pub fn is_control(&self) -> bool {
        self.event == EVENT_CONNECTED || self.event == EVENT_HEARTBEAT
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventType;

    #[test]
    fn test_event_frame_name_and_data() {
        let event = BookingEvent::new(EventType::PaymentCompleted, "b1", "user_1");
        let frame = PushFrame::event(&event).unwrap();

        assert_eq!(frame.id, event.id);
        assert_eq!(frame.event, "booking-payment_completed");
        assert!(!frame.is_control());

        let decoded: BookingEvent = serde_json::from_str(&frame.data).unwrap();
        assert_eq!(decoded, event);
    }

    #[test]
    fn test_connected_frame() {
        let id = ConnectionId::generate();
        let frame = PushFrame::connected(id, SubscriptionCounts { bookings: 2, trips: 1 });

        assert_eq!(frame.event, EVENT_CONNECTED);
        assert!(frame.is_control());

        let payload: ConnectedPayload = serde_json::from_str(&frame.data).unwrap();
        assert_eq!(payload.connection_id, id.to_string());
        assert_eq!(payload.subscriptions.bookings, 2);
        assert_eq!(payload.subscriptions.trips, 1);
    }

    #[test]
    fn test_heartbeat_frame() {
        let frame = PushFrame::heartbeat(SubscriptionCounts { bookings: 0, trips: 3 });

        assert_eq!(frame.event, EVENT_HEARTBEAT);
        assert!(frame.is_control());

        let payload: HeartbeatPayload = serde_json::from_str(&frame.data).unwrap();
        assert_eq!(payload.subscriptions.trips, 3);
    }
}
