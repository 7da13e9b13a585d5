//! Event taxonomy for the notification core
//!
//! A closed set of booking/trip lifecycle event kinds produced by external
//! workflows (booking, payment, trip status, weather monitoring) and consumed
//! once by the broadcast hub. Events are immutable after construction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Kind of a lifecycle event. The taxonomy is closed: producers may only
/// construct events of these kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// A booking was confirmed by the captain
    BookingConfirmed,
    /// A booking was cancelled
    BookingCancelled,
    /// A payment settled successfully
    PaymentCompleted,
    /// A payment attempt failed
    PaymentFailed,
    /// A participant was approved for a trip
    ParticipantApproved,
    /// A participant was rejected from a trip
    ParticipantRejected,
    /// The trip changed lifecycle state (e.g. entered a new phase)
    TripStatusChanged,
    /// A scheduled reminder was sent
    ReminderSent,
    /// A refund was processed
    RefundProcessed,
    /// A weather alert affects the trip
    WeatherAlert,
}

impl EventType {
    /// All event kinds, in taxonomy order.
    pub const ALL: [EventType; 10] = [
        EventType::BookingConfirmed,
        EventType::BookingCancelled,
        EventType::PaymentCompleted,
        EventType::PaymentFailed,
        EventType::ParticipantApproved,
        EventType::ParticipantRejected,
        EventType::TripStatusChanged,
        EventType::ReminderSent,
        EventType::RefundProcessed,
        EventType::WeatherAlert,
    ];

    /// Wire name of this event kind (matches the serde representation).
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::BookingConfirmed => "booking_confirmed",
            EventType::BookingCancelled => "booking_cancelled",
            EventType::PaymentCompleted => "payment_completed",
            EventType::PaymentFailed => "payment_failed",
            EventType::ParticipantApproved => "participant_approved",
            EventType::ParticipantRejected => "participant_rejected",
            EventType::TripStatusChanged => "trip_status_changed",
            EventType::ReminderSent => "reminder_sent",
            EventType::RefundProcessed => "refund_processed",
            EventType::WeatherAlert => "weather_alert",
        }
    }

    /// Preference category of this event kind.
    ///
    /// The taxonomy is a closed enum, so the mapping is total: there is no
    /// "unknown kind" that could bypass the preference gate.
    pub fn category(&self) -> EventCategory {
        match self {
            EventType::PaymentCompleted | EventType::PaymentFailed | EventType::RefundProcessed => {
                EventCategory::Payment
            }
            EventType::BookingConfirmed
            | EventType::BookingCancelled
            | EventType::TripStatusChanged
            | EventType::ParticipantApproved
            | EventType::ParticipantRejected => EventCategory::Status,
            EventType::ReminderSent => EventCategory::Reminder,
            EventType::WeatherAlert => EventCategory::Weather,
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Preference category an event kind is gated by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventCategory {
    /// Payment lifecycle (completed, failed, refunded)
    Payment,
    /// Booking/trip status changes and participant decisions
    Status,
    /// Scheduled reminders
    Reminder,
    /// Weather alerts
    Weather,
}

/// Presentation priority of an event.
///
/// Used only for client-side display emphasis, never for delivery ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EventPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

/// A booking/trip lifecycle event handed to the broadcast hub.
///
/// Base fields live at the top level and the workflow-specific detail is an
/// opaque JSON `payload`, serialized camelCase with a `type` discriminator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingEvent {
    /// Unique event id
    pub id: String,
    /// Event kind discriminator
    #[serde(rename = "type")]
    pub event_type: EventType,
    /// Booking this event concerns
    pub booking_id: String,
    /// Trip this event concerns, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trip_id: Option<String>,
    /// User the event is addressed to; delivery is scoped to this owner
    pub owner_user_id: String,
    /// Workflow-specific detail (opaque)
    pub payload: Value,
    /// When the event was produced
    pub timestamp: DateTime<Utc>,
    /// Presentation priority
    pub priority: EventPriority,
}

impl BookingEvent {
    /// Create an event with a fresh id and the current timestamp.
    pub fn new(
        event_type: EventType,
        booking_id: impl Into<String>,
        owner_user_id: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            event_type,
            booking_id: booking_id.into(),
            trip_id: None,
            owner_user_id: owner_user_id.into(),
            payload: Value::Null,
            timestamp: Utc::now(),
            priority: EventPriority::default(),
        }
    }

    /// Attach the trip id
    pub fn with_trip(mut self, trip_id: impl Into<String>) -> Self {
        self.trip_id = Some(trip_id.into());
        self
    }

    /// Attach the workflow payload
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    /// Set the presentation priority
    pub fn with_priority(mut self, priority: EventPriority) -> Self {
        self.priority = priority;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_mapping() {
        assert_eq!(EventType::PaymentCompleted.category(), EventCategory::Payment);
        assert_eq!(EventType::PaymentFailed.category(), EventCategory::Payment);
        assert_eq!(EventType::RefundProcessed.category(), EventCategory::Payment);
        assert_eq!(EventType::BookingConfirmed.category(), EventCategory::Status);
        assert_eq!(EventType::BookingCancelled.category(), EventCategory::Status);
        assert_eq!(EventType::TripStatusChanged.category(), EventCategory::Status);
        assert_eq!(EventType::ParticipantApproved.category(), EventCategory::Status);
        assert_eq!(EventType::ParticipantRejected.category(), EventCategory::Status);
        assert_eq!(EventType::ReminderSent.category(), EventCategory::Reminder);
        assert_eq!(EventType::WeatherAlert.category(), EventCategory::Weather);
    }

    #[test]
    fn test_wire_names_match_serde() {
        for kind in EventType::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }

    #[test]
    fn test_event_serializes_camel_case() {
        let event = BookingEvent::new(EventType::PaymentCompleted, "b1", "user_1")
            .with_trip("t1")
            .with_payload(serde_json::json!({"amount": 4200}));

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "payment_completed");
        assert_eq!(value["bookingId"], "b1");
        assert_eq!(value["tripId"], "t1");
        assert_eq!(value["ownerUserId"], "user_1");
        assert_eq!(value["payload"]["amount"], 4200);
        assert_eq!(value["priority"], "medium");
    }

    #[test]
    fn test_trip_id_omitted_when_absent() {
        let event = BookingEvent::new(EventType::ReminderSent, "b1", "user_1");
        let value = serde_json::to_value(&event).unwrap();
        assert!(value.get("tripId").is_none());
    }
}
