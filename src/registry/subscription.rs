//! Subscription state types
//!
//! Filters, preference flags, mutation actions, and the snapshot returned to
//! clients after every management operation.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::event::EventType;

/// Per-category delivery preferences
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    /// Deliver payment-class events
    pub receive_payment_updates: bool,
    /// Deliver booking/trip status-class events
    pub receive_status_updates: bool,
    /// Deliver reminder events
    pub receive_reminders: bool,
    /// Deliver weather alerts
    pub receive_weather_alerts: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            receive_payment_updates: true,
            receive_status_updates: true,
            receive_reminders: true,
            receive_weather_alerts: true,
        }
    }
}

impl Preferences {
    /// Whether events of this kind pass the preference gate
    pub fn allows(&self, event_type: EventType) -> bool {
        use crate::event::EventCategory;

        match event_type.category() {
            EventCategory::Payment => self.receive_payment_updates,
            EventCategory::Status => self.receive_status_updates,
            EventCategory::Reminder => self.receive_reminders,
            EventCategory::Weather => self.receive_weather_alerts,
        }
    }

    /// Merge a partial update into these preferences
    pub fn merge(&mut self, update: &PreferencesUpdate) {
        if let Some(v) = update.receive_payment_updates {
            self.receive_payment_updates = v;
        }
        if let Some(v) = update.receive_status_updates {
            self.receive_status_updates = v;
        }
        if let Some(v) = update.receive_reminders {
            self.receive_reminders = v;
        }
        if let Some(v) = update.receive_weather_alerts {
            self.receive_weather_alerts = v;
        }
    }
}

/// Partial preference update; absent fields keep their current value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesUpdate {
    pub receive_payment_updates: Option<bool>,
    pub receive_status_updates: Option<bool>,
    pub receive_reminders: Option<bool>,
    pub receive_weather_alerts: Option<bool>,
}

/// Initial subscription state for a new connection
#[derive(Debug, Clone, Default)]
pub struct SubscriptionFilters {
    /// Booking ids to deliver events for
    pub booking_ids: Vec<String>,
    /// Trip ids to deliver events for
    pub trip_ids: Vec<String>,
    /// Event kinds this connection accepts; empty means all kinds
    pub event_types: Vec<EventType>,
    /// Per-category preference flags
    pub preferences: Preferences,
}

impl SubscriptionFilters {
    /// Filters with the given booking ids and defaults for everything else
    pub fn for_bookings<I, S>(booking_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            booking_ids: booking_ids.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Filters with the given trip ids and defaults for everything else
    pub fn for_trips<I, S>(trip_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            trip_ids: trip_ids.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Restrict the accepted event kinds
    pub fn event_types<I>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = EventType>,
    {
        self.event_types = kinds.into_iter().collect();
        self
    }

    /// Override the preference flags
    pub fn preferences(mut self, preferences: Preferences) -> Self {
        self.preferences = preferences;
        self
    }
}

/// A single mutation of a connection's subscription state
#[derive(Debug, Clone)]
pub enum SubscriptionAction {
    /// Add booking ids to the subscription set
    SubscribeBookings(Vec<String>),
    /// Remove booking ids from the subscription set
    UnsubscribeBookings(Vec<String>),
    /// Add trip ids to the subscription set
    SubscribeTrips(Vec<String>),
    /// Remove trip ids from the subscription set
    UnsubscribeTrips(Vec<String>),
    /// Merge partial preference flags
    UpdatePreferences(PreferencesUpdate),
}

/// Counts of active subscriptions, carried by control frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionCounts {
    /// Number of subscribed booking ids
    pub bookings: usize,
    /// Number of subscribed trip ids
    pub trips: usize,
}

/// Resulting subscription state after a management operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionSnapshot {
    /// Connection the snapshot describes
    pub connection_id: String,
    /// Subscribed booking ids, sorted for stable output
    pub booking_ids: Vec<String>,
    /// Subscribed trip ids, sorted for stable output
    pub trip_ids: Vec<String>,
    /// Current preference flags
    pub preferences: Preferences,
}

impl SubscriptionSnapshot {
    pub(crate) fn from_sets(
        connection_id: String,
        booking_ids: &HashSet<String>,
        trip_ids: &HashSet<String>,
        preferences: Preferences,
    ) -> Self {
        let mut booking_ids: Vec<String> = booking_ids.iter().cloned().collect();
        let mut trip_ids: Vec<String> = trip_ids.iter().cloned().collect();
        booking_ids.sort();
        trip_ids.sort();

        Self {
            connection_id,
            booking_ids,
            trip_ids,
            preferences,
        }
    }

    /// Subscription counts for control frames
    pub fn counts(&self) -> SubscriptionCounts {
        SubscriptionCounts {
            bookings: self.booking_ids.len(),
            trips: self.trip_ids.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preferences_default_allow_all() {
        let prefs = Preferences::default();

        for kind in EventType::ALL {
            assert!(prefs.allows(kind), "{kind} should be allowed by default");
        }
    }

    #[test]
    fn test_preferences_gate_by_category() {
        let prefs = Preferences {
            receive_payment_updates: false,
            ..Default::default()
        };

        assert!(!prefs.allows(EventType::PaymentCompleted));
        assert!(!prefs.allows(EventType::PaymentFailed));
        assert!(!prefs.allows(EventType::RefundProcessed));
        assert!(prefs.allows(EventType::BookingConfirmed));
        assert!(prefs.allows(EventType::ReminderSent));
        assert!(prefs.allows(EventType::WeatherAlert));
    }

    #[test]
    fn test_preferences_merge_partial() {
        let mut prefs = Preferences::default();
        prefs.merge(&PreferencesUpdate {
            receive_reminders: Some(false),
            ..Default::default()
        });

        assert!(!prefs.receive_reminders);
        assert!(prefs.receive_payment_updates);
        assert!(prefs.receive_status_updates);
        assert!(prefs.receive_weather_alerts);
    }

    #[test]
    fn test_snapshot_sorted_and_counted() {
        let bookings: HashSet<String> = ["b2", "b1"].iter().map(|s| s.to_string()).collect();
        let trips: HashSet<String> = ["t1"].iter().map(|s| s.to_string()).collect();

        let snapshot =
            SubscriptionSnapshot::from_sets("c1".into(), &bookings, &trips, Preferences::default());

        assert_eq!(snapshot.booking_ids, vec!["b1", "b2"]);
        assert_eq!(snapshot.trip_ids, vec!["t1"]);
        assert_eq!(snapshot.counts().bookings, 2);
        assert_eq!(snapshot.counts().trips, 1);
    }
}
