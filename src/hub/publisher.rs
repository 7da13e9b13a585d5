//! Broadcast fan-out
//!
//! `publish` matches one event against every live connection and pushes a
//! frame to each match. Delivery is best-effort, at-most-once: a failed push
//! tears that connection down and never blocks delivery to the others.

use std::sync::Arc;

use crate::event::BookingEvent;
use crate::hub::frame::PushFrame;
use crate::lifecycle::ConnectionManager;

/// Fans domain events out to all matching live connections
pub struct BroadcastHub {
    manager: Arc<ConnectionManager>,
}

impl BroadcastHub {
    /// Create a hub that delivers through the given manager's registry
    pub fn new(manager: Arc<ConnectionManager>) -> Self {
        Self { manager }
    }

    /// Deliver an event to every matching connection.
    ///
    /// Returns the number of successful deliveries. Connections whose push
    /// fails are closed after the sweep; the failure is isolated and the
    /// remaining connections still receive the event.
    pub async fn publish(&self, event: &BookingEvent) -> usize {
        let frame = match PushFrame::event(event) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(
                    event_type = %event.event_type,
                    error = %e,
                    "Failed to serialize event, dropping"
                );
                return 0;
            }
        };

        let connections = self.manager.registry().all().await;
        let mut delivered = 0;
        let mut broken = Vec::new();

        for (id, entry) in connections {
            let connection = entry.read().await;
            if !connection.matches(event) {
                continue;
            }

            match connection.try_push(frame.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::warn!(
                        connection_id = %id,
                        event_type = %event.event_type,
                        error = %e,
                        "Delivery failed, closing connection"
                    );
                    broken.push(id);
                }
            }
        }

        for id in broken {
            self.manager.close_connection(id).await;
        }

        tracing::debug!(
            event_type = %event.event_type,
            booking_id = %event.booking_id,
            delivered,
            "Broadcast complete"
        );

        delivered
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use proptest::prelude::*;
    use tokio::sync::mpsc;

    use super::*;
    use crate::config::HubConfig;
    use crate::event::{BookingEvent, EventPriority, EventType};
    use crate::hub::frame::EVENT_CONNECTED;
    use crate::registry::{Preferences, SubscriptionAction, SubscriptionFilters};

    fn setup() -> (Arc<ConnectionManager>, BroadcastHub) {
        let manager = Arc::new(ConnectionManager::new(HubConfig::default()));
        let hub = BroadcastHub::new(Arc::clone(&manager));
        (manager, hub)
    }

    async fn drain_connected(rx: &mut mpsc::Receiver<PushFrame>) {
        let frame = rx.recv().await.expect("connected frame");
        assert_eq!(frame.event, EVENT_CONNECTED);
    }

    #[tokio::test]
    async fn test_scenario_payment_event_for_subscribed_booking() {
        let (manager, hub) = setup();

        let filters = SubscriptionFilters::for_bookings(["b1"])
            .event_types([EventType::PaymentCompleted]);
        let (_id, mut rx) = manager.open_connection("user_1", filters).await;
        drain_connected(&mut rx).await;

        let event = BookingEvent::new(EventType::PaymentCompleted, "b1", "user_1")
            .with_priority(EventPriority::High);
        assert_eq!(hub.publish(&event).await, 1);

        let frame = rx.recv().await.unwrap();
        assert_eq!(frame.event, "booking-payment_completed");
        assert_eq!(frame.id, event.id);

        // Same event class for an unsubscribed booking: zero frames
        let other = BookingEvent::new(EventType::PaymentCompleted, "b2", "user_1");
        assert_eq!(hub.publish(&other).await, 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_ownership_isolation() {
        let (manager, hub) = setup();

        let (_id, mut rx) = manager
            .open_connection("user_1", SubscriptionFilters::for_bookings(["b1"]))
            .await;
        drain_connected(&mut rx).await;

        // Subscription overlaps, owner differs: never delivered
        let event = BookingEvent::new(EventType::BookingConfirmed, "b1", "user_2");
        assert_eq!(hub.publish(&event).await, 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_subscription_lifecycle() {
        let (manager, hub) = setup();

        let (id, mut rx) = manager
            .open_connection("user_1", SubscriptionFilters::default())
            .await;
        drain_connected(&mut rx).await;

        let event = BookingEvent::new(EventType::BookingConfirmed, "b1", "user_1");
        assert_eq!(hub.publish(&event).await, 0);

        manager
            .registry()
            .apply(
                id,
                "user_1",
                &SubscriptionAction::SubscribeBookings(vec!["b1".into()]),
            )
            .await
            .unwrap();
        assert_eq!(hub.publish(&event).await, 1);
        assert!(rx.recv().await.is_some());

        manager
            .registry()
            .apply(
                id,
                "user_1",
                &SubscriptionAction::UnsubscribeBookings(vec!["b1".into()]),
            )
            .await
            .unwrap();
        assert_eq!(hub.publish(&event).await, 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_isolated_delivery_failure() {
        let (manager, hub) = setup();

        let (broken_id, rx1) = manager
            .open_connection("user_1", SubscriptionFilters::for_bookings(["b1"]))
            .await;
        let (_healthy_id, mut rx2) = manager
            .open_connection("user_1", SubscriptionFilters::for_bookings(["b1"]))
            .await;
        drain_connected(&mut rx2).await;

        // Break the first stream
        drop(rx1);

        let event = BookingEvent::new(EventType::BookingConfirmed, "b1", "user_1");
        assert_eq!(hub.publish(&event).await, 1);

        // Broken connection was torn down, healthy one delivered
        assert_eq!(manager.registry().connection_count().await, 1);
        assert!(manager.registry().get(broken_id).await.is_none());
        let frame = rx2.recv().await.unwrap();
        assert_eq!(frame.event, "booking-booking_confirmed");
    }

    #[tokio::test]
    async fn test_preference_gate_blocks_delivery() {
        let (manager, hub) = setup();

        let filters = SubscriptionFilters::for_bookings(["b1"]).preferences(Preferences {
            receive_payment_updates: false,
            ..Default::default()
        });
        let (_id, mut rx) = manager.open_connection("user_1", filters).await;
        drain_connected(&mut rx).await;

        let payment = BookingEvent::new(EventType::PaymentCompleted, "b1", "user_1");
        assert_eq!(hub.publish(&payment).await, 0);

        let status = BookingEvent::new(EventType::BookingConfirmed, "b1", "user_1");
        assert_eq!(hub.publish(&status).await, 1);
    }

    #[tokio::test]
    async fn test_trip_subscription_delivery() {
        let (manager, hub) = setup();

        let (_id, mut rx) = manager
            .open_connection("user_1", SubscriptionFilters::for_trips(["t1"]))
            .await;
        drain_connected(&mut rx).await;

        let event =
            BookingEvent::new(EventType::TripStatusChanged, "unrelated", "user_1").with_trip("t1");
        assert_eq!(hub.publish(&event).await, 1);

        let frame = rx.recv().await.unwrap();
        assert_eq!(frame.event, "booking-trip_status_changed");
    }

    // Property: publish(e) delivers to c iff matches(c, e), over randomly
    // generated connection/event pairs drawn from small id pools.
    proptest! {
        #![proptest_config(ProptestConfig::with_cases(128))]

        #[test]
        fn prop_publish_delivers_iff_matches(
            conn_owner in 0..3usize,
            event_owner in 0..3usize,
            sub_bookings in proptest::collection::hash_set(0..4usize, 0..3),
            sub_trips in proptest::collection::hash_set(0..4usize, 0..3),
            allowed in proptest::collection::hash_set(0..10usize, 0..10),
            prefs in proptest::array::uniform4(any::<bool>()),
            event_kind in 0..10usize,
            event_booking in 0..4usize,
            event_trip in proptest::option::of(0..4usize),
        ) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();

            rt.block_on(async move {
                let (manager, hub) = setup();

                let filters = SubscriptionFilters {
                    booking_ids: sub_bookings.iter().map(|i| format!("b{i}")).collect(),
                    trip_ids: sub_trips.iter().map(|i| format!("t{i}")).collect(),
                    event_types: allowed.iter().map(|i| EventType::ALL[*i]).collect(),
                    preferences: Preferences {
                        receive_payment_updates: prefs[0],
                        receive_status_updates: prefs[1],
                        receive_reminders: prefs[2],
                        receive_weather_alerts: prefs[3],
                    },
                };
                let (id, mut rx) = manager
                    .open_connection(format!("user_{conn_owner}"), filters)
                    .await;
                drain_connected(&mut rx).await;

                let mut event = BookingEvent::new(
                    EventType::ALL[event_kind],
                    format!("b{event_booking}"),
                    format!("user_{event_owner}"),
                );
                if let Some(trip) = event_trip {
                    event = event.with_trip(format!("t{trip}"));
                }

                let expected = {
                    let entry = manager.registry().get(id).await.unwrap();
                    let connection = entry.read().await;
                    connection.matches(&event)
                };

                let delivered = hub.publish(&event).await;
                assert_eq!(delivered, usize::from(expected));
                assert_eq!(rx.try_recv().is_ok(), expected);
            });
        }
    }
}
