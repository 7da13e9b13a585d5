//! End-to-end demo: open a connection, provision a trip, publish events,
//! and drive a phase transition.
//!
//! Run with: `cargo run --example notify_demo`

use std::sync::Arc;

use tripcast::config::HubConfig;
use tripcast::event::{BookingEvent, EventPriority, EventType};
use tripcast::hub::BroadcastHub;
use tripcast::lifecycle::ConnectionManager;
use tripcast::phase::{InMemoryChannelProvider, PhaseController, TripPhase};
use tripcast::registry::SubscriptionFilters;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tripcast=debug".into()),
        )
        .init();

    let manager = Arc::new(ConnectionManager::new(HubConfig::default()));
    let hub = Arc::new(BroadcastHub::new(Arc::clone(&manager)));
    let provider = Arc::new(InMemoryChannelProvider::new());
    let controller = PhaseController::new(Arc::clone(&provider), Arc::clone(&hub));

    let _reaper = manager.spawn_reaper_task();

    // The captain listens for events on their booking and trip
    let mut filters = SubscriptionFilters::for_bookings(["b1"]);
    filters.trip_ids = vec!["t1".into()];
    let (connection_id, mut rx) = manager.open_connection("captain_1", filters).await;
    println!("opened connection {connection_id}");

    // Trip gets its three phase channels
    let set = controller
        .provision_phase_channels("t1", "captain_1", &["guest_1".into(), "guest_2".into()])
        .await?;
    println!(
        "provisioned channels, active phase: {:?}",
        set.active_phase()
    );

    // A booking workflow publishes a confirmation
    let event = BookingEvent::new(EventType::BookingConfirmed, "b1", "captain_1")
        .with_trip("t1")
        .with_priority(EventPriority::High);
    let delivered = hub.publish(&event).await;
    println!("booking_confirmed delivered to {delivered} connection(s)");

    // Departure day: the trip goes live
    let report = controller.transition_to("t1", TripPhase::Live).await?;
    println!(
        "transitioned to {}, notified {} subscriber(s)",
        report.target, report.notified
    );

    // Drain what the client has received so far
    while let Ok(frame) = rx.try_recv() {
        println!("frame {} -> {}", frame.event, frame.data);
    }

    manager.close_connection(connection_id).await;
    Ok(())
}
