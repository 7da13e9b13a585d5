//! Trip phase state machine
//!
//! Three time-boxed lifecycle stages, each bound to its own communication
//! channel. Automatic progression is monotonic (preparation → live → debrief,
//! debrief terminal); manual transitions may target any phase for corrective
//! operations.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle stage of a trip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TripPhase {
    /// Before the trip date
    Preparation,
    /// Departure day
    Live,
    /// After the trip
    Debrief,
}

impl TripPhase {
    /// All phases, in lifecycle order.
    pub const ALL: [TripPhase; 3] = [TripPhase::Preparation, TripPhase::Live, TripPhase::Debrief];

    /// Wire name of this phase (matches the serde representation).
    pub fn as_str(&self) -> &'static str {
        match self {
            TripPhase::Preparation => "preparation",
            TripPhase::Live => "live",
            TripPhase::Debrief => "debrief",
        }
    }

    /// Next phase under automatic progression; `None` once debrief is
    /// reached (terminal for time-driven transitions)
    pub fn next(&self) -> Option<TripPhase> {
        match self {
            TripPhase::Preparation => Some(TripPhase::Live),
            TripPhase::Live => Some(TripPhase::Debrief),
            TripPhase::Debrief => None,
        }
    }

    /// Deterministic channel id for this phase of a trip.
    ///
    /// The fixed naming makes channel provisioning idempotent: re-requesting
    /// creation resolves to the same provider channel.
    pub fn channel_id(&self, trip_id: &str) -> String {
        format!("trip-{trip_id}-{}", self.as_str())
    }

    /// Static channel blueprint for this phase
    pub fn blueprint(&self) -> PhaseBlueprint {
        match self {
            TripPhase::Preparation => PhaseBlueprint {
                title: "Trip preparation",
                description: "Coordinate gear, logistics, and questions before departure",
                features: &["checklist", "qna", "polls"],
                welcome_message: Some(
                    "Welcome aboard! This is your preparation channel — \
                     introductions, checklists, and questions go here.",
                ),
            },
            TripPhase::Live => PhaseBlueprint {
                title: "Live trip",
                description: "Real-time updates and coordination on departure day",
                features: &["location_sharing", "alerts", "photos"],
                welcome_message: Some(
                    "This channel opens on departure day for real-time coordination.",
                ),
            },
            TripPhase::Debrief => PhaseBlueprint {
                title: "Trip debrief",
                description: "Photos, feedback, and wrap-up after the trip",
                features: &["photos", "reviews"],
                welcome_message: None,
            },
        }
    }

    /// System message announcing a transition into this phase
    pub fn transition_announcement(&self) -> &'static str {
        match self {
            TripPhase::Preparation => {
                "The trip is back in preparation. This channel is open for coordination."
            }
            TripPhase::Live => "The trip is live! This channel is now open for real-time updates.",
            TripPhase::Debrief => {
                "The trip has wrapped up. Share photos and feedback in the debrief."
            }
        }
    }
}

impl std::fmt::Display for TripPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static per-phase channel configuration
#[derive(Debug, Clone, Copy)]
pub struct PhaseBlueprint {
    /// Channel title
    pub title: &'static str,
    /// Channel description
    pub description: &'static str,
    /// Feature flags enabled on the channel
    pub features: &'static [&'static str],
    /// Auto-message posted when the channel is created, if any
    pub welcome_message: Option<&'static str>,
}

/// Compute the phase a trip is in at `now`.
///
/// Preparation strictly before the trip date, live from the trip date until
/// one day after it, debrief from then on. The boundary at exactly one day
/// past the trip date is exclusive: it already flips to debrief.
pub fn compute_current_phase(trip_date: DateTime<Utc>, now: DateTime<Utc>) -> TripPhase {
    let diff = trip_date.signed_duration_since(now);

    if diff > Duration::zero() {
        TripPhase::Preparation
    } else if diff > Duration::days(-1) {
        TripPhase::Live
    } else {
        TripPhase::Debrief
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trip_date() -> DateTime<Utc> {
        "2026-07-10T08:00:00Z".parse().unwrap()
    }

    #[test]
    fn test_phase_progression_over_time() {
        let date = trip_date();

        assert_eq!(
            compute_current_phase(date, date - Duration::days(2)),
            TripPhase::Preparation
        );
        assert_eq!(compute_current_phase(date, date), TripPhase::Live);
        assert_eq!(
            compute_current_phase(date, date + Duration::days(2)),
            TripPhase::Debrief
        );
    }

    #[test]
    fn test_live_window_boundaries() {
        let date = trip_date();

        // One second before the trip date is still preparation
        assert_eq!(
            compute_current_phase(date, date - Duration::seconds(1)),
            TripPhase::Preparation
        );
        // Just inside the one-day window
        assert_eq!(
            compute_current_phase(date, date + Duration::days(1) - Duration::seconds(1)),
            TripPhase::Live
        );
        // Exactly one day past the trip date flips to debrief
        assert_eq!(
            compute_current_phase(date, date + Duration::days(1)),
            TripPhase::Debrief
        );
    }

    #[test]
    fn test_automatic_progression_is_monotonic() {
        assert_eq!(TripPhase::Preparation.next(), Some(TripPhase::Live));
        assert_eq!(TripPhase::Live.next(), Some(TripPhase::Debrief));
        assert_eq!(TripPhase::Debrief.next(), None);
    }

    #[test]
    fn test_channel_ids_are_deterministic() {
        assert_eq!(
            TripPhase::Preparation.channel_id("t1"),
            "trip-t1-preparation"
        );
        assert_eq!(TripPhase::Live.channel_id("t1"), "trip-t1-live");
        assert_eq!(TripPhase::Debrief.channel_id("t1"), "trip-t1-debrief");
    }

    #[test]
    fn test_only_debrief_has_no_welcome() {
        assert!(TripPhase::Preparation.blueprint().welcome_message.is_some());
        assert!(TripPhase::Live.blueprint().welcome_message.is_some());
        assert!(TripPhase::Debrief.blueprint().welcome_message.is_none());
    }
}
