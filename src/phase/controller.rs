//! Phase controller
//!
//! Provisions the three phase channels of a trip, answers read-only channel
//! queries, and drives phase transitions: exactly one phase channel is
//! unfrozen at any time, and a completed transition is announced to the
//! channel and broadcast to subscribed clients.

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::json;

use crate::event::{BookingEvent, EventPriority, EventType};
use crate::hub::BroadcastHub;

use super::error::PhaseError;
use super::phase::TripPhase;
use super::provider::{
    ChannelMetadata, ChannelProvider, ChannelUpdate, CreateChannelRequest, ProviderChannel,
};

/// State of one phase channel, as seen by callers
#[derive(Debug, Clone)]
pub struct PhaseChannelDescriptor {
    /// Channel id at the provider
    pub channel_id: String,
    /// Phase the channel is bound to
    pub phase: TripPhase,
    /// Whether the channel is read-only
    pub frozen: bool,
    /// Whether the channel exists at the provider yet
    pub provisioned: bool,
    /// Current members (empty for unprovisioned placeholders)
    pub members: Vec<String>,
}

impl PhaseChannelDescriptor {
    fn from_channel(phase: TripPhase, channel: ProviderChannel) -> Self {
        Self {
            channel_id: channel.id,
            phase,
            frozen: channel.frozen,
            provisioned: true,
            members: channel.members,
        }
    }

    /// Placeholder for a channel that has not been provisioned yet, so a
    /// caller can provision lazily instead of handling an error
    fn placeholder(trip_id: &str, phase: TripPhase) -> Self {
        Self {
            channel_id: phase.channel_id(trip_id),
            phase,
            frozen: true,
            provisioned: false,
            members: Vec::new(),
        }
    }
}

/// The three phase channels of a trip
#[derive(Debug, Clone)]
pub struct PhaseChannelSet {
    pub preparation: PhaseChannelDescriptor,
    pub live: PhaseChannelDescriptor,
    pub debrief: PhaseChannelDescriptor,
}

impl PhaseChannelSet {
    /// Descriptor for the given phase
    pub fn get(&self, phase: TripPhase) -> &PhaseChannelDescriptor {
        match phase {
            TripPhase::Preparation => &self.preparation,
            TripPhase::Live => &self.live,
            TripPhase::Debrief => &self.debrief,
        }
    }

    /// The phase whose channel is unfrozen, if any.
    ///
    /// At most one phase is active per trip; this returns the first unfrozen
    /// provisioned channel in lifecycle order.
    pub fn active_phase(&self) -> Option<TripPhase> {
        TripPhase::ALL
            .into_iter()
            .find(|phase| {
                let descriptor = self.get(*phase);
                descriptor.provisioned && !descriptor.frozen
            })
    }
}

/// Outcome of a phase transition
#[derive(Debug, Clone)]
pub struct TransitionReport {
    /// Trip that transitioned
    pub trip_id: String,
    /// Phase that was made active
    pub target: TripPhase,
    /// Whether the target channel was successfully unfrozen
    pub unfroze_target: bool,
    /// Phases whose channel update failed and was skipped
    pub failed: Vec<TripPhase>,
    /// Number of status-change frames delivered to subscribed clients
    pub notified: usize,
}

/// Governs which phase channel of a trip is live
pub struct PhaseController<P: ChannelProvider> {
    provider: Arc<P>,
    hub: Arc<BroadcastHub>,
}

impl<P: ChannelProvider> PhaseController<P> {
    /// Create a controller over the given provider and broadcast hub
    pub fn new(provider: Arc<P>, hub: Arc<BroadcastHub>) -> Self {
        Self { provider, hub }
    }

    /// Provision the three phase channels for a trip.
    ///
    /// Membership is seeded with the deduplicated union of the captain and
    /// the confirmed participants. Channels that already exist are reused
    /// (idempotent). Only the preparation channel starts unfrozen. If any
    /// channel's creation fails the whole call aborts: partial phase coverage
    /// is unacceptable, and the deterministic channel ids make retrying the
    /// entire operation safe.
    pub async fn provision_phase_channels(
        &self,
        trip_id: &str,
        captain: &str,
        participants: &[String],
    ) -> Result<PhaseChannelSet, PhaseError> {
        let members = dedupe_members(captain, participants);

        Ok(PhaseChannelSet {
            preparation: self
                .provision_phase(trip_id, TripPhase::Preparation, &members)
                .await?,
            live: self.provision_phase(trip_id, TripPhase::Live, &members).await?,
            debrief: self
                .provision_phase(trip_id, TripPhase::Debrief, &members)
                .await?,
        })
    }

    /// Provision one phase channel, reusing it when it already exists
    async fn provision_phase(
        &self,
        trip_id: &str,
        phase: TripPhase,
        members: &[String],
    ) -> Result<PhaseChannelDescriptor, PhaseError> {
        let channel_id = phase.channel_id(trip_id);

        if let Some(existing) = self.provider.query_channel(&channel_id).await? {
            tracing::debug!(
                trip_id = %trip_id,
                phase = %phase,
                "Phase channel already provisioned, reusing"
            );
            return Ok(PhaseChannelDescriptor::from_channel(phase, existing));
        }

        let blueprint = phase.blueprint();
        let request = CreateChannelRequest {
            id: channel_id.clone(),
            metadata: ChannelMetadata {
                trip_id: trip_id.to_string(),
                phase,
                title: blueprint.title.to_string(),
                description: blueprint.description.to_string(),
                features: blueprint.features.iter().map(|s| s.to_string()).collect(),
            },
            members: members.to_vec(),
            frozen: phase != TripPhase::Preparation,
        };

        let channel = self.provider.create_channel(request).await.map_err(|source| {
            tracing::error!(
                trip_id = %trip_id,
                phase = %phase,
                error = %source,
                "Phase channel creation failed, aborting provisioning"
            );
            PhaseError::Provisioning {
                trip_id: trip_id.to_string(),
                phase,
                source,
            }
        })?;

        if let Some(welcome) = blueprint.welcome_message {
            let metadata = json!({ "kind": "welcome", "phase": phase.as_str() });
            if let Err(e) = self
                .provider
                .send_system_message(&channel_id, welcome, metadata)
                .await
            {
                tracing::warn!(
                    channel_id = %channel_id,
                    error = %e,
                    "Welcome message failed"
                );
            }
        }

        tracing::info!(
            trip_id = %trip_id,
            phase = %phase,
            members = members.len(),
            frozen = phase != TripPhase::Preparation,
            "Phase channel created"
        );

        Ok(PhaseChannelDescriptor::from_channel(phase, channel))
    }

    /// Read-only view of a trip's phase channels.
    ///
    /// Idempotent; phases without a provisioned channel yield a placeholder
    /// descriptor rather than an error.
    pub async fn get_phase_channels(&self, trip_id: &str) -> Result<PhaseChannelSet, PhaseError> {
        Ok(PhaseChannelSet {
            preparation: self.describe_phase(trip_id, TripPhase::Preparation).await?,
            live: self.describe_phase(trip_id, TripPhase::Live).await?,
            debrief: self.describe_phase(trip_id, TripPhase::Debrief).await?,
        })
    }

    async fn describe_phase(
        &self,
        trip_id: &str,
        phase: TripPhase,
    ) -> Result<PhaseChannelDescriptor, PhaseError> {
        let channel_id = phase.channel_id(trip_id);

        Ok(match self.provider.query_channel(&channel_id).await? {
            Some(channel) => PhaseChannelDescriptor::from_channel(phase, channel),
            None => PhaseChannelDescriptor::placeholder(trip_id, phase),
        })
    }

    /// Transition a trip to `target`: unfreeze the target phase channel and
    /// freeze the other two.
    ///
    /// Each per-channel update is attempted independently; a failure is
    /// logged and skipped so one broken channel never blocks the others. When
    /// the target channel was unfrozen, a system message announces the phase
    /// change in it and a `trip_status_changed` event is broadcast to every
    /// channel member's subscribed connections.
    pub async fn transition_to(
        &self,
        trip_id: &str,
        target: TripPhase,
    ) -> Result<TransitionReport, PhaseError> {
        let mut report = TransitionReport {
            trip_id: trip_id.to_string(),
            target,
            unfroze_target: false,
            failed: Vec::new(),
            notified: 0,
        };
        let mut target_members = Vec::new();

        for phase in TripPhase::ALL {
            let channel_id = phase.channel_id(trip_id);
            let unfreeze = phase == target;

            match self
                .provider
                .update_channel(&channel_id, ChannelUpdate::freeze(!unfreeze))
                .await
            {
                Ok(channel) => {
                    if unfreeze {
                        report.unfroze_target = true;
                        target_members = channel.members;

                        let metadata =
                            json!({ "kind": "phase_transition", "phase": target.as_str() });
                        if let Err(e) = self
                            .provider
                            .send_system_message(
                                &channel_id,
                                target.transition_announcement(),
                                metadata,
                            )
                            .await
                        {
                            tracing::warn!(
                                channel_id = %channel_id,
                                error = %e,
                                "Transition announcement failed"
                            );
                        }
                    }
                }
                Err(e) => {
                    // Transient per-channel failure: skip, keep going
                    tracing::warn!(
                        channel_id = %channel_id,
                        phase = %phase,
                        error = %e,
                        "Phase channel update failed, skipping"
                    );
                    report.failed.push(phase);
                }
            }
        }

        if report.unfroze_target {
            report.notified = self.notify_members(trip_id, target, &target_members).await;
            tracing::info!(
                trip_id = %trip_id,
                phase = %target,
                notified = report.notified,
                failed = report.failed.len(),
                "Trip phase transitioned"
            );
        }

        Ok(report)
    }

    /// Broadcast the phase change to each distinct channel member
    async fn notify_members(
        &self,
        trip_id: &str,
        target: TripPhase,
        members: &[String],
    ) -> usize {
        let mut seen = HashSet::new();
        let mut delivered = 0;

        for member in members {
            if !seen.insert(member.as_str()) {
                continue;
            }

            let event = BookingEvent::new(EventType::TripStatusChanged, trip_id, member)
                .with_trip(trip_id)
                .with_payload(json!({ "tripId": trip_id, "phase": target.as_str() }))
                .with_priority(EventPriority::Medium);

            delivered += self.hub.publish(&event).await;
        }

        delivered
    }
}

/// Union of captain and participants, deduplicated, captain first
fn dedupe_members(captain: &str, participants: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut members = Vec::with_capacity(participants.len() + 1);

    seen.insert(captain);
    members.push(captain.to_string());

    for participant in participants {
        if seen.insert(participant.as_str()) {
            members.push(participant.clone());
        }
    }

    members
}
