//! Channel provider abstraction
//!
//! The phase controller talks to the external chat backend only through the
//! [`ChannelProvider`] trait, never a concrete vendor. An in-memory provider
//! is included for demos and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::RwLock;

use super::phase::TripPhase;

/// Error type for channel provider operations
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// The channel does not exist at the provider
    #[error("channel not found: {0}")]
    ChannelNotFound(String),

    /// The channel already exists at the provider
    #[error("channel already exists: {0}")]
    ChannelExists(String),

    /// The provider backend failed or is unreachable
    #[error("channel provider unavailable: {0}")]
    Unavailable(String),
}

/// Descriptive metadata attached to a phase channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelMetadata {
    /// Trip the channel belongs to
    pub trip_id: String,
    /// Phase the channel is bound to
    pub phase: TripPhase,
    /// Channel title
    pub title: String,
    /// Channel description
    pub description: String,
    /// Feature flags enabled on the channel
    pub features: Vec<String>,
}

/// Request to create a channel at the provider
#[derive(Debug, Clone)]
pub struct CreateChannelRequest {
    /// Channel id (deterministic per trip and phase)
    pub id: String,
    /// Channel metadata
    pub metadata: ChannelMetadata,
    /// Initial members
    pub members: Vec<String>,
    /// Whether the channel starts read-only
    pub frozen: bool,
}

/// Partial channel update
#[derive(Debug, Clone, Copy, Default)]
pub struct ChannelUpdate {
    /// New frozen state, if changing
    pub frozen: Option<bool>,
}

impl ChannelUpdate {
    /// Update that only sets the frozen flag
    pub fn freeze(frozen: bool) -> Self {
        Self {
            frozen: Some(frozen),
        }
    }
}

/// A channel as known to the provider
#[derive(Debug, Clone)]
pub struct ProviderChannel {
    /// Channel id
    pub id: String,
    /// Channel metadata
    pub metadata: ChannelMetadata,
    /// Current members
    pub members: Vec<String>,
    /// Whether the channel is read-only
    pub frozen: bool,
}

/// Capability set the phase controller requires from a chat backend
#[async_trait]
pub trait ChannelProvider: Send + Sync {
    /// Create a channel; fails if the id already exists
    async fn create_channel(
        &self,
        request: CreateChannelRequest,
    ) -> Result<ProviderChannel, ProviderError>;

    /// Apply a partial update to an existing channel
    async fn update_channel(
        &self,
        channel_id: &str,
        update: ChannelUpdate,
    ) -> Result<ProviderChannel, ProviderError>;

    /// Post a system message into a channel
    async fn send_system_message(
        &self,
        channel_id: &str,
        text: &str,
        metadata: Value,
    ) -> Result<(), ProviderError>;

    /// Look up a channel; `Ok(None)` when it does not exist
    async fn query_channel(&self, channel_id: &str) -> Result<Option<ProviderChannel>, ProviderError>;
}

/// A system message recorded by the in-memory provider
#[derive(Debug, Clone)]
pub struct SystemMessage {
    /// Message text
    pub text: String,
    /// Structured message metadata
    pub metadata: Value,
}

/// In-memory channel provider for demos and tests
#[derive(Default)]
pub struct InMemoryChannelProvider {
    channels: RwLock<HashMap<String, ProviderChannel>>,
    messages: RwLock<HashMap<String, Vec<SystemMessage>>>,
}

impl InMemoryChannelProvider {
    /// Create an empty provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of channels held by the provider
    pub async fn channel_count(&self) -> usize {
        self.channels.read().await.len()
    }

    /// System messages posted to a channel, in order
    pub async fn system_messages(&self, channel_id: &str) -> Vec<SystemMessage> {
        self.messages
            .read()
            .await
            .get(channel_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl ChannelProvider for InMemoryChannelProvider {
    async fn create_channel(
        &self,
        request: CreateChannelRequest,
    ) -> Result<ProviderChannel, ProviderError> {
        let mut channels = self.channels.write().await;

        if channels.contains_key(&request.id) {
            return Err(ProviderError::ChannelExists(request.id));
        }

        let channel = ProviderChannel {
            id: request.id.clone(),
            metadata: request.metadata,
            members: request.members,
            frozen: request.frozen,
        };
        channels.insert(request.id, channel.clone());

        Ok(channel)
    }

    async fn update_channel(
        &self,
        channel_id: &str,
        update: ChannelUpdate,
    ) -> Result<ProviderChannel, ProviderError> {
        let mut channels = self.channels.write().await;

        let channel = channels
            .get_mut(channel_id)
            .ok_or_else(|| ProviderError::ChannelNotFound(channel_id.to_string()))?;

        if let Some(frozen) = update.frozen {
            channel.frozen = frozen;
        }

        Ok(channel.clone())
    }

    async fn send_system_message(
        &self,
        channel_id: &str,
        text: &str,
        metadata: Value,
    ) -> Result<(), ProviderError> {
        let channels = self.channels.read().await;
        if !channels.contains_key(channel_id) {
            return Err(ProviderError::ChannelNotFound(channel_id.to_string()));
        }
        drop(channels);

        let mut messages = self.messages.write().await;
        messages
            .entry(channel_id.to_string())
            .or_default()
            .push(SystemMessage {
                text: text.to_string(),
                metadata,
            });

        Ok(())
    }

    async fn query_channel(
        &self,
        channel_id: &str,
    ) -> Result<Option<ProviderChannel>, ProviderError> {
        let channels = self.channels.read().await;
        Ok(channels.get(channel_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(id: &str, frozen: bool) -> CreateChannelRequest {
        CreateChannelRequest {
            id: id.to_string(),
            metadata: ChannelMetadata {
                trip_id: "t1".into(),
                phase: TripPhase::Preparation,
                title: "Trip preparation".into(),
                description: "desc".into(),
                features: vec!["checklist".into()],
            },
            members: vec!["cap".into(), "p1".into()],
            frozen,
        }
    }

    #[tokio::test]
    async fn test_create_and_query() {
        let provider = InMemoryChannelProvider::new();

        let created = provider.create_channel(request("c1", true)).await.unwrap();
        assert!(created.frozen);

        let queried = provider.query_channel("c1").await.unwrap().unwrap();
        assert_eq!(queried.members, vec!["cap", "p1"]);

        assert!(provider.query_channel("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_rejects_duplicates() {
        let provider = InMemoryChannelProvider::new();
        provider.create_channel(request("c1", true)).await.unwrap();

        let result = provider.create_channel(request("c1", false)).await;
        assert!(matches!(result, Err(ProviderError::ChannelExists(_))));
    }

    #[tokio::test]
    async fn test_update_frozen_flag() {
        let provider = InMemoryChannelProvider::new();
        provider.create_channel(request("c1", true)).await.unwrap();

        let updated = provider
            .update_channel("c1", ChannelUpdate::freeze(false))
            .await
            .unwrap();
        assert!(!updated.frozen);

        let result = provider
            .update_channel("missing", ChannelUpdate::freeze(true))
            .await;
        assert!(matches!(result, Err(ProviderError::ChannelNotFound(_))));
    }

    #[tokio::test]
    async fn test_system_messages_recorded_in_order() {
        let provider = InMemoryChannelProvider::new();
        provider.create_channel(request("c1", false)).await.unwrap();

        provider
            .send_system_message("c1", "first", json!({"kind": "welcome"}))
            .await
            .unwrap();
        provider
            .send_system_message("c1", "second", json!({"kind": "phase_transition"}))
            .await
            .unwrap();

        let messages = provider.system_messages("c1").await;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].text, "first");
        assert_eq!(messages[1].text, "second");

        let result = provider
            .send_system_message("missing", "x", Value::Null)
            .await;
        assert!(matches!(result, Err(ProviderError::ChannelNotFound(_))));
    }
}
