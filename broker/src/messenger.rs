// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! Outbound chat delivery.
//!
//! The handler never talks to a chat service directly. It is given a
//! [`Messenger`] and the [`ChannelKind`] of the inbound request, and decides
//! what goes where. [`DeliveryLog`] records deliveries so the HTTP layer can
//! hand them back to the chat adapter.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

/// Where the triggering request was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    /// one-to-one conversation with the bot
    Private,
    /// group room visible to other members
    Shared,
}

/// The person who issued a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requester {
    /// display handle, used for mentions and cool-down keys
    pub nick: String,
    /// chat user id, used to address private messages
    pub user_id: String,
}

/// Origin of a request: who sent it, over which kind of channel, and the room
/// for shared channels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub requester: Requester,
    pub channel: ChannelKind,
    pub room: Option<String>,
}

impl RequestContext {
    pub fn private(requester: Requester) -> Self {
        Self {
            requester,
            channel: ChannelKind::Private,
            room: None,
        }
    }

    pub fn shared(requester: Requester, room: impl Into<String>) -> Self {
        Self {
            requester,
            channel: ChannelKind::Shared,
            room: Some(room.into()),
        }
    }

    pub fn is_shared(&self) -> bool {
        self.channel == ChannelKind::Shared
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Delivery {
    Direct { recipient: String, text: String },
    Room { room: String, text: String },
}

#[async_trait]
pub trait Messenger: Send + Sync {
    /// Sends a private message to the requester.
    async fn send_direct(&self, requester: &Requester, text: String);

    /// Posts a message into a shared room.
    async fn say(&self, room: &str, text: String);
}

/// A [`Messenger`] that keeps deliveries in memory, in order.
#[derive(Debug, Default)]
pub struct DeliveryLog {
    deliveries: Mutex<Vec<Delivery>>,
}

impl DeliveryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_deliveries(self) -> Vec<Delivery> {
        self.deliveries.into_inner()
    }
}

#[async_trait]
impl Messenger for DeliveryLog {
    async fn send_direct(&self, requester: &Requester, text: String) {
        tracing::debug!("[broker] direct message to {}", requester.nick);
        self.deliveries.lock().await.push(Delivery::Direct {
            recipient: requester.user_id.clone(),
            text,
        });
    }

    async fn say(&self, room: &str, text: String) {
        tracing::debug!("[broker] room message to {}", room);
        self.deliveries.lock().await.push(Delivery::Room {
            room: room.to_string(),
            text,
        });
    }
}
