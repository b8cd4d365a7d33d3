//! Platform seam for the worker.
//!
//! The worker loop only talks to Discord through [`Gateway`] and only sees
//! platform callbacks as [`WorkerEvent`] snapshots, so its queue servicing,
//! caching and translation logic run the same against serenity or a test double.

use std::fmt;

use async_trait::async_trait;

use crate::common::error::WorkerResult;
use crate::common::OutboundMessage;

/// Outgoing operations the worker needs from the chat platform.
#[async_trait]
pub trait Gateway: Clone + Send + Sync + 'static {
    /// Live handle to a user or channel that can be sent to.
    type Destination: Clone + fmt::Debug + Send + Sync;
    /// Platform handle used to acknowledge a button press.
    type Interaction: fmt::Debug + Send + Sync;

    /// Fetch a user by id. `None` when the user cannot be accessed.
    async fn fetch_user(&self, id: u64) -> Option<Self::Destination>;

    /// Fetch a channel by id. `None` when the channel cannot be accessed.
    async fn fetch_channel(&self, id: u64) -> Option<Self::Destination>;

    /// Send a message. A `None` destination is still handed over and fails here.
    async fn send(
        &self,
        destination: Option<&Self::Destination>,
        message: OutboundMessage,
    ) -> WorkerResult<()>;

    /// Plain text reply into the channel a command was invoked from.
    async fn reply(&self, channel_id: u64, content: &str) -> WorkerResult<()>;

    /// Acknowledge a button press so the client stops showing it as pending.
    async fn acknowledge(&self, interaction: &Self::Interaction) -> WorkerResult<()>;

    /// Ids of the most recent messages in a channel, newest first.
    async fn recent_messages(&self, channel_id: u64, limit: usize) -> WorkerResult<Vec<u64>>;

    async fn delete_message(&self, channel_id: u64, message_id: u64) -> WorkerResult<()>;
}

/// Flat copy of a platform message, taken inside the platform callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageSnapshot {
    pub id: u64,
    pub author_id: u64,
    pub author_name: String,
    pub author_nick: Option<String>,
    pub author_is_bot: bool,
    pub channel_id: u64,
    /// `None` for direct messages.
    pub channel_name: Option<String>,
    /// `None` for direct messages.
    pub guild_id: Option<u64>,
    pub guild_name: Option<String>,
    pub content: String,
}

impl MessageSnapshot {
    pub fn is_direct(&self) -> bool {
        self.guild_id.is_none()
    }
}

/// A press of a button the worker attached to one of its messages.
#[derive(Debug, Clone)]
pub struct ButtonPress<I> {
    pub id_btn: String,
    pub user_id: u64,
    pub user_name: String,
    pub channel_id: u64,
    pub interaction: I,
}

/// Platform callbacks, delivered to the worker loop in arrival order.
#[derive(Debug)]
pub enum WorkerEvent<I> {
    /// Connected and ready.
    Ready { user_name: String },
    /// New message.
    Message(MessageSnapshot),
    /// Edited message, as it reads after the edit.
    MessageEdit { id_prev: u64, message: MessageSnapshot },
    /// Button press on a worker message.
    ButtonPress(ButtonPress<I>),
    Disconnected,
}
