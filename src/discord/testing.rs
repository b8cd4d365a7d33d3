//! Recording gateway used by the worker tests.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::common::error::{WorkerError, WorkerResult};
use crate::common::logging::LogBuffer;
use crate::common::OutboundMessage;
use crate::discord::gateway::Gateway;

#[derive(Debug, Default)]
pub struct MockState {
    pub user_fetches: Vec<u64>,
    pub channel_fetches: Vec<u64>,
    pub sends: Vec<(Option<String>, OutboundMessage)>,
    pub replies: Vec<(u64, String)>,
    pub acknowledged: Vec<u64>,
    pub deleted: Vec<(u64, u64)>,
    /// Message ids returned by `recent_messages`, newest first.
    pub history: Vec<u64>,
    /// Ids whose fetch fails.
    pub unreachable: HashSet<u64>,
    pub fail_deletes: bool,
    /// Buffer whose contents are recorded on every send.
    pub watched_log: Option<LogBuffer>,
    pub log_at_send: Vec<String>,
}

/// Gateway double. Destinations are strings like `user:42` or `channel:7`,
/// interactions are plain ids.
#[derive(Debug, Clone, Default)]
pub struct MockGateway {
    state: Arc<Mutex<MockState>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_unreachable(ids: &[u64]) -> Self {
        let gateway = Self::new();
        gateway.state().unreachable.extend(ids.iter().copied());
        gateway
    }

    pub fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }
}

#[async_trait]
impl Gateway for MockGateway {
    type Destination = String;
    type Interaction = u64;

    async fn fetch_user(&self, id: u64) -> Option<String> {
        let mut state = self.state();
        state.user_fetches.push(id);
        (!state.unreachable.contains(&id)).then(|| format!("user:{}", id))
    }

    async fn fetch_channel(&self, id: u64) -> Option<String> {
        let mut state = self.state();
        state.channel_fetches.push(id);
        (!state.unreachable.contains(&id)).then(|| format!("channel:{}", id))
    }

    async fn send(&self, destination: Option<&String>, message: OutboundMessage) -> WorkerResult<()> {
        let mut state = self.state();
        if let Some(log) = state.watched_log.clone() {
            state.log_at_send.push(log.contents());
        }
        state.sends.push((destination.cloned(), message));
        match destination {
            Some(_) => Ok(()),
            None => Err(WorkerError::UnresolvedDestination),
        }
    }

    async fn reply(&self, channel_id: u64, content: &str) -> WorkerResult<()> {
        self.state().replies.push((channel_id, content.to_string()));
        Ok(())
    }

    async fn acknowledge(&self, interaction: &u64) -> WorkerResult<()> {
        self.state().acknowledged.push(*interaction);
        Ok(())
    }

    async fn recent_messages(&self, _channel_id: u64, limit: usize) -> WorkerResult<Vec<u64>> {
        Ok(self.state().history.iter().take(limit).copied().collect())
    }

    async fn delete_message(&self, channel_id: u64, message_id: u64) -> WorkerResult<()> {
        let mut state = self.state();
        if state.fail_deletes {
            return Err(WorkerError::Platform {
                message: "Missing Permissions".to_string(),
            });
        }
        state.deleted.push((channel_id, message_id));
        Ok(())
    }
}
