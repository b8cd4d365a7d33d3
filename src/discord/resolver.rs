//! Destination lookup with a per-process cache.

use std::collections::HashMap;

use tracing::{debug, error};

use crate::common::Target;
use crate::discord::gateway::Gateway;

/// Caches fetched users and channels by id.
///
/// Each id is fetched at most once. Failed lookups are cached too, so a
/// destination that was unreachable once stays unresolved for the lifetime
/// of the worker. Entries are never evicted.
#[derive(Debug)]
pub struct DestinationResolver<D> {
    users: HashMap<u64, Option<D>>,
    channels: HashMap<u64, Option<D>>,
}

impl<D> Default for DestinationResolver<D> {
    fn default() -> Self {
        Self {
            users: HashMap::new(),
            channels: HashMap::new(),
        }
    }
}

impl<D: Clone> DestinationResolver<D> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a target, fetching it on first use.
    pub async fn resolve<G>(&mut self, gateway: &G, target: Target) -> Option<D>
    where
        G: Gateway<Destination = D>,
    {
        match target {
            Target::Dm { id_user } => {
                if let Some(cached) = self.users.get(&id_user) {
                    return cached.clone();
                }
                let fetched = gateway.fetch_user(id_user).await;
                if fetched.is_none() {
                    error!("Unable to access user: {}. Please check permissions.", id_user);
                } else {
                    debug!("Cached user {}", id_user);
                }
                self.users.insert(id_user, fetched.clone());
                fetched
            }
            Target::Msg { id_channel } => {
                if let Some(cached) = self.channels.get(&id_channel) {
                    return cached.clone();
                }
                let fetched = gateway.fetch_channel(id_channel).await;
                if fetched.is_none() {
                    error!(
                        "Unable to access channel: {}. Please check permissions.",
                        id_channel
                    );
                } else {
                    debug!("Cached channel {}", id_channel);
                }
                self.channels.insert(id_channel, fetched.clone());
                fetched
            }
        }
    }

    pub fn cached_users(&self) -> usize {
        self.users.len()
    }

    pub fn cached_channels(&self) -> usize {
        self.channels.len()
    }
}
