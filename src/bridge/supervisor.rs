//! Worker startup.
//!
//! Validates configuration, wires the channel set and starts the Discord
//! worker on its own OS thread with its own single-threaded runtime. The
//! thread is never joined: it ends when the host process ends.

use std::future::Future;
use std::thread;

use tracing::info;

use crate::bridge::channels::{ChannelSet, WorkerChannels};
use crate::bridge::host::Bridge;
use crate::common::error::AppError;
use crate::common::logging::{capture_subscriber, LogBuffer};
use crate::config::types::{Config, DiscordConfig};
use crate::config::validate::validate_config;
use crate::discord::client::run_worker;

/// Name given to the worker thread.
pub const WORKER_THREAD_NAME: &str = "discord-worker";

/// Validate `config` and start the Discord worker.
pub fn spawn_worker(config: &Config) -> Result<Bridge, AppError> {
    spawn_worker_with(config, run_worker)
}

/// Validate `config` and start `worker` as the worker body.
pub fn spawn_worker_with<F, Fut>(config: &Config, worker: F) -> Result<Bridge, AppError>
where
    F: FnOnce(DiscordConfig, WorkerChannels, LogBuffer) -> Fut + Send + 'static,
    Fut: Future<Output = ()>,
{
    validate_config(config)?;

    let ChannelSet { host, worker: ends } = ChannelSet::new(config.bridge.queue_capacity);
    let discord = config.discord.clone();

    let handle = thread::Builder::new()
        .name(WORKER_THREAD_NAME.to_string())
        .spawn(move || {
            let buffer = LogBuffer::new();
            let _guard = tracing::subscriber::set_default(capture_subscriber(buffer.clone()));

            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    // The log buffer is only drained by the running worker.
                    eprintln!("Failed to start worker runtime: {}", e);
                    return;
                }
            };

            runtime.block_on(worker(discord, ends, buffer));
        })
        .map_err(AppError::Spawn)?;

    info!(
        "Worker started (queue capacity {}, poll interval {:.2}s)",
        config.bridge.queue_capacity, config.discord.poll_interval
    );

    Ok(Bridge::with_worker(host, handle))
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;
    use crate::bridge::channels::try_put;
    use crate::common::error::ConfigError;
    use crate::common::{InboundMessage, MessageKind, OutboundMessage, Target};

    async fn echo_worker(_config: DiscordConfig, mut channels: WorkerChannels, _buffer: LogBuffer) {
        while let Some(outbound) = channels.msg_rx.recv().await {
            let id_channel = match outbound.target {
                Target::Dm { id_user } => id_user,
                Target::Msg { id_channel } => id_channel,
            };
            let echo = InboundMessage {
                msg_type: MessageKind::Dm,
                id_prev: None,
                id_msg: 1,
                id_author: 2,
                name_author: "echo".to_string(),
                id_channel,
                name_channel: None,
                content: outbound.content,
            };
            let _ = try_put(&channels.msg_tx, echo);
        }
    }

    #[test]
    fn test_missing_token_fails_before_spawn() {
        let config = Config::new("");
        let result = spawn_worker_with(&config, echo_worker);
        assert!(matches!(
            result,
            Err(AppError::Config(ConfigError::ValidationError { .. }))
        ));
    }

    #[test]
    fn test_worker_round_trip() {
        let mut config = Config::new("token");
        config.bridge.queue_capacity = 4;
        let mut bridge = spawn_worker_with(&config, echo_worker).unwrap();

        let first = bridge.advance(vec![OutboundMessage::dm(42, "ping")], Vec::new());
        assert_eq!(first.dropped_messages, 0);

        let deadline = Instant::now() + Duration::from_secs(5);
        let mut received = first.messages;
        while received.is_empty() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
            received = bridge.advance(Vec::new(), Vec::new()).messages;
        }

        assert_eq!(received.len(), 1);
        assert_eq!(received[0].content, "ping");
        assert_eq!(received[0].id_channel, 42);
        assert!(bridge.is_worker_running());
    }
}
