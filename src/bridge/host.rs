//! Host-side bridge cycle.
//!
//! The pipeline calls [`Bridge::advance`] once per activation with whatever
//! it produced since the previous call and gets back everything the worker
//! produced in the meantime. The call never waits on the worker.

use std::thread::JoinHandle;

use tracing::warn;

use crate::bridge::channels::{drain, try_put, HostChannels};
use crate::common::{CommandConfig, InboundCommand, InboundMessage, LogLine, OutboundMessage};

/// Everything collected during one bridge cycle.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CycleOutput {
    pub messages: Vec<InboundMessage>,
    pub commands: Vec<InboundCommand>,
    /// Worker log lines, preceded by notices for anything dropped this cycle.
    pub logs: Vec<LogLine>,
    pub dropped_messages: usize,
    pub dropped_commands: usize,
}

impl CycleOutput {
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty() && self.commands.is_empty() && self.logs.is_empty()
    }
}

/// Pipeline-facing end of the bridge.
pub struct Bridge {
    channels: HostChannels,
    worker: Option<JoinHandle<()>>,
}

impl Bridge {
    /// Bridge over channels whose worker end is driven elsewhere.
    pub fn new(channels: HostChannels) -> Self {
        Self {
            channels,
            worker: None,
        }
    }

    pub(crate) fn with_worker(channels: HostChannels, worker: JoinHandle<()>) -> Self {
        Self {
            channels,
            worker: Some(worker),
        }
    }

    /// Run one cycle: push new outbound records, pull all pending inbound records.
    pub fn advance(
        &mut self,
        messages: Vec<OutboundMessage>,
        commands: Vec<CommandConfig>,
    ) -> CycleOutput {
        let mut output = CycleOutput::default();

        for message in messages {
            if let Err(reason) = try_put(&self.channels.msg_tx, message) {
                warn!("Message dropped: outbound message channel is {}", reason);
                output.dropped_messages += 1;
                output.logs.push(LogLine(format!(
                    "Message dropped: outbound message channel is {}.",
                    reason
                )));
            }
        }

        for command in commands {
            if let Err(reason) = try_put(&self.channels.cmd_config_tx, command) {
                warn!("Command config dropped: command config channel is {}", reason);
                output.dropped_commands += 1;
                output.logs.push(LogLine(format!(
                    "Command config dropped: command config channel is {}.",
                    reason
                )));
            }
        }

        output.messages = drain(&mut self.channels.msg_rx);
        output.commands = drain(&mut self.channels.cmd_rx);
        output.logs.extend(drain(&mut self.channels.log_rx));

        output
    }

    /// Whether the worker thread is still alive. Always true for external workers.
    pub fn is_worker_running(&self) -> bool {
        self.worker.as_ref().map_or(true, |handle| !handle.is_finished())
    }
}
