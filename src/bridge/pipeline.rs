//! JSON-lines framing for the host pipeline.
//!
//! Outbound records arrive one JSON object per line and are batched until
//! the next bridge cycle. Inbound records leave as one JSON object per line,
//! tagged with the stream they came from.

use std::mem;
use std::time::Duration;

use serde::Serialize;

use crate::bridge::host::CycleOutput;
use crate::common::error::RecordError;
use crate::common::{CommandConfig, InboundCommand, InboundMessage, OutboundMessage, OutboundRecord};

/// Shortest period between two bridge cycles.
pub const MIN_CYCLE_PERIOD: Duration = Duration::from_millis(10);

/// Bridge cycle period for a configured poll interval.
pub fn cycle_period(poll_interval: Duration) -> Duration {
    poll_interval.max(MIN_CYCLE_PERIOD)
}

/// Outbound records collected since the last cycle.
#[derive(Debug, Default)]
pub struct PendingRecords {
    messages: Vec<OutboundMessage>,
    commands: Vec<CommandConfig>,
}

impl PendingRecords {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and queue one input line. Blank lines are ignored.
    pub fn push_line(&mut self, line: &str) -> Result<(), RecordError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(());
        }

        match OutboundRecord::from_json(line)? {
            OutboundRecord::Message(message) => self.messages.push(message),
            OutboundRecord::Command(command) => self.commands.push(command),
        }
        Ok(())
    }

    /// Hand over everything queued, in arrival order per kind.
    pub fn take(&mut self) -> (Vec<OutboundMessage>, Vec<CommandConfig>) {
        (mem::take(&mut self.messages), mem::take(&mut self.commands))
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty() && self.commands.is_empty()
    }
}

#[derive(Serialize)]
#[serde(tag = "stream", content = "record", rename_all = "snake_case")]
enum StreamRecord<'a> {
    Message(&'a InboundMessage),
    Command(&'a InboundCommand),
}

/// Output lines for a cycle: messages first, then commands.
///
/// Log lines are not part of the output; the host logs them itself.
pub fn render_output(output: &CycleOutput) -> Result<Vec<String>, serde_json::Error> {
    let messages = output.messages.iter().map(StreamRecord::Message);
    let commands = output.commands.iter().map(StreamRecord::Command);
    messages.chain(commands).map(|record| serde_json::to_string(&record)).collect()
}
