//! Text commands (`/name args...`).
//!
//! Commands are declared at runtime by the pipeline through [`CommandConfig`]
//! records. Invoking one forwards the invocation to the pipeline; the only
//! command the worker runs itself is `clear_all_messages`.

use std::collections::HashMap;
use std::time::Duration;

use tracing::{debug, error, info};

use crate::common::error::{CommandError, WorkerError, WorkerResult};
use crate::common::CommandConfig;
use crate::discord::gateway::Gateway;

/// Prefix that marks a message as a command invocation.
pub const COMMAND_PREFIX: char = '/';

/// Built-in command that wipes recent channel history.
pub const CLEAR_HISTORY_COMMAND: &str = "clear_all_messages";

/// Maximum number of messages `clear_all_messages` deletes.
pub const CLEAR_HISTORY_LIMIT: usize = 300;

/// Pause between two deletions.
pub const CLEAR_HISTORY_PACE: Duration = Duration::from_millis(500);

/// Reply sent for command failures that are not shown to users verbatim.
pub const GENERIC_ERROR_REPLY: &str = "An error has been logged.";

/// What happens when a command is invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandAction {
    /// Forward the invocation to the pipeline.
    Forward,
    /// Delete recent messages in the invoking channel.
    ClearHistory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandEntry {
    pub name: String,
    pub description: String,
    pub enabled: bool,
    pub action: CommandAction,
}

/// Registered commands, keyed by name.
#[derive(Debug, Default)]
pub struct CommandRegistry {
    commands: HashMap<String, CommandEntry>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in commands.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.commands.insert(
            CLEAR_HISTORY_COMMAND.to_string(),
            CommandEntry {
                name: CLEAR_HISTORY_COMMAND.to_string(),
                description: "Delete the most recent messages in this channel".to_string(),
                enabled: true,
                action: CommandAction::ClearHistory,
            },
        );
        registry
    }

    /// Register a forwarded command, replacing any command of the same name.
    ///
    /// Returns the replaced entry.
    pub fn register(&mut self, config: CommandConfig) -> Result<Option<CommandEntry>, WorkerError> {
        config.validate()?;

        let entry = CommandEntry {
            name: config.name.clone(),
            description: config.description,
            enabled: config.enabled,
            action: CommandAction::Forward,
        };
        Ok(self.commands.insert(config.name, entry))
    }

    pub fn get(&self, name: &str) -> Option<&CommandEntry> {
        self.commands.get(name)
    }

    /// Look up a command for invocation.
    pub fn resolve(&self, name: &str) -> Result<&CommandEntry, CommandError> {
        let entry = self.commands.get(name).ok_or_else(|| CommandError::NotFound {
            name: name.to_string(),
        })?;

        if !entry.enabled {
            return Err(CommandError::Disabled {
                name: name.to_string(),
            });
        }

        Ok(entry)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// A command name with its positional arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub name: String,
    pub args: Vec<String>,
}

/// Parse `/name arg "quoted arg"`.
///
/// Returns `None` when `content` lacks the prefix or names no command.
pub fn parse_invocation(content: &str) -> Option<ParsedCommand> {
    let rest = content.strip_prefix(COMMAND_PREFIX)?;
    if rest.starts_with(char::is_whitespace) {
        return None;
    }

    let mut words = split_arguments(rest).into_iter();
    let name = words.next()?;
    Some(ParsedCommand {
        name,
        args: words.collect(),
    })
}

/// Split on whitespace, keeping double-quoted runs together.
///
/// Inside quotes a backslash escapes the next character. An unterminated
/// quote runs to the end of the input.
pub fn split_arguments(input: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut in_quotes = false;
    let mut chars = input.chars();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                in_word = true;
            }
            '\\' if in_quotes => {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            }
            c if c.is_whitespace() && !in_quotes => {
                if in_word {
                    args.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            c => {
                current.push(c);
                in_word = true;
            }
        }
    }

    if in_word {
        args.push(current);
    }
    args
}

/// Delete up to `limit` recent messages in a channel, one every `pace`.
pub async fn clear_history<G: Gateway>(
    gateway: &G,
    channel_id: u64,
    limit: usize,
    pace: Duration,
) -> WorkerResult<usize> {
    let ids = gateway.recent_messages(channel_id, limit).await?;
    let mut deleted = 0;

    for id in ids {
        gateway.delete_message(channel_id, id).await?;
        deleted += 1;
        if !pace.is_zero() {
            tokio::time::sleep(pace).await;
        }
    }

    Ok(deleted)
}

/// Body of the `clear_all_messages` task.
pub async fn run_clear_history<G: Gateway>(gateway: G, channel_id: u64) {
    match clear_history(&gateway, channel_id, CLEAR_HISTORY_LIMIT, CLEAR_HISTORY_PACE).await {
        Ok(deleted) => info!("Deleted {} messages in channel {}", deleted, channel_id),
        Err(e) => {
            if let Err(e) = report_command_error(&gateway, channel_id, CommandError::Invoke(e)).await {
                error!("Command '{}' failed: {}", CLEAR_HISTORY_COMMAND, e);
            }
        }
    }
}

/// Tell the invoking channel about a failed command.
///
/// Not-found and disabled commands are answered with their error text and
/// count as handled. Anything else gets a generic reply and is returned.
pub async fn report_command_error<G: Gateway>(
    gateway: &G,
    channel_id: u64,
    error: CommandError,
) -> Result<(), CommandError> {
    if error.is_expected() {
        debug!("{}", error);
        gateway.reply(channel_id, &error.to_string()).await?;
        return Ok(());
    }

    if let Err(e) = gateway.reply(channel_id, GENERIC_ERROR_REPLY).await {
        error!("Failed to report command error to channel {}: {}", channel_id, e);
    }
    Err(error)
}
