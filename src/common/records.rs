//! Canonical record types carried across the bridge channels.
//!
//! Every record is a flat, owned value: nothing in here points back into
//! live platform state on either side of the bridge. Field names follow the
//! wire names the pipeline consumes, so the serde representation doubles as
//! the JSON shape used by the host driver.

use std::collections::BTreeMap;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::common::error::{RecordError, WorkerError};

/// Where an outbound message should be delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Target {
    /// Direct message to a user.
    Dm { id_user: u64 },
    /// Message to a guild or DM channel.
    Msg { id_channel: u64 },
}

/// In-memory file attachment. Never touches local disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilePayload {
    pub filename: String,
    #[serde(default)]
    pub spoiler: bool,
    #[serde(default)]
    pub description: Option<String>,
    pub buffer: Bytes,
}

/// Visual style of an attached button.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonStyle {
    Primary,
    Secondary,
    #[default]
    Success,
    Danger,
}

/// A single interactive button attached to an outbound message.
///
/// Presses are reported back as [`InboundCommand::Interaction`] carrying `id_btn`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonPayload {
    pub label: String,
    pub id_btn: String,
    #[serde(default)]
    pub style: ButtonStyle,
}

/// Message produced by the pipeline for delivery on the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    #[serde(flatten)]
    pub target: Target,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub file: Option<FilePayload>,
    #[serde(default)]
    pub button: Option<ButtonPayload>,
    /// Text-to-speech send option.
    #[serde(default)]
    pub tts: bool,
}

impl OutboundMessage {
    /// Direct message to a user.
    pub fn dm(id_user: u64, content: impl Into<String>) -> Self {
        Self::new(Target::Dm { id_user }, content)
    }

    /// Message to a channel.
    pub fn channel(id_channel: u64, content: impl Into<String>) -> Self {
        Self::new(Target::Msg { id_channel }, content)
    }

    fn new(target: Target, content: impl Into<String>) -> Self {
        Self {
            target,
            content: content.into(),
            file: None,
            button: None,
            tts: false,
        }
    }

    pub fn with_file(mut self, file: FilePayload) -> Self {
        self.file = Some(file);
        self
    }

    pub fn with_button(mut self, button: ButtonPayload) -> Self {
        self.button = Some(button);
        self
    }
}

/// Definition of a command to register on the worker at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandConfig {
    pub name: String,
    pub description: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl CommandConfig {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            enabled: true,
        }
    }

    /// Check that the command can actually be invoked by name.
    pub fn validate(&self) -> Result<(), WorkerError> {
        if self.name.is_empty() {
            return Err(WorkerError::InvalidCommand {
                message: "command name is empty".to_string(),
            });
        }
        if self.name.chars().any(char::is_whitespace) {
            return Err(WorkerError::InvalidCommand {
                message: format!("command name '{}' contains whitespace", self.name),
            });
        }
        Ok(())
    }
}

/// Kind of conversation an inbound message came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Dm,
    Message,
}

/// A user-authored message, or an edit of one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub msg_type: MessageKind,
    /// Only set for edits.
    pub id_prev: Option<u64>,
    pub id_msg: u64,
    pub id_author: u64,
    pub name_author: String,
    pub id_channel: u64,
    /// `None` for direct messages.
    pub name_channel: Option<String>,
    pub content: String,
}

/// A text command invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandInvocation {
    pub args: Vec<String>,
    pub kwargs: BTreeMap<String, String>,
    pub prefix: String,
    pub name_command: String,
    pub id_guild: Option<u64>,
    pub name_guild: Option<String>,
    pub id_channel: u64,
    pub name_channel: Option<String>,
    pub id_author: u64,
    pub name_author: String,
    pub nick_author: Option<String>,
}

/// A button press on a message previously sent by the worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonInteraction {
    pub id_btn: String,
    pub id_user: u64,
    pub name_user: String,
    pub id_channel: u64,
}

/// Command-like input forwarded to the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundCommand {
    Command(CommandInvocation),
    Interaction(ButtonInteraction),
}

/// A chunk of worker-side diagnostic text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogLine(pub String);

impl LogLine {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for LogLine {
    fn from(text: String) -> Self {
        Self(text)
    }
}

impl From<&str> for LogLine {
    fn from(text: &str) -> Self {
        Self(text.to_string())
    }
}

/// Either kind of record the pipeline can hand to the bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundRecord {
    Message(OutboundMessage),
    Command(CommandConfig),
}

impl OutboundRecord {
    /// Classify and decode one JSON object.
    ///
    /// Objects with a `type` field are messages, objects with a `name` field
    /// are command configurations.
    pub fn from_json(text: &str) -> Result<Self, RecordError> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        let object = value.as_object().ok_or_else(|| RecordError::Unrecognized {
            record: text.to_string(),
        })?;

        if object.contains_key("type") {
            Ok(Self::Message(serde_json::from_value(value)?))
        } else if object.contains_key("name") {
            Ok(Self::Command(serde_json::from_value(value)?))
        } else {
            Err(RecordError::Unrecognized {
                record: text.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dm_message_wire_shape() {
        let record = OutboundRecord::from_json(r#"{"type": "dm", "id_user": 42, "content": "hi"}"#)
            .unwrap();
        assert_eq!(record, OutboundRecord::Message(OutboundMessage::dm(42, "hi")));
    }

    #[test]
    fn test_channel_message_with_button() {
        let json = r#"{
            "type": "msg",
            "id_channel": 7,
            "content": "pick one",
            "button": {"label": "Go", "id_btn": "btn-go"}
        }"#;
        let OutboundRecord::Message(msg) = OutboundRecord::from_json(json).unwrap() else {
            panic!("expected a message");
        };
        assert_eq!(
            msg,
            OutboundMessage::channel(7, "pick one").with_button(ButtonPayload {
                label: "Go".to_string(),
                id_btn: "btn-go".to_string(),
                style: ButtonStyle::Success,
            })
        );
        let button = msg.button.unwrap();
        assert_eq!(button.id_btn, "btn-go");
        assert_eq!(button.style, ButtonStyle::Success);
    }

    #[test]
    fn test_dm_with_file() {
        let json = r#"{
            "type": "dm",
            "id_user": 3,
            "file": {"filename": "a.txt", "spoiler": true, "buffer": [104, 105]}
        }"#;
        let record = OutboundRecord::from_json(json).unwrap();
        let expected = OutboundMessage::dm(3, "").with_file(FilePayload {
            filename: "a.txt".to_string(),
            spoiler: true,
            description: None,
            buffer: Bytes::from_static(b"hi"),
        });
        assert_eq!(record, OutboundRecord::Message(expected));
    }

    #[test]
    fn test_command_config_defaults_enabled() {
        let record =
            OutboundRecord::from_json(r#"{"name": "ask", "description": "Ask a question"}"#).unwrap();
        assert_eq!(
            record,
            OutboundRecord::Command(CommandConfig::new("ask", "Ask a question"))
        );
    }

    #[test]
    fn test_command_config_requires_text_fields() {
        let result = OutboundRecord::from_json(r#"{"name": "ask", "description": 5}"#);
        assert!(matches!(result, Err(RecordError::Json(_))));

        let result = OutboundRecord::from_json(r#"{"name": "ask"}"#);
        assert!(matches!(result, Err(RecordError::Json(_))));
    }

    #[test]
    fn test_unknown_message_type_rejected() {
        let result = OutboundRecord::from_json(r#"{"type": "broadcast", "content": "x"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_unrecognized_shape() {
        let result = OutboundRecord::from_json(r#"{"hello": "world"}"#);
        assert!(matches!(result, Err(RecordError::Unrecognized { .. })));

        let result = OutboundRecord::from_json("[1, 2, 3]");
        assert!(matches!(result, Err(RecordError::Unrecognized { .. })));
    }

    #[test]
    fn test_command_name_validation() {
        assert!(CommandConfig::new("ask", "d").validate().is_ok());
        assert!(CommandConfig::new("", "d").validate().is_err());
        assert!(CommandConfig::new("two words", "d").validate().is_err());
    }

    #[test]
    fn test_inbound_command_is_tagged() {
        let cmd = InboundCommand::Interaction(ButtonInteraction {
            id_btn: "b1".to_string(),
            id_user: 1,
            name_user: "alice".to_string(),
            id_channel: 2,
        });
        let value = serde_json::to_value(&cmd).unwrap();
        assert_eq!(value["type"], "interaction");
        assert_eq!(value["id_btn"], "b1");
    }

    #[test]
    fn test_dm_inbound_message_serializes_null_channel_name() {
        let msg = InboundMessage {
            msg_type: MessageKind::Dm,
            id_prev: None,
            id_msg: 10,
            id_author: 11,
            name_author: "bob".to_string(),
            id_channel: 12,
            name_channel: None,
            content: "hey".to_string(),
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["msg_type"], "dm");
        assert!(value["name_channel"].is_null());
    }
}
