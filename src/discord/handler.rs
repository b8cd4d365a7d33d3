//! Platform event translation.
//!
//! Turns message and interaction snapshots into the records forwarded to the
//! pipeline, and pushes them into their channels without blocking.

use std::collections::BTreeMap;

use tokio::sync::mpsc;
use tracing::error;

use crate::bridge::channels::try_put;
use crate::common::{
    ButtonInteraction, CommandInvocation, InboundCommand, InboundMessage, MessageKind,
};
use crate::discord::commands::COMMAND_PREFIX;
use crate::discord::gateway::{ButtonPress, MessageSnapshot};

/// Whether a message should be forwarded to the pipeline as conversation.
///
/// Bot authors are ignored and prefixed messages belong to command dispatch.
pub fn should_forward(message: &MessageSnapshot) -> bool {
    !message.author_is_bot && !message.content.starts_with(COMMAND_PREFIX)
}

/// Build the record for a new message (`id_prev = None`) or an edit.
pub fn inbound_message(message: &MessageSnapshot, id_prev: Option<u64>) -> InboundMessage {
    let (msg_type, name_channel) = if message.is_direct() {
        (MessageKind::Dm, None)
    } else {
        (
            MessageKind::Message,
            Some(message.channel_name.clone().unwrap_or_default()),
        )
    };

    InboundMessage {
        msg_type,
        id_prev,
        id_msg: message.id,
        id_author: message.author_id,
        name_author: message.author_name.clone(),
        id_channel: message.channel_id,
        name_channel,
        content: message.content.clone(),
    }
}

/// Build the record for an invocation of a forwarded command.
///
/// `args` holds only user-supplied arguments; the invocation context itself
/// is never part of the list.
pub fn command_invocation(message: &MessageSnapshot, name: &str, args: Vec<String>) -> InboundCommand {
    InboundCommand::Command(CommandInvocation {
        args,
        kwargs: BTreeMap::new(),
        prefix: COMMAND_PREFIX.to_string(),
        name_command: name.to_string(),
        id_guild: message.guild_id,
        name_guild: message.guild_name.clone(),
        id_channel: message.channel_id,
        name_channel: message.channel_name.clone(),
        id_author: message.author_id,
        name_author: message.author_name.clone(),
        nick_author: message.author_nick.clone(),
    })
}

/// Build the record for a button press.
pub fn button_interaction<I>(press: &ButtonPress<I>) -> InboundCommand {
    InboundCommand::Interaction(ButtonInteraction {
        id_btn: press.id_btn.clone(),
        id_user: press.user_id,
        name_user: press.user_name.clone(),
        id_channel: press.channel_id,
    })
}

/// Push a record towards the host, logging it if it had to be dropped.
pub fn forward<T>(tx: &mpsc::Sender<T>, record: T, what: &str) -> bool {
    match try_put(tx, record) {
        Ok(()) => true,
        Err(reason) => {
            error!("{} dropped. Inbound channel is {}.", what, reason);
            false
        }
    }
}
