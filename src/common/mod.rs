//! Common types shared by the host and worker sides.

pub mod error;
pub mod logging;
pub mod records;

pub use records::{
    ButtonInteraction, ButtonPayload, ButtonStyle, CommandConfig, CommandInvocation, FilePayload,
    InboundCommand, InboundMessage, LogLine, MessageKind, OutboundMessage, OutboundRecord, Target,
};
