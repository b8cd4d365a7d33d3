//! Bridge channel management.
//!
//! Five bounded, unidirectional channels connect the host and the worker.
//! Every operation on them is non-blocking: a put into a full channel drops
//! the record, a get from an empty channel returns immediately.

use std::fmt;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::{TryRecvError, TrySendError};

use crate::common::{CommandConfig, InboundCommand, InboundMessage, LogLine, OutboundMessage};

/// Host ends: writes outbound channels, reads inbound channels.
pub struct HostChannels {
    /// Sender for pipeline -> Discord messages.
    pub msg_tx: mpsc::Sender<OutboundMessage>,
    /// Sender for command configurations.
    pub cmd_config_tx: mpsc::Sender<CommandConfig>,
    /// Receiver for Discord -> pipeline messages.
    pub msg_rx: mpsc::Receiver<InboundMessage>,
    /// Receiver for command invocations and button presses.
    pub cmd_rx: mpsc::Receiver<InboundCommand>,
    /// Receiver for worker log output.
    pub log_rx: mpsc::Receiver<LogLine>,
}

/// Worker ends: the mirror image of [`HostChannels`].
pub struct WorkerChannels {
    /// Receiver for pipeline -> Discord messages.
    pub msg_rx: mpsc::Receiver<OutboundMessage>,
    /// Receiver for command configurations.
    pub cmd_config_rx: mpsc::Receiver<CommandConfig>,
    /// Sender for Discord -> pipeline messages.
    pub msg_tx: mpsc::Sender<InboundMessage>,
    /// Sender for command invocations and button presses.
    pub cmd_tx: mpsc::Sender<InboundCommand>,
    /// Sender for worker log output.
    pub log_tx: mpsc::Sender<LogLine>,
}

/// All five channels, split by owner.
pub struct ChannelSet {
    pub host: HostChannels,
    pub worker: WorkerChannels,
}

impl ChannelSet {
    /// Create the channel set with the same capacity on every channel.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (out_msg_tx, out_msg_rx) = mpsc::channel(capacity);
        let (cmd_config_tx, cmd_config_rx) = mpsc::channel(capacity);
        let (in_msg_tx, in_msg_rx) = mpsc::channel(capacity);
        let (cmd_tx, cmd_rx) = mpsc::channel(capacity);
        let (log_tx, log_rx) = mpsc::channel(capacity);

        Self {
            host: HostChannels {
                msg_tx: out_msg_tx,
                cmd_config_tx,
                msg_rx: in_msg_rx,
                cmd_rx,
                log_rx,
            },
            worker: WorkerChannels {
                msg_rx: out_msg_rx,
                cmd_config_rx,
                msg_tx: in_msg_tx,
                cmd_tx,
                log_tx,
            },
        }
    }
}

/// Why a record was dropped instead of enqueued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// The channel was at capacity.
    Full,
    /// The other end is gone.
    Closed,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => write!(f, "full"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// Enqueue without blocking. On failure the record is discarded.
pub fn try_put<T>(tx: &mpsc::Sender<T>, record: T) -> Result<(), DropReason> {
    tx.try_send(record).map_err(|err| match err {
        TrySendError::Full(_) => DropReason::Full,
        TrySendError::Closed(_) => DropReason::Closed,
    })
}

/// Dequeue one record without blocking.
pub fn take_one<T>(rx: &mut mpsc::Receiver<T>) -> Option<T> {
    match rx.try_recv() {
        Ok(record) => Some(record),
        Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
    }
}

/// Dequeue everything currently buffered.
pub fn drain<T>(rx: &mut mpsc::Receiver<T>) -> Vec<T> {
    let mut records = Vec::new();
    while let Some(record) = take_one(rx) {
        records.push(record);
    }
    records
}
