//! Worker-side log capture and forwarding.
//!
//! The worker installs a thread-local `tracing` subscriber that writes into a
//! [`LogBuffer`] instead of a terminal. The poll loop then ships the buffered
//! text to the host as [`LogLine`] records through [`LogForwarder`].

use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

use crate::common::records::LogLine;

/// Consecutive failed forwards tolerated before falling back to local output.
pub const MAX_LOG_FORWARD_FAILURES: u32 = 10;

/// Shared in-memory sink for formatted log output.
#[derive(Debug, Clone, Default)]
pub struct LogBuffer {
    inner: Arc<Mutex<String>>,
}

impl LogBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_str(&self, text: &str) {
        self.lock().push_str(text);
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Copy of everything currently buffered.
    pub fn contents(&self) -> String {
        self.lock().clone()
    }

    /// Drop the first `len` bytes, keeping anything written since they were read.
    fn consume(&self, len: usize) {
        let mut guard = self.lock();
        let len = len.min(guard.len());
        guard.drain(..len);
    }

    fn lock(&self) -> MutexGuard<'_, String> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// `io::Write` handle handed out to the fmt layer.
pub struct LogBufferWriter {
    buffer: LogBuffer,
}

impl io::Write for LogBufferWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.push_str(&String::from_utf8_lossy(buf));
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBufferWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogBufferWriter {
            buffer: self.clone(),
        }
    }
}

/// Build the subscriber the worker thread installs as its default.
pub fn capture_subscriber(buffer: LogBuffer) -> impl tracing::Subscriber + Send + Sync {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with_writer(buffer)
        .with_ansi(false)
        .finish()
}

/// Outcome of one forwarding attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogForward {
    /// Nothing was buffered.
    Idle,
    /// The buffer was shipped as one log line.
    Forwarded,
    /// The log channel was full; the buffer is kept for the next attempt.
    Retained,
    /// Too many consecutive failures; the buffer went to stderr and was cleared.
    EmittedLocally,
}

/// Ships the log buffer to the host, bounding how long text can pile up.
#[derive(Debug)]
pub struct LogForwarder {
    buffer: LogBuffer,
    failures: u32,
}

impl LogForwarder {
    pub fn new(buffer: LogBuffer) -> Self {
        Self {
            buffer,
            failures: 0,
        }
    }

    pub fn buffer(&self) -> &LogBuffer {
        &self.buffer
    }

    /// Attempt to forward everything buffered as a single [`LogLine`].
    pub fn forward(&mut self, log_tx: &mpsc::Sender<LogLine>) -> LogForward {
        let text = self.buffer.contents();
        if text.is_empty() {
            return LogForward::Idle;
        }

        let len = text.len();
        match log_tx.try_send(LogLine(text)) {
            Ok(()) => {
                self.failures = 0;
                self.buffer.consume(len);
                LogForward::Forwarded
            }
            Err(err) => {
                if self.failures < MAX_LOG_FORWARD_FAILURES {
                    self.failures += 1;
                    LogForward::Retained
                } else {
                    let LogLine(text) = err.into_inner();
                    eprint!("{}", text);
                    self.buffer.consume(len);
                    LogForward::EmittedLocally
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_subscriber_writes_to_buffer() {
        let buffer = LogBuffer::new();
        tracing::subscriber::with_default(capture_subscriber(buffer.clone()), || {
            tracing::info!("worker says hello");
        });
        assert!(buffer.contents().contains("worker says hello"));
    }

    #[test]
    fn test_forward_idle_when_empty() {
        let (tx, _rx) = mpsc::channel(1);
        let mut forwarder = LogForwarder::new(LogBuffer::new());
        assert_eq!(forwarder.forward(&tx), LogForward::Idle);
    }

    #[test]
    fn test_forward_clears_buffer() {
        let (tx, mut rx) = mpsc::channel(1);
        let mut forwarder = LogForwarder::new(LogBuffer::new());
        forwarder.buffer().push_str("line one\n");

        assert_eq!(forwarder.forward(&tx), LogForward::Forwarded);
        assert!(forwarder.buffer().is_empty());
        assert_eq!(rx.try_recv().unwrap(), LogLine::from("line one\n"));
    }

    #[test]
    fn test_full_channel_retains_then_emits_locally() {
        let (tx, _rx) = mpsc::channel(1);
        tx.try_send(LogLine::from("occupied")).unwrap();

        let mut forwarder = LogForwarder::new(LogBuffer::new());
        forwarder.buffer().push_str("pending\n");

        for _ in 0..MAX_LOG_FORWARD_FAILURES {
            assert_eq!(forwarder.forward(&tx), LogForward::Retained);
            assert_eq!(forwarder.buffer().contents(), "pending\n");
        }

        assert_eq!(forwarder.forward(&tx), LogForward::EmittedLocally);
        assert!(forwarder.buffer().is_empty());
    }

    #[test]
    fn test_success_resets_failure_count() {
        let (tx, mut rx) = mpsc::channel(1);
        tx.try_send(LogLine::from("occupied")).unwrap();

        let mut forwarder = LogForwarder::new(LogBuffer::new());
        forwarder.buffer().push_str("a");
        for _ in 0..5 {
            assert_eq!(forwarder.forward(&tx), LogForward::Retained);
        }

        rx.try_recv().unwrap();
        assert_eq!(forwarder.forward(&tx), LogForward::Forwarded);
        assert_eq!(forwarder.failures, 0);
    }
}
