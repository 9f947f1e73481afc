//! Notification channel used to wake the refresh worker.
//!
//! Two interchangeable transports implement the same contract: POSIX
//! message queues and named FIFOs. The backend is a startup-time
//! configuration choice; the worker and tick source only see
//! [`NotifyChannel`].

#[cfg(unix)]
pub mod fifo;
#[cfg(unix)]
pub mod mq;

use std::path::PathBuf;

use crate::error::ChannelError;

/// Logical endpoints within a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// Reserved for the hosting process's own traffic.
    Main,
    /// Wakes the refresh worker.
    App,
}

impl Endpoint {
    /// Stable name used to derive transport resource names.
    pub fn name(self) -> &'static str {
        match self {
            Endpoint::Main => "main",
            Endpoint::App => "app",
        }
    }
}

/// Transport-agnostic wake-up channel.
///
/// `send` must be a non-blocking enqueue, cheap enough for a restricted
/// execution context: no allocation, no locking beyond what the OS
/// primitive itself takes. `receive` blocks the calling thread;
/// [`ChannelError::Closed`] tells the caller the endpoint is terminally
/// broken and its loop must exit.
///
/// Messages are wake-up signals, not data: level-triggered semantics are
/// fine, and coalescing duplicate notifications is harmless because every
/// refresh cycle re-reads ground truth.
pub trait NotifyChannel: Send + Sync {
    /// Enqueues `payload` on `endpoint` without blocking.
    fn send(&self, endpoint: Endpoint, payload: &[u8], priority: u32) -> Result<(), ChannelError>;

    /// Blocks until a message arrives on `endpoint`; returns the byte count
    /// copied into `buf`.
    fn receive(&self, endpoint: Endpoint, buf: &mut [u8]) -> Result<usize, ChannelError>;

    /// Releases `endpoint`. Idempotent; wakes a blocked receiver, whose
    /// `receive` then fails with [`ChannelError::Closed`].
    fn close(&self, endpoint: Endpoint);
}

/// Transport selection, decided once at startup and never branched on
/// per call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelBackend {
    /// POSIX message queues (bounded, priority-aware). `prefix` must start
    /// with `/`; the endpoints become `<prefix>_main` and `<prefix>_app`.
    MessageQueue { prefix: String },
    /// Named FIFOs under `dir` (raw byte stream, priority ignored).
    Fifo { dir: PathBuf },
}

impl Default for ChannelBackend {
    fn default() -> Self {
        ChannelBackend::MessageQueue {
            prefix: "/regbank".to_owned(),
        }
    }
}

/// Opens the configured transport.
#[cfg(unix)]
pub fn open(backend: &ChannelBackend) -> Result<Box<dyn NotifyChannel>, ChannelError> {
    match backend {
        ChannelBackend::MessageQueue { prefix } => Ok(Box::new(mq::MqChannel::open(prefix)?)),
        ChannelBackend::Fifo { dir } => Ok(Box::new(fifo::FifoChannel::open(dir)?)),
    }
}
