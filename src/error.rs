use std::io;

use thiserror::Error;

/// Errors surfaced by [`NotifyChannel`](crate::channel::NotifyChannel) backends.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The transport could not be created or opened.
    #[error("channel unavailable: {0}")]
    Unavailable(#[source] io::Error),
    /// Non-blocking enqueue would overflow the endpoint queue.
    #[error("endpoint queue is full")]
    Full,
    /// The endpoint is closed; a blocked receiver must exit its loop.
    #[error("endpoint is closed")]
    Closed,
    /// Any other transport-level I/O failure.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Errors reported by device adapters.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// Reading or writing the underlying device failed.
    #[error("device i/o failed: {0}")]
    Io(#[from] io::Error),
    /// An external command finished unsuccessfully.
    #[error("command failed: {0}")]
    Command(String),
}
