//! Named-FIFO transport.
//!
//! Fallback for hosts without POSIX message queues (WSL among them).
//! Send/receive degrade to raw byte transfer and the priority argument is
//! ignored.
#![allow(unsafe_code)]

use std::ffi::CString;
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

use log::debug;

use crate::channel::{Endpoint, NotifyChannel};
use crate::error::ChannelError;

struct FifoEndpoint {
    /// Blocking read side.
    rx: AtomicI32,
    /// Non-blocking write side; closing it delivers EOF to the reader.
    tx: AtomicI32,
    closed: AtomicBool,
    path: PathBuf,
}

impl FifoEndpoint {
    fn open(dir: &Path, endpoint: Endpoint) -> Result<Self, ChannelError> {
        let path = dir.join(format!("{}.fifo", endpoint.name()));
        let cpath = CString::new(path.as_os_str().as_bytes()).map_err(|_| {
            ChannelError::Unavailable(io::Error::new(
                io::ErrorKind::InvalidInput,
                "fifo path contains NUL",
            ))
        })?;

        let rc = unsafe { libc::mkfifo(cpath.as_ptr(), 0o644) };
        if rc != 0 {
            let err = io::Error::last_os_error();
            if err.raw_os_error() != Some(libc::EEXIST) {
                return Err(ChannelError::Unavailable(err));
            }
        }

        // Read side first: a non-blocking O_RDONLY open succeeds with no
        // writer present. Then drop O_NONBLOCK so receive() blocks.
        let rx = unsafe { libc::open(cpath.as_ptr(), libc::O_RDONLY | libc::O_NONBLOCK) };
        if rx < 0 {
            return Err(ChannelError::Unavailable(io::Error::last_os_error()));
        }
        let flags = unsafe { libc::fcntl(rx, libc::F_GETFL) };
        if flags < 0
            || unsafe { libc::fcntl(rx, libc::F_SETFL, flags & !libc::O_NONBLOCK) } < 0
        {
            let err = io::Error::last_os_error();
            unsafe { libc::close(rx) };
            return Err(ChannelError::Unavailable(err));
        }

        // Write side stays non-blocking: a full pipe reports Full.
        let tx = unsafe { libc::open(cpath.as_ptr(), libc::O_WRONLY | libc::O_NONBLOCK) };
        if tx < 0 {
            let err = io::Error::last_os_error();
            unsafe { libc::close(rx) };
            return Err(ChannelError::Unavailable(err));
        }

        Ok(Self {
            rx: AtomicI32::new(rx),
            tx: AtomicI32::new(tx),
            closed: AtomicBool::new(false),
            path,
        })
    }

    fn send(&self, payload: &[u8]) -> Result<(), ChannelError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ChannelError::Closed);
        }
        let tx = self.tx.load(Ordering::Acquire);
        if tx < 0 {
            return Err(ChannelError::Closed);
        }

        let n = unsafe { libc::write(tx, payload.as_ptr().cast(), payload.len()) };
        if n >= 0 {
            return Ok(());
        }
        let err = io::Error::last_os_error();
        match err.raw_os_error() {
            Some(libc::EAGAIN) => Err(ChannelError::Full),
            Some(libc::EPIPE) | Some(libc::EBADF) => Err(ChannelError::Closed),
            _ => Err(ChannelError::Io(err)),
        }
    }

    fn receive(&self, buf: &mut [u8]) -> Result<usize, ChannelError> {
        loop {
            if self.closed.load(Ordering::Acquire) {
                self.release_rx();
                return Err(ChannelError::Closed);
            }
            let rx = self.rx.load(Ordering::Acquire);
            if rx < 0 {
                return Err(ChannelError::Closed);
            }

            let n = unsafe { libc::read(rx, buf.as_mut_ptr().cast(), buf.len()) };
            if n > 0 {
                return Ok(n as usize);
            }
            if n == 0 {
                // All write ends gone: the endpoint is done.
                self.release_rx();
                return Err(ChannelError::Closed);
            }
            let err = io::Error::last_os_error();
            match err.raw_os_error() {
                Some(libc::EINTR) => continue,
                Some(libc::EBADF) => return Err(ChannelError::Closed),
                _ => return Err(ChannelError::Io(err)),
            }
        }
    }

    /// Closes the write side; a blocked reader wakes with EOF and releases
    /// the read side itself.
    fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let tx = self.tx.swap(-1, Ordering::AcqRel);
        if tx >= 0 {
            unsafe { libc::close(tx) };
        }
        debug!("fifo endpoint {} closed", self.path.display());
    }

    fn release_rx(&self) {
        let rx = self.rx.swap(-1, Ordering::AcqRel);
        if rx >= 0 {
            unsafe { libc::close(rx) };
        }
    }

    fn release(&self) {
        self.close();
        self.release_rx();
        let _ = std::fs::remove_file(&self.path);
    }
}

/// [`NotifyChannel`] backed by a pair of named FIFOs (`main.fifo`,
/// `app.fifo`) under one directory.
pub struct FifoChannel {
    main: FifoEndpoint,
    app: FifoEndpoint,
}

impl FifoChannel {
    /// Creates (if needed) and opens both FIFOs under `dir`. The directory
    /// must already exist.
    pub fn open(dir: &Path) -> Result<Self, ChannelError> {
        Ok(Self {
            main: FifoEndpoint::open(dir, Endpoint::Main)?,
            app: FifoEndpoint::open(dir, Endpoint::App)?,
        })
    }

    fn endpoint(&self, endpoint: Endpoint) -> &FifoEndpoint {
        match endpoint {
            Endpoint::Main => &self.main,
            Endpoint::App => &self.app,
        }
    }
}

impl NotifyChannel for FifoChannel {
    fn send(&self, endpoint: Endpoint, payload: &[u8], _priority: u32) -> Result<(), ChannelError> {
        self.endpoint(endpoint).send(payload)
    }

    fn receive(&self, endpoint: Endpoint, buf: &mut [u8]) -> Result<usize, ChannelError> {
        self.endpoint(endpoint).receive(buf)
    }

    fn close(&self, endpoint: Endpoint) {
        self.endpoint(endpoint).close();
    }
}

impl Drop for FifoChannel {
    fn drop(&mut self) {
        self.main.release();
        self.app.release();
    }
}
