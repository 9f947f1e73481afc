//! POSIX message-queue transport.
#![allow(unsafe_code)]

use std::ffi::CString;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

use log::debug;

use crate::channel::{Endpoint, NotifyChannel};
use crate::error::ChannelError;

/// Messages a queue may hold before `send` reports `Full`.
const MQ_CAPACITY: libc::c_long = 8;
/// Fixed message size; refresh ticks are a single byte but leave headroom.
const MQ_MSG_SIZE: libc::c_long = 8;

/// `mq_timedsend` deadline in the past: a full queue fails immediately
/// instead of blocking.
const IMMEDIATE: libc::timespec = libc::timespec {
    tv_sec: 0,
    tv_nsec: 0,
};

struct MqEndpoint {
    mqd: AtomicI32,
    closed: AtomicBool,
    name: CString,
}

impl MqEndpoint {
    fn open(prefix: &str, endpoint: Endpoint) -> Result<Self, ChannelError> {
        let name = CString::new(format!("{prefix}_{}", endpoint.name())).map_err(|_| {
            ChannelError::Unavailable(io::Error::new(
                io::ErrorKind::InvalidInput,
                "queue name contains NUL",
            ))
        })?;

        let mut attr: libc::mq_attr = unsafe { std::mem::zeroed() };
        attr.mq_maxmsg = MQ_CAPACITY;
        attr.mq_msgsize = MQ_MSG_SIZE;

        let mqd = unsafe {
            libc::mq_open(
                name.as_ptr(),
                libc::O_CREAT | libc::O_RDWR,
                0o644 as libc::mode_t as libc::c_uint,
                &mut attr as *mut libc::mq_attr,
            )
        };
        if mqd == -1 {
            return Err(ChannelError::Unavailable(io::Error::last_os_error()));
        }

        Ok(Self {
            mqd: AtomicI32::new(mqd),
            closed: AtomicBool::new(false),
            name,
        })
    }

    fn send(&self, payload: &[u8], priority: u32) -> Result<(), ChannelError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ChannelError::Closed);
        }
        let mqd = self.mqd.load(Ordering::Acquire);
        if mqd < 0 {
            return Err(ChannelError::Closed);
        }
        if payload.len() > MQ_MSG_SIZE as usize {
            return Err(ChannelError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                "payload exceeds queue message size",
            )));
        }

        let rc = unsafe {
            libc::mq_timedsend(
                mqd,
                payload.as_ptr().cast(),
                payload.len(),
                priority,
                &IMMEDIATE,
            )
        };
        if rc == 0 {
            return Ok(());
        }
        let err = io::Error::last_os_error();
        match err.raw_os_error() {
            Some(libc::ETIMEDOUT) => Err(ChannelError::Full),
            Some(libc::EBADF) => Err(ChannelError::Closed),
            _ => Err(ChannelError::Io(err)),
        }
    }

    fn receive(&self, buf: &mut [u8]) -> Result<usize, ChannelError> {
        loop {
            if self.closed.load(Ordering::Acquire) {
                self.release();
                return Err(ChannelError::Closed);
            }
            let mqd = self.mqd.load(Ordering::Acquire);
            if mqd < 0 {
                return Err(ChannelError::Closed);
            }

            let mut msg = [0u8; MQ_MSG_SIZE as usize];
            let mut prio: libc::c_uint = 0;
            let n =
                unsafe { libc::mq_receive(mqd, msg.as_mut_ptr().cast(), msg.len(), &mut prio) };
            if n < 0 {
                let err = io::Error::last_os_error();
                match err.raw_os_error() {
                    Some(libc::EINTR) => continue,
                    Some(libc::EBADF) => return Err(ChannelError::Closed),
                    _ => return Err(ChannelError::Io(err)),
                }
            }
            // A wakeup posted by close() carries no data for the caller.
            if self.closed.load(Ordering::Acquire) {
                self.release();
                return Err(ChannelError::Closed);
            }

            let copied = (n as usize).min(buf.len());
            buf[..copied].copy_from_slice(&msg[..copied]);
            return Ok(copied);
        }
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        // mq_close does not wake a blocked mq_receive; post a sentinel so
        // the receiver observes the closed flag and releases the queue.
        let mqd = self.mqd.load(Ordering::Acquire);
        if mqd >= 0 {
            let wake = [0u8; 1];
            unsafe { libc::mq_timedsend(mqd, wake.as_ptr().cast(), wake.len(), 0, &IMMEDIATE) };
        }
        debug!("mq endpoint {:?} closed", self.name);
    }

    fn release(&self) {
        let mqd = self.mqd.swap(-1, Ordering::AcqRel);
        if mqd >= 0 {
            unsafe {
                libc::mq_close(mqd);
                libc::mq_unlink(self.name.as_ptr());
            }
        }
    }
}

/// [`NotifyChannel`] backed by a pair of POSIX message queues.
///
/// Queues are created on open with a bounded capacity; `send` uses an
/// immediate deadline so a full queue reports [`ChannelError::Full`]
/// instead of blocking. Message priority maps straight onto mq priority.
pub struct MqChannel {
    main: MqEndpoint,
    app: MqEndpoint,
}

impl MqChannel {
    /// Opens (creating if needed) the `<prefix>_main` and `<prefix>_app`
    /// queues. `prefix` must start with `/` per POSIX queue naming.
    pub fn open(prefix: &str) -> Result<Self, ChannelError> {
        Ok(Self {
            main: MqEndpoint::open(prefix, Endpoint::Main)?,
            app: MqEndpoint::open(prefix, Endpoint::App)?,
        })
    }

    fn endpoint(&self, endpoint: Endpoint) -> &MqEndpoint {
        match endpoint {
            Endpoint::Main => &self.main,
            Endpoint::App => &self.app,
        }
    }
}

impl NotifyChannel for MqChannel {
    fn send(&self, endpoint: Endpoint, payload: &[u8], priority: u32) -> Result<(), ChannelError> {
        self.endpoint(endpoint).send(payload, priority)
    }

    fn receive(&self, endpoint: Endpoint, buf: &mut [u8]) -> Result<usize, ChannelError> {
        self.endpoint(endpoint).receive(buf)
    }

    fn close(&self, endpoint: Endpoint) {
        self.endpoint(endpoint).close();
    }
}

impl Drop for MqChannel {
    fn drop(&mut self) {
        self.main.release();
        self.app.release();
    }
}
