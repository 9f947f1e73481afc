//! Periodic tick source that wakes the refresh worker.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, error, info};

use crate::channel::{Endpoint, NotifyChannel};
use crate::error::ChannelError;

/// Payload carried by one refresh tick.
pub const REFRESH_TICK: [u8; 1] = [1];
/// Priority of tick messages. One logical stream, so a fixed value.
pub const TICK_PRIORITY: u32 = 1;
/// Delay before the first tick.
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(2);
/// Interval between subsequent ticks.
pub const DEFAULT_PERIOD: Duration = Duration::from_secs(2);

/// Posts a one-byte refresh notification to the app endpoint on a fixed
/// cadence: one initial delay, then a repeating interval.
///
/// A dedicated thread rather than a SIGALRM handler: same external behavior,
/// no reentrancy hazards. The loop body stays allocation-free, so `send`
/// remains safe even for implementations that do run in a restricted context.
pub struct TickSource {
    channel: Arc<dyn NotifyChannel>,
    initial_delay: Duration,
    period: Duration,
}

impl TickSource {
    pub fn new(channel: Arc<dyn NotifyChannel>) -> Self {
        Self {
            channel,
            initial_delay: DEFAULT_INITIAL_DELAY,
            period: DEFAULT_PERIOD,
        }
    }

    /// Delay before the first tick (default 2 s).
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Interval between ticks (default 2 s).
    pub fn period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Spawns the tick thread; it runs until the app endpoint closes.
    pub fn spawn(self) -> io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("regbank-tick".to_owned())
            .spawn(move || self.run())
    }

    fn run(self) {
        debug!("tick source started");
        thread::sleep(self.initial_delay);
        loop {
            match self
                .channel
                .send(Endpoint::App, &REFRESH_TICK, TICK_PRIORITY)
            {
                Ok(()) => {}
                // Worker still busy with an earlier cycle; ticks coalesce.
                Err(ChannelError::Full) => debug!("tick queue full, coalescing"),
                Err(ChannelError::Closed) => {
                    info!("app endpoint closed, tick source stopping");
                    break;
                }
                Err(e) => {
                    error!("tick send failed, tick source stopping: {e}");
                    break;
                }
            }
            thread::sleep(self.period);
        }
    }
}
