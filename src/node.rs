//! Process-root wiring: configuration, builder, and the running node.
//!
//! The root owns the store, the channel, and both background threads, and
//! hands references to the collaborators that need them; nothing lives in
//! module-level singletons.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use log::warn;

use crate::channel::{ChannelBackend, Endpoint, NotifyChannel};
use crate::device::DeviceBank;
use crate::error::ChannelError;
use crate::store::RegisterStore;
use crate::timer::{DEFAULT_INITIAL_DELAY, DEFAULT_PERIOD, TickSource};
use crate::worker::RefreshWorker;

/// Startup configuration for a control node.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Notification transport, chosen once here.
    pub backend: ChannelBackend,
    /// Delay before the first refresh tick.
    pub initial_delay: Duration,
    /// Interval between refresh ticks.
    pub period: Duration,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            backend: ChannelBackend::default(),
            initial_delay: DEFAULT_INITIAL_DELAY,
            period: DEFAULT_PERIOD,
        }
    }
}

/// Builds a [`ControlNode`] from a device bank and optional overrides.
pub struct NodeBuilder {
    config: NodeConfig,
    devices: DeviceBank,
}

impl NodeBuilder {
    pub fn new(devices: DeviceBank) -> Self {
        Self {
            config: NodeConfig::default(),
            devices,
        }
    }

    /// Selects the notification transport.
    pub fn backend(mut self, backend: ChannelBackend) -> Self {
        self.config.backend = backend;
        self
    }

    /// Delay before the first refresh tick (default 2 s).
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.config.initial_delay = delay;
        self
    }

    /// Interval between refresh ticks (default 2 s).
    pub fn period(mut self, period: Duration) -> Self {
        self.config.period = period;
        self
    }

    /// Opens the configured transport and starts the node.
    #[cfg(unix)]
    pub fn build(self) -> Result<ControlNode, ChannelError> {
        let channel: Arc<dyn NotifyChannel> = Arc::from(crate::channel::open(&self.config.backend)?);
        ControlNode::start(channel, self.devices, self.config)
    }

    /// Starts the node over a caller-supplied transport (e.g. an in-process
    /// channel in tests, or a custom backend).
    pub fn build_with_channel(
        self,
        channel: Arc<dyn NotifyChannel>,
    ) -> Result<ControlNode, ChannelError> {
        ControlNode::start(channel, self.devices, self.config)
    }
}

/// A running control node: the shared store plus the worker and tick
/// threads.
pub struct ControlNode {
    store: Arc<RegisterStore>,
    channel: Arc<dyn NotifyChannel>,
    worker: JoinHandle<()>,
    tick: JoinHandle<()>,
}

impl ControlNode {
    fn start(
        channel: Arc<dyn NotifyChannel>,
        devices: DeviceBank,
        config: NodeConfig,
    ) -> Result<Self, ChannelError> {
        let store = Arc::new(RegisterStore::new());

        let worker = RefreshWorker::new(Arc::clone(&store), Arc::clone(&channel), devices)
            .spawn()?;
        let tick = TickSource::new(Arc::clone(&channel))
            .initial_delay(config.initial_delay)
            .period(config.period)
            .spawn()?;

        Ok(Self {
            store,
            channel,
            worker,
            tick,
        })
    }

    /// The shared register store. External writers read with `get`, prepare
    /// a request and submit it with `compare_and_set` against their
    /// snapshot.
    pub fn store(&self) -> Arc<RegisterStore> {
        Arc::clone(&self.store)
    }

    /// The notification channel, e.g. for posting an out-of-cadence refresh.
    pub fn channel(&self) -> Arc<dyn NotifyChannel> {
        Arc::clone(&self.channel)
    }

    /// Closes the app endpoint and joins both background threads.
    ///
    /// Closure is the only stop signal: the worker wakes out of `receive`
    /// with `Closed` and the tick source stops on its next send.
    pub fn shutdown(self) {
        self.channel.close(Endpoint::App);
        if self.worker.join().is_err() {
            warn!("refresh worker panicked during shutdown");
        }
        if self.tick.join().is_err() {
            warn!("tick source panicked during shutdown");
        }
    }
}
