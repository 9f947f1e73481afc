//! Refresh worker: applies pending config writes, then resamples devices.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::{debug, error, info, warn};

use crate::channel::{Endpoint, NotifyChannel};
use crate::device::DeviceBank;
use crate::error::ChannelError;
use crate::layout::{
    Command, CommandMask, InfoFrame, PAYLOAD_BUZZER_BIT, PAYLOAD_INDEX, PAYLOAD_LED_BIT,
    REG_CONFIG_NUM, REG_INFO_NUM,
};
use crate::store::{RegisterStore, WriteOutcome};

/// What one refresh cycle did with the config region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// No pending command bit was set.
    Clean,
    /// Commands ran and the config region was cleared.
    Applied,
    /// Another writer raced the snapshot; nothing was cleared and the
    /// pending command waits for the next cycle.
    Conflict,
}

/// Report of one refresh cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub commands: CycleOutcome,
    /// Whether resampling found changes and rewrote the info region.
    pub info_written: bool,
}

/// The control loop around the register store.
///
/// States: blocked in `receive` (idle) → one refresh cycle → idle again;
/// a closed channel is the terminal stop. A successful reboot command is a
/// second, deliberately non-returning terminal state: the thread parks until
/// the host goes down.
///
/// Device calls always happen outside the store lock, on locally copied
/// buffers.
pub struct RefreshWorker {
    store: Arc<RegisterStore>,
    channel: Arc<dyn NotifyChannel>,
    devices: DeviceBank,
}

impl RefreshWorker {
    pub fn new(
        store: Arc<RegisterStore>,
        channel: Arc<dyn NotifyChannel>,
        devices: DeviceBank,
    ) -> Self {
        Self {
            store,
            channel,
            devices,
        }
    }

    /// Spawns the worker on a named thread.
    pub fn spawn(self) -> io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("regbank-refresh".to_owned())
            .spawn(move || self.run())
    }

    /// Runs until `receive` reports the channel closed, then releases the
    /// app endpoint. Channel breakdown is fatal to this thread only, never
    /// to the process.
    pub fn run(mut self) {
        info!("refresh worker started");
        let mut tick = [0u8; 8];
        loop {
            match self.channel.receive(Endpoint::App, &mut tick) {
                Ok(n) if n > 0 => {
                    self.refresh_cycle();
                }
                Ok(_) => {
                    warn!("empty notification, refresh worker stopping");
                    break;
                }
                Err(ChannelError::Closed) => {
                    info!("notify channel closed, refresh worker stopping");
                    break;
                }
                Err(e) => {
                    error!("receive failed, refresh worker stopping: {e}");
                    break;
                }
            }
        }
        self.channel.close(Endpoint::App);
    }

    /// One apply-pending-writes-then-resample pass.
    pub fn refresh_cycle(&mut self) -> CycleReport {
        let commands = self.apply_pending();
        if commands == CycleOutcome::Conflict {
            // Defer both the command and the resample to the next tick;
            // the next cycle snapshots fresh state.
            return CycleReport {
                commands,
                info_written: false,
            };
        }
        let info_written = self.sample_info();
        CycleReport {
            commands,
            info_written,
        }
    }

    fn apply_pending(&mut self) -> CycleOutcome {
        let mut snapshot = [0u8; REG_CONFIG_NUM];
        self.store.get(0, &mut snapshot);

        let mask = CommandMask::from_bytes(snapshot[0], snapshot[1]);
        if !mask.pending() {
            return CycleOutcome::Clean;
        }

        for slot in mask.slots() {
            match Command::from_slot(slot) {
                Some(command) => self.dispatch(command, &snapshot),
                None => warn!("unsupported command slot {slot}, ignoring"),
            }
        }

        // Consume the request: the whole config region goes back to zero.
        // Applies only if no other writer touched it since the snapshot.
        let cleared = [0u8; REG_CONFIG_NUM];
        match self.store.compare_and_set(0, &cleared, &snapshot) {
            WriteOutcome::Applied => CycleOutcome::Applied,
            WriteOutcome::Conflict => {
                warn!("config region modified by another writer, deferring");
                CycleOutcome::Conflict
            }
        }
    }

    fn dispatch(&mut self, command: Command, payload: &[u8; REG_CONFIG_NUM]) {
        match command {
            Command::Led => {
                let on = payload[PAYLOAD_INDEX] & PAYLOAD_LED_BIT != 0;
                match self.devices.led.write(on) {
                    Ok(()) => debug!("led set to {on}"),
                    Err(e) => warn!("led write failed: {e}"),
                }
            }
            Command::Buzzer => {
                let on = payload[PAYLOAD_INDEX] & PAYLOAD_BUZZER_BIT != 0;
                match self.devices.buzzer.write(on) {
                    Ok(()) => debug!("buzzer set to {on}"),
                    Err(e) => warn!("buzzer write failed: {e}"),
                }
            }
            Command::Reboot => self.reboot(),
        }
    }

    fn reboot(&mut self) {
        match self.devices.system.reboot() {
            Ok(()) => {
                info!("reboot accepted, waiting for the system to go down");
                // Terminal state: hold the thread until the host restarts.
                loop {
                    thread::park();
                }
            }
            Err(e) => error!("reboot failed: {e}"),
        }
    }

    /// Resamples every adapter into a local frame and rewrites the info
    /// region only when the bytes changed. Adapter read failures keep the
    /// previous (stale) field values.
    fn sample_info(&mut self) -> bool {
        let mut current = [0u8; REG_INFO_NUM];
        self.store.get(REG_CONFIG_NUM, &mut current);
        let mut frame = InfoFrame::decode(&current);

        match self.devices.led.read() {
            Ok(on) => frame.led = on,
            Err(e) => warn!("led read failed: {e}"),
        }
        match self.devices.buzzer.read() {
            Ok(on) => frame.buzzer = on,
            Err(e) => warn!("buzzer read failed: {e}"),
        }
        match self.devices.motion.read() {
            Ok(sample) => frame.motion = sample,
            Err(e) => warn!("motion sensor read failed: {e}"),
        }
        match self.devices.clock.read() {
            Ok(sample) => frame.rtc = sample,
            Err(e) => warn!("rtc read failed: {e}"),
        }
        match self.devices.ambient.read() {
            Ok(sample) => frame.ambient = sample,
            Err(e) => warn!("ambient sensor read failed: {e}"),
        }

        let fresh = frame.encode();
        if fresh == current {
            return false;
        }
        self.store.set(REG_CONFIG_NUM, &fresh);
        true
    }
}
