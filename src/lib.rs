//! A virtual register bank for embedded Linux control nodes.
//!
//! One process owns a fixed-size, byte-addressable register table that
//! mirrors hardware I/O (LED, buzzer, RTC, motion sensor, ambient-light
//! sensor). Other threads and processes request device changes by writing
//! into the table's *config region*; a background worker applies those
//! requests and samples the devices back into the *info region*.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────┐  tick   ┌──────────────────┐  wake   ┌────────────────┐
//! │ TickSource │────────▶│ NotifyChannel    │────────▶│ RefreshWorker  │
//! │ (2s cadence)│  send  │ (mq or FIFO)     │ receive │                │
//! └────────────┘         └──────────────────┘         │ apply pending  │
//!                                                     │ resample info  │
//! ┌────────────┐ compare_and_set ┌───────────────┐◀───┘                │
//! │ any writer │────────────────▶│ RegisterStore │◀────────────────────┘
//! └────────────┘                 │ (one mutex)   │
//!                                └───────────────┘
//! ```
//!
//! - **Writers** snapshot the config region, compose a request, and submit
//!   it with [`RegisterStore::compare_and_set`]; a racing writer gets
//!   [`WriteOutcome::Conflict`] and retries from a fresh snapshot.
//! - **The worker** consumes pending commands the same way, so a request
//!   that raced the worker is never silently clobbered, only deferred.
//! - **Notifications** are pure wake-up signals: coalesced or duplicated
//!   ticks are harmless because every cycle re-reads ground truth.
//!
//! # Example
//!
//! ```rust,no_run
//! # fn main() -> Result<(), regbank::ChannelError> {
//! use regbank::device::{
//!     AmbientAdapter, AmbientSample, BuzzerAdapter, ClockAdapter, ClockSample,
//!     DeviceBank, LedAdapter, MotionAdapter, MotionSample, ShellReboot,
//! };
//! use regbank::error::DeviceError;
//! use regbank::layout::{Command, CommandMask, PAYLOAD_LED_BIT};
//! use regbank::node::NodeBuilder;
//!
//! // Stand-in adapters; real ones wrap sysfs/spidev/i2c-dev handles.
//! struct Stub;
//! impl LedAdapter for Stub {
//!     fn read(&mut self) -> Result<bool, DeviceError> { Ok(false) }
//!     fn write(&mut self, _on: bool) -> Result<(), DeviceError> { Ok(()) }
//! }
//! impl BuzzerAdapter for Stub {
//!     fn read(&mut self) -> Result<bool, DeviceError> { Ok(false) }
//!     fn write(&mut self, _on: bool) -> Result<(), DeviceError> { Ok(()) }
//! }
//! impl MotionAdapter for Stub {
//!     fn read(&mut self) -> Result<MotionSample, DeviceError> { Ok(MotionSample::default()) }
//! }
//! impl ClockAdapter for Stub {
//!     fn read(&mut self) -> Result<ClockSample, DeviceError> { Ok(ClockSample::default()) }
//! }
//! impl AmbientAdapter for Stub {
//!     fn read(&mut self) -> Result<AmbientSample, DeviceError> { Ok(AmbientSample::default()) }
//! }
//!
//! let bank = DeviceBank {
//!     led: Box::new(Stub),
//!     buzzer: Box::new(Stub),
//!     motion: Box::new(Stub),
//!     clock: Box::new(Stub),
//!     ambient: Box::new(Stub),
//!     system: Box::new(ShellReboot),
//! };
//! let node = NodeBuilder::new(bank).build()?;
//!
//! // Any thread requests LED-on against a fresh snapshot.
//! let store = node.store();
//! let mut snapshot = [0u8; 3];
//! store.get(0, &mut snapshot);
//!
//! let mut mask = CommandMask::from_bytes(snapshot[0], snapshot[1]);
//! mask.insert(Command::Led);
//! let bytes = mask.to_bytes();
//! let request = [bytes[0], bytes[1], snapshot[2] | PAYLOAD_LED_BIT];
//! store.compare_and_set(0, &request, &snapshot);
//!
//! // ... the next refresh cycle turns the LED on and clears the request.
//! node.shutdown();
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]

pub mod channel;
pub mod device;
pub mod error;
pub mod layout;
pub mod node;
pub mod store;
pub(crate) mod table;
pub mod timer;
pub mod worker;

#[cfg(test)]
mod test_support;

pub use error::{ChannelError, DeviceError};
pub use store::{RegisterStore, WriteOutcome};

pub mod prelude {
    pub use crate::channel::{ChannelBackend, Endpoint, NotifyChannel};
    pub use crate::device::{
        AmbientAdapter, AmbientSample, BuzzerAdapter, ClockAdapter, ClockSample, DeviceBank,
        LedAdapter, MotionAdapter, MotionSample, ShellReboot, SystemControl,
    };
    pub use crate::error::{ChannelError, DeviceError};
    pub use crate::layout::{
        Command, CommandMask, InfoFrame, PAYLOAD_BUZZER_BIT, PAYLOAD_LED_BIT, REG_CONFIG_NUM,
        REG_INFO_NUM, REG_NUM, STATUS_BUZZER_BIT, STATUS_LED_BIT,
    };
    pub use crate::node::{ControlNode, NodeBuilder, NodeConfig};
    pub use crate::store::{RegisterStore, WriteOutcome};
    pub use crate::timer::{REFRESH_TICK, TICK_PRIORITY, TickSource};
    pub use crate::worker::{CycleOutcome, CycleReport, RefreshWorker};
}
