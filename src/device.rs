//! Device adapter contracts.
//!
//! Adapters are thin wrappers over the physical devices (LED, buzzer, RTC,
//! SPI IMU, I²C ambient sensor). Each is an independently swappable trait;
//! the refresh worker only ever sees these contracts and never holds the
//! store lock across a device call.

use std::process::Command;

use crate::error::DeviceError;

/// Raw IMU sample in ADC counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MotionSample {
    pub gyro: [i16; 3],
    pub accel: [i16; 3],
    pub temp: i16,
}

/// RTC time of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClockSample {
    pub sec: u8,
    pub min: u8,
    pub hour: u8,
}

/// Ambient-light sensor sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AmbientSample {
    pub ir: u16,
    pub proximity: u16,
    pub lux: u16,
}

/// On/off LED.
pub trait LedAdapter: Send {
    fn read(&mut self) -> Result<bool, DeviceError>;
    fn write(&mut self, on: bool) -> Result<(), DeviceError>;
}

/// On/off buzzer.
pub trait BuzzerAdapter: Send {
    fn read(&mut self) -> Result<bool, DeviceError>;
    fn write(&mut self, on: bool) -> Result<(), DeviceError>;
}

/// Motion (IMU) sensor.
pub trait MotionAdapter: Send {
    fn read(&mut self) -> Result<MotionSample, DeviceError>;
}

/// Real-time clock.
pub trait ClockAdapter: Send {
    fn read(&mut self) -> Result<ClockSample, DeviceError>;
}

/// Ambient IR/proximity/light sensor.
pub trait AmbientAdapter: Send {
    fn read(&mut self) -> Result<AmbientSample, DeviceError>;
}

/// Host-level control operations.
pub trait SystemControl: Send {
    /// Requests a system reboot.
    ///
    /// `Ok` means the request was accepted and the host is going down; the
    /// caller must not expect to keep running and should park its thread.
    fn reboot(&mut self) -> Result<(), DeviceError>;
}

/// [`SystemControl`] that shells out to the platform `reboot` command.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShellReboot;

impl SystemControl for ShellReboot {
    fn reboot(&mut self) -> Result<(), DeviceError> {
        let status = Command::new("reboot").status()?;
        if status.success() {
            Ok(())
        } else {
            Err(DeviceError::Command(format!("reboot exited with {status}")))
        }
    }
}

/// One adapter per physical device, injected into the refresh worker.
pub struct DeviceBank {
    pub led: Box<dyn LedAdapter>,
    pub buzzer: Box<dyn BuzzerAdapter>,
    pub motion: Box<dyn MotionAdapter>,
    pub clock: Box<dyn ClockAdapter>,
    pub ambient: Box<dyn AmbientAdapter>,
    pub system: Box<dyn SystemControl>,
}
