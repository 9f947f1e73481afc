//! Register map shared by the refresh worker and external writers.
//!
//! The table splits into two regions. The *config region* carries write
//! requests from any thread or process: a 16-bit command mask followed by a
//! payload byte. The *info region* mirrors sampled device status and is
//! written only by the worker.

use bitmaps::Bitmap;

use crate::device::{AmbientSample, ClockSample, MotionSample};

/// Number of registers in the configuration region.
pub const REG_CONFIG_NUM: usize = 16;
/// Number of registers in the information region.
pub const REG_INFO_NUM: usize = 24;
/// Total register count.
pub const REG_NUM: usize = REG_CONFIG_NUM + REG_INFO_NUM;

/// Byte offset of the device payload within the config region.
pub const PAYLOAD_INDEX: usize = 2;
/// Payload bit carrying the requested LED state.
pub const PAYLOAD_LED_BIT: u8 = 0x01;
/// Payload bit carrying the requested buzzer state.
pub const PAYLOAD_BUZZER_BIT: u8 = 0x02;

/// Info-region status bit mirroring the LED.
pub const STATUS_LED_BIT: u8 = 0x01;
/// Info-region status bit mirroring the buzzer.
pub const STATUS_BUZZER_BIT: u8 = 0x02;

/// Commands addressable through mask slots 1..=15.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Set the LED to the payload's LED bit.
    Led,
    /// Set the buzzer to the payload's buzzer bit.
    Buzzer,
    /// Reboot the host. Does not return on success.
    Reboot,
}

impl Command {
    /// Maps a mask slot to its command; `None` for unassigned slots.
    pub fn from_slot(slot: usize) -> Option<Self> {
        match slot {
            1 => Some(Command::Led),
            2 => Some(Command::Buzzer),
            3 => Some(Command::Reboot),
            _ => None,
        }
    }

    /// The mask slot this command occupies.
    pub fn slot(self) -> usize {
        match self {
            Command::Led => 1,
            Command::Buzzer => 2,
            Command::Reboot => 3,
        }
    }
}

/// The 16-bit little-endian command mask at the head of the config region.
///
/// Bit 0 is the "pending write exists" sentinel a writer sets to hand the
/// mask to the worker; bits 1..=15 name command slots. [`CommandMask::slots`]
/// visits every set slot in ascending order, so a high slot is never skipped
/// because a lower one happened to exhaust a shifted scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandMask(Bitmap<16>);

impl Default for CommandMask {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandMask {
    /// An empty mask with no pending work.
    pub fn new() -> Self {
        Self(Bitmap::new())
    }

    /// Decodes the two mask bytes (little-endian).
    pub fn from_bytes(lo: u8, hi: u8) -> Self {
        Self(Bitmap::from_value(u16::from_le_bytes([lo, hi])))
    }

    /// Encodes back to the two mask bytes (little-endian).
    pub fn to_bytes(self) -> [u8; 2] {
        self.0.into_value().to_le_bytes()
    }

    /// True if the pending-write sentinel (bit 0) is set.
    pub fn pending(&self) -> bool {
        self.0.get(0)
    }

    /// Requests `command`, also raising the pending sentinel.
    pub fn insert(&mut self, command: Command) {
        self.0.set(0, true);
        self.0.set(command.slot(), true);
    }

    /// Iterates every set command slot (1..=15) in ascending order.
    pub fn slots(&self) -> impl Iterator<Item = usize> {
        let bits = self.0;
        (1..16).filter(move |&slot| bits.get(slot))
    }
}

/// Decoded view of the information region.
///
/// Layout, offsets relative to [`REG_CONFIG_NUM`]:
///
/// | bytes  | field                                        |
/// |--------|----------------------------------------------|
/// | 0      | base status (bit 0 LED, bit 1 buzzer)        |
/// | 1..4   | RTC seconds / minutes / hours                |
/// | 4..18  | gyro x/y/z, accel x/y/z, temperature (i16 LE)|
/// | 18..24 | ambient ir / proximity / lux (u16 LE)        |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InfoFrame {
    pub led: bool,
    pub buzzer: bool,
    pub rtc: ClockSample,
    pub motion: MotionSample,
    pub ambient: AmbientSample,
}

impl InfoFrame {
    /// Decodes an info-region image.
    pub fn decode(bytes: &[u8; REG_INFO_NUM]) -> Self {
        let i16_at = |off: usize| i16::from_le_bytes([bytes[off], bytes[off + 1]]);
        let u16_at = |off: usize| u16::from_le_bytes([bytes[off], bytes[off + 1]]);
        Self {
            led: bytes[0] & STATUS_LED_BIT != 0,
            buzzer: bytes[0] & STATUS_BUZZER_BIT != 0,
            rtc: ClockSample {
                sec: bytes[1],
                min: bytes[2],
                hour: bytes[3],
            },
            motion: MotionSample {
                gyro: [i16_at(4), i16_at(6), i16_at(8)],
                accel: [i16_at(10), i16_at(12), i16_at(14)],
                temp: i16_at(16),
            },
            ambient: AmbientSample {
                ir: u16_at(18),
                proximity: u16_at(20),
                lux: u16_at(22),
            },
        }
    }

    /// Encodes to an info-region image.
    pub fn encode(&self) -> [u8; REG_INFO_NUM] {
        let mut out = [0u8; REG_INFO_NUM];
        if self.led {
            out[0] |= STATUS_LED_BIT;
        }
        if self.buzzer {
            out[0] |= STATUS_BUZZER_BIT;
        }
        out[1] = self.rtc.sec;
        out[2] = self.rtc.min;
        out[3] = self.rtc.hour;
        let words = [
            self.motion.gyro[0],
            self.motion.gyro[1],
            self.motion.gyro[2],
            self.motion.accel[0],
            self.motion.accel[1],
            self.motion.accel[2],
            self.motion.temp,
        ];
        for (i, w) in words.iter().enumerate() {
            out[4 + i * 2..6 + i * 2].copy_from_slice(&w.to_le_bytes());
        }
        out[18..20].copy_from_slice(&self.ambient.ir.to_le_bytes());
        out[20..22].copy_from_slice(&self.ambient.proximity.to_le_bytes());
        out[22..24].copy_from_slice(&self.ambient.lux.to_le_bytes());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_bytes_are_little_endian() {
        let mask = CommandMask::from_bytes(0b0000_0011, 0b0000_0000);
        assert!(mask.pending());
        assert_eq!(mask.slots().collect::<Vec<_>>(), vec![1]);
        assert_eq!(mask.to_bytes(), [0b0000_0011, 0b0000_0000]);
    }

    #[test]
    fn insert_sets_slot_and_sentinel() {
        let mut mask = CommandMask::new();
        assert!(!mask.pending());

        mask.insert(Command::Buzzer);
        assert!(mask.pending());
        assert_eq!(mask.to_bytes(), [0b0000_0101, 0]);
    }

    #[test]
    fn slots_visits_every_set_bit_in_order() {
        // Slot 15 lives in the high byte; a shifted scan that truncates
        // would miss it.
        let mask = CommandMask::from_bytes(0b0000_1011, 0b1000_0000);
        assert_eq!(mask.slots().collect::<Vec<_>>(), vec![1, 3, 15]);
    }

    #[test]
    fn unassigned_slots_have_no_command() {
        assert_eq!(Command::from_slot(1), Some(Command::Led));
        assert_eq!(Command::from_slot(2), Some(Command::Buzzer));
        assert_eq!(Command::from_slot(3), Some(Command::Reboot));
        assert_eq!(Command::from_slot(0), None);
        assert_eq!(Command::from_slot(4), None);
        assert_eq!(Command::from_slot(15), None);
    }

    #[test]
    fn info_frame_round_trip() {
        let frame = InfoFrame {
            led: true,
            buzzer: false,
            rtc: ClockSample {
                sec: 42,
                min: 7,
                hour: 23,
            },
            motion: MotionSample {
                gyro: [-1, 512, i16::MIN],
                accel: [100, -200, 300],
                temp: -40,
            },
            ambient: AmbientSample {
                ir: 0xBEEF,
                proximity: 12,
                lux: u16::MAX,
            },
        };

        assert_eq!(InfoFrame::decode(&frame.encode()), frame);
    }

    #[test]
    fn info_frame_status_bits() {
        let frame = InfoFrame {
            led: true,
            buzzer: true,
            ..Default::default()
        };
        let bytes = frame.encode();
        assert_eq!(bytes[0], STATUS_LED_BIT | STATUS_BUZZER_BIT);
        // All other fields zero
        assert!(bytes[1..].iter().all(|&b| b == 0));
    }
}
