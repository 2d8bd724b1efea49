//! Byte-level device emulations
//!
//! Each model sees the bus one byte slot at a time, exactly as a real
//! device would after being selected: the byte the master drove, and
//! whether strong pull-up power comes on right after it. What the model
//! returns is wired-AND with the master's byte, so a model stays silent by
//! returning `0xFF`.

mod eeprom;
mod eprom;
mod recall;
mod sram;
mod switch;

pub use eeprom::{Eeprom, EepromConfig, Passwords};
pub use eprom::{Eprom, EpromCheck, EpromConfig};
pub use recall::RecallMemory;
pub use sram::Sram;
pub use switch::Switch;

use std::collections::VecDeque;

use owmem_core::bank::presets;
use owmem_core::crc;
use owmem_core::rom::RomId;

/// A simulated device on the network
pub trait SimDevice: Send {
    /// Device address
    fn rom(&self) -> RomId;

    /// The device was addressed after a bus reset; forget any command in progress
    fn select(&mut self);

    /// One byte slot
    ///
    /// `out` is what the master drove. `powered` is set when strong pull-up
    /// power is applied as soon as this byte completes. Returns the bits the
    /// device leaves high.
    fn transfer(&mut self, out: u8, powered: bool) -> u8;

    /// An EPROM program pulse was applied
    fn program_pulse(&mut self) {}

    /// Make the next commit fail silently
    fn fail_next_commit(&mut self) {}

    /// Memory contents as the device addresses them
    fn memory(&self) -> &[u8];

    /// Mutable memory contents
    fn memory_mut(&mut self) -> &mut [u8];
}

/// Bytes received since the last command started, and bytes waiting to be
/// clocked out
#[derive(Debug, Default)]
pub(crate) struct Link {
    rx: Vec<u8>,
    tx: VecDeque<u8>,
}

impl Link {
    pub(crate) fn reset(&mut self) {
        self.rx.clear();
        self.tx.clear();
    }

    /// Next byte the device drives, if it is talking
    pub(crate) fn pop(&mut self) -> Option<u8> {
        self.tx.pop_front()
    }

    pub(crate) fn queue(&mut self, bytes: &[u8]) {
        self.tx.extend(bytes.iter().copied());
    }

    /// Record a received byte and return everything received so far
    pub(crate) fn receive(&mut self, byte: u8) -> &[u8] {
        self.rx.push(byte);
        &self.rx
    }
}

/// Queue `data` followed by its complemented CRC-16, continuing from `seed`
pub(crate) fn queue_with_crc16(link: &mut Link, data: &[u8], seed: u16) {
    link.queue(data);
    link.queue(&crc::crc16_check_bytes(crc::crc16(data, seed)));
}

/// Device preset matching the built-in bank configuration of `rom`'s family
pub fn device_for_family(rom: RomId) -> Option<Box<dyn SimDevice>> {
    let device: Box<dyn SimDevice> = match rom.family() {
        presets::FAMILY_DS2431 => Box::new(Eeprom::new(rom, EepromConfig::ds2431())),
        presets::FAMILY_DS2423 => Box::new(Eeprom::new(rom, EepromConfig::ds2423())),
        presets::FAMILY_DS1977 => Box::new(Eeprom::new(rom, EepromConfig::ds1977())),
        presets::FAMILY_DS2506 => Box::new(Eprom::new(rom, EpromConfig::ds2506())),
        presets::FAMILY_DS2502 => Box::new(Eprom::new(rom, EpromConfig::ds2502())),
        presets::FAMILY_DS2438 => Box::new(RecallMemory::new(rom)),
        presets::FAMILY_DS2408 => Box::new(Switch::new(rom)),
        _ => return None,
    };
    Some(device)
}
