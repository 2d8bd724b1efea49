//! Addressable switch
//!
//! Eight status and control registers at 0x88. Three of them are plain
//! writable registers; the output latch only changes through the latch
//! command, which takes the value and its complement, answers `0xAA` and
//! then the resulting pin state.

use owmem_core::rom::RomId;

use super::{Link, SimDevice};

const REGISTER_BASE: usize = 0x88;
const REGISTERS: usize = 8;

const READ_REGISTERS: u8 = 0xF0;
const WRITE_REGISTERS: u8 = 0xCC;
const WRITE_LATCH: u8 = 0x5A;
const LATCH_ACK: u8 = 0xAA;

const PIN_STATE: usize = 0;
const OUTPUT_LATCH: usize = 1;
const WRITABLE: core::ops::RangeInclusive<usize> = 3..=5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Command,
    Reading(usize),
    Writing(usize),
    Latch(Option<u8>),
    Done,
}

/// Emulated 8-channel switch
#[derive(Debug)]
pub struct Switch {
    rom: RomId,
    registers: [u8; REGISTERS],
    link: Link,
    state: State,
}

impl Switch {
    /// Create a switch with all outputs off
    pub fn new(rom: RomId) -> Self {
        let mut registers = [0u8; REGISTERS];
        registers[PIN_STATE] = 0xFF;
        registers[OUTPUT_LATCH] = 0xFF;
        registers[6] = 0xFF;
        registers[7] = 0xFF;
        Self {
            rom,
            registers,
            link: Link::default(),
            state: State::Command,
        }
    }

    fn register_index(rx: &[u8]) -> usize {
        usize::from(u16::from_le_bytes([rx[1], rx[2]])).wrapping_sub(REGISTER_BASE)
    }

    fn command(&mut self, out: u8) {
        let rx = self.link.receive(out);
        match (rx[0], rx.len()) {
            (READ_REGISTERS, 3) => self.state = State::Reading(Self::register_index(rx)),
            (WRITE_REGISTERS, 3) => self.state = State::Writing(Self::register_index(rx)),
            (WRITE_LATCH, 1) => self.state = State::Latch(None),
            (READ_REGISTERS | WRITE_REGISTERS, _) => {}
            _ => self.state = State::Done,
        }
    }
}

impl SimDevice for Switch {
    fn rom(&self) -> RomId {
        self.rom
    }

    fn select(&mut self) {
        self.link.reset();
        self.state = State::Command;
    }

    fn transfer(&mut self, out: u8, _powered: bool) -> u8 {
        if let Some(byte) = self.link.pop() {
            return byte;
        }

        match self.state {
            State::Command => self.command(out),
            State::Reading(index) => {
                self.state = State::Reading(index + 1);
                return self.registers.get(index).copied().unwrap_or(0xFF);
            }
            State::Writing(index) => {
                if WRITABLE.contains(&index) {
                    self.registers[index] = out;
                }
                self.state = State::Writing(index + 1);
            }
            State::Latch(None) => self.state = State::Latch(Some(out)),
            State::Latch(Some(value)) => {
                self.state = State::Done;
                if out != !value {
                    log::debug!("{}: latch complement mismatch", self.rom);
                    return 0xFF;
                }
                self.registers[OUTPUT_LATCH] = value;
                self.registers[PIN_STATE] = value;
                self.link.queue(&[LATCH_ACK, value]);
            }
            State::Done => {}
        }
        0xFF
    }

    fn memory(&self) -> &[u8] {
        &self.registers
    }

    fn memory_mut(&mut self) -> &mut [u8] {
        &mut self.registers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::network;
    use owmem_core::bank::presets;
    use owmem_core::Error;

    #[test]
    fn test_register_read() {
        let (mut net, mut bank) = network(presets::FAMILY_DS2408);
        let rom = bank.device().address;
        net.memory_mut(rom)
            .unwrap()
            .copy_from_slice(&[0x5A, 0xFF, 0x00, 0x01, 0x02, 0x83, 0xFF, 0xFF]);

        let mut buf = [0u8; 8];
        bank.read(&mut net, 0, false, &mut buf).unwrap();
        assert_eq!(buf, [0x5A, 0xFF, 0x00, 0x01, 0x02, 0x83, 0xFF, 0xFF]);
        assert_eq!(net.bytes_sent()[..3], [0xF0, 0x88, 0x00]);

        let mut one = [0u8; 1];
        bank.read_page(&mut net, 5, false, &mut one).unwrap();
        assert_eq!(one, [0x83]);
    }

    #[test]
    fn test_writable_window() {
        let (mut net, mut bank) = network(presets::FAMILY_DS2408);
        let rom = bank.device().address;

        bank.write(&mut net, 3, &[0x11, 0x22, 0x33]).unwrap();
        assert_eq!(&net.memory(rom).unwrap()[3..6], &[0x11, 0x22, 0x33]);
    }

    #[test]
    fn test_latch_write() {
        let (mut net, mut bank) = network(presets::FAMILY_DS2408);
        let rom = bank.device().address;

        bank.write(&mut net, 1, &[0x0F]).unwrap();
        let sent = net.bytes_sent();
        let at = sent.iter().position(|&b| b == WRITE_LATCH).unwrap();
        assert_eq!(sent[at..at + 3], [0x5A, 0x0F, 0xF0]);
        assert_eq!(net.memory(rom).unwrap()[..2], [0x0F, 0x0F]);
    }

    #[test]
    fn test_read_only_registers_refused() {
        let (mut net, mut bank) = network(presets::FAMILY_DS2408);

        assert_eq!(
            bank.write(&mut net, 0, &[0x00]),
            Err(Error::UnsupportedOperation)
        );
        assert_eq!(
            bank.write(&mut net, 1, &[0x00, 0x00]),
            Err(Error::UnsupportedOperation)
        );
        assert_eq!(
            bank.write(&mut net, 5, &[0x00, 0x00]),
            Err(Error::UnsupportedOperation)
        );
        assert!(net.events().is_empty());
    }

    #[test]
    fn test_no_packets_or_crc_pages() {
        let (mut net, mut bank) = network(presets::FAMILY_DS2408);

        assert_eq!(
            bank.write_page_packet(&mut net, 0, b"x"),
            Err(Error::UnsupportedOperation)
        );
        assert_eq!(
            bank.read_page_packet(&mut net, 0, false, &mut [0u8; 8]),
            Err(Error::UnsupportedOperation)
        );
        assert_eq!(
            bank.read_page_crc(&mut net, 0, false, &mut [0u8; 1]),
            Err(Error::UnsupportedOperation)
        );
        assert!(net.events().is_empty());
    }
}
