//! Add-only EPROM
//!
//! Bytes are programmed one at a time. After each byte the device answers
//! a CRC over what it received, waits for the program pulse and then
//! drives the byte it now holds. Programming can only clear bits.

use owmem_core::crc;
use owmem_core::rom::RomId;

use super::{queue_with_crc16, Link, SimDevice};

/// Byte program opcode
const WRITE_MEMORY: u8 = 0x0F;
/// Plain read opcode
const READ_MEMORY: u8 = 0xF0;

/// Check bytes the device answers after each programmed byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpromCheck {
    /// Complemented CRC-16
    Crc16,
    /// CRC-8
    Crc8,
}

/// Shape of an emulated EPROM
#[derive(Debug, Clone, Copy)]
pub struct EpromConfig {
    /// Memory size in bytes
    pub size: usize,
    /// Page length in bytes
    pub page_length: usize,
    /// Check answered after each programmed byte
    pub check: EpromCheck,
    /// Page read with CRC opcode
    pub page_crc_command: Option<u8>,
}

impl EpromConfig {
    /// 64Kb EPROM
    pub fn ds2506() -> Self {
        Self {
            size: 8192,
            page_length: 32,
            check: EpromCheck::Crc16,
            page_crc_command: Some(0xC3),
        }
    }

    /// 1Kb EPROM
    pub fn ds2502() -> Self {
        Self {
            size: 128,
            page_length: 32,
            check: EpromCheck::Crc8,
            page_crc_command: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Command,
    /// Check bytes sent, waiting for the pulse and the echo slot
    Programming { address: usize, byte: u8 },
    /// Next byte programs `address`
    Data(usize),
    Reading(usize),
    Streaming(usize),
    Done,
}

/// Emulated add-only EPROM
#[derive(Debug)]
pub struct Eprom {
    rom: RomId,
    config: EpromConfig,
    data: Vec<u8>,
    link: Link,
    state: State,
}

impl Eprom {
    /// Create a blank (all ones) device
    pub fn new(rom: RomId, config: EpromConfig) -> Self {
        Self {
            rom,
            config,
            data: vec![0xFF; config.size],
            link: Link::default(),
            state: State::Command,
        }
    }

    /// Queue the check bytes for a programmed byte, continuing from `received`
    fn queue_check(&mut self, received: &[u8], seed: &[u8]) {
        match self.config.check {
            EpromCheck::Crc16 => {
                let crc = crc::crc16(received, crc::crc16(seed, 0));
                self.link.queue(&crc::crc16_check_bytes(crc));
            }
            EpromCheck::Crc8 => {
                let crc = crc::crc8(received, crc::crc8(seed, 0));
                self.link.queue(&[crc]);
            }
        }
    }

    fn queue_page(&mut self, address: usize, seed: u16) {
        let page_len = self.config.page_length;
        let end = ((address / page_len + 1) * page_len).min(self.data.len());
        let frame = self.data.get(address..end).unwrap_or(&[]).to_vec();
        queue_with_crc16(&mut self.link, &frame, seed);
    }

    fn command(&mut self, out: u8) {
        let rx = self.link.receive(out).to_vec();

        match (rx[0], rx.len()) {
            (WRITE_MEMORY, 4) => {
                let address = usize::from(u16::from_le_bytes([rx[1], rx[2]]));
                self.queue_check(&rx, &[]);
                self.state = State::Programming {
                    address,
                    byte: rx[3],
                };
            }
            (READ_MEMORY, 3) => {
                self.state = State::Reading(usize::from(u16::from_le_bytes([rx[1], rx[2]])));
            }
            (cmd, 3) if Some(cmd) == self.config.page_crc_command => {
                let address = usize::from(u16::from_le_bytes([rx[1], rx[2]]));
                self.queue_page(address, crc::crc16(&rx, 0));
                let page_len = self.config.page_length;
                self.state = State::Streaming((address / page_len + 1) * page_len);
            }
            (WRITE_MEMORY | READ_MEMORY, _) => {}
            (cmd, _) if Some(cmd) == self.config.page_crc_command => {}
            _ => self.state = State::Done,
        }
    }
}

impl SimDevice for Eprom {
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
            State::Command => {
                self.command(out);
                0xFF
            }
            State::Programming { address, .. } => {
                self.state = State::Data(address + 1);
                self.data.get(address).copied().unwrap_or(0xFF)
            }
            State::Data(address) => {
                let [lo, hi] = (address as u16).to_le_bytes();
                match self.config.check {
                    EpromCheck::Crc16 => self.queue_check(&[out], &[lo, hi]),
                    EpromCheck::Crc8 => self.queue_check(&[out], &[lo]),
                }
                self.state = State::Programming { address, byte: out };
                0xFF
            }
            State::Reading(address) => {
                self.state = State::Reading(address + 1);
                self.data.get(address).copied().unwrap_or(0xFF)
            }
            State::Streaming(address) => {
                self.queue_page(address, 0);
                self.state = State::Streaming(address + self.config.page_length);
                self.link.pop().unwrap_or(0xFF)
            }
            State::Done => 0xFF,
        }
    }

    fn program_pulse(&mut self) {
        if let State::Programming { address, byte } = self.state {
            if let Some(cell) = self.data.get_mut(address) {
                *cell &= byte;
            }
        }
    }

    fn memory(&self) -> &[u8] {
        &self.data
    }

    fn memory_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{bank, family_rom, network};
    use crate::{BusEvent, DummyNetwork};
    use owmem_core::adapter::AdapterFeatures;
    use owmem_core::bank::presets;
    use owmem_core::Error;

    fn pulses(net: &DummyNetwork) -> usize {
        net.events()
            .iter()
            .filter(|e| matches!(e, BusEvent::ProgramPulse))
            .count()
    }

    #[test]
    fn test_ds2506_program_and_read() {
        let (mut net, mut bank) = network(presets::FAMILY_DS2506);

        bank.write(&mut net, 0x21, &[0x12, 0x34, 0x56, 0x78]).unwrap();
        assert_eq!(pulses(&net), 4);

        let mut buf = [0u8; 4];
        bank.read(&mut net, 0x21, false, &mut buf).unwrap();
        assert_eq!(buf, [0x12, 0x34, 0x56, 0x78]);
    }

    #[test]
    fn test_ds2502_program_with_crc8() {
        let (mut net, mut bank) = network(presets::FAMILY_DS2502);

        bank.write(&mut net, 10, b"abc").unwrap();

        let memory = net.memory(bank.device().address).unwrap();
        assert_eq!(&memory[9..14], &[0xFF, b'a', b'b', b'c', 0xFF]);
    }

    #[test]
    fn test_bits_only_clear() {
        let (mut net, mut bank) = network(presets::FAMILY_DS2506);
        let rom = bank.device().address;
        net.memory_mut(rom).unwrap()[0] = 0x0F;

        assert_eq!(
            bank.write(&mut net, 0, &[0xF0]),
            Err(Error::EchoMismatch { address: 0 })
        );
        assert_eq!(net.memory(rom).unwrap()[0], 0x00);
        assert!(bank.speed_state().is_stale());
    }

    #[test]
    fn test_bad_echo_crc_stops_before_pulse() {
        let (mut net, mut bank) = network(presets::FAMILY_DS2506);
        bank.read(&mut net, 0, false, &mut [0u8; 1]).unwrap();

        net.corrupt_read(0);
        assert_eq!(
            bank.write(&mut net, 0, &[0x00]),
            Err(Error::ChecksumMismatch {
                credential_suspect: false
            })
        );
        assert_eq!(pulses(&net), 0);
        assert_eq!(net.memory(bank.device().address).unwrap()[0], 0xFF);
    }

    #[test]
    fn test_needs_program_pulse_adapter() {
        let mut net = DummyNetwork::with_features(AdapterFeatures::POWER_DELIVERY);
        net.attach_family(family_rom(presets::FAMILY_DS2502)).unwrap();
        let mut bank = bank(presets::FAMILY_DS2502);

        assert_eq!(
            bank.write(&mut net, 0, &[0x00]),
            Err(Error::ProgramPulseUnavailable)
        );
        assert!(net.events().is_empty());

        // Reads do not need the pulse
        bank.read(&mut net, 0, false, &mut [0u8; 4]).unwrap();
    }

    #[test]
    fn test_ds2506_page_crc_continuation() {
        let (mut net, mut bank) = network(presets::FAMILY_DS2506);
        let memory = net.memory_mut(bank.device().address).unwrap();
        memory[32..64].fill(0x11);
        memory[64..96].fill(0x22);

        let mut page = [0u8; 32];
        bank.read_page_crc(&mut net, 1, false, &mut page).unwrap();
        assert_eq!(page, [0x11; 32]);

        net.take_events();
        bank.read_page_crc(&mut net, 2, true, &mut page).unwrap();
        assert_eq!(page, [0x22; 32]);
        assert!(!net
            .events()
            .iter()
            .any(|e| matches!(e, BusEvent::Select { .. })));
    }

    #[test]
    fn test_ds2502_has_no_crc_page_read() {
        let (mut net, mut bank) = network(presets::FAMILY_DS2502);
        assert_eq!(
            bank.read_page_crc(&mut net, 0, false, &mut [0u8; 32]),
            Err(Error::UnsupportedOperation)
        );
        assert!(net.events().is_empty());
    }
}
