//! Plain memory with direct read and write commands

use owmem_core::rom::RomId;

use super::{Link, SimDevice};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Command,
    Reading(usize),
    Writing(usize),
    Ignoring,
}

/// Memory read with `[read, lo, hi]` and written with `[write, lo, hi, data...]`
#[derive(Debug)]
pub struct Sram {
    rom: RomId,
    read_command: u8,
    write_command: u8,
    data: Vec<u8>,
    link: Link,
    state: State,
}

impl Sram {
    /// Create a blank memory of `size` bytes
    pub fn new(rom: RomId, size: usize, read_command: u8, write_command: u8) -> Self {
        Self {
            rom,
            read_command,
            write_command,
            data: vec![0xFF; size],
            link: Link::default(),
            state: State::Command,
        }
    }
}

impl SimDevice for Sram {
    fn rom(&self) -> RomId {
        self.rom
    }

    fn select(&mut self) {
        self.link.reset();
        self.state = State::Command;
    }

    fn transfer(&mut self, out: u8, _powered: bool) -> u8 {
        match self.state {
            State::Command => {
                let rx = self.link.receive(out);
                if rx[0] != self.read_command && rx[0] != self.write_command {
                    self.state = State::Ignoring;
                } else if rx.len() == 3 {
                    let address = usize::from(u16::from_le_bytes([rx[1], rx[2]]));
                    self.state = if rx[0] == self.read_command {
                        State::Reading(address)
                    } else {
                        State::Writing(address)
                    };
                }
                0xFF
            }
            State::Reading(address) => {
                self.state = State::Reading(address + 1);
                self.data.get(address).copied().unwrap_or(0xFF)
            }
            State::Writing(address) => {
                if let Some(byte) = self.data.get_mut(address) {
                    *byte = out;
                }
                self.state = State::Writing(address + 1);
                0xFF
            }
            State::Ignoring => 0xFF,
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
    use crate::tests::family_rom;
    use crate::{BusEvent, DummyNetwork};
    use owmem_core::bank::{
        Bank, BankConfig, BankDescriptor, BankFeatures, Device, DirectWrite, EchoCheck, WriteMode,
    };
    use owmem_core::Error;

    fn rom() -> RomId {
        family_rom(0x7E)
    }

    fn plain_bank() -> Bank {
        let features = BankFeatures::GENERAL_PURPOSE | BankFeatures::READ_WRITE;
        let config = BankConfig::new("SRAM", BankDescriptor::new(16, 8, 0, features)).with_write(
            WriteMode::Direct(DirectWrite {
                command: 0x0F,
                echo: EchoCheck::None,
            }),
        );
        Bank::new(Device::new(rom()), config).unwrap()
    }

    fn network(write_command: u8) -> DummyNetwork {
        let mut net = DummyNetwork::new();
        net.attach(Box::new(Sram::new(rom(), 16, 0xF0, write_command)));
        net
    }

    #[test]
    fn test_write_then_read() {
        let mut net = network(0x0F);
        let mut bank = plain_bank();

        bank.write(&mut net, 0, &[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
        let mut buf = [0u8; 8];
        bank.read(&mut net, 0, false, &mut buf).unwrap();
        assert_eq!(buf, [1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(&net.memory(rom()).unwrap()[8..], &[0xFF; 8]);
    }

    #[test]
    fn test_out_of_range_sends_nothing() {
        let mut net = network(0x0F);
        let mut bank = plain_bank();

        assert_eq!(bank.write(&mut net, 12, &[0; 9]), Err(Error::OutOfRange));
        assert_eq!(
            bank.read(&mut net, 16, false, &mut [0u8; 1]),
            Err(Error::OutOfRange)
        );
        assert_eq!(
            bank.read_page_crc(&mut net, 0, false, &mut [0u8; 8]),
            Err(Error::UnsupportedOperation)
        );
        assert!(net.events().is_empty());
        assert!(bank.speed_state().is_stale());
    }

    #[test]
    fn test_verify_catches_ignored_write() {
        let mut net = network(0x55);
        let mut bank = plain_bank();

        assert_eq!(
            bank.write(&mut net, 4, &[0x12, 0x34]),
            Err(Error::VerifyFailed { address: 4 })
        );
        assert!(bank.speed_state().is_stale());

        bank.set_write_verification(false);
        assert_eq!(bank.write(&mut net, 4, &[0x12, 0x34]), Ok(()));
    }

    #[test]
    fn test_continuation_skips_select() {
        let mut net = network(0x0F);
        let mut bank = plain_bank();
        for (i, byte) in net.memory_mut(rom()).unwrap().iter_mut().enumerate() {
            *byte = i as u8;
        }

        let mut head = [0u8; 5];
        let mut tail = [0u8; 11];
        bank.read(&mut net, 0, false, &mut head).unwrap();
        net.take_events();
        bank.read(&mut net, 5, true, &mut tail).unwrap();

        assert_eq!(head, [0, 1, 2, 3, 4]);
        assert_eq!(tail[..], (5..16).collect::<Vec<u8>>()[..]);
        assert!(net
            .events()
            .iter()
            .all(|e| matches!(e, BusEvent::Byte { out: 0xFF, .. })));
    }

    #[test]
    fn test_pages_and_packets_without_device_crc() {
        let mut net = network(0x0F);
        let mut bank = plain_bank();
        assert_eq!(bank.max_packet_data_length(), 5);

        bank.write_page_packet(&mut net, 1, b"abc").unwrap();

        let mut page = [0u8; 8];
        bank.read_page(&mut net, 1, false, &mut page).unwrap();
        assert_eq!(&page[..4], &[3, b'a', b'b', b'c']);

        let mut buf = [0u8; 5];
        assert_eq!(bank.read_page_packet(&mut net, 1, false, &mut buf), Ok(3));
        assert_eq!(&buf[..3], b"abc");
        assert_eq!(
            bank.read_page_packet(&mut net, 1, false, &mut [0u8; 4]),
            Err(Error::BufferTooSmall)
        );
    }
}
