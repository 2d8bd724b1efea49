//! Page-addressed memory behind recall scratchpads
//!
//! Every page has its own scratchpad. Memory is never read directly: a
//! recall copies a page into its scratchpad, which is then read with a
//! CRC-8 over the page data.

use owmem_core::crc;
use owmem_core::rom::RomId;

use super::{Link, SimDevice};

const PAGE_LENGTH: usize = 8;
const PAGES: usize = 8;

const WRITE_SCRATCHPAD: u8 = 0x4E;
const READ_SCRATCHPAD: u8 = 0xBE;
const COPY_SCRATCHPAD: u8 = 0x48;
const RECALL_MEMORY: u8 = 0xB8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Command,
    Writing { page: usize, cursor: usize },
    Done,
}

/// Emulated recall-memory device with eight 8-byte pages
#[derive(Debug)]
pub struct RecallMemory {
    rom: RomId,
    data: Vec<u8>,
    scratchpads: [[u8; PAGE_LENGTH]; PAGES],
    fail_next: bool,
    link: Link,
    state: State,
}

impl RecallMemory {
    /// Create a device with erased pages
    pub fn new(rom: RomId) -> Self {
        Self {
            rom,
            data: vec![0xFF; PAGE_LENGTH * PAGES],
            scratchpads: [[0xFF; PAGE_LENGTH]; PAGES],
            fail_next: false,
            link: Link::default(),
            state: State::Command,
        }
    }

    fn page_range(page: usize) -> core::ops::Range<usize> {
        page * PAGE_LENGTH..(page + 1) * PAGE_LENGTH
    }

    fn command(&mut self, out: u8, powered: bool) {
        let rx = self.link.receive(out);
        let (cmd, len) = (rx[0], rx.len());
        if len == 1 {
            if ![WRITE_SCRATCHPAD, READ_SCRATCHPAD, COPY_SCRATCHPAD, RECALL_MEMORY].contains(&cmd) {
                self.state = State::Done;
            }
            return;
        }

        let page = usize::from(rx[1]);
        self.state = State::Done;
        if page >= PAGES {
            return;
        }

        match cmd {
            WRITE_SCRATCHPAD => self.state = State::Writing { page, cursor: 0 },
            READ_SCRATCHPAD => {
                let pad = self.scratchpads[page];
                self.link.queue(&pad);
                self.link.queue(&[crc::crc8(&pad, 0)]);
            }
            RECALL_MEMORY => {
                self.scratchpads[page].copy_from_slice(&self.data[Self::page_range(page)]);
            }
            COPY_SCRATCHPAD => {
                if core::mem::take(&mut self.fail_next) || !powered {
                    log::debug!("{}: copy of page {} dropped", self.rom, page);
                    return;
                }
                let pad = self.scratchpads[page];
                self.data[Self::page_range(page)].copy_from_slice(&pad);
                // Busy slots read as zero until the copy is done
                self.link.queue(&[0x00]);
            }
            _ => {}
        }
    }
}

impl SimDevice for RecallMemory {
    fn rom(&self) -> RomId {
        self.rom
    }

    fn select(&mut self) {
        self.link.reset();
        self.state = State::Command;
    }

    fn transfer(&mut self, out: u8, powered: bool) -> u8 {
        if let Some(byte) = self.link.pop() {
            return byte;
        }

        match self.state {
            State::Command => self.command(out, powered),
            State::Writing { page, cursor } => {
                if cursor < PAGE_LENGTH {
                    self.scratchpads[page][cursor] = out;
                }
                self.state = State::Writing {
                    page,
                    cursor: cursor + 1,
                };
            }
            State::Done => {}
        }
        0xFF
    }

    fn fail_next_commit(&mut self) {
        self.fail_next = true;
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
    use crate::tests::network;
    use owmem_core::bank::presets;
    use owmem_core::Error;

    #[test]
    fn test_user_pages_round_trip() {
        let (mut net, mut bank) = network(presets::FAMILY_DS2438);
        let data = *b"battery!";

        bank.write(&mut net, 0, &data).unwrap();

        let mut buf = [0u8; 8];
        bank.read(&mut net, 0, false, &mut buf).unwrap();
        assert_eq!(buf, data);
        assert_eq!(&net.memory(bank.device().address).unwrap()[0x18..0x20], &data);
    }

    #[test]
    fn test_partial_write_keeps_rest_of_page() {
        let (mut net, mut bank) = network(presets::FAMILY_DS2438);
        let rom = bank.device().address;
        net.memory_mut(rom).unwrap()[0x20..0x28].copy_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]);

        bank.write(&mut net, 10, &[0xAA, 0xBB]).unwrap();
        assert_eq!(
            &net.memory(rom).unwrap()[0x20..0x28],
            &[1, 2, 0xAA, 0xBB, 5, 6, 7, 8]
        );

        let mut buf = [0u8; 3];
        bank.read(&mut net, 9, false, &mut buf).unwrap();
        assert_eq!(buf, [2, 0xAA, 0xBB]);
    }

    #[test]
    fn test_dropped_copy() {
        let (mut net, mut bank) = network(presets::FAMILY_DS2438);
        let rom = bank.device().address;
        net.fail_next_commit(rom);

        assert_eq!(
            bank.write(&mut net, 0, &[0; 8]),
            Err(Error::CopyNotConfirmed { address: 3 })
        );
        assert_eq!(&net.memory(rom).unwrap()[0x18..0x20], &[0xFF; 8]);
        assert!(bank.speed_state().is_stale());
    }

    #[test]
    fn test_scratchpad_steps() {
        let (mut net, mut bank) = network(presets::FAMILY_DS2438);
        let rom = bank.device().address;

        assert_eq!(
            bank.write_scratchpad(&mut net, 9, &[0; 7]),
            Err(Error::OutOfRange)
        );

        bank.write_scratchpad(&mut net, 8, b"scratch!").unwrap();
        let pad = bank.read_scratchpad(&mut net, 8).unwrap();
        assert_eq!(pad.target, 4);
        assert_eq!(pad.data.as_slice(), b"scratch!");
        assert_eq!(&net.memory(rom).unwrap()[0x20..0x28], &[0xFF; 8]);

        bank.copy_scratchpad(&mut net, &pad).unwrap();
        assert_eq!(&net.memory(rom).unwrap()[0x20..0x28], b"scratch!");
    }
}
