//! Scratchpad-staged EEPROM and NVRAM
//!
//! Covers the target-address scratchpad devices: plain EEPROM with row
//! commits, NVRAM with per-page write cycle counters, and password
//! protected memory whose reads and commits carry a credential.

use owmem_core::crc;
use owmem_core::rom::RomId;

use super::{queue_with_crc16, Link, SimDevice};

/// Scratchpad write opcode
const WRITE_SCRATCHPAD: u8 = 0x0F;
/// Scratchpad read opcode
const READ_SCRATCHPAD: u8 = 0xAA;
/// Byte pattern driven after a successful copy
const COPY_DONE: u8 = 0xAA;

/// Device credentials
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Passwords {
    /// Grants reads
    pub read: [u8; 8],
    /// Grants reads and commits
    pub full: [u8; 8],
}

/// Shape and command set of an emulated EEPROM
#[derive(Debug, Clone, Copy)]
pub struct EepromConfig {
    /// Memory size in bytes
    pub size: usize,
    /// Page length in bytes
    pub page_length: usize,
    /// Scratchpad length in bytes
    pub scratchpad_length: usize,
    /// Plain read opcode
    pub read_command: Option<u8>,
    /// Page read with CRC opcode
    pub page_crc_command: Option<u8>,
    /// Copy scratchpad opcode
    pub copy_command: u8,
    /// Copies must cover a whole scratchpad row
    pub full_rows: bool,
    /// Page reads return a write cycle counter after the data
    pub counters: bool,
    /// Reads and copies carry a credential
    pub passwords: Option<Passwords>,
    /// Credentials are only checked with strong pull-up applied
    pub requires_power: bool,
}

impl EepromConfig {
    /// 1Kb EEPROM with 8-byte rows
    pub fn ds2431() -> Self {
        Self {
            size: 128,
            page_length: 32,
            scratchpad_length: 8,
            read_command: Some(0xF0),
            page_crc_command: None,
            copy_command: 0x55,
            full_rows: true,
            counters: false,
            passwords: None,
            requires_power: false,
        }
    }

    /// 4Kb NVRAM with write cycle counters
    pub fn ds2423() -> Self {
        Self {
            size: 512,
            page_length: 32,
            scratchpad_length: 32,
            read_command: Some(0xF0),
            page_crc_command: Some(0xA5),
            copy_command: 0x5A,
            full_rows: false,
            counters: true,
            passwords: None,
            requires_power: false,
        }
    }

    /// 32KB password-protected EEPROM
    pub fn ds1977() -> Self {
        Self {
            size: 32704,
            page_length: 64,
            scratchpad_length: 64,
            read_command: None,
            page_crc_command: Some(0x69),
            copy_command: 0x99,
            full_rows: false,
            counters: false,
            passwords: Some(Passwords::default()),
            requires_power: true,
        }
    }

    fn credential_length(&self) -> usize {
        if self.passwords.is_some() {
            8
        } else {
            0
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Command,
    WritingScratchpad(usize),
    Reading(usize),
    Streaming(usize),
    Done,
}

/// Emulated scratchpad EEPROM
#[derive(Debug)]
pub struct Eeprom {
    rom: RomId,
    config: EepromConfig,
    data: Vec<u8>,
    counters: Vec<u32>,
    scratchpad: Vec<u8>,
    target: u16,
    end: usize,
    copied: bool,
    fail_next: bool,
    link: Link,
    state: State,
}

impl Eeprom {
    /// Create a blank device
    pub fn new(rom: RomId, config: EepromConfig) -> Self {
        Self {
            rom,
            config,
            data: vec![0xFF; config.size],
            counters: vec![0; config.size / config.page_length],
            scratchpad: vec![0xFF; config.scratchpad_length],
            target: 0,
            end: 0,
            copied: false,
            fail_next: false,
            link: Link::default(),
            state: State::Command,
        }
    }

    /// Change the device credentials
    pub fn set_passwords(&mut self, passwords: Passwords) {
        self.config.passwords = Some(passwords);
    }

    /// Write cycle counter of `page`
    pub fn counter(&self, page: usize) -> u32 {
        self.counters.get(page).copied().unwrap_or(0)
    }

    fn offset(&self) -> usize {
        usize::from(self.target) & (self.config.scratchpad_length - 1)
    }

    fn end_status(&self) -> u8 {
        let copied = if self.copied { 0x80 } else { 0 };
        (self.end as u8 & 0x3F) | copied
    }

    /// Queue one page, its counter and CRC starting at `address`
    fn queue_page(&mut self, address: usize, seed: u16) {
        let page_len = self.config.page_length;
        let page = address / page_len;
        let end = ((page + 1) * page_len).min(self.data.len());
        let mut frame = self.data.get(address..end).unwrap_or(&[]).to_vec();
        if self.config.counters {
            frame.extend_from_slice(&self.counter(page).to_le_bytes());
            frame.extend_from_slice(&[0; 4]);
        }
        queue_with_crc16(&mut self.link, &frame, seed);
    }

    fn credential_ok(&self, credential: &[u8], powered: bool, full_access: bool) -> bool {
        let Some(passwords) = self.config.passwords else {
            return true;
        };
        if self.config.requires_power && !powered {
            log::debug!("{}: credential presented without power", self.rom);
            return false;
        }
        credential == passwords.full || (!full_access && credential == passwords.read)
    }

    fn copy(&mut self, frame: &[u8], powered: bool) {
        let target = u16::from_le_bytes([frame[1], frame[2]]);
        let authorized = target == self.target && frame[3] == self.end_status();
        let offset = self.offset();
        let whole_row = offset == 0 && self.end == self.config.scratchpad_length - 1;
        let credential_ok = self.credential_ok(&frame[4..], powered, true);

        if core::mem::take(&mut self.fail_next)
            || !powered
            || !authorized
            || (self.config.full_rows && !whole_row)
            || !credential_ok
        {
            log::debug!("{}: copy to 0x{:04X} refused", self.rom, target);
            return;
        }

        let start = usize::from(target);
        for (i, &byte) in self.scratchpad[offset..=self.end].iter().enumerate() {
            if let Some(cell) = self.data.get_mut(start + i) {
                *cell = byte;
            }
        }
        if let Some(counter) = self.counters.get_mut(start / self.config.page_length) {
            *counter += 1;
        }
        self.copied = true;
        self.link.queue(&[COPY_DONE]);
    }

    fn command(&mut self, out: u8, powered: bool) {
        let rx = self.link.receive(out).to_vec();
        let pw = self.config.credential_length();

        match (rx[0], rx.len()) {
            (WRITE_SCRATCHPAD, 3) => {
                self.target = u16::from_le_bytes([rx[1], rx[2]]);
                self.end = self.offset();
                self.copied = false;
                self.state = State::WritingScratchpad(self.offset());
            }
            (WRITE_SCRATCHPAD, _) => {}
            (READ_SCRATCHPAD, _) => {
                let [lo, hi] = self.target.to_le_bytes();
                let mut frame = vec![lo, hi, self.end_status()];
                frame.extend_from_slice(&self.scratchpad[self.offset()..=self.end]);
                queue_with_crc16(&mut self.link, &frame, crc::crc16(&[READ_SCRATCHPAD], 0));
                self.state = State::Done;
            }
            (cmd, len) if cmd == self.config.copy_command => {
                if len == 4 + pw {
                    self.copy(&rx, powered);
                    self.state = State::Done;
                }
            }
            (cmd, 3) if Some(cmd) == self.config.read_command => {
                self.state = State::Reading(usize::from(u16::from_le_bytes([rx[1], rx[2]])));
            }
            (cmd, len) if Some(cmd) == self.config.page_crc_command => {
                if len == 3 + pw {
                    if !self.credential_ok(&rx[3..], powered, false) {
                        self.state = State::Done;
                        return;
                    }
                    let address = usize::from(u16::from_le_bytes([rx[1], rx[2]]));
                    self.queue_page(address, crc::crc16(&rx[..3], 0));
                    let next = (address / self.config.page_length + 1) * self.config.page_length;
                    self.state = State::Streaming(next);
                }
            }
            (cmd, _) if Some(cmd) == self.config.read_command => {}
            _ => self.state = State::Done,
        }
    }
}

impl SimDevice for Eeprom {
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
            State::Command => {
                self.command(out, powered);
                0xFF
            }
            State::WritingScratchpad(cursor) => {
                if cursor < self.scratchpad.len() {
                    self.scratchpad[cursor] = out;
                    self.end = cursor;
                }
                self.state = State::WritingScratchpad(cursor + 1);
                0xFF
            }
            State::Reading(address) => {
                self.state = State::Reading(address + 1);
                self.data.get(address).copied().unwrap_or(0xFF)
            }
            State::Streaming(address) => {
                // The CRC restarts from zero on every page after the first
                self.queue_page(address, 0);
                self.state = State::Streaming(address + self.config.page_length);
                self.link.pop().unwrap_or(0xFF)
            }
            State::Done => 0xFF,
        }
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
    use crate::tests::{bank, family_rom, network};
    use crate::{BusEvent, DummyNetwork};
    use owmem_core::adapter::{Adapter, AdapterFeatures, PowerCondition};
    use owmem_core::bank::{
        presets, Bank, Credentials, Device, NoProgress, PageCrcRead, ReadMode, SpeedState,
    };
    use owmem_core::Error;

    #[test]
    fn test_ds2431_round_trip_across_rows() {
        let (mut net, mut bank) = network(presets::FAMILY_DS2431);
        let data = *b"0123456789";

        bank.write(&mut net, 5, &data).unwrap();

        let mut buf = [0u8; 10];
        bank.read(&mut net, 5, false, &mut buf).unwrap();
        assert_eq!(buf, data);

        let memory = net.memory(bank.device().address).unwrap();
        assert_eq!(&memory[..5], &[0xFF; 5]);
        assert_eq!(&memory[5..15], &data);
        assert_eq!(&memory[15..24], &[0xFF; 9]);
    }

    #[test]
    fn test_ds2431_partial_row_refused_without_merge() {
        let rom = family_rom(presets::FAMILY_DS2431);
        let mut device = Eeprom::new(rom, EepromConfig::ds2431());
        device.select();
        for b in [WRITE_SCRATCHPAD, 0x02, 0x00, 0x11, 0x22] {
            device.transfer(b, false);
        }
        device.select();
        for (i, b) in [0x55, 0x02, 0x00, 0x03].into_iter().enumerate() {
            device.transfer(b, i == 3);
        }
        assert_eq!(device.transfer(0xFF, false), 0xFF);
        assert_eq!(device.memory()[2], 0xFF);
    }

    #[test]
    fn test_packet_hi_on_page_zero() {
        let (mut net, mut bank) = network(presets::FAMILY_DS2431);

        bank.write_page_packet(&mut net, 0, b"hi").unwrap();

        let check = crc::crc16_check_bytes(crc::crc16(&[2, b'h', b'i'], 0));
        let memory = net.memory(bank.device().address).unwrap();
        assert_eq!(&memory[..5], &[2, b'h', b'i', check[0], check[1]]);

        let mut buf = [0u8; 29];
        let len = bank.read_page_packet(&mut net, 0, false, &mut buf).unwrap();
        assert_eq!(&buf[..len], b"hi");
    }

    #[test]
    fn test_packet_bound_to_page() {
        let (mut net, mut bank) = network(presets::FAMILY_DS2431);
        bank.write_page_packet(&mut net, 1, b"moved").unwrap();

        let rom = bank.device().address;
        let memory = net.memory_mut(rom).unwrap();
        let (page0, page1) = memory.split_at_mut(32);
        page0.copy_from_slice(&page1[..32]);

        let mut buf = [0u8; 29];
        assert_eq!(
            bank.read_page_packet(&mut net, 0, false, &mut buf),
            Err(Error::ChecksumMismatch {
                credential_suspect: false
            })
        );
        assert_eq!(bank.read_page_packet(&mut net, 1, false, &mut buf), Ok(5));
    }

    #[test]
    fn test_packet_length_checked() {
        let (mut net, mut bank) = network(presets::FAMILY_DS2431);
        net.memory_mut(bank.device().address).unwrap()[32] = 30;

        let mut buf = [0u8; 29];
        assert_eq!(
            bank.read_page_packet(&mut net, 1, false, &mut buf),
            Err(Error::InvalidPacketLength { length: 30, max: 29 })
        );
    }

    #[test]
    fn test_oversized_packet_write_rejected() {
        let (mut net, mut bank) = network(presets::FAMILY_DS2431);
        assert_eq!(
            bank.write_page_packet(&mut net, 0, &[0; 30]),
            Err(Error::OutOfRange)
        );
        assert!(net.events().is_empty());
    }

    #[test]
    fn test_copy_not_confirmed_forces_reverify() {
        let (mut net, mut bank) = network(presets::FAMILY_DS2431);
        let rom = bank.device().address;
        bank.read(&mut net, 0, false, &mut [0u8; 8]).unwrap();
        assert_eq!(bank.speed_state(), SpeedState::Verified);

        net.fail_next_commit(rom);
        assert_eq!(
            bank.write(&mut net, 0, &[1; 8]),
            Err(Error::CopyNotConfirmed { address: 0 })
        );
        assert_eq!(bank.speed_state(), SpeedState::Stale);
        assert_eq!(&net.memory(rom).unwrap()[..8], &[0xFF; 8]);

        net.take_events();
        bank.write(&mut net, 0, &[1; 8]).unwrap();
        let events = net.events();
        assert!(matches!(events[0], BusEvent::SetSpeed(_)));
        assert!(matches!(events[1], BusEvent::Presence { present: true, .. }));
        assert!(matches!(events[2], BusEvent::Select { present: true, .. }));
        assert_eq!(&net.memory(rom).unwrap()[..8], &[1; 8]);
    }

    #[test]
    fn test_scratchpad_steps() {
        let (mut net, mut bank) = network(presets::FAMILY_DS2431);
        let rom = bank.device().address;

        bank.write_scratchpad(&mut net, 8, &[7; 8]).unwrap();
        let pad = bank.read_scratchpad(&mut net, 8).unwrap();
        assert_eq!(pad.target, 8);
        assert_eq!(pad.end_status & 0x1F, 7);
        assert_eq!(pad.data.as_slice(), &[7; 8]);
        assert!(!pad.copy_completed());

        bank.copy_scratchpad(&mut net, &pad).unwrap();
        assert_eq!(&net.memory(rom).unwrap()[8..16], &[7; 8]);

        assert_eq!(
            bank.write_scratchpad(&mut net, 12, &[0; 8]),
            Err(Error::OutOfRange)
        );
    }

    #[test]
    fn test_ds2423_counter_in_extra_info() {
        let (mut net, mut bank) = network(presets::FAMILY_DS2423);

        bank.write(&mut net, 64, b"abc").unwrap();
        bank.write(&mut net, 70, b"def").unwrap();

        let mut page = [0u8; 32];
        let mut extra = [0u8; 8];
        bank.read_page_crc_with_extra(&mut net, 2, false, &mut page, &mut extra)
            .unwrap();
        assert_eq!(&page[..3], b"abc");
        assert_eq!(&page[6..9], b"def");
        assert_eq!(&extra[..4], &2u32.to_le_bytes());
        assert_eq!(&extra[4..], &[0; 4]);
    }

    #[test]
    fn test_ds2423_corruption_detected() {
        let (mut net, mut bank) = network(presets::FAMILY_DS2423);
        bank.read_page_crc(&mut net, 0, false, &mut [0u8; 32]).unwrap();

        net.corrupt_read(3);
        assert_eq!(
            bank.read_page_crc(&mut net, 1, false, &mut [0u8; 32]),
            Err(Error::ChecksumMismatch {
                credential_suspect: false
            })
        );
        assert!(bank.speed_state().is_stale());

        net.take_events();
        bank.read_page_crc(&mut net, 1, false, &mut [0u8; 32]).unwrap();
        assert!(matches!(net.events()[0], BusEvent::SetSpeed(_)));
    }

    #[test]
    fn test_ds2423_continuation_reads_next_page() {
        let (mut net, mut bank) = network(presets::FAMILY_DS2423);
        let rom = bank.device().address;
        for (i, byte) in net.memory_mut(rom).unwrap().iter_mut().enumerate() {
            *byte = i as u8;
        }

        let mut first = [0u8; 32];
        let mut second = [0u8; 32];
        bank.read_page_crc(&mut net, 4, false, &mut first).unwrap();
        bank.read_page_crc(&mut net, 5, true, &mut second).unwrap();

        let memory = net.memory(rom).unwrap();
        assert_eq!(&first, &memory[128..160]);
        assert_eq!(&second, &memory[160..192]);
        let selects = net
            .events()
            .iter()
            .filter(|e| matches!(e, BusEvent::Select { .. }))
            .count();
        assert_eq!(selects, 1);
    }

    #[test]
    fn test_ds2423_read_across_pages_with_progress() {
        let (mut net, mut bank) = network(presets::FAMILY_DS2423);
        let rom = bank.device().address;
        for (i, byte) in net.memory_mut(rom).unwrap().iter_mut().enumerate() {
            *byte = (i * 7) as u8;
        }

        struct Count(usize, usize);
        impl owmem_core::bank::ReadProgress for Count {
            fn reading(&mut self, total: usize) {
                self.0 = total;
            }
            fn read_progress(&mut self, done: usize) {
                self.1 = done;
            }
        }

        let mut buf = [0u8; 100];
        let mut progress = Count(0, 0);
        bank.read_with_progress(&mut net, 20, &mut buf, &mut progress)
            .unwrap();
        assert_eq!(&buf[..], &net.memory(rom).unwrap()[20..120]);
        assert_eq!((progress.0, progress.1), (100, 100));

        let all = bank.read_all(&mut net).unwrap();
        assert_eq!(&all[..], net.memory(rom).unwrap());
    }

    #[test]
    fn test_progress_read_past_end_sends_nothing() {
        let (mut net, mut bank) = network(presets::FAMILY_DS2423);

        struct Started(bool);
        impl owmem_core::bank::ReadProgress for Started {
            fn reading(&mut self, _total: usize) {
                self.0 = true;
            }
            fn read_progress(&mut self, _done: usize) {}
        }

        let mut progress = Started(false);
        assert_eq!(
            bank.read_with_progress(&mut net, 480, &mut [0u8; 100], &mut progress),
            Err(Error::OutOfRange)
        );
        assert!(net.events().is_empty());
        assert!(!progress.0);
    }

    #[test]
    fn test_progress_read_readdresses_after_verification_bytes() {
        let (mut net, _) = network(presets::FAMILY_DS2423);
        let rom = family_rom(presets::FAMILY_DS2423);
        for (i, byte) in net.memory_mut(rom).unwrap().iter_mut().enumerate() {
            *byte = (i * 3) as u8;
        }

        let page_crc = PageCrcRead {
            verification_bytes: 2,
            ..PageCrcRead::new(0xA5)
        };
        let config = presets::ds2423_memory()
            .with_read(ReadMode::Pages)
            .with_page_crc(page_crc);
        let mut bank = Bank::new(Device::new(rom), config).unwrap();

        let mut buf = [0u8; 100];
        bank.read_with_progress(&mut net, 20, &mut buf, &mut NoProgress)
            .unwrap();
        assert_eq!(&buf[..], &net.memory(rom).unwrap()[20..120]);

        let selects = net
            .events()
            .iter()
            .filter(|e| matches!(e, BusEvent::Select { .. }))
            .count();
        assert_eq!(selects, 4);
    }

    #[test]
    fn test_ds2423_packet_hi_and_corrupted_payload() {
        let (mut net, mut bank) = network(presets::FAMILY_DS2423);
        let rom = bank.device().address;

        bank.write_page_packet(&mut net, 0, b"hi").unwrap();
        let mut buf = [0u8; 29];
        assert_eq!(bank.read_page_packet(&mut net, 0, false, &mut buf), Ok(2));
        assert_eq!(&buf[..2], b"hi");

        // The device CRC still matches; only the packet CRC can notice
        net.memory_mut(rom).unwrap()[1] ^= 0x04;
        assert_eq!(
            bank.read_page_packet(&mut net, 0, false, &mut buf),
            Err(Error::ChecksumMismatch {
                credential_suspect: false
            })
        );
        assert!(bank.speed_state().is_stale());
    }

    #[test]
    fn test_ds2431_commit_runs_on_power() {
        let (mut net, mut bank) = network(presets::FAMILY_DS2431);
        let rom = bank.device().address;

        bank.write_scratchpad(&mut net, 0, &[1; 8]).unwrap();
        let pad = bank.read_scratchpad(&mut net, 0).unwrap();
        net.take_events();
        bank.copy_scratchpad(&mut net, &pad).unwrap();

        let events = net.take_events();
        let start = events
            .iter()
            .position(|e| *e == BusEvent::PowerStart(PowerCondition::AfterNextByte))
            .unwrap();
        assert!(matches!(events[start + 1], BusEvent::Byte { out, .. } if out == pad.end_status));
        assert!(matches!(events[start + 2], BusEvent::Delay(_)));
        assert_eq!(events[start + 3], BusEvent::PowerNormal);
        assert!(matches!(events[start + 4], BusEvent::Byte { out: 0xFF, back: 0xAA }));
        assert!(!net.is_powered());
        assert_eq!(&net.memory(rom).unwrap()[..8], &[1; 8]);
    }

    #[test]
    fn test_commit_needs_power_after_byte() {
        let rom = family_rom(presets::FAMILY_DS2431);
        let mut net = DummyNetwork::with_features(
            AdapterFeatures::POWER_DELIVERY | AdapterFeatures::PROGRAM_PULSE,
        );
        net.attach_family(rom).unwrap();
        let mut bank = bank(presets::FAMILY_DS2431);

        assert_eq!(
            bank.write(&mut net, 0, &[1; 8]),
            Err(Error::PowerDeliveryUnavailable)
        );
        assert!(net.events().is_empty());
        assert_eq!(
            net.start_power_delivery(PowerCondition::AfterNextByte),
            Err(Error::AdapterFault)
        );

        // Reads never need it
        bank.read(&mut net, 0, false, &mut [0u8; 8]).unwrap();
    }

    fn ds1977() -> (DummyNetwork, Bank) {
        let (net, mut bank) = network(presets::FAMILY_DS1977);
        bank.set_credentials(Credentials::read_write(Passwords::default().full));
        (net, bank)
    }

    #[test]
    fn test_ds1977_powered_round_trip() {
        let (mut net, mut bank) = ds1977();

        bank.write(&mut net, 70, b"secret").unwrap();
        let mut buf = [0u8; 6];
        bank.read(&mut net, 70, false, &mut buf).unwrap();
        assert_eq!(&buf, b"secret");

        assert!(net
            .events()
            .contains(&BusEvent::PowerStart(PowerCondition::AfterNextByte)));
        assert!(!net.is_powered());
    }

    #[test]
    fn test_ds1977_read_across_pages() {
        let (mut net, mut bank) = ds1977();
        let rom = bank.device().address;
        for (i, byte) in net.memory_mut(rom).unwrap().iter_mut().enumerate() {
            *byte = (i % 251) as u8;
        }

        let mut buf = [0u8; 140];
        bank.read(&mut net, 60, false, &mut buf).unwrap();
        assert_eq!(&buf[..], &net.memory(rom).unwrap()[60..200]);
    }

    #[test]
    fn test_ds1977_unpowered_read_looks_like_bad_credential() {
        let (mut net, mut bank) = ds1977();
        bank.set_powered_reads(false);

        assert_eq!(
            bank.read_page_crc(&mut net, 0, false, &mut [0u8; 64]),
            Err(Error::ChecksumMismatch {
                credential_suspect: true
            })
        );
    }

    #[test]
    fn test_ds1977_wrong_credential() {
        let (mut net, mut bank) = ds1977();
        bank.set_credentials(Credentials::read_only([0x42; 8]));

        assert_eq!(
            bank.read(&mut net, 0, false, &mut [0u8; 4]),
            Err(Error::ChecksumMismatch {
                credential_suspect: true
            })
        );
        assert_eq!(
            bank.write(&mut net, 0, &[0; 4]),
            Err(Error::CredentialMissing)
        );
    }

    #[test]
    fn test_ds1977_preconditions_before_traffic() {
        let (mut net, mut bank) = network(presets::FAMILY_DS1977);
        assert_eq!(
            bank.read(&mut net, 0, false, &mut [0u8; 4]),
            Err(Error::CredentialMissing)
        );

        let mut weak = DummyNetwork::with_features(AdapterFeatures::OVERDRIVE);
        weak.attach_family(bank.device().address).unwrap();
        bank.set_credentials(Credentials::read_write([0; 8]));
        assert_eq!(
            bank.read(&mut weak, 0, false, &mut [0u8; 4]),
            Err(Error::PowerDeliveryUnavailable)
        );
        assert_eq!(
            bank.write(&mut weak, 0, &[0; 4]),
            Err(Error::PowerDeliveryUnavailable)
        );

        assert!(net.events().is_empty());
        assert!(weak.events().is_empty());
        assert!(bank.speed_state().is_stale());
    }

    #[test]
    fn test_bank_for_unknown_rom() {
        let rom = family_rom(presets::FAMILY_DS2431);
        let mut net = DummyNetwork::new();
        let mut bank = bank(presets::FAMILY_DS2431);
        assert_eq!(
            bank.read(&mut net, 0, false, &mut [0u8; 1]),
            Err(Error::DeviceNotPresent)
        );
        net.attach(Box::new(Eeprom::new(rom, EepromConfig::ds2431())));
        assert!(bank.read(&mut net, 0, false, &mut [0u8; 1]).is_ok());
    }
}
