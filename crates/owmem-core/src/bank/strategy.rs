//! Protocol strategies
//!
//! A bank's behaviour differs from its siblings only in data: command
//! opcodes, frame layout, checksum seed and scope, and whether a commit step
//! exists. Those differences are captured here and selected per bank by a
//! [`BankConfig`].

use super::descriptor::{BankDescriptor, BankFeatures};
use crate::adapter::Speed;
use crate::error::{Error, Result};

/// Largest page the engine can buffer
pub const MAX_PAGE_LENGTH: usize = 64;

/// Largest number of out-of-band bytes after a page
pub const MAX_EXTRA_INFO_LENGTH: usize = 8;

/// Largest scratchpad the engine can stage
pub const MAX_SCRATCHPAD_LENGTH: usize = 64;

/// Length of a credential
pub const CREDENTIAL_LENGTH: usize = 8;

/// Largest number of trailing verification bytes on a page read
pub const MAX_VERIFICATION_BYTES: usize = 4;

/// Largest frame exchanged in one block
pub const MAX_FRAME_LENGTH: usize =
    3 + CREDENTIAL_LENGTH + MAX_PAGE_LENGTH + MAX_EXTRA_INFO_LENGTH + 2 + MAX_VERIFICATION_BYTES;

/// Name of a bank
pub type BankName = heapless::String<32>;

/// How arbitrary-offset reads are performed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    /// Native read command: `[command, addr_lo, addr_hi]` then the data
    Direct {
        /// Read command opcode
        command: u8,
    },
    /// No native read; read the covering pages through the CRC path
    Pages,
    /// Recall into the scratchpad (if the protocol has a recall step), then
    /// read the scratchpad
    Scratchpad,
    /// Single-shot register read without checksum
    Register {
        /// Read command opcode
        command: u8,
        /// Whether the command carries a two-byte address
        addressed: bool,
    },
}

/// CRC-verified page read command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCrcRead {
    /// Read command opcode
    pub command: u8,
    /// Extra bytes clocked after the CRC and excluded from it
    pub verification_bytes: u8,
    /// The command frame carries a credential after the address
    pub credential: bool,
    /// Strong pull-up settle time after a powered credential frame, in ms
    pub power_settle_ms: u16,
}

impl PageCrcRead {
    /// A plain CRC page read with `command`
    pub const fn new(command: u8) -> Self {
        Self {
            command,
            verification_bytes: 0,
            credential: false,
            power_settle_ms: 0,
        }
    }

    /// Gate this read with a credential, powering the frame for `settle_ms`
    pub const fn with_credential(mut self, settle_ms: u16) -> Self {
        self.credential = true;
        self.power_settle_ms = settle_ms;
        self
    }
}

/// Device-computed check returned for each directly written byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EchoCheck {
    /// Nothing is echoed
    None,
    /// One CRC-8 byte, then the programmed byte
    Crc8,
    /// Two complemented CRC-16 bytes, then the programmed byte
    Crc16,
}

/// Direct write: `[command, addr_lo, addr_hi, data...]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectWrite {
    /// Write command opcode
    pub command: u8,
    /// Per-byte echo check
    pub echo: EchoCheck,
}

/// How scratchpad commands address their target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScratchpadAddressing {
    /// Two target-address bytes; read-back returns TA1, TA2, E/S, data and a
    /// CRC-16 over the whole frame
    TargetAddress,
    /// One page byte; read-back returns the data and a CRC-8 over it
    Page,
}

/// Scratchpad-staged commit protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScratchpadProtocol {
    /// Write scratchpad opcode
    pub write_command: u8,
    /// Read scratchpad opcode
    pub read_command: u8,
    /// Copy scratchpad opcode
    pub copy_command: u8,
    /// Recall memory opcode, for banks read through the scratchpad
    pub recall_command: Option<u8>,
    /// Target addressing form
    pub addressing: ScratchpadAddressing,
    /// Scratchpad size in bytes
    pub length: u8,
    /// Commit delay after the copy frame, in ms
    pub copy_delay_ms: u16,
    /// The copy frame carries the read-write credential
    pub copy_credential: bool,
    /// Only whole scratchpad rows may be committed
    pub full_rows: bool,
}

/// A register address whose single-byte writes drive an output latch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatchWrite {
    /// Bank offset of the latch
    pub offset: u16,
    /// Command sent instead of a register write: `[command, b, !b]`
    pub command: u8,
    /// Byte the device returns when it accepted the new latch value
    pub ack: u8,
}

/// Register bank write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterWrite {
    /// Register write opcode: `[command, addr_lo, addr_hi, data...]`
    pub command: u8,
    /// First writable bank offset
    pub writable_start: u16,
    /// Last writable bank offset (inclusive)
    pub writable_end: u16,
    /// Side-effecting latch address
    pub latch: Option<LatchWrite>,
}

impl RegisterWrite {
    /// Whether `offset` is inside the plain writable window
    pub fn is_writable(&self, offset: u16) -> bool {
        (self.writable_start..=self.writable_end).contains(&offset)
    }
}

/// How writes are performed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// The bank cannot be written
    None,
    /// Direct write command
    Direct(DirectWrite),
    /// Scratchpad staging and copy
    Scratchpad(ScratchpadProtocol),
    /// Register writes
    Register(RegisterWrite),
}

/// Seed used for the packet CRC
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PacketSeed {
    /// Page number within the bank
    #[default]
    PageNumber,
    /// Page number within the device's whole address space
    PhysicalPage,
}

/// Everything that selects one bank's behaviour
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BankConfig {
    /// Human-readable bank name
    pub name: BankName,
    /// Static bank shape
    pub descriptor: BankDescriptor,
    /// Speed the device expects
    pub speed: Speed,
    /// Arbitrary-offset read method
    pub read: ReadMode,
    /// CRC-verified page read, for banks with `PAGE_AUTO_CRC`
    pub page_crc: Option<PageCrcRead>,
    /// Write method
    pub write: WriteMode,
    /// Packet CRC seed
    pub packet_seed: PacketSeed,
    /// Use the powered variant of credential-gated reads
    pub powered_reads: bool,
}

impl BankConfig {
    /// Create a read-only configuration with a direct read command
    pub fn new(name: &str, descriptor: BankDescriptor) -> Self {
        let mut bank_name = BankName::new();
        for c in name.chars() {
            if bank_name.push(c).is_err() {
                break;
            }
        }
        Self {
            name: bank_name,
            descriptor,
            speed: Speed::Regular,
            read: ReadMode::Direct { command: 0xF0 },
            page_crc: None,
            write: WriteMode::None,
            packet_seed: PacketSeed::PageNumber,
            powered_reads: false,
        }
    }

    /// Set the device speed
    pub fn with_speed(mut self, speed: Speed) -> Self {
        self.speed = speed;
        self
    }

    /// Set the read method
    pub fn with_read(mut self, read: ReadMode) -> Self {
        self.read = read;
        self
    }

    /// Set the CRC page read
    pub fn with_page_crc(mut self, page_crc: PageCrcRead) -> Self {
        self.page_crc = Some(page_crc);
        self
    }

    /// Set the write method
    pub fn with_write(mut self, write: WriteMode) -> Self {
        self.write = write;
        self
    }

    /// Set the packet CRC seed
    pub fn with_packet_seed(mut self, seed: PacketSeed) -> Self {
        self.packet_seed = seed;
        self
    }

    /// Use powered credential-gated reads by default
    pub fn with_powered_reads(mut self, powered: bool) -> Self {
        self.powered_reads = powered;
        self
    }

    /// Scratchpad protocol used by writes or reads, if any
    pub fn scratchpad(&self) -> Option<&ScratchpadProtocol> {
        match &self.write {
            WriteMode::Scratchpad(sp) => Some(sp),
            _ => None,
        }
    }

    /// Check the configuration for contradictions
    pub fn validate(&self) -> Result<()> {
        let d = &self.descriptor;

        if d.size == 0 || d.page_length == 0 || d.size % u32::from(d.page_length) != 0 {
            return Err(Error::InvalidConfiguration);
        }
        if usize::from(d.page_length) > MAX_PAGE_LENGTH
            || usize::from(d.extra_info_length) > MAX_EXTRA_INFO_LENGTH
        {
            return Err(Error::InvalidConfiguration);
        }
        if d.is_paged() && d.page_length < 3 + u16::from(d.extra_info_length) {
            return Err(Error::InvalidConfiguration);
        }
        if d.size + u32::from(d.start_physical_address) > 0x1_0000 {
            return Err(Error::InvalidConfiguration);
        }

        let auto_crc = d.has(BankFeatures::PAGE_AUTO_CRC);
        if auto_crc != self.page_crc.is_some() {
            return Err(Error::InvalidConfiguration);
        }
        if d.extra_info_length > 0 && !auto_crc {
            // Extra info only arrives on CRC page reads
            return Err(Error::InvalidConfiguration);
        }
        if let Some(crc) = &self.page_crc {
            if usize::from(crc.verification_bytes) > MAX_VERIFICATION_BYTES {
                return Err(Error::InvalidConfiguration);
            }
        }
        if self.read == ReadMode::Pages && !auto_crc {
            return Err(Error::InvalidConfiguration);
        }

        let read_only = d.has(BankFeatures::READ_ONLY);
        match &self.write {
            WriteMode::None => {}
            _ if read_only => return Err(Error::InvalidConfiguration),
            WriteMode::Direct(_) => {}
            WriteMode::Scratchpad(sp) => {
                let len = u16::from(sp.length);
                if len == 0
                    || usize::from(sp.length) > MAX_SCRATCHPAD_LENGTH
                    || !len.is_power_of_two()
                {
                    return Err(Error::InvalidConfiguration);
                }
                if sp.addressing == ScratchpadAddressing::Page && len != d.page_length {
                    return Err(Error::InvalidConfiguration);
                }
                // Rows are aligned to the device address space
                if d.start_physical_address % len != 0 {
                    return Err(Error::InvalidConfiguration);
                }
            }
            WriteMode::Register(reg) => {
                if u32::from(reg.writable_end) >= d.size || reg.writable_start > reg.writable_end {
                    return Err(Error::InvalidConfiguration);
                }
                if let Some(latch) = &reg.latch {
                    if u32::from(latch.offset) >= d.size {
                        return Err(Error::InvalidConfiguration);
                    }
                }
            }
        }

        if let ReadMode::Register { .. } = self.read {
            if d.size as usize > MAX_PAGE_LENGTH {
                return Err(Error::InvalidConfiguration);
            }
        }

        if self.read == ReadMode::Scratchpad {
            match self.scratchpad() {
                Some(sp) if sp.addressing == ScratchpadAddressing::Page => {}
                _ => return Err(Error::InvalidConfiguration),
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor() -> BankDescriptor {
        BankDescriptor::new(128, 32, 0, BankFeatures::READ_WRITE | BankFeatures::NON_VOLATILE)
    }

    #[test]
    fn test_plain_config_is_valid() {
        let config = BankConfig::new("test", descriptor()).with_write(WriteMode::Direct(DirectWrite {
            command: 0x0F,
            echo: EchoCheck::None,
        }));
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_auto_crc_needs_page_read() {
        let mut d = descriptor();
        d.features |= BankFeatures::PAGE_AUTO_CRC;
        let config = BankConfig::new("test", d.clone());
        assert_eq!(config.validate(), Err(Error::InvalidConfiguration));

        let config = BankConfig::new("test", d).with_page_crc(PageCrcRead::new(0xA5));
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_oversized_page_rejected() {
        let d = BankDescriptor::new(256, 128, 0, BankFeatures::READ_WRITE);
        assert_eq!(
            BankConfig::new("big", d).validate(),
            Err(Error::InvalidConfiguration)
        );
    }

    #[test]
    fn test_read_only_with_writer_rejected() {
        let d = BankDescriptor::new(64, 32, 0, BankFeatures::READ_ONLY);
        let config = BankConfig::new("rom", d).with_write(WriteMode::Direct(DirectWrite {
            command: 0x0F,
            echo: EchoCheck::None,
        }));
        assert_eq!(config.validate(), Err(Error::InvalidConfiguration));
    }

    #[test]
    fn test_long_name_truncated() {
        let config = BankConfig::new(
            "a bank name that is much longer than thirty-two characters",
            descriptor(),
        );
        assert_eq!(config.name.len(), 32);
    }
}
