//! Built-in bank configurations
//!
//! One constructor per protocol family. The same definitions ship as RON
//! files for the catalog; these exist so `no_std` users need no parser.

use super::descriptor::{BankDescriptor, BankFeatures};
use super::strategy::{
    BankConfig, DirectWrite, EchoCheck, LatchWrite, PageCrcRead, ReadMode, RegisterWrite,
    ScratchpadAddressing, ScratchpadProtocol, WriteMode,
};

/// 1Kb EEPROM with 8-byte row commits
pub const FAMILY_DS2431: u8 = 0x2D;
/// 4Kb NVRAM with write cycle counters
pub const FAMILY_DS2423: u8 = 0x1D;
/// 32KB password-protected EEPROM
pub const FAMILY_DS1977: u8 = 0x37;
/// 64Kb add-only EPROM
pub const FAMILY_DS2506: u8 = 0x0B;
/// 1Kb add-only EPROM
pub const FAMILY_DS2502: u8 = 0x09;
/// Battery monitor with recall-to-scratchpad pages
pub const FAMILY_DS2438: u8 = 0x26;
/// 8-channel addressable switch
pub const FAMILY_DS2408: u8 = 0x29;

const GENERAL_NV: BankFeatures = BankFeatures::GENERAL_PURPOSE.union(BankFeatures::NON_VOLATILE);

/// DS2431 main memory: direct read, scratchpad writes committed a whole
/// 8-byte row at a time
pub fn ds2431_memory() -> BankConfig {
    let features = GENERAL_NV | BankFeatures::READ_WRITE;
    BankConfig::new("Main Memory", BankDescriptor::new(128, 32, 0x0000, features)).with_write(
        WriteMode::Scratchpad(ScratchpadProtocol {
            write_command: 0x0F,
            read_command: 0xAA,
            copy_command: 0x55,
            recall_command: None,
            addressing: ScratchpadAddressing::TargetAddress,
            length: 8,
            copy_delay_ms: 10,
            copy_credential: false,
            full_rows: true,
        }),
    )
}

/// DS2423 memory: page reads return the page's write cycle counter
pub fn ds2423_memory() -> BankConfig {
    let features = GENERAL_NV | BankFeatures::READ_WRITE | BankFeatures::PAGE_AUTO_CRC;
    let descriptor =
        BankDescriptor::new(512, 32, 0x0000, features).with_extra_info(8, "Write cycle counter");
    BankConfig::new("Memory with write cycle counter", descriptor)
        .with_page_crc(PageCrcRead::new(0xA5))
        .with_write(WriteMode::Scratchpad(ScratchpadProtocol {
            write_command: 0x0F,
            read_command: 0xAA,
            copy_command: 0x5A,
            recall_command: None,
            addressing: ScratchpadAddressing::TargetAddress,
            length: 32,
            copy_delay_ms: 1,
            copy_credential: false,
            full_rows: false,
        }))
}

/// DS1977 memory: password-gated CRC page reads, password-gated commits
pub fn ds1977_memory() -> BankConfig {
    let features = GENERAL_NV
        | BankFeatures::READ_WRITE
        | BankFeatures::PAGE_AUTO_CRC
        | BankFeatures::NEEDS_POWER_DELIVERY;
    BankConfig::new("Main Memory", BankDescriptor::new(32704, 64, 0x0000, features))
        .with_read(ReadMode::Pages)
        .with_page_crc(PageCrcRead::new(0x69).with_credential(5))
        .with_write(WriteMode::Scratchpad(ScratchpadProtocol {
            write_command: 0x0F,
            read_command: 0xAA,
            copy_command: 0x99,
            recall_command: None,
            addressing: ScratchpadAddressing::TargetAddress,
            length: 64,
            copy_delay_ms: 10,
            copy_credential: true,
            full_rows: false,
        }))
        .with_powered_reads(true)
}

/// DS2506 EPROM: program-pulse writes with CRC-16 echo
pub fn ds2506_memory() -> BankConfig {
    let features = GENERAL_NV
        | BankFeatures::WRITE_ONCE
        | BankFeatures::NEEDS_PROGRAM_PULSE
        | BankFeatures::PAGE_AUTO_CRC;
    BankConfig::new("Main Memory", BankDescriptor::new(8192, 32, 0x0000, features))
        .with_page_crc(PageCrcRead::new(0xC3))
        .with_write(WriteMode::Direct(DirectWrite {
            command: 0x0F,
            echo: EchoCheck::Crc16,
        }))
}

/// DS2502 EPROM: program-pulse writes with CRC-8 echo
pub fn ds2502_memory() -> BankConfig {
    let features = GENERAL_NV | BankFeatures::WRITE_ONCE | BankFeatures::NEEDS_PROGRAM_PULSE;
    BankConfig::new("Main Memory", BankDescriptor::new(128, 32, 0x0000, features)).with_write(
        WriteMode::Direct(DirectWrite {
            command: 0x0F,
            echo: EchoCheck::Crc8,
        }),
    )
}

/// DS2438 user pages 3 to 7, read by recalling each page into the scratchpad
pub fn ds2438_user_memory() -> BankConfig {
    let features = GENERAL_NV | BankFeatures::READ_WRITE;
    BankConfig::new("User Memory", BankDescriptor::new(40, 8, 0x0018, features))
        .with_read(ReadMode::Scratchpad)
        .with_write(WriteMode::Scratchpad(ScratchpadProtocol {
            write_command: 0x4E,
            read_command: 0xBE,
            copy_command: 0x48,
            recall_command: Some(0xB8),
            addressing: ScratchpadAddressing::Page,
            length: 8,
            copy_delay_ms: 10,
            copy_credential: false,
            full_rows: true,
        }))
}

/// DS2408 control and status registers at 0x88
pub fn ds2408_registers() -> BankConfig {
    BankConfig::new(
        "Registers",
        BankDescriptor::new(8, 1, 0x0088, BankFeatures::READ_WRITE),
    )
    .with_read(ReadMode::Register {
        command: 0xF0,
        addressed: true,
    })
    .with_write(WriteMode::Register(RegisterWrite {
        command: 0xCC,
        writable_start: 3,
        writable_end: 5,
        latch: Some(LatchWrite {
            offset: 1,
            command: 0x5A,
            ack: 0xAA,
        }),
    }))
}

/// Built-in configuration for a device family
pub fn for_family(family: u8) -> Option<BankConfig> {
    match family {
        FAMILY_DS2431 => Some(ds2431_memory()),
        FAMILY_DS2423 => Some(ds2423_memory()),
        FAMILY_DS1977 => Some(ds1977_memory()),
        FAMILY_DS2506 => Some(ds2506_memory()),
        FAMILY_DS2502 => Some(ds2502_memory()),
        FAMILY_DS2438 => Some(ds2438_user_memory()),
        FAMILY_DS2408 => Some(ds2408_registers()),
        _ => None,
    }
}

/// Part name of a family with a built-in configuration
pub fn device_name(family: u8) -> Option<&'static str> {
    Some(match family {
        FAMILY_DS2431 => "DS2431",
        FAMILY_DS2423 => "DS2423",
        FAMILY_DS1977 => "DS1977",
        FAMILY_DS2506 => "DS2506",
        FAMILY_DS2502 => "DS2502",
        FAMILY_DS2438 => "DS2438",
        FAMILY_DS2408 => "DS2408",
        _ => return None,
    })
}

/// Families with a built-in configuration
pub const FAMILIES: &[u8] = &[
    FAMILY_DS2431,
    FAMILY_DS2423,
    FAMILY_DS1977,
    FAMILY_DS2506,
    FAMILY_DS2502,
    FAMILY_DS2438,
    FAMILY_DS2408,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_validate() {
        for &family in FAMILIES {
            let config = for_family(family).unwrap();
            assert_eq!(config.validate(), Ok(()), "family 0x{:02X}", family);
        }
    }

    #[test]
    fn test_packet_lengths() {
        assert_eq!(ds2431_memory().descriptor.max_packet_data_length(), 29);
        assert_eq!(ds2423_memory().descriptor.max_packet_data_length(), 21);
        assert_eq!(ds1977_memory().descriptor.max_packet_data_length(), 61);
        assert_eq!(ds2408_registers().descriptor.max_packet_data_length(), 0);
    }

    #[test]
    fn test_unknown_family() {
        assert!(for_family(0x01).is_none());
    }
}
