//! Bank catalog for runtime loading and lookup
//!
//! This module provides the `BankCatalog` type for loading bank definitions
//! from RON files at runtime. One file describes one device family:
//!
//! ```ron
//! (
//!     device: "DS2431",
//!     family: 0x2D,
//!     banks: [
//!         (
//!             name: "Main Memory",
//!             size: 128,
//!             page_length: 32,
//!             features: (general_purpose: true, read_write: true, non_volatile: true),
//!             read: Direct(command: 0xF0),
//!             write: Scratchpad(
//!                 write_command: 0x0F, read_command: 0xAA, copy_command: 0x55,
//!                 length: 8, copy_delay_ms: 10, full_rows: true,
//!             ),
//!         ),
//!     ],
//! )
//! ```

use alloc::{string::String, vec::Vec};
use std::fs;
use std::io;
use std::path::Path;

use crate::adapter::Speed;
use crate::bank::{
    presets, BankConfig, BankDescriptor, BankFeatures, DirectWrite, EchoCheck, LatchWrite,
    PacketSeed, PageCrcRead, ReadMode, RegisterWrite, ScratchpadAddressing, ScratchpadProtocol,
    WriteMode,
};

/// Error type for catalog operations
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// I/O error reading files
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// RON parsing error
    #[error("Parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),
    /// A bank definition is inconsistent
    #[error("Validation error: {0}")]
    Validation(String),
}

// ============================================================================
// RON deserialization types (intermediate format)
// ============================================================================

/// Capability flags (RON format)
#[derive(Debug, Clone, Copy, Default, serde::Deserialize)]
#[serde(default)]
struct FeaturesDef {
    general_purpose: bool,
    read_write: bool,
    write_once: bool,
    read_only: bool,
    non_volatile: bool,
    needs_program_pulse: bool,
    needs_power_delivery: bool,
    page_auto_crc: bool,
}

impl From<FeaturesDef> for BankFeatures {
    fn from(def: FeaturesDef) -> Self {
        let table = [
            (def.general_purpose, BankFeatures::GENERAL_PURPOSE),
            (def.read_write, BankFeatures::READ_WRITE),
            (def.write_once, BankFeatures::WRITE_ONCE),
            (def.read_only, BankFeatures::READ_ONLY),
            (def.non_volatile, BankFeatures::NON_VOLATILE),
            (def.needs_program_pulse, BankFeatures::NEEDS_PROGRAM_PULSE),
            (def.needs_power_delivery, BankFeatures::NEEDS_POWER_DELIVERY),
            (def.page_auto_crc, BankFeatures::PAGE_AUTO_CRC),
        ];
        table
            .into_iter()
            .filter(|(set, _)| *set)
            .fold(BankFeatures::empty(), |acc, (_, flag)| acc | flag)
    }
}

/// Bus speed (RON format)
#[derive(Debug, Clone, Copy, Default, serde::Deserialize)]
enum SpeedDef {
    #[default]
    Regular,
    Flex,
    Overdrive,
}

impl From<SpeedDef> for Speed {
    fn from(def: SpeedDef) -> Self {
        match def {
            SpeedDef::Regular => Speed::Regular,
            SpeedDef::Flex => Speed::Flex,
            SpeedDef::Overdrive => Speed::Overdrive,
        }
    }
}

/// Read method (RON format)
#[derive(Debug, Clone, Copy, serde::Deserialize)]
enum ReadDef {
    Direct { command: u8 },
    Pages,
    Scratchpad,
    Register {
        command: u8,
        #[serde(default)]
        addressed: bool,
    },
}

impl Default for ReadDef {
    fn default() -> Self {
        ReadDef::Direct { command: 0xF0 }
    }
}

impl From<ReadDef> for ReadMode {
    fn from(def: ReadDef) -> Self {
        match def {
            ReadDef::Direct { command } => ReadMode::Direct { command },
            ReadDef::Pages => ReadMode::Pages,
            ReadDef::Scratchpad => ReadMode::Scratchpad,
            ReadDef::Register { command, addressed } => ReadMode::Register { command, addressed },
        }
    }
}

/// CRC page read (RON format)
#[derive(Debug, Clone, Copy, serde::Deserialize)]
struct PageCrcDef {
    command: u8,
    #[serde(default)]
    verification_bytes: u8,
    #[serde(default)]
    credential: bool,
    #[serde(default)]
    power_settle_ms: u16,
}

impl From<PageCrcDef> for PageCrcRead {
    fn from(def: PageCrcDef) -> Self {
        PageCrcRead {
            command: def.command,
            verification_bytes: def.verification_bytes,
            credential: def.credential,
            power_settle_ms: def.power_settle_ms,
        }
    }
}

/// Out-of-band page bytes (RON format)
#[derive(Debug, Clone, serde::Deserialize)]
struct ExtraInfoDef {
    length: u8,
    description: String,
}

/// Echo check (RON format)
#[derive(Debug, Clone, Copy, Default, serde::Deserialize)]
enum EchoDef {
    #[default]
    None,
    Crc8,
    Crc16,
}

impl From<EchoDef> for EchoCheck {
    fn from(def: EchoDef) -> Self {
        match def {
            EchoDef::None => EchoCheck::None,
            EchoDef::Crc8 => EchoCheck::Crc8,
            EchoDef::Crc16 => EchoCheck::Crc16,
        }
    }
}

/// Scratchpad addressing (RON format)
#[derive(Debug, Clone, Copy, Default, serde::Deserialize)]
enum AddressingDef {
    #[default]
    TargetAddress,
    Page,
}

/// Latch register (RON format)
#[derive(Debug, Clone, Copy, serde::Deserialize)]
struct LatchDef {
    offset: u16,
    command: u8,
    #[serde(default = "default_latch_ack")]
    ack: u8,
}

fn default_latch_ack() -> u8 {
    0xAA
}

/// Write method (RON format)
#[derive(Debug, Clone, Copy, Default, serde::Deserialize)]
enum WriteDef {
    #[default]
    None,
    Direct {
        command: u8,
        #[serde(default)]
        echo: EchoDef,
    },
    Scratchpad {
        write_command: u8,
        read_command: u8,
        copy_command: u8,
        #[serde(default)]
        recall_command: Option<u8>,
        #[serde(default)]
        addressing: AddressingDef,
        length: u8,
        #[serde(default)]
        copy_delay_ms: u16,
        #[serde(default)]
        copy_credential: bool,
        #[serde(default)]
        full_rows: bool,
    },
    Register {
        command: u8,
        writable_start: u16,
        writable_end: u16,
        #[serde(default)]
        latch: Option<LatchDef>,
    },
}

impl From<WriteDef> for WriteMode {
    fn from(def: WriteDef) -> Self {
        match def {
            WriteDef::None => WriteMode::None,
            WriteDef::Direct { command, echo } => WriteMode::Direct(DirectWrite {
                command,
                echo: echo.into(),
            }),
            WriteDef::Scratchpad {
                write_command,
                read_command,
                copy_command,
                recall_command,
                addressing,
                length,
                copy_delay_ms,
                copy_credential,
                full_rows,
            } => WriteMode::Scratchpad(ScratchpadProtocol {
                write_command,
                read_command,
                copy_command,
                recall_command,
                addressing: match addressing {
                    AddressingDef::TargetAddress => ScratchpadAddressing::TargetAddress,
                    AddressingDef::Page => ScratchpadAddressing::Page,
                },
                length,
                copy_delay_ms,
                copy_credential,
                full_rows,
            }),
            WriteDef::Register {
                command,
                writable_start,
                writable_end,
                latch,
            } => WriteMode::Register(RegisterWrite {
                command,
                writable_start,
                writable_end,
                latch: latch.map(|l| LatchWrite {
                    offset: l.offset,
                    command: l.command,
                    ack: l.ack,
                }),
            }),
        }
    }
}

/// Packet CRC seed (RON format)
#[derive(Debug, Clone, Copy, Default, serde::Deserialize)]
enum PacketSeedDef {
    #[default]
    PageNumber,
    PhysicalPage,
}

/// Single bank definition in RON format
#[derive(Debug, Clone, serde::Deserialize)]
struct BankDef {
    name: String,
    size: u32,
    #[serde(default = "default_page_length")]
    page_length: u16,
    #[serde(default)]
    start: u16,
    #[serde(default)]
    features: FeaturesDef,
    #[serde(default)]
    extra_info: Option<ExtraInfoDef>,
    #[serde(default)]
    speed: SpeedDef,
    #[serde(default)]
    read: ReadDef,
    #[serde(default)]
    page_crc: Option<PageCrcDef>,
    #[serde(default)]
    write: WriteDef,
    #[serde(default)]
    packet_seed: PacketSeedDef,
    #[serde(default)]
    powered_reads: bool,
}

fn default_page_length() -> u16 {
    1
}

/// Device definition containing its banks
#[derive(Debug, Clone, serde::Deserialize)]
struct DeviceDef {
    device: String,
    family: u8,
    banks: Vec<BankDef>,
}

impl BankDef {
    fn into_config(self) -> BankConfig {
        let mut descriptor =
            BankDescriptor::new(self.size, self.page_length, self.start, self.features.into());
        if let Some(extra) = &self.extra_info {
            descriptor = descriptor.with_extra_info(extra.length, &extra.description);
        }

        let mut config = BankConfig::new(&self.name, descriptor)
            .with_speed(self.speed.into())
            .with_read(self.read.into())
            .with_write(self.write.into())
            .with_packet_seed(match self.packet_seed {
                PacketSeedDef::PageNumber => PacketSeed::PageNumber,
                PacketSeedDef::PhysicalPage => PacketSeed::PhysicalPage,
            })
            .with_powered_reads(self.powered_reads);
        if let Some(crc) = self.page_crc {
            config = config.with_page_crc(crc.into());
        }
        config
    }
}

// ============================================================================
// Bank catalog
// ============================================================================

/// One bank of one device family
#[derive(Debug, Clone)]
pub struct BankEntry {
    /// Device name
    pub device: String,
    /// Family code the bank belongs to
    pub family: u8,
    /// Bank configuration
    pub config: BankConfig,
}

/// Runtime bank catalog
///
/// Holds a collection of bank definitions that can be loaded from RON files.
#[derive(Debug, Clone, Default)]
pub struct BankCatalog {
    entries: Vec<BankEntry>,
}

impl BankCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Catalog of the compiled-in presets
    pub fn builtin() -> Self {
        let entries = presets::FAMILIES
            .iter()
            .filter_map(|&family| {
                Some(BankEntry {
                    device: presets::device_name(family)?.into(),
                    family,
                    config: presets::for_family(family)?,
                })
            })
            .collect();
        Self { entries }
    }

    /// Load bank definitions from a single RON file
    pub fn load_file(&mut self, path: &Path) -> Result<usize, CatalogError> {
        let content = fs::read_to_string(path)?;
        self.load_ron(&content)
    }

    /// Load bank definitions from a RON string
    pub fn load_ron(&mut self, content: &str) -> Result<usize, CatalogError> {
        let device_def: DeviceDef = ron::from_str(content)?;

        // A device is added whole or not at all
        let mut entries = Vec::with_capacity(device_def.banks.len());
        for bank_def in device_def.banks {
            let config = bank_def.into_config();
            config.validate().map_err(|e| {
                CatalogError::Validation(alloc::format!(
                    "{} {}: {}",
                    device_def.device,
                    config.name,
                    e
                ))
            })?;
            entries.push(BankEntry {
                device: device_def.device.clone(),
                family: device_def.family,
                config,
            });
        }

        let count = entries.len();
        self.entries.extend(entries);
        Ok(count)
    }

    /// Load all RON files from a directory
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize, CatalogError> {
        let mut total = 0;

        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();

            if path.extension().is_some_and(|ext| ext == "ron") {
                total += self.load_file(&path)?;
            }
        }

        Ok(total)
    }

    /// Get all entries in the catalog
    pub fn entries(&self) -> &[BankEntry] {
        &self.entries
    }

    /// Get the number of banks in the catalog
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Banks of a device family
    pub fn find_by_family(&self, family: u8) -> Vec<&BankEntry> {
        self.entries.iter().filter(|e| e.family == family).collect()
    }

    /// Banks of a device (case-insensitive partial match)
    pub fn find_by_device(&self, device: &str) -> Vec<&BankEntry> {
        let device_lower = device.to_lowercase();
        self.entries
            .iter()
            .filter(|e| e.device.to_lowercase().contains(&device_lower))
            .collect()
    }

    /// Iterate over all entries
    pub fn iter(&self) -> impl Iterator<Item = &BankEntry> {
        self.entries.iter()
    }
}
