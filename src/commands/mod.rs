//! CLI command implementations
//!
//! Every bank command resolves its bank in the catalog, opens the adapter
//! with the bank's device on it, runs against a [`Target`], and finally
//! closes the adapter so a simulated memory image gets saved.

mod dump;
mod info;
mod list;
mod packet;
mod read;
mod write;

pub use dump::run_dump_pages;
pub use info::run_info;
pub use list::list_banks;
pub use packet::{run_read_packet, run_write_packet};
pub use read::run_read;
pub use write::run_write;

use crate::adapters::{self, Session};
use crate::cli::TargetArgs;
use owmem_core::bank::{Bank, Credential, Credentials, Device};
use owmem_core::catalog::{BankCatalog, BankEntry};

/// A bank bound to a device on an open adapter
pub struct Target {
    /// Open adapter
    pub session: Session,
    /// Bank to work on
    pub bank: Bank,
    /// Device name from the catalog
    pub device: String,
}

impl Target {
    /// Close the adapter
    pub fn finish(self) -> Result<(), Box<dyn std::error::Error>> {
        self.session.finish()
    }
}

/// Resolve the bank named by `args` and open the adapter for it
pub fn open_target(
    db: &BankCatalog,
    args: &TargetArgs,
) -> Result<Target, Box<dyn std::error::Error>> {
    let banks = find_device(db, &args.device)?;
    let entry = banks.get(args.bank).ok_or_else(|| {
        format!(
            "{} has {} bank(s), no bank {}",
            args.device,
            banks.len(),
            args.bank
        )
    })?;

    let session = adapters::open_adapter(&args.adapter, entry.family)?;
    let mut bank = Bank::new(Device::new(session.rom), entry.config.clone())?;

    let credentials = Credentials {
        read_only: args.read_password.as_deref().map(parse_credential).transpose()?,
        read_write: args.password.as_deref().map(parse_credential).transpose()?,
    };
    bank.set_credentials(credentials);
    if args.unpowered {
        bank.set_powered_reads(false);
    }

    log::debug!("Using bank '{}' of {} on {}", bank.name(), entry.device, session.rom);
    Ok(Target {
        session,
        bank,
        device: entry.device.clone(),
    })
}

/// Banks of the device named either by part name or by family code
fn find_device<'a>(
    db: &'a BankCatalog,
    device: &str,
) -> Result<Vec<&'a BankEntry>, Box<dyn std::error::Error>> {
    let banks = match device.strip_prefix("0x").or_else(|| device.strip_prefix("0X")) {
        Some(hex) => {
            let family = u8::from_str_radix(hex, 16)
                .map_err(|e| format!("Invalid family code '{}': {}", device, e))?;
            db.find_by_family(family)
        }
        None => db
            .iter()
            .filter(|e| e.device.eq_ignore_ascii_case(device))
            .collect(),
    };

    if banks.is_empty() {
        return Err(format!(
            "Unknown device: {} (use 'owmem list-banks' to see known devices)",
            device
        )
        .into());
    }
    Ok(banks)
}

/// Parse 16 hex digits into a credential, first byte first
fn parse_credential(s: &str) -> Result<Credential, String> {
    if s.len() != 16 || !s.is_ascii() {
        return Err("Credential must be 16 hex digits".into());
    }
    let mut credential = Credential::default();
    for (i, b) in credential.iter_mut().enumerate() {
        *b = u8::from_str_radix(&s[i * 2..i * 2 + 2], 16)
            .map_err(|e| format!("Invalid credential: {}", e))?;
    }
    Ok(credential)
}

/// Print `data` as a hex dump with addresses starting at `base`
pub(crate) fn print_hex(base: u32, data: &[u8]) {
    for (i, line) in data.chunks(16).enumerate() {
        let hex: Vec<String> = line.iter().map(|b| format!("{:02X}", b)).collect();
        let ascii: String = line
            .iter()
            .map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { '.' })
            .collect();
        println!(
            "{:08X}  {:<47}  |{}|",
            base as usize + i * 16,
            hex.join(" "),
            ascii
        );
    }
}

fn format_size(bytes: u32) -> String {
    if bytes >= 1024 {
        format!("{} KiB", bytes / 1024)
    } else {
        format!("{} B", bytes)
    }
}
