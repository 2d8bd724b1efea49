//! CLI argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Parse a string as a hex or decimal u32
fn parse_hex_u32(s: &str) -> Result<u32, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u32>().map_err(|e| format!("Invalid number: {}", e))
    }
}

#[derive(Parser)]
#[command(name = "owmem")]
#[command(author, version, about = "Memory bank access for single-wire bus devices", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to bank database directory or file (contains .ron files)
    /// Defaults to looking in ./banks/ and /usr/share/owmem/banks/
    #[arg(long, global = true)]
    pub bank_db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Which device and bank a command works on
#[derive(clap::Args, Debug, Clone)]
pub struct TargetArgs {
    /// Adapter to use [available: dummy], e.g. dummy:image=mem.bin,serial=1234
    #[arg(short, long, default_value = "dummy")]
    pub adapter: String,

    /// Device name (e.g. DS2431) or family code (e.g. 0x2D)
    #[arg(short, long)]
    pub device: String,

    /// Bank index within the device
    #[arg(short, long, default_value_t = 0)]
    pub bank: usize,

    /// Read-write credential (16 hex digits)
    #[arg(long)]
    pub password: Option<String>,

    /// Read-only credential (16 hex digits)
    #[arg(long)]
    pub read_password: Option<String>,

    /// Use the unpowered variant of credential-gated reads
    #[arg(long)]
    pub unpowered: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List known banks
    ListBanks {
        /// Filter by device name
        #[arg(long)]
        device: Option<String>,
    },

    /// Show bank information
    Info {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Read bank contents
    Read {
        #[command(flatten)]
        target: TargetArgs,

        /// Output file path (hex dump to stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Bank offset to start at (hex or decimal)
        #[arg(long, value_parser = parse_hex_u32, default_value = "0")]
        start: u32,

        /// Number of bytes to read (default: to the end of the bank)
        #[arg(long, value_parser = parse_hex_u32)]
        length: Option<u32>,
    },

    /// Write a file into a bank
    Write {
        #[command(flatten)]
        target: TargetArgs,

        /// Input file path
        #[arg(short, long)]
        input: PathBuf,

        /// Bank offset to start at (hex or decimal)
        #[arg(long, value_parser = parse_hex_u32, default_value = "0")]
        start: u32,

        /// Skip read-back verification
        #[arg(long)]
        no_verify: bool,
    },

    /// Read the packet stored in a page
    ReadPacket {
        #[command(flatten)]
        target: TargetArgs,

        /// Page number
        #[arg(short, long)]
        page: u32,

        /// Output file path (printed to stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write a packet into a page
    WritePacket {
        #[command(flatten)]
        target: TargetArgs,

        /// Page number
        #[arg(short, long)]
        page: u32,

        /// Packet payload as text
        #[arg(long, conflicts_with = "input")]
        data: Option<String>,

        /// Packet payload from a file
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Read every page through the CRC-verified path, with extra info
    DumpPages {
        #[command(flatten)]
        target: TargetArgs,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_subcommands_documented() {
        // Each subcommand gets its own man page
        for sub in Cli::command().get_subcommands() {
            assert!(sub.get_about().is_some(), "{} has no about", sub.get_name());
        }
    }

    #[test]
    fn test_parse_hex_u32() {
        assert_eq!(parse_hex_u32("0x60"), Ok(0x60));
        assert_eq!(parse_hex_u32("96"), Ok(96));
        assert!(parse_hex_u32("0xZZ").is_err());
    }
}
