//! owmem - Memory bank access for single-wire bus devices
//!
//! Reads and writes the memory banks of devices on a multi-drop
//! single-wire bus: EEPROM, EPROM, scratchpad-staged NVRAM and register
//! banks, with CRC-verified page reads and length-prefixed packets.
//!
//! # Architecture
//!
//! Bank shapes and protocols come from the bank database (`banks/*.ron`,
//! falling back to the compiled-in presets). A command resolves its bank
//! there, opens the adapter with that device on it, and drives a single
//! `owmem_core::bank::Bank` whose configuration selects the protocol.

mod adapters;
mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use owmem_core::catalog::BankCatalog;
use std::path::{Path, PathBuf};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    let db = match load_bank_database(cli.bank_db.as_deref()) {
        Ok(db) => db,
        Err(e) => {
            eprintln!("Failed to load bank database: {}", e);
            std::process::exit(1);
        }
    };

    log::info!("Loaded {} bank definitions", db.len());

    match cli.command {
        Commands::ListBanks { device } => {
            commands::list_banks(&db, device.as_deref());
            Ok(())
        }
        Commands::Info { target } => {
            let target = commands::open_target(&db, &target)?;
            commands::run_info(&target)?;
            target.finish()
        }
        Commands::Read {
            target,
            output,
            start,
            length,
        } => {
            let mut target = commands::open_target(&db, &target)?;
            commands::run_read(&mut target, output.as_deref(), start, length)?;
            target.finish()
        }
        Commands::Write {
            target,
            input,
            start,
            no_verify,
        } => {
            let mut target = commands::open_target(&db, &target)?;
            commands::run_write(&mut target, &input, start, !no_verify)?;
            target.finish()
        }
        Commands::ReadPacket {
            target,
            page,
            output,
        } => {
            let mut target = commands::open_target(&db, &target)?;
            commands::run_read_packet(&mut target, page, output.as_deref())?;
            target.finish()
        }
        Commands::WritePacket {
            target,
            page,
            data,
            input,
        } => {
            let mut target = commands::open_target(&db, &target)?;
            commands::run_write_packet(&mut target, page, data.as_deref(), input.as_deref())?;
            target.finish()
        }
        Commands::DumpPages { target } => {
            let mut target = commands::open_target(&db, &target)?;
            commands::run_dump_pages(&mut target)?;
            target.finish()
        }
    }
}

/// Load the bank database from the specified path or default locations
///
/// Falls back to the compiled-in presets when nothing is found.
fn load_bank_database(path: Option<&Path>) -> Result<BankCatalog, Box<dyn std::error::Error>> {
    let mut db = BankCatalog::new();

    if let Some(path) = path {
        // User specified a path
        if path.is_dir() {
            db.load_dir(path)?;
        } else if path.is_file() {
            db.load_file(path)?;
        } else {
            return Err(format!("Bank database path not found: {}", path.display()).into());
        }
        return Ok(db);
    }

    let default_paths = [
        PathBuf::from("banks"),
        PathBuf::from("/usr/share/owmem/banks"),
        PathBuf::from("/usr/local/share/owmem/banks"),
    ];

    for dir in default_paths.iter().filter(|d| d.is_dir()) {
        match db.load_dir(dir) {
            Ok(count) => {
                log::debug!("Loaded {} banks from {}", count, dir.display());
                break;
            }
            Err(e) => {
                log::warn!("Failed to load banks from {}: {}", dir.display(), e);
            }
        }
    }

    if db.is_empty() {
        log::debug!("No bank database found, using built-in definitions");
        db = BankCatalog::builtin();
    }

    Ok(db)
}
