//! owmem-core - Core library for memory-bank access on single-wire buses
//!
//! This crate turns the unreliable, half-duplex byte exchange offered by a
//! bus adapter into bank-level operations: plain reads, CRC-verified page
//! reads, length-prefixed packets, scratchpad-staged commits, credential
//! gated reads and small register banks. It is `no_std` compatible.
//!
//! # Features
//!
//! - `std` - Enable standard library support (includes `alloc`), the shared
//!   bus wrapper and the RON bank catalog
//! - `alloc` - Enable heap allocation for convenience helpers
//! - `is_sync` - Compile the `maybe_async` code as blocking
//!
//! # Example
//!
//! ```ignore
//! use owmem_core::bank::{presets, Bank, Device};
//! use owmem_core::rom::RomId;
//!
//! fn dump<A: Adapter>(bus: &mut A, rom: RomId) -> owmem_core::Result<()> {
//!     let mut bank = Bank::new(Device::new(rom), presets::ds2431_memory())?;
//!     let mut buf = [0u8; 32];
//!     bank.read_page(bus, 0, false, &mut buf)?;
//!     Ok(())
//! }
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
// Allow async fn in traits - we use maybe-async for dual sync/async support
#![allow(async_fn_in_trait)]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod adapter;
pub mod bank;
#[cfg(feature = "std")]
pub mod bus;
#[cfg(feature = "std")]
pub mod catalog;
pub mod crc;
pub mod error;
pub mod rom;

pub use error::{Error, ErrorKind, Result};
