//! Adapter trait definitions
//!
//! These traits use `maybe_async` to support both sync and async modes.
//! - By default, traits are async (suitable for Embassy or tokio)
//! - With the `is_sync` feature, traits become synchronous

use crate::error::Result;
use crate::rom::RomId;
use bitflags::bitflags;
use maybe_async::maybe_async;

bitflags! {
    /// Adapter feature flags
    ///
    /// These flags indicate what capabilities an adapter supports.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AdapterFeatures: u32 {
        /// Can switch to overdrive speed
        const OVERDRIVE       = 1 << 0;
        /// Can switch to flexible (slew-controlled) regular speed
        const FLEX            = 1 << 1;
        /// Can deliver strong pull-up power
        const POWER_DELIVERY  = 1 << 2;
        /// Can start power delivery synchronised to the end of a byte
        const POWER_AFTER_BYTE = 1 << 3;
        /// Can generate the 12V EPROM program pulse
        const PROGRAM_PULSE   = 1 << 4;
    }
}

impl Default for AdapterFeatures {
    fn default() -> Self {
        AdapterFeatures::empty()
    }
}

/// Bus communication speed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Speed {
    /// Standard timing
    #[default]
    Regular,
    /// Standard timing with slew-rate control for long lines
    Flex,
    /// Overdrive timing
    Overdrive,
}

/// When strong pull-up power (or a program pulse) takes effect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerCondition {
    /// Immediately
    Now,
    /// As soon as the next byte has been transmitted
    AfterNextByte,
}

/// How long strong pull-up power stays on once started
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerDuration {
    /// Until [`Adapter::set_power_normal`] is called
    Infinite,
    /// Released automatically after roughly half a second
    HalfSecond,
}

/// Bus adapter trait (sync or async depending on `is_sync` feature)
///
/// This trait represents the hardware that drives the wire. Every operation
/// can fail with [`crate::Error::DeviceNotPresent`] or
/// [`crate::Error::AdapterFault`]; nothing is dropped silently.
///
/// ## Block exchange
///
/// The bus is half-duplex and wired-AND: every bit the master sends as 1
/// can be pulled low by the device. [`exchange_block`](Self::exchange_block)
/// therefore both sends and receives. Positions filled with `0xFF` read back
/// the device's response in place; all other positions carry master data.
#[maybe_async(AFIT)]
pub trait Adapter {
    /// Get the features supported by this adapter
    fn features(&self) -> AdapterFeatures;

    /// Reset the bus and address a single device
    ///
    /// Returns `false` when no device answered the reset or the address.
    async fn select(&mut self, address: RomId) -> Result<bool>;

    /// Check whether a device with `address` is on the bus
    async fn is_present(&mut self, address: RomId) -> Result<bool>;

    /// Switch the bus to `speed`
    async fn set_speed(&mut self, speed: Speed) -> Result<()>;

    /// Send one byte
    async fn put_byte(&mut self, byte: u8) -> Result<()>;

    /// Read one byte (sends `0xFF`)
    async fn get_byte(&mut self) -> Result<u8>;

    /// Exchange `buf` with the device, overwriting it with what was read back
    async fn exchange_block(&mut self, buf: &mut [u8]) -> Result<()>;

    /// Set how long the next power delivery lasts
    async fn set_power_duration(&mut self, duration: PowerDuration) -> Result<()>;

    /// Start strong pull-up power delivery
    async fn start_power_delivery(&mut self, condition: PowerCondition) -> Result<()>;

    /// Return the bus to normal (resistive pull-up) levels
    async fn set_power_normal(&mut self) -> Result<()>;

    /// Generate an EPROM program pulse
    async fn start_program_pulse(&mut self, condition: PowerCondition) -> Result<()>;

    /// Delay for the specified number of microseconds
    async fn delay_us(&mut self, us: u32);
}
