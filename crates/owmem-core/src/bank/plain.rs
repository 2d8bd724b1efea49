//! Direct reads and writes
//!
//! The simplest banks take a read or write command with a two-byte address
//! and stream data in either direction. EPROM banks add a per-byte echo: the
//! device returns a CRC over what it received, the master pulses the
//! programming voltage, and the device returns the byte it actually holds.

use super::strategy::{DirectWrite, EchoCheck, MAX_PAGE_LENGTH};
use super::{Bank, BankFeatures};
use crate::adapter::{Adapter, PowerCondition};
use crate::crc;
use crate::error::{Error, Result};
use maybe_async::maybe_async;

impl Bank {
    #[maybe_async]
    pub(super) async fn read_direct<A: Adapter + ?Sized>(
        &mut self,
        bus: &mut A,
        command: u8,
        start: u32,
        continuing: bool,
        buf: &mut [u8],
    ) -> Result<()> {
        if !continuing {
            self.begin(bus).await?;
            let [lo, hi] = self.config.descriptor.physical_address(start).to_le_bytes();
            let mut header = [command, lo, hi];
            bus.exchange_block(&mut header).await?;
        }

        buf.fill(0xFF);
        bus.exchange_block(buf).await
    }

    #[maybe_async]
    pub(super) async fn write_direct<A: Adapter + ?Sized>(
        &mut self,
        bus: &mut A,
        write: DirectWrite,
        start: u32,
        data: &[u8],
    ) -> Result<()> {
        match write.echo {
            EchoCheck::None => {
                self.begin(bus).await?;
                let [lo, hi] = self.config.descriptor.physical_address(start).to_le_bytes();
                let mut header = [write.command, lo, hi];
                bus.exchange_block(&mut header).await?;

                let mut chunk = [0u8; MAX_PAGE_LENGTH];
                for part in data.chunks(MAX_PAGE_LENGTH) {
                    chunk[..part.len()].copy_from_slice(part);
                    bus.exchange_block(&mut chunk[..part.len()]).await?;
                }

                if self.write_verification {
                    self.verify_readback(bus, start, data).await?;
                }
                Ok(())
            }
            EchoCheck::Crc8 | EchoCheck::Crc16 => self.write_echoed(bus, write, start, data).await,
        }
    }

    /// Program bytes one at a time, checking the device's CRC and echo
    ///
    /// The first byte goes out with the command and address and is covered
    /// by a CRC over all of them. Later bytes rely on the device's address
    /// auto-increment; their CRC is seeded with the new address.
    #[maybe_async]
    async fn write_echoed<A: Adapter + ?Sized>(
        &mut self,
        bus: &mut A,
        write: DirectWrite,
        start: u32,
        data: &[u8],
    ) -> Result<()> {
        let pulse = self
            .config
            .descriptor
            .has(BankFeatures::NEEDS_PROGRAM_PULSE);
        let check_len = if write.echo == EchoCheck::Crc8 { 1 } else { 2 };

        self.begin(bus).await?;

        for (i, &byte) in data.iter().enumerate() {
            let offset = start + i as u32;
            let [lo, hi] = self.config.descriptor.physical_address(offset).to_le_bytes();

            let mut frame = [0xFFu8; 6];
            let body = if i == 0 {
                frame[..4].copy_from_slice(&[write.command, lo, hi, byte]);
                4
            } else {
                frame[0] = byte;
                1
            };
            let frame = &mut frame[..body + check_len];
            bus.exchange_block(frame).await?;

            let valid = match write.echo {
                EchoCheck::Crc8 => {
                    let seed = if i == 0 { 0 } else { crc::crc8(&[lo], 0) };
                    crc::crc8_valid(frame, seed)
                }
                _ => {
                    let seed = if i == 0 { 0 } else { crc::crc16(&[lo, hi], 0) };
                    crc::crc16_valid(frame, seed)
                }
            };
            if !valid {
                return Err(Error::ChecksumMismatch {
                    credential_suspect: false,
                });
            }

            if pulse {
                bus.start_program_pulse(PowerCondition::Now).await?;
            }

            let echoed = bus.get_byte().await?;
            if echoed != byte {
                log::debug!(
                    "Echo mismatch at 0x{:04X}: wrote 0x{:02X}, device holds 0x{:02X}",
                    offset,
                    byte,
                    echoed
                );
                return Err(Error::EchoMismatch { address: offset });
            }
        }

        Ok(())
    }

    /// Read back `expected` from `start` and compare
    #[maybe_async]
    pub(super) async fn verify_readback<A: Adapter + ?Sized>(
        &mut self,
        bus: &mut A,
        start: u32,
        expected: &[u8],
    ) -> Result<()> {
        let mut chunk = [0u8; MAX_PAGE_LENGTH];
        let mut offset = start;
        for part in expected.chunks(MAX_PAGE_LENGTH) {
            let actual = &mut chunk[..part.len()];
            self.read_any(bus, offset, false, actual).await?;
            if let Some(pos) = actual.iter().zip(part).position(|(a, e)| a != e) {
                return Err(Error::VerifyFailed {
                    address: offset + pos as u32,
                });
            }
            offset += part.len() as u32;
        }
        Ok(())
    }
}
