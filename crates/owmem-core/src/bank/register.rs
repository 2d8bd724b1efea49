//! Register banks
//!
//! Status and control registers are read in one shot without a checksum.
//! Only a window of them is writable, and one address may stand for an
//! output latch: writing it sends the latch command with the value and its
//! complement, and the device acknowledges before returning the new pin
//! state.

use super::strategy::{RegisterWrite, MAX_FRAME_LENGTH, MAX_PAGE_LENGTH};
use super::Bank;
use crate::adapter::Adapter;
use crate::error::{Error, Result};
use maybe_async::maybe_async;

/// Check that every offset of a write is writable, before any bus traffic
pub(super) fn check_offsets(reg: &RegisterWrite, start: u32, len: usize) -> Result<()> {
    for offset in start..start + len as u32 {
        let offset = offset as u16;
        let latch = reg.latch.map_or(false, |l| l.offset == offset);
        if !latch && !reg.is_writable(offset) {
            return Err(Error::UnsupportedOperation);
        }
    }
    Ok(())
}

impl Bank {
    #[maybe_async]
    pub(super) async fn read_register<A: Adapter + ?Sized>(
        &mut self,
        bus: &mut A,
        command: u8,
        addressed: bool,
        start: u32,
        buf: &mut [u8],
    ) -> Result<()> {
        self.begin(bus).await?;

        if addressed {
            let [lo, hi] = self.config.descriptor.physical_address(start).to_le_bytes();
            let mut header = [command, lo, hi];
            bus.exchange_block(&mut header).await?;
            buf.fill(0xFF);
            return bus.exchange_block(buf).await;
        }

        // Unaddressed reads always start at the first register
        bus.put_byte(command).await?;
        let skip = start as usize;
        let mut block = [0xFFu8; MAX_PAGE_LENGTH];
        let block = &mut block[..skip + buf.len()];
        bus.exchange_block(block).await?;
        buf.copy_from_slice(&block[skip..]);
        Ok(())
    }

    #[maybe_async]
    pub(super) async fn write_register<A: Adapter + ?Sized>(
        &mut self,
        bus: &mut A,
        reg: RegisterWrite,
        start: u32,
        data: &[u8],
    ) -> Result<()> {
        let mut done = 0;
        while done < data.len() {
            let offset = start + done as u32;

            if let Some(latch) = reg.latch.filter(|l| u32::from(l.offset) == offset) {
                let value = data[done];
                self.begin(bus).await?;
                let mut frame = [latch.command, value, !value];
                bus.exchange_block(&mut frame).await?;

                let ack = bus.get_byte().await?;
                if ack != latch.ack {
                    return Err(Error::EchoMismatch { address: offset });
                }
                let state = bus.get_byte().await?;
                log::debug!(
                    "{}: latch 0x{:02X}, pins now 0x{:02X}",
                    self.config.name,
                    value,
                    state
                );
                done += 1;
                continue;
            }

            // Run of plain writable registers up to the next latch or the end
            let mut end = done;
            while end < data.len()
                && reg.is_writable((start + end as u32) as u16)
                && !reg
                    .latch
                    .map_or(false, |l| u32::from(l.offset) == start + end as u32)
            {
                end += 1;
            }
            let run = &data[done..end];

            self.begin(bus).await?;
            let [lo, hi] = self.config.descriptor.physical_address(offset).to_le_bytes();
            let mut frame = [0u8; MAX_FRAME_LENGTH];
            frame[..3].copy_from_slice(&[reg.command, lo, hi]);
            frame[3..3 + run.len()].copy_from_slice(run);
            bus.exchange_block(&mut frame[..3 + run.len()]).await?;

            if self.write_verification {
                self.verify_readback(bus, offset, run).await?;
            }
            done = end;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bank::LatchWrite;

    fn reg() -> RegisterWrite {
        RegisterWrite {
            command: 0xCC,
            writable_start: 3,
            writable_end: 5,
            latch: Some(LatchWrite {
                offset: 1,
                command: 0x5A,
                ack: 0xAA,
            }),
        }
    }

    #[test]
    fn test_offsets() {
        assert_eq!(check_offsets(&reg(), 3, 3), Ok(()));
        assert_eq!(check_offsets(&reg(), 1, 1), Ok(()));
        assert_eq!(check_offsets(&reg(), 0, 1), Err(Error::UnsupportedOperation));
        assert_eq!(check_offsets(&reg(), 4, 3), Err(Error::UnsupportedOperation));
    }
}
