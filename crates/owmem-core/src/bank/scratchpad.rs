//! Scratchpad staging
//!
//! Nonvolatile banks that cannot be written in place go through a volatile
//! scratchpad: write it, read it back to learn what the device latched
//! (target address and end offset, the authorization pattern), then send
//! the copy command echoing that pattern. The device only commits when the
//! pattern matches and answers a confirmation byte afterwards.
//!
//! Two addressing forms exist. Target-address devices take two address
//! bytes and report `TA1 TA2 E/S` on read-back with a CRC-16 over the
//! whole frame. Page devices take a page number and return the page with a
//! CRC-8 over the data alone; they also read memory by recalling a page
//! into the scratchpad.

use super::strategy::{
    ScratchpadAddressing, ScratchpadProtocol, CREDENTIAL_LENGTH, MAX_FRAME_LENGTH,
    MAX_SCRATCHPAD_LENGTH,
};
use super::{send_powered_byte, Bank};
use crate::adapter::Adapter;
use crate::crc;
use crate::error::{Error, Result};
use maybe_async::maybe_async;

/// Scratchpad contents as reported by the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scratchpad {
    /// Target the device latched: a physical address, or a page number for
    /// page-addressed devices
    pub target: u16,
    /// Ending offset and status byte (`E/S`); zero for page-addressed devices
    pub end_status: u8,
    /// Data from the target's offset within the scratchpad to the end offset
    pub data: heapless::Vec<u8, MAX_SCRATCHPAD_LENGTH>,
}

impl Scratchpad {
    /// Whether the device flagged a partial last byte (`PF`)
    pub fn partial_flag(&self) -> bool {
        self.end_status & 0x20 != 0
    }

    /// Whether a previous copy completed (`AA`)
    pub fn copy_completed(&self) -> bool {
        self.end_status & 0x80 != 0
    }
}

impl Bank {
    fn scratchpad_protocol(&self) -> Result<ScratchpadProtocol> {
        self.config
            .scratchpad()
            .copied()
            .ok_or(Error::UnsupportedOperation)
    }

    /// Scratchpad target for a bank offset
    fn scratchpad_target(&self, sp: &ScratchpadProtocol, offset: u32) -> u16 {
        let address = self.config.descriptor.physical_address(offset);
        match sp.addressing {
            ScratchpadAddressing::TargetAddress => address,
            ScratchpadAddressing::Page => address / u16::from(sp.length),
        }
    }

    /// Write `data` into the scratchpad for bank offset `start`
    ///
    /// Nothing is committed until [`copy_scratchpad`](Self::copy_scratchpad).
    #[maybe_async]
    pub async fn write_scratchpad<A: Adapter + ?Sized>(
        &mut self,
        bus: &mut A,
        start: u32,
        data: &[u8],
    ) -> Result<()> {
        let sp = self.scratchpad_protocol()?;
        let row = u32::from(sp.length);
        if !self.config.descriptor.is_valid_range(start, data.len())
            || start % row + data.len() as u32 > row
            || (sp.addressing == ScratchpadAddressing::Page && start % row != 0)
        {
            return Err(Error::OutOfRange);
        }

        let target = self.scratchpad_target(&sp, start);
        let result = self.sp_write(bus, &sp, target, data).await;
        self.settle(result)
    }

    /// Read the scratchpad back, CRC-checked
    ///
    /// `start` selects the page for page-addressed devices and is ignored by
    /// target-address devices, which report their own target.
    #[maybe_async]
    pub async fn read_scratchpad<A: Adapter + ?Sized>(
        &mut self,
        bus: &mut A,
        start: u32,
    ) -> Result<Scratchpad> {
        let sp = self.scratchpad_protocol()?;
        if !self.config.descriptor.is_valid_range(start, 1) {
            return Err(Error::OutOfRange);
        }

        let target = self.scratchpad_target(&sp, start);
        let result = self.sp_read(bus, &sp, target).await;
        self.settle(result)
    }

    /// Commit a scratchpad previously read back with
    /// [`read_scratchpad`](Self::read_scratchpad)
    ///
    /// # Errors
    /// * `CopyNotConfirmed` - If the device did not acknowledge the commit
    #[maybe_async]
    pub async fn copy_scratchpad<A: Adapter + ?Sized>(
        &mut self,
        bus: &mut A,
        scratchpad: &Scratchpad,
    ) -> Result<()> {
        let sp = self.scratchpad_protocol()?;
        self.check_write(bus.features(), 0, 0)?;

        let result = self.sp_copy(bus, &sp, scratchpad).await;
        self.settle(result)
    }

    #[maybe_async]
    async fn sp_write<A: Adapter + ?Sized>(
        &mut self,
        bus: &mut A,
        sp: &ScratchpadProtocol,
        target: u16,
        data: &[u8],
    ) -> Result<()> {
        self.begin(bus).await?;

        let mut frame = [0u8; MAX_FRAME_LENGTH];
        let header = match sp.addressing {
            ScratchpadAddressing::TargetAddress => {
                let [lo, hi] = target.to_le_bytes();
                frame[..3].copy_from_slice(&[sp.write_command, lo, hi]);
                3
            }
            ScratchpadAddressing::Page => {
                frame[..2].copy_from_slice(&[sp.write_command, target as u8]);
                2
            }
        };
        frame[header..header + data.len()].copy_from_slice(data);

        bus.exchange_block(&mut frame[..header + data.len()]).await
    }

    #[maybe_async]
    async fn sp_read<A: Adapter + ?Sized>(
        &mut self,
        bus: &mut A,
        sp: &ScratchpadProtocol,
        target: u16,
    ) -> Result<Scratchpad> {
        self.begin(bus).await?;

        let mut frame = [0xFFu8; MAX_FRAME_LENGTH];
        match sp.addressing {
            ScratchpadAddressing::TargetAddress => {
                frame[0] = sp.read_command;
                bus.exchange_block(&mut frame[..4]).await?;

                let target = u16::from_le_bytes([frame[1], frame[2]]);
                let end_status = frame[3];
                let mask = u16::from(sp.length) - 1;
                let offset = usize::from(target & mask);
                let end = usize::from(u16::from(end_status) & mask);
                if end < offset {
                    log::debug!(
                        "{}: scratchpad ends at {} before offset {}",
                        self.config.name,
                        end,
                        offset
                    );
                    return Err(Error::ChecksumMismatch {
                        credential_suspect: false,
                    });
                }

                let count = end - offset + 1;
                bus.exchange_block(&mut frame[4..4 + count + 2]).await?;
                if !crc::crc16_valid(&frame[..4 + count + 2], 0) {
                    return Err(Error::ChecksumMismatch {
                        credential_suspect: false,
                    });
                }

                Ok(Scratchpad {
                    target,
                    end_status,
                    data: heapless::Vec::from_slice(&frame[4..4 + count])
                        .map_err(|_| Error::InvalidConfiguration)?,
                })
            }
            ScratchpadAddressing::Page => {
                frame[..2].copy_from_slice(&[sp.read_command, target as u8]);
                bus.exchange_block(&mut frame[..2]).await?;

                let len = usize::from(sp.length);
                let body = &mut frame[2..2 + len + 1];
                body.fill(0xFF);
                bus.exchange_block(body).await?;
                if !crc::crc8_valid(body, 0) {
                    return Err(Error::ChecksumMismatch {
                        credential_suspect: false,
                    });
                }

                Ok(Scratchpad {
                    target,
                    end_status: 0,
                    data: heapless::Vec::from_slice(&body[..len])
                        .map_err(|_| Error::InvalidConfiguration)?,
                })
            }
        }
    }

    #[maybe_async]
    async fn sp_copy<A: Adapter + ?Sized>(
        &mut self,
        bus: &mut A,
        sp: &ScratchpadProtocol,
        scratchpad: &Scratchpad,
    ) -> Result<()> {
        let mut frame = [0u8; 4 + CREDENTIAL_LENGTH];
        let mut len = match sp.addressing {
            ScratchpadAddressing::TargetAddress => {
                let [lo, hi] = scratchpad.target.to_le_bytes();
                frame[..4].copy_from_slice(&[sp.copy_command, lo, hi, scratchpad.end_status]);
                4
            }
            ScratchpadAddressing::Page => {
                frame[..2].copy_from_slice(&[sp.copy_command, scratchpad.target as u8]);
                2
            }
        };
        if sp.copy_credential {
            let credential = self.credentials.for_write().ok_or(Error::CredentialMissing)?;
            frame[len..len + CREDENTIAL_LENGTH].copy_from_slice(credential);
            len += CREDENTIAL_LENGTH;
        }

        self.begin(bus).await?;

        // The commit runs on strong pull-up power that starts with the last
        // frame byte and is held for the copy time
        let (body, last) = frame[..len].split_at_mut(len - 1);
        bus.exchange_block(body).await?;
        send_powered_byte(bus, last[0], sp.copy_delay_ms).await?;

        // The device pulls the line low with a status pattern once the
        // commit is done; an idle bus reads back all ones
        let status = bus.get_byte().await?;
        if status == 0xFF {
            return Err(Error::CopyNotConfirmed {
                address: u32::from(scratchpad.target),
            });
        }

        log::trace!(
            "{}: copy to 0x{:04X} confirmed (0x{:02X})",
            self.config.name,
            scratchpad.target,
            status
        );
        Ok(())
    }

    #[maybe_async]
    async fn sp_recall<A: Adapter + ?Sized>(
        &mut self,
        bus: &mut A,
        command: u8,
        page: u16,
    ) -> Result<()> {
        self.begin(bus).await?;
        let mut frame = [command, page as u8];
        bus.exchange_block(&mut frame).await
    }

    /// Write scratchpad, read it back, then copy
    #[maybe_async]
    async fn stage<A: Adapter + ?Sized>(
        &mut self,
        bus: &mut A,
        sp: &ScratchpadProtocol,
        offset: u32,
        data: &[u8],
    ) -> Result<()> {
        let target = self.scratchpad_target(sp, offset);
        self.sp_write(bus, sp, target, data).await?;

        let scratchpad = self.sp_read(bus, sp, target).await?;
        let latched = match sp.addressing {
            ScratchpadAddressing::TargetAddress => scratchpad.target == target,
            ScratchpadAddressing::Page => true,
        };
        if self.write_verification && (!latched || scratchpad.data.as_slice() != data) {
            return Err(Error::ScratchpadVerifyFailed {
                address: u32::from(target),
            });
        }

        self.sp_copy(bus, sp, &scratchpad).await
    }

    /// Write `data` at `start` one scratchpad row at a time
    #[maybe_async]
    pub(super) async fn write_staged<A: Adapter + ?Sized>(
        &mut self,
        bus: &mut A,
        sp: ScratchpadProtocol,
        start: u32,
        data: &[u8],
    ) -> Result<()> {
        let row = usize::from(sp.length);
        let whole_rows = sp.full_rows || sp.addressing == ScratchpadAddressing::Page;
        let mut merged = [0u8; MAX_SCRATCHPAD_LENGTH];
        let mut done = 0;

        while done < data.len() {
            let offset = start + done as u32;
            let in_row = offset as usize % row;
            let n = core::cmp::min(row - in_row, data.len() - done);
            let part = &data[done..done + n];

            if whole_rows && n < row {
                // Fill in the rest of the row with what the device holds now
                let row_start = offset - in_row as u32;
                let current = &mut merged[..row];
                self.read_any(bus, row_start, false, current).await?;
                current[in_row..in_row + n].copy_from_slice(part);
                self.stage(bus, &sp, row_start, current).await?;
            } else {
                self.stage(bus, &sp, offset, part).await?;
            }

            done += n;
        }

        Ok(())
    }

    /// Read through the scratchpad, recalling each page first
    #[maybe_async]
    pub(super) async fn read_via_scratchpad<A: Adapter + ?Sized>(
        &mut self,
        bus: &mut A,
        start: u32,
        buf: &mut [u8],
    ) -> Result<()> {
        let sp = self.scratchpad_protocol()?;
        let row = usize::from(sp.length);
        let mut done = 0;

        while done < buf.len() {
            let offset = start + done as u32;
            let in_row = offset as usize % row;
            let n = core::cmp::min(row - in_row, buf.len() - done);

            let target = self.scratchpad_target(&sp, offset);
            if let Some(recall) = sp.recall_command {
                self.sp_recall(bus, recall, target).await?;
            }
            let scratchpad = self.sp_read(bus, &sp, target).await?;
            buf[done..done + n].copy_from_slice(&scratchpad.data[in_row..in_row + n]);

            done += n;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_bits() {
        let pad = Scratchpad {
            target: 0x0010,
            end_status: 0x87,
            data: heapless::Vec::new(),
        };
        assert!(pad.copy_completed());
        assert!(!pad.partial_flag());
    }
}
