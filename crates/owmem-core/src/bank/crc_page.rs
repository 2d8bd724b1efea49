//! CRC-verified page reads and packets
//!
//! A page read with device-generated CRC returns the page data, any extra
//! info bytes and two complemented CRC-16 bytes. On a fresh read the CRC
//! covers the command and address too; once the first page is done the
//! device restarts its CRC at zero and keeps streaming, which is what a
//! continuing read relies on.
//!
//! Packets sit on top of pages: `[len][data...][~crc lo][~crc hi]`, with
//! the CRC over the length and data seeded by the page number.

use super::strategy::{PacketSeed, MAX_FRAME_LENGTH, MAX_PAGE_LENGTH};
use super::{Bank, BankFeatures, PACKET_OVERHEAD};
use crate::adapter::{Adapter, AdapterFeatures};
use crate::crc;
use crate::error::{Error, Result};
use maybe_async::maybe_async;

/// A packet frame ready to be written
pub(super) type PacketFrame = heapless::Vec<u8, MAX_PAGE_LENGTH>;

impl Bank {
    /// Read one CRC page frame and split it into data and extra info
    #[maybe_async]
    pub(super) async fn read_page_crc_frame<A: Adapter + ?Sized>(
        &mut self,
        bus: &mut A,
        page: u32,
        continuing: bool,
        buf: &mut [u8],
        extra: Option<&mut [u8]>,
    ) -> Result<()> {
        let page_crc = self.config.page_crc.ok_or(Error::UnsupportedOperation)?;
        let page_len = usize::from(self.page_length());
        let extra_len = usize::from(self.extra_info_length());
        let verification = usize::from(page_crc.verification_bytes);

        let mut seed = 0;
        if !continuing {
            self.begin(bus).await?;
            let start = page * page_len as u32;
            let [lo, hi] = self.config.descriptor.physical_address(start).to_le_bytes();
            let header = [page_crc.command, lo, hi];
            seed = crc::crc16(&header, 0);
            if page_crc.credential {
                self.send_credential_header(bus, header, page_crc).await?;
            } else {
                let mut header = header;
                bus.exchange_block(&mut header).await?;
            }
        }

        let len = page_len + extra_len + 2 + verification;
        let mut frame = [0xFFu8; MAX_FRAME_LENGTH];
        bus.exchange_block(&mut frame[..len]).await?;

        if !crc::crc16_valid(&frame[..len - verification], seed) {
            log::debug!("{}: CRC error on page {}", self.config.name, page);
            return Err(Error::ChecksumMismatch {
                credential_suspect: page_crc.credential,
            });
        }

        buf[..page_len].copy_from_slice(&frame[..page_len]);
        if let Some(extra) = extra {
            extra[..extra_len].copy_from_slice(&frame[page_len..page_len + extra_len]);
        }
        Ok(())
    }

    /// Whether a CRC page read can run straight on into the next page
    ///
    /// Trailing verification bytes consume the device's stream, so the next
    /// page must be addressed again.
    pub(super) fn pages_chain(&self) -> bool {
        self.config
            .page_crc
            .map_or(false, |page_crc| page_crc.verification_bytes == 0)
    }

    /// Arbitrary-offset read through whole CRC pages
    #[maybe_async]
    pub(super) async fn read_via_pages<A: Adapter + ?Sized>(
        &mut self,
        bus: &mut A,
        start: u32,
        continuing: bool,
        buf: &mut [u8],
    ) -> Result<()> {
        let page_len = usize::from(self.page_length());
        let chain = self.pages_chain();

        let mut page = start / page_len as u32;
        let mut in_page = start as usize % page_len;
        let mut page_buf = [0u8; MAX_PAGE_LENGTH];
        let mut done = 0;
        let mut cont = continuing;

        while done < buf.len() {
            self.read_page_crc_frame(bus, page, cont, &mut page_buf, None)
                .await?;
            let n = core::cmp::min(page_len - in_page, buf.len() - done);
            buf[done..done + n].copy_from_slice(&page_buf[in_page..in_page + n]);

            done += n;
            page += 1;
            in_page = 0;
            cont = chain;
        }

        Ok(())
    }

    /// Read one page through whichever path the bank has
    #[maybe_async]
    pub(super) async fn read_page_any<A: Adapter + ?Sized>(
        &mut self,
        bus: &mut A,
        page: u32,
        continuing: bool,
        buf: &mut [u8],
        extra: Option<&mut [u8]>,
    ) -> Result<()> {
        if self.config.descriptor.has(BankFeatures::PAGE_AUTO_CRC) {
            return self
                .read_page_crc_frame(bus, page, continuing, buf, extra)
                .await;
        }

        let page_len = usize::from(self.page_length());
        let start = page * page_len as u32;
        self.read_any(bus, start, continuing, &mut buf[..page_len])
            .await
    }

    pub(super) fn check_packet_read(
        &self,
        features: AdapterFeatures,
        page: u32,
        buf_len: usize,
    ) -> Result<()> {
        let max = usize::from(self.max_packet_data_length());
        if max == 0 {
            return Err(Error::UnsupportedOperation);
        }
        if page >= self.page_count() {
            return Err(Error::OutOfRange);
        }
        if buf_len < max {
            return Err(Error::BufferTooSmall);
        }
        if self.config.descriptor.has(BankFeatures::PAGE_AUTO_CRC) {
            self.check_crc_read(features)?;
        }
        Ok(())
    }

    /// CRC seed for the packet stored in `page`
    pub(super) fn packet_seed(&self, page: u32) -> u16 {
        match self.config.packet_seed {
            PacketSeed::PageNumber => page as u16,
            PacketSeed::PhysicalPage => {
                let d = &self.config.descriptor;
                (u32::from(d.start_physical_address) / u32::from(d.page_length) + page) as u16
            }
        }
    }

    /// Read a page and unwrap the packet it holds
    #[maybe_async]
    pub(super) async fn read_packet_frame<A: Adapter + ?Sized>(
        &mut self,
        bus: &mut A,
        page: u32,
        continuing: bool,
        buf: &mut [u8],
        extra: Option<&mut [u8]>,
    ) -> Result<usize> {
        let mut raw = [0u8; MAX_PAGE_LENGTH];
        self.read_page_any(bus, page, continuing, &mut raw, extra)
            .await?;

        let max = self.max_packet_data_length();
        let length = raw[0];
        if u16::from(length) > max {
            return Err(Error::InvalidPacketLength {
                length,
                max: max as u8,
            });
        }

        let len = usize::from(length);
        if !crc::crc16_valid(&raw[..len + PACKET_OVERHEAD as usize], self.packet_seed(page)) {
            log::debug!("{}: packet CRC error on page {}", self.config.name, page);
            return Err(Error::ChecksumMismatch {
                credential_suspect: false,
            });
        }

        buf[..len].copy_from_slice(&raw[1..1 + len]);
        Ok(len)
    }

    /// Frame `data` as a packet for `page`
    pub(super) fn build_packet(&self, page: u32, data: &[u8]) -> Result<PacketFrame> {
        let mut frame = PacketFrame::new();
        frame
            .push(data.len() as u8)
            .map_err(|_| Error::OutOfRange)?;
        frame
            .extend_from_slice(data)
            .map_err(|_| Error::OutOfRange)?;
        let check = crc::crc16_check_bytes(crc::crc16(&frame, self.packet_seed(page)));
        frame
            .extend_from_slice(&check)
            .map_err(|_| Error::OutOfRange)?;
        Ok(frame)
    }
}

