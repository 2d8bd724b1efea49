//! Memory banks
//!
//! A [`Bank`] is one logically addressed region of a device: EEPROM, EPROM,
//! scratchpad-staged NVRAM or a handful of status registers. There is a
//! single bank type; what differs between device families is carried by its
//! [`BankConfig`] (see [`strategy`]).
//!
//! Banks never own the adapter. Every operation borrows it mutably for its
//! duration, which is what keeps two transactions from interleaving. Code
//! that shares one adapter between threads goes through
//! [`crate::bus::SharedBus`], whose guard is the exclusive-access scope that
//! continuation reads must stay inside.
//!
//! Uses `maybe_async` to support both sync and async modes.

mod crc_page;
mod descriptor;
mod password;
mod plain;
pub mod presets;
mod register;
mod scratchpad;
mod speed;
pub mod strategy;

pub use descriptor::{BankDescriptor, BankFeatures, ExtraInfoDescription, PACKET_OVERHEAD};
pub use password::{Credential, Credentials};
pub use scratchpad::Scratchpad;
pub use speed::SpeedState;
pub use strategy::{
    BankConfig, BankName, DirectWrite, EchoCheck, LatchWrite, PacketSeed, PageCrcRead, ReadMode,
    RegisterWrite, ScratchpadAddressing, ScratchpadProtocol, WriteMode,
};

use crate::adapter::{Adapter, AdapterFeatures, PowerCondition, PowerDuration};
use crate::error::{Error, Result};
use crate::rom::RomId;
use maybe_async::maybe_async;
use strategy::MAX_PAGE_LENGTH;

/// Adapter support needed to power the bus right after a byte
const POWERED_BYTE: AdapterFeatures =
    AdapterFeatures::POWER_DELIVERY.union(AdapterFeatures::POWER_AFTER_BYTE);

/// Device a bank belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Device {
    /// Device address
    pub address: RomId,
}

impl Device {
    /// Create a device handle for `address`
    pub fn new(address: RomId) -> Self {
        Self { address }
    }
}

/// Progress callbacks for long reads
pub trait ReadProgress {
    /// Called once before reading with the number of bytes to read
    fn reading(&mut self, _total_bytes: usize) {}

    /// Called after each chunk with the number of bytes read so far
    fn read_progress(&mut self, _bytes_read: usize) {}
}

/// Progress reporter that does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ReadProgress for NoProgress {}

/// One memory bank of one device
#[derive(Debug, Clone)]
pub struct Bank {
    device: Device,
    config: BankConfig,
    speed: SpeedState,
    write_verification: bool,
    powered_reads: bool,
    credentials: Credentials,
}

impl Bank {
    /// Bind a bank configuration to a device
    ///
    /// The bank starts with speed renegotiation pending, so its first
    /// transaction always sets the bus speed and checks presence.
    pub fn new(device: Device, config: BankConfig) -> Result<Self> {
        config.validate()?;
        let powered_reads = config.powered_reads;
        Ok(Self {
            device,
            config,
            speed: SpeedState::Stale,
            write_verification: true,
            powered_reads,
            credentials: Credentials::default(),
        })
    }

    /// Bank name
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Device this bank belongs to
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Full configuration
    pub fn config(&self) -> &BankConfig {
        &self.config
    }

    /// Static bank shape
    pub fn descriptor(&self) -> &BankDescriptor {
        &self.config.descriptor
    }

    /// Bank size in bytes
    pub fn size(&self) -> u32 {
        self.config.descriptor.size
    }

    /// Page length in bytes
    pub fn page_length(&self) -> u16 {
        self.config.descriptor.page_length
    }

    /// Number of pages
    pub fn page_count(&self) -> u32 {
        self.config.descriptor.page_count()
    }

    /// Largest packet payload a page can hold
    pub fn max_packet_data_length(&self) -> u16 {
        self.config.descriptor.max_packet_data_length()
    }

    /// Capability flags
    pub fn features(&self) -> BankFeatures {
        self.config.descriptor.features
    }

    /// Number of out-of-band bytes returned with each page
    pub fn extra_info_length(&self) -> u8 {
        self.config.descriptor.extra_info_length
    }

    /// What the out-of-band bytes mean
    pub fn extra_info_description(&self) -> &str {
        &self.config.descriptor.extra_info_description
    }

    /// Current speed renegotiation state
    pub fn speed_state(&self) -> SpeedState {
        self.speed
    }

    /// Force speed renegotiation before the next transaction
    pub fn force_reverify(&mut self) {
        self.speed.force_reverify();
    }

    /// Enable or disable read-back verification of writes
    pub fn set_write_verification(&mut self, enabled: bool) {
        self.write_verification = enabled;
    }

    /// Whether writes are verified by read-back
    pub fn write_verification(&self) -> bool {
        self.write_verification
    }

    /// Use the powered variant of credential-gated reads
    pub fn set_powered_reads(&mut self, powered: bool) {
        self.powered_reads = powered;
    }

    /// Whether credential-gated reads are powered
    pub fn powered_reads(&self) -> bool {
        self.powered_reads
    }

    /// Set the credentials used by gated reads and commits
    pub fn set_credentials(&mut self, credentials: Credentials) {
        self.credentials = credentials;
    }

    /// Currently configured credentials
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Mark the bus stale if `result` failed in a way that left it unknown
    fn settle<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            if e.requires_reverify() {
                log::warn!(
                    "{} on {}: {}, renegotiating before next transaction",
                    self.config.name,
                    self.device.address,
                    e
                );
                self.speed.force_reverify();
            }
        }
        result
    }

    fn check_page(&self, page: u32, buf_len: usize) -> Result<()> {
        if page >= self.page_count() {
            return Err(Error::OutOfRange);
        }
        if buf_len < usize::from(self.page_length()) {
            return Err(Error::BufferTooSmall);
        }
        Ok(())
    }

    fn check_extra(&self, extra_len: usize) -> Result<()> {
        if !self.config.descriptor.has(BankFeatures::EXTRA_INFO) {
            return Err(Error::UnsupportedOperation);
        }
        if extra_len < usize::from(self.extra_info_length()) {
            return Err(Error::BufferTooSmall);
        }
        Ok(())
    }

    /// Preconditions shared by every read that goes through the CRC page path
    fn check_crc_read(&self, features: AdapterFeatures) -> Result<()> {
        let page_crc = self.config.page_crc.ok_or(Error::UnsupportedOperation)?;
        if page_crc.credential {
            if self.credentials.for_read().is_none() {
                return Err(Error::CredentialMissing);
            }
            if self.powered_reads && !features.contains(POWERED_BYTE) {
                return Err(Error::PowerDeliveryUnavailable);
            }
        }
        Ok(())
    }

    fn check_write(&self, features: AdapterFeatures, start: u32, len: usize) -> Result<()> {
        let d = &self.config.descriptor;
        if d.has(BankFeatures::READ_ONLY) {
            return Err(Error::UnsupportedOperation);
        }
        if d.has(BankFeatures::NEEDS_PROGRAM_PULSE)
            && !features.contains(AdapterFeatures::PROGRAM_PULSE)
        {
            return Err(Error::ProgramPulseUnavailable);
        }
        if d.has(BankFeatures::NEEDS_POWER_DELIVERY)
            && !features.contains(AdapterFeatures::POWER_DELIVERY)
        {
            return Err(Error::PowerDeliveryUnavailable);
        }

        match &self.config.write {
            WriteMode::None => Err(Error::UnsupportedOperation),
            WriteMode::Direct(_) => Ok(()),
            WriteMode::Scratchpad(sp) => {
                // Every commit is powered from the last copy byte
                if !features.contains(POWERED_BYTE) {
                    return Err(Error::PowerDeliveryUnavailable);
                }
                if sp.copy_credential && self.credentials.for_write().is_none() {
                    return Err(Error::CredentialMissing);
                }
                Ok(())
            }
            WriteMode::Register(reg) => register::check_offsets(reg, start, len),
        }
    }

    /// Select strategy and read into `buf` without touching the speed state
    #[maybe_async]
    async fn read_any<A: Adapter + ?Sized>(
        &mut self,
        bus: &mut A,
        start: u32,
        continuing: bool,
        buf: &mut [u8],
    ) -> Result<()> {
        match self.config.read {
            ReadMode::Direct { command } => {
                self.read_direct(bus, command, start, continuing, buf).await
            }
            ReadMode::Pages => self.read_via_pages(bus, start, continuing, buf).await,
            ReadMode::Scratchpad => self.read_via_scratchpad(bus, start, buf).await,
            ReadMode::Register { command, addressed } => {
                self.read_register(bus, command, addressed, start, buf).await
            }
        }
    }

    /// Read `buf.len()` bytes starting at bank offset `start`
    ///
    /// With `continuing` set the device is not re-selected; it must still be
    /// positioned by an immediately preceding read in the same exclusive
    /// access scope. Scratchpad and register banks always re-select.
    ///
    /// # Errors
    /// * `OutOfRange` - If the read extends beyond the bank, before any bus traffic
    #[maybe_async]
    pub async fn read<A: Adapter + ?Sized>(
        &mut self,
        bus: &mut A,
        start: u32,
        continuing: bool,
        buf: &mut [u8],
    ) -> Result<()> {
        if !self.config.descriptor.is_valid_range(start, buf.len()) {
            return Err(Error::OutOfRange);
        }
        if buf.is_empty() {
            return Ok(());
        }
        if self.config.read == ReadMode::Pages {
            self.check_crc_read(bus.features())?;
        }

        let result = self.read_any(bus, start, continuing, buf).await;
        self.settle(result)
    }

    /// Write `data` at bank offset `start`
    ///
    /// # Errors
    /// * `OutOfRange` - If the write extends beyond the bank, before any bus traffic
    /// * `UnsupportedOperation` - If the bank (or that register) cannot be written
    /// * `PowerDeliveryUnavailable` / `ProgramPulseUnavailable` - If the
    ///   adapter lacks what the bank needs to commit
    #[maybe_async]
    pub async fn write<A: Adapter + ?Sized>(
        &mut self,
        bus: &mut A,
        start: u32,
        data: &[u8],
    ) -> Result<()> {
        if !self.config.descriptor.is_valid_range(start, data.len()) {
            return Err(Error::OutOfRange);
        }
        if data.is_empty() {
            return Ok(());
        }
        self.check_write(bus.features(), start, data.len())?;

        let result = match self.config.write {
            WriteMode::None => Err(Error::UnsupportedOperation),
            WriteMode::Direct(direct) => self.write_direct(bus, direct, start, data).await,
            WriteMode::Scratchpad(sp) => self.write_staged(bus, sp, start, data).await,
            WriteMode::Register(reg) => self.write_register(bus, reg, start, data).await,
        };
        self.settle(result)
    }

    /// Read one page into the front of `buf`
    ///
    /// Banks with `PAGE_AUTO_CRC` use the CRC-verified read; others read the
    /// page's byte range.
    #[maybe_async]
    pub async fn read_page<A: Adapter + ?Sized>(
        &mut self,
        bus: &mut A,
        page: u32,
        continuing: bool,
        buf: &mut [u8],
    ) -> Result<()> {
        self.check_page(page, buf.len())?;
        if self.config.descriptor.has(BankFeatures::PAGE_AUTO_CRC) {
            self.check_crc_read(bus.features())?;
        }

        let result = self.read_page_any(bus, page, continuing, buf, None).await;
        self.settle(result)
    }

    /// Read one page plus its out-of-band bytes
    #[maybe_async]
    pub async fn read_page_with_extra<A: Adapter + ?Sized>(
        &mut self,
        bus: &mut A,
        page: u32,
        continuing: bool,
        buf: &mut [u8],
        extra: &mut [u8],
    ) -> Result<()> {
        self.check_page(page, buf.len())?;
        self.check_extra(extra.len())?;
        self.check_crc_read(bus.features())?;

        let result = self
            .read_page_crc_frame(bus, page, continuing, buf, Some(extra))
            .await;
        self.settle(result)
    }

    /// Read one page through the CRC-verified path
    ///
    /// # Errors
    /// * `UnsupportedOperation` - If the bank has no auto-CRC page read
    /// * `ChecksumMismatch` - If the residue check fails
    #[maybe_async]
    pub async fn read_page_crc<A: Adapter + ?Sized>(
        &mut self,
        bus: &mut A,
        page: u32,
        continuing: bool,
        buf: &mut [u8],
    ) -> Result<()> {
        self.check_page(page, buf.len())?;
        self.check_crc_read(bus.features())?;

        let result = self.read_page_crc_frame(bus, page, continuing, buf, None).await;
        self.settle(result)
    }

    /// Read one page and its out-of-band bytes through the CRC-verified path
    #[maybe_async]
    pub async fn read_page_crc_with_extra<A: Adapter + ?Sized>(
        &mut self,
        bus: &mut A,
        page: u32,
        continuing: bool,
        buf: &mut [u8],
        extra: &mut [u8],
    ) -> Result<()> {
        self.read_page_with_extra(bus, page, continuing, buf, extra)
            .await
    }

    /// Read the packet stored in `page`, returning its payload length
    ///
    /// `buf` must hold at least [`max_packet_data_length`](Self::max_packet_data_length) bytes.
    ///
    /// # Errors
    /// * `InvalidPacketLength` - If the length byte exceeds the maximum
    /// * `ChecksumMismatch` - If the packet CRC, seeded with the page, fails
    #[maybe_async]
    pub async fn read_page_packet<A: Adapter + ?Sized>(
        &mut self,
        bus: &mut A,
        page: u32,
        continuing: bool,
        buf: &mut [u8],
    ) -> Result<usize> {
        self.check_packet_read(bus.features(), page, buf.len())?;

        let result = self.read_packet_frame(bus, page, continuing, buf, None).await;
        self.settle(result)
    }

    /// Read the packet stored in `page` plus the page's out-of-band bytes
    #[maybe_async]
    pub async fn read_page_packet_with_extra<A: Adapter + ?Sized>(
        &mut self,
        bus: &mut A,
        page: u32,
        continuing: bool,
        buf: &mut [u8],
        extra: &mut [u8],
    ) -> Result<usize> {
        self.check_packet_read(bus.features(), page, buf.len())?;
        self.check_extra(extra.len())?;

        let result = self
            .read_packet_frame(bus, page, continuing, buf, Some(extra))
            .await;
        self.settle(result)
    }

    /// Write `data` as a length-prefixed, CRC-protected packet into `page`
    ///
    /// # Errors
    /// * `OutOfRange` - If `data` exceeds the maximum packet length or the
    ///   page does not exist
    #[maybe_async]
    pub async fn write_page_packet<A: Adapter + ?Sized>(
        &mut self,
        bus: &mut A,
        page: u32,
        data: &[u8],
    ) -> Result<()> {
        let max = usize::from(self.max_packet_data_length());
        if max == 0 {
            return Err(Error::UnsupportedOperation);
        }
        if page >= self.page_count() || data.len() > max {
            return Err(Error::OutOfRange);
        }

        let frame = self.build_packet(page, data)?;
        let start = page * u32::from(self.page_length());
        self.write(bus, start, &frame).await
    }

    /// Read `buf.len()` bytes from `start` in page-sized chunks, reporting progress
    ///
    /// Chunks after the first continue the previous read where the bank
    /// supports continuation.
    #[maybe_async]
    pub async fn read_with_progress<A: Adapter + ?Sized, P: ReadProgress>(
        &mut self,
        bus: &mut A,
        start: u32,
        buf: &mut [u8],
        progress: &mut P,
    ) -> Result<()> {
        if !self.config.descriptor.is_valid_range(start, buf.len()) {
            return Err(Error::OutOfRange);
        }

        let total = buf.len();
        progress.reading(total);

        let chunk = usize::from(self.page_length()).clamp(1, MAX_PAGE_LENGTH);
        let can_continue = match self.config.read {
            ReadMode::Direct { .. } => true,
            ReadMode::Pages => self.pages_chain(),
            ReadMode::Scratchpad | ReadMode::Register { .. } => false,
        };
        let mut done = 0;
        while done < total {
            // Stop at page boundaries so CRC reads line up with pages
            let offset = start + done as u32;
            let in_page = offset as usize % chunk;
            let len = core::cmp::min(chunk - in_page, total - done);
            self.read(bus, offset, can_continue && done > 0, &mut buf[done..done + len])
                .await?;
            done += len;
            progress.read_progress(done);
        }

        Ok(())
    }

    /// Read the whole bank
    #[cfg(feature = "alloc")]
    #[maybe_async]
    pub async fn read_all<A: Adapter + ?Sized>(
        &mut self,
        bus: &mut A,
    ) -> Result<alloc::vec::Vec<u8>> {
        let mut buf = alloc::vec![0u8; self.size() as usize];
        self.read_with_progress(bus, 0, &mut buf, &mut NoProgress)
            .await?;
        Ok(buf)
    }

    /// Renegotiate speed if needed, then select the device
    #[maybe_async]
    async fn begin<A: Adapter + ?Sized>(&mut self, bus: &mut A) -> Result<()> {
        self.speed
            .ensure(bus, self.device.address, self.config.speed)
            .await?;
        if !bus.select(self.device.address).await? {
            return Err(Error::DeviceNotPresent);
        }
        Ok(())
    }
}

/// Send `byte` with strong pull-up power applied right after it, hold the
/// power for `settle_ms`, then release it
#[maybe_async]
async fn send_powered_byte<A: Adapter + ?Sized>(bus: &mut A, byte: u8, settle_ms: u16) -> Result<()> {
    bus.set_power_duration(PowerDuration::Infinite).await?;
    bus.start_power_delivery(PowerCondition::AfterNextByte)
        .await?;
    bus.put_byte(byte).await?;
    bus.delay_us(u32::from(settle_ms) * 1000).await;
    bus.set_power_normal().await
}
