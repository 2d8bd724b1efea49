//! Static bank shape and capability flags

use bitflags::bitflags;

/// Bytes of packet framing: one length byte and two CRC bytes
pub const PACKET_OVERHEAD: u16 = 3;

bitflags! {
    /// Capability flags for a memory bank
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BankFeatures: u32 {
        /// Free for application data
        const GENERAL_PURPOSE      = 1 << 0;
        /// Can be read and rewritten
        const READ_WRITE           = 1 << 1;
        /// Bits can only be cleared, once
        const WRITE_ONCE           = 1 << 2;
        /// Cannot be written at all
        const READ_ONLY            = 1 << 3;
        /// Keeps its contents without power
        const NON_VOLATILE         = 1 << 4;
        /// Writes need an EPROM program pulse
        const NEEDS_PROGRAM_PULSE  = 1 << 5;
        /// Writes need strong pull-up power
        const NEEDS_POWER_DELIVERY = 1 << 6;
        /// Page reads carry a device-generated CRC-16
        const PAGE_AUTO_CRC        = 1 << 7;
        /// Page reads return out-of-band bytes after the page data
        const EXTRA_INFO           = 1 << 8;
    }
}

impl Default for BankFeatures {
    fn default() -> Self {
        BankFeatures::empty()
    }
}

/// Description of the out-of-band bytes returned with a page
pub type ExtraInfoDescription = heapless::String<32>;

/// Static shape of one memory bank
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BankDescriptor {
    /// Bank size in bytes
    pub size: u32,
    /// Page length in bytes (1 if the bank is not paged)
    pub page_length: u16,
    /// Offset of the bank within the device's address space
    pub start_physical_address: u16,
    /// Capability flags
    pub features: BankFeatures,
    /// Number of out-of-band bytes returned with each page
    pub extra_info_length: u8,
    /// What the out-of-band bytes mean
    pub extra_info_description: ExtraInfoDescription,
}

impl BankDescriptor {
    /// Create a descriptor with no extra info
    pub fn new(size: u32, page_length: u16, start_physical_address: u16, features: BankFeatures) -> Self {
        Self {
            size,
            page_length,
            start_physical_address,
            features,
            extra_info_length: 0,
            extra_info_description: ExtraInfoDescription::new(),
        }
    }

    /// Declare out-of-band bytes returned with each page
    pub fn with_extra_info(mut self, length: u8, description: &str) -> Self {
        self.extra_info_length = length;
        self.extra_info_description = ExtraInfoDescription::new();
        // Longer descriptions are truncated at a character boundary
        for c in description.chars() {
            if self.extra_info_description.push(c).is_err() {
                break;
            }
        }
        if length > 0 {
            self.features |= BankFeatures::EXTRA_INFO;
        }
        self
    }

    /// Whether the bank is divided into pages
    pub fn is_paged(&self) -> bool {
        self.page_length > 1
    }

    /// Number of pages in the bank
    pub fn page_count(&self) -> u32 {
        self.size / u32::from(self.page_length.max(1))
    }

    /// Largest packet payload a page can hold
    pub fn max_packet_data_length(&self) -> u16 {
        if !self.is_paged() {
            return 0;
        }
        self.page_length
            .saturating_sub(PACKET_OVERHEAD + u16::from(self.extra_info_length))
    }

    /// Check if an offset range lies inside the bank
    pub fn is_valid_range(&self, offset: u32, len: usize) -> bool {
        // Use u64 arithmetic to avoid overflow on large lengths
        offset as u64 + len as u64 <= self.size as u64
    }

    /// Physical device address of a bank offset
    pub fn physical_address(&self, offset: u32) -> u16 {
        (u32::from(self.start_physical_address) + offset) as u16
    }

    /// Shorthand for `features.contains(flag)`
    pub fn has(&self, flag: BankFeatures) -> bool {
        self.features.contains(flag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_packet_length() {
        let d = BankDescriptor::new(128, 32, 0, BankFeatures::READ_WRITE);
        assert_eq!(d.max_packet_data_length(), 29);

        let d = d.with_extra_info(8, "Write cycle counter");
        assert_eq!(d.max_packet_data_length(), 21);
        assert!(d.has(BankFeatures::EXTRA_INFO));
    }

    #[test]
    fn test_unpaged_has_no_packets() {
        let d = BankDescriptor::new(8, 1, 0x88, BankFeatures::READ_WRITE);
        assert!(!d.is_paged());
        assert_eq!(d.max_packet_data_length(), 0);
    }

    #[test]
    fn test_range() {
        let d = BankDescriptor::new(16, 8, 0, BankFeatures::READ_WRITE);
        assert!(d.is_valid_range(0, 16));
        assert!(d.is_valid_range(12, 4));
        assert!(!d.is_valid_range(12, 9));
        assert!(!d.is_valid_range(16, 1));
    }

    #[test]
    fn test_physical_address() {
        let d = BankDescriptor::new(32704, 64, 0x0000, BankFeatures::READ_WRITE);
        assert_eq!(d.physical_address(130), 130);
        let d = BankDescriptor::new(8, 1, 0x88, BankFeatures::READ_WRITE);
        assert_eq!(d.physical_address(5), 0x8D);
    }
}
