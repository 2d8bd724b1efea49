//! 64-bit device addresses

use core::fmt;
use core::str::FromStr;

use crate::crc::crc8;

/// Unique 64-bit device address
///
/// Stored in bus order: family code first, then the 48-bit serial number
/// (least significant byte first), then a CRC-8 over the first seven bytes.
/// Printed most significant byte first, the way device labels show it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RomId(pub [u8; 8]);

impl RomId {
    /// Build an address from a family code and a 48-bit serial number
    pub fn from_family_serial(family: u8, serial: u64) -> Self {
        let mut bytes = [0u8; 8];
        bytes[0] = family;
        bytes[1..7].copy_from_slice(&serial.to_le_bytes()[..6]);
        bytes[7] = crc8(&bytes[..7], 0);
        Self(bytes)
    }

    /// Family code (device type)
    pub fn family(&self) -> u8 {
        self.0[0]
    }

    /// 48-bit serial number
    pub fn serial(&self) -> u64 {
        let mut raw = [0u8; 8];
        raw[..6].copy_from_slice(&self.0[1..7]);
        u64::from_le_bytes(raw)
    }

    /// Whether the trailing CRC-8 matches the first seven bytes
    pub fn is_valid(&self) -> bool {
        crc8(&self.0[..7], 0) == self.0[7]
    }

    /// Bytes in bus order
    pub fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }
}

impl fmt::Display for RomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.0.iter().rev() {
            write!(f, "{:02X}", b)?;
        }
        Ok(())
    }
}

/// Error parsing a [`RomId`] from text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseRomIdError;

impl fmt::Display for ParseRomIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expected 16 hex digits")
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ParseRomIdError {}

impl FromStr for RomId {
    type Err = ParseRomIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.len() != 16 || !s.is_ascii() {
            return Err(ParseRomIdError);
        }
        let mut bytes = [0u8; 8];
        for (i, b) in bytes.iter_mut().enumerate() {
            // Text is most significant byte first
            let at = (7 - i) * 2;
            *b = u8::from_str_radix(&s[at..at + 2], 16).map_err(|_| ParseRomIdError)?;
        }
        Ok(Self(bytes))
    }
}
