//! Error types for owmem-core
//!
//! This module provides a no_std compatible error type that can be used
//! throughout the crate. Every failure a bank operation can report is a
//! distinct variant so callers can decide between retrying after
//! renegotiation and fixing their arguments without matching on messages.

use core::fmt;

/// Broad class of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The adapter could not reach the device
    Transport,
    /// Data came back but failed a checksum, echo or length check
    Integrity,
    /// The caller asked for something the bank cannot do; no bus traffic was sent
    Precondition,
    /// A staged write did not make it into nonvolatile memory
    Commit,
}

/// Core error type - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    // Transport errors
    /// Select or presence check failed
    DeviceNotPresent,
    /// The adapter reported a failure other than device absence
    AdapterFault,

    // Integrity errors
    /// Computed CRC residue did not match the expected constant
    ChecksumMismatch {
        /// The frame carried a credential; a wrong credential produces the
        /// same symptom as a corrupted transfer
        credential_suspect: bool,
    },
    /// A byte echoed by the device did not match what was written
    EchoMismatch {
        /// Bank-relative address of the offending byte
        address: u32,
    },
    /// A packet declared a length larger than the bank allows
    InvalidPacketLength {
        /// Length byte found in the page
        length: u8,
        /// Maximum packet data length for the bank
        max: u8,
    },

    // Precondition errors
    /// Offset and length exceed the bank size
    OutOfRange,
    /// The bank does not support the requested operation
    UnsupportedOperation,
    /// The bank needs strong pull-up power the adapter cannot deliver
    PowerDeliveryUnavailable,
    /// The bank needs a program pulse the adapter cannot deliver
    ProgramPulseUnavailable,
    /// A credential-gated operation was requested without a credential
    CredentialMissing,
    /// The bank configuration is inconsistent
    InvalidConfiguration,
    /// The caller's buffer cannot hold a page or packet
    BufferTooSmall,

    // Commit errors
    /// Scratchpad read-back did not match the data written to it
    ScratchpadVerifyFailed {
        /// Target address of the staged write
        address: u32,
    },
    /// The confirmation byte after a copy showed the commit did not happen
    CopyNotConfirmed {
        /// Target address of the staged write
        address: u32,
    },
    /// Read-back after a direct write did not match
    VerifyFailed {
        /// Bank-relative address of the first mismatching byte
        address: u32,
    },
}

impl Error {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DeviceNotPresent | Self::AdapterFault => ErrorKind::Transport,
            Self::ChecksumMismatch { .. }
            | Self::EchoMismatch { .. }
            | Self::InvalidPacketLength { .. } => ErrorKind::Integrity,
            Self::OutOfRange
            | Self::UnsupportedOperation
            | Self::PowerDeliveryUnavailable
            | Self::ProgramPulseUnavailable
            | Self::CredentialMissing
            | Self::InvalidConfiguration
            | Self::BufferTooSmall => ErrorKind::Precondition,
            Self::ScratchpadVerifyFailed { .. }
            | Self::CopyNotConfirmed { .. }
            | Self::VerifyFailed { .. } => ErrorKind::Commit,
        }
    }

    /// Whether the next operation must renegotiate speed and presence
    ///
    /// Precondition errors are raised before any bus traffic and leave the
    /// bus untouched.
    pub fn requires_reverify(&self) -> bool {
        self.kind() != ErrorKind::Precondition
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeviceNotPresent => write!(f, "device not present"),
            Self::AdapterFault => write!(f, "adapter fault"),
            Self::ChecksumMismatch {
                credential_suspect: false,
            } => write!(f, "invalid CRC16 read from device"),
            Self::ChecksumMismatch {
                credential_suspect: true,
            } => write!(f, "invalid CRC16 read from device, credential may be incorrect"),
            Self::EchoMismatch { address } => {
                write!(f, "echoed byte did not match at address 0x{:04X}", address)
            }
            Self::InvalidPacketLength { length, max } => write!(
                f,
                "invalid packet length {} (maximum {})",
                length, max
            ),
            Self::OutOfRange => write!(f, "offset and length exceed bank size"),
            Self::UnsupportedOperation => write!(f, "operation not supported by this bank"),
            Self::PowerDeliveryUnavailable => write!(f, "adapter cannot deliver power"),
            Self::ProgramPulseUnavailable => write!(f, "adapter cannot generate a program pulse"),
            Self::CredentialMissing => write!(f, "no credential configured"),
            Self::InvalidConfiguration => write!(f, "invalid bank configuration"),
            Self::BufferTooSmall => write!(f, "buffer too small"),
            Self::ScratchpadVerifyFailed { address } => write!(
                f,
                "write scratchpad not completed at address 0x{:04X}",
                address
            ),
            Self::CopyNotConfirmed { address } => write!(
                f,
                "copy scratchpad not confirmed at address 0x{:04X}",
                address
            ),
            Self::VerifyFailed { address } => {
                write!(f, "verify failed: data mismatch at address 0x{:04X}", address)
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reverify_classes() {
        assert!(Error::DeviceNotPresent.requires_reverify());
        assert!(Error::ChecksumMismatch {
            credential_suspect: false
        }
        .requires_reverify());
        assert!(Error::CopyNotConfirmed { address: 0 }.requires_reverify());
        assert!(!Error::OutOfRange.requires_reverify());
        assert!(!Error::CredentialMissing.requires_reverify());
    }

    #[test]
    fn test_kinds() {
        assert_eq!(Error::EchoMismatch { address: 3 }.kind(), ErrorKind::Integrity);
        assert_eq!(Error::AdapterFault.kind(), ErrorKind::Transport);
        assert_eq!(
            Error::ScratchpadVerifyFailed { address: 0 }.kind(),
            ErrorKind::Commit
        );
    }
}
