//! Credential-gated access
//!
//! Protected devices expect an 8-byte credential right after the address
//! of a read or copy command. The device only checks it once it has enough
//! power to do so; on the powered variant the master switches on strong
//! pull-up as the last credential byte leaves, holds it while the device
//! verifies, and only then clocks the data phase.
//!
//! A wrong credential is indistinguishable from line noise: the device
//! simply returns data that fails the CRC.

use super::strategy::{PageCrcRead, CREDENTIAL_LENGTH};
use super::{send_powered_byte, Bank};
use crate::adapter::Adapter;
use crate::error::{Error, Result};
use maybe_async::maybe_async;

/// One credential
pub type Credential = [u8; CREDENTIAL_LENGTH];

/// Credentials for a protected device
///
/// Reads use the read-write credential when one is set, since it also
/// grants read access; commits require the read-write credential.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// Credential that grants read access
    pub read_only: Option<Credential>,
    /// Credential that grants read and write access
    pub read_write: Option<Credential>,
}

// Keep credentials out of logs
impl core::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Credentials")
            .field("read_only", &self.read_only.map(|_| "<set>"))
            .field("read_write", &self.read_write.map(|_| "<set>"))
            .finish()
    }
}

impl Credentials {
    /// Credentials with only a read-only credential
    pub fn read_only(credential: Credential) -> Self {
        Self {
            read_only: Some(credential),
            read_write: None,
        }
    }

    /// Credentials with a read-write credential
    pub fn read_write(credential: Credential) -> Self {
        Self {
            read_only: None,
            read_write: Some(credential),
        }
    }

    /// Credential to present on reads
    pub fn for_read(&self) -> Option<&Credential> {
        self.read_write.as_ref().or(self.read_only.as_ref())
    }

    /// Credential to present on commits
    pub fn for_write(&self) -> Option<&Credential> {
        self.read_write.as_ref()
    }
}

impl Bank {
    /// Send `[command, lo, hi, credential...]`, powering the last byte if
    /// the bank is set up for powered reads
    #[maybe_async]
    pub(super) async fn send_credential_header<A: Adapter + ?Sized>(
        &mut self,
        bus: &mut A,
        header: [u8; 3],
        page_crc: PageCrcRead,
    ) -> Result<()> {
        let credential = *self.credentials.for_read().ok_or(Error::CredentialMissing)?;

        let mut frame = [0u8; 3 + CREDENTIAL_LENGTH];
        frame[..3].copy_from_slice(&header);
        frame[3..].copy_from_slice(&credential);

        if self.powered_reads {
            let n = frame.len() - 1;
            let (body, last) = frame.split_at_mut(n);
            bus.exchange_block(body).await?;
            send_powered_byte(bus, last[0], page_crc.power_settle_ms).await
        } else {
            bus.exchange_block(&mut frame).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_prefers_read_write() {
        let mut creds = Credentials::read_only([1; 8]);
        assert_eq!(creds.for_read(), Some(&[1; 8]));
        assert_eq!(creds.for_write(), None);

        creds.read_write = Some([2; 8]);
        assert_eq!(creds.for_read(), Some(&[2; 8]));
        assert_eq!(creds.for_write(), Some(&[2; 8]));
    }

    #[test]
    fn test_debug_hides_credentials() {
        let creds = Credentials::read_write([0x5A; 8]);
        let mut out = heapless::String::<96>::new();
        core::fmt::write(&mut out, format_args!("{:?}", creds)).unwrap();
        assert!(!out.contains("90"));
        assert!(out.contains("<set>"));
    }
}
