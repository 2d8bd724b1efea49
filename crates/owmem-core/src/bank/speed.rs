//! Speed and presence renegotiation state

use crate::adapter::{Adapter, Speed};
use crate::error::{Error, Result};
use crate::rom::RomId;
use maybe_async::maybe_async;

/// Whether the bus must be renegotiated before the next transaction
///
/// A bank starts `Stale`. Any integrity, transport or commit failure puts it
/// back to `Stale`, so the operation after a failure always starts by
/// switching the bus to the device's speed and confirming the device is
/// still there. Failed operations are never retried here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpeedState {
    /// Renegotiation required
    #[default]
    Stale,
    /// The last renegotiation succeeded and nothing has failed since
    Verified,
}

impl SpeedState {
    /// Renegotiate if stale
    ///
    /// On failure the state stays `Stale` and the adapter error propagates.
    #[maybe_async]
    pub async fn ensure<A: Adapter + ?Sized>(
        &mut self,
        bus: &mut A,
        address: RomId,
        speed: Speed,
    ) -> Result<()> {
        if *self == SpeedState::Verified {
            return Ok(());
        }

        log::debug!("Renegotiating {:?} speed for {}", speed, address);
        bus.set_speed(speed).await?;
        if !bus.is_present(address).await? {
            return Err(Error::DeviceNotPresent);
        }

        *self = SpeedState::Verified;
        Ok(())
    }

    /// Force renegotiation before the next transaction
    pub fn force_reverify(&mut self) {
        *self = SpeedState::Stale;
    }

    /// Whether renegotiation is pending
    pub fn is_stale(&self) -> bool {
        *self == SpeedState::Stale
    }
}
