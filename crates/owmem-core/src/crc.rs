//! Seeded CRC helpers
//!
//! Bus devices protect frames with the reflected CRC-16 (polynomial 0x8005,
//! the CRC-16/ARC parameters) and the reflected CRC-8 (polynomial 0x31, the
//! CRC-8/MAXIM-DOW parameters). The arithmetic comes from the `crc` crate;
//! this module adds the seeding and residue conventions the devices use.
//!
//! A device appends the *complement* of its CRC-16, low byte first. Running
//! the CRC over the payload followed by those two bytes always ends in the
//! fixed residue [`CRC16_RESIDUE`]. CRC-8 is appended uncomplemented and
//! leaves a residue of zero.

use crc::{Crc, CRC_16_ARC, CRC_8_MAXIM_DOW};

const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_ARC);
const CRC8: Crc<u8> = Crc::<u8>::new(&CRC_8_MAXIM_DOW);

/// Residue of a CRC-16 run over data plus its complemented check bytes
pub const CRC16_RESIDUE: u16 = 0xB001;

/// Residue of a CRC-8 run over data plus its check byte
pub const CRC8_RESIDUE: u8 = 0;

/// Compute the CRC-16 of `data`, continuing from `seed`
///
/// `seed` is the running register value as the devices see it, so the
/// result of one call can be fed as the seed of the next.
pub fn crc16(data: &[u8], seed: u16) -> u16 {
    // The crate takes the initial value in unreflected form
    let mut digest = CRC16.digest_with_initial(seed.reverse_bits());
    digest.update(data);
    digest.finalize()
}

/// Compute the CRC-8 of `data`, continuing from `seed`
pub fn crc8(data: &[u8], seed: u8) -> u8 {
    let mut digest = CRC8.digest_with_initial(seed.reverse_bits());
    digest.update(data);
    digest.finalize()
}

/// The two check bytes a device appends for a CRC-16 value
#[inline]
pub fn crc16_check_bytes(crc: u16) -> [u8; 2] {
    (!crc).to_le_bytes()
}

/// Whether `frame` (payload plus complemented CRC-16) checks out against `seed`
#[inline]
pub fn crc16_valid(frame: &[u8], seed: u16) -> bool {
    crc16(frame, seed) == CRC16_RESIDUE
}

/// Whether `frame` (payload plus CRC-8) checks out against `seed`
#[inline]
pub fn crc8_valid(frame: &[u8], seed: u8) -> bool {
    crc8(frame, seed) == CRC8_RESIDUE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc16_check_value() {
        // CRC-16/ARC check value
        assert_eq!(crc16(b"123456789", 0), 0xBB3D);
    }

    #[test]
    fn test_crc8_check_value() {
        // CRC-8/MAXIM-DOW check value
        assert_eq!(crc8(b"123456789", 0), 0xA1);
    }

    #[test]
    fn test_crc16_chaining() {
        let whole = crc16(b"123456789", 0);
        let first = crc16(b"1234", 0);
        assert_eq!(crc16(b"56789", first), whole);
    }

    #[test]
    fn test_crc16_residue() {
        let mut frame = [0xA5, 0x20, 0x00, 0x11, 0x22, 0x33, 0, 0];
        let crc = crc16(&frame[..6], 0);
        frame[6..].copy_from_slice(&crc16_check_bytes(crc));
        assert!(crc16_valid(&frame, 0));

        frame[4] ^= 0x10;
        assert!(!crc16_valid(&frame, 0));
    }

    #[test]
    fn test_crc16_seeded_residue() {
        let mut frame = [0x02, b'h', b'i', 0, 0];
        let crc = crc16(&frame[..3], 7);
        frame[3..].copy_from_slice(&crc16_check_bytes(crc));
        assert!(crc16_valid(&frame, 7));
        assert!(!crc16_valid(&frame, 6));
    }

    #[test]
    fn test_crc8_residue() {
        let mut frame = [0x0F, 0x10, 0x00, 0x5A, 0];
        frame[4] = crc8(&frame[..4], 0);
        assert!(crc8_valid(&frame, 0));
        frame[3] ^= 1;
        assert!(!crc8_valid(&frame, 0));
    }
}
