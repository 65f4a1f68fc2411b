//! Configuration-zone checksum algorithm
//!
//! The crypto element seals its configuration zone against a CRC-16 computed
//! by the host. The variant used here:
//! 1. Classic reflected CRC-16, polynomial 0xA001, init 0, one bit of
//!    feedback at a time (8 iterations per input byte)
//! 2. Bit-reverse the final 16-bit value
//! 3. Emit as `[hi, lo]` of the reversed value for on-wire transmission

use tracing::trace;

/// Calculate the configuration checksum over `data`
///
/// Pure and deterministic; defined for any input length including zero.
///
/// # Examples
///
/// ```
/// use provkit_core::checksum;
///
/// let crc = checksum::calculate(b"123456789");
/// assert_eq!(crc, [0xBC, 0xDD]);
/// ```
pub fn calculate(data: &[u8]) -> [u8; 2] {
    let mut crc: u16 = 0;
    for &byte in data {
        crc = feed(crc, byte);
    }
    let crc = reverse_bits(crc);

    trace!(
        len = data.len(),
        checksum = format!("0x{:04X}", crc),
        "calculated config checksum"
    );

    [(crc >> 8) as u8, (crc & 0xFF) as u8]
}

/// Feed one byte into the running CRC (8 single-bit iterations)
fn feed(mut crc: u16, byte: u8) -> u16 {
    crc ^= byte as u16;
    for _ in 0..8 {
        crc = if crc & 1 != 0 {
            (crc >> 1) ^ 0xA001
        } else {
            crc >> 1
        };
    }
    crc
}

/// Reverse the bit order of a 16-bit value
fn reverse_bits(mut crc: u16) -> u16 {
    crc = ((crc & 0xAAAA) >> 1) | ((crc & 0x5555) << 1);
    crc = ((crc & 0xCCCC) >> 2) | ((crc & 0x3333) << 2);
    crc = ((crc & 0xF0F0) >> 4) | ((crc & 0x0F0F) << 4);
    ((crc & 0xFF00) >> 8) | ((crc & 0x00FF) << 8)
}
