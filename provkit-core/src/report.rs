//! Fixed-size report type
//!
//! Everything on the wire is a 64-byte report. Host-to-device writes carry
//! one extra leading report-id byte (always 0); the transport layer adds it.

use std::fmt;

use crate::error::{Error, Result};
use crate::REPORT_SIZE;

/// One fixed-size report exchanged with the token
///
/// Always exactly [`REPORT_SIZE`] bytes. Short payloads are zero-padded on
/// construction; over-long payloads are rejected, never silently truncated.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Report([u8; REPORT_SIZE]);

impl Report {
    /// Build a report from a payload of at most [`REPORT_SIZE`] bytes
    pub fn from_payload(payload: &[u8]) -> Result<Self> {
        if payload.len() > REPORT_SIZE {
            return Err(Error::ReportOverflow {
                len: payload.len(),
                max: REPORT_SIZE,
            });
        }
        let mut buf = [0u8; REPORT_SIZE];
        buf[..payload.len()].copy_from_slice(payload);
        Ok(Self(buf))
    }

    /// Wrap a raw report received from the device
    pub fn from_raw(raw: [u8; REPORT_SIZE]) -> Self {
        Self(raw)
    }

    /// First byte of the report; for configuration replies this echoes the
    /// command id that was sent.
    pub fn command_byte(&self) -> u8 {
        self.0[0]
    }

    /// Status byte of a configuration reply (byte 1)
    pub fn status_byte(&self) -> u8 {
        self.0[1]
    }

    pub fn as_bytes(&self) -> &[u8; REPORT_SIZE] {
        &self.0
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_vec()
    }
}

impl AsRef<[u8]> for Report {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Report[{}..]", hex::encode(&self.0[..8]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_zero_padding() {
        let report = Report::from_payload(&[0x81, 1, 2]).unwrap();
        assert_eq!(report.as_bytes().len(), REPORT_SIZE);
        assert_eq!(&report.as_bytes()[..3], &[0x81, 1, 2]);
        assert!(report.as_bytes()[3..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_overflow_rejected() {
        let payload = vec![0xAB; REPORT_SIZE + 1];
        assert!(matches!(
            Report::from_payload(&payload),
            Err(Error::ReportOverflow { len: 65, max: 64 })
        ));
    }

    #[test]
    fn test_exact_size_accepted() {
        let payload = vec![0xCD; REPORT_SIZE];
        let report = Report::from_payload(&payload).unwrap();
        assert_eq!(report.as_bytes().as_slice(), payload.as_slice());
    }

    #[test]
    fn test_command_and_status_bytes() {
        let report = Report::from_payload(&[0x83, 1]).unwrap();
        assert_eq!(report.command_byte(), 0x83);
        assert_eq!(report.status_byte(), 1);
    }
}
