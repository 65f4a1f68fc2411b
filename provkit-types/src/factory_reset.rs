//! Factory-reset response structure
//!
//! The factory reset regenerates the device root key. Its framed reply
//! reports three status bytes, the fingerprints of the affected slots after
//! the wipe, the previous fingerprints of the first two slots for operator
//! comparison, and two reserved blocks that must read erased (all 0xFF).

use std::fmt;

use crate::error::{Error, Result};
use crate::take_field;

/// Parsed factory-reset reply
///
/// Payload layout (after the frame header): `[status; 3]`, 3 x 8-byte slot
/// fingerprints (post-wipe), 2 x 8-byte prior fingerprints, 2 x 4-byte
/// reserved erased blocks.
#[derive(Clone, PartialEq, Eq)]
pub struct FactoryResetReport {
    /// One status byte per wiped region; all must be 1
    pub statuses: [u8; 3],

    /// Slot fingerprints after the wipe
    pub slots_after: [[u8; 8]; 3],

    /// Fingerprints the affected slots held before the wipe
    pub slots_before: [[u8; 8]; 2],
}

impl FactoryResetReport {
    /// Parse the framed reply payload
    pub fn parse(mut bytes: &[u8]) -> Result<Self> {
        let statuses: [u8; 3] = take_field(&mut bytes, "factory-reset statuses")?;
        let slots_after = [
            take_field(&mut bytes, "post-wipe fingerprint 0")?,
            take_field(&mut bytes, "post-wipe fingerprint 1")?,
            take_field(&mut bytes, "post-wipe fingerprint 2")?,
        ];
        let slots_before = [
            take_field(&mut bytes, "prior fingerprint 0")?,
            take_field(&mut bytes, "prior fingerprint 1")?,
        ];
        for field in ["reserved block 0", "reserved block 1"] {
            let reserved: [u8; 4] = take_field(&mut bytes, field)?;
            if reserved != [0xFF; 4] {
                return Err(Error::BadReservedField {
                    field,
                    value: hex::encode(reserved),
                });
            }
        }
        Ok(Self {
            statuses,
            slots_after,
            slots_before,
        })
    }

    /// All-or-nothing success check: every region must report status 1
    pub fn succeeded(&self) -> bool {
        self.statuses.iter().all(|&s| s == 1)
    }

    /// Check the root key actually changed for a given slot index (0 or 1)
    pub fn slot_changed(&self, index: usize) -> bool {
        self.slots_after[index] != self.slots_before[index]
    }
}

impl fmt::Debug for FactoryResetReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FactoryResetReport")
            .field("statuses", &self.statuses)
            .field(
                "slots_after",
                &self.slots_after.map(hex::encode),
            )
            .field(
                "slots_before",
                &self.slots_before.map(hex::encode),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_payload() -> Vec<u8> {
        let mut payload = vec![1, 1, 1];
        payload.extend([0x11; 8]);
        payload.extend([0x22; 8]);
        payload.extend([0x33; 8]);
        payload.extend([0xA1; 8]);
        payload.extend([0x22; 8]);
        payload.extend([0xFF; 4]);
        payload.extend([0xFF; 4]);
        payload
    }

    #[test]
    fn test_parse_success() {
        let report = FactoryResetReport::parse(&sample_payload()).unwrap();
        assert!(report.succeeded());
        assert!(report.slot_changed(0));
        assert!(!report.slot_changed(1));
    }

    #[test]
    fn test_failed_status() {
        let mut payload = sample_payload();
        payload[1] = 0;
        let report = FactoryResetReport::parse(&payload).unwrap();
        assert!(!report.succeeded());
    }

    #[test]
    fn test_reserved_block_checked() {
        let mut payload = sample_payload();
        let last = payload.len() - 1;
        payload[last] = 0x00;
        assert!(matches!(
            FactoryResetReport::parse(&payload),
            Err(Error::BadReservedField { .. })
        ));
    }

    #[test]
    fn test_short_payload() {
        let payload = vec![1, 1];
        assert!(matches!(
            FactoryResetReport::parse(&payload),
            Err(Error::ShortField { .. })
        ));
    }
}
