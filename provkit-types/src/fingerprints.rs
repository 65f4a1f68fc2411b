//! Data-slot fingerprint reporting (debug firmware)

use std::fmt;

use crate::error::Result;
use crate::take_field;

/// Number of crypto-element data slots
pub const SLOT_COUNT: usize = 16;

/// Per-slot fingerprint length in the fingerprints query reply
pub const FINGERPRINT_LEN: usize = 3;

/// Truncated fingerprints of all data slots
///
/// Reply layout: 2-byte status header, then one 3-byte fingerprint per slot.
#[derive(Clone, PartialEq, Eq)]
pub struct SlotFingerprints {
    pub slots: [[u8; FINGERPRINT_LEN]; SLOT_COUNT],
}

impl SlotFingerprints {
    /// Parse from a reply starting at the 2-byte status header
    pub fn parse(mut bytes: &[u8]) -> Result<Self> {
        let _status: [u8; 2] = take_field(&mut bytes, "fingerprints status header")?;
        let mut slots = [[0u8; FINGERPRINT_LEN]; SLOT_COUNT];
        for slot in &mut slots {
            *slot = take_field(&mut bytes, "slot fingerprint")?;
        }
        Ok(Self { slots })
    }
}

impl fmt::Debug for SlotFingerprints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.slots.iter().map(hex::encode))
            .finish()
    }
}

impl fmt::Display for SlotFingerprints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, slot) in self.slots.iter().enumerate() {
            writeln!(f, "{i:02}: {}", hex::encode(slot))?;
        }
        Ok(())
    }
}
