//! Device key-generation response structures

use std::fmt;

use crate::error::Result;
use crate::take_field;

/// Result of on-device key-pair generation
///
/// The reply carries a 2-byte status header followed by three consecutive
/// 16-byte fields.
#[derive(Clone, PartialEq, Eq)]
pub struct DeviceKeySet {
    /// Identifier of the generated device key material
    pub device_key: [u8; 16],

    /// Hash of the device key as written to its slot
    pub written_key_hash: [u8; 16],

    /// Constant block derived alongside the key
    pub derived_constant: [u8; 16],
}

impl DeviceKeySet {
    /// Parse from a reply starting at the 2-byte status header
    pub fn parse(mut bytes: &[u8]) -> Result<Self> {
        let _status: [u8; 2] = take_field(&mut bytes, "key-gen status header")?;
        Ok(Self {
            device_key: take_field(&mut bytes, "device key")?,
            written_key_hash: take_field(&mut bytes, "written key hash")?,
            derived_constant: take_field(&mut bytes, "derived constant")?,
        })
    }
}

impl fmt::Debug for DeviceKeySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceKeySet")
            .field("device_key", &hex::encode(self.device_key))
            .field("written_key_hash", &hex::encode(self.written_key_hash))
            .field("derived_constant", &hex::encode(self.derived_constant))
            .finish()
    }
}

/// Constant blocks reported by the device (debug firmware)
///
/// Same wire shape as [`DeviceKeySet`]: 2-byte status header then three
/// 16-byte blocks.
#[derive(Clone, PartialEq, Eq)]
pub struct DeviceConstants {
    pub blocks: [[u8; 16]; 3],
}

impl DeviceConstants {
    pub fn parse(mut bytes: &[u8]) -> Result<Self> {
        let _status: [u8; 2] = take_field(&mut bytes, "constants status header")?;
        Ok(Self {
            blocks: [
                take_field(&mut bytes, "constant block 0")?,
                take_field(&mut bytes, "constant block 1")?,
                take_field(&mut bytes, "constant block 2")?,
            ],
        })
    }
}

impl fmt::Debug for DeviceConstants {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.blocks.iter().map(hex::encode))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_key_set() {
        let mut reply = vec![0x8C, 1];
        reply.extend(std::iter::repeat(0xAA).take(16));
        reply.extend(std::iter::repeat(0xBB).take(16));
        reply.extend(std::iter::repeat(0xCC).take(16));

        let keys = DeviceKeySet::parse(&reply).unwrap();
        assert_eq!(keys.device_key, [0xAA; 16]);
        assert_eq!(keys.written_key_hash, [0xBB; 16]);
        assert_eq!(keys.derived_constant, [0xCC; 16]);
    }

    #[test]
    fn test_parse_short_reply() {
        let reply = vec![0x8C, 1, 0xAA, 0xBB];
        let err = DeviceKeySet::parse(&reply).unwrap_err();
        assert!(matches!(
            err,
            crate::Error::ShortField {
                field: "device key",
                ..
            }
        ));
    }
}
