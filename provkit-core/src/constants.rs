//! Protocol constants

use std::time::Duration;

/// USB vendor id of the token
pub const VENDOR_ID: u16 = 0x20A0;

/// USB product id of the token
pub const PRODUCT_ID: u16 = 0x4287;

/// Transport command byte of an initialization handshake frame
pub const FRAME_CMD_INIT: u8 = 0x86;

/// Transport command byte of a ping frame
pub const FRAME_CMD_PING: u8 = 0x81;

/// Nonce length carried by the initialization handshake
pub const INIT_NONCE_SIZE: usize = 8;

/// Byte offset of the device-assigned CID in the init reply
pub const INIT_CID_OFFSET: usize = 15;

/// Factory serial number length reported by the crypto element
pub const SERIAL_LEN: usize = 15;

/// P-256 private scalar length accepted by the attestation key load
pub const ATTEST_KEY_LEN: usize = 32;

/// Status byte value reported by the device on success
pub const STATUS_OK: u8 = 1;

/// Maximum entropy chunk accepted by the reseed command
pub const SEED_CHUNK_MAX: usize = 20;

/// Default per-attempt read timeout
pub const READ_TIMEOUT: Duration = Duration::from_millis(1000);

/// Default number of read polls per delivery
pub const READ_ATTEMPTS: usize = 10;

/// Settle delay after configuration queries; the build firmware services
/// the crypto element between reports and drops writes that arrive sooner.
pub const SETTLE_DELAY: Duration = Duration::from_millis(250);

/// Crypto-element configuration zone template.
///
/// Bytes 0..15 are a placeholder for the factory serial number and are
/// spliced in before the checksum is computed. The remainder sets slot
/// access policies and must match what the build firmware expects, since
/// the lock command seals the zone against the checksum of exactly these
/// 128 bytes.
pub const CONFIG_TEMPLATE: [u8; 128] = [
    0x01, 0x23, 0x6D, 0x10, 0x00, 0x00, 0x50, 0x00, //
    0xD7, 0x2C, 0xA5, 0x71, 0xEE, 0xC0, 0x85, 0x00, //
    0xC0, 0x00, 0x55, 0x00, 0x83, 0x71, 0x81, 0x01, //
    0x83, 0x71, 0xC1, 0x01, 0x83, 0x71, 0x83, 0x71, //
    0x83, 0x71, 0xC1, 0x71, 0x01, 0x01, 0x83, 0x71, //
    0x83, 0x71, 0xC1, 0x71, 0x83, 0x71, 0x83, 0x71, //
    0x83, 0x71, 0x83, 0x71, 0xFF, 0xFF, 0xFF, 0xFF, //
    0x00, 0x00, 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFF, //
    0x00, 0x00, 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFF, //
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, //
    0xFF, 0xFF, 0xFF, 0xFF, 0x00, 0x00, 0x55, 0x55, //
    0xFF, 0xFF, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, //
    0x13, 0x00, 0x3C, 0x00, 0x13, 0x00, 0x3C, 0x00, //
    0x13, 0x00, 0x3C, 0x00, 0x13, 0x00, 0x3C, 0x00, //
    0x3C, 0x00, 0x3C, 0x00, 0x13, 0x00, 0x3C, 0x00, //
    0x13, 0x00, 0x3C, 0x00, 0x13, 0x00, 0x33, 0x00, //
];

/// Offset inside [`CONFIG_TEMPLATE`] where the serial number is spliced
pub const CONFIG_SERIAL_OFFSET: usize = 0;
