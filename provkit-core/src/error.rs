//! Error types for provkit-core

/// Result type alias for core protocol operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core protocol errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Report payload exceeds the fixed report size
    #[error("Report payload too long: {len} bytes (max: {max} bytes)")]
    ReportOverflow { len: usize, max: usize },

    /// Report is shorter than the header it must carry
    #[error("Frame too short: expected at least {expected} bytes, got {actual} bytes")]
    FrameTooShort { expected: usize, actual: usize },

    /// Reassembly saw an out-of-order or wrong-command frame
    #[error(
        "Frame sequence mismatch: expected 0x{expected:02X}, received 0x{actual:02X}"
    )]
    FrameSequenceMismatch { expected: u8, actual: u8 },

    /// A continuation frame arrived for a different channel
    #[error("Channel mismatch: expected CID 0x{expected:08X}, received 0x{actual:08X}")]
    ChannelMismatch { expected: u32, actual: u32 },

    /// Reassembly received more frames than the declared message length needs
    #[error("Unexpected frame: message of {total} bytes already complete")]
    UnexpectedFrame { total: usize },

    /// Declared message length exceeds what the codec will buffer
    #[error("Message too large: {len} bytes (max: {max} bytes)")]
    MessageTooLarge { len: usize, max: usize },

    /// Unknown command code
    #[error("Unknown command code: 0x{0:02X}")]
    UnknownCommand(u8),

    /// A response field has the wrong length
    #[error("Invalid {field} length: expected {expected} bytes, got {actual} bytes")]
    InvalidLength {
        field: &'static str,
        expected: usize,
        actual: usize,
    },
}
