//! Error types for provkit-types

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Response ended before a named field was complete
    #[error("Short read of {field}: expected {expected} bytes, got {actual} bytes")]
    ShortField {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A reserved field did not hold its fixed expected value
    #[error("Reserved field {field} holds unexpected value {value}")]
    BadReservedField { field: &'static str, value: String },
}
