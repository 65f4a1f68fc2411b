//! Transport errors

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("No token found (serial filter: {serial:?})")]
    DeviceNotFound { serial: Option<String> },

    #[error("Short write: {written} of {expected} bytes")]
    ShortWrite { written: usize, expected: usize },

    #[error("HID error: {0}")]
    Hid(#[from] hidapi::HidError),
}
