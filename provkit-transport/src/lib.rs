//! Transport layer for token provisioning
//!
//! Provides the narrow device-handle contract the upper layers depend on,
//! plus the USB HID implementation.

pub mod error;
pub mod hid;

pub use error::{Error, Result};
pub use hid::{HidTransport, TokenInfo};

use std::time::Duration;

use provkit_core::Report;

/// Device-handle contract
///
/// Exactly one in-flight request per handle; reads never block past the
/// given timeout. Implementations are exclusively owned by one session.
pub trait Transport: Send {
    /// Write one report to the device
    fn write(&mut self, report: &Report) -> Result<()>;

    /// Read one report, waiting at most `timeout`; `None` on timeout
    fn read(&mut self, timeout: Duration) -> Result<Option<Report>>;

    /// Human-readable handle description for logging
    fn description(&self) -> String;
}
