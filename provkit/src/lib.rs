//! # provkit
//!
//! Provisioning toolkit for HID security tokens.
//!
//! Talks a vendor-extended framing protocol over fixed 64-byte HID reports
//! and drives the ordered, mostly-irreversible sequence that takes a token
//! from "unconfigured" to "locked, keyed, production".
//!
//! ## Quick start
//!
//! ```no_run
//! use provkit::{AttestationKey, Device};
//!
//! fn main() -> provkit::Result<()> {
//!     let key = AttestationKey::from_pem_file("attest.pem")?;
//!     let mut device = Device::open(None)?;
//!
//!     let outcome = provkit::provision(&mut device, &key)?;
//!     println!("provisioned, serial {}", hex::encode(outcome.serial));
//!
//!     Ok(())
//! }
//! ```
//!
//! Several steps burn one-time hardware fuses. A failed session is never
//! rolled back or retried automatically; the error names the failing step
//! and whether device state may already have changed.

pub mod attest;
pub mod channel;
pub mod device;
pub mod error;
pub mod prompt;
pub mod sequencer;

// Re-exports
pub use attest::AttestationKey;
pub use channel::ReportChannel;
pub use device::Device;
pub use error::{Error, Result};
pub use prompt::{AutoConfirm, Confirm, StdinConfirm};
pub use sequencer::{provision, ProvisioningOutcome, Step};

// Re-export protocol layers
pub use provkit_core::{checksum, CancelToken, Command, Report};
pub use provkit_transport::{HidTransport, TokenInfo, Transport};
pub use provkit_types::{DeviceConstants, DeviceKeySet, FactoryResetReport, SlotFingerprints};
