//! Structured response types for provkit
//!
//! Device replies are flat byte runs; this crate turns them into named,
//! length-checked fields instead of ad hoc offset arithmetic.

pub mod device_key;
pub mod error;
pub mod factory_reset;
pub mod fingerprints;

pub use device_key::{DeviceConstants, DeviceKeySet};
pub use error::{Error, Result};
pub use factory_reset::FactoryResetReport;
pub use fingerprints::SlotFingerprints;

/// Read a fixed-size field from the front of `bytes`, advancing the slice
pub(crate) fn take_field<const N: usize>(
    bytes: &mut &[u8],
    field: &'static str,
) -> Result<[u8; N]> {
    if bytes.len() < N {
        return Err(Error::ShortField {
            field,
            expected: N,
            actual: bytes.len(),
        });
    }
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[..N]);
    *bytes = &bytes[N..];
    Ok(out)
}
