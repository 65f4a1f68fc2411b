//! Provisioning sequencer
//!
//! A strict linear state machine that takes an unconfigured token to
//! "locked, keyed, production". Transitions are forward-only on success;
//! any failure is terminal for the session. Two steps burn one-time
//! hardware fuses and can never be undone, so nothing here retries a
//! state-changing command: the only recovery path is a human deciding what
//! to do with the half-provisioned token.

use std::fmt;

use tracing::{info, warn};

use provkit_core::constants::{CONFIG_SERIAL_OFFSET, CONFIG_TEMPLATE, SERIAL_LEN};
use provkit_core::checksum;
use provkit_types::DeviceKeySet;

use crate::attest::AttestationKey;
use crate::device::Device;
use crate::error::{Error, Result};

/// Named provisioning steps, in execution order
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Step {
    VerifyBuildStatus,
    ReadSerial,
    ComputeAndLockConfig,
    LoadWriteKey,
    LoadReadKey,
    LoadAttestationKey,
    GenerateDeviceKey,
    DestroyBootloader,
}

impl Step {
    /// Whether success of this step burns a one-time hardware fuse
    pub fn is_irreversible(self) -> bool {
        matches!(self, Self::ComputeAndLockConfig | Self::DestroyBootloader)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::VerifyBuildStatus => "VerifyBuildStatus",
            Self::ReadSerial => "ReadSerial",
            Self::ComputeAndLockConfig => "ComputeAndLockConfig",
            Self::LoadWriteKey => "LoadWriteKey",
            Self::LoadReadKey => "LoadReadKey",
            Self::LoadAttestationKey => "LoadAttestationKey",
            Self::GenerateDeviceKey => "GenerateDeviceKey",
            Self::DestroyBootloader => "DestroyBootloader",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Everything a completed session produced
#[derive(Debug, Clone)]
pub struct ProvisioningOutcome {
    /// Factory serial spliced into the locked configuration
    pub serial: [u8; SERIAL_LEN],

    /// Checksum the configuration zone was sealed against
    pub config_checksum: [u8; 2],

    /// Generated device key material, hash, and derived constant
    pub device_keys: DeviceKeySet,
}

/// Run the full provisioning sequence against an opened token
///
/// On failure the session is abandoned at the failing step; nothing is
/// rolled back, because the hardware cannot roll back. The returned
/// [`Error::StepFailed`] names the step and whether device state may
/// already have been mutated.
pub fn provision(device: &mut Device, attest_key: &AttestationKey) -> Result<ProvisioningOutcome> {
    // 1. VerifyBuildStatus
    checkpoint(device, Step::VerifyBuildStatus)?;
    let configured = step(Step::VerifyBuildStatus, device.is_build_configured())?;
    if !configured {
        return Err(fail(
            Step::VerifyBuildStatus,
            Error::DeviceRejected {
                command: provkit_core::Command::IsBuild,
                status: 0,
                response: Vec::new(),
            },
        ));
    }
    info!("token reports build firmware");

    // 2. ReadSerial
    checkpoint(device, Step::ReadSerial)?;
    let serial = step(Step::ReadSerial, device.read_serial())?;

    let mut config = CONFIG_TEMPLATE;
    config[CONFIG_SERIAL_OFFSET..CONFIG_SERIAL_OFFSET + SERIAL_LEN].copy_from_slice(&serial);

    // 3. ComputeAndLockConfig -- first fuse
    checkpoint(device, Step::ComputeAndLockConfig)?;
    let config_checksum = checksum::calculate(&config);
    step(Step::ComputeAndLockConfig, device.lock_config(config_checksum))?;
    info!(crc = hex::encode(config_checksum), "configuration zone locked");

    // 4. LoadWriteKey
    checkpoint(device, Step::LoadWriteKey)?;
    step(Step::LoadWriteKey, device.load_write_key())?;

    // 5. LoadReadKey
    checkpoint(device, Step::LoadReadKey)?;
    step(Step::LoadReadKey, device.load_read_key())?;

    // 6. LoadAttestationKey
    checkpoint(device, Step::LoadAttestationKey)?;
    step(
        Step::LoadAttestationKey,
        device.load_attest_key(attest_key.as_bytes()),
    )?;
    info!("attestation key loaded");

    // 7. GenerateDeviceKey
    checkpoint(device, Step::GenerateDeviceKey)?;
    let device_keys = step(Step::GenerateDeviceKey, device.gen_device_key())?;
    info!(keys = ?device_keys, "device key generated");

    // 8. DestroyBootloader -- second fuse
    checkpoint(device, Step::DestroyBootloader)?;
    step(Step::DestroyBootloader, device.destroy_bootloader())?;
    info!("bootloader removed; token is production");

    Ok(ProvisioningOutcome {
        serial,
        config_checksum,
        device_keys,
    })
}

/// Honor a pending operator interrupt between steps, never inside one
fn checkpoint(device: &Device, next: Step) -> Result<()> {
    if device.cancel_token().is_cancelled() {
        warn!(step = %next, "session cancelled before step");
        return Err(Error::Cancelled);
    }
    Ok(())
}

/// Tag a step failure as terminal for the session
fn step<T>(step: Step, result: Result<T>) -> Result<T> {
    result.map_err(|e| fail(step, e))
}

fn fail(step: Step, source: Error) -> Error {
    // For a fuse-burning step any failure must be treated as "the device
    // may already have applied it": a lost reply proves nothing, and an
    // already-locked zone also answers with a failure status.
    let state_mutated = step.is_irreversible();
    warn!(step = %step, state_mutated, error = %source, "provisioning aborted");
    Error::StepFailed {
        step,
        state_mutated,
        source: Box::new(source),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_step_ordering_names() {
        assert_eq!(Step::ComputeAndLockConfig.to_string(), "ComputeAndLockConfig");
        assert_eq!(Step::GenerateDeviceKey.to_string(), "GenerateDeviceKey");
    }

    #[test]
    fn test_irreversible_steps() {
        assert!(Step::ComputeAndLockConfig.is_irreversible());
        assert!(Step::DestroyBootloader.is_irreversible());
        assert!(!Step::ReadSerial.is_irreversible());
        assert!(!Step::LoadAttestationKey.is_irreversible());
    }

    #[test]
    fn test_fail_tags_mutation_flag() {
        let err = fail(Step::ComputeAndLockConfig, Error::Timeout { attempts: 10 });
        assert!(matches!(
            err,
            Error::StepFailed {
                step: Step::ComputeAndLockConfig,
                state_mutated: true,
                ..
            }
        ));

        let err = fail(Step::ReadSerial, Error::Timeout { attempts: 10 });
        assert!(matches!(
            err,
            Error::StepFailed {
                state_mutated: false,
                ..
            }
        ));
    }
}
