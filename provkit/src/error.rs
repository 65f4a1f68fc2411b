//! High-level error types

use provkit_core::Command;

use crate::sequencer::Step;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Core protocol error: {0}")]
    Core(#[from] provkit_core::Error),

    #[error("Transport error: {0}")]
    Transport(#[from] provkit_transport::Error),

    #[error("Response parse error: {0}")]
    Types(#[from] provkit_types::Error),

    /// No matching reply within the attempt budget
    #[error("No matching reply after {attempts} read attempts")]
    Timeout { attempts: usize },

    /// Well-formed reply with a failure status byte
    #[error("Device rejected {command} with status {status}")]
    DeviceRejected {
        command: Command,
        status: u8,
        /// Raw reply bytes for forensic inspection
        response: Vec<u8>,
    },

    /// Attestation key material is not a 32-byte P-256 scalar
    #[error("Invalid attestation key length: expected 32 bytes, got {actual}")]
    InvalidKeyLength { actual: usize },

    /// Key file could not be decoded
    #[error("Invalid attestation key material: {0}")]
    InvalidKey(String),

    /// Device reported a serial of the wrong length
    #[error("Invalid serial length: expected 15 bytes, got {actual}")]
    InvalidSerialLength { actual: usize },

    /// Entropy chunk exceeds what the reseed command accepts
    #[error("Seed chunk too large: {len} bytes (max: {max})")]
    SeedChunkTooLarge { len: usize, max: usize },

    /// Ping payload came back different from what was sent
    #[error("Ping mismatch: sent {sent} bytes, got back {received} matching bytes")]
    PingMismatch { sent: usize, received: usize },

    /// Operator prompt I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Operator interrupt honored at a suspension point
    #[error("Operation cancelled")]
    Cancelled,

    /// Failure at a provisioning step; terminal for the session
    #[error(
        "Provisioning aborted at step {step} (device state may be mutated: {state_mutated})"
    )]
    StepFailed {
        step: Step,
        /// Whether the device may already have applied the step
        state_mutated: bool,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Step identifier when the error is a terminal step failure
    pub fn failed_step(&self) -> Option<Step> {
        match self {
            Self::StepFailed { step, .. } => Some(*step),
            _ => None,
        }
    }
}
