//! # provkit-core
//!
//! Core protocol implementation for HID security-token provisioning.
//!
//! This crate provides the low-level protocol primitives:
//! - Fixed-size report type
//! - Frame codec (init + continuation fragmentation, reassembly)
//! - Configuration checksum calculation
//! - Command definitions
//! - Protocol constants

pub mod cancel;
pub mod checksum;
pub mod command;
pub mod constants;
pub mod error;
pub mod frame;
pub mod report;

pub use cancel::CancelToken;
pub use command::Command;
pub use error::{Error, Result};
pub use frame::{Frame, Reassembler};
pub use report::Report;

/// Fixed HID report size on the wire
pub const REPORT_SIZE: usize = 64;

/// Payload capacity of an initialization frame (64 - 7 byte header)
pub const INIT_DATA_SIZE: usize = 57;

/// Payload capacity of a continuation frame (64 - 5 byte header)
pub const CONT_DATA_SIZE: usize = 59;

/// Broadcast channel identifier used before a CID is assigned
pub const BROADCAST_CID: u32 = 0xFFFF_FFFF;
