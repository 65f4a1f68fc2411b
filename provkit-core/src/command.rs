//! Vendor command definitions
//!
//! Single-byte opcodes. The configuration space (0x80..=0x8F) is only
//! accepted by build-configured firmware; the runtime space (0xC0..=0xFF)
//! stays available on production tokens.

use std::fmt;

use crate::error::{Error, Result};

/// First opcode of the vendor runtime extension range (0x80 | 0x40)
pub const VENDOR_FIRST: u8 = 0xC0;

/// Last opcode of the vendor runtime extension range (0x80 | 0x7F)
pub const VENDOR_LAST: u8 = 0xFF;

/// Vendor command codes
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Command {
    // Configuration commands (build firmware only)
    GetSerialNum = 0x80,
    IsBuild = 0x81,
    IsConfigured = 0x82,
    Lock = 0x83,
    GenKey = 0x84,
    LoadTransKey = 0x85,
    LoadWriteKey = 0x86,
    LoadAttestKey = 0x87,
    Bootloader = 0x88,
    BootloaderDestroy = 0x89,
    AteccPassthrough = 0x8A,
    LoadReadKey = 0x8B,
    GenDeviceKey = 0x8C,
    GetSlotsFingerprints = 0x8D,
    TestConfig = 0x8E,
    GetConstants = 0x8F,

    // Runtime vendor extensions
    Rng = 0xC0,
    Seed = 0xC1,
    Wink = 0xC2,
    FactoryReset = 0xC3,
    UpdateConfig = 0xC4,
    Status = 0xC5,
}

impl Command {
    /// Check if this is a build-configuration command
    pub fn is_config(self) -> bool {
        (self as u8) < VENDOR_FIRST
    }

    /// Check if this is a runtime vendor extension
    pub fn is_vendor(self) -> bool {
        (self as u8) >= VENDOR_FIRST
    }

    /// Check if success of this command burns a one-time hardware fuse
    ///
    /// These commands must never be retried blindly on an ambiguous reply.
    pub fn is_irreversible(self) -> bool {
        matches!(
            self,
            Self::Lock | Self::BootloaderDestroy | Self::FactoryReset
        )
    }

    /// Get command name
    pub fn name(self) -> &'static str {
        match self {
            Self::GetSerialNum => "CONFIG_GET_SERIAL_NUM",
            Self::IsBuild => "CONFIG_IS_BUILD",
            Self::IsConfigured => "CONFIG_IS_CONFIGURED",
            Self::Lock => "CONFIG_LOCK",
            Self::GenKey => "CONFIG_GENKEY",
            Self::LoadTransKey => "CONFIG_LOAD_TRANS_KEY",
            Self::LoadWriteKey => "CONFIG_LOAD_WRITE_KEY",
            Self::LoadAttestKey => "CONFIG_LOAD_ATTEST_KEY",
            Self::Bootloader => "CONFIG_BOOTLOADER",
            Self::BootloaderDestroy => "CONFIG_BOOTLOADER_DESTROY",
            Self::AteccPassthrough => "CONFIG_ATECC_PASSTHROUGH",
            Self::LoadReadKey => "CONFIG_LOAD_READ_KEY",
            Self::GenDeviceKey => "CONFIG_GEN_DEVICE_KEY",
            Self::GetSlotsFingerprints => "CONFIG_GET_SLOTS_FINGERPRINTS",
            Self::TestConfig => "CONFIG_TEST_CONFIG",
            Self::GetConstants => "CONFIG_GET_CONSTANTS",
            Self::Rng => "CUSTOM_RNG",
            Self::Seed => "CUSTOM_SEED",
            Self::Wink => "CUSTOM_WINK",
            Self::FactoryReset => "CUSTOM_FACTORY_RESET",
            Self::UpdateConfig => "CUSTOM_UPDATE_CONFIG",
            Self::Status => "CUSTOM_STATUS",
        }
    }
}

impl From<Command> for u8 {
    fn from(cmd: Command) -> u8 {
        cmd as u8
    }
}

impl TryFrom<u8> for Command {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0x80 => Ok(Self::GetSerialNum),
            0x81 => Ok(Self::IsBuild),
            0x82 => Ok(Self::IsConfigured),
            0x83 => Ok(Self::Lock),
            0x84 => Ok(Self::GenKey),
            0x85 => Ok(Self::LoadTransKey),
            0x86 => Ok(Self::LoadWriteKey),
            0x87 => Ok(Self::LoadAttestKey),
            0x88 => Ok(Self::Bootloader),
            0x89 => Ok(Self::BootloaderDestroy),
            0x8A => Ok(Self::AteccPassthrough),
            0x8B => Ok(Self::LoadReadKey),
            0x8C => Ok(Self::GenDeviceKey),
            0x8D => Ok(Self::GetSlotsFingerprints),
            0x8E => Ok(Self::TestConfig),
            0x8F => Ok(Self::GetConstants),
            0xC0 => Ok(Self::Rng),
            0xC1 => Ok(Self::Seed),
            0xC2 => Ok(Self::Wink),
            0xC3 => Ok(Self::FactoryReset),
            0xC4 => Ok(Self::UpdateConfig),
            0xC5 => Ok(Self::Status),
            _ => Err(Error::UnknownCommand(value)),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(0x{:02X})", self.name(), *self as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_conversion() {
        assert_eq!(u8::from(Command::Lock), 0x83);
        assert_eq!(Command::try_from(0x83).unwrap(), Command::Lock);
    }

    #[test]
    fn test_command_spaces() {
        assert!(Command::Lock.is_config());
        assert!(!Command::Lock.is_vendor());
        assert!(Command::FactoryReset.is_vendor());
        assert!(!Command::FactoryReset.is_config());
    }

    #[test]
    fn test_irreversible_commands() {
        assert!(Command::Lock.is_irreversible());
        assert!(Command::BootloaderDestroy.is_irreversible());
        assert!(Command::FactoryReset.is_irreversible());
        assert!(!Command::GetSerialNum.is_irreversible());
    }

    #[test]
    fn test_unknown_command() {
        assert!(Command::try_from(0x42).is_err());
        assert!(Command::try_from(0x00).is_err());
    }
}
