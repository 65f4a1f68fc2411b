//! High-level token interface
//!
//! Two exchange shapes, matching the firmware:
//! - Configuration commands (0x80..=0x8F) are raw report exchanges: the
//!   command byte leads the report and the reply echoes it in byte 0 with a
//!   status in byte 1.
//! - Runtime vendor commands and pings are framed exchanges on a channel
//!   identifier (broadcast until a CID is negotiated via init).

use std::thread;
use std::time::Duration;

use bytes::{BufMut, BytesMut};
use rand::{thread_rng, Rng};
use tracing::{debug, info, trace, warn};

use provkit_core::constants::{
    ATTEST_KEY_LEN, FRAME_CMD_INIT, FRAME_CMD_PING, INIT_CID_OFFSET, INIT_NONCE_SIZE,
    READ_ATTEMPTS, READ_TIMEOUT, SEED_CHUNK_MAX, SERIAL_LEN, SETTLE_DELAY, STATUS_OK,
};
use provkit_core::frame::trim_padding;
use provkit_core::{CancelToken, Command, Report, BROADCAST_CID};
use provkit_transport::{HidTransport, Transport};
use provkit_types::{DeviceConstants, DeviceKeySet, FactoryResetReport, SlotFingerprints};

use crate::channel::ReportChannel;
use crate::error::{Error, Result};
use crate::prompt::Confirm;

/// Redelivery budget for read-only configuration queries
const QUERY_DELIVERIES: usize = 2;

/// Redelivery budget for the button-gated configuration update
const UPDATE_CONFIG_DELIVERIES: usize = 20;

/// One provisioning-capable token
pub struct Device {
    channel: ReportChannel,
    cid: Option<u32>,
    attempts: usize,
    read_timeout: Duration,
}

impl Device {
    /// Open a connected token, optionally selected by serial number
    pub fn open(serial: Option<&str>) -> Result<Self> {
        let transport = HidTransport::open(serial)?;
        Ok(Self::from_transport(Box::new(transport)))
    }

    /// Build a device over any transport; used with test doubles
    pub fn from_transport(transport: Box<dyn Transport>) -> Self {
        Self {
            channel: ReportChannel::new(transport),
            cid: None,
            attempts: READ_ATTEMPTS,
            read_timeout: READ_TIMEOUT,
        }
    }

    /// Override the per-attempt read timeout
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Override the read attempt budget per delivery
    pub fn with_attempts(mut self, attempts: usize) -> Self {
        self.attempts = attempts;
        self
    }

    /// Cancellation token honored between polling attempts
    pub fn cancel_token(&self) -> CancelToken {
        self.channel.cancel_token()
    }

    pub fn description(&self) -> String {
        self.channel.description()
    }

    // ---- configuration commands (raw report exchanges) ----

    /// Query whether the firmware reports itself build-configured
    ///
    /// Distinct from provisioned/locked: a production token answers the
    /// runtime command set, not this one.
    pub fn is_build_configured(&self) -> Result<bool> {
        let reply = self.config_query(Command::IsBuild, &[])?;
        Ok(reply[1] == STATUS_OK)
    }

    /// Fetch the factory serial of the crypto element (exactly 15 bytes)
    pub fn read_serial(&self) -> Result<[u8; SERIAL_LEN]> {
        let reply = self.config_query(Command::GetSerialNum, &[])?;

        let len = reply[1] as usize;
        if len != SERIAL_LEN {
            return Err(Error::InvalidSerialLength { actual: len });
        }
        let mut serial = [0u8; SERIAL_LEN];
        serial.copy_from_slice(&reply[2..2 + SERIAL_LEN]);

        debug!(serial = hex::encode(serial), "read factory serial");
        Ok(serial)
    }

    /// Lock the configuration zone against its checksum. Irreversible.
    pub fn lock_config(&self, checksum: [u8; 2]) -> Result<()> {
        info!(crc = hex::encode(checksum), "locking configuration zone");
        let reply = self.config_execute(Command::Lock, &checksum)?;
        expect_status_ok(Command::Lock, &reply)
    }

    /// Load the symmetric write-auth key slot
    pub fn load_write_key(&self) -> Result<()> {
        let reply = self.config_execute(Command::LoadWriteKey, &[])?;
        expect_status_ok(Command::LoadWriteKey, &reply)
    }

    /// Load the symmetric read-auth key slot
    pub fn load_read_key(&self) -> Result<()> {
        let reply = self.config_execute(Command::LoadReadKey, &[])?;
        expect_status_ok(Command::LoadReadKey, &reply)
    }

    /// Inject the externally supplied attestation key
    ///
    /// The scalar is validated before anything touches the transport: a
    /// malformed key must have no side effect.
    pub fn load_attest_key(&self, key_bytes: &[u8]) -> Result<()> {
        if key_bytes.len() != ATTEST_KEY_LEN {
            return Err(Error::InvalidKeyLength {
                actual: key_bytes.len(),
            });
        }
        let reply = self.config_execute(Command::LoadAttestKey, key_bytes)?;
        expect_status_ok(Command::LoadAttestKey, &reply)
    }

    /// Trigger on-device key-pair generation
    pub fn gen_device_key(&self) -> Result<DeviceKeySet> {
        let reply = self.config_execute(Command::GenDeviceKey, &[])?;
        expect_status_ok(Command::GenDeviceKey, &reply)?;
        Ok(DeviceKeySet::parse(&reply)?)
    }

    /// Erase the bootloader code pages. Irreversible.
    pub fn destroy_bootloader(&self) -> Result<()> {
        warn!("erasing bootloader code pages");
        let reply = self.config_execute(Command::BootloaderDestroy, &[])?;
        expect_status_ok(Command::BootloaderDestroy, &reply)
    }

    /// Ask the device to compare its live configuration against the
    /// expected one; `true` means equal (debug firmware only)
    pub fn test_config(&self) -> Result<bool> {
        let reply = self.config_query(Command::TestConfig, &[])?;
        Ok(reply[1] == 0)
    }

    /// Read truncated fingerprints of all data slots (debug firmware only)
    pub fn fingerprints(&self) -> Result<SlotFingerprints> {
        let reply = self.config_query(Command::GetSlotsFingerprints, &[])?;
        expect_status_ok(Command::GetSlotsFingerprints, &reply)?;
        Ok(SlotFingerprints::parse(&reply)?)
    }

    /// Read the derived constant blocks (debug firmware only)
    pub fn device_constants(&self) -> Result<DeviceConstants> {
        let reply = self.config_query(Command::GetConstants, &[])?;
        expect_status_ok(Command::GetConstants, &reply)?;
        Ok(DeviceConstants::parse(&reply)?)
    }

    /// Read-only configuration exchange; may redeliver the command, since
    /// re-reading device state is harmless.
    fn config_query(&self, cmd: Command, payload: &[u8]) -> Result<Vec<u8>> {
        let report = config_report(cmd, payload)?;
        let cmd_byte = u8::from(cmd);

        let mut last = Error::Timeout {
            attempts: self.attempts,
        };
        for delivery in 0..QUERY_DELIVERIES {
            trace!(%cmd, delivery, "delivering query");
            match self.channel.deliver_and_await(
                &report,
                |r| r.command_byte() == cmd_byte,
                self.attempts,
                self.read_timeout,
            ) {
                Ok(reply) => {
                    // Give the firmware time to service the crypto element
                    thread::sleep(SETTLE_DELAY);
                    return Ok(reply.to_vec());
                }
                Err(e @ Error::Timeout { .. }) => last = e,
                Err(e) => return Err(e),
            }
        }
        Err(last)
    }

    /// State-changing configuration exchange: exactly one delivery, and
    /// never interrupted mid-exchange. An ambiguous outcome is surfaced to
    /// the caller, never papered over with a retry.
    fn config_execute(&self, cmd: Command, payload: &[u8]) -> Result<Vec<u8>> {
        let report = config_report(cmd, payload)?;
        let cmd_byte = u8::from(cmd);

        trace!(%cmd, "delivering command");
        let reply = self.channel.deliver_and_await_uninterruptible(
            &report,
            |r| r.command_byte() == cmd_byte,
            self.attempts,
            self.read_timeout,
        )?;
        Ok(reply.to_vec())
    }

    // ---- framed exchanges ----

    /// Negotiate a channel identifier via the broadcast init handshake
    pub fn init(&mut self) -> Result<u32> {
        let mut nonce = [0u8; INIT_NONCE_SIZE];
        thread_rng().fill(&mut nonce);

        let mut payload = BytesMut::with_capacity(INIT_NONCE_SIZE);
        payload.put_slice(&nonce);
        let report = frame_report(BROADCAST_CID, FRAME_CMD_INIT, &payload)?;

        let reply = self.channel.deliver_and_await(
            &report,
            |r| {
                let raw = r.as_bytes();
                raw[4] == FRAME_CMD_INIT && raw[7..7 + INIT_NONCE_SIZE] == nonce
            },
            self.attempts,
            self.read_timeout,
        )?;

        let raw = reply.as_bytes();
        let cid = u32::from_be_bytes([
            raw[INIT_CID_OFFSET],
            raw[INIT_CID_OFFSET + 1],
            raw[INIT_CID_OFFSET + 2],
            raw[INIT_CID_OFFSET + 3],
        ]);

        debug!(cid = format!("0x{cid:08X}"), "channel established");
        self.cid = Some(cid);
        Ok(cid)
    }

    fn ensure_cid(&mut self) -> Result<u32> {
        match self.cid {
            Some(cid) => Ok(cid),
            None => self.init(),
        }
    }

    /// Framed echo round-trip with `len` random non-zero payload bytes
    pub fn ping(&mut self, len: usize) -> Result<()> {
        let cid = self.ensure_cid()?;

        let payload: Vec<u8> = (0..len).map(|_| thread_rng().gen_range(1..=0xFFu8)).collect();

        let mut echoed = self.channel.framed_exchange(
            cid,
            FRAME_CMD_PING,
            &payload,
            FRAME_CMD_PING,
            self.attempts,
            self.read_timeout,
        )?;

        trim_padding(&mut echoed, payload.len());
        echoed.truncate(payload.len());
        if echoed != payload {
            return Err(Error::PingMismatch {
                sent: payload.len(),
                received: echoed.len(),
            });
        }

        debug!(len, "ping ok");
        Ok(())
    }

    /// Pulse the visual indicator; fire-and-forget
    pub fn wink(&self) -> Result<()> {
        let report = frame_report(BROADCAST_CID, Command::Wink.into(), &[])?;
        self.channel.write(&report)
    }

    /// Pull one 32-byte block from the hardware RNG
    pub fn rng_block(&self) -> Result<[u8; 32]> {
        let message = self.channel.framed_exchange(
            BROADCAST_CID,
            Command::Rng.into(),
            &[],
            Command::Rng.into(),
            self.attempts,
            self.read_timeout,
        )?;

        message
            .as_slice()
            .try_into()
            .map_err(|_| Error::Types(provkit_types::Error::ShortField {
                field: "rng block",
                expected: 32,
                actual: message.len(),
            }))
    }

    /// Feed an entropy chunk (at most 20 bytes) into the RNG seed
    pub fn seed(&self, chunk: &[u8]) -> Result<()> {
        if chunk.len() > SEED_CHUNK_MAX {
            return Err(Error::SeedChunkTooLarge {
                len: chunk.len(),
                max: SEED_CHUNK_MAX,
            });
        }

        let cmd = Command::Seed;
        let message = self.channel.framed_exchange(
            BROADCAST_CID,
            cmd.into(),
            chunk,
            cmd.into(),
            self.attempts,
            self.read_timeout,
        )?;
        expect_framed_status_ok(cmd, &message)
    }

    /// Rewrite the device's runtime configuration. Requires the operator to
    /// hold the touch button for the duration; redelivered until the device
    /// acknowledges or the budget runs out.
    pub fn update_config(&self, serial_enable: bool, confirm: &mut dyn Confirm) -> Result<()> {
        confirm.await_confirmation(
            "Start pressing the token's touch button within the next 3 seconds and \
             hold it until the operation completes. The token will not blink.",
        )?;

        let cmd = Command::UpdateConfig;
        let payload = [serial_enable as u8];

        let mut last = Error::Timeout {
            attempts: self.attempts,
        };
        for delivery in 0..UPDATE_CONFIG_DELIVERIES {
            trace!(delivery, "delivering config update");
            match self.channel.framed_exchange(
                BROADCAST_CID,
                cmd.into(),
                &payload,
                cmd.into(),
                self.attempts,
                self.read_timeout,
            ) {
                Ok(message) if message.first() == Some(&STATUS_OK) => {
                    info!("device configuration updated");
                    return Ok(());
                }
                Ok(message) => {
                    last = Error::DeviceRejected {
                        command: cmd,
                        status: message.first().copied().unwrap_or(0),
                        response: message,
                    };
                }
                Err(e @ Error::Timeout { .. }) => last = e,
                Err(e) => return Err(e),
            }
            thread::sleep(Duration::from_secs(1));
        }
        Err(last)
    }

    /// Regenerate the device root key. Irreversible; the reply reports
    /// per-slot fingerprints before and after for operator verification.
    pub fn factory_reset(&self, confirm: &mut dyn Confirm) -> Result<FactoryResetReport> {
        confirm.await_confirmation(
            "Factory reset regenerates the device key and cannot be undone.",
        )?;

        warn!("starting factory reset");
        let cmd = Command::FactoryReset;
        let report = frame_report(BROADCAST_CID, cmd.into(), &[])?;

        // The device waits for repeated button contact; give it a long
        // uninterruptible window.
        let reply = self.channel.deliver_and_await_uninterruptible(
            &report,
            |r| r.as_bytes()[4] == u8::from(cmd),
            60,
            Duration::from_secs(1),
        )?;

        let payload = &reply.as_bytes()[7..];
        let parsed = FactoryResetReport::parse(payload)?;
        if !parsed.succeeded() {
            return Err(Error::DeviceRejected {
                command: cmd,
                status: 0,
                response: reply.to_vec(),
            });
        }
        info!("factory reset complete");
        Ok(parsed)
    }
}

/// Build a raw configuration report: command byte then parameters
fn config_report(cmd: Command, payload: &[u8]) -> Result<Report> {
    let mut buf = BytesMut::with_capacity(1 + payload.len());
    buf.put_u8(cmd.into());
    buf.put_slice(payload);
    Ok(Report::from_payload(&buf)?)
}

/// Build a single framed report (init frame) for short vendor exchanges
fn frame_report(cid: u32, cmd: u8, payload: &[u8]) -> Result<Report> {
    let reports = provkit_core::frame::fragment(cid, cmd, payload)?;
    debug_assert_eq!(reports.len(), 1, "vendor exchange must fit one frame");
    Ok(reports[0])
}

/// Check the status byte of a raw configuration reply
fn expect_status_ok(cmd: Command, reply: &[u8]) -> Result<()> {
    match reply.get(1) {
        Some(&STATUS_OK) => Ok(()),
        Some(&status) => Err(Error::DeviceRejected {
            command: cmd,
            status,
            response: reply.to_vec(),
        }),
        None => Err(Error::DeviceRejected {
            command: cmd,
            status: 0,
            response: reply.to_vec(),
        }),
    }
}

/// Check the leading status byte of a framed reply payload
fn expect_framed_status_ok(cmd: Command, message: &[u8]) -> Result<()> {
    match message.first() {
        Some(&STATUS_OK) => Ok(()),
        _ => Err(Error::DeviceRejected {
            command: cmd,
            status: message.first().copied().unwrap_or(0),
            response: message.to_vec(),
        }),
    }
}
