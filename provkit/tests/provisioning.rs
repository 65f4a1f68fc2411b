//! End-to-end provisioning against a scripted token double
//!
//! The double answers raw configuration reports the way build firmware
//! does: byte 0 echoes the command, byte 1 carries the status.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pretty_assertions::assert_eq;

use provkit::{checksum, Device, Error, Report, Step, Transport};
use provkit_core::constants::{CONFIG_SERIAL_OFFSET, CONFIG_TEMPLATE, SERIAL_LEN};

const SERIAL: [u8; SERIAL_LEN] = *b"ABCDEF012345678";
const DEVICE_KEY: [u8; 16] = [0xAA; 16];
const KEY_HASH: [u8; 16] = [0xBB; 16];
const CONSTANT: [u8; 16] = [0xCC; 16];

#[derive(Default)]
struct TokenState {
    outbox: VecDeque<Report>,
    /// Every report the host delivered, in order
    writes: Vec<Vec<u8>>,
    /// Command byte that should be answered with a failure status
    reject: Option<u8>,
}

#[derive(Clone)]
struct ScriptedToken {
    state: Arc<Mutex<TokenState>>,
}

impl ScriptedToken {
    fn new(reject: Option<u8>) -> Self {
        Self {
            state: Arc::new(Mutex::new(TokenState {
                reject,
                ..TokenState::default()
            })),
        }
    }

    fn commands_seen(&self) -> Vec<u8> {
        self.state
            .lock()
            .unwrap()
            .writes
            .iter()
            .map(|w| w[0])
            .collect()
    }

    fn write_count(&self) -> usize {
        self.state.lock().unwrap().writes.len()
    }

    fn reply_for(cmd: u8, state: &TokenState) -> Option<Vec<u8>> {
        if state.reject == Some(cmd) {
            return Some(vec![cmd, 0]);
        }
        match cmd {
            // IsBuild
            0x81 => Some(vec![cmd, 1]),
            // GetSerialNum
            0x80 => {
                let mut reply = vec![cmd, SERIAL_LEN as u8];
                reply.extend_from_slice(&SERIAL);
                Some(reply)
            }
            // Lock, LoadWriteKey, LoadAttestKey, BootloaderDestroy, LoadReadKey
            0x83 | 0x86 | 0x87 | 0x89 | 0x8B => Some(vec![cmd, 1]),
            // GenDeviceKey
            0x8C => {
                let mut reply = vec![cmd, 1];
                reply.extend_from_slice(&DEVICE_KEY);
                reply.extend_from_slice(&KEY_HASH);
                reply.extend_from_slice(&CONSTANT);
                Some(reply)
            }
            _ => None,
        }
    }
}

impl Transport for ScriptedToken {
    fn write(&mut self, report: &Report) -> provkit_transport::Result<()> {
        let mut state = self.state.lock().unwrap();
        state.writes.push(report.to_vec());

        let cmd = report.command_byte();
        if let Some(reply) = Self::reply_for(cmd, &state) {
            let report = Report::from_payload(&reply).unwrap();
            state.outbox.push_back(report);
        }
        Ok(())
    }

    fn read(&mut self, _timeout: Duration) -> provkit_transport::Result<Option<Report>> {
        Ok(self.state.lock().unwrap().outbox.pop_front())
    }

    fn description(&self) -> String {
        "scripted token".into()
    }
}

fn device_over(token: &ScriptedToken) -> Device {
    Device::from_transport(Box::new(token.clone()))
        .with_read_timeout(Duration::from_millis(1))
        .with_attempts(3)
}

fn attest_key() -> provkit::AttestationKey {
    provkit::AttestationKey::from_bytes(&[0x42; 32]).unwrap()
}

#[test]
fn full_sequence_completes_and_parses_key_triple() {
    let token = ScriptedToken::new(None);
    let mut device = device_over(&token);

    let outcome = provkit::provision(&mut device, &attest_key()).unwrap();

    assert_eq!(outcome.serial, SERIAL);
    assert_eq!(outcome.device_keys.device_key, DEVICE_KEY);
    assert_eq!(outcome.device_keys.written_key_hash, KEY_HASH);
    assert_eq!(outcome.device_keys.derived_constant, CONSTANT);

    // The checksum must seal the template with the serial spliced in
    let mut config = CONFIG_TEMPLATE;
    config[CONFIG_SERIAL_OFFSET..CONFIG_SERIAL_OFFSET + SERIAL_LEN].copy_from_slice(&SERIAL);
    assert_eq!(outcome.config_checksum, checksum::calculate(&config));

    // The lock report must have carried exactly that checksum
    let lock_write = token
        .state
        .lock()
        .unwrap()
        .writes
        .iter()
        .find(|w| w[0] == 0x83)
        .cloned()
        .unwrap();
    assert_eq!(&lock_write[1..3], &outcome.config_checksum);

    // Steps must have run in order, ending with bootloader destruction
    let seen = token.commands_seen();
    let dedup: Vec<u8> = seen.iter().fold(Vec::new(), |mut acc, &c| {
        if acc.last() != Some(&c) {
            acc.push(c);
        }
        acc
    });
    assert_eq!(dedup, vec![0x81, 0x80, 0x83, 0x86, 0x8B, 0x87, 0x8C, 0x89]);
}

#[test]
fn rejection_at_key_gen_is_terminal_and_skips_bootloader_destroy() {
    let token = ScriptedToken::new(Some(0x8C));
    let mut device = device_over(&token);

    let err = provkit::provision(&mut device, &attest_key()).unwrap_err();

    match err {
        Error::StepFailed {
            step,
            state_mutated,
            source,
        } => {
            assert_eq!(step, Step::GenerateDeviceKey);
            assert!(!state_mutated);
            assert!(matches!(*source, Error::DeviceRejected { status: 0, .. }));
        }
        other => panic!("unexpected error: {other}"),
    }

    // DestroyBootloader must never have been attempted
    assert!(!token.commands_seen().contains(&0x89));
}

#[test]
fn malformed_attestation_key_is_rejected_before_any_write() {
    let token = ScriptedToken::new(None);
    let device = device_over(&token);

    for len in [31usize, 33] {
        let err = device.load_attest_key(&vec![0x11; len]).unwrap_err();
        assert!(matches!(err, Error::InvalidKeyLength { actual } if actual == len));
    }

    assert_eq!(token.write_count(), 0);
}

#[test]
fn wrong_serial_length_aborts_before_lock() {
    let token = ScriptedToken::new(None);

    /// Answers GetSerialNum with a 14-byte serial instead of 15
    struct ShortSerialToken(ScriptedToken);
    impl Transport for ShortSerialToken {
        fn write(&mut self, report: &Report) -> provkit_transport::Result<()> {
            if report.command_byte() == 0x80 {
                let mut state = self.0.state.lock().unwrap();
                state.writes.push(report.to_vec());
                let mut reply = vec![0x80, 14];
                reply.extend_from_slice(&SERIAL[..14]);
                let report = Report::from_payload(&reply).unwrap();
                state.outbox.push_back(report);
                Ok(())
            } else {
                self.0.write(report)
            }
        }
        fn read(&mut self, timeout: Duration) -> provkit_transport::Result<Option<Report>> {
            self.0.read(timeout)
        }
        fn description(&self) -> String {
            self.0.description()
        }
    }

    let mut device = Device::from_transport(Box::new(ShortSerialToken(token.clone())))
        .with_read_timeout(Duration::from_millis(1))
        .with_attempts(3);

    let err = provkit::provision(&mut device, &attest_key()).unwrap_err();
    match err {
        Error::StepFailed { step, source, .. } => {
            assert_eq!(step, Step::ReadSerial);
            assert!(matches!(*source, Error::InvalidSerialLength { actual: 14 }));
        }
        other => panic!("unexpected error: {other}"),
    }

    // Nothing irreversible was attempted
    assert!(!token.commands_seen().contains(&0x83));
}
