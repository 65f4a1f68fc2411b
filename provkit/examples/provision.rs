//! Provision a fresh token end to end.
//!
//! ```text
//! cargo run --example provision -- attest.pem [serial]
//! ```
//!
//! The key file holds the P-256 attestation private key (SEC1 or PKCS#8
//! PEM). The optional serial argument selects one token when several are
//! plugged in.

use anyhow::{bail, Context};
use provkit::{AttestationKey, Device};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let key_path = match args.next() {
        Some(p) => p,
        None => bail!("usage: provision <attest-key.pem> [serial]"),
    };
    let serial = args.next();

    let key = AttestationKey::from_pem_file(&key_path)
        .with_context(|| format!("loading attestation key from {key_path}"))?;

    let mut device = Device::open(serial.as_deref()).context("opening token")?;
    println!("provisioning {}", device.description());

    let outcome = provkit::provision(&mut device, &key)?;

    println!("done");
    println!("  serial:     {}", hex::encode(outcome.serial));
    println!("  config crc: {}", hex::encode(outcome.config_checksum));
    println!(
        "  key hash:   {}",
        hex::encode(outcome.device_keys.written_key_hash)
    );
    Ok(())
}
