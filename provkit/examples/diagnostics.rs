//! Exercise the runtime command set of an already-provisioned token:
//! channel init, echo round-trips, indicator blink, and hardware RNG.
//!
//! ```text
//! cargo run --example diagnostics -- [serial]
//! ```

use anyhow::Context;
use provkit::Device;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "debug".into()),
        )
        .init();

    let serial = std::env::args().nth(1);
    let mut device = Device::open(serial.as_deref()).context("opening token")?;
    println!("talking to {}", device.description());

    let cid = device.init()?;
    println!("channel 0x{cid:08X}");

    for len in [1, 57, 300] {
        device.ping(len)?;
        println!("ping {len}B ok");
    }

    device.wink()?;
    println!("winked");

    let block = device.rng_block()?;
    println!("rng: {}", hex::encode(block));

    Ok(())
}
