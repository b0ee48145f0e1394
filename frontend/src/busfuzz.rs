//! Bus fuzz jig: hammer the HDLC decoder with valid, mutated and
//! garbage traffic over a loopback link and report what survived.

use atsc_core::fieldbus::frames::{DeviceAddress, OutputStateFrame};
use atsc_core::fieldbus::{BusLink, FieldBus, Loopback, hdlc};
use clap::Args;

#[derive(Args)]
pub struct BusfuzzArgs {
    /// Number of frames to inject.
    #[arg(short = 'n', long, default_value_t = 10_000)]
    iterations: u64,

    /// RNG seed for reproducible runs.
    #[arg(long)]
    seed: Option<u64>,
}

pub fn run(args: BusfuzzArgs) -> crate::ExitCode {
    let mut rng = match args.seed {
        Some(seed) => fastrand::Rng::with_seed(seed),
        None => fastrand::Rng::new(),
    };
    let (near, far) = Loopback::pair();
    let bus = FieldBus::new(Box::new(near));

    let mut injected_valid = 0u64;
    let mut decoded = 0u64;
    for _ in 0..args.iterations {
        let states: Vec<bool> = (0..96).map(|_| rng.bool()).collect();
        let frame = OutputStateFrame::new(DeviceAddress::Controller, states, rng.bool());
        let mut wire = hdlc::encode(&frame.content());
        match rng.u8(0..3) {
            0 => {
                injected_valid += 1;
            }
            1 => {
                // Flip one byte of the body; the CRC should catch it.
                let index = rng.usize(1..wire.len() - 1);
                wire[index] ^= 1 << rng.u8(0..8);
            }
            _ => {
                // Raw line noise, flag-terminated so it frames.
                wire = (0..rng.usize(1..64)).map(|_| rng.u8(..)).collect();
                wire.push(hdlc::FLAG);
            }
        }
        let _ = far.send(&wire);
        decoded += bus.poll().len() as u64;
    }

    let counters = bus.counters();
    println!("injected {} frames ({} valid)", args.iterations, injected_valid);
    println!(
        "decoded {} frames, {} framing errors, degraded={}",
        decoded,
        counters.framing_errors,
        bus.degraded()
    );
    crate::ExitCode::Ok
}
