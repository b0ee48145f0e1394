use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

mod busfuzz;
mod config;
mod control;
mod logging;
mod pid;
mod rpc;

/// Stable process exit codes; scripts depend on these.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Ok = 0,
    DirectCallRequired = 1,
    LogLevelParseFail = 2,
    LogFileStructureFail = 3,
    LogFacilityFail = 4,
    PidCreateFail = 5,
    PidExists = 6,
    PidRemoveFail = 7,
    /// Configuration or construction failure (outside the 0-7 contract).
    BuildFail = 10,
    /// RPC listener failed to bind.
    RpcBindFail = 11,
}

#[derive(Parser)]
#[command(name = "atsc", about = "Actuated traffic signal controller")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the control daemon.
    Control(ControlArgs),
    /// Feed noise and mutated frames through the HDLC decoder.
    Busfuzz(busfuzz::BusfuzzArgs),
}

#[derive(Args)]
pub struct ControlArgs {
    /// Use a PID file at this path.
    #[arg(long)]
    pid: Option<PathBuf>,

    /// Time-clock rate in Hz.
    #[arg(short = 'r', long, default_value_t = 20.0, value_parser = parse_tick_value)]
    tick_rate: f64,

    /// Virtual time scale; >1 accelerates interval timing.
    #[arg(short = 's', long, default_value_t = 1.0, value_parser = parse_tick_value)]
    tick_scale: f64,

    /// TCP port for the RPC server.
    #[arg(short = 'p', long, default_value_t = 47161, value_parser = clap::value_parser!(u16).range(1..))]
    rpc_port: u16,

    /// Log level filter directives.
    #[arg(short = 'L', long = "levels", default_value = "info")]
    levels: String,

    /// Log file path.
    #[arg(short = 'l', long = "log")]
    log: Option<PathBuf>,

    /// Intersection definition to run.
    #[arg(long, default_value = "nema8")]
    intersection: String,

    /// Serial device for the field bus; the bus is disabled when absent.
    #[arg(long = "bus-port")]
    bus_port: Option<String>,

    /// Daemon configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Generate detector presence from the seeded traffic model.
    #[arg(long)]
    presence_simulation: bool,

    /// Seed for the presence simulation.
    #[arg(long)]
    simulation_seed: Option<u64>,

    /// Start with demand on every phase.
    #[arg(long)]
    init_demand: bool,
}

fn parse_tick_value(v: &str) -> Result<f64, String> {
    let value: f64 = v.parse().map_err(|e| format!("{e}"))?;
    if !(0.01..=1000.0).contains(&value) {
        return Err("out of range (0.01-1000.00)".into());
    }
    Ok(value)
}

fn main() {
    let cli = Cli::parse();
    let code = match cli.command {
        Command::Control(args) => control::run(args),
        Command::Busfuzz(args) => busfuzz::run(args),
    };
    std::process::exit(code as i32);
}
