//! Arbuckle Simulator CLI
//!
//! Run one simulation from a configuration file.
//!
//! # Example
//!
//! ```bash
//! # Use every core, writing arrays to ./Outputs
//! arbuckle-sim run.cfg
//!
//! # Serial run with a fixed seed
//! arbuckle-sim run.cfg -n 1 --seed 42
//!
//! # Show how the configuration file was parsed
//! arbuckle-sim run.cfg --print-config
//! ```

use arbuckle_simulator::{default_participants, Simulator, SimulatorConfig};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Arbuckle Simulator
///
/// Simulates detector events in parallel and writes the summed induced
/// current and the per-event charge histogram.
#[derive(Parser, Debug)]
#[command(name = "arbuckle-sim")]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file (`key = value` per line)
    config: Option<PathBuf>,

    /// Participants, coordinator included. Defaults to the number of cores.
    #[arg(short = 'n', long)]
    participants: Option<usize>,

    /// Directory for the output arrays
    #[arg(short = 'o', long, default_value = "Outputs")]
    output_dir: PathBuf,

    /// Random seed. Overrides the configuration file's `seed` key.
    #[arg(long)]
    seed: Option<u64>,

    /// Coordinator sleep between polls for results, in microseconds
    #[arg(long, default_value = "200")]
    poll_interval_us: u64,

    /// Print the parsed configuration as JSON and exit
    #[arg(long)]
    print_config: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(
                "warn,arbuckle_simulator=info,arbuckle_simulation=info,arbuckle_dispatch=info",
            )
        }))
        .init();

    let args = Args::parse();

    let mut config = SimulatorConfig::new(args.config)
        .with_participants(args.participants.unwrap_or_else(default_participants))
        .with_output_dir(args.output_dir)
        .with_poll_interval(Duration::from_micros(args.poll_interval_us));
    if let Some(seed) = args.seed {
        config = config.with_seed(seed);
    }
    let simulator = Simulator::new(config);

    if args.print_config {
        return match simulator.config_json() {
            Ok(json) => {
                println!("{json}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!(error = %e, "Failed to load configuration");
                ExitCode::FAILURE
            }
        };
    }

    match simulator.run() {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Simulation failed");
            ExitCode::FAILURE
        }
    }
}
