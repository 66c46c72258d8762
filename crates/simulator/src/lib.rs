//! Arbuckle Simulator
//!
//! Drives a detector signal simulation run from a plain-text configuration
//! file: parse and validate the configuration, pick a dispatch strategy for
//! the requested pool size, run every event, and write the accumulated
//! timed signal and charge histogram as `.npy` arrays.
//!
//! # Example
//!
//! ```ignore
//! use arbuckle_simulator::{Simulator, SimulatorConfig};
//!
//! let config = SimulatorConfig::new(Some("run.cfg".into()))
//!     .with_participants(8)
//!     .with_output_dir("Outputs");
//!
//! let report = Simulator::new(config).run()?;
//! println!("mean charge: {:?}", report.accumulator.mean_total());
//! ```

pub mod app;

pub use app::{default_participants, log_summary, Simulator, SimulatorConfig, SimulatorError};
