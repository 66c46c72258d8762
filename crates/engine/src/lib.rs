//! Simulation engine integration.
//!
//! Workers treat the physics as a black box behind [`SimulationEngine`]:
//! one synchronous call per event, returning a fixed-length waveform.
//! [`SyntheticEngine`] stands in for the real engine.

mod adapter;
mod error;
pub mod source;
mod synthetic;

pub use adapter::{DiagnosticStage, EngineFactory, SimulationEngine};
pub use error::EngineError;
pub use source::{sample_origin, TrackOrigin};
pub use synthetic::{
    worker_seed, DiagnosticRecord, SyntheticEngine, SyntheticEngineFactory, DEFAULT_SEED,
};
