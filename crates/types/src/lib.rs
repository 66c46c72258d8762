//! Core types for Arbuckle.
//!
//! This crate holds everything every participant of a run agrees on before
//! dispatch begins:
//!
//! - [`WorkerId`]: stable participant identity
//! - [`ConfigStore`]: the parsed `key = value` configuration source
//! - [`RunConfig`]: the validated, immutable record built from the store
//! - [`GasMixture`]: composition decoded from a gas table's file name

mod config;
mod error;
mod gas;
mod identifiers;
mod store;
mod value;

pub use config::{
    DiagnosticsConfig, DriftMode, MediumConfig, OutputConfig, RunConfig, SimDetail, SourceType,
    TrackConfig, DEFAULT_TRACK_ENERGY_EV, MAX_BINS, PAIR_ENERGY_EV,
};
pub use error::ConfigError;
pub use gas::{GasComponent, GasMixture, DEFAULT_TEMPERATURE_K};
pub use identifiers::{Waveform, WorkerId};
pub use store::ConfigStore;
pub use value::ConfigValue;
