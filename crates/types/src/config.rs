//! Validated run configuration.

use crate::{ConfigError, ConfigStore};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Mean energy to create one electron-ion pair, in eV.
pub const PAIR_ENERGY_EV: f64 = 26.0;

/// Upper bound on the number of time bins in a waveform.
pub const MAX_BINS: usize = 1 << 24;

/// Default primary particle kinetic energy (a 5.5 MeV alpha), in eV.
pub const DEFAULT_TRACK_ENERGY_EV: f64 = 5.5e6;

/// Charge transport model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DriftMode {
    /// Monte Carlo avalanche with fixed time steps.
    Mc,
    /// Microscopic electron tracking.
    Micro,
    /// Runge-Kutta-Fehlberg drift lines.
    Rkf,
}

impl DriftMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "mc" => Some(DriftMode::Mc),
            "micro" => Some(DriftMode::Micro),
            "rkf" => Some(DriftMode::Rkf),
            _ => None,
        }
    }
}

impl fmt::Display for DriftMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DriftMode::Mc => "MC",
            DriftMode::Micro => "Micro",
            DriftMode::Rkf => "RKF",
        };
        write!(f, "{}", name)
    }
}

/// Simulation fidelity. Sets the time binning and the transport step sizes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimDetail {
    Coarse,
    Normal,
    Fine,
}

impl SimDetail {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "coarse" => Some(SimDetail::Coarse),
            "normal" => Some(SimDetail::Normal),
            "fine" => Some(SimDetail::Fine),
            _ => None,
        }
    }

    /// Width of one signal time bin, in ns.
    pub fn bin_width_ns(&self) -> f64 {
        match self {
            SimDetail::Coarse => 20.0,
            SimDetail::Normal => 10.0,
            SimDetail::Fine => 5.0,
        }
    }

    /// Target number of electrons per track cluster.
    pub fn cluster_size(&self) -> u32 {
        match self {
            SimDetail::Coarse => 200,
            SimDetail::Normal => 50,
            SimDetail::Fine => 20,
        }
    }

    /// Monte Carlo transport time step, in ns.
    pub fn mc_time_step_ns(&self) -> f64 {
        match self {
            SimDetail::Coarse => 1.0,
            SimDetail::Normal => 0.1,
            SimDetail::Fine => 0.01,
        }
    }

    /// Maximum RKF integration step, in cm.
    pub fn rkf_max_step_cm(&self) -> f64 {
        match self {
            SimDetail::Coarse => 0.3 / 10.0,
            SimDetail::Normal => 0.3 / 15.0,
            SimDetail::Fine => 0.3 / 20.0,
        }
    }
}

impl fmt::Display for SimDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Geometry of the particle source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceType {
    /// Source plated on the end cap, emitting into a cone along +z.
    Plated,
    /// Collimated source on the cylinder wall, emitting along -y.
    Collimated,
}

impl SourceType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "plated" => Some(SourceType::Plated),
            "collimated" => Some(SourceType::Collimated),
            _ => None,
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourceType::Plated => "plated",
            SourceType::Collimated => "collimated",
        };
        write!(f, "{}", name)
    }
}

/// Medium and field-map identifiers. Passed to the engine untouched.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MediumConfig {
    pub gas_file: String,
    pub ion_file: Option<String>,
    pub component_type: String,
    pub voltage: f64,
}

/// Primary particle track settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackConfig {
    pub srim_file: Option<String>,
    pub energy_ev: f64,
    pub straggle: bool,
}

/// Which diagnostic artifacts to produce.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticsConfig {
    pub electron_velocity: bool,
    pub ion_velocity: bool,
    pub field: bool,
    pub mesh: bool,
    pub signal: bool,
    pub drift: bool,
}

impl DiagnosticsConfig {
    /// Any plot requested before the first event.
    pub fn any_setup(&self) -> bool {
        self.electron_velocity || self.ion_velocity || self.field || self.mesh
    }

    /// Any plot requested after the final event.
    pub fn any_final(&self) -> bool {
        self.signal || self.drift
    }
}

/// Names of the persisted arrays. `None` disables that output.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    pub timed_signal: Option<String>,
    pub charge_histogram: Option<String>,
}

/// Validated configuration for one run.
///
/// Built once by [`RunConfig::from_store`] and shared read-only with every
/// participant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Number of events to simulate.
    pub n_events: u64,
    pub drift_mode: DriftMode,
    pub detail: SimDetail,
    pub source: SourceType,
    /// Signal time window, in ns.
    pub t_max_ns: f64,
    pub medium: MediumConfig,
    pub track: TrackConfig,
    pub diagnostics: DiagnosticsConfig,
    pub outputs: OutputConfig,
    /// Base seed for the engines' random streams.
    pub seed: Option<u64>,
}

impl RunConfig {
    /// Validate every key the run needs, failing on the first problem.
    pub fn from_store(store: &ConfigStore) -> Result<Self, ConfigError> {
        let n_events = {
            let value = store.required("n_events")?;
            let n = value
                .as_int()
                .ok_or_else(|| ConfigError::invalid("n_events", "integer", value.type_name()))?;
            u64::try_from(n).map_err(|_| ConfigError::invalid("n_events", "integer >= 0", n))?
        };

        let drift = store.required_str("drift_mode")?;
        let drift_mode = DriftMode::parse(drift)
            .ok_or_else(|| ConfigError::invalid("drift_mode", "one of MC, Micro, RKF", drift))?;

        let detail = store.required_str("sim_detail")?;
        let detail = SimDetail::parse(detail).ok_or_else(|| {
            ConfigError::invalid("sim_detail", "one of Coarse, Normal, Fine", detail)
        })?;

        let src = store.required_str("src_type")?;
        let source = SourceType::parse(src)
            .ok_or_else(|| ConfigError::invalid("src_type", "one of plated, collimated", src))?;

        let t_max_ns = store.required_f64("tmax")?;
        if !t_max_ns.is_finite() || t_max_ns < detail.bin_width_ns() {
            return Err(ConfigError::invalid(
                "tmax",
                "a window of at least one time bin",
                t_max_ns,
            ));
        }
        if t_max_ns / detail.bin_width_ns() > MAX_BINS as f64 {
            return Err(ConfigError::invalid(
                "tmax",
                "a window of at most 2^24 time bins",
                t_max_ns,
            ));
        }

        let medium = MediumConfig {
            gas_file: store.required_str("gasfile")?.to_string(),
            ion_file: store.optional_str("ionfile")?,
            component_type: store
                .optional_str("cmp_type")?
                .unwrap_or_else(|| "COMSOL".to_string()),
            voltage: store.optional_f64("voltage", 0.0)?,
        };

        let track = TrackConfig {
            srim_file: store.optional_str("srimfile")?,
            energy_ev: store.optional_f64("trackE", DEFAULT_TRACK_ENERGY_EV)?,
            straggle: store.optional_bool("straggle", true)?,
        };
        if !(track.energy_ev > 0.0) {
            return Err(ConfigError::invalid("trackE", "energy > 0", track.energy_ev));
        }

        let diagnostics = DiagnosticsConfig {
            electron_velocity: store.optional_bool("plot_e_vel", false)?,
            ion_velocity: store.optional_bool("plot_ion_vel", false)?,
            field: store.optional_bool("plot_field", false)?,
            mesh: store.optional_bool("plot_mesh", false)?,
            signal: store.optional_bool("plot_signal", false)?,
            drift: store.optional_bool("plot_drift", false)?,
        };

        let outputs = OutputConfig {
            timed_signal: store.optional_str("f_timed_signal")?,
            charge_histogram: store.optional_str("f_charge_hist")?,
        };

        let seed = match store.get("seed") {
            None | Some(crate::ConfigValue::Null) => None,
            Some(value) => {
                let s = value
                    .as_int()
                    .ok_or_else(|| ConfigError::invalid("seed", "integer", value.type_name()))?;
                let seed = u64::try_from(s)
                    .map_err(|_| ConfigError::invalid("seed", "integer >= 0", s))?;
                Some(seed)
            }
        };

        Ok(Self {
            n_events,
            drift_mode,
            detail,
            source,
            t_max_ns,
            medium,
            track,
            diagnostics,
            outputs,
            seed,
        })
    }

    /// Number of time bins in every waveform of this run.
    pub fn n_bins(&self) -> usize {
        (self.t_max_ns / self.detail.bin_width_ns()).floor() as usize
    }

    /// Time-bin width, in ns.
    pub fn bin_width_ns(&self) -> f64 {
        self.detail.bin_width_ns()
    }

    /// Override the seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Override the event count.
    pub fn with_n_events(mut self, n_events: u64) -> Self {
        self.n_events = n_events;
        self
    }

    /// Override the output names.
    pub fn with_outputs(mut self, outputs: OutputConfig) -> Self {
        self.outputs = outputs;
        self
    }
}
