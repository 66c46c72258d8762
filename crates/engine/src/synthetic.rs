//! A synthetic stand-in for the external physics engine.
//!
//! Produces plausible induced-current waveforms without any gas tables or
//! field maps: a track is sampled from the configured source, cut into
//! electron clusters, and every cluster drifts straight to the readout plane
//! with a velocity set by the gas pressure. Useful for exercising the
//! dispatch pipeline end to end.

use crate::source::{sample_origin, TrackOrigin};
use crate::{DiagnosticStage, EngineError, EngineFactory, SimulationEngine};
use arbuckle_types::{
    DriftMode, GasMixture, RunConfig, Waveform, WorkerId, DEFAULT_TRACK_ENERGY_EV, PAIR_ENERGY_EV,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

/// Elementary charge, in fC.
const ELECTRON_CHARGE_FC: f64 = 1.602_176_634e-4;

/// Height of the readout plane, in cm.
const READOUT_Z_CM: f64 = 0.34;

/// Electron drift velocity at 1 bar, in cm/ns.
const DRIFT_VELOCITY_1BAR: f64 = 0.005;

/// Range of a default-energy alpha at 1 bar, in cm.
const RANGE_1BAR_CM: f64 = 4.2;

/// Seed used when the run configuration carries none.
pub const DEFAULT_SEED: u64 = 12345;

/// Derive a participant's seed from the run seed.
pub fn worker_seed(base: u64, worker: WorkerId) -> u64 {
    base.wrapping_add(worker.get() as u64)
        .wrapping_mul(0x517cc1b727220a95)
}

/// What one diagnostics call produced.
#[derive(Debug, Clone, PartialEq)]
pub struct DiagnosticRecord {
    pub stage: DiagnosticStage,
    pub worker: WorkerId,
    /// Names of the artifacts that were requested.
    pub artifacts: Vec<&'static str>,
}

/// Synthetic event simulator for one participant.
pub struct SyntheticEngine {
    worker: WorkerId,
    rng: ChaCha8Rng,
    mixture: GasMixture,
    last_waveform: Option<Waveform>,
    diagnostics: Vec<DiagnosticRecord>,
}

impl SyntheticEngine {
    /// Set up an engine for `worker`.
    ///
    /// Fails if the gas file name cannot be decoded, since the drift
    /// velocity depends on the gas pressure.
    pub fn new(config: &RunConfig, worker: WorkerId) -> Result<Self, EngineError> {
        let mixture = GasMixture::parse(&config.medium.gas_file)?;
        if !(mixture.pressure_bar > 0.0) {
            return Err(EngineError::Setup(format!(
                "gas pressure must be positive, got {} bar",
                mixture.pressure_bar
            )));
        }

        let seed = worker_seed(config.seed.unwrap_or(DEFAULT_SEED), worker);
        debug!(worker = %worker, seed, "Synthetic engine ready");

        Ok(Self {
            worker,
            rng: ChaCha8Rng::seed_from_u64(seed),
            mixture,
            last_waveform: None,
            diagnostics: Vec::new(),
        })
    }

    /// Waveform of the most recently computed event.
    pub fn last_waveform(&self) -> Option<&Waveform> {
        self.last_waveform.as_ref()
    }

    /// Diagnostics emitted so far.
    pub fn diagnostics(&self) -> &[DiagnosticRecord] {
        &self.diagnostics
    }

    fn drift_velocity(&self) -> f64 {
        DRIFT_VELOCITY_1BAR / self.mixture.pressure_bar
    }

    fn track_range(&self, energy_ev: f64) -> f64 {
        RANGE_1BAR_CM * (energy_ev / DEFAULT_TRACK_ENERGY_EV) / self.mixture.pressure_bar
    }

    /// Symmetric triangular noise in `[-width, width]`.
    fn jitter(&mut self, width: f64) -> f64 {
        if width <= 0.0 {
            return 0.0;
        }
        (self.rng.gen::<f64>() + self.rng.gen::<f64>() - 1.0) * width
    }

    fn jitter_width(config: &RunConfig, drift_time: f64) -> f64 {
        match config.drift_mode {
            DriftMode::Rkf => 0.0,
            DriftMode::Mc => 0.05 * drift_time.sqrt() + config.detail.mc_time_step_ns(),
            DriftMode::Micro => 0.1 * drift_time.sqrt(),
        }
    }

    fn simulate(&mut self, config: &RunConfig, origin: TrackOrigin) -> Waveform {
        let n_bins = config.n_bins();
        let bin_width = config.bin_width_ns();
        let mut waveform = vec![0.0; n_bins];

        let electrons = (config.track.energy_ev / PAIR_ENERGY_EV).round() as u64;
        let cluster_size = config.detail.cluster_size() as u64;
        let n_clusters = electrons.div_ceil(cluster_size).max(1);
        let range = self.track_range(config.track.energy_ev);
        let spacing = range / n_clusters as f64;
        let velocity = self.drift_velocity();

        let mut remaining = electrons;
        for k in 0..n_clusters {
            let n = remaining.min(cluster_size);
            remaining -= n;

            let mut s = (k as f64 + 0.5) * spacing;
            if config.track.straggle {
                s += self.jitter(0.5 * spacing);
            }
            let point = origin.point_at(s.max(0.0));

            let distance = (READOUT_Z_CM - point[2]).abs();
            let drift_time = distance / velocity;
            let arrival = drift_time + self.jitter(Self::jitter_width(config, drift_time));
            if arrival < 0.0 {
                continue;
            }

            let bin = (arrival / bin_width) as usize;
            if let Some(sample) = waveform.get_mut(bin) {
                // Electrons induce negative current on the readout electrode.
                *sample -= n as f64 * ELECTRON_CHARGE_FC / bin_width;
            }
        }

        waveform
    }
}

impl SimulationEngine for SyntheticEngine {
    fn compute_event(&mut self, config: &RunConfig) -> Result<Waveform, EngineError> {
        let origin = sample_origin(config.source, &mut self.rng);
        let waveform = self.simulate(config, origin);
        self.last_waveform = Some(waveform.clone());
        Ok(waveform)
    }

    fn emit_diagnostics(
        &mut self,
        config: &RunConfig,
        stage: DiagnosticStage,
    ) -> Result<(), EngineError> {
        let flags = &config.diagnostics;
        let requested = match stage {
            DiagnosticStage::Setup => vec![
                ("electron_velocity", flags.electron_velocity),
                ("ion_velocity", flags.ion_velocity),
                ("mesh", flags.mesh),
                ("field", flags.field),
            ],
            DiagnosticStage::Final => vec![("signal", flags.signal), ("drift", flags.drift)],
        };
        let artifacts: Vec<&'static str> = requested
            .iter()
            .filter(|(_, on)| *on)
            .map(|(name, _)| *name)
            .collect();

        if stage == DiagnosticStage::Final && self.last_waveform.is_none() {
            return Err(EngineError::Diagnostics(
                "final diagnostics requested before any event".to_string(),
            ));
        }

        if !artifacts.is_empty() {
            info!(
                worker = %self.worker,
                stage = %stage,
                artifacts = ?artifacts,
                gas = %config.medium.gas_file,
                "Diagnostics emitted"
            );
        }

        self.diagnostics.push(DiagnosticRecord {
            stage,
            worker: self.worker,
            artifacts,
        });
        Ok(())
    }
}

/// Builds a [`SyntheticEngine`] per participant.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyntheticEngineFactory;

impl EngineFactory for SyntheticEngineFactory {
    fn build(
        &self,
        config: &RunConfig,
        worker: WorkerId,
    ) -> Result<Box<dyn SimulationEngine>, EngineError> {
        Ok(Box::new(SyntheticEngine::new(config, worker)?))
    }
}
