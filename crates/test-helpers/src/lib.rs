//! Test helpers for Arbuckle.
//!
//! Canned run configurations and a scripted engine whose waveforms are
//! known in advance, so aggregates can be checked exactly.

use arbuckle_engine::{DiagnosticStage, EngineError, EngineFactory, SimulationEngine};
use arbuckle_types::{ConfigStore, RunConfig, Waveform, WorkerId};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Bin width of the `Coarse` detail level, in ns.
const COARSE_BIN_NS: usize = 20;

/// A valid configuration with `n_events` events of `n_bins` samples.
///
/// No outputs are named; set them with [`RunConfig::with_outputs`].
pub fn test_config(n_events: u64, n_bins: usize) -> RunConfig {
    let text = format!(
        "n_events = {}\n\
         drift_mode = RKF\n\
         sim_detail = Coarse\n\
         src_type = plated\n\
         tmax = {}\n\
         gasfile = ar_90_co2_10_1bar_20C.gas\n\
         seed = 1\n",
        n_events,
        n_bins * COARSE_BIN_NS
    );
    let store = ConfigStore::parse(&text);
    RunConfig::from_store(&store).unwrap()
}

/// Waveform produced for the `index`-th scripted event.
///
/// Samples are multiples of 0.5, so sums over any order are exact.
pub fn event_waveform(index: u64, n_bins: usize) -> Waveform {
    (0..n_bins)
        .map(|k| (index + 1) as f64 * 0.5 + k as f64)
        .collect()
}

/// Elementwise sum of events `0..n_events`.
pub fn expected_sum(n_events: u64, n_bins: usize) -> Waveform {
    let mut sum = vec![0.0; n_bins];
    for i in 0..n_events {
        for (acc, sample) in sum.iter_mut().zip(event_waveform(i, n_bins)) {
            *acc += sample;
        }
    }
    sum
}

/// Per-event totals of events `0..n_events`, sorted ascending.
pub fn expected_histogram(n_events: u64, n_bins: usize) -> Vec<f64> {
    (0..n_events)
        .map(|i| event_waveform(i, n_bins).iter().sum())
        .collect()
}

/// Counters shared by every engine a [`ScriptedFactory`] builds.
#[derive(Debug, Default)]
pub struct ScriptCounters {
    /// Events computed, and the next event index.
    pub events: AtomicU64,
    pub setup: AtomicU64,
    pub finals: AtomicU64,
}

impl ScriptCounters {
    pub fn events(&self) -> u64 {
        self.events.load(Ordering::SeqCst)
    }

    pub fn setup(&self) -> u64 {
        self.setup.load(Ordering::SeqCst)
    }

    pub fn finals(&self) -> u64 {
        self.finals.load(Ordering::SeqCst)
    }
}

/// Engine returning [`event_waveform`]s in sequence.
pub struct ScriptedEngine {
    counters: Arc<ScriptCounters>,
    /// Waveform length; the configured bin count when `None`.
    length: Option<usize>,
    /// Fail once this many events were computed by this engine.
    fail_after: Option<u64>,
    /// Upper bound of a random per-event delay, in µs.
    jitter_us: u64,
    rng: ChaCha8Rng,
    computed: u64,
    setup: u64,
    finals: u64,
}

impl ScriptedEngine {
    /// Engine with its own counters, producing `n_bins` samples per event.
    pub fn ramp(n_bins: usize) -> Self {
        Self::shared(Arc::new(ScriptCounters::default())).with_length(n_bins)
    }

    /// Like [`ramp`](Self::ramp), but fails after `ok_events` events.
    pub fn failing_after(n_bins: usize, ok_events: u64) -> Self {
        let mut engine = Self::ramp(n_bins);
        engine.fail_after = Some(ok_events);
        engine
    }

    /// Engine drawing event indices from shared `counters`.
    pub fn shared(counters: Arc<ScriptCounters>) -> Self {
        Self {
            counters,
            length: None,
            fail_after: None,
            jitter_us: 0,
            rng: ChaCha8Rng::seed_from_u64(0),
            computed: 0,
            setup: 0,
            finals: 0,
        }
    }

    pub fn with_length(mut self, length: usize) -> Self {
        self.length = Some(length);
        self
    }

    /// Sleep a random `0..=max_us` µs before each event.
    pub fn with_jitter(mut self, max_us: u64, seed: u64) -> Self {
        self.jitter_us = max_us;
        self.rng = ChaCha8Rng::seed_from_u64(seed);
        self
    }

    /// Events computed by this engine.
    pub fn computed(&self) -> u64 {
        self.computed
    }

    pub fn setup_diagnostics(&self) -> u64 {
        self.setup
    }

    pub fn final_diagnostics(&self) -> u64 {
        self.finals
    }
}

impl SimulationEngine for ScriptedEngine {
    fn compute_event(&mut self, config: &RunConfig) -> Result<Waveform, EngineError> {
        if let Some(limit) = self.fail_after {
            if self.computed >= limit {
                return Err(EngineError::Compute(format!(
                    "scripted failure after {} events",
                    limit
                )));
            }
        }

        if self.jitter_us > 0 {
            let delay = self.rng.gen_range(0..=self.jitter_us);
            thread::sleep(Duration::from_micros(delay));
        }

        let index = self.counters.events.fetch_add(1, Ordering::SeqCst);
        self.computed += 1;
        let length = self.length.unwrap_or_else(|| config.n_bins());
        Ok(event_waveform(index, length))
    }

    fn emit_diagnostics(
        &mut self,
        _config: &RunConfig,
        stage: DiagnosticStage,
    ) -> Result<(), EngineError> {
        match stage {
            DiagnosticStage::Setup => {
                self.setup += 1;
                self.counters.setup.fetch_add(1, Ordering::SeqCst);
            }
            DiagnosticStage::Final => {
                self.finals += 1;
                self.counters.finals.fetch_add(1, Ordering::SeqCst);
            }
        }
        Ok(())
    }
}

/// Builds [`ScriptedEngine`]s sharing one set of counters.
#[derive(Default)]
pub struct ScriptedFactory {
    counters: Arc<ScriptCounters>,
    failing: Option<(WorkerId, u64)>,
    wrong_length: Option<(WorkerId, usize)>,
    jitter_us: u64,
}

impl ScriptedFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// `worker`'s engine fails after `ok_events` events.
    pub fn with_failing_worker(mut self, worker: WorkerId, ok_events: u64) -> Self {
        self.failing = Some((worker, ok_events));
        self
    }

    /// `worker`'s engine returns waveforms of `length` samples.
    pub fn with_wrong_length(mut self, worker: WorkerId, length: usize) -> Self {
        self.wrong_length = Some((worker, length));
        self
    }

    /// Every engine sleeps a random `0..=max_us` µs per event.
    pub fn with_jitter(mut self, max_us: u64) -> Self {
        self.jitter_us = max_us;
        self
    }

    pub fn counters(&self) -> Arc<ScriptCounters> {
        Arc::clone(&self.counters)
    }
}

impl EngineFactory for ScriptedFactory {
    fn build(
        &self,
        _config: &RunConfig,
        worker: WorkerId,
    ) -> Result<Box<dyn SimulationEngine>, EngineError> {
        let mut engine = ScriptedEngine::shared(Arc::clone(&self.counters))
            .with_jitter(self.jitter_us, worker.get() as u64);

        if let Some((id, ok_events)) = self.failing {
            if id == worker {
                engine.fail_after = Some(ok_events);
            }
        }
        if let Some((id, length)) = self.wrong_length {
            if id == worker {
                engine.length = Some(length);
            }
        }
        Ok(Box::new(engine))
    }
}
