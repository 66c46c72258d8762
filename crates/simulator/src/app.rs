//! Loading a run configuration, running it, and writing its outputs.

use arbuckle_engine::{EngineFactory, SyntheticEngineFactory};
use arbuckle_output::{NpySink, PersistenceSink};
use arbuckle_simulation::{persist, select_strategy, RunError, RunReport, DEFAULT_POLL_INTERVAL};
use arbuckle_types::{ConfigError, ConfigStore, RunConfig};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

/// Errors from the simulator driver.
#[derive(Debug, Error)]
pub enum SimulatorError {
    #[error(transparent)]
    Run(#[from] RunError),

    #[error("Failed to serialize config: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<ConfigError> for SimulatorError {
    fn from(e: ConfigError) -> Self {
        SimulatorError::Run(RunError::Config(e))
    }
}

/// Participants to use when none are requested: one per available core.
pub fn default_participants() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Settings for one invocation of the simulator.
#[derive(Clone, Debug)]
pub struct SimulatorConfig {
    /// Configuration file. `None` fails with [`ConfigError::Missing`].
    pub config_path: Option<PathBuf>,

    /// Pool size, coordinator included.
    pub participants: usize,

    /// Directory the output arrays are written to.
    pub output_dir: PathBuf,

    /// Overrides the `seed` key of the configuration file.
    pub seed: Option<u64>,

    /// Coordinator sleep between polls for results.
    pub poll_interval: Duration,
}

impl SimulatorConfig {
    pub fn new(config_path: Option<PathBuf>) -> Self {
        Self {
            config_path,
            participants: default_participants(),
            output_dir: PathBuf::from("Outputs"),
            seed: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_participants(mut self, participants: usize) -> Self {
        self.participants = participants.max(1);
        self
    }

    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

/// Drives one simulation run from a configuration file.
pub struct Simulator {
    config: SimulatorConfig,
}

impl Simulator {
    pub fn new(config: SimulatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Parse the configuration file.
    pub fn load_store(&self) -> Result<ConfigStore, SimulatorError> {
        Ok(ConfigStore::load_optional(self.config.config_path.as_deref())?)
    }

    /// Parse and validate the configuration file, resolving the seed.
    ///
    /// The command-line seed wins over the file's; with neither, a random
    /// seed is drawn and logged so the run can be repeated.
    pub fn load_run_config(&self) -> Result<RunConfig, SimulatorError> {
        let store = self.load_store()?;
        let config = RunConfig::from_store(&store)?;

        let seed = match (self.config.seed, config.seed) {
            (Some(seed), _) | (None, Some(seed)) => seed,
            (None, None) => {
                let seed: u64 = rand::random();
                info!(seed, "No seed configured, drew one");
                seed
            }
        };
        Ok(config.with_seed(seed))
    }

    /// The parsed configuration store as pretty-printed JSON.
    pub fn config_json(&self) -> Result<String, SimulatorError> {
        Ok(serde_json::to_string_pretty(&self.load_store()?)?)
    }

    /// Run with the synthetic engine, writing `.npy` files to the output
    /// directory.
    pub fn run(&self) -> Result<RunReport, SimulatorError> {
        let mut sink = NpySink::new(&self.config.output_dir);
        self.run_with(&SyntheticEngineFactory, &mut sink)
    }

    /// Run with `factory`'s engines, writing outputs to `sink`.
    pub fn run_with(
        &self,
        factory: &dyn EngineFactory,
        sink: &mut dyn PersistenceSink,
    ) -> Result<RunReport, SimulatorError> {
        let config = Arc::new(self.load_run_config()?);
        let strategy = select_strategy(self.config.participants, self.config.poll_interval);

        info!(
            strategy = strategy.name(),
            participants = strategy.participants(),
            n_events = config.n_events,
            n_bins = config.n_bins(),
            drift_mode = %config.drift_mode,
            detail = %config.detail,
            source = %config.source,
            seed = ?config.seed,
            "Starting run"
        );

        let mut report = strategy.run(Arc::clone(&config), factory)?;
        persist(&mut report, &config.outputs, sink)?;
        log_summary(&report);
        Ok(report)
    }
}

/// Log the outcome of a finished run.
pub fn log_summary(report: &RunReport) {
    let acc = &report.accumulator;
    info!(
        strategy = report.strategy,
        participants = report.participants,
        events = acc.merged(),
        n_bins = acc.n_bins(),
        mean_total_charge = acc.mean_total().unwrap_or(0.0),
        elapsed_ms = report.elapsed.as_millis() as u64,
        events_per_sec = report.events_per_sec(),
        "Run complete"
    );
    for (worker, completed) in &report.completions {
        info!(worker = %worker, completed, "Worker tally");
    }
    for path in &report.written {
        info!(path = %path.display(), "Output written");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbuckle_output::MemorySink;
    use arbuckle_test_helpers::{expected_sum, ScriptedFactory};
    use std::fs;
    use std::path::Path;
    use tracing_test::traced_test;

    const CONFIG: &str = "\
# detector run
n_events = 6
drift_mode = MC
sim_detail = Coarse
src_type = collimated
tmax = 100
gasfile = ar_100_1bar.gas
f_timed_signal = timed_signal
f_charge_hist = charge_hist
";

    fn write_config(dir: &Path, text: &str) -> PathBuf {
        let path = dir.join("run.cfg");
        fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn test_missing_config_path() {
        let sim = Simulator::new(SimulatorConfig::new(None));
        let err = sim.load_run_config().unwrap_err();
        assert!(matches!(
            err,
            SimulatorError::Run(RunError::Config(ConfigError::Missing))
        ));
    }

    #[test]
    fn test_seed_resolution() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), &format!("{CONFIG}seed = 5\n"));

        let from_file = Simulator::new(SimulatorConfig::new(Some(path.clone())));
        assert_eq!(from_file.load_run_config().unwrap().seed, Some(5));

        let overridden = Simulator::new(SimulatorConfig::new(Some(path)).with_seed(11));
        assert_eq!(overridden.load_run_config().unwrap().seed, Some(11));

        let unseeded = Simulator::new(SimulatorConfig::new(Some(write_config(dir.path(), CONFIG))));
        assert!(unseeded.load_run_config().unwrap().seed.is_some());
    }

    #[test]
    fn test_config_json() {
        let dir = tempfile::tempdir().unwrap();
        let sim = Simulator::new(SimulatorConfig::new(Some(write_config(dir.path(), CONFIG))));
        let json: serde_json::Value = serde_json::from_str(&sim.config_json().unwrap()).unwrap();

        assert_eq!(json["n_events"], 6);
        assert_eq!(json["drift_mode"], "MC");
        assert_eq!(json["tmax"], 100);
    }

    #[traced_test]
    #[test]
    fn test_run_with_scripted_engine() {
        let dir = tempfile::tempdir().unwrap();
        let config = SimulatorConfig::new(Some(write_config(dir.path(), CONFIG)))
            .with_participants(3)
            .with_poll_interval(Duration::from_micros(50));
        let mut sink = MemorySink::new();

        let report = Simulator::new(config)
            .run_with(&ScriptedFactory::new(), &mut sink)
            .unwrap();

        assert_eq!(report.strategy, "distributed");
        assert_eq!(sink.get("timed_signal"), Some(&expected_sum(6, 5)[..]));
        assert_eq!(sink.get("charge_hist").map(<[f64]>::len), Some(6));
        assert!(logs_contain("Run complete"));
    }

    #[test]
    fn test_run_writes_npy_files() {
        let dir = tempfile::tempdir().unwrap();
        let output_dir = dir.path().join("Outputs");
        let config = SimulatorConfig::new(Some(write_config(dir.path(), CONFIG)))
            .with_participants(1)
            .with_output_dir(&output_dir)
            .with_seed(3);

        let report = Simulator::new(config).run().unwrap();

        assert_eq!(report.strategy, "direct");
        assert_eq!(report.written.len(), 2);
        assert!(output_dir.join("timed_signal.npy").exists());
        assert!(output_dir.join("charge_hist.npy").exists());
    }
}
