//! The contract between workers and the simulation engine.

use crate::EngineError;
use arbuckle_types::{RunConfig, Waveform, WorkerId};
use std::fmt;

/// When diagnostics are requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticStage {
    /// Before the first event, on the first worker only.
    Setup,
    /// After the event carrying the final marker.
    Final,
}

impl fmt::Display for DiagnosticStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticStage::Setup => write!(f, "setup"),
            DiagnosticStage::Final => write!(f, "final"),
        }
    }
}

/// An opaque, synchronous event simulator.
///
/// Gas properties, field maps, track generation, and charge drift all live
/// behind this trait. A call runs to completion; there is no cancellation
/// and no retry, and any error is fatal to the run.
pub trait SimulationEngine {
    /// Simulate one event.
    ///
    /// The returned waveform has exactly [`RunConfig::n_bins`] samples.
    fn compute_event(&mut self, config: &RunConfig) -> Result<Waveform, EngineError>;

    /// Produce diagnostic artifacts for `stage`.
    ///
    /// For [`DiagnosticStage::Final`] this is called right after the final
    /// event was computed, so the engine still holds that event's state.
    fn emit_diagnostics(
        &mut self,
        config: &RunConfig,
        stage: DiagnosticStage,
    ) -> Result<(), EngineError>;
}

impl<E: SimulationEngine + ?Sized> SimulationEngine for Box<E> {
    fn compute_event(&mut self, config: &RunConfig) -> Result<Waveform, EngineError> {
        (**self).compute_event(config)
    }

    fn emit_diagnostics(
        &mut self,
        config: &RunConfig,
        stage: DiagnosticStage,
    ) -> Result<(), EngineError> {
        (**self).emit_diagnostics(config, stage)
    }
}

/// Builds one engine per participant.
///
/// Engines are built on the participant's own thread, so they need not be
/// `Send`; the factory is shared by every participant.
pub trait EngineFactory: Send + Sync {
    fn build(
        &self,
        config: &RunConfig,
        worker: WorkerId,
    ) -> Result<Box<dyn SimulationEngine>, EngineError>;
}

impl<F> EngineFactory for F
where
    F: Fn(&RunConfig, WorkerId) -> Result<Box<dyn SimulationEngine>, EngineError> + Send + Sync,
{
    fn build(
        &self,
        config: &RunConfig,
        worker: WorkerId,
    ) -> Result<Box<dyn SimulationEngine>, EngineError> {
        self(config, worker)
    }
}
