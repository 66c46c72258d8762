//! Per-participant worker state machine.
//!
//! ```text
//!          Work(final)            result sent
//!   Idle ──────────────▶ Busy ──────────────▶ Idle
//!    │
//!    │ Stop
//!    ▼
//!  Stopped
//! ```
//!
//! The loop itself performs no channel I/O: the runner blocks on the
//! participant's inbox, hands each message to [`WorkerLoop::handle`], and
//! sends back whatever reply it returns.

use arbuckle_engine::{DiagnosticStage, EngineError, SimulationEngine};
use arbuckle_messages::{Message, Task};
use arbuckle_types::{RunConfig, Waveform, WorkerId};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Status of one participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkerState {
    /// Waiting for a message.
    #[default]
    Idle,
    /// Computing an event.
    Busy,
    /// Received `Stop`; terminal.
    Stopped,
}

/// Errors that end a worker.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Workers only accept `Work` and `Stop`.
    #[error("Worker received unexpected {0} message")]
    UnexpectedMessage(&'static str),

    /// A message arrived after `Stop`.
    #[error("Worker already stopped")]
    Stopped,

    /// The dispatcher's side of the channel went away.
    #[error("Dispatcher channel closed")]
    Disconnected,
}

/// What the runner should do after a message was handled.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Send this message back to the dispatcher and wait for the next one.
    Reply(Message),
    /// Leave the receive loop without replying.
    Exit,
}

/// One participant's receive-compute-report loop.
pub struct WorkerLoop<E> {
    id: WorkerId,
    config: Arc<RunConfig>,
    engine: E,
    state: WorkerState,
    completed: u64,
    finals: u64,
}

impl<E: SimulationEngine> WorkerLoop<E> {
    pub fn new(id: WorkerId, config: Arc<RunConfig>, engine: E) -> Self {
        Self {
            id,
            config,
            engine,
            state: WorkerState::Idle,
            completed: 0,
            finals: 0,
        }
    }

    pub fn id(&self) -> WorkerId {
        self.id
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// Events computed so far.
    pub fn completed(&self) -> u64 {
        self.completed
    }

    /// Final-marked tasks handled so far. At most one per run.
    pub fn finals(&self) -> u64 {
        self.finals
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Run the pre-run diagnostics if this is the first worker.
    pub fn prepare(&mut self) -> Result<(), WorkerError> {
        if self.id == WorkerId::FIRST {
            self.engine
                .emit_diagnostics(&self.config, DiagnosticStage::Setup)?;
        }
        Ok(())
    }

    /// Handle one message from the dispatcher.
    pub fn handle(&mut self, message: Message) -> Result<Step, WorkerError> {
        if self.state == WorkerState::Stopped {
            return Err(WorkerError::Stopped);
        }

        match message {
            Message::Stop => {
                debug!(worker = %self.id, completed = self.completed, "Worker stopping");
                self.state = WorkerState::Stopped;
                Ok(Step::Exit)
            }
            Message::Work(task) => {
                let waveform = self.execute(task)?;
                Ok(Step::Reply(Message::Result {
                    worker: self.id,
                    waveform,
                }))
            }
            other => Err(WorkerError::UnexpectedMessage(other.type_name())),
        }
    }

    /// Simulate one event, plus the end-of-run diagnostics for the final
    /// task.
    pub fn execute(&mut self, task: Task) -> Result<Waveform, WorkerError> {
        self.state = WorkerState::Busy;
        let waveform = self.engine.compute_event(&self.config)?;

        if task.is_final() {
            debug!(worker = %self.id, "Emitting final diagnostics");
            self.engine
                .emit_diagnostics(&self.config, DiagnosticStage::Final)?;
            self.finals += 1;
        }

        self.completed += 1;
        self.state = WorkerState::Idle;
        Ok(waveform)
    }
}
