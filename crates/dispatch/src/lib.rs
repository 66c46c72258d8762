//! Dispatch protocol state machines.
//!
//! - [`Dispatcher`]: the coordinator. Fans out tasks, merges results,
//!   assigns the single final task, and stops every worker.
//! - [`WorkerLoop`]: one participant. Computes an event per `Work`, reports
//!   the waveform, exits on `Stop`.
//! - [`Accumulator`]: order-independent sum, mean, and per-event histogram.
//!
//! Neither machine touches a channel; the runners in `arbuckle-simulation`
//! deliver messages and perform the returned actions.

mod accumulator;
mod dispatcher;
mod worker;

pub use accumulator::{Accumulator, AccumulatorError};
pub use dispatcher::{Dispatcher, Phase, DEFAULT_PROGRESS_INTERVAL};
pub use worker::{Step, WorkerError, WorkerLoop, WorkerState};
