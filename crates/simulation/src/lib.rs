//! Run orchestration.
//!
//! A run computes `n_events` independent events and folds their waveforms
//! into one [`Accumulator`](arbuckle_dispatch::Accumulator). The pool size
//! picks the strategy:
//!
//! - [`Direct`]: a pool of one. The coordinator computes every event itself.
//! - [`Distributed`]: a coordinator thread running the
//!   [`Dispatcher`](arbuckle_dispatch::Dispatcher) plus one thread per
//!   worker, joined by channels.
//!
//! Both return a [`RunReport`]; [`persist`] writes its aggregates through a
//! [`PersistenceSink`](arbuckle_output::PersistenceSink).
//!
//! # Example
//!
//! ```ignore
//! use arbuckle_engine::SyntheticEngineFactory;
//! use arbuckle_output::NpySink;
//! use arbuckle_simulation::{persist, select_strategy, DEFAULT_POLL_INTERVAL};
//!
//! let strategy = select_strategy(4, DEFAULT_POLL_INTERVAL);
//! let mut report = strategy.run(config.clone(), &SyntheticEngineFactory)?;
//! persist(&mut report, &config.outputs, &mut NpySink::new("Outputs"))?;
//! ```

mod error;
mod persist;
mod pool;
mod report;
mod strategy;

pub use error::RunError;
pub use persist::persist;
pub use report::RunReport;
pub use strategy::{select_strategy, Direct, DispatchStrategy, Distributed, DEFAULT_POLL_INTERVAL};
