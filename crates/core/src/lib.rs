//! Core types for Arbuckle dispatch.
//!
//! This crate provides the foundational types for the dispatcher:
//!
//! - [`Event`]: All possible inputs to the state machine
//! - [`Action`]: All possible outputs from the state machine
//! - [`StateMachine`]: The trait that the dispatcher implements
//!
//! # Architecture
//!
//! ```text
//! Events → StateMachine::handle() → Actions
//! ```
//!
//! All channel I/O is handled by the runner (direct or distributed) which:
//! 1. Delivers events to the state machine
//! 2. Executes the returned actions
//! 3. Converts worker results back into events

mod action;
mod event;
mod traits;

pub use action::{AbortReason, Action};
pub use event::Event;
pub use traits::StateMachine;
