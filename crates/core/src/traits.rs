//! Core traits for state machines.

use crate::{Action, Event};

/// A state machine that processes events.
///
/// The dispatcher is written as a state machine that is:
///
/// - **Synchronous**: No async, no `.await`
/// - **Deterministic**: Same state + event = same actions
/// - **Pure-ish**: Mutates self, but performs no I/O
///
/// The runner owns the channels. It delivers events, performs the returned
/// actions, and turns incoming messages back into events.
///
/// # Example
///
/// ```ignore
/// let mut actions = dispatcher.handle(Event::Start);
/// while !dispatcher.is_done() {
///     if let Ok(Message::Result { worker, waveform }) = results.try_recv() {
///         actions.extend(dispatcher.handle(Event::ResultReceived { from: worker, waveform }));
///     }
///     for action in actions.drain(..) {
///         runner.perform(action)?;
///     }
/// }
/// ```
pub trait StateMachine {
    /// Process an event, returning actions to perform.
    ///
    /// # Guarantees
    ///
    /// - **Synchronous**: This method never blocks or awaits
    /// - **Deterministic**: Given the same state and event, always returns the same actions
    /// - **No I/O**: All I/O is performed by the runner via the returned actions
    fn handle(&mut self, event: Event) -> Vec<Action>;

    /// Whether the machine has reached its terminal state.
    fn is_done(&self) -> bool;
}
