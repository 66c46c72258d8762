//! Master-side dispatch state machine.
//!
//! # Phases
//!
//! ```text
//! Fanout ──▶ Dispatching ──▶ Draining ──▶ Done
//! ```
//!
//! - **Fanout**: every worker whose identity is in `[1, n_events]` gets one
//!   task; any other worker is stopped straight away and never counts as
//!   active.
//! - **Dispatching**: each result is merged, then the same worker gets the
//!   next task.
//! - **Draining**: all `n_events` tasks are out; every further result is
//!   answered with `Stop`.
//! - **Done**: the last active worker stopped. The runner persists the
//!   aggregates.
//!
//! # Final marker
//!
//! The fan-out counts toward `dispatched`. The task sent while
//! `dispatched == n_events - 1` is the run's last one and carries the final
//! marker, whichever worker it goes to. Results are handled one per
//! [`StateMachine::handle`] call, so the assignment is fixed by arrival
//! order.

use crate::{Accumulator, WorkerState};
use arbuckle_core::{AbortReason, Action, Event, StateMachine};
use arbuckle_messages::Message;
use arbuckle_types::{Waveform, WorkerId};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Completions between progress lines.
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 50;

/// Dispatcher phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Fanout,
    Dispatching,
    Draining,
    Done,
}

/// Coordinates a fixed pool of workers over one run.
pub struct Dispatcher {
    /// Events to simulate in total.
    n_events: u64,

    /// Tasks sent so far, fan-out included.
    dispatched: u64,

    /// Results merged so far.
    completed: u64,

    /// Workers that have not been sent `Stop`.
    active: usize,

    /// The dispatcher's view of each worker.
    workers: BTreeMap<WorkerId, WorkerState>,

    /// Number of tasks each worker completed.
    completions: BTreeMap<WorkerId, u64>,

    /// Worker that received the final marker.
    final_recipient: Option<WorkerId>,

    accumulator: Accumulator,

    phase: Phase,

    progress_interval: u64,
}

impl Dispatcher {
    /// Create a dispatcher for `workers`, expecting waveforms of `n_bins`
    /// samples.
    pub fn new(n_events: u64, n_bins: usize, workers: impl IntoIterator<Item = WorkerId>) -> Self {
        let workers: BTreeMap<WorkerId, WorkerState> = workers
            .into_iter()
            .map(|id| (id, WorkerState::Idle))
            .collect();
        let completions = workers.keys().map(|id| (*id, 0)).collect();

        Self {
            n_events,
            dispatched: 0,
            completed: 0,
            active: 0,
            workers,
            completions,
            final_recipient: None,
            accumulator: Accumulator::new(n_bins, n_events),
            phase: Phase::Fanout,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }

    /// Set how many completions pass between progress lines.
    pub fn with_progress_interval(mut self, interval: u64) -> Self {
        self.progress_interval = interval.max(1);
        self
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Accessors
    // ═══════════════════════════════════════════════════════════════════════

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn n_events(&self) -> u64 {
        self.n_events
    }

    pub fn dispatched(&self) -> u64 {
        self.dispatched
    }

    pub fn completed(&self) -> u64 {
        self.completed
    }

    pub fn active_workers(&self) -> usize {
        self.active
    }

    pub fn worker_state(&self, id: WorkerId) -> Option<WorkerState> {
        self.workers.get(&id).copied()
    }

    /// Workers that have been sent `Stop`.
    pub fn stopped_workers(&self) -> impl Iterator<Item = WorkerId> + '_ {
        self.workers
            .iter()
            .filter(|(_, state)| **state == WorkerState::Stopped)
            .map(|(id, _)| *id)
    }

    /// Workers that have not been sent `Stop`.
    pub fn live_workers(&self) -> impl Iterator<Item = WorkerId> + '_ {
        self.workers
            .iter()
            .filter(|(_, state)| **state != WorkerState::Stopped)
            .map(|(id, _)| *id)
    }

    pub fn completions(&self) -> &BTreeMap<WorkerId, u64> {
        &self.completions
    }

    pub fn final_recipient(&self) -> Option<WorkerId> {
        self.final_recipient
    }

    pub fn accumulator(&self) -> &Accumulator {
        &self.accumulator
    }

    pub fn into_accumulator(self) -> Accumulator {
        self.accumulator
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Transitions
    // ═══════════════════════════════════════════════════════════════════════

    /// Send each eligible worker its first task and stop the rest.
    pub fn on_start(&mut self) -> Vec<Action> {
        if self.phase != Phase::Fanout {
            warn!(phase = ?self.phase, "Ignoring start outside fan-out");
            return vec![];
        }

        if self.workers.is_empty() && self.n_events > 0 {
            warn!(n_events = self.n_events, "No workers to dispatch to");
        }

        let ids: Vec<WorkerId> = self.workers.keys().copied().collect();
        let mut actions = Vec::with_capacity(ids.len());

        for id in ids {
            if (1..=self.n_events).contains(&(id.get() as u64)) {
                self.active += 1;
                actions.push(self.assign(id));
            } else {
                self.workers.insert(id, WorkerState::Stopped);
                actions.push(Action::Send {
                    to: id,
                    message: Message::Stop,
                });
            }
        }

        info!(
            n_events = self.n_events,
            workers = self.workers.len(),
            active = self.active,
            "Fan-out complete"
        );

        if self.phase == Phase::Fanout {
            self.phase = Phase::Dispatching;
        }
        if self.active == 0 {
            actions.extend(self.finish());
        }
        actions
    }

    /// Merge a worker's result and decide its next message.
    pub fn on_result(&mut self, from: WorkerId, waveform: Waveform) -> Vec<Action> {
        if self.workers.get(&from) != Some(&WorkerState::Busy) {
            warn!(worker = %from, phase = ?self.phase, "Result from worker without a task");
            return self.abort(AbortReason::UnexpectedResult(from));
        }

        if let Err(e) = self.accumulator.merge(&waveform) {
            warn!(worker = %from, error = %e, "Rejecting waveform");
            return self.abort(AbortReason::WaveformLength {
                worker: from,
                expected: self.accumulator.n_bins(),
                found: waveform.len(),
            });
        }

        self.completed += 1;
        *self.completions.entry(from).or_default() += 1;
        self.workers.insert(from, WorkerState::Idle);

        if self.completed % self.progress_interval == 0 {
            info!("{} of {} events complete", self.completed, self.n_events);
        }

        if self.dispatched < self.n_events {
            return vec![self.assign(from)];
        }

        self.workers.insert(from, WorkerState::Stopped);
        self.active -= 1;
        debug!(worker = %from, active = self.active, "Stopping worker");

        let mut actions = vec![Action::Send {
            to: from,
            message: Message::Stop,
        }];
        if self.active == 0 {
            actions.extend(self.finish());
        }
        actions
    }

    /// Hand the next task to `id`.
    fn assign(&mut self, id: WorkerId) -> Action {
        let final_event = self.dispatched + 1 == self.n_events;
        self.dispatched += 1;
        self.workers.insert(id, WorkerState::Busy);

        if final_event {
            debug!(worker = %id, "Final task assigned");
            self.final_recipient = Some(id);
        }
        if self.dispatched == self.n_events {
            self.phase = Phase::Draining;
        }

        Action::Send {
            to: id,
            message: Message::work(final_event),
        }
    }

    fn finish(&mut self) -> Vec<Action> {
        self.phase = Phase::Done;
        info!(
            completed = self.completed,
            n_events = self.n_events,
            "All workers stopped"
        );
        vec![Action::Persist]
    }

    fn abort(&mut self, reason: AbortReason) -> Vec<Action> {
        self.phase = Phase::Done;
        vec![Action::Abort(reason)]
    }
}

impl StateMachine for Dispatcher {
    fn handle(&mut self, event: Event) -> Vec<Action> {
        let name = event.type_name();
        let actions = match event {
            Event::Start => self.on_start(),
            Event::ResultReceived { from, waveform } => self.on_result(from, waveform),
        };
        debug!(
            event = name,
            actions = ?actions.iter().map(Action::type_name).collect::<Vec<_>>(),
            "Handled event"
        );
        actions
    }

    fn is_done(&self) -> bool {
        self.phase == Phase::Done
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;
    use tracing_test::traced_test;

    const BINS: usize = 4;

    fn workers(n: u32) -> impl Iterator<Item = WorkerId> {
        (1..=n).map(WorkerId)
    }

    fn waveform(value: f64) -> Waveform {
        vec![value; BINS]
    }

    fn sends(actions: &[Action]) -> Vec<(WorkerId, Message)> {
        actions
            .iter()
            .filter_map(|a| match a {
                Action::Send { to, message } => Some((*to, message.clone())),
                _ => None,
            })
            .collect()
    }

    fn result(from: u32, value: f64) -> Event {
        Event::ResultReceived {
            from: WorkerId(from),
            waveform: waveform(value),
        }
    }

    #[traced_test]
    #[test]
    fn test_two_workers_three_events() {
        let mut d = Dispatcher::new(3, BINS, workers(2));

        let actions = d.handle(Event::Start);
        assert_eq!(
            sends(&actions),
            vec![
                (WorkerId(1), Message::work(false)),
                (WorkerId(2), Message::work(false)),
            ]
        );
        assert_eq!(d.dispatched(), 2);
        assert_eq!(d.active_workers(), 2);
        assert_eq!(d.phase(), Phase::Dispatching);

        // First completion receives the last task of the run.
        let actions = d.handle(result(1, 1.0));
        assert_eq!(sends(&actions), vec![(WorkerId(1), Message::work(true))]);
        assert_eq!(d.phase(), Phase::Draining);
        assert_eq!(d.final_recipient(), Some(WorkerId(1)));

        let actions = d.handle(result(2, 2.0));
        assert_eq!(sends(&actions), vec![(WorkerId(2), Message::Stop)]);
        assert_eq!(d.active_workers(), 1);
        assert!(!d.is_done());

        let actions = d.handle(result(1, 3.0));
        assert_eq!(sends(&actions), vec![(WorkerId(1), Message::Stop)]);
        assert!(actions.contains(&Action::Persist));
        assert!(d.is_done());
        assert_eq!(d.active_workers(), 0);

        let acc = d.accumulator();
        assert_eq!(acc.histogram().len(), 3);
        assert_eq!(acc.sum_waveform(), &[6.0; BINS]);
        assert_eq!(acc.mean_waveform(), vec![2.0; BINS]);
        assert_eq!(d.completions()[&WorkerId(1)], 2);
        assert_eq!(d.completions()[&WorkerId(2)], 1);
        assert!(logs_contain("All workers stopped"));
    }

    #[test]
    fn test_zero_events_stops_everyone() {
        let mut d = Dispatcher::new(0, BINS, workers(3));
        let actions = d.handle(Event::Start);

        assert_eq!(
            sends(&actions),
            vec![
                (WorkerId(1), Message::Stop),
                (WorkerId(2), Message::Stop),
                (WorkerId(3), Message::Stop),
            ]
        );
        assert_eq!(actions.last(), Some(&Action::Persist));
        assert!(d.is_done());
        assert_eq!(d.dispatched(), 0);
        assert_eq!(d.final_recipient(), None);
        assert!(d.accumulator().histogram().is_empty());
    }

    #[test]
    fn test_surplus_workers_stopped_at_fanout() {
        let mut d = Dispatcher::new(2, BINS, workers(4));
        let actions = d.handle(Event::Start);

        assert_eq!(
            sends(&actions),
            vec![
                (WorkerId(1), Message::work(false)),
                (WorkerId(2), Message::work(true)),
                (WorkerId(3), Message::Stop),
                (WorkerId(4), Message::Stop),
            ]
        );
        assert_eq!(d.active_workers(), 2);
        assert_eq!(d.phase(), Phase::Draining);
        assert_eq!(d.stopped_workers().count(), 2);

        d.handle(result(2, 1.0));
        let actions = d.handle(result(1, 1.0));
        assert!(actions.contains(&Action::Persist));
        assert!(d.is_done());
    }

    #[test]
    fn test_single_worker_gets_final_last() {
        let mut d = Dispatcher::new(5, BINS, workers(1));
        let mut messages = sends(&d.handle(Event::Start));

        while !d.is_done() {
            messages.extend(sends(&d.handle(result(1, 1.0))));
        }

        let finals: Vec<usize> = messages
            .iter()
            .enumerate()
            .filter(|(_, (_, m))| m.task().is_some_and(|t| t.is_final()))
            .map(|(i, _)| i)
            .collect();
        // Five tasks then a stop; only the fifth task is final.
        assert_eq!(messages.len(), 6);
        assert_eq!(finals, vec![4]);
        assert_eq!(messages[5].1, Message::Stop);
    }

    #[test]
    fn test_random_arrival_orders() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);

        for n_events in [1u64, 2, 7, 50, 123] {
            for n_workers in [1u32, 2, 3, 8, 200] {
                let mut d = Dispatcher::new(n_events, BINS, workers(n_workers));
                let mut in_flight: Vec<WorkerId> = vec![];
                let mut work_sent = 0u64;
                let mut finals = 0u64;
                let mut value = 0.0;

                let mut record = |actions: Vec<Action>, in_flight: &mut Vec<WorkerId>| {
                    for (to, message) in sends(&actions) {
                        if let Some(task) = message.task() {
                            work_sent += 1;
                            if task.is_final() {
                                finals += 1;
                                // The final task is the last one out.
                                assert_eq!(work_sent, n_events);
                            }
                            in_flight.push(to);
                        }
                    }
                };

                record(d.handle(Event::Start), &mut in_flight);
                while !in_flight.is_empty() {
                    let pos = rng.gen_range(0..in_flight.len());
                    let from = in_flight.swap_remove(pos);
                    value += 1.0;
                    let actions = d.handle(Event::ResultReceived {
                        from,
                        waveform: waveform(value),
                    });
                    record(actions, &mut in_flight);
                }

                assert_eq!(work_sent, n_events);
                assert_eq!(finals, 1);
                assert!(d.is_done());
                assert_eq!(d.accumulator().histogram().len() as u64, n_events);
                let expected = (n_events * (n_events + 1) / 2) as f64;
                assert_eq!(d.accumulator().sum_waveform(), &vec![expected; BINS][..]);
            }
        }
    }

    #[test]
    fn test_wrong_length_aborts() {
        let mut d = Dispatcher::new(2, BINS, workers(1));
        d.handle(Event::Start);

        let actions = d.handle(Event::ResultReceived {
            from: WorkerId(1),
            waveform: vec![1.0; BINS + 1],
        });
        assert_eq!(
            actions,
            vec![Action::Abort(AbortReason::WaveformLength {
                worker: WorkerId(1),
                expected: BINS,
                found: BINS + 1,
            })]
        );
        assert!(d.is_done());
    }

    #[test]
    fn test_result_from_idle_worker_aborts() {
        let mut d = Dispatcher::new(1, BINS, workers(2));
        d.handle(Event::Start);

        // Worker 2 was stopped at fan-out.
        let actions = d.handle(result(2, 1.0));
        assert_eq!(
            actions,
            vec![Action::Abort(AbortReason::UnexpectedResult(WorkerId(2)))]
        );
    }

    #[traced_test]
    #[test]
    fn test_progress_lines() {
        let mut d = Dispatcher::new(4, BINS, workers(1)).with_progress_interval(2);
        d.handle(Event::Start);
        while !d.is_done() {
            d.handle(result(1, 0.5));
        }
        assert!(logs_contain("2 of 4 events complete"));
        assert!(logs_contain("4 of 4 events complete"));
    }

    #[traced_test]
    #[test]
    fn test_handled_events_logged() {
        let mut d = Dispatcher::new(1, BINS, workers(1));
        d.handle(Event::Start);
        d.handle(result(1, 1.0));
        assert!(logs_contain("Handled event"));
        assert!(logs_contain("ResultReceived"));
        assert!(logs_contain("Persist"));
    }

    #[test]
    fn test_start_is_not_repeated() {
        let mut d = Dispatcher::new(3, BINS, workers(2));
        d.handle(Event::Start);
        assert!(d.handle(Event::Start).is_empty());
        assert_eq!(d.dispatched(), 2);
    }
}
