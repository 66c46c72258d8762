//! Tagged messages exchanged over participant channels.

use crate::Task;
use arbuckle_types::{Waveform, WorkerId};
use serde::{Deserialize, Serialize};

/// Messages between the dispatcher and a worker.
///
/// `Work` and `Stop` flow from the dispatcher to a worker; `Result` flows
/// back. At most one message is in flight per participant in each
/// direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Message {
    /// Simulate one event.
    Work(Task),

    /// Leave the receive loop. Never answered.
    Stop,

    /// One event's waveform, reported by the worker that computed it.
    Result {
        worker: WorkerId,
        waveform: Waveform,
    },
}

impl Message {
    /// A normal or final work message.
    pub fn work(final_event: bool) -> Self {
        Message::Work(Task { final_event })
    }

    /// Get a human-readable name for this message type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Message::Work(task) if task.final_event => "Work(final)",
            Message::Work(_) => "Work",
            Message::Stop => "Stop",
            Message::Result { .. } => "Result",
        }
    }

    /// Check if this message travels from the dispatcher to a worker.
    pub fn is_command(&self) -> bool {
        matches!(self, Message::Work(_) | Message::Stop)
    }

    /// Check if this message carries a worker's result.
    pub fn is_result(&self) -> bool {
        matches!(self, Message::Result { .. })
    }

    /// The task, for work messages.
    pub fn task(&self) -> Option<Task> {
        match self {
            Message::Work(task) => Some(*task),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_names() {
        assert_eq!(Message::work(false).type_name(), "Work");
        assert_eq!(Message::work(true).type_name(), "Work(final)");
        assert_eq!(Message::Stop.type_name(), "Stop");
        let result = Message::Result {
            worker: WorkerId(2),
            waveform: vec![1.0, 2.0],
        };
        assert_eq!(result.type_name(), "Result");
    }

    #[test]
    fn test_direction() {
        assert!(Message::work(false).is_command());
        assert!(Message::Stop.is_command());
        let result = Message::Result {
            worker: WorkerId(1),
            waveform: vec![],
        };
        assert!(result.is_result());
        assert!(!result.is_command());
    }

    #[test]
    fn test_task_accessor() {
        assert_eq!(Message::work(true).task(), Some(Task { final_event: true }));
        assert_eq!(Message::work(false).task(), Some(Task::default()));
        assert_eq!(Message::Stop.task(), None);
    }
}
