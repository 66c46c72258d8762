//! Messages for the dispatch protocol.
//!
//! Each participant owns one inbound and one outbound channel; both carry
//! [`Message`].

mod message;
mod task;

pub use message::Message;
pub use task::Task;
