//! Real-time event delivery: topics, the in-process fan-out hub, and the
//! WebSocket gateway that exposes it.

pub mod events;
pub mod fanout;
pub mod server;
pub mod session;
pub mod topic;

pub use fanout::{EventHub, EventPublisher, PublishError};
pub use topic::Topic;
