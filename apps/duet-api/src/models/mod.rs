pub mod chat_event;
pub mod queue_entry;
pub mod room;
