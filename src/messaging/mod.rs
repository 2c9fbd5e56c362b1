// Messaging - engine change notifications

pub mod channels;
pub mod event;

pub use channels::{EventReceiver, EventSender, create_event_channel};
pub use event::EngineEvent;
