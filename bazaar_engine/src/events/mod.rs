//! Stateless pub-sub hooks for order events.
//!
//! Handlers receive a copy of the event and nothing else, so they cannot affect the flow that raised it. The server
//! uses them for logging, and they are the natural place to hook in push notifications or analytics.
mod channel;
mod event_types;
mod hooks;

pub use channel::{EventHandler, EventProducer, Handler};
pub use event_types::*;
pub use hooks::{EventHandlers, EventHooks, EventProducers};
