//! Domain events, envelopes, and in-process distribution.
//!
//! Aggregates emit typed events; infrastructure persists them and wraps them
//! in `EventEnvelope`s for projections and bus subscribers.

pub mod bus;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;
pub mod projection;

pub use bus::{EventBus, Subscription};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
pub use projection::Projection;
