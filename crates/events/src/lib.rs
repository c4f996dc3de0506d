//! Domain & integration events.
//!
//! - [`Event`]: contract implemented by domain event enums.
//! - [`Message`]: integration message envelope exchanged over topics.
//! - [`Publisher`] / [`Subscriber`]: async pub/sub abstraction, with an
//!   in-memory implementation for tests/dev.

pub mod bus;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBusError, Publisher, Subscriber, Subscription};
pub use envelope::Message;
pub use event::Event;
pub use in_memory_bus::InMemoryEventBus;
