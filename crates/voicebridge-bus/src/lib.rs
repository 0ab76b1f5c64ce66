//! Control bus adapter: publish/subscribe signalling for call transfers and
//! call-lifecycle events, consumed by whatever runs outside this process.
//!
//! - [`adapter`]: the [`ControlBusAdapter`] trait and its redis-backed
//!   implementation
//! - [`events`]: the JSON event schemas published onto the bus

pub mod adapter;
pub mod events;

pub use adapter::{publish_with_retry, BusHandler, ControlBusAdapter, RedisBusAdapter};
pub use events::{CallEndedEvent, CallFailedEvent, TransferEvent, CHANNEL_AIVA_CALL};
