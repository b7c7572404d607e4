//! Subscription channel implementations.

pub mod memory;
pub mod zmq;

pub use self::memory::{MemoryPublisher, MemorySubscription};
pub use self::zmq::ZmqSubscription;
