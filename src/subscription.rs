//! Subscription channel trait for frame sources

use crate::{ConnectError, ReceiveError};

pub use crate::codec::RawMessage;

/// Transport schemes libzmq understands.
const KNOWN_SCHEMES: &[&str] =
    &["tcp", "ipc", "inproc", "pgm", "epgm", "udp", "ws", "wss", "tipc", "vmci"];

/// Connection state of a subscription channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    Disconnected,
    Connected,
}

/// Trait for publish/subscribe frame sources
///
/// A subscription owns one inbound channel. The receive loop drives it with a
/// simple contract: ask `has_pending()` without blocking, and only then call
/// `receive_one()`. `receive_one()` must not hang if the pending message was
/// already gone; it returns [`ReceiveError::WouldBlock`] instead.
///
/// Implementations:
/// - [`ZmqSubscription`](crate::subscriptions::zmq::ZmqSubscription): ZeroMQ `SUB` socket
/// - [`MemorySubscription`](crate::subscriptions::memory::MemorySubscription): in-process queue
pub trait Subscription: Send + 'static {
    /// Subscribe to all topics on `endpoint`.
    ///
    /// A producer does not need to exist yet. Fails on a malformed endpoint or a
    /// transport setup error, leaving the channel disconnected.
    fn connect(&mut self, endpoint: &str) -> Result<(), ConnectError>;

    /// Current connection state
    fn state(&self) -> SubscriptionState;

    /// True if at least one inbound message is queued. Never blocks.
    fn has_pending(&mut self) -> bool;

    /// Take exactly one two-part message.
    fn receive_one(&mut self) -> Result<RawMessage, ReceiveError>;

    /// Unsubscribe and release the transport. No-op when already disconnected.
    fn disconnect(&mut self);

    /// Endpoint of the current or most recent connection
    fn endpoint(&self) -> Option<&str>;

    fn is_connected(&self) -> bool {
        self.state() == SubscriptionState::Connected
    }
}

/// A validated `scheme://address` endpoint string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    raw: String,
    scheme_len: usize,
}

impl Endpoint {
    /// Validate an endpoint string without touching the transport.
    pub fn parse(endpoint: &str) -> Result<Self, ConnectError> {
        let trimmed = endpoint.trim();
        let Some((scheme, address)) = trimmed.split_once("://") else {
            return Err(ConnectError::invalid_endpoint(endpoint, "expected scheme://address"));
        };

        if !KNOWN_SCHEMES.contains(&scheme) {
            return Err(ConnectError::invalid_endpoint(
                endpoint,
                format!("unsupported transport '{}'", scheme),
            ));
        }

        if address.is_empty() {
            return Err(ConnectError::invalid_endpoint(endpoint, "missing address"));
        }

        Ok(Self { raw: trimmed.to_string(), scheme_len: scheme.len() })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn scheme(&self) -> &str {
        &self.raw[..self.scheme_len]
    }

    pub fn address(&self) -> &str {
        &self.raw[self.scheme_len + 3..]
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}
