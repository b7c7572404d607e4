//! Error types for live frame reception.
//!
//! The taxonomy follows where an error may surface:
//!
//! - **Connect errors** ([`ConnectError`]): malformed endpoint or transport setup
//!   failure. Returned to the caller; the channel stays disconnected and the
//!   attempt can be retried.
//! - **Lifecycle errors** ([`LifecycleError`]): worker misuse such as starting twice.
//!   Returned to the caller.
//! - **Receive errors** ([`ReceiveError`]): transient transport conditions. Absorbed
//!   inside the receive loop and treated as "nothing more this pass".
//! - **Decode errors** ([`DecodeError`]): one malformed message. Absorbed inside the
//!   receive loop, counted and logged; the stream keeps going.
//!
//! [`LiveViewError`] aggregates all of them plus defaults-file failures.
//!
//! ```rust
//! use liveview::{ConnectError, LiveViewError};
//!
//! let error: LiveViewError = ConnectError::invalid_endpoint("localhost:5555", "missing scheme").into();
//! if error.is_retryable() {
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

use crate::worker::WorkerState;

/// Result type alias for live view operations.
pub type Result<T, E = LiveViewError> = std::result::Result<T, E>;

/// Failure to establish a subscription.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ConnectError {
    #[error("Invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("Already connected to {endpoint}")]
    AlreadyConnected { endpoint: String },

    #[error("Transport error during {operation} on '{endpoint}'")]
    Transport {
        endpoint: String,
        operation: &'static str,
        #[source]
        source: zmq::Error,
    },
}

impl ConnectError {
    /// Helper constructor for malformed endpoints.
    pub fn invalid_endpoint(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        ConnectError::InvalidEndpoint { endpoint: endpoint.into(), reason: reason.into() }
    }

    /// Helper constructor for transport failures.
    pub fn transport(endpoint: impl Into<String>, operation: &'static str, source: zmq::Error) -> Self {
        ConnectError::Transport { endpoint: endpoint.into(), operation, source }
    }
}

/// Transient failure while pulling a message off the channel.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ReceiveError {
    #[error("Channel is not connected")]
    NotConnected,

    #[error("No message available")]
    WouldBlock,

    #[error("Expected a 2-part message, got {parts} part(s)")]
    UnexpectedParts { parts: usize },

    #[error("Transport receive failed")]
    Transport(#[source] zmq::Error),
}

impl ReceiveError {
    /// True when a message was actually consumed but its framing was wrong.
    ///
    /// Such messages count as received; every other variant means nothing was
    /// consumed.
    pub fn consumed_message(&self) -> bool {
        matches!(self, ReceiveError::UnexpectedParts { .. })
    }
}

/// Failure to turn a (header, payload) pair into a [`Frame`](crate::Frame).
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum DecodeError {
    #[error("Frame header is not a valid JSON record")]
    Header(#[source] serde_json::Error),

    #[error("Unsupported element type '{tag}'")]
    UnsupportedDType { tag: String },

    #[error("Invalid frame shape: {details}")]
    InvalidShape { details: String },

    #[error("Payload length mismatch: expected {expected} bytes, got {actual}")]
    PayloadLength { expected: usize, actual: usize },
}

impl DecodeError {
    /// Helper constructor for shape errors.
    pub fn invalid_shape(details: impl Into<String>) -> Self {
        DecodeError::InvalidShape { details: details.into() }
    }
}

/// Worker misuse.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum LifecycleError {
    #[error("Cannot {operation} a worker in state {state:?}")]
    InvalidTransition { operation: &'static str, state: WorkerState },

    #[error("Receiver thread panicked")]
    WorkerPanicked,

    #[error("Failed to spawn receiver thread")]
    Spawn(#[source] std::io::Error),
}

/// Main error type for live view operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum LiveViewError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error(transparent)]
    Receive(#[from] ReceiveError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("Failed to encode frame header")]
    Encode(#[source] serde_json::Error),

    #[error("Failed to publish on '{endpoint}'")]
    Publish {
        endpoint: String,
        #[source]
        source: zmq::Error,
    },

    #[error("Defaults file error: {path}")]
    DefaultsIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Defaults file {path} is not valid")]
    DefaultsFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl LiveViewError {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            LiveViewError::Connect(ConnectError::InvalidEndpoint { .. }) => false,
            LiveViewError::Connect(ConnectError::AlreadyConnected { .. }) => false,
            LiveViewError::Connect(ConnectError::Transport { .. }) => true,
            LiveViewError::Lifecycle(_) => false,
            LiveViewError::Receive(_) => true,
            LiveViewError::Decode(_) => false,
            LiveViewError::Encode(_) => false,
            LiveViewError::Publish { .. } => true,
            LiveViewError::DefaultsIo { .. } => true,
            LiveViewError::DefaultsFormat { .. } => false,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            LiveViewError::Connect(ConnectError::InvalidEndpoint { .. }) => vec![
                "Use the form scheme://address, e.g. tcp://127.0.0.1:5020",
                "Check the transport scheme is one libzmq supports",
            ],
            LiveViewError::Connect(ConnectError::AlreadyConnected { .. }) => vec![
                "Stop the running worker before connecting again",
                "Create a new subscription for a second endpoint",
            ],
            LiveViewError::Connect(ConnectError::Transport { .. }) => vec![
                "Retry the connection",
                "Check the host name resolves",
                "Check libzmq was built with the requested transport",
            ],
            LiveViewError::Lifecycle(_) => vec![
                "Construct a new worker to restart streaming",
                "Only start a worker once",
            ],
            LiveViewError::Receive(_) => vec![
                "Wait for the next poll",
                "Check the producer is still publishing",
            ],
            LiveViewError::Decode(_) => vec![
                "Check the producer header contains dtype and shape",
                "Verify payload length matches rows * cols * element size",
            ],
            LiveViewError::Encode(_) => vec![
                "Check extra header keys are plain JSON values",
            ],
            LiveViewError::Publish { .. } => vec![
                "Retry the send",
                "Check the publisher socket is still bound",
            ],
            LiveViewError::DefaultsIo { .. } => vec![
                "Check the configuration directory exists and is writable",
                "Check file permissions",
            ],
            LiveViewError::DefaultsFormat { .. } => vec![
                "Fix or delete the defaults file so it is recreated",
            ],
        }
    }

    /// Helper constructor for defaults-file I/O errors.
    pub fn defaults_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LiveViewError::DefaultsIo { path: path.into(), source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn error_messages_format_correctly_with_arbitrary_context(
                endpoint in ".*",
                reason in ".*",
                tag in "\\w+",
                expected in 0usize..1_000_000,
                actual in 0usize..1_000_000,
            ) {
                let connect = ConnectError::invalid_endpoint(endpoint.clone(), reason.clone());
                let dtype = DecodeError::UnsupportedDType { tag: tag.clone() };
                let length = DecodeError::PayloadLength { expected, actual };

                let connect_msg = connect.to_string();
                prop_assert!(connect_msg.contains(&endpoint));
                prop_assert!(connect_msg.contains(&reason));
                prop_assert!(dtype.to_string().contains(&tag));

                let length_msg = length.to_string();
                prop_assert!(length_msg.contains(&expected.to_string()));
                prop_assert!(length_msg.contains(&actual.to_string()));
            }
        }
    }

    #[test]
    fn error_traits_validation() {
        fn assert_send_sync_static<T: Send + Sync + 'static>() {}
        assert_send_sync_static::<LiveViewError>();
        assert_send_sync_static::<DecodeError>();
        assert_send_sync_static::<ReceiveError>();

        let error: LiveViewError = LifecycleError::WorkerPanicked.into();
        let _: &dyn std::error::Error = &error;
    }

    #[test]
    fn transport_error_keeps_source() {
        let error = ConnectError::transport("tcp://host:1", "connect", zmq::Error::EINVAL);
        let source = std::error::Error::source(&error).expect("source should be kept");
        assert_eq!(source.to_string(), zmq::Error::EINVAL.to_string());
    }

    #[test]
    fn recovery_methods_work() {
        let invalid: LiveViewError = ConnectError::invalid_endpoint("x", "no scheme").into();
        let transport: LiveViewError =
            ConnectError::transport("tcp://x:1", "connect", zmq::Error::EINVAL).into();
        let lifecycle: LiveViewError = LifecycleError::InvalidTransition {
            operation: "start",
            state: WorkerState::Running,
        }
        .into();

        assert!(!invalid.is_retryable());
        assert!(transport.is_retryable());
        assert!(!lifecycle.is_retryable());

        for error in [&invalid, &transport, &lifecycle] {
            let suggestions = error.recovery_suggestions();
            assert!(!suggestions.is_empty());
            assert!(suggestions.iter().all(|s| s.len() > 5));
        }
    }

    #[test]
    fn only_framing_errors_consume_messages() {
        assert!(ReceiveError::UnexpectedParts { parts: 3 }.consumed_message());
        assert!(!ReceiveError::WouldBlock.consumed_message());
        assert!(!ReceiveError::NotConnected.consumed_message());
        assert!(!ReceiveError::Transport(zmq::Error::ETERM).consumed_message());
    }
}
