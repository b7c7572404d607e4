//! Live 2-D frame receiver for publish/subscribe image streams.
//!
//! A producer (detector, camera pipeline, simulation) publishes frames over
//! ZeroMQ as two-part messages: a JSON header with `dtype` and `shape`, then the
//! raw row-major payload. This crate subscribes, drains the socket on every pass,
//! decodes each message and hands only the newest frame to a consumer. A slow
//! display sees the current state, never a backlog.
//!
//! # Features
//!
//! - **Latest-wins delivery**: bursts are counted, then collapsed to the newest frame
//! - **Safe decoding**: ten numeric element types, byte-order aware, no `unsafe`
//! - **Deterministic shutdown**: stop latency is one receive plus one decode
//! - **Counters**: frames received, emitted, rejected and loop iterations
//!
//! ## Example
//!
//! ```rust,no_run
//! use liveview::{LiveView, UpdateRate, watch_channel};
//! use futures::StreamExt;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> liveview::Result<()> {
//!     let mut worker = LiveView::connect("tcp://127.0.0.1:5020")?;
//!     let (sink, watch) = watch_channel();
//!     worker.start(sink)?;
//!
//!     let mut frames = watch.stream(UpdateRate::Max(5)).take(10);
//!     while let Some(frame) = frames.next().await {
//!         println!("{:?} {} range={:?}", frame.shape(), frame.dtype(), frame.min_max());
//!     }
//!
//!     let counters = worker.await_stopped()?;
//!     println!("{}", counters);
//!     Ok(())
//! }
//! ```

// Core types and error handling
pub mod codec;
pub mod config;
pub mod counters;
mod error;
pub mod logging;
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Receive pipeline
pub mod publisher;
pub mod receiver;
pub mod sink;
pub mod stream;
pub mod subscription;
pub mod subscriptions;
pub mod worker;

// Core exports
pub use error::*;
pub use types::*;

pub use codec::{RawMessage, decode_frame, encode_frame};
pub use config::{EndpointDefaults, ReceiverConfig};
pub use counters::{CounterSnapshot, Counters};
pub use logging::init_logging;
pub use publisher::FramePublisher;
pub use receiver::{Drain, FrameReceiver};
pub use sink::{FrameSink, FrameStream, FrameWatch, WatchSink, watch_channel, watch_channel_for};
pub use subscription::{Endpoint, Subscription, SubscriptionState};
pub use subscriptions::{MemoryPublisher, MemorySubscription, ZmqSubscription};
pub use worker::{Worker, WorkerState};

/// Entry point for live view connections.
///
/// Connecting never waits for a producer: a subscriber may come up before the
/// publisher does and will start receiving once it appears.
///
/// ```rust,no_run
/// use liveview::{LiveView, WorkerState};
///
/// # fn main() -> liveview::Result<()> {
/// let mut worker = LiveView::connect("tcp://127.0.0.1:5020")?;
/// assert_eq!(worker.state(), WorkerState::Idle);
///
/// worker.start(|frame: Option<liveview::Frame>| {
///     if let Some(frame) = frame {
///         println!("{:?}", frame.shape());
///     }
/// })?;
/// # Ok(())
/// # }
/// ```
pub struct LiveView;

impl LiveView {
    /// Subscribe to `endpoint` with the default [`ReceiverConfig`].
    ///
    /// Returns an idle [`Worker`] owning the connected subscription.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectError`] if the endpoint is malformed or the transport
    /// cannot be set up. Nothing is left connected in that case.
    pub fn connect(endpoint: &str) -> std::result::Result<Worker<ZmqSubscription>, ConnectError> {
        Self::connect_with(endpoint, &ReceiverConfig::default())
    }

    /// Subscribe to `endpoint` with an explicit configuration.
    pub fn connect_with(
        endpoint: &str,
        config: &ReceiverConfig,
    ) -> std::result::Result<Worker<ZmqSubscription>, ConnectError> {
        let subscription = ZmqSubscription::connect_to(endpoint, config)?;
        Ok(Worker::new(subscription, config))
    }
}
