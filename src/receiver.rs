//! Frame receiver: the drain / decode / emit loop
//!
//! Each iteration drains everything the channel has queued, decodes every
//! message, keeps only the newest good frame and emits it (or `None`) to the
//! sink. Then it idles for the configured delay. Under burst load older frames
//! are counted and dropped; the consumer always sees the freshest state.

use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::config::ReceiverConfig;
use crate::counters::Counters;
use crate::sink::FrameSink;
use crate::subscription::Subscription;
use crate::types::Frame;
use crate::ReceiveError;

/// Outcome of one drain pass.
#[derive(Debug)]
pub enum Drain {
    /// Channel had nothing more; carries the newest decoded frame, if any
    Complete(Option<Frame>),

    /// Cancellation was observed mid-drain; nothing must be emitted
    Cancelled,

    /// The channel reported it is no longer connected before any frame decoded
    Disconnected,
}

/// Owns a subscription for the duration of the receive loop.
pub struct FrameReceiver<S: Subscription> {
    subscription: S,
    counters: Arc<Counters>,
    idle_delay: Duration,
}

impl<S: Subscription> FrameReceiver<S> {
    pub fn new(subscription: S, config: &ReceiverConfig) -> Self {
        Self { subscription, counters: Arc::new(Counters::new()), idle_delay: config.idle_delay }
    }

    /// Shared handle to the loop's counters
    pub fn counters(&self) -> Arc<Counters> {
        self.counters.clone()
    }

    pub fn subscription(&self) -> &S {
        &self.subscription
    }

    /// Hand the channel back, e.g. for teardown.
    pub fn into_subscription(self) -> S {
        self.subscription
    }

    /// Drain every pending message once, without emitting.
    pub fn poll_once(&mut self, cancel: &CancellationToken) -> Drain {
        let mut latest = None;
        let mut drained = 0u32;

        while self.subscription.has_pending() {
            if cancel.is_cancelled() {
                debug!(drained, "Cancelled during drain");
                return Drain::Cancelled;
            }

            match self.subscription.receive_one() {
                Ok(message) => {
                    drained += 1;
                    self.counters.record_received();

                    match message.decode() {
                        Ok(frame) => {
                            trace!(shape = ?frame.shape(), dtype = %frame.dtype(), "Decoded frame");
                            // Latest wins; anything earlier in this batch is dropped
                            latest = Some(frame);
                        }
                        Err(e) => {
                            self.counters.record_decode_error();
                            warn!("Dropping undecodable frame: {}", e);
                        }
                    }
                }
                Err(e) if e.consumed_message() => {
                    drained += 1;
                    self.counters.record_received();
                    self.counters.record_decode_error();
                    warn!("Dropping malformed message: {}", e);
                }
                Err(ReceiveError::NotConnected) if latest.is_none() => return Drain::Disconnected,
                Err(ReceiveError::NotConnected) => {
                    // Keep what this pass decoded; the next connection check ends the loop
                    debug!("Channel dropped mid-drain");
                    break;
                }
                Err(ReceiveError::WouldBlock) => break,
                Err(e) => {
                    debug!("Receive failed, ending this pass: {}", e);
                    break;
                }
            }
        }

        self.counters.record_poll();
        if drained > 0 {
            debug!(drained, emitted = latest.is_some(), "Drained channel");
        }
        Drain::Complete(latest)
    }

    /// Run the loop until cancelled or the channel disconnects.
    ///
    /// Returns the subscription still connected (if it was) so the owner can
    /// tear it down after the loop has fully exited.
    pub async fn run<K: FrameSink>(mut self, cancel: CancellationToken, mut sink: K) -> S {
        info!(
            endpoint = self.subscription.endpoint().unwrap_or("<none>"),
            idle_ms = self.idle_delay.as_millis() as u64,
            "Receive loop started"
        );

        loop {
            if cancel.is_cancelled() {
                info!("Receive loop cancelled");
                break;
            }

            if !self.subscription.is_connected() {
                info!("Channel disconnected, ending receive loop");
                break;
            }

            match self.poll_once(&cancel) {
                Drain::Complete(latest) => {
                    // A stop request that arrived during decode suppresses the emit
                    if cancel.is_cancelled() {
                        info!("Receive loop cancelled");
                        break;
                    }
                    if latest.is_some() {
                        self.counters.record_emitted();
                    }
                    sink.emit(latest);
                }
                Drain::Cancelled => {
                    info!("Receive loop cancelled");
                    break;
                }
                Drain::Disconnected => {
                    info!("Channel disconnected, ending receive loop");
                    break;
                }
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Receive loop cancelled while idle");
                    break;
                }
                _ = tokio::time::sleep(self.idle_delay) => {}
            }
        }

        info!(counters = %self.counters.snapshot(), "Receive loop ended");
        self.subscription
    }
}
