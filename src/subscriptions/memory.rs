//! In-process subscription for headless use and deterministic tests

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, trace};

use crate::codec::encode_frame;
use crate::subscription::{Endpoint, RawMessage, Subscription, SubscriptionState};
use crate::types::Frame;
use crate::{ConnectError, ReceiveError};

/// Default queue bound, in messages.
pub const DEFAULT_CAPACITY: usize = 1000;

#[derive(Debug)]
struct Shared {
    queue: Mutex<VecDeque<Vec<Vec<u8>>>>,
    capacity: usize,
    /// Set while a subscription is connected; publishes are dropped otherwise
    subscribed: AtomicBool,
    /// Producer side went away
    closed: AtomicBool,
}

impl Shared {
    fn queue(&self) -> MutexGuard<'_, VecDeque<Vec<Vec<u8>>>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Create a connected-pair of producer handle and subscription.
///
/// The subscription still has to `connect` before it sees anything, the same way
/// a late ZeroMQ subscriber misses earlier publishes.
pub fn channel(capacity: usize) -> (MemoryPublisher, MemorySubscription) {
    let shared = Arc::new(Shared {
        queue: Mutex::new(VecDeque::with_capacity(capacity.min(DEFAULT_CAPACITY))),
        capacity: capacity.max(1),
        subscribed: AtomicBool::new(false),
        closed: AtomicBool::new(false),
    });

    (MemoryPublisher { shared: shared.clone() }, MemorySubscription { shared, endpoint: None })
}

/// Producer handle for a [`MemorySubscription`]. Cheap to clone.
#[derive(Debug, Clone)]
pub struct MemoryPublisher {
    shared: Arc<Shared>,
}

impl MemoryPublisher {
    /// Queue a two-part message. Returns false if it was dropped.
    pub fn push(&self, header: impl Into<Vec<u8>>, payload: impl Into<Vec<u8>>) -> bool {
        self.push_parts(vec![header.into(), payload.into()])
    }

    /// Queue a message with an arbitrary number of parts.
    ///
    /// Dropped when nobody is subscribed, when the producer was closed, or when
    /// the queue is full (the incoming message is the one discarded).
    pub fn push_parts(&self, parts: Vec<Vec<u8>>) -> bool {
        if self.is_closed() || !self.shared.subscribed.load(Ordering::Acquire) {
            trace!("No subscriber, dropping message");
            return false;
        }

        let mut queue = self.shared.queue();
        if queue.len() >= self.shared.capacity {
            debug!(capacity = self.shared.capacity, "Queue full, dropping message");
            return false;
        }
        queue.push_back(parts);
        true
    }

    /// Encode and queue a frame.
    pub fn publish(&self, frame: &Frame) -> serde_json::Result<bool> {
        let RawMessage { header, payload } = encode_frame(frame)?;
        Ok(self.push(header, payload))
    }

    /// Simulate loss of the producer. Already queued messages stay readable; once
    /// they are drained the subscription reports itself disconnected.
    pub fn close(&self) {
        self.shared.closed.store(true, Ordering::Release);
        info!("Memory publisher closed");
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    /// Messages waiting to be received
    pub fn queued(&self) -> usize {
        self.shared.queue().len()
    }
}

/// Bounded in-process subscription fed by a [`MemoryPublisher`].
#[derive(Debug)]
pub struct MemorySubscription {
    shared: Arc<Shared>,
    endpoint: Option<String>,
}

impl MemorySubscription {
    /// Create a pair with [`DEFAULT_CAPACITY`].
    pub fn pair() -> (MemoryPublisher, MemorySubscription) {
        channel(DEFAULT_CAPACITY)
    }
}

impl Subscription for MemorySubscription {
    fn connect(&mut self, endpoint: &str) -> Result<(), ConnectError> {
        if self.shared.subscribed.load(Ordering::Acquire) {
            let current = self.endpoint.clone().unwrap_or_default();
            return Err(ConnectError::AlreadyConnected { endpoint: current });
        }

        let endpoint = Endpoint::parse(endpoint)?;
        self.endpoint = Some(endpoint.as_str().to_string());
        self.shared.subscribed.store(true, Ordering::Release);

        info!(endpoint = %endpoint, "Memory subscription connected");
        Ok(())
    }

    fn state(&self) -> SubscriptionState {
        let subscribed = self.shared.subscribed.load(Ordering::Acquire);
        let lost = self.shared.closed.load(Ordering::Acquire) && self.shared.queue().is_empty();

        if subscribed && !lost {
            SubscriptionState::Connected
        } else {
            SubscriptionState::Disconnected
        }
    }

    fn has_pending(&mut self) -> bool {
        self.shared.subscribed.load(Ordering::Acquire) && !self.shared.queue().is_empty()
    }

    fn receive_one(&mut self) -> Result<RawMessage, ReceiveError> {
        if !self.shared.subscribed.load(Ordering::Acquire) {
            return Err(ReceiveError::NotConnected);
        }

        let parts = self.shared.queue().pop_front().ok_or(ReceiveError::WouldBlock)?;
        match <[Vec<u8>; 2]>::try_from(parts) {
            Ok([header, payload]) => Ok(RawMessage { header, payload }),
            Err(parts) => Err(ReceiveError::UnexpectedParts { parts: parts.len() }),
        }
    }

    fn disconnect(&mut self) {
        if !self.shared.subscribed.swap(false, Ordering::AcqRel) {
            return;
        }

        let discarded = {
            let mut queue = self.shared.queue();
            let discarded = queue.len();
            queue.clear();
            discarded
        };
        info!(discarded, "Memory subscription disconnected");
    }

    fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }
}
