//! Worker lifecycle: runs the receive loop on its own thread
//!
//! ```text
//! Idle --start--> Running --request_stop--> StopRequested --loop exits--> Stopped
//!                    |                                                      ^
//!                    +------------- channel lost / loop ends ---------------+
//! ```
//!
//! A worker is single use. To stream again, build a new subscription and worker.
//!
//! The loop runs on a dedicated OS thread driving a current-thread tokio runtime,
//! so socket draining never shares a thread with the caller. Closure sinks run on
//! that thread; use a [`WatchSink`](crate::WatchSink) to hand frames to a UI or
//! async context instead.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::thread::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::ReceiverConfig;
use crate::counters::{CounterSnapshot, Counters};
use crate::receiver::FrameReceiver;
use crate::sink::FrameSink;
use crate::subscription::Subscription;
use crate::subscriptions::zmq::ZmqSubscription;
use crate::LifecycleError;

/// Lifecycle state of a [`Worker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum WorkerState {
    Idle = 0,
    Running = 1,
    StopRequested = 2,
    Stopped = 3,
}

impl WorkerState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => WorkerState::Idle,
            1 => WorkerState::Running,
            2 => WorkerState::StopRequested,
            _ => WorkerState::Stopped,
        }
    }
}

#[derive(Debug)]
struct StateCell(AtomicU8);

impl StateCell {
    fn new(state: WorkerState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    fn get(&self) -> WorkerState {
        WorkerState::from_u8(self.0.load(Ordering::Acquire))
    }

    fn set(&self, state: WorkerState) {
        self.0.store(state as u8, Ordering::Release);
    }

    fn transition(&self, from: WorkerState, to: WorkerState) -> bool {
        self.0.compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire).is_ok()
    }
}

/// Marks the worker stopped when the loop thread exits, unwinding included.
struct StoppedOnExit(Arc<StateCell>);

impl Drop for StoppedOnExit {
    fn drop(&mut self) {
        self.0.set(WorkerState::Stopped);
    }
}

/// Background runner for a [`FrameReceiver`].
pub struct Worker<S: Subscription = ZmqSubscription> {
    state: Arc<StateCell>,
    counters: Arc<Counters>,
    cancel: CancellationToken,
    thread_name: String,

    /// Present until `start`
    receiver: Option<FrameReceiver<S>>,

    /// Loop thread; hands the subscription back when it exits
    thread: Option<JoinHandle<S>>,

    /// Set once `await_stopped` has torn everything down
    finished: Option<CounterSnapshot>,

    /// The loop thread died by panic; reported on every `await_stopped`
    panicked: bool,
}

impl<S: Subscription> Worker<S> {
    /// Wrap a (normally connected) subscription in an idle worker.
    pub fn new(subscription: S, config: &ReceiverConfig) -> Self {
        let receiver = FrameReceiver::new(subscription, config);
        Self {
            state: Arc::new(StateCell::new(WorkerState::Idle)),
            counters: receiver.counters(),
            cancel: CancellationToken::new(),
            thread_name: config.thread_name.clone(),
            receiver: Some(receiver),
            thread: None,
            finished: None,
            panicked: false,
        }
    }

    pub fn state(&self) -> WorkerState {
        self.state.get()
    }

    /// Live counters, readable from any thread
    pub fn counters(&self) -> Arc<Counters> {
        self.counters.clone()
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        self.counters.snapshot()
    }

    /// Start the receive loop, delivering every emission to `sink`.
    ///
    /// Returns as soon as the thread is spawned.
    pub fn start<K: FrameSink>(&mut self, sink: K) -> Result<(), LifecycleError> {
        let state = self.state.get();
        let receiver = match (state, self.receiver.take()) {
            (WorkerState::Idle, Some(receiver)) => receiver,
            (_, receiver) => {
                self.receiver = receiver;
                return Err(LifecycleError::InvalidTransition { operation: "start", state });
            }
        };

        self.state.set(WorkerState::Running);
        let guard = StoppedOnExit(self.state.clone());
        let cancel = self.cancel.clone();

        let spawned = std::thread::Builder::new().name(self.thread_name.clone()).spawn(move || {
            let _guard = guard;
            match tokio::runtime::Builder::new_current_thread().enable_time().build() {
                Ok(runtime) => runtime.block_on(receiver.run(cancel, sink)),
                Err(e) => {
                    error!("Failed to build receiver runtime: {}", e);
                    receiver.into_subscription()
                }
            }
        });

        match spawned {
            Ok(handle) => {
                info!(thread = %self.thread_name, "Worker started");
                self.thread = Some(handle);
                Ok(())
            }
            Err(e) => {
                // The closure, and the channel with it, is dropped here
                self.state.set(WorkerState::Stopped);
                self.finished = Some(self.counters.snapshot());
                Err(LifecycleError::Spawn(e))
            }
        }
    }

    /// Ask the loop to stop. Never blocks.
    ///
    /// No-op once the worker is `Stopped`; an error while still `Idle`.
    pub fn request_stop(&self) -> Result<(), LifecycleError> {
        match self.state.get() {
            WorkerState::Idle => Err(LifecycleError::InvalidTransition {
                operation: "request stop of",
                state: WorkerState::Idle,
            }),
            WorkerState::Running => {
                if self.state.transition(WorkerState::Running, WorkerState::StopRequested) {
                    debug!("Stop requested");
                }
                self.cancel.cancel();
                Ok(())
            }
            WorkerState::StopRequested => {
                self.cancel.cancel();
                Ok(())
            }
            WorkerState::Stopped => Ok(()),
        }
    }

    /// Stop the loop, wait for it to exit and disconnect the channel.
    ///
    /// Requests stop itself if nobody has yet. Blocks the calling thread until
    /// the loop thread has exited, which takes at most one receive plus one
    /// decode after the request. The channel is disconnected exactly once; later
    /// calls repeat the first outcome.
    pub fn await_stopped(&mut self) -> Result<CounterSnapshot, LifecycleError> {
        if let Some(snapshot) = self.finished {
            return if self.panicked { Err(LifecycleError::WorkerPanicked) } else { Ok(snapshot) };
        }

        self.request_stop()?;

        let joined = match self.thread.take() {
            Some(handle) => handle.join(),
            None => {
                // Nothing ever ran
                self.state.set(WorkerState::Stopped);
                let snapshot = self.counters.snapshot();
                self.finished = Some(snapshot);
                return Ok(snapshot);
            }
        };

        self.state.set(WorkerState::Stopped);
        let snapshot = self.counters.snapshot();
        self.finished = Some(snapshot);

        match joined {
            Ok(mut subscription) => {
                subscription.disconnect();
                info!(counters = %snapshot, "Worker stopped");
                Ok(snapshot)
            }
            Err(_) => {
                error!("Receiver thread panicked");
                self.panicked = true;
                Err(LifecycleError::WorkerPanicked)
            }
        }
    }

    /// True once the loop thread has exited, whether or not stop was requested.
    pub fn is_finished(&self) -> bool {
        self.state.get() == WorkerState::Stopped
    }
}

impl<S: Subscription> Drop for Worker<S> {
    fn drop(&mut self) {
        if let Some(receiver) = self.receiver.take() {
            receiver.into_subscription().disconnect();
            return;
        }

        if self.thread.is_some() {
            self.cancel.cancel();
            if let Err(e) = self.await_stopped() {
                warn!("Worker shutdown on drop failed: {}", e);
            }
        }
    }
}
