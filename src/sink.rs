//! Frame sinks and the latest-value handoff to consumer contexts
//!
//! The receive loop calls [`FrameSink::emit`] once per iteration on the worker
//! thread, with `None` when nothing decoded that pass. Closures work directly:
//!
//! ```rust
//! use liveview::{Frame, FrameSink};
//!
//! let mut shown = 0;
//! let mut sink = move |frame: Option<Frame>| {
//!     if let Some(frame) = frame {
//!         shown += 1;
//!         println!("{:?} {}", frame.shape(), frame.dtype());
//!     }
//! };
//! sink.emit(None);
//! ```
//!
//! A display running on another thread should not do its work inside the loop.
//! [`watch_channel`] gives it a [`WatchSink`] for the worker and a [`FrameWatch`]
//! to read from, keeping only the newest frame in between.

use futures::{Stream, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tracing::trace;

use crate::config::ReceiverConfig;
use crate::stream::ThrottleExt;
use crate::types::{Frame, UpdateRate};

/// Per-iteration delivery target of the receive loop.
pub trait FrameSink: Send + 'static {
    fn emit(&mut self, frame: Option<Frame>);
}

impl<F> FrameSink for F
where
    F: FnMut(Option<Frame>) + Send + 'static,
{
    fn emit(&mut self, frame: Option<Frame>) {
        self(frame)
    }
}

/// Boxed stream of displayed frames
pub type FrameStream = Pin<Box<dyn Stream<Item = Arc<Frame>> + Send>>;

/// Create a latest-value handoff sized for the default receiver config.
pub fn watch_channel() -> (WatchSink, FrameWatch) {
    watch_channel_for(&ReceiverConfig::default())
}

/// Create a latest-value handoff; `config` sets the rate streams normalize against.
pub fn watch_channel_for(config: &ReceiverConfig) -> (WatchSink, FrameWatch) {
    let (tx, rx) = watch::channel(None);
    let watch = FrameWatch { frames: rx, last_seen: None, source_hz: config.poll_hz() };
    (WatchSink { frames: tx }, watch)
}

/// Sink half of [`watch_channel`]. `None` emissions leave the last frame in place.
#[derive(Debug)]
pub struct WatchSink {
    frames: watch::Sender<Option<Arc<Frame>>>,
}

impl FrameSink for WatchSink {
    fn emit(&mut self, frame: Option<Frame>) {
        let Some(frame) = frame else {
            return;
        };

        // send_replace keeps the value even while nobody is watching
        self.frames.send_replace(Some(Arc::new(frame)));
        trace!(watchers = self.frames.receiver_count(), "Published frame");
    }
}

/// Consumer half of [`watch_channel`]. Clone it for more consumers.
#[derive(Debug, Clone)]
pub struct FrameWatch {
    frames: watch::Receiver<Option<Arc<Frame>>>,
    last_seen: Option<Arc<Frame>>,
    source_hz: f64,
}

impl FrameWatch {
    /// Newest frame, seen or not.
    pub fn latest(&self) -> Option<Arc<Frame>> {
        self.frames.borrow().clone()
    }

    /// Newest frame if this watcher has not returned it before.
    ///
    /// Suitable for a UI timer: each frame is handed out at most once, and frames
    /// that were superseded between calls are skipped.
    pub fn take_new(&mut self) -> Option<Arc<Frame>> {
        let current = self.frames.borrow_and_update().clone()?;
        if self.last_seen.as_ref().is_some_and(|seen| Arc::ptr_eq(seen, &current)) {
            return None;
        }

        self.last_seen = Some(current.clone());
        Some(current)
    }

    /// Wait for a frame this watcher has not seen. `None` once the worker has
    /// exited and every frame was seen.
    pub async fn changed(&mut self) -> Option<Arc<Frame>> {
        loop {
            if let Some(frame) = self.take_new() {
                return Some(frame);
            }
            self.frames.changed().await.ok()?;
        }
    }

    /// True once the worker side is gone
    pub fn is_closed(&self) -> bool {
        self.frames.has_changed().is_err()
    }

    /// Stream of displayed frames at `rate`, ending when the worker exits.
    ///
    /// Yields the current frame first if there is one. Must be polled inside a
    /// tokio runtime when `rate` throttles.
    pub fn stream(&self, rate: UpdateRate) -> FrameStream {
        let frames = WatchStream::new(self.frames.clone()).filter_map(|opt| async move { opt });

        match rate.throttle_interval(self.source_hz) {
            None => frames.boxed(),
            Some(interval) => frames.throttle(interval).boxed(),
        }
    }

    /// Loop rate streams are normalized against
    pub fn source_hz(&self) -> f64 {
        self.source_hz
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::ramp_frame;
    use std::time::Duration;

    #[test]
    fn closures_are_sinks() {
        let (tx, rx) = std::sync::mpsc::channel();
        let mut sink = move |frame: Option<Frame>| tx.send(frame.map(|f| f.shape())).unwrap();
        sink.emit(None);
        sink.emit(Some(ramp_frame(2, 3)));
        drop(sink);

        assert_eq!(rx.iter().collect::<Vec<_>>(), vec![None, Some((2, 3))]);
    }

    #[test]
    fn none_keeps_previous_frame() {
        let (mut sink, watch) = watch_channel();
        assert!(watch.latest().is_none());

        sink.emit(Some(ramp_frame(2, 2)));
        sink.emit(None);
        assert_eq!(watch.latest().map(|f| f.shape()), Some((2, 2)));
    }

    #[test]
    fn take_new_hands_out_each_frame_once() {
        let (mut sink, mut watch) = watch_channel();
        assert!(watch.take_new().is_none());

        sink.emit(Some(ramp_frame(1, 1)));
        sink.emit(Some(ramp_frame(2, 2)));
        assert_eq!(watch.take_new().map(|f| f.shape()), Some((2, 2)));
        assert!(watch.take_new().is_none());

        sink.emit(None);
        assert!(watch.take_new().is_none());

        // Still readable after the sink is gone
        sink.emit(Some(ramp_frame(3, 3)));
        drop(sink);
        assert!(watch.is_closed());
        assert_eq!(watch.take_new().map(|f| f.shape()), Some((3, 3)));
    }

    #[tokio::test]
    async fn changed_ends_when_sink_dropped() {
        let (mut sink, mut watch) = watch_channel();

        let producer = tokio::spawn(async move {
            sink.emit(Some(ramp_frame(4, 4)));
        });

        assert_eq!(watch.changed().await.map(|f| f.shape()), Some((4, 4)));
        producer.await.unwrap();
        assert!(watch.changed().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn throttled_stream_yields_newest_and_ends() {
        let config = ReceiverConfig::default().with_idle_delay(Duration::from_millis(10));
        let (mut sink, watch) = watch_channel_for(&config);
        let mut frames = watch.stream(UpdateRate::Max(10));

        sink.emit(Some(ramp_frame(1, 1)));
        assert_eq!(frames.next().await.map(|f| f.shape()), Some((1, 1)));

        sink.emit(Some(ramp_frame(2, 2)));
        sink.emit(Some(ramp_frame(3, 3)));
        drop(sink);

        assert_eq!(frames.next().await.map(|f| f.shape()), Some((3, 3)));
        assert!(frames.next().await.is_none());
    }
}
