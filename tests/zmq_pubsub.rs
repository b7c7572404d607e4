//! End-to-end tests over real ZeroMQ TCP sockets on loopback.
//!
//! PUB/SUB drops everything sent before the subscription handshake completes,
//! so publishers here keep re-sending until the receiving side reports a frame.

use std::time::{Duration, Instant};

use anyhow::{Context, Result, ensure};
use liveview::{
    ConnectError, DType, Frame, FramePublisher, LiveView, LifecycleError, ReceiverConfig,
    Subscription, SubscriptionState, WorkerState, ZmqSubscription,
};

fn fast_config() -> ReceiverConfig {
    ReceiverConfig::default().with_idle_delay(Duration::from_millis(5))
}

fn wait_for(what: &str, mut condition: impl FnMut() -> Result<bool>) -> Result<()> {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !condition()? {
        ensure!(Instant::now() < deadline, "timed out waiting for {what}");
        std::thread::sleep(Duration::from_millis(5));
    }
    Ok(())
}

#[test]
fn worker_receives_frames_from_publisher() -> Result<()> {
    let _ = tracing_subscriber::fmt::try_init();

    let mut publisher = FramePublisher::bind("tcp://127.0.0.1:*")?;
    let mut worker = LiveView::connect_with(publisher.endpoint(), &fast_config())?;
    let (sink, mut watch) = liveview::watch_channel();
    worker.start(sink)?;

    let frame = Frame::from_vec(3, 3, (0..9).map(f64::from).collect::<Vec<_>>())?;
    let mut received = None;
    wait_for("first frame", || {
        publisher.publish(&frame)?;
        received = watch.take_new();
        Ok(received.is_some())
    })?;

    let received = received.context("frame should have arrived")?;
    assert_eq!(received.shape(), (3, 3));
    assert_eq!(received.dtype(), DType::Float64);
    assert_eq!(received.as_slice::<f64>(), frame.as_slice::<f64>());

    let snapshot = worker.await_stopped()?;
    assert_eq!(worker.state(), WorkerState::Stopped);
    assert!(snapshot.frames_received >= 1);
    assert!(snapshot.frames_emitted >= 1);
    assert_eq!(snapshot.decode_errors, 0);
    Ok(())
}

#[test]
fn malformed_messages_do_not_stop_the_stream() -> Result<()> {
    let mut publisher = FramePublisher::bind("tcp://127.0.0.1:*")?;
    let mut worker = LiveView::connect_with(publisher.endpoint(), &fast_config())?;
    let counters = worker.counters();
    let (sink, mut watch) = liveview::watch_channel();
    worker.start(sink)?;

    // Header says 2x2 uint16 (8 bytes) but only 7 arrive
    let bad = liveview::RawMessage::new(br#"{"dtype": "uint16", "shape": ["2", "2"]}"#.to_vec(), vec![0u8; 7]);
    wait_for("decode error", || {
        publisher.send_raw(&bad)?;
        Ok(counters.decode_errors() > 0)
    })?;
    assert!(watch.take_new().is_none());

    let good = Frame::from_vec(2, 2, vec![1u16, 2, 3, 4])?;
    wait_for("good frame after bad ones", || {
        publisher.publish(&good)?;
        Ok(watch.take_new().is_some())
    })?;

    let snapshot = worker.await_stopped()?;
    assert!(snapshot.frames_received > snapshot.frames_emitted);
    Ok(())
}

#[test]
fn subscriber_without_producer_stays_quiet() -> Result<()> {
    let vacated = FramePublisher::bind("tcp://127.0.0.1:*")?;
    let endpoint = vacated.endpoint().to_string();
    drop(vacated);

    let mut worker = LiveView::connect_with(&endpoint, &fast_config())?;
    let counters = worker.counters();
    worker.start(|frame: Option<Frame>| assert!(frame.is_none()))?;

    wait_for("a few polls", || Ok(counters.polls() >= 5))?;
    let snapshot = worker.await_stopped()?;
    assert_eq!(snapshot.frames_received, 0);
    assert_eq!(snapshot.frames_emitted, 0);
    Ok(())
}

#[test]
fn connect_failures_leave_nothing_connected() {
    let err = LiveView::connect("localhost:5020").err().expect("missing scheme must fail");
    assert!(matches!(err, ConnectError::InvalidEndpoint { .. }));

    let mut subscription = ZmqSubscription::new(&ReceiverConfig::default());
    assert!(subscription.connect("tcp://").is_err());
    assert_eq!(subscription.state(), SubscriptionState::Disconnected);

    // Retry with a good endpoint works
    subscription.connect("tcp://127.0.0.1:1").expect("retry should succeed");
    assert!(subscription.is_connected());
}

#[test]
fn lifecycle_misuse_is_reported() -> Result<()> {
    let mut worker = LiveView::connect_with("tcp://127.0.0.1:1", &fast_config())?;
    assert!(matches!(worker.request_stop(), Err(LifecycleError::InvalidTransition { .. })));

    worker.start(|_: Option<Frame>| {})?;
    assert!(matches!(worker.start(|_: Option<Frame>| {}), Err(LifecycleError::InvalidTransition { .. })));

    let first = worker.await_stopped()?;
    let second = worker.await_stopped()?;
    assert_eq!(first, second);
    Ok(())
}
