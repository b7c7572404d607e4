use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use futures::StreamExt;
use tracing::info;

use liveview::{
    DType, EndpointDefaults, Frame, FramePublisher, LiveView, ReceiverConfig, UpdateRate,
    init_logging, watch_channel_for,
};

#[derive(Parser, Debug)]
#[command(name = "liveview", version, about = "Live 2-D frame viewer for ZeroMQ streams")]
struct Cli {
    /// Log filter, e.g. `liveview=debug` (RUST_LOG takes precedence)
    #[arg(long, value_name = "FILTER", global = true)]
    log: Option<String>,

    /// Defaults file location
    #[arg(long, value_name = "PATH", global = true)]
    defaults_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Subscribe and print the frames a display would show
    Watch(WatchArgs),
    /// Publish a moving synthetic test pattern
    Publish(PublishArgs),
    /// Show or change the default endpoint
    Defaults(DefaultsArgs),
}

#[derive(Args, Debug)]
struct WatchArgs {
    /// Endpoint to subscribe to; falls back to the defaults file
    #[arg(env = "LIVEVIEW_ENDPOINT")]
    endpoint: Option<String>,

    /// Maximum frames shown per second
    #[arg(long, default_value_t = 5)]
    display_hz: u32,

    /// Pause between receive passes
    #[arg(long, default_value_t = 100)]
    idle_ms: u64,
}

#[derive(Args, Debug)]
struct PublishArgs {
    /// Endpoint to bind, e.g. tcp://*:5020
    endpoint: String,

    #[arg(long, default_value_t = 256)]
    rows: usize,

    #[arg(long, default_value_t = 256)]
    cols: usize,

    /// Element type (numpy name or type string such as <u2)
    #[arg(long, default_value = "uint16", value_parser = parse_dtype)]
    dtype: DType,

    /// Frames per second
    #[arg(long, default_value_t = 10.0)]
    hz: f64,

    /// Stop after this many frames
    #[arg(long)]
    count: Option<u64>,
}

#[derive(Args, Debug)]
struct DefaultsArgs {
    /// Store a new default endpoint
    #[arg(long, value_name = "ENDPOINT", conflicts_with = "clear")]
    set: Option<String>,

    /// Remove the stored default endpoint
    #[arg(long)]
    clear: bool,
}

fn parse_dtype(tag: &str) -> std::result::Result<DType, String> {
    DType::parse_tag(tag).map(|(dtype, _)| dtype).ok_or_else(|| format!("unsupported dtype '{tag}'"))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log.as_deref());

    let defaults_path = match cli.defaults_file {
        Some(path) => Some(path),
        None => EndpointDefaults::default_path(),
    };

    match cli.command {
        Command::Watch(args) => watch(args, defaults_path).await,
        Command::Publish(args) => publish(args).await,
        Command::Defaults(args) => defaults(args, defaults_path),
    }
}

async fn watch(args: WatchArgs, defaults_path: Option<PathBuf>) -> Result<()> {
    let endpoint = match args.endpoint {
        Some(endpoint) => endpoint,
        None => {
            let path = defaults_path.context("no endpoint given and no config directory")?;
            let defaults = EndpointDefaults::load_or_create(&path)?;
            match defaults.default_endpoint() {
                Some(endpoint) => endpoint.to_string(),
                None => bail!(
                    "no endpoint given and {} has no default_endpoint (set one with `liveview defaults --set`)",
                    path.display()
                ),
            }
        }
    };

    let config = ReceiverConfig::default().with_idle_delay(Duration::from_millis(args.idle_ms.max(1)));
    let mut worker = LiveView::connect_with(&endpoint, &config)?;
    let (sink, watch) = watch_channel_for(&config);
    let counters = worker.counters();
    worker.start(sink)?;
    info!(endpoint = %endpoint, "Watching (Ctrl-C to stop)");

    let mut frames = watch.stream(UpdateRate::Max(args.display_hz));
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            next = frames.next() => match next {
                Some(frame) => println!("{}  received={}", describe(&frame), counters.frames_received()),
                None => {
                    info!("Receiver ended");
                    break;
                }
            },
        }
    }

    worker.request_stop()?;
    let snapshot = worker.await_stopped()?;
    println!("{}", snapshot);
    Ok(())
}

fn describe(frame: &Frame) -> String {
    let number = frame.header.frame_number.map(|n| format!("#{n} ")).unwrap_or_default();
    match frame.min_max() {
        Some((min, max)) => {
            format!("{number}{}x{} {} min={min} max={max}", frame.rows(), frame.cols(), frame.dtype())
        }
        None => format!("{number}{}x{} {}", frame.rows(), frame.cols(), frame.dtype()),
    }
}

async fn publish(args: PublishArgs) -> Result<()> {
    if args.rows == 0 || args.cols == 0 {
        bail!("rows and cols must be positive");
    }
    if !(args.hz > 0.0 && args.hz.is_finite()) {
        bail!("hz must be a positive number");
    }

    let mut publisher = FramePublisher::bind(&args.endpoint)?;
    println!("publishing {}x{} {} on {}", args.rows, args.cols, args.dtype, publisher.endpoint());

    let mut ticker = tokio::time::interval(Duration::from_secs_f64(1.0 / args.hz));
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut tick = 0u64;
    while args.count.is_none_or(|count| tick < count) {
        tokio::select! {
            _ = &mut ctrl_c => break,
            _ = ticker.tick() => {
                let frame = test_pattern(args.dtype, args.rows, args.cols, tick)?;
                publisher.publish(&frame)?;
                tick += 1;
            }
        }
    }

    println!("published {} frames", publisher.sent());
    Ok(())
}

/// Diagonal stripes that move one pixel per frame.
fn test_pattern(dtype: DType, rows: usize, cols: usize, tick: u64) -> Result<Frame> {
    let values = (0..rows * cols).map(|i| {
        let (r, c) = ((i / cols) as u64, (i % cols) as u64);
        ((r + c + tick) % 64) as f64
    });

    macro_rules! typed {
        ($ty:ty) => {
            Frame::from_vec(rows, cols, values.map(|v| v as $ty).collect::<Vec<$ty>>())
        };
    }

    let frame = match dtype {
        DType::Int8 => typed!(i8),
        DType::UInt8 => typed!(u8),
        DType::Int16 => typed!(i16),
        DType::UInt16 => typed!(u16),
        DType::Int32 => typed!(i32),
        DType::UInt32 => typed!(u32),
        DType::Int64 => typed!(i64),
        DType::UInt64 => typed!(u64),
        DType::Float32 => typed!(f32),
        DType::Float64 => typed!(f64),
    }?;

    Ok(Frame { header: frame.header.with_frame_number(tick), ..frame })
}

fn defaults(args: DefaultsArgs, path: Option<PathBuf>) -> Result<()> {
    let path = path.context("cannot locate a config directory; pass --defaults-file")?;
    let mut defaults = EndpointDefaults::load_or_create(&path)?;

    if args.clear || args.set.is_some() {
        if let Some(endpoint) = &args.set {
            liveview::Endpoint::parse(endpoint)?;
        }
        defaults.set_default_endpoint(args.set.as_deref());
        defaults.save(&path)?;
    }

    println!("{}: {}", path.display(), defaults.default_endpoint().unwrap_or("<none>"));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_watch_with_rate() {
        let cli = Cli::try_parse_from(["liveview", "watch", "tcp://127.0.0.1:5020", "--display-hz", "2"])
            .expect("watch args should parse");
        let Command::Watch(args) = cli.command else { panic!("expected watch") };
        assert_eq!(args.endpoint.as_deref(), Some("tcp://127.0.0.1:5020"));
        assert_eq!(args.display_hz, 2);
        assert_eq!(args.idle_ms, 100);
    }

    #[test]
    fn parses_publish_dtype_strings() {
        let cli = Cli::try_parse_from(["liveview", "publish", "tcp://*:5020", "--dtype", "<f4", "--count", "3"])
            .expect("publish args should parse");
        let Command::Publish(args) = cli.command else { panic!("expected publish") };
        assert_eq!(args.dtype, DType::Float32);
        assert_eq!(args.count, Some(3));

        let err = Cli::try_parse_from(["liveview", "publish", "tcp://*:5020", "--dtype", "complex64"])
            .expect_err("unknown dtype should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn defaults_set_and_clear_conflict() {
        let err = Cli::try_parse_from(["liveview", "defaults", "--set", "tcp://x:1", "--clear"])
            .expect_err("conflicting args should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_pattern_moves_and_is_numbered() {
        let first = test_pattern(DType::UInt8, 4, 4, 0).unwrap();
        let second = test_pattern(DType::UInt8, 4, 4, 1).unwrap();

        assert_eq!(first.header.frame_number, Some(0));
        assert_eq!(second.header.frame_number, Some(1));
        assert_eq!(first.as_slice::<u8>().unwrap()[1], second.as_slice::<u8>().unwrap()[0]);
    }
}
