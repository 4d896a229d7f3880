pub mod config;
pub mod detection;
pub mod diagnostics;
pub mod error;
pub mod feed;
pub mod models;
pub mod sequencer;
pub mod session;
mod utils;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

pub use config::ScanConfig;
pub use diagnostics::Diagnostics;
pub use error::ScanError;
pub use feed::{FeedInput, FrameTrace, ReplaySummary, TraceStep};
pub use models::{ActionKind, ActionPlaylist, ActionSpec, DetectionSample, FrameSize, Rect};
pub use sequencer::{PanoramaPresenter, Presenters, VideoPresenter};
pub use session::{ChannelSink, EventSink, LogSink, ScanController, ScanEvent, SessionSnapshot};

/// Replays a recorded detection trace through a scan session.
#[derive(Parser, Debug)]
#[command(name = "scanreveal", version, about)]
pub struct Args {
    /// Session configuration (JSON). Defaults apply when omitted.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Trace of frames and host signals to replay (JSON).
    #[arg(short, long)]
    pub trace: PathBuf,

    /// Keep the session alive this long after the last step.
    #[arg(long, default_value_t = 3000)]
    pub linger_ms: u64,
}

/// Stands in for the host's panorama viewer and video player.
struct ConsolePresenter;

impl PanoramaPresenter for ConsolePresenter {
    fn present(&self, image: &models::PanoramaImage) -> Result<()> {
        log::info!("presenting panorama {}", image.uri);
        Ok(())
    }
}

impl VideoPresenter for ConsolePresenter {
    fn present(&self, video: &models::VideoHandle) -> Result<()> {
        log::info!("playing video {}", video.uri);
        Ok(())
    }
}

pub fn run() -> Result<()> {
    let mut logger = env_logger::Builder::from_default_env();
    if std::env::var("SCANREVEAL_DEBUG").as_deref() == Ok("1") {
        logger.filter_level(log::LevelFilter::Debug);
    } else {
        logger.filter_level(log::LevelFilter::Info);
    }
    logger.init();

    let args = Args::parse();
    log::info!("scanreveal starting up...");

    let config = match &args.config {
        Some(path) => ScanConfig::load(path)?,
        None => ScanConfig::default(),
    };
    let trace = FrameTrace::load(&args.trace)?;

    let runtime = tokio::runtime::Runtime::new().context("Failed to start tokio runtime")?;
    runtime.block_on(async move {
        let presenter = Arc::new(ConsolePresenter);
        let presenters = Presenters::new()
            .with_panorama(presenter.clone())
            .with_video(presenter);
        let controller = ScanController::new(config, presenters, Arc::new(LogSink));

        let cancel_token = CancellationToken::new();
        let ctrl_c_token = cancel_token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::warn!("interrupted, stopping replay");
                ctrl_c_token.cancel();
            }
        });

        controller.arm_session().await;
        let summary = feed::replay(
            controller.clone(),
            trace,
            Duration::from_millis(args.linger_ms),
            cancel_token,
        )
        .await;
        controller.disarm_session().await;

        log::info!(
            "replayed {} steps{}",
            summary.steps_applied,
            if summary.cancelled { " (cancelled)" } else { "" }
        );
        Ok(())
    })
}
