#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use scanreveal_lib::models::{PanoramaImage, VideoHandle};
use scanreveal_lib::{
    ActionPlaylist, ActionSpec, ChannelSink, DetectionSample, PanoramaPresenter, Presenters, Rect,
    ScanConfig, ScanController, ScanEvent, VideoPresenter,
};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::{self, Duration, Instant};

pub const FRAME_INTERVAL_MS: u64 = 100;

/// Presenter that remembers what it was asked to show.
#[derive(Default)]
pub struct Recorder {
    pub shown: Mutex<Vec<String>>,
    pub fail_on: Option<String>,
}

impl Recorder {
    pub fn shown(&self) -> Vec<String> {
        self.shown.lock().unwrap().clone()
    }

    fn show(&self, uri: &str) -> Result<()> {
        if self.fail_on.as_deref() == Some(uri) {
            bail!("cannot open {uri}");
        }
        self.shown.lock().unwrap().push(uri.to_string());
        Ok(())
    }
}

impl PanoramaPresenter for Recorder {
    fn present(&self, image: &PanoramaImage) -> Result<()> {
        self.show(&image.uri)
    }
}

impl VideoPresenter for Recorder {
    fn present(&self, video: &VideoHandle) -> Result<()> {
        self.show(&video.uri)
    }
}

pub fn sample(label: &str, confidence: f32) -> DetectionSample {
    DetectionSample::new(label, confidence, Rect::new(0.25, 0.25, 0.5, 0.5))
}

pub fn label_a_playlist() -> ActionPlaylist {
    ActionPlaylist::new().with_sequence(
        "label_A",
        vec![
            ActionSpec::panorama("label_A_360.jpg"),
            ActionSpec::video("label_A.mp4"),
        ],
    )
}

pub fn config(playlist: ActionPlaylist) -> ScanConfig {
    ScanConfig {
        confirm_delay_ms: 1500,
        cancel_delay_ms: 500,
        idle_hint_delay_ms: None,
        playlist,
        ..ScanConfig::default()
    }
}

pub struct Rig {
    pub controller: ScanController,
    pub events: UnboundedReceiver<ScanEvent>,
    pub presenter: Arc<Recorder>,
    pub start: Instant,
}

impl Rig {
    pub async fn armed(config: ScanConfig) -> Self {
        Self::armed_with(config, Recorder::default()).await
    }

    pub async fn armed_with(config: ScanConfig, recorder: Recorder) -> Self {
        let presenter = Arc::new(recorder);
        let presenters = Presenters::new()
            .with_panorama(presenter.clone())
            .with_video(presenter.clone());
        Self::armed_with_presenters(config, presenters, presenter).await
    }

    pub async fn armed_with_presenters(
        config: ScanConfig,
        presenters: Presenters,
        presenter: Arc<Recorder>,
    ) -> Self {
        let (sink, events) = ChannelSink::new();
        let controller = ScanController::new(config, presenters, Arc::new(sink));
        controller.arm_session().await;
        Self {
            controller,
            events,
            presenter,
            start: Instant::now(),
        }
    }

    /// Sleeps until `at_ms` after arming.
    pub async fn advance_to(&self, at_ms: u64) {
        time::sleep_until(self.start + Duration::from_millis(at_ms)).await;
    }

    /// Submits the same frame every 100ms over `[from_ms, to_ms)`.
    pub async fn frames(&self, samples: &[DetectionSample], from_ms: u64, to_ms: u64) {
        let mut at_ms = from_ms;
        while at_ms < to_ms {
            self.advance_to(at_ms).await;
            self.controller.submit_frame(samples).await;
            at_ms += FRAME_INTERVAL_MS;
        }
    }

    pub fn drain(&mut self) -> Vec<ScanEvent> {
        let mut drained = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            drained.push(event);
        }
        drained
    }

    pub fn drain_names(&mut self) -> Vec<&'static str> {
        self.drain().iter().map(ScanEvent::name).collect()
    }
}
