//! Scripted perception feed.
//!
//! Replays a recorded trace of frames and host signals against a controller on
//! the tokio clock, standing in for the camera and the presentation layer.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::time::{self, Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::models::DetectionSample;
use crate::session::ScanController;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum FeedInput {
    Arm,
    Disarm,
    Frame {
        #[serde(default)]
        samples: Vec<DetectionSample>,
    },
    PanoramaDismissed,
    VideoFinished,
    ManualTrigger {
        label: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceStep {
    /// Offset from the start of the replay.
    pub at_ms: u64,
    pub input: FeedInput,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameTrace {
    pub steps: Vec<TraceStep>,
}

impl FrameTrace {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read trace from {}", path.display()))?;
        Self::from_json(&contents).with_context(|| format!("Failed to parse trace {}", path.display()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let mut trace: FrameTrace = serde_json::from_str(json)?;
        // stable, so same-time steps keep file order
        trace.steps.sort_by_key(|step| step.at_ms);
        Ok(trace)
    }

    /// Appends one frame every `interval_ms` in `[from_ms, to_ms)`.
    pub fn push_frames(
        &mut self,
        from_ms: u64,
        to_ms: u64,
        interval_ms: u64,
        samples: Vec<DetectionSample>,
    ) -> &mut Self {
        let mut at_ms = from_ms;
        while at_ms < to_ms {
            self.steps.push(TraceStep {
                at_ms,
                input: FeedInput::Frame {
                    samples: samples.clone(),
                },
            });
            at_ms += interval_ms.max(1);
        }
        self
    }

    pub fn push(&mut self, at_ms: u64, input: FeedInput) -> &mut Self {
        self.steps.push(TraceStep { at_ms, input });
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaySummary {
    pub steps_applied: usize,
    pub cancelled: bool,
}

/// Plays `trace` against `controller`, then lingers for `linger` so timers
/// started by the last frames can still fire.
pub async fn replay(
    controller: ScanController,
    mut trace: FrameTrace,
    linger: Duration,
    cancel_token: CancellationToken,
) -> ReplaySummary {
    trace.steps.sort_by_key(|step| step.at_ms);
    let start = Instant::now();
    let mut summary = ReplaySummary::default();

    for step in trace.steps {
        let due = start + Duration::from_millis(step.at_ms);
        tokio::select! {
            _ = time::sleep_until(due) => {}
            _ = cancel_token.cancelled() => {
                log_info!("replay cancelled after {} steps", summary.steps_applied);
                summary.cancelled = true;
                return summary;
            }
        }
        apply(&controller, step.input).await;
        summary.steps_applied += 1;
    }

    tokio::select! {
        _ = time::sleep(linger) => {}
        _ = cancel_token.cancelled() => summary.cancelled = true,
    }
    let diagnostics = controller.diagnostics().await;
    match serde_json::to_string(&diagnostics) {
        Ok(json) => log_info!("replay finished: {}", json),
        Err(err) => log_error!("failed to serialize diagnostics: {err}"),
    }
    summary
}

async fn apply(controller: &ScanController, input: FeedInput) {
    match input {
        FeedInput::Arm => {
            controller.arm_session().await;
        }
        FeedInput::Disarm => controller.disarm_session().await,
        FeedInput::Frame { samples } => {
            log_debug!("frame with {} samples", samples.len());
            controller.submit_frame(&samples).await;
        }
        FeedInput::PanoramaDismissed => controller.notify_panorama_dismissed().await,
        FeedInput::VideoFinished => controller.notify_video_finished().await,
        FeedInput::ManualTrigger { label } => controller.notify_manual_trigger(&label).await,
    }
}
