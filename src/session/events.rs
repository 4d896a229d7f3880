use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::models::{ActionSpec, Rect};

/// Everything a session reports to its host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum ScanEvent {
    #[serde(rename_all = "camelCase")]
    StableDetection {
        session_id: Uuid,
        label: String,
        bounds: Rect,
        /// `bounds` in pixels, when the frame size is configured.
        image_bounds: Option<Rect>,
        detected_at: DateTime<Utc>,
    },
    #[serde(rename_all = "camelCase")]
    ActionPresented {
        session_id: Uuid,
        label: String,
        index: usize,
        action: ActionSpec,
    },
    #[serde(rename_all = "camelCase")]
    ActionSkipped {
        session_id: Uuid,
        label: String,
        index: usize,
        reason: String,
    },
    #[serde(rename_all = "camelCase")]
    SequenceExhausted { session_id: Uuid, label: String },
    #[serde(rename_all = "camelCase")]
    IdleHint { session_id: Uuid, idle_ms: u64 },
}

impl ScanEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ScanEvent::StableDetection { .. } => "stable-detection",
            ScanEvent::ActionPresented { .. } => "action-presented",
            ScanEvent::ActionSkipped { .. } => "action-skipped",
            ScanEvent::SequenceExhausted { .. } => "sequence-exhausted",
            ScanEvent::IdleHint { .. } => "idle-hint",
        }
    }
}

/// Receives events in the order the session produced them. Called with the
/// session lock held, so implementations must not block.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: ScanEvent);
}

pub struct ChannelSink {
    tx: mpsc::UnboundedSender<ScanEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ScanEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: ScanEvent) {
        // receiver gone means nobody is listening anymore
        let _ = self.tx.send(event);
    }
}

/// Writes each event as a JSON line through `log`.
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&self, event: ScanEvent) {
        match serde_json::to_string(&event) {
            Ok(payload) => log::info!(target: "scanreveal::events", "{} {}", event.name(), payload),
            Err(err) => log::error!("failed to serialize {}: {err}", event.name()),
        }
    }
}
