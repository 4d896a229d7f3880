use serde::{Deserialize, Serialize};

use crate::error::ScanError;

/// Running counters for one controller. Every condition the pipeline
/// swallows shows up here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
    pub frames_submitted: u64,
    pub frames_ignored: u64,
    pub malformed_samples: u64,
    pub unknown_labels: u64,
    pub stale_callbacks: u64,
    pub reentrant_triggers: u64,
    pub bad_media: u64,
    pub stable_detections: u64,
    pub actions_presented: u64,
    pub sequences_completed: u64,
    pub idle_hints: u64,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, err: &ScanError) {
        let counter = match err {
            ScanError::MalformedSample(_) => &mut self.malformed_samples,
            ScanError::UnknownLabel(_) => &mut self.unknown_labels,
            ScanError::StaleCallback(_) => &mut self.stale_callbacks,
            ScanError::ReentrantTrigger { .. } => &mut self.reentrant_triggers,
            ScanError::BadMedia { .. } => &mut self.bad_media,
        };
        *counter = counter.saturating_add(1);
    }
}
