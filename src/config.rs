use std::{fs, path::Path, time::Duration};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::detection::filter::DEFAULT_CONFIDENCE_THRESHOLD;
use crate::detection::DwellConfig;
use crate::models::{ActionPlaylist, FrameSize};

/// Everything a scan session needs up front. Read-only once the session runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScanConfig {
    /// Samples must score strictly above this to be considered.
    pub confidence_threshold: f32,
    /// How long a label must stay the best candidate before it counts.
    pub confirm_delay_ms: u64,
    /// Longest gap in detection tolerated while confirming.
    pub cancel_delay_ms: u64,
    /// Quiet period before an idle hint is emitted; `null` turns hints off.
    pub idle_hint_delay_ms: Option<u64>,
    pub auto_reset_after_stable: bool,
    /// Labels the session reacts to. Empty means all of them.
    pub labels: Vec<String>,
    pub frame_size: Option<FrameSize>,
    pub playlist: ActionPlaylist,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            confirm_delay_ms: 2000,
            cancel_delay_ms: 500,
            idle_hint_delay_ms: Some(10_000),
            auto_reset_after_stable: false,
            labels: Vec::new(),
            frame_size: None,
            playlist: ActionPlaylist::default(),
        }
    }
}

impl ScanConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read scan config from {}", path.display()))?;
        let config: ScanConfig = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse scan config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..1.0).contains(&self.confidence_threshold) {
            bail!(
                "confidenceThreshold must be in [0, 1), got {}",
                self.confidence_threshold
            );
        }
        if self.confirm_delay_ms == 0 {
            bail!("confirmDelayMs must be greater than zero");
        }
        if self.cancel_delay_ms == 0 {
            bail!("cancelDelayMs must be greater than zero");
        }
        if self.idle_hint_delay_ms == Some(0) {
            bail!("idleHintDelayMs must be greater than zero when set");
        }
        if let Some(frame) = self.frame_size {
            if frame.width == 0 || frame.height == 0 {
                bail!("frameSize must be non-zero, got {}x{}", frame.width, frame.height);
            }
        }
        if let Some(spot) = &self.playlist.spot {
            if self.playlist.sequence(spot).is_none() {
                bail!("playlist spot {spot} has no sequence");
            }
        }
        Ok(())
    }

    pub fn dwell_config(&self) -> DwellConfig {
        DwellConfig {
            confirm_delay: Duration::from_millis(self.confirm_delay_ms),
            cancel_delay: Duration::from_millis(self.cancel_delay_ms),
            auto_reset: self.auto_reset_after_stable,
        }
    }

    pub fn idle_hint_delay(&self) -> Option<Duration> {
        self.idle_hint_delay_ms.map(Duration::from_millis)
    }
}
