use serde::{Deserialize, Serialize};

use crate::error::ScanError;

/// Axis-aligned rectangle. Detection boxes use normalized `[0, 1]`
/// coordinates; `to_image_space` maps them onto a pixel grid.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.width.is_finite() && self.height.is_finite()
    }

    pub fn to_image_space(&self, frame: FrameSize) -> Rect {
        let w = frame.width as f32;
        let h = frame.height as f32;
        Rect {
            x: self.x * w,
            y: self.y * h,
            width: self.width * w,
            height: self.height * h,
        }
    }
}

/// Pixel dimensions of the frames the perception collaborator analyzes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

/// One observation from one frame. Not retained past the filter pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionSample {
    pub label: String,
    pub confidence: f32,
    pub bounding_box: Rect,
}

impl DetectionSample {
    pub fn new(label: impl Into<String>, confidence: f32, bounding_box: Rect) -> Self {
        Self {
            label: label.into(),
            confidence,
            bounding_box,
        }
    }

    pub fn validate(&self) -> Result<(), ScanError> {
        if self.label.trim().is_empty() {
            return Err(ScanError::MalformedSample("missing label".into()));
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(ScanError::MalformedSample(format!(
                "confidence {} for {} outside [0, 1]",
                self.confidence, self.label
            )));
        }
        if !self.bounding_box.is_finite() {
            return Err(ScanError::MalformedSample(format!(
                "non-finite bounding box for {}",
                self.label
            )));
        }
        Ok(())
    }
}

/// The single sample a frame is reduced to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BestCandidate {
    pub label: String,
    pub bounding_box: Rect,
}

impl From<&DetectionSample> for BestCandidate {
    fn from(sample: &DetectionSample) -> Self {
        Self {
            label: sample.label.clone(),
            bounding_box: sample.bounding_box,
        }
    }
}
