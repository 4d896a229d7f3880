use std::collections::HashMap;
use std::path::Path;

use image::ImageFormat;
use serde::{Deserialize, Serialize};

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "m4v", "mov", "webm", "mkv", "m3u8"];
const STREAM_SCHEMES: &[&str] = &["http://", "https://"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PanoramaImage {
    pub uri: String,
}

impl PanoramaImage {
    pub fn new(uri: impl Into<String>) -> Self {
        Self { uri: uri.into() }
    }

    /// An image is usable when it names a format the image stack can decode.
    pub fn check(&self) -> Result<(), String> {
        if self.uri.trim().is_empty() {
            return Err("empty image uri".into());
        }
        ImageFormat::from_path(Path::new(&self.uri))
            .map(|_| ())
            .map_err(|err| format!("unsupported panorama image {}: {err}", self.uri))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoHandle {
    pub uri: String,
}

impl VideoHandle {
    pub fn new(uri: impl Into<String>) -> Self {
        Self { uri: uri.into() }
    }

    pub fn check(&self) -> Result<(), String> {
        let uri = self.uri.trim();
        if uri.is_empty() {
            return Err("empty video uri".into());
        }
        if STREAM_SCHEMES.iter().any(|scheme| uri.starts_with(scheme)) {
            return Ok(());
        }
        let playable = Path::new(uri)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| VIDEO_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
            .unwrap_or(false);
        if playable {
            Ok(())
        } else {
            Err(format!("unsupported video {}", self.uri))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActionKind {
    PanoramaView,
    VideoPlayer,
}

/// One presentation step in a label's sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ActionSpec {
    PanoramaView { image: PanoramaImage },
    VideoPlayer { video: VideoHandle },
}

impl ActionSpec {
    pub fn panorama(uri: impl Into<String>) -> Self {
        ActionSpec::PanoramaView {
            image: PanoramaImage::new(uri),
        }
    }

    pub fn video(uri: impl Into<String>) -> Self {
        ActionSpec::VideoPlayer {
            video: VideoHandle::new(uri),
        }
    }

    pub fn kind(&self) -> ActionKind {
        match self {
            ActionSpec::PanoramaView { .. } => ActionKind::PanoramaView,
            ActionSpec::VideoPlayer { .. } => ActionKind::VideoPlayer,
        }
    }

    pub fn check_media(&self) -> Result<(), String> {
        match self {
            ActionSpec::PanoramaView { image } => image.check(),
            ActionSpec::VideoPlayer { video } => video.check(),
        }
    }
}

/// Ordered action sequences keyed by detected label.
///
/// `spot` names an entry that every label without its own sequence falls back
/// to, for installations where any recognized object reveals the same spot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionPlaylist {
    #[serde(default)]
    pub sequences: HashMap<String, Vec<ActionSpec>>,
    #[serde(default)]
    pub spot: Option<String>,
}

impl ActionPlaylist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sequence(mut self, key: impl Into<String>, actions: Vec<ActionSpec>) -> Self {
        self.sequences.insert(key.into(), actions);
        self
    }

    pub fn with_spot(mut self, key: impl Into<String>) -> Self {
        self.spot = Some(key.into());
        self
    }

    /// Resolves a label to the key and non-empty sequence it should run.
    pub fn resolve(&self, label: &str) -> Option<(&str, &[ActionSpec])> {
        let direct = self
            .sequences
            .get_key_value(label)
            .filter(|(_, actions)| !actions.is_empty());
        let resolved = direct.or_else(|| {
            let spot = self.spot.as_deref()?;
            self.sequences
                .get_key_value(spot)
                .filter(|(_, actions)| !actions.is_empty())
        });
        resolved.map(|(key, actions)| (key.as_str(), actions.as_slice()))
    }

    pub fn sequence(&self, key: &str) -> Option<&[ActionSpec]> {
        self.sequences.get(key).map(Vec::as_slice)
    }
}
