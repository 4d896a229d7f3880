pub mod action;
pub mod detection;

pub use action::{ActionKind, ActionPlaylist, ActionSpec, PanoramaImage, VideoHandle};
pub use detection::{BestCandidate, DetectionSample, FrameSize, Rect};
