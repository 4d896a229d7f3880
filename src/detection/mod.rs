pub mod dwell;
pub mod filter;

pub use dwell::{DwellConfig, DwellEffect, DwellState, DwellTimer, DwellTracker, StableDetection};
pub use filter::{filter_frame, select_best_candidate, FrameSelection};
