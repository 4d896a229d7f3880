#[allow(clippy::module_inception)]
pub mod sequencer;
pub mod state;

pub use sequencer::{
    ActionSequencer, Dispatch, PanoramaPresenter, Presenters, SkipReason, SkippedAction, StepReport,
    VideoPresenter,
};
pub use state::SequencerState;
