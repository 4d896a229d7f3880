use std::fmt;
use std::sync::Arc;

use anyhow::Result;

use crate::error::ScanError;
use crate::models::{ActionKind, ActionPlaylist, ActionSpec, PanoramaImage, VideoHandle};

use super::SequencerState;

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// Shows a 360° panorama. The host reports the user closing it through
/// `ScanController::notify_panorama_dismissed`.
pub trait PanoramaPresenter: Send + Sync {
    fn present(&self, image: &PanoramaImage) -> Result<()>;
}

/// Plays a video. The host reports natural end of playback through
/// `ScanController::notify_video_finished`.
pub trait VideoPresenter: Send + Sync {
    fn present(&self, video: &VideoHandle) -> Result<()>;
}

/// Presentation capabilities. A missing presenter disables that action kind.
#[derive(Clone, Default)]
pub struct Presenters {
    pub panorama: Option<Arc<dyn PanoramaPresenter>>,
    pub video: Option<Arc<dyn VideoPresenter>>,
}

impl Presenters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_panorama(mut self, presenter: Arc<dyn PanoramaPresenter>) -> Self {
        self.panorama = Some(presenter);
        self
    }

    pub fn with_video(mut self, presenter: Arc<dyn VideoPresenter>) -> Self {
        self.video = Some(presenter);
        self
    }
}

impl fmt::Debug for Presenters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Presenters")
            .field("panorama", &self.panorama.is_some())
            .field("video", &self.video.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    BadMedia(String),
    PresenterMissing(ActionKind),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::BadMedia(reason) => write!(f, "{reason}"),
            SkipReason::PresenterMissing(kind) => write!(f, "no presenter for {kind:?}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedAction {
    pub label: String,
    pub index: usize,
    pub reason: SkipReason,
}

impl SkippedAction {
    /// The taxonomy error behind the skip; a disabled presenter is not one.
    pub fn error(&self) -> Option<ScanError> {
        match &self.reason {
            SkipReason::BadMedia(reason) => Some(ScanError::BadMedia {
                label: self.label.clone(),
                index: self.index,
                reason: reason.clone(),
            }),
            SkipReason::PresenterMissing(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    Presented {
        label: String,
        index: usize,
        action: ActionSpec,
    },
    Exhausted {
        label: String,
    },
}

/// What one `begin`/`advance` did: any actions skipped on the way, then
/// either the action now on screen or the end of the sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct StepReport {
    pub skipped: Vec<SkippedAction>,
    pub dispatch: Dispatch,
}

/// Runs one label's actions in order, one at a time.
#[derive(Debug)]
pub struct ActionSequencer {
    playlist: ActionPlaylist,
    presenters: Presenters,
    state: SequencerState,
}

impl ActionSequencer {
    pub fn new(playlist: ActionPlaylist, presenters: Presenters) -> Self {
        Self {
            playlist,
            presenters,
            state: SequencerState::new(),
        }
    }

    pub fn state(&self) -> &SequencerState {
        &self.state
    }

    pub fn in_progress(&self) -> bool {
        self.state.in_progress()
    }

    pub fn current_action(&self) -> Option<&ActionSpec> {
        let (label, cursor) = self.state.position()?;
        self.playlist.sequence(label)?.get(cursor)
    }

    /// Starts the sequence for `label`. Refused while another one runs.
    pub fn begin(&mut self, label: &str) -> Result<StepReport, ScanError> {
        if let Some((active, _)) = self.state.position() {
            return Err(ScanError::ReentrantTrigger {
                active: active.to_string(),
                requested: label.to_string(),
            });
        }
        let key = match self.playlist.resolve(label) {
            Some((key, _)) => key.to_string(),
            None => return Err(ScanError::UnknownLabel(label.to_string())),
        };
        Ok(self.present_from(key, 0))
    }

    pub fn advance(&mut self) -> Result<StepReport, ScanError> {
        let (label, cursor) = self
            .state
            .position()
            .map(|(label, cursor)| (label.to_string(), cursor))
            .ok_or_else(|| ScanError::stale("advance with no sequence in progress"))?;
        Ok(self.present_from(label, cursor + 1))
    }

    /// Completion signal from a collaborator. Only advances when it matches
    /// the kind of action currently presented.
    pub fn complete(&mut self, kind: ActionKind) -> Result<StepReport, ScanError> {
        match self.current_action().map(ActionSpec::kind) {
            Some(current) if current == kind => self.advance(),
            Some(current) => Err(ScanError::stale(format!(
                "{kind:?} completion while presenting {current:?}"
            ))),
            None => Err(ScanError::stale(format!(
                "{kind:?} completion with no sequence in progress"
            ))),
        }
    }

    pub fn reset(&mut self) {
        self.state.clear();
    }

    fn present_from(&mut self, label: String, mut cursor: usize) -> StepReport {
        let Self {
            playlist,
            presenters,
            state,
        } = self;
        let actions = playlist.sequence(&label).unwrap_or(&[]);
        let mut skipped = Vec::new();

        while let Some(action) = actions.get(cursor) {
            state.set(&label, cursor);
            match dispatch(presenters, action) {
                Ok(()) => {
                    log_info!("presenting step {} of {} for {}", cursor + 1, actions.len(), label);
                    return StepReport {
                        skipped,
                        dispatch: Dispatch::Presented {
                            label,
                            index: cursor,
                            action: action.clone(),
                        },
                    };
                }
                Err(reason) => {
                    log_warn!("skipping step {} of {} for {}: {}", cursor + 1, actions.len(), label, reason);
                    skipped.push(SkippedAction {
                        label: label.clone(),
                        index: cursor,
                        reason,
                    });
                    cursor += 1;
                }
            }
        }

        state.clear();
        StepReport {
            skipped,
            dispatch: Dispatch::Exhausted { label },
        }
    }
}

fn dispatch(presenters: &Presenters, action: &ActionSpec) -> Result<(), SkipReason> {
    let missing = || SkipReason::PresenterMissing(action.kind());
    let presented = match action {
        ActionSpec::PanoramaView { image } => {
            let presenter = presenters.panorama.as_ref().ok_or_else(missing)?;
            action.check_media().map_err(SkipReason::BadMedia)?;
            presenter.present(image)
        }
        ActionSpec::VideoPlayer { video } => {
            let presenter = presenters.video.as_ref().ok_or_else(missing)?;
            action.check_media().map_err(SkipReason::BadMedia)?;
            presenter.present(video)
        }
    };
    presented.map_err(|err| SkipReason::BadMedia(format!("{err:#}")))
}
