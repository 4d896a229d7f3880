use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};
use uuid::Uuid;

use crate::config::ScanConfig;
use crate::detection::{filter_frame, DwellEffect, StableDetection};
use crate::diagnostics::Diagnostics;
use crate::error::ScanError;
use crate::models::{ActionKind, DetectionSample};
use crate::sequencer::{Dispatch, Presenters, StepReport};

use super::events::{EventSink, ScanEvent};
use super::state::{SessionSnapshot, SessionState};
use super::timers::{self, TimerHandle, TimerKind, TimerToken};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

/// Drives one detection surface: frames in, debounced detections and action
/// sequences out. Cheap to clone; clones share the session.
#[derive(Clone)]
pub struct ScanController {
    state: Arc<Mutex<SessionState>>,
    config: Arc<ScanConfig>,
    sink: Arc<dyn EventSink>,
}

impl ScanController {
    pub fn new(config: ScanConfig, presenters: Presenters, sink: Arc<dyn EventSink>) -> Self {
        let state = SessionState::new(&config, presenters);
        Self {
            state: Arc::new(Mutex::new(state)),
            config: Arc::new(config),
            sink,
        }
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.state.lock().await.snapshot()
    }

    pub async fn diagnostics(&self) -> Diagnostics {
        self.state.lock().await.diagnostics.clone()
    }

    /// The detection surface became visible. Starts a new session.
    pub async fn arm_session(&self) -> Uuid {
        let mut state = self.state.lock().await;
        let session_id = Uuid::new_v4();
        state.session_id = Some(session_id);
        state.surface_active = true;
        self.rearm(&mut state);
        log_info!("session {} armed", session_id);
        session_id
    }

    /// The detection surface was hidden.
    pub async fn disarm_session(&self) {
        let mut state = self.state.lock().await;
        state.surface_active = false;
        state.disarm();
        log_info!("session {} disarmed", state.session_id());
    }

    /// One frame's worth of samples from the perception collaborator.
    pub async fn submit_frame(&self, samples: &[DetectionSample]) {
        let mut state = self.state.lock().await;
        state.diagnostics.frames_submitted += 1;
        if !state.armed {
            state.diagnostics.frames_ignored += 1;
            return;
        }

        let selection = filter_frame(samples, self.config.confidence_threshold, &self.config.labels);
        for err in &selection.rejected {
            log_debug!("session {}: {}", state.session_id(), err);
            state.diagnostics.record(err);
        }

        let now = Instant::now();
        if selection.best.is_some() {
            state.last_activity = now;
            if !state.timers.is_pending(TimerKind::IdleHint) {
                if let Some(delay) = self.config.idle_hint_delay() {
                    self.schedule_idle_hint(&mut state, delay);
                }
            }
        }

        let effects = state.dwell.observe(selection.best.as_ref(), now);
        self.apply_dwell_effects(&mut state, effects);
    }

    pub async fn notify_panorama_dismissed(&self) {
        self.complete_action(ActionKind::PanoramaView).await;
    }

    pub async fn notify_video_finished(&self) {
        self.complete_action(ActionKind::VideoPlayer).await;
    }

    /// "Tap to reveal": starts `label`'s sequence without waiting for dwell.
    pub async fn notify_manual_trigger(&self, label: &str) {
        let mut state = self.state.lock().await;
        if !state.armed && !state.sequencer.in_progress() {
            self.ignore(&mut state, ScanError::stale(format!("manual trigger for {label} while disarmed")));
            return;
        }
        if let Err(err) = self.start_sequence(&mut state, label) {
            self.ignore(&mut state, err);
        }
    }

    async fn complete_action(&self, kind: ActionKind) {
        let mut state = self.state.lock().await;
        match state.sequencer.complete(kind) {
            Ok(report) => self.publish_step(&mut state, report),
            Err(err) => self.ignore(&mut state, err),
        }
    }

    async fn on_timer_fired(&self, kind: TimerKind, token: TimerToken) {
        let mut state = self.state.lock().await;
        if !state.timers.claim(kind, token) || !state.armed {
            self.ignore(&mut state, ScanError::stale(format!("{kind:?} timer")));
            return;
        }

        match kind {
            TimerKind::Confirm => match state.dwell.confirm_elapsed(token.seq) {
                Ok((detection, effects)) => {
                    self.apply_dwell_effects(&mut state, effects);
                    self.on_stable_detection(&mut state, detection);
                }
                Err(err) => self.ignore(&mut state, err),
            },
            TimerKind::Cancel => match state.dwell.cancel_elapsed(token.seq) {
                Ok(effects) => {
                    log_debug!("session {}: object left the frame", state.session_id());
                    self.apply_dwell_effects(&mut state, effects);
                }
                Err(err) => self.ignore(&mut state, err),
            },
            TimerKind::IdleHint => self.on_idle_hint(&mut state),
        }
    }

    fn on_stable_detection(&self, state: &mut SessionState, detection: StableDetection) {
        let session_id = state.session_id();
        log_info!("session {}: stable detection of {}", session_id, detection.label);
        state.diagnostics.stable_detections += 1;
        self.sink.emit(ScanEvent::StableDetection {
            session_id,
            label: detection.label.clone(),
            bounds: detection.bounding_box,
            image_bounds: self
                .config
                .frame_size
                .map(|frame| detection.bounding_box.to_image_space(frame)),
            detected_at: Utc::now(),
        });

        // Without a sequence the session stays armed and the dwell latch keeps
        // this presentation from confirming again.
        if let Err(err) = self.start_sequence(state, &detection.label) {
            self.ignore(state, err);
        }
    }

    /// Begins a sequence and takes detection offline while it runs.
    fn start_sequence(&self, state: &mut SessionState, label: &str) -> Result<(), ScanError> {
        let report = state.sequencer.begin(label)?;
        state.disarm();
        self.publish_step(state, report);
        Ok(())
    }

    fn publish_step(&self, state: &mut SessionState, report: StepReport) {
        let session_id = state.session_id();
        for skipped in report.skipped {
            if let Some(err) = skipped.error() {
                state.diagnostics.record(&err);
            }
            self.sink.emit(ScanEvent::ActionSkipped {
                session_id,
                label: skipped.label,
                index: skipped.index,
                reason: skipped.reason.to_string(),
            });
        }

        match report.dispatch {
            Dispatch::Presented {
                label,
                index,
                action,
            } => {
                state.diagnostics.actions_presented += 1;
                self.sink.emit(ScanEvent::ActionPresented {
                    session_id,
                    label,
                    index,
                    action,
                });
            }
            Dispatch::Exhausted { label } => {
                log_info!("session {}: sequence for {} finished", session_id, label);
                state.diagnostics.sequences_completed += 1;
                self.sink.emit(ScanEvent::SequenceExhausted { session_id, label });
                if state.surface_active {
                    self.rearm(state);
                }
            }
        }
    }

    fn on_idle_hint(&self, state: &mut SessionState) {
        let Some(delay) = self.config.idle_hint_delay() else {
            return;
        };
        let idle = state.last_activity.elapsed();
        if idle >= delay {
            state.diagnostics.idle_hints += 1;
            self.sink.emit(ScanEvent::IdleHint {
                session_id: state.session_id(),
                idle_ms: u64::try_from(idle.as_millis()).unwrap_or(u64::MAX),
            });
        } else {
            self.schedule_idle_hint(state, delay - idle);
        }
    }

    fn rearm(&self, state: &mut SessionState) {
        state.arm(Instant::now());
        if let Some(delay) = self.config.idle_hint_delay() {
            self.schedule_idle_hint(state, delay);
        }
    }

    fn apply_dwell_effects(&self, state: &mut SessionState, effects: Vec<DwellEffect>) {
        for effect in effects {
            match effect {
                DwellEffect::Schedule {
                    timer,
                    token,
                    delay,
                } => {
                    let handle = self.spawn_timer(timer.into(), state.token(token), delay);
                    state.timers.insert(handle);
                }
                DwellEffect::Cancel(timer) => {
                    state.timers.cancel(timer.into());
                }
            }
        }
    }

    fn schedule_idle_hint(&self, state: &mut SessionState, delay: Duration) {
        let token = state.next_hint_token();
        let handle = self.spawn_timer(TimerKind::IdleHint, token, delay);
        state.timers.insert(handle);
    }

    fn spawn_timer(&self, kind: TimerKind, token: TimerToken, delay: Duration) -> TimerHandle {
        let controller = self.clone();
        timers::schedule(kind, token, delay, move |kind, token| async move {
            controller.on_timer_fired(kind, token).await;
        })
    }

    fn ignore(&self, state: &mut SessionState, err: ScanError) {
        match &err {
            ScanError::ReentrantTrigger { .. } | ScanError::BadMedia { .. } => {
                log_warn!("session {}: {}", state.session_id(), err)
            }
            _ => log_debug!("session {}: {}", state.session_id(), err),
        }
        state.diagnostics.record(&err);
    }
}
