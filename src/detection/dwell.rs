//! Debounces per-frame candidates into one stable detection per presentation.
//!
//! The tracker owns no timers. Each transition returns [`DwellEffect`]s that
//! the session applies to its timer set, and timer firings come back in with
//! the token they were scheduled under. A token that no longer matches is
//! stale and changes nothing.

use tokio::time::{Duration, Instant};

use crate::error::ScanError;
use crate::models::{BestCandidate, Rect};

pub const DEFAULT_CONFIRM_DELAY: Duration = Duration::from_millis(2000);
pub const DEFAULT_CANCEL_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DwellState {
    Idle,
    /// Confirming, but the label is currently out of view and the cancel
    /// timer is pending. The confirm timer keeps running.
    Candidate { label: String, first_seen_at: Instant },
    Confirming { label: String, deadline: Instant },
    /// Emitted and latched. Released to `Idle` once the label has been out of
    /// view for the cancel delay, or replaced by a different best label.
    Stable { label: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DwellTimer {
    Confirm,
    Cancel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DwellEffect {
    Schedule {
        timer: DwellTimer,
        token: u64,
        delay: Duration,
    },
    Cancel(DwellTimer),
}

#[derive(Debug, Clone, PartialEq)]
pub struct StableDetection {
    pub label: String,
    pub bounding_box: Rect,
}

#[derive(Debug, Clone, Copy)]
pub struct DwellConfig {
    pub confirm_delay: Duration,
    pub cancel_delay: Duration,
    /// Return to `Idle` right after emitting instead of latching `Stable`
    /// until the object leaves the frame.
    pub auto_reset: bool,
}

impl Default for DwellConfig {
    fn default() -> Self {
        Self {
            confirm_delay: DEFAULT_CONFIRM_DELAY,
            cancel_delay: DEFAULT_CANCEL_DELAY,
            auto_reset: false,
        }
    }
}

#[derive(Debug)]
pub struct DwellTracker {
    config: DwellConfig,
    state: DwellState,
    last_bounds: Rect,
    confirm_token: Option<u64>,
    cancel_token: Option<u64>,
    next_token: u64,
}

impl DwellTracker {
    pub fn new(config: DwellConfig) -> Self {
        Self {
            config,
            state: DwellState::Idle,
            last_bounds: Rect::default(),
            confirm_token: None,
            cancel_token: None,
            next_token: 0,
        }
    }

    pub fn state(&self) -> &DwellState {
        &self.state
    }

    /// Feeds one frame's best candidate (or its absence).
    pub fn observe(&mut self, candidate: Option<&BestCandidate>, now: Instant) -> Vec<DwellEffect> {
        let mut effects = Vec::new();
        let Some(candidate) = candidate else {
            match &self.state {
                DwellState::Confirming { label, deadline } => {
                    let first_seen_at = deadline
                        .checked_sub(self.config.confirm_delay)
                        .unwrap_or(now);
                    self.state = DwellState::Candidate {
                        label: label.clone(),
                        first_seen_at,
                    };
                    self.start_cancel(&mut effects);
                }
                DwellState::Stable { .. } if self.cancel_token.is_none() => {
                    self.start_cancel(&mut effects);
                }
                _ => {}
            }
            return effects;
        };

        match &self.state {
            DwellState::Idle => self.start_confirming(candidate, now, &mut effects),
            DwellState::Stable { label } if *label == candidate.label => {
                self.last_bounds = candidate.bounding_box;
                self.clear_cancel(&mut effects);
            }
            DwellState::Stable { .. } => {
                self.clear_cancel(&mut effects);
                self.start_confirming(candidate, now, &mut effects);
            }
            DwellState::Confirming { label, .. } if *label == candidate.label => {
                self.last_bounds = candidate.bounding_box;
                self.clear_cancel(&mut effects);
            }
            DwellState::Candidate {
                label,
                first_seen_at,
            } if *label == candidate.label => {
                self.state = DwellState::Confirming {
                    label: label.clone(),
                    deadline: *first_seen_at + self.config.confirm_delay,
                };
                self.last_bounds = candidate.bounding_box;
                self.clear_cancel(&mut effects);
            }
            DwellState::Confirming { .. } | DwellState::Candidate { .. } => {
                self.clear_cancel(&mut effects);
                self.clear_confirm(&mut effects);
                self.start_confirming(candidate, now, &mut effects);
            }
        }
        effects
    }

    /// Confirm timer fired. Emits at most once per confirm window.
    pub fn confirm_elapsed(
        &mut self,
        token: u64,
    ) -> Result<(StableDetection, Vec<DwellEffect>), ScanError> {
        if self.confirm_token != Some(token) {
            return Err(ScanError::stale("confirm timer"));
        }
        self.confirm_token = None;

        let label = match &self.state {
            DwellState::Confirming { label, .. } | DwellState::Candidate { label, .. } => {
                label.clone()
            }
            DwellState::Idle | DwellState::Stable { .. } => {
                return Err(ScanError::stale("confirm timer"));
            }
        };

        let mut effects = Vec::new();
        self.clear_cancel(&mut effects);
        let detection = StableDetection {
            label: label.clone(),
            bounding_box: self.last_bounds,
        };
        self.state = if self.config.auto_reset {
            DwellState::Idle
        } else {
            DwellState::Stable { label }
        };
        Ok((detection, effects))
    }

    /// Cancel timer fired: the dropout outlasted the tolerance. Drops a
    /// pending confirmation or releases the `Stable` latch.
    pub fn cancel_elapsed(&mut self, token: u64) -> Result<Vec<DwellEffect>, ScanError> {
        if self.cancel_token != Some(token) {
            return Err(ScanError::stale("cancel timer"));
        }
        self.cancel_token = None;

        let mut effects = Vec::new();
        match self.state {
            DwellState::Candidate { .. } => {
                self.clear_confirm(&mut effects);
                self.state = DwellState::Idle;
            }
            DwellState::Stable { .. } => self.state = DwellState::Idle,
            DwellState::Idle | DwellState::Confirming { .. } => {}
        }
        Ok(effects)
    }

    /// Back to `Idle`, dropping any pending timers.
    pub fn reset(&mut self) -> Vec<DwellEffect> {
        let mut effects = Vec::new();
        self.clear_cancel(&mut effects);
        self.clear_confirm(&mut effects);
        self.state = DwellState::Idle;
        self.last_bounds = Rect::default();
        effects
    }

    fn start_confirming(&mut self, candidate: &BestCandidate, now: Instant, effects: &mut Vec<DwellEffect>) {
        let token = self.issue_token();
        self.confirm_token = Some(token);
        self.last_bounds = candidate.bounding_box;
        self.state = DwellState::Confirming {
            label: candidate.label.clone(),
            deadline: now + self.config.confirm_delay,
        };
        effects.push(DwellEffect::Schedule {
            timer: DwellTimer::Confirm,
            token,
            delay: self.config.confirm_delay,
        });
    }

    fn start_cancel(&mut self, effects: &mut Vec<DwellEffect>) {
        let token = self.issue_token();
        self.cancel_token = Some(token);
        effects.push(DwellEffect::Schedule {
            timer: DwellTimer::Cancel,
            token,
            delay: self.config.cancel_delay,
        });
    }

    fn clear_cancel(&mut self, effects: &mut Vec<DwellEffect>) {
        if self.cancel_token.take().is_some() {
            effects.push(DwellEffect::Cancel(DwellTimer::Cancel));
        }
    }

    fn clear_confirm(&mut self, effects: &mut Vec<DwellEffect>) {
        if self.confirm_token.take().is_some() {
            effects.push(DwellEffect::Cancel(DwellTimer::Confirm));
        }
    }

    fn issue_token(&mut self) -> u64 {
        self.next_token = self.next_token.wrapping_add(1);
        self.next_token
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Virtual clock that plays the part of the session's timer set.
    struct Harness {
        tracker: DwellTracker,
        start: Instant,
        now: Instant,
        pending: Vec<(DwellTimer, u64, Instant)>,
        detections: Vec<(StableDetection, Duration)>,
    }

    impl Harness {
        fn new(config: DwellConfig) -> Self {
            let start = Instant::now();
            Self {
                tracker: DwellTracker::new(config),
                start,
                now: start,
                pending: Vec::new(),
                detections: Vec::new(),
            }
        }

        fn apply(&mut self, effects: Vec<DwellEffect>) {
            for effect in effects {
                match effect {
                    DwellEffect::Schedule { timer, token, delay } => {
                        self.pending.retain(|(t, _, _)| *t != timer);
                        self.pending.push((timer, token, self.now + delay));
                    }
                    DwellEffect::Cancel(timer) => self.pending.retain(|(t, _, _)| *t != timer),
                }
            }
        }

        fn advance_to(&mut self, millis: u64) {
            let target = self.start + Duration::from_millis(millis);
            loop {
                self.pending.sort_by_key(|(_, _, at)| *at);
                let due = matches!(self.pending.first(), Some(&(_, _, at)) if at <= target);
                if !due {
                    break;
                }
                let (timer, token, at) = self.pending.remove(0);
                self.now = at;
                match timer {
                    DwellTimer::Confirm => {
                        if let Ok((detection, effects)) = self.tracker.confirm_elapsed(token) {
                            self.detections.push((detection, at - self.start));
                            self.apply(effects);
                        }
                    }
                    DwellTimer::Cancel => {
                        let effects = self.tracker.cancel_elapsed(token).unwrap_or_default();
                        self.apply(effects);
                    }
                }
            }
            self.now = target;
        }

        fn frame(&mut self, millis: u64, label: Option<&str>) {
            self.advance_to(millis);
            let candidate = label.map(|label| BestCandidate {
                label: label.to_string(),
                bounding_box: Rect::new(0.2, 0.2, 0.4, 0.4),
            });
            let effects = self.tracker.observe(candidate.as_ref(), self.now);
            self.apply(effects);
        }

        /// Frames every 100ms in `[from, to)`.
        fn frames(&mut self, from: u64, to: u64, label: Option<&str>) {
            for t in (from..to).step_by(100) {
                self.frame(t, label);
            }
        }
    }

    fn config_1500() -> DwellConfig {
        DwellConfig {
            confirm_delay: Duration::from_millis(1500),
            ..DwellConfig::default()
        }
    }

    #[test]
    fn steady_label_confirms_once() {
        let mut h = Harness::new(config_1500());
        h.frames(0, 2100, Some("label_A"));
        h.advance_to(4000);

        assert_eq!(h.detections.len(), 1);
        assert_eq!(h.detections[0].0.label, "label_A");
        assert_eq!(h.detections[0].1, Duration::from_millis(1500));
        assert_eq!(
            h.tracker.state(),
            &DwellState::Stable {
                label: "label_A".into()
            }
        );
    }

    #[test]
    fn short_dropout_keeps_original_window() {
        let mut h = Harness::new(config_1500());
        h.frames(0, 800, Some("label_A"));
        h.frames(800, 1100, None);
        assert!(matches!(h.tracker.state(), DwellState::Candidate { .. }));
        h.frames(1100, 2000, Some("label_A"));

        assert_eq!(h.detections.len(), 1);
        assert_eq!(h.detections[0].1, Duration::from_millis(1500));
    }

    #[test]
    fn long_dropout_restarts_window() {
        let mut h = Harness::new(config_1500());
        h.frames(0, 800, Some("label_A"));
        h.frames(800, 1400, None);
        assert_eq!(h.tracker.state(), &DwellState::Idle);
        h.frames(1400, 3500, Some("label_A"));

        assert_eq!(h.detections.len(), 1);
        assert_eq!(h.detections[0].1, Duration::from_millis(2900));
    }

    #[test]
    fn label_switch_restarts_window() {
        let mut h = Harness::new(config_1500());
        h.frames(0, 1000, Some("label_A"));
        h.frames(1000, 3000, Some("label_B"));

        assert_eq!(h.detections.len(), 1);
        assert_eq!(h.detections[0].0.label, "label_B");
        assert_eq!(h.detections[0].1, Duration::from_millis(2500));
    }

    #[test]
    fn absent_frames_alone_never_confirm() {
        let mut h = Harness::new(config_1500());
        h.frames(0, 5000, None);
        assert!(h.detections.is_empty());
        assert!(h.pending.is_empty());
    }

    #[test]
    fn stale_tokens_are_rejected() {
        let mut tracker = DwellTracker::new(config_1500());
        let now = Instant::now();
        let candidate = BestCandidate {
            label: "mug".into(),
            bounding_box: Rect::default(),
        };
        let effects = tracker.observe(Some(&candidate), now);
        let token = match effects.as_slice() {
            [DwellEffect::Schedule { token, .. }] => *token,
            other => panic!("unexpected effects {other:?}"),
        };

        assert!(tracker.confirm_elapsed(token + 7).is_err());
        assert!(tracker.confirm_elapsed(token).is_ok());
        // a second firing of the same window is stale
        assert!(matches!(
            tracker.confirm_elapsed(token),
            Err(ScanError::StaleCallback(_))
        ));
    }

    #[test]
    fn auto_reset_returns_to_idle() {
        let mut h = Harness::new(DwellConfig {
            auto_reset: true,
            ..config_1500()
        });
        h.frames(0, 1500, Some("mug"));
        h.advance_to(1600);
        assert_eq!(h.detections.len(), 1);
        assert_eq!(h.tracker.state(), &DwellState::Idle);
    }

    #[test]
    fn stable_latch_holds_while_label_stays_in_view() {
        let mut h = Harness::new(config_1500());
        h.frames(0, 2000, Some("label_A"));
        h.frames(2000, 2300, None);
        h.frames(2300, 8000, Some("label_A"));

        assert_eq!(h.detections.len(), 1);
        assert!(matches!(h.tracker.state(), DwellState::Stable { .. }));
    }

    #[test]
    fn stable_latch_releases_after_sustained_absence() {
        let mut h = Harness::new(config_1500());
        h.frames(0, 2000, Some("label_A"));
        h.frames(2000, 2700, None);
        assert_eq!(h.tracker.state(), &DwellState::Idle);
        assert!(h.pending.is_empty());

        h.frames(2700, 4500, Some("label_A"));
        assert_eq!(h.detections.len(), 2);
        assert_eq!(h.detections[1].1, Duration::from_millis(4200));
    }

    #[test]
    fn different_label_releases_stable_latch() {
        let mut h = Harness::new(config_1500());
        h.frames(0, 2000, Some("label_A"));
        h.frames(2000, 4000, Some("label_B"));

        assert_eq!(h.detections.len(), 2);
        assert_eq!(h.detections[1].0.label, "label_B");
        assert_eq!(h.detections[1].1, Duration::from_millis(3500));
    }

    #[test]
    fn reset_cancels_pending_timers() {
        let mut h = Harness::new(config_1500());
        h.frames(0, 500, Some("mug"));
        h.frame(500, None);
        let effects = h.tracker.reset();
        assert!(effects.contains(&DwellEffect::Cancel(DwellTimer::Confirm)));
        assert!(effects.contains(&DwellEffect::Cancel(DwellTimer::Cancel)));
        h.apply(effects);
        h.advance_to(5000);
        assert!(h.detections.is_empty());
    }
}
