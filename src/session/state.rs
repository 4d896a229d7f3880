use tokio::time::Instant;
use uuid::Uuid;

use crate::config::ScanConfig;
use crate::detection::{DwellState, DwellTracker};
use crate::diagnostics::Diagnostics;
use crate::sequencer::{ActionSequencer, Presenters, SequencerState};

use super::timers::{TimerKind, TimerSet, TimerToken};

/// Everything one detection surface owns. Lives behind the controller's lock,
/// so frames, timer firings and completion signals see it one at a time.
#[derive(Debug)]
pub struct SessionState {
    pub session_id: Option<Uuid>,
    /// The host has the detection surface on screen.
    pub surface_active: bool,
    /// Gates stability evaluation. Off while disarmed and while a sequence runs.
    pub armed: bool,
    /// Bumped on every arm and disarm; part of every timer token.
    pub epoch: u64,
    pub dwell: DwellTracker,
    pub sequencer: ActionSequencer,
    pub timers: TimerSet,
    pub diagnostics: Diagnostics,
    /// Last frame with a best candidate (or the last arm).
    pub last_activity: Instant,
    hint_seq: u64,
}

/// Point-in-time copy of a session for hosts and tests.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub session_id: Option<Uuid>,
    pub armed: bool,
    pub dwell: DwellState,
    pub sequencer: SequencerState,
    pub pending_timers: Vec<TimerKind>,
}

impl SessionState {
    pub fn new(config: &ScanConfig, presenters: Presenters) -> Self {
        Self {
            session_id: None,
            surface_active: false,
            armed: false,
            epoch: 0,
            dwell: DwellTracker::new(config.dwell_config()),
            sequencer: ActionSequencer::new(config.playlist.clone(), presenters),
            timers: TimerSet::new(),
            diagnostics: Diagnostics::new(),
            last_activity: Instant::now(),
            hint_seq: 0,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id.unwrap_or_else(Uuid::nil)
    }

    /// Fresh detection: `Idle` dwell, no sequence, no timers, armed.
    pub fn arm(&mut self, now: Instant) {
        self.epoch = self.epoch.wrapping_add(1);
        self.timers.cancel_all();
        // the timers these effects refer to are already gone
        let _ = self.dwell.reset();
        self.sequencer.reset();
        self.last_activity = now;
        self.armed = true;
    }

    /// Stops evaluation and drops every pending timer. A running sequence is
    /// left alone so completion signals can still advance it.
    pub fn disarm(&mut self) {
        self.epoch = self.epoch.wrapping_add(1);
        self.timers.cancel_all();
        if !matches!(self.dwell.state(), DwellState::Stable { .. }) {
            let _ = self.dwell.reset();
        }
        self.armed = false;
    }

    pub fn token(&self, seq: u64) -> TimerToken {
        TimerToken {
            epoch: self.epoch,
            seq,
        }
    }

    pub fn next_hint_token(&mut self) -> TimerToken {
        self.hint_seq = self.hint_seq.wrapping_add(1);
        self.token(self.hint_seq)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.session_id,
            armed: self.armed,
            dwell: self.dwell.state().clone(),
            sequencer: self.sequencer.state().clone(),
            pending_timers: self.timers.pending(),
        }
    }
}
