//! One-shot timers on the tokio clock.
//!
//! A fired timer only hands its token back. Whoever owns the [`TimerSet`]
//! must `claim` the token under its lock before acting, since a timer can
//! fire after it was replaced or cancelled.

use std::collections::HashMap;
use std::future::Future;

use tokio::task::JoinHandle;
use tokio::time::{self, Duration, Instant};

use crate::detection::DwellTimer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    Confirm,
    Cancel,
    IdleHint,
}

impl From<DwellTimer> for TimerKind {
    fn from(timer: DwellTimer) -> Self {
        match timer {
            DwellTimer::Confirm => TimerKind::Confirm,
            DwellTimer::Cancel => TimerKind::Cancel,
        }
    }
}

/// Identifies one scheduling. `epoch` changes on every arm/disarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerToken {
    pub epoch: u64,
    pub seq: u64,
}

#[derive(Debug)]
pub struct TimerHandle {
    kind: TimerKind,
    token: TimerToken,
    task: JoinHandle<()>,
}

/// Runs `on_fire(kind, token)` once `delay` has passed.
pub fn schedule<F, Fut>(kind: TimerKind, token: TimerToken, delay: Duration, on_fire: F) -> TimerHandle
where
    F: FnOnce(TimerKind, TimerToken) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let deadline = Instant::now() + delay;
    let task = tokio::spawn(async move {
        time::sleep_until(deadline).await;
        on_fire(kind, token).await;
    });
    TimerHandle { kind, token, task }
}

pub fn cancel(handle: TimerHandle) {
    handle.task.abort();
}

/// At most one pending timer per kind.
#[derive(Debug, Default)]
pub struct TimerSet {
    slots: HashMap<TimerKind, TimerHandle>,
}

impl TimerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `handle`, cancelling whatever was pending for its kind.
    pub fn insert(&mut self, handle: TimerHandle) {
        if let Some(previous) = self.slots.insert(handle.kind, handle) {
            cancel(previous);
        }
    }

    pub fn cancel(&mut self, kind: TimerKind) -> bool {
        match self.slots.remove(&kind) {
            Some(handle) => {
                cancel(handle);
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&mut self) {
        for (_, handle) in self.slots.drain() {
            cancel(handle);
        }
    }

    pub fn is_pending(&self, kind: TimerKind) -> bool {
        self.slots.contains_key(&kind)
    }

    pub fn pending(&self) -> Vec<TimerKind> {
        let mut kinds: Vec<TimerKind> = self.slots.keys().copied().collect();
        kinds.sort_by_key(|kind| *kind as u8);
        kinds
    }

    /// Takes ownership of a fired timer's slot. False when the token was
    /// superseded or cancelled, in which case the caller must do nothing.
    pub fn claim(&mut self, kind: TimerKind, token: TimerToken) -> bool {
        match self.slots.get(&kind) {
            Some(handle) if handle.token == token => {
                self.slots.remove(&kind);
                true
            }
            _ => false,
        }
    }
}

impl Drop for TimerSet {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
