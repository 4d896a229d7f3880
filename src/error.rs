//! Conditions the scan pipeline recovers from.
//!
//! None of these are fatal: the controller logs them, counts them in
//! [`Diagnostics`](crate::diagnostics::Diagnostics) and keeps scanning.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScanError {
    #[error("malformed sample: {0}")]
    MalformedSample(String),

    #[error("no actions configured for label {0}")]
    UnknownLabel(String),

    #[error("stale {0} ignored")]
    StaleCallback(String),

    #[error("sequence for {active} in progress, ignoring trigger for {requested}")]
    ReentrantTrigger { active: String, requested: String },

    #[error("unusable media at step {index} of {label}: {reason}")]
    BadMedia {
        label: String,
        index: usize,
        reason: String,
    },
}

impl ScanError {
    pub fn stale(what: impl Into<String>) -> Self {
        ScanError::StaleCallback(what.into())
    }
}
