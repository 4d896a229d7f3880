//! Logging macros gated by a module-level `ENABLE_LOGS` flag.
//!
//! The scan pipeline runs once per camera frame, so the chattier modules need
//! a cheap way to go quiet without touching `RUST_LOG`.
//!
//! ```ignore
//! const ENABLE_LOGS: bool = true;
//!
//! use crate::{log_debug, log_warn};
//!
//! log_debug!("frame dropped {} malformed samples", dropped);
//! ```

/// Shared expansion for the level macros below. Not meant to be used directly.
#[doc(hidden)]
#[macro_export]
macro_rules! __scan_log {
    ($level:expr, $($arg:tt)*) => {
        if ENABLE_LOGS {
            log::log!(target: "scanreveal", $level, $($arg)*);
        }
    };
}

/// Per-frame noise: dropped samples, ignored frames, stale timers.
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        $crate::__scan_log!(log::Level::Debug, $($arg)*)
    };
}

/// Lifecycle transitions: arm, disarm, stable detections, presented actions.
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::__scan_log!(log::Level::Info, $($arg)*)
    };
}

/// Conditions the host should probably look at (bad media, re-entrant triggers).
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::__scan_log!(log::Level::Warn, $($arg)*)
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::__scan_log!(log::Level::Error, $($arg)*)
    };
}
