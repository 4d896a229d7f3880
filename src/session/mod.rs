pub mod controller;
pub mod events;
pub mod state;
pub mod timers;

pub use controller::ScanController;
pub use events::{ChannelSink, EventSink, LogSink, ScanEvent};
pub use state::{SessionSnapshot, SessionState};
pub use timers::{TimerHandle, TimerKind, TimerSet, TimerToken};
