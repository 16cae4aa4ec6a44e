mod media;
mod queue;
mod service;

pub use media::{MediaElementKind, MediaIntent, MediaSession};
pub use queue::{PlaybackQueue, PlayerState, RepeatMode, RESTART_THRESHOLD_SECS};
pub use service::{PlayerEvent, PlayerStore, SLEEP_TIMER_RESOLUTION};
