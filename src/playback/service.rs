use crate::library::LoadedTrack;
use crate::playback::media::{MediaIntent, MediaSession};
use crate::playback::queue::{PlaybackQueue, PlayerState};
use crate::preferences::{PlayerPreferences, PreferenceFile};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

/// How often the sleep timer loop checks its deadline
pub const SLEEP_TIMER_RESOLUTION: Duration = Duration::from_secs(1);

/// Notifications for views of the player
#[derive(Debug, Clone)]
pub enum PlayerEvent {
    StateChanged { state: PlayerState },
    SleepTimerFired,
}

struct PlayerInner {
    queue: PlaybackQueue,
    session: MediaSession,
}

struct Shared {
    inner: Mutex<PlayerInner>,
    event_tx: broadcast::Sender<PlayerEvent>,
    intent_tx: mpsc::UnboundedSender<MediaIntent>,
    preferences: Option<PreferenceFile<PlayerPreferences>>,
}

/// Shared handle to the playback queue engine
///
/// Every operation applies a synchronous transition to the queue, then
/// sends the resulting media intents to the adapter and publishes the new
/// state. Volume, shuffle and repeat are written to the preference file
/// whenever they change.
#[derive(Clone)]
pub struct PlayerStore {
    shared: Arc<Shared>,
}

impl PlayerStore {
    /// Create a store, returning the receiving end of its media intents
    pub fn new(
        preferences: Option<PreferenceFile<PlayerPreferences>>,
    ) -> (Self, mpsc::UnboundedReceiver<MediaIntent>) {
        let initial = load_preferences(preferences.as_ref());
        Self::from_queue(PlaybackQueue::new(initial), preferences)
    }

    /// Like `new`, with a fixed source of randomness for shuffle
    pub fn with_rng(
        preferences: Option<PreferenceFile<PlayerPreferences>>,
        rng: StdRng,
    ) -> (Self, mpsc::UnboundedReceiver<MediaIntent>) {
        let initial = load_preferences(preferences.as_ref());
        Self::from_queue(PlaybackQueue::with_rng(initial, rng), preferences)
    }

    fn from_queue(
        queue: PlaybackQueue,
        preferences: Option<PreferenceFile<PlayerPreferences>>,
    ) -> (Self, mpsc::UnboundedReceiver<MediaIntent>) {
        let (event_tx, _) = broadcast::channel(64);
        let (intent_tx, intent_rx) = mpsc::unbounded_channel();
        let store = PlayerStore {
            shared: Arc::new(Shared {
                inner: Mutex::new(PlayerInner {
                    queue,
                    session: MediaSession::new(),
                }),
                event_tx,
                intent_tx,
                preferences,
            }),
        };
        (store, intent_rx)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.shared.event_tx.subscribe()
    }

    pub fn state(&self) -> PlayerState {
        self.shared.inner.lock().queue.state().clone()
    }

    pub fn play_track(&self, track: LoadedTrack, queue: Option<Vec<LoadedTrack>>) {
        debug!("Playing track {}", track.id());
        self.update(|q| q.play_track(track, queue));
    }

    pub fn toggle_play(&self) {
        self.update(PlaybackQueue::toggle_play);
    }

    pub fn play(&self) {
        self.update(PlaybackQueue::play);
    }

    pub fn pause(&self) {
        self.update(PlaybackQueue::pause);
    }

    pub fn next(&self) -> bool {
        self.update(PlaybackQueue::next)
    }

    pub fn previous(&self) -> bool {
        self.update(PlaybackQueue::previous)
    }

    pub fn set_queue(&self, queue: Vec<LoadedTrack>) {
        self.update(|q| q.set_queue(queue));
    }

    pub fn add_to_queue(&self, track: LoadedTrack) {
        self.update(|q| q.add_to_queue(track));
    }

    pub fn set_volume(&self, volume: f32) {
        self.update(|q| q.set_volume(volume));
    }

    pub fn toggle_shuffle(&self) {
        self.update(PlaybackQueue::toggle_shuffle);
    }

    pub fn toggle_repeat(&self) {
        self.update(PlaybackQueue::toggle_repeat);
    }

    /// Jump to `position` seconds in the current track
    pub fn seek(&self, position: f64) {
        self.update(|q| q.set_current_time(position));
    }

    pub fn set_sleep_timer(&self, deadline: Option<DateTime<Utc>>) {
        match deadline {
            Some(deadline) => info!("Sleep timer set for {}", deadline.to_rfc3339()),
            None => info!("Sleep timer cancelled"),
        }
        self.update(|q| q.set_sleep_timer(deadline));
    }

    /// Position report from the adapter; never produces intents
    pub fn set_current_time(&self, time: f64) {
        self.report(|q| q.set_current_time(time));
    }

    /// Duration report from the adapter; never produces intents
    pub fn set_duration(&self, duration: f64) {
        self.report(|q| q.set_duration(duration));
    }

    /// End-of-media signal from the adapter
    ///
    /// With repeat one the adapter is told to seek to the start and resume;
    /// otherwise the queue advances.
    pub fn on_media_ended(&self) {
        let mut inner = self.shared.inner.lock();
        let before = inner.queue.state().clone();
        let restarted = inner.queue.on_media_ended();
        let after = inner.queue.state().clone();
        let mut intents = inner.session.reconcile(&before, &after);
        if restarted {
            let seek = inner.session.seek(0.0);
            let play = inner.session.resume();
            for intent in [seek, play].into_iter().flatten() {
                if !intents.contains(&intent) {
                    intents.push(intent);
                }
            }
        }
        self.publish(&before, &after, intents);
        drop(inner);
        self.persist(&before, &after);
    }

    /// Check the sleep deadline once; pauses and returns true when it fired
    pub fn tick_sleep_timer(&self, now: DateTime<Utc>) -> bool {
        let fired = self.update(|q| q.check_sleep_timer(now));
        if fired {
            info!("Sleep timer fired, pausing playback");
            let _ = self.shared.event_tx.send(PlayerEvent::SleepTimerFired);
        }
        fired
    }

    /// Start the background loop that drives the sleep timer
    ///
    /// The loop ends once every clone of the store has been dropped.
    pub fn spawn_sleep_timer(&self) -> tokio::task::JoinHandle<()> {
        let weak: Weak<Shared> = Arc::downgrade(&self.shared);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(SLEEP_TIMER_RESOLUTION);
            loop {
                ticker.tick().await;
                let Some(shared) = weak.upgrade() else {
                    debug!("Player dropped, stopping sleep timer loop");
                    break;
                };
                PlayerStore { shared }.tick_sleep_timer(Utc::now());
            }
        })
    }

    fn update<R>(&self, f: impl FnOnce(&mut PlaybackQueue) -> R) -> R {
        let mut inner = self.shared.inner.lock();
        let before = inner.queue.state().clone();
        let result = f(&mut inner.queue);
        let after = inner.queue.state().clone();
        let intents = inner.session.reconcile(&before, &after);
        // Sent under the lock so concurrent callers cannot reorder intents
        self.publish(&before, &after, intents);
        drop(inner);
        self.persist(&before, &after);
        result
    }

    fn report(&self, f: impl FnOnce(&mut PlaybackQueue)) {
        let mut inner = self.shared.inner.lock();
        let before = inner.queue.state().clone();
        f(&mut inner.queue);
        self.publish(&before, inner.queue.state(), Vec::new());
    }

    fn publish(&self, before: &PlayerState, after: &PlayerState, intents: Vec<MediaIntent>) {
        for intent in intents {
            if self.shared.intent_tx.send(intent).is_err() {
                debug!("No media adapter attached, dropping intent");
            }
        }
        if before != after {
            let _ = self.shared.event_tx.send(PlayerEvent::StateChanged {
                state: after.clone(),
            });
        }
    }

    fn persist(&self, before: &PlayerState, after: &PlayerState) {
        let Some(file) = &self.shared.preferences else {
            return;
        };
        let preferences = after.preferences();
        if preferences == before.preferences() {
            return;
        }
        if let Err(e) = file.save(&preferences) {
            warn!(
                "Failed to save player preferences to {}: {}",
                file.path().display(),
                e
            );
        }
    }
}

fn load_preferences(file: Option<&PreferenceFile<PlayerPreferences>>) -> PlayerPreferences {
    file.map(PreferenceFile::load).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbTrack;
    use crate::playback::RepeatMode;
    use rand::SeedableRng;
    use tempfile::TempDir;

    fn bare(title: &str) -> LoadedTrack {
        LoadedTrack::new(DbTrack::new(title, "Artist", "Album", 60.0, 1, 1, false), None)
    }

    #[tokio::test]
    async fn test_state_changes_are_broadcast() {
        let (store, _intents) = PlayerStore::new(None);
        let mut events = store.subscribe();

        store.play_track(bare("A"), None);
        match events.recv().await.unwrap() {
            PlayerEvent::StateChanged { state } => {
                assert!(state.is_playing);
                assert_eq!(state.queue.len(), 1);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_preferences_survive_restart() {
        let dir = TempDir::new().unwrap();
        let file = PreferenceFile::new(dir.path().join("player-storage.json"));

        let (store, _intents) = PlayerStore::new(Some(file.clone()));
        store.set_volume(0.25);
        store.toggle_shuffle();
        store.toggle_repeat();
        drop(store);

        let (store, _intents) = PlayerStore::new(Some(file));
        let state = store.state();
        assert_eq!(state.volume, 0.25);
        assert!(state.shuffle);
        assert_eq!(state.repeat, RepeatMode::One);
        assert!(state.current_track.is_none());
    }

    #[tokio::test]
    async fn test_sleep_timer_tick() {
        let (store, _intents) =
            PlayerStore::with_rng(None, StdRng::seed_from_u64(1));
        let mut events = store.subscribe();
        store.play_track(bare("A"), None);

        let now = Utc::now();
        store.set_sleep_timer(Some(now));
        assert!(store.tick_sleep_timer(now));
        assert!(!store.state().is_playing);
        assert!(store.state().sleep_timer.is_none());

        let mut fired = false;
        while let Ok(event) = events.try_recv() {
            fired |= matches!(event, PlayerEvent::SleepTimerFired);
        }
        assert!(fired);
    }

    #[tokio::test]
    async fn test_time_reports_produce_no_intents() {
        let (store, mut intents) = PlayerStore::new(None);
        store.set_current_time(12.0);
        store.set_duration(60.0);
        assert!(intents.try_recv().is_err());
        assert_eq!(store.state().current_time, 12.0);
        assert_eq!(store.state().duration, 60.0);
    }
}
