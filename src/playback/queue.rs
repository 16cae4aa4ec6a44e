use crate::library::LoadedTrack;
use crate::preferences::PlayerPreferences;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// `previous` restarts the current track instead once playback is past this point
pub const RESTART_THRESHOLD_SECS: f64 = 3.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    #[default]
    None,
    One,
    All,
}

impl RepeatMode {
    /// none → one → all → none
    pub fn cycle(self) -> Self {
        match self {
            RepeatMode::None => RepeatMode::One,
            RepeatMode::One => RepeatMode::All,
            RepeatMode::All => RepeatMode::None,
        }
    }
}

/// Snapshot of everything the player knows
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerState {
    pub current_track: Option<LoadedTrack>,
    pub queue: Vec<LoadedTrack>,
    pub is_playing: bool,
    /// 0.0 ..= 1.0
    pub volume: f32,
    /// Seconds into the current track
    pub current_time: f64,
    /// Seconds, as reported by the media adapter
    pub duration: f64,
    pub shuffle: bool,
    pub repeat: RepeatMode,
    pub sleep_timer: Option<DateTime<Utc>>,
}

impl PlayerState {
    fn with_preferences(preferences: PlayerPreferences) -> Self {
        PlayerState {
            current_track: None,
            queue: Vec::new(),
            is_playing: false,
            volume: preferences.volume.clamp(0.0, 1.0),
            current_time: 0.0,
            duration: 0.0,
            shuffle: preferences.shuffle,
            repeat: preferences.repeat,
            sleep_timer: None,
        }
    }

    pub fn current_track_id(&self) -> Option<&str> {
        self.current_track.as_ref().map(LoadedTrack::id)
    }

    pub fn preferences(&self) -> PlayerPreferences {
        PlayerPreferences {
            volume: self.volume,
            shuffle: self.shuffle,
            repeat: self.repeat,
        }
    }
}

/// Queue and transport state machine
///
/// Pure in-memory logic: nothing here touches media elements or storage.
/// Navigation finds the current track in the queue by id, so the queue may
/// be edited between calls.
pub struct PlaybackQueue {
    state: PlayerState,
    rng: StdRng,
}

impl PlaybackQueue {
    pub fn new(preferences: PlayerPreferences) -> Self {
        Self::with_rng(preferences, StdRng::from_entropy())
    }

    /// Deterministic shuffling for a given seed
    pub fn with_rng(preferences: PlayerPreferences, rng: StdRng) -> Self {
        PlaybackQueue {
            state: PlayerState::with_preferences(preferences),
            rng,
        }
    }

    pub fn state(&self) -> &PlayerState {
        &self.state
    }

    fn current_index(&self) -> Option<Option<usize>> {
        let current = self.state.current_track.as_ref()?;
        Some(self.state.queue.iter().position(|t| t.id() == current.id()))
    }

    /// Start `track`, replacing the queue with `queue` or just the track itself
    pub fn play_track(&mut self, track: LoadedTrack, queue: Option<Vec<LoadedTrack>>) {
        self.state.queue = queue.unwrap_or_else(|| vec![track.clone()]);
        self.state.current_track = Some(track);
        self.state.is_playing = true;
        self.state.current_time = 0.0;
    }

    pub fn set_queue(&mut self, queue: Vec<LoadedTrack>) {
        self.state.queue = queue;
    }

    pub fn add_to_queue(&mut self, track: LoadedTrack) {
        self.state.queue.push(track);
    }

    pub fn play(&mut self) {
        self.state.is_playing = true;
    }

    pub fn pause(&mut self) {
        self.state.is_playing = false;
    }

    pub fn toggle_play(&mut self) {
        self.state.is_playing = !self.state.is_playing;
    }

    /// Advance to the next track. Returns false when nothing changed.
    pub fn next(&mut self) -> bool {
        if self.state.queue.is_empty() {
            return false;
        }
        let Some(index) = self.current_index() else {
            return false;
        };

        if self.state.shuffle {
            let current_id = self.state.current_track_id().unwrap_or_default().to_string();
            let pool: Vec<usize> = (0..self.state.queue.len())
                .filter(|&i| self.state.queue[i].id() != current_id)
                .collect();
            if pool.is_empty() {
                return false;
            }
            let pick = pool[self.rng.gen_range(0..pool.len())];
            self.move_to(pick);
            return true;
        }

        // A current track missing from the queue advances to the start
        let next_index = index.map_or(0, |i| i + 1);
        if next_index < self.state.queue.len() {
            self.move_to(next_index);
            true
        } else if self.state.repeat == RepeatMode::All {
            self.move_to(0);
            true
        } else {
            false
        }
    }

    /// Restart the current track, or step back one track near its start
    pub fn previous(&mut self) -> bool {
        if self.state.queue.is_empty() {
            return false;
        }
        let Some(index) = self.current_index() else {
            return false;
        };

        if self.state.current_time > RESTART_THRESHOLD_SECS {
            self.state.current_time = 0.0;
            return true;
        }

        match index {
            Some(i) if i > 0 => self.move_to(i - 1),
            _ => self.state.current_time = 0.0,
        }
        true
    }

    fn move_to(&mut self, index: usize) {
        self.state.current_track = Some(self.state.queue[index].clone());
        self.state.current_time = 0.0;
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.state.volume = if volume.is_finite() {
            volume.clamp(0.0, 1.0)
        } else {
            self.state.volume
        };
    }

    pub fn set_current_time(&mut self, time: f64) {
        if time.is_finite() {
            self.state.current_time = time.max(0.0);
        }
    }

    pub fn set_duration(&mut self, duration: f64) {
        self.state.duration = if duration.is_finite() && duration > 0.0 {
            duration
        } else {
            0.0
        };
    }

    pub fn toggle_shuffle(&mut self) {
        self.state.shuffle = !self.state.shuffle;
    }

    pub fn toggle_repeat(&mut self) {
        self.state.repeat = self.state.repeat.cycle();
    }

    /// Arm the sleep timer, or cancel it with `None`
    pub fn set_sleep_timer(&mut self, deadline: Option<DateTime<Utc>>) {
        self.state.sleep_timer = deadline;
    }

    /// Pause if the sleep deadline has passed. Returns true when it fired.
    pub fn check_sleep_timer(&mut self, now: DateTime<Utc>) -> bool {
        match self.state.sleep_timer {
            Some(deadline) if now >= deadline => {
                self.state.is_playing = false;
                self.state.sleep_timer = None;
                true
            }
            _ => false,
        }
    }

    /// Handle the adapter reporting that the current media finished
    ///
    /// With repeat one the current track starts over; otherwise this is
    /// `next()`. Returns true when the current track restarts.
    pub fn on_media_ended(&mut self) -> bool {
        if self.state.repeat == RepeatMode::One && self.state.current_track.is_some() {
            self.state.current_time = 0.0;
            self.state.is_playing = true;
            true
        } else {
            self.next();
            false
        }
    }
}
