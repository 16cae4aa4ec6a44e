use crate::playback::RepeatMode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

pub const DEFAULT_VOLUME: f32 = 0.7;

#[derive(Error, Debug)]
pub enum PreferencesError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Player settings that survive a restart
///
/// Queue, current track and position are not stored and reset on
/// every launch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerPreferences {
    pub volume: f32,
    pub shuffle: bool,
    pub repeat: RepeatMode,
}

impl Default for PlayerPreferences {
    fn default() -> Self {
        PlayerPreferences {
            volume: DEFAULT_VOLUME,
            shuffle: false,
            repeat: RepeatMode::None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionPreferences {
    pub current_user_id: Option<i64>,
}

/// A JSON document holding one kind of preferences
pub struct PreferenceFile<T> {
    path: PathBuf,
    _marker: PhantomData<fn() -> T>,
}

impl<T> std::fmt::Debug for PreferenceFile<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreferenceFile")
            .field("path", &self.path)
            .finish()
    }
}

impl<T> Clone for PreferenceFile<T> {
    fn clone(&self) -> Self {
        PreferenceFile {
            path: self.path.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: Serialize + DeserializeOwned + Default> PreferenceFile<T> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        PreferenceFile {
            path: path.into(),
            _marker: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored value; a missing or unreadable file yields defaults
    pub fn load(&self) -> T {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return T::default(),
            Err(e) => {
                warn!("Failed to read {}: {}", self.path.display(), e);
                return T::default();
            }
        };

        serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!("Ignoring corrupt preferences {}: {}", self.path.display(), e);
            T::default()
        })
    }

    /// Write the value, replacing the previous file atomically
    pub fn save(&self, value: &T) -> Result<(), PreferencesError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(value)?;
        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, json)?;
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}
