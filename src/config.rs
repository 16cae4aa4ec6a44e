use crate::import::ImportConfig;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

/// Application configuration
/// In debug builds a .env file is loaded first; environment variables win
/// over the defaults in every build.
#[derive(Clone, Debug)]
pub struct Config {
    /// Directory holding the database and preference files
    pub library_path: PathBuf,
    /// Upper bound for reading a file's duration during import
    pub metadata_timeout: Duration,
}

impl Config {
    /// Load configuration based on build mode
    pub fn load() -> Self {
        #[cfg(debug_assertions)]
        {
            if dotenvy::dotenv().is_ok() {
                info!("Dev mode activated - loaded .env file");
            }
        }

        Self::from_env()
    }

    /// Load configuration from environment variables
    fn from_env() -> Self {
        let library_path = std::env::var("PLAYNEST_LIBRARY_PATH")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_library_path);

        let metadata_timeout = match std::env::var("PLAYNEST_METADATA_TIMEOUT_MS") {
            Ok(value) => match value.trim().parse::<u64>() {
                Ok(ms) => Duration::from_millis(ms),
                Err(_) => {
                    warn!("Ignoring invalid PLAYNEST_METADATA_TIMEOUT_MS '{}'", value);
                    ImportConfig::default().metadata_timeout
                }
            },
            Err(_) => ImportConfig::default().metadata_timeout,
        };

        info!("Library path: {}", library_path.display());

        Self {
            library_path,
            metadata_timeout,
        }
    }

    /// Configuration rooted at an explicit directory
    pub fn with_library_path(library_path: impl Into<PathBuf>) -> Self {
        Self {
            library_path: library_path.into(),
            metadata_timeout: ImportConfig::default().metadata_timeout,
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.library_path.join("library.db")
    }

    pub fn player_preferences_path(&self) -> PathBuf {
        self.library_path.join("player-storage.json")
    }

    pub fn session_path(&self) -> PathBuf {
        self.library_path.join("playnest-user.json")
    }

    pub fn import_config(&self) -> ImportConfig {
        ImportConfig {
            metadata_timeout: self.metadata_timeout,
            ..ImportConfig::default()
        }
    }
}

/// `~/.playnest`, or `.playnest` in the working directory without a home
fn default_library_path() -> PathBuf {
    match dirs::home_dir() {
        Some(home) => home.join(".playnest"),
        None => {
            warn!("No home directory found, using ./.playnest");
            PathBuf::from(".playnest")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_paths() {
        let config = Config::with_library_path("/tmp/nest");
        assert_eq!(config.database_path(), PathBuf::from("/tmp/nest/library.db"));
        assert_eq!(
            config.player_preferences_path(),
            PathBuf::from("/tmp/nest/player-storage.json")
        );
        assert_eq!(
            config.session_path(),
            PathBuf::from("/tmp/nest/playnest-user.json")
        );
        assert_eq!(config.import_config().metadata_timeout, Duration::from_secs(5));
    }
}
