use crate::blob_url::BlobUrlRegistry;
use crate::config::Config;
use crate::db::{Database, DbTrack, DbUser};
use crate::import::{ImportService, SymphoniaProbe};
use crate::library::{IdentityStore, LibraryError, LibraryManager, Session, TrackCatalog};
use crate::playback::{MediaIntent, PlayerStore};
use crate::preferences::PreferenceFile;
use parking_lot::Mutex;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum InitError {
    #[error("Cannot create library directory: {0}")]
    Io(#[from] std::io::Error),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Library error: {0}")]
    Library(#[from] LibraryError),
}

/// Every long-lived service, wired together once at startup
#[derive(Clone)]
pub struct AppContext {
    pub config: Config,
    pub library_manager: LibraryManager,
    pub identity: IdentityStore,
    pub catalog: TrackCatalog,
    pub import_service: ImportService,
    pub player: PlayerStore,
    session: Arc<Mutex<Session>>,
    media_intents: Arc<Mutex<Option<mpsc::UnboundedReceiver<MediaIntent>>>>,
}

impl AppContext {
    /// Open the library under `config.library_path` and start the services
    pub async fn initialize(config: Config) -> Result<Self, InitError> {
        std::fs::create_dir_all(&config.library_path)?;

        let database_path = config.database_path();
        let database = Database::new(database_path.to_string_lossy().as_ref()).await?;
        info!("Opened library at {}", database_path.display());

        let blob_urls = BlobUrlRegistry::new();
        let library_manager = LibraryManager::new(database.clone(), blob_urls);
        let identity = IdentityStore::new(database);
        let catalog = TrackCatalog::new();

        let import_service = ImportService::new(
            library_manager.clone(),
            catalog.clone(),
            Arc::new(SymphoniaProbe),
            config.import_config(),
            tokio::runtime::Handle::current(),
        );

        let (player, intents) = PlayerStore::new(Some(PreferenceFile::new(
            config.player_preferences_path(),
        )));
        player.spawn_sleep_timer();

        let session = Session::restore(
            &identity,
            catalog.clone(),
            PreferenceFile::new(config.session_path()),
        )
        .await?;

        let context = AppContext {
            config,
            library_manager,
            identity,
            catalog,
            import_service,
            player,
            session: Arc::new(Mutex::new(session)),
            media_intents: Arc::new(Mutex::new(Some(intents))),
        };

        if let Some(user) = context.current_user() {
            context.reload_catalog(user.id).await?;
        }
        Ok(context)
    }

    /// The receiving end of the player's media intents; only the first caller gets it
    pub fn take_media_intents(&self) -> Option<mpsc::UnboundedReceiver<MediaIntent>> {
        self.media_intents.lock().take()
    }

    pub fn current_user(&self) -> Option<DbUser> {
        self.session.lock().current_user().cloned()
    }

    /// Make `user_id` the current user and load their tracks
    pub async fn switch_user(&self, user_id: i64) -> Result<DbUser, LibraryError> {
        let user = self
            .identity
            .get_user(user_id)
            .await?
            .ok_or(LibraryError::UserNotFound(user_id))?;
        self.session.lock().switch_user(user.clone());
        self.reload_catalog(user.id).await?;
        Ok(user)
    }

    pub fn logout(&self) {
        self.session.lock().logout();
    }

    /// Delete a user and everything they own
    pub async fn delete_user(&self, user_id: i64) -> Result<(), LibraryError> {
        if self.is_current(user_id) {
            self.logout();
        }
        self.identity.delete_user(user_id).await
    }

    /// Wipe a user's files, tracks and playlists but keep the account
    pub async fn clear_user_data(&self, user_id: i64) -> Result<(), LibraryError> {
        self.library_manager.clear_user_data(user_id).await?;
        if self.is_current(user_id) {
            self.catalog.clear();
        }
        Ok(())
    }

    /// Delete a track everywhere and drop it from the catalog view
    pub async fn delete_track(&self, track_id: &str) -> Result<bool, LibraryError> {
        let deleted = self.library_manager.delete_track(track_id).await?;
        if self.catalog.remove_track(track_id).is_some() {
            debug!("Removed track {} from the catalog view", track_id);
        }
        Ok(deleted)
    }

    /// Rename a track and update the catalog view in place
    pub async fn rename_track(&self, track_id: &str, title: &str) -> Result<DbTrack, LibraryError> {
        let track = self.library_manager.rename_track(track_id, title).await?;
        self.catalog.update_track(&track);
        Ok(track)
    }

    async fn reload_catalog(&self, user_id: i64) -> Result<(), LibraryError> {
        let tracks = self.library_manager.load_tracks_for_user(user_id).await?;
        self.catalog.set_tracks(tracks);
        Ok(())
    }

    fn is_current(&self, user_id: i64) -> bool {
        self.session
            .lock()
            .current_user()
            .is_some_and(|user| user.id == user_id)
    }
}
