use crate::blob_url::{BlobHandle, BlobUrlRegistry};
use crate::db::{Database, DbFile, DbPlaylist, DbTrack};
use crate::library::catalog::LoadedTrack;
use rand::seq::SliceRandom;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Display gradients a new playlist picks from
pub const PLAYLIST_GRADIENTS: [&str; 5] = [
    "from-indigo-500 via-purple-500 to-pink-500",
    "from-emerald-500 via-teal-500 to-cyan-500",
    "from-orange-500 via-amber-500 to-yellow-500",
    "from-blue-500 via-cyan-500 to-teal-500",
    "from-rose-500 via-pink-500 to-fuchsia-500",
];

#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Track not found: {0}")]
    TrackNotFound(String),
    #[error("Playlist not found: {0}")]
    PlaylistNotFound(i64),
    #[error("User not found: {0}")]
    UserNotFound(i64),
    #[error("Invalid user: {0}")]
    InvalidUser(String),
    #[error("Invalid playlist: {0}")]
    InvalidPlaylist(String),
    #[error("Invalid track: {0}")]
    InvalidTrack(String),
}

/// The main library manager for catalog, blob and playlist persistence
///
/// Handles:
/// - Stored file bytes and the byte-access handles derived from them
/// - Track records (rename, cascading delete)
/// - Playlists and their track links
#[derive(Clone)]
pub struct LibraryManager {
    database: Database,
    blob_urls: BlobUrlRegistry,
}

impl LibraryManager {
    /// Create a new library manager
    pub fn new(database: Database, blob_urls: BlobUrlRegistry) -> Self {
        LibraryManager {
            database,
            blob_urls,
        }
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn blob_urls(&self) -> &BlobUrlRegistry {
        &self.blob_urls
    }

    // ---- blob store ----

    /// Store file bytes, returning the new stored file id
    pub async fn save_file(&self, file: &DbFile) -> Result<i64, LibraryError> {
        Ok(self.database.insert_file(file).await?)
    }

    pub async fn file_exists(&self, path: &str, user_id: i64) -> Result<bool, LibraryError> {
        Ok(self.database.file_exists(path, user_id).await?)
    }

    pub async fn get_file(&self, file_id: i64) -> Result<Option<DbFile>, LibraryError> {
        Ok(self.database.get_file_by_id(file_id).await?)
    }

    pub async fn delete_file(&self, file_id: i64) -> Result<(), LibraryError> {
        Ok(self.database.delete_file(file_id).await?)
    }

    /// Issue a handle for stored bytes already in memory
    pub fn issue_handle(&self, file_id: i64, mime_type: &str, data: Arc<[u8]>) -> BlobHandle {
        self.blob_urls.create(file_id, mime_type, data)
    }

    // ---- catalog store ----

    pub async fn save_track(&self, track: &DbTrack) -> Result<(), LibraryError> {
        Ok(self.database.insert_track(track).await?)
    }

    pub async fn get_track(&self, track_id: &str) -> Result<Option<DbTrack>, LibraryError> {
        Ok(self.database.get_track_by_id(track_id).await?)
    }

    pub async fn get_track_titles(&self, user_id: i64) -> Result<Vec<String>, LibraryError> {
        Ok(self.database.get_track_titles_for_user(user_id).await?)
    }

    /// Load every track a user owns, each with a byte-access handle
    ///
    /// Tracks whose stored file is gone are left out. A handle already
    /// attached to a file is reused; bytes are read only for the others.
    pub async fn load_tracks_for_user(
        &self,
        user_id: i64,
    ) -> Result<Vec<LoadedTrack>, LibraryError> {
        let tracks = self.database.get_tracks_for_user(user_id).await?;
        let file_ids: HashSet<i64> = self
            .database
            .get_file_ids_for_user(user_id)
            .await?
            .into_iter()
            .collect();

        let mut loaded = Vec::with_capacity(tracks.len());
        let mut orphaned = 0;
        for track in tracks {
            if !file_ids.contains(&track.file_id) {
                orphaned += 1;
                continue;
            }
            match self.handle_for(track.file_id).await? {
                Some(blob) => loaded.push(LoadedTrack::new(track, Some(blob))),
                None => orphaned += 1,
            }
        }

        if orphaned > 0 {
            warn!(
                "Dropped {} tracks of user {} whose stored file is missing",
                orphaned, user_id
            );
        }
        debug!("Loaded {} tracks for user {}", loaded.len(), user_id);
        Ok(loaded)
    }

    /// Attached handle for a file known to exist, or a new one from its bytes
    async fn handle_for(&self, file_id: i64) -> Result<Option<BlobHandle>, LibraryError> {
        if let Some(handle) = self.blob_urls.attached(file_id) {
            return Ok(Some(handle));
        }
        Ok(self
            .database
            .get_file_by_id(file_id)
            .await?
            .map(|file| self.issue_handle(file.id, &file.mime_type, Arc::from(file.data))))
    }

    /// Persist a new title for a track
    pub async fn rename_track(
        &self,
        track_id: &str,
        title: &str,
    ) -> Result<DbTrack, LibraryError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(LibraryError::InvalidTrack(
                "track title cannot be empty".to_string(),
            ));
        }
        let updated = self.database.update_track_title(track_id, title).await?;
        if updated == 0 {
            return Err(LibraryError::TrackNotFound(track_id.to_string()));
        }
        self.get_track(track_id)
            .await?
            .ok_or_else(|| LibraryError::TrackNotFound(track_id.to_string()))
    }

    /// Delete a track, its stored file and every playlist link to it
    ///
    /// Returns false if there was no such track.
    pub async fn delete_track(&self, track_id: &str) -> Result<bool, LibraryError> {
        match self.database.delete_track_cascade(track_id).await? {
            Some(track) => {
                info!("Deleted track '{}' ({})", track.title, track.id);
                Ok(true)
            }
            None => {
                debug!("Delete of unknown track {} ignored", track_id);
                Ok(false)
            }
        }
    }

    // ---- playlists ----

    pub async fn create_playlist(
        &self,
        name: &str,
        user_id: i64,
        description: Option<&str>,
    ) -> Result<DbPlaylist, LibraryError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LibraryError::InvalidPlaylist(
                "playlist name cannot be empty".to_string(),
            ));
        }
        let description = description.map(str::trim).filter(|d| !d.is_empty());
        let gradient = PLAYLIST_GRADIENTS
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(PLAYLIST_GRADIENTS[0]);

        let mut playlist = DbPlaylist::new(name, description, user_id, gradient);
        playlist.id = self.database.insert_playlist(&playlist).await?;
        info!("Created playlist '{}' ({})", playlist.name, playlist.id);
        Ok(playlist)
    }

    pub async fn get_playlists(&self, user_id: i64) -> Result<Vec<DbPlaylist>, LibraryError> {
        Ok(self.database.get_playlists_for_user(user_id).await?)
    }

    pub async fn get_playlist(
        &self,
        playlist_id: i64,
    ) -> Result<Option<DbPlaylist>, LibraryError> {
        Ok(self.database.get_playlist_by_id(playlist_id).await?)
    }

    /// Delete a playlist owned by `user_id` along with its links
    pub async fn delete_playlist(
        &self,
        playlist_id: i64,
        user_id: i64,
    ) -> Result<(), LibraryError> {
        if !self.database.delete_playlist_cascade(playlist_id, user_id).await? {
            return Err(LibraryError::PlaylistNotFound(playlist_id));
        }
        info!("Deleted playlist {}", playlist_id);
        Ok(())
    }

    /// Resolve a playlist's links into playable tracks, in link order
    ///
    /// Links to deleted tracks, and tracks whose stored file is gone, are
    /// dropped. Tracks reuse a handle that is already attached to their file.
    pub async fn load_playlist_tracks(
        &self,
        playlist_id: i64,
    ) -> Result<Vec<LoadedTrack>, LibraryError> {
        let links = self.database.get_playlist_links(playlist_id).await?;

        let mut loaded = Vec::with_capacity(links.len());
        let mut dropped = 0;
        for link in links {
            let Some(track) = self.database.get_track_by_id(&link.track_id).await? else {
                dropped += 1;
                continue;
            };

            if !self.database.has_file(track.file_id).await? {
                dropped += 1;
                continue;
            }
            match self.handle_for(track.file_id).await? {
                Some(blob) => loaded.push(LoadedTrack::new(track, Some(blob))),
                None => dropped += 1,
            }
        }

        if dropped > 0 {
            warn!(
                "Dropped {} unresolvable entries from playlist {}",
                dropped, playlist_id
            );
        }
        Ok(loaded)
    }

    /// Link one track to a playlist; false if it was already linked or unknown
    pub async fn add_track_to_playlist(
        &self,
        playlist_id: i64,
        track_id: &str,
    ) -> Result<bool, LibraryError> {
        let added = self
            .add_tracks_to_playlist(playlist_id, &[track_id.to_string()])
            .await?;
        Ok(added == 1)
    }

    /// Link many tracks to a playlist in one transaction
    ///
    /// Unknown ids and ids already linked are skipped. Returns how many links
    /// were created.
    pub async fn add_tracks_to_playlist(
        &self,
        playlist_id: i64,
        track_ids: &[String],
    ) -> Result<usize, LibraryError> {
        let added = self
            .database
            .link_tracks_to_playlist(playlist_id, track_ids)
            .await?
            .ok_or(LibraryError::PlaylistNotFound(playlist_id))?;
        info!(
            "Added {} of {} tracks to playlist {}",
            added,
            track_ids.len(),
            playlist_id
        );
        Ok(added)
    }

    /// Unlink a track from a playlist; no-op if it was not linked
    pub async fn remove_track_from_playlist(
        &self,
        playlist_id: i64,
        track_id: &str,
    ) -> Result<(), LibraryError> {
        let removed = self
            .database
            .unlink_track_from_playlist(playlist_id, track_id)
            .await?;
        debug!(
            "Removed {} links of track {} from playlist {}",
            removed, track_id, playlist_id
        );
        Ok(())
    }

    /// Wipe every file, track and playlist a user owns, keeping the user
    pub async fn clear_user_data(&self, user_id: i64) -> Result<(), LibraryError> {
        self.database.delete_user_data(user_id, false).await?;
        info!("Cleared library data of user {}", user_id);
        Ok(())
    }
}
