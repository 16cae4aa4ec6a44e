use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Type;
use uuid::Uuid;

// String constants for stored media kinds (keep in sync with as_str())
const MEDIA_KIND_AUDIO: &str = "audio";
const MEDIA_KIND_VIDEO: &str = "video";

/// Database models for the playnest library
///
/// Every row belongs to exactly one user:
/// - Users own stored files, tracks and playlists
/// - A track points at the stored file holding its bytes
/// - Playlists reference tracks through link rows
///
/// Relationships are enforced by the library layer, not by foreign keys.
/// Integer ids are assigned by SQLite on insert; track ids are UUIDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Video,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Audio => MEDIA_KIND_AUDIO,
            MediaKind::Video => MEDIA_KIND_VIDEO,
        }
    }

    pub fn is_video(&self) -> bool {
        matches!(self, MediaKind::Video)
    }

    /// MIME type recorded when the source file did not declare one
    pub fn default_mime_type(&self) -> &'static str {
        match self {
            MediaKind::Audio => "audio/mpeg",
            MediaKind::Video => "video/mp4",
        }
    }
}

/// A person using the library
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DbUser {
    pub id: i64,
    pub username: String,
    pub email: String,
    /// Display colour picked at creation, e.g. `hsl(200, 90%, 60%)`
    pub avatar_color: String,
    pub created_at: DateTime<Utc>,
}

impl DbUser {
    /// Create a user that has not been saved yet (id is assigned on insert)
    pub fn new(username: &str, email: &str, avatar_color: &str) -> Self {
        DbUser {
            id: 0,
            username: username.to_string(),
            email: email.to_string(),
            avatar_color: avatar_color.to_string(),
            created_at: Utc::now(),
        }
    }
}

/// Raw bytes of an imported media file
///
/// `(path, user_id)` is unique. Imports store the file name as the path.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct DbFile {
    pub id: i64,
    pub path: String,
    pub name: String,
    pub media_type: MediaKind,
    pub mime_type: String,
    /// Size in bytes
    pub size: i64,
    pub user_id: i64,
    pub data: Vec<u8>,
    pub created_at: DateTime<Utc>,
}

impl DbFile {
    pub fn new(
        name: &str,
        media_type: MediaKind,
        mime_type: &str,
        user_id: i64,
        data: Vec<u8>,
    ) -> Self {
        DbFile {
            id: 0,
            path: name.to_string(),
            name: name.to_string(),
            media_type,
            mime_type: mime_type.to_string(),
            size: data.len() as i64,
            user_id,
            data,
            created_at: Utc::now(),
        }
    }
}

// Byte payloads are far too large to print
impl std::fmt::Debug for DbFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbFile")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("media_type", &self.media_type)
            .field("mime_type", &self.mime_type)
            .field("size", &self.size)
            .field("user_id", &self.user_id)
            .finish()
    }
}

/// A catalog entry describing one playable item
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DbTrack {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    /// Duration in seconds, 0 when it could not be determined
    pub duration: f64,
    pub file_id: i64,
    pub user_id: i64,
    pub cover_url: Option<String>,
    pub is_video: bool,
    pub added_at: DateTime<Utc>,
}

impl DbTrack {
    pub fn new(
        title: &str,
        artist: &str,
        album: &str,
        duration: f64,
        file_id: i64,
        user_id: i64,
        is_video: bool,
    ) -> Self {
        DbTrack {
            id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            artist: artist.to_string(),
            album: album.to_string(),
            duration,
            file_id,
            user_id,
            cover_url: None,
            is_video,
            added_at: Utc::now(),
        }
    }
}

/// A user-curated ordered collection of tracks
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DbPlaylist {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub user_id: i64,
    pub cover_url: Option<String>,
    /// Display gradient picked at creation
    pub gradient: String,
    pub created_at: DateTime<Utc>,
}

impl DbPlaylist {
    pub fn new(name: &str, description: Option<&str>, user_id: i64, gradient: &str) -> Self {
        DbPlaylist {
            id: 0,
            name: name.to_string(),
            description: description.map(str::to_string),
            user_id,
            cover_url: None,
            gradient: gradient.to_string(),
            created_at: Utc::now(),
        }
    }
}

/// Membership of a track in a playlist
///
/// Links are ordered by `added_at`. At most one link exists per
/// (playlist, track) pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DbPlaylistTrack {
    pub id: i64,
    pub playlist_id: i64,
    pub track_id: String,
    pub added_at: DateTime<Utc>,
}
