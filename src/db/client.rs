use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};

use crate::db::models::*;
use crate::db::schema;

#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Initialize database connection and bring the schema up to date
    pub async fn new(database_path: &str) -> Result<Self, sqlx::Error> {
        // Use sqlite:// with ?mode=rwc to create if it doesn't exist
        let database_url = format!("sqlite://{}?mode=rwc", database_path);
        info!("Connecting to {}", database_url);
        let pool = SqlitePool::connect(&database_url).await?;

        schema::migrate(&pool).await?;
        Ok(Database { pool })
    }

    pub async fn schema_version(&self) -> Result<i64, sqlx::Error> {
        schema::schema_version(&self.pool).await
    }

    // ---- users ----

    pub async fn insert_user(&self, user: &DbUser) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (username, email, avatar_color, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.avatar_color)
        .bind(user.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn get_users(&self) -> Result<Vec<DbUser>, sqlx::Error> {
        let rows = sqlx::query("SELECT * FROM users ORDER BY created_at, id")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(user_from_row).collect()
    }

    pub async fn get_user_by_id(&self, user_id: i64) -> Result<Option<DbUser>, sqlx::Error> {
        let row = sqlx::query("SELECT * FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<DbUser>, sqlx::Error> {
        let row = sqlx::query("SELECT * FROM users WHERE email = ? ORDER BY id LIMIT 1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    /// Delete everything a user owns, and optionally the user row itself
    ///
    /// Playlist links, playlists, tracks and stored files are removed in a
    /// single transaction.
    pub async fn delete_user_data(
        &self,
        user_id: i64,
        delete_user_row: bool,
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            DELETE FROM playlist_tracks
            WHERE playlist_id IN (SELECT id FROM playlists WHERE user_id = ?)
               OR track_id IN (SELECT id FROM tracks WHERE user_id = ?)
            "#,
        )
        .bind(user_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM playlists WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM tracks WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM files WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        if delete_user_row {
            sqlx::query("DELETE FROM users WHERE id = ?")
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    // ---- stored files ----

    pub async fn insert_file(&self, file: &DbFile) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO files (
                path, name, media_type, mime_type, size, user_id, data, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&file.path)
        .bind(&file.name)
        .bind(file.media_type)
        .bind(&file.mime_type)
        .bind(file.size)
        .bind(file.user_id)
        .bind(&file.data)
        .bind(file.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn get_file_by_id(&self, file_id: i64) -> Result<Option<DbFile>, sqlx::Error> {
        let row = sqlx::query("SELECT * FROM files WHERE id = ?")
            .bind(file_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(file_from_row).transpose()
    }

    pub async fn get_files_for_user(&self, user_id: i64) -> Result<Vec<DbFile>, sqlx::Error> {
        let rows = sqlx::query("SELECT * FROM files WHERE user_id = ? ORDER BY id")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(file_from_row).collect()
    }

    /// Ids of a user's stored files, without loading their bytes
    pub async fn get_file_ids_for_user(&self, user_id: i64) -> Result<Vec<i64>, sqlx::Error> {
        sqlx::query_scalar("SELECT id FROM files WHERE user_id = ? ORDER BY id")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
    }

    pub async fn has_file(&self, file_id: i64) -> Result<bool, sqlx::Error> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM files WHERE id = ?")
            .bind(file_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    pub async fn file_exists(&self, path: &str, user_id: i64) -> Result<bool, sqlx::Error> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM files WHERE path = ? AND user_id = ?")
                .bind(path)
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count > 0)
    }

    pub async fn delete_file(&self, file_id: i64) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM files WHERE id = ?")
            .bind(file_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // ---- tracks ----

    pub async fn insert_track(&self, track: &DbTrack) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO tracks (
                id, title, artist, album, duration, file_id, user_id,
                cover_url, is_video, added_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&track.id)
        .bind(&track.title)
        .bind(&track.artist)
        .bind(&track.album)
        .bind(track.duration)
        .bind(track.file_id)
        .bind(track.user_id)
        .bind(&track.cover_url)
        .bind(track.is_video)
        .bind(track.added_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_track_by_id(&self, track_id: &str) -> Result<Option<DbTrack>, sqlx::Error> {
        let row = sqlx::query("SELECT * FROM tracks WHERE id = ?")
            .bind(track_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(track_from_row).transpose()
    }

    pub async fn get_tracks_for_user(&self, user_id: i64) -> Result<Vec<DbTrack>, sqlx::Error> {
        let rows = sqlx::query("SELECT * FROM tracks WHERE user_id = ? ORDER BY added_at, rowid")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(track_from_row).collect()
    }

    pub async fn get_track_titles_for_user(&self, user_id: i64) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar("SELECT title FROM tracks WHERE user_id = ?")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
    }

    /// Returns the number of rows updated
    pub async fn update_track_title(&self, track_id: &str, title: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("UPDATE tracks SET title = ? WHERE id = ?")
            .bind(title)
            .bind(track_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Delete a track together with its stored file and playlist links
    ///
    /// Runs in one transaction: stored file, then track, then links.
    /// Returns the deleted track, or `None` if it did not exist.
    pub async fn delete_track_cascade(&self, track_id: &str) -> Result<Option<DbTrack>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT * FROM tracks WHERE id = ?")
            .bind(track_id)
            .fetch_optional(&mut *tx)
            .await?;
        let track = match row.as_ref().map(track_from_row).transpose()? {
            Some(track) => track,
            None => return Ok(None),
        };

        sqlx::query("DELETE FROM files WHERE id = ?")
            .bind(track.file_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM tracks WHERE id = ?")
            .bind(&track.id)
            .execute(&mut *tx)
            .await?;

        let links = sqlx::query("DELETE FROM playlist_tracks WHERE track_id = ?")
            .bind(&track.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        debug!(
            "Deleted track {} with file {} and {} playlist links",
            track.id,
            track.file_id,
            links.rows_affected()
        );
        Ok(Some(track))
    }

    // ---- playlists ----

    pub async fn insert_playlist(&self, playlist: &DbPlaylist) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO playlists (name, description, user_id, cover_url, gradient, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&playlist.name)
        .bind(&playlist.description)
        .bind(playlist.user_id)
        .bind(&playlist.cover_url)
        .bind(&playlist.gradient)
        .bind(playlist.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn get_playlists_for_user(&self, user_id: i64) -> Result<Vec<DbPlaylist>, sqlx::Error> {
        let rows = sqlx::query("SELECT * FROM playlists WHERE user_id = ? ORDER BY created_at, id")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(playlist_from_row).collect()
    }

    pub async fn get_playlist_by_id(&self, playlist_id: i64) -> Result<Option<DbPlaylist>, sqlx::Error> {
        let row = sqlx::query("SELECT * FROM playlists WHERE id = ?")
            .bind(playlist_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(playlist_from_row).transpose()
    }

    /// Delete a playlist and all of its links in one transaction
    ///
    /// Returns false when no playlist with this id belongs to the user.
    pub async fn delete_playlist_cascade(
        &self,
        playlist_id: i64,
        user_id: i64,
    ) -> Result<bool, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query("DELETE FROM playlists WHERE id = ? AND user_id = ?")
            .bind(playlist_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        if deleted.rows_affected() == 0 {
            return Ok(false);
        }

        sqlx::query("DELETE FROM playlist_tracks WHERE playlist_id = ?")
            .bind(playlist_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    /// Links of a playlist in the order tracks were added
    pub async fn get_playlist_links(&self, playlist_id: i64) -> Result<Vec<DbPlaylistTrack>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT * FROM playlist_tracks WHERE playlist_id = ? ORDER BY added_at, id",
        )
        .bind(playlist_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(link_from_row).collect()
    }

    /// Insert a single link as given, with no ownership or existence checks
    pub async fn insert_playlist_link(
        &self,
        playlist_id: i64,
        track_id: &str,
    ) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO playlist_tracks (playlist_id, track_id, added_at) VALUES (?, ?, ?)",
        )
        .bind(playlist_id)
        .bind(track_id)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Link tracks to a playlist, skipping ones that cannot or need not be linked
    ///
    /// In a single transaction:
    /// - candidates that are not tracks owned by the playlist's owner are dropped
    /// - candidates already linked (or repeated in the input) are dropped
    /// - the remaining candidates are linked, keeping input order
    ///
    /// Returns `None` if the playlist does not exist, otherwise the number of
    /// links created.
    pub async fn link_tracks_to_playlist(
        &self,
        playlist_id: i64,
        track_ids: &[String],
    ) -> Result<Option<usize>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let owner: Option<i64> = sqlx::query_scalar("SELECT user_id FROM playlists WHERE id = ?")
            .bind(playlist_id)
            .fetch_optional(&mut *tx)
            .await?;
        let owner = match owner {
            Some(owner) => owner,
            None => return Ok(None),
        };

        let linked: Vec<String> =
            sqlx::query_scalar("SELECT track_id FROM playlist_tracks WHERE playlist_id = ?")
                .bind(playlist_id)
                .fetch_all(&mut *tx)
                .await?;
        let mut linked: std::collections::HashSet<String> = linked.into_iter().collect();

        let mut added = 0;
        for track_id in track_ids {
            if linked.contains(track_id) {
                continue;
            }

            let exists: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM tracks WHERE id = ? AND user_id = ?")
                    .bind(track_id)
                    .bind(owner)
                    .fetch_one(&mut *tx)
                    .await?;
            if exists == 0 {
                debug!("Skipping unknown track {} for playlist {}", track_id, playlist_id);
                continue;
            }

            sqlx::query(
                "INSERT INTO playlist_tracks (playlist_id, track_id, added_at) VALUES (?, ?, ?)",
            )
            .bind(playlist_id)
            .bind(track_id)
            .bind(Utc::now().to_rfc3339())
            .execute(&mut *tx)
            .await?;

            linked.insert(track_id.clone());
            added += 1;
        }

        tx.commit().await?;
        Ok(Some(added))
    }

    /// Returns the number of links removed
    pub async fn unlink_track_from_playlist(
        &self,
        playlist_id: i64,
        track_id: &str,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM playlist_tracks WHERE playlist_id = ? AND track_id = ?")
            .bind(playlist_id)
            .bind(track_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

fn parse_timestamp(row: &SqliteRow, column: &str) -> Result<DateTime<Utc>, sqlx::Error> {
    let raw: String = row.try_get(column)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| sqlx::Error::ColumnDecode {
            index: column.to_string(),
            source: Box::new(e),
        })
}

fn user_from_row(row: &SqliteRow) -> Result<DbUser, sqlx::Error> {
    Ok(DbUser {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        avatar_color: row.try_get("avatar_color")?,
        created_at: parse_timestamp(row, "created_at")?,
    })
}

fn file_from_row(row: &SqliteRow) -> Result<DbFile, sqlx::Error> {
    Ok(DbFile {
        id: row.try_get("id")?,
        path: row.try_get("path")?,
        name: row.try_get("name")?,
        media_type: row.try_get("media_type")?,
        mime_type: row.try_get("mime_type")?,
        size: row.try_get("size")?,
        user_id: row.try_get("user_id")?,
        data: row.try_get("data")?,
        created_at: parse_timestamp(row, "created_at")?,
    })
}

fn track_from_row(row: &SqliteRow) -> Result<DbTrack, sqlx::Error> {
    Ok(DbTrack {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        artist: row.try_get("artist")?,
        album: row.try_get("album")?,
        duration: row.try_get("duration")?,
        file_id: row.try_get("file_id")?,
        user_id: row.try_get("user_id")?,
        cover_url: row.try_get("cover_url")?,
        is_video: row.try_get("is_video")?,
        added_at: parse_timestamp(row, "added_at")?,
    })
}

fn playlist_from_row(row: &SqliteRow) -> Result<DbPlaylist, sqlx::Error> {
    Ok(DbPlaylist {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        user_id: row.try_get("user_id")?,
        cover_url: row.try_get("cover_url")?,
        gradient: row.try_get("gradient")?,
        created_at: parse_timestamp(row, "created_at")?,
    })
}

fn link_from_row(row: &SqliteRow) -> Result<DbPlaylistTrack, sqlx::Error> {
    Ok(DbPlaylistTrack {
        id: row.try_get("id")?,
        playlist_id: row.try_get("playlist_id")?,
        track_id: row.try_get("track_id")?,
        added_at: parse_timestamp(row, "added_at")?,
    })
}
