use sqlx::{Row, SqlitePool};
use tracing::info;

/// Current schema version, stored in `PRAGMA user_version`
pub const SCHEMA_VERSION: i64 = 2;

/// Version 1: users, stored files and tracks
const V1: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL,
        email TEXT NOT NULL,
        avatar_color TEXT NOT NULL,
        created_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_users_email ON users (email)",
    r#"
    CREATE TABLE IF NOT EXISTS files (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        path TEXT NOT NULL,
        name TEXT NOT NULL,
        media_type TEXT NOT NULL,
        mime_type TEXT NOT NULL,
        size INTEGER NOT NULL,
        user_id INTEGER NOT NULL,
        data BLOB NOT NULL,
        created_at TEXT NOT NULL
    )
    "#,
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_files_path_user ON files (path, user_id)",
    "CREATE INDEX IF NOT EXISTS idx_files_user ON files (user_id)",
    r#"
    CREATE TABLE IF NOT EXISTS tracks (
        id TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        artist TEXT NOT NULL,
        album TEXT NOT NULL,
        duration REAL NOT NULL,
        file_id INTEGER NOT NULL,
        user_id INTEGER NOT NULL,
        cover_url TEXT,
        is_video BOOLEAN NOT NULL DEFAULT FALSE,
        added_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_tracks_user ON tracks (user_id)",
    "CREATE INDEX IF NOT EXISTS idx_tracks_file ON tracks (file_id)",
];

/// Version 2: playlists and their track links
const V2: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS playlists (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        description TEXT,
        user_id INTEGER NOT NULL,
        cover_url TEXT,
        gradient TEXT NOT NULL,
        created_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_playlists_user ON playlists (user_id)",
    r#"
    CREATE TABLE IF NOT EXISTS playlist_tracks (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        playlist_id INTEGER NOT NULL,
        track_id TEXT NOT NULL,
        added_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_playlist_tracks_playlist ON playlist_tracks (playlist_id)",
    "CREATE INDEX IF NOT EXISTS idx_playlist_tracks_track ON playlist_tracks (track_id)",
];

const MIGRATIONS: &[&[&str]] = &[V1, V2];

/// Read the schema version of an opened database
pub async fn schema_version(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    let row = sqlx::query("PRAGMA user_version").fetch_one(pool).await?;
    row.try_get(0)
}

/// Apply every migration newer than the stored version
///
/// Migrations only add tables and indexes, so data written by an older
/// version survives the upgrade. Each version is applied in its own
/// transaction together with the version bump.
pub async fn migrate(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let current = schema_version(pool).await?;

    for (index, statements) in MIGRATIONS.iter().enumerate() {
        let version = index as i64 + 1;
        if version <= current {
            continue;
        }

        let mut tx = pool.begin().await?;
        for statement in statements.iter() {
            sqlx::query(statement).execute(&mut *tx).await?;
        }
        // PRAGMA does not accept bound parameters
        sqlx::query(&format!("PRAGMA user_version = {}", version))
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!("Migrated library schema to version {}", version);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    // Every in-memory connection is its own database, so stick to one
    async fn memory_pool() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_migrate_fresh_database() {
        let pool = memory_pool().await;
        migrate(&pool).await.unwrap();
        assert_eq!(schema_version(&pool).await.unwrap(), SCHEMA_VERSION);

        let tables: Vec<String> =
            sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type = 'table'")
                .fetch_all(&pool)
                .await
                .unwrap();
        for table in ["users", "files", "tracks", "playlists", "playlist_tracks"] {
            assert!(tables.iter().any(|t| t == table), "missing {}", table);
        }
    }

    #[tokio::test]
    async fn test_upgrade_from_v1_keeps_rows() {
        let pool = memory_pool().await;
        for statement in V1 {
            sqlx::query(statement).execute(&pool).await.unwrap();
        }
        sqlx::query("PRAGMA user_version = 1")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO users (username, email, avatar_color, created_at) VALUES ('ann', 'a@x', 'c', '2024-01-01T00:00:00Z')",
        )
        .execute(&pool)
        .await
        .unwrap();

        migrate(&pool).await.unwrap();

        assert_eq!(schema_version(&pool).await.unwrap(), 2);
        let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(users, 1);
    }

    #[tokio::test]
    async fn test_migrate_is_idempotent() {
        let pool = memory_pool().await;
        migrate(&pool).await.unwrap();
        migrate(&pool).await.unwrap();
        assert_eq!(schema_version(&pool).await.unwrap(), SCHEMA_VERSION);
    }
}
