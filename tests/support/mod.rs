#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use playnest::blob_url::BlobUrlRegistry;
use playnest::db::{Database, DbUser};
use playnest::import::{
    ImportConfig, ImportFile, ImportService, MediaProbe, ProbeError, ProbeInput,
};
use playnest::library::{IdentityStore, LibraryManager, TrackCatalog};

/// Initialize tracing for tests with proper test output handling
pub fn tracing_init() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Probe that reports the same duration for everything
pub struct FixedProbe(pub f64);

#[async_trait]
impl MediaProbe for FixedProbe {
    async fn probe_duration(&self, _input: &ProbeInput) -> Result<f64, ProbeError> {
        Ok(self.0)
    }
}

/// Probe that never answers within any sane timeout
pub struct StalledProbe;

#[async_trait]
impl MediaProbe for StalledProbe {
    async fn probe_duration(&self, _input: &ProbeInput) -> Result<f64, ProbeError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(1.0)
    }
}

/// A library on a temporary database, with import wired to a probe double
pub struct TestLibrary {
    pub database: Database,
    pub blob_urls: BlobUrlRegistry,
    pub library_manager: LibraryManager,
    pub identity: IdentityStore,
    pub catalog: TrackCatalog,
    pub import_service: ImportService,
    pub temp_dir: TempDir,
}

impl TestLibrary {
    pub async fn new() -> Self {
        Self::with_probe(Arc::new(FixedProbe(180.0)), ImportConfig::default()).await
    }

    pub async fn with_probe(probe: Arc<dyn MediaProbe>, config: ImportConfig) -> Self {
        tracing_init();

        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let database = Database::new(db_path.to_str().unwrap())
            .await
            .expect("Failed to create database");

        let blob_urls = BlobUrlRegistry::new();
        let library_manager = LibraryManager::new(database.clone(), blob_urls.clone());
        let identity = IdentityStore::new(database.clone());
        let catalog = TrackCatalog::new();
        let import_service = ImportService::new(
            library_manager.clone(),
            catalog.clone(),
            probe,
            config,
            tokio::runtime::Handle::current(),
        );

        TestLibrary {
            database,
            blob_urls,
            library_manager,
            identity,
            catalog,
            import_service,
            temp_dir,
        }
    }

    pub async fn user(&self, username: &str) -> DbUser {
        self.identity
            .create_user(username, &format!("{}@example.com", username))
            .await
            .expect("Failed to create user")
    }

    /// Make `user` the owner of the catalog view, as a login would
    pub fn view_as(&self, user: &DbUser) {
        self.catalog.reset(Some(user.id));
    }

    /// Import in-memory files and return the new track ids in name order
    pub async fn import(&self, user_id: i64, names: &[&str]) -> Vec<String> {
        let files = names.iter().map(|name| audio(name)).collect();
        self.import_service
            .import_files(files, user_id)
            .await
            .expect("Import failed");

        let mut ids = Vec::new();
        for name in names {
            let title = name.rsplit_once(" - ").map_or(*name, |(_, t)| t);
            let title = title.rsplit_once('.').map_or(title, |(t, _)| t);
            if let Some(track) = self
                .database
                .get_tracks_for_user(user_id)
                .await
                .unwrap()
                .into_iter()
                .find(|t| t.title == title)
            {
                ids.push(track.id);
            }
        }
        ids
    }
}

/// A small in-memory audio file; contents are never decoded by the doubles
pub fn audio(name: &str) -> ImportFile {
    ImportFile::from_bytes(name, Some("audio/mpeg"), vec![0xFFu8, 0xFB, 0x90, 0x00])
}

pub fn video(name: &str) -> ImportFile {
    ImportFile::from_bytes(name, Some("video/mp4"), vec![0u8, 0, 0, 0x18])
}
