// # Import Service
//
// Turns a batch of files into catalog tracks, one file at a time:
//
// 1. classify by declared MIME type, then extension
// 2. skip names the user already imported
// 3. parse artist and title from the name
// 4. skip titles the user already has (case-insensitive)
// 5. store the bytes
// 6. probe the duration under a timeout
// 7. write the track
//
// A failure in steps 5-7 skips that file only. New tracks reach the in-memory
// catalog in a single update at the end of the batch.

use crate::db::{DbFile, DbTrack, MediaKind};
use crate::import::classify::{classify, extension};
use crate::import::duplicates::title_collides;
use crate::import::filename::{FilenameParser, DEFAULT_ALBUM};
use crate::import::probe::{
    extract_duration, MediaProbe, ProbeInput, DEFAULT_METADATA_TIMEOUT,
};
use crate::import::progress::ImportProgressHandle;
use crate::import::types::{FileOrigin, ImportFile, ImportProgress, ImportSummary, SkipReason};
use crate::library::{LibraryError, LibraryManager, LoadedTrack, TrackCatalog};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Files above this size are not imported
pub const MAX_FILE_SIZE: u64 = 500 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Library error: {0}")]
    Library(#[from] LibraryError),
    #[error("Unknown owner: {0}")]
    UnknownOwner(i64),
}

/// Configuration for the import service
#[derive(Debug, Clone)]
pub struct ImportConfig {
    pub metadata_timeout: Duration,
    pub max_file_size: u64,
    pub filename_parser: FilenameParser,
}

impl Default for ImportConfig {
    fn default() -> Self {
        ImportConfig {
            metadata_timeout: DEFAULT_METADATA_TIMEOUT,
            max_file_size: MAX_FILE_SIZE,
            filename_parser: FilenameParser::default(),
        }
    }
}

/// Imports local media files into a user's library
#[derive(Clone)]
pub struct ImportService {
    library_manager: LibraryManager,
    catalog: TrackCatalog,
    probe: Arc<dyn MediaProbe>,
    config: ImportConfig,
    progress_tx: mpsc::UnboundedSender<ImportProgress>,
    progress_handle: ImportProgressHandle,
}

impl ImportService {
    pub fn new(
        library_manager: LibraryManager,
        catalog: TrackCatalog,
        probe: Arc<dyn MediaProbe>,
        config: ImportConfig,
        runtime_handle: tokio::runtime::Handle,
    ) -> Self {
        let (progress_tx, progress_rx) = mpsc::unbounded_channel();
        let progress_handle = ImportProgressHandle::new(progress_rx, runtime_handle);
        ImportService {
            library_manager,
            catalog,
            probe,
            config,
            progress_tx,
            progress_handle,
        }
    }

    pub fn progress(&self) -> &ImportProgressHandle {
        &self.progress_handle
    }

    fn emit(&self, progress: ImportProgress) {
        // Nobody listening is fine
        let _ = self.progress_tx.send(progress);
    }

    /// Import a batch of files for `owner_id`
    ///
    /// Files are handled strictly in order, so a later file in the batch sees
    /// tracks created by earlier ones during duplicate checks. Per-file
    /// problems only skip that file; the whole call fails only when the owner
    /// is unknown or the library cannot be queried.
    pub async fn import_files(
        &self,
        files: Vec<ImportFile>,
        owner_id: i64,
    ) -> Result<ImportSummary, ImportError> {
        if self
            .library_manager
            .database()
            .get_user_by_id(owner_id)
            .await
            .map_err(LibraryError::from)?
            .is_none()
        {
            return Err(ImportError::UnknownOwner(owner_id));
        }

        info!("Importing {} files for user {}", files.len(), owner_id);
        self.emit(ImportProgress::Started {
            owner_id,
            total: files.len(),
        });

        let mut summary = ImportSummary::default();
        let mut imported = Vec::new();

        for file in files {
            let name = file.name.clone();
            match self.import_one(file, owner_id).await? {
                Ok(track) => {
                    info!("Imported '{}' as {}", name, track.track.id);
                    self.emit(ImportProgress::FileImported {
                        owner_id,
                        name,
                        track_id: track.track.id.clone(),
                    });
                    summary.added += 1;
                    imported.push(track);
                }
                Err(reason) => {
                    debug!("Skipped '{}': {}", name, reason);
                    self.emit(ImportProgress::FileSkipped {
                        owner_id,
                        name,
                        reason,
                    });
                    summary.skipped += 1;
                }
            }
        }

        if !imported.is_empty() && !self.catalog.add_tracks_for(owner_id, imported) {
            debug!(
                "User {} does not own the catalog view, imported tracks not shown",
                owner_id
            );
        }

        info!("Import for user {} finished: {}", owner_id, summary);
        self.emit(ImportProgress::Complete {
            owner_id,
            added: summary.added,
            skipped: summary.skipped,
        });
        Ok(summary)
    }

    /// The outer error aborts the batch; the inner one skips the file
    async fn import_one(
        &self,
        file: ImportFile,
        owner_id: i64,
    ) -> Result<Result<LoadedTrack, SkipReason>, ImportError> {
        let Some(kind) = classify(&file.name, file.declared_type.as_deref()) else {
            return Ok(Err(SkipReason::UnsupportedType));
        };

        if self.library_manager.file_exists(&file.name, owner_id).await? {
            return Ok(Err(SkipReason::DuplicateFile));
        }

        let parsed = self.config.filename_parser.parse(&file.name);

        let titles = self.library_manager.get_track_titles(owner_id).await?;
        if title_collides(titles.iter().map(String::as_str), &parsed.title) {
            return Ok(Err(SkipReason::DuplicateTitle));
        }

        match self.store(file, kind, &parsed.artist, &parsed.title, owner_id).await {
            Ok(track) => Ok(Ok(track)),
            Err(reason) => {
                warn!("Import failed: {}", reason);
                Ok(Err(SkipReason::Failed(reason)))
            }
        }
    }

    async fn store(
        &self,
        file: ImportFile,
        kind: MediaKind,
        artist: &str,
        title: &str,
        owner_id: i64,
    ) -> Result<LoadedTrack, String> {
        let data = self.read_bytes(&file).await?;

        let mime_type = file
            .declared_type
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(kind.default_mime_type())
            .to_string();

        let stored = DbFile::new(&file.name, kind, &mime_type, owner_id, data.to_vec());
        let file_id = self
            .library_manager
            .save_file(&stored)
            .await
            .map_err(|e| format!("storing '{}': {}", file.name, e))?;

        let probe_input = ProbeInput {
            data: data.clone(),
            kind,
            extension: extension(&file.name),
        };
        let duration =
            extract_duration(self.probe.as_ref(), &probe_input, self.config.metadata_timeout).await;

        let track = DbTrack::new(
            title,
            artist,
            DEFAULT_ALBUM,
            duration,
            file_id,
            owner_id,
            kind.is_video(),
        );
        if let Err(e) = self.library_manager.save_track(&track).await {
            // Leave no stored file behind that would block a retry
            if let Err(cleanup) = self.library_manager.delete_file(file_id).await {
                warn!("Failed to remove stored file {}: {}", file_id, cleanup);
            }
            return Err(format!("saving track '{}': {}", title, e));
        }

        let blob = self.library_manager.issue_handle(file_id, &mime_type, data);
        Ok(LoadedTrack::new(track, Some(blob)))
    }

    async fn read_bytes(&self, file: &ImportFile) -> Result<Arc<[u8]>, String> {
        let data: Arc<[u8]> = match &file.origin {
            FileOrigin::Memory(bytes) => bytes.clone(),
            FileOrigin::Disk(path) => {
                let metadata = tokio::fs::metadata(path)
                    .await
                    .map_err(|e| format!("reading {}: {}", path.display(), e))?;
                if metadata.len() > self.config.max_file_size {
                    return Err(format!("{} exceeds the size limit", path.display()));
                }
                tokio::fs::read(path)
                    .await
                    .map_err(|e| format!("reading {}: {}", path.display(), e))?
                    .into()
            }
        };

        if data.len() as u64 > self.config.max_file_size {
            return Err(format!("'{}' exceeds the size limit", file.name));
        }
        Ok(data)
    }
}
