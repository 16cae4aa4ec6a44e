use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Where the bytes of a file to import come from
#[derive(Clone)]
pub enum FileOrigin {
    /// Read from disk when the file is processed
    Disk(PathBuf),
    /// Already in memory
    Memory(Arc<[u8]>),
}

impl fmt::Debug for FileOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileOrigin::Disk(path) => f.debug_tuple("Disk").field(path).finish(),
            FileOrigin::Memory(bytes) => write!(f, "Memory({} bytes)", bytes.len()),
        }
    }
}

/// One file handed to the import pipeline
#[derive(Debug, Clone)]
pub struct ImportFile {
    /// File name including extension, e.g. `Artist - Song.mp3`
    pub name: String,
    /// MIME type reported by whoever supplied the file, if any
    pub declared_type: Option<String>,
    pub origin: FileOrigin,
}

impl ImportFile {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        ImportFile {
            name,
            declared_type: None,
            origin: FileOrigin::Disk(path),
        }
    }

    pub fn from_bytes(
        name: &str,
        declared_type: Option<&str>,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Self {
        ImportFile {
            name: name.to_string(),
            declared_type: declared_type.map(str::to_string),
            origin: FileOrigin::Memory(bytes.into()),
        }
    }
}

/// Why a file did not become a track
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// Neither the declared type nor the extension is audio or video
    UnsupportedType,
    /// A file with this name was already imported by the user
    DuplicateFile,
    /// The user already has a track with this title
    DuplicateTitle,
    /// Reading or persisting the file failed
    Failed(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::UnsupportedType => write!(f, "unsupported file type"),
            SkipReason::DuplicateFile => write!(f, "file already imported"),
            SkipReason::DuplicateTitle => write!(f, "a track with this title exists"),
            SkipReason::Failed(error) => write!(f, "failed: {}", error),
        }
    }
}

/// Progress updates during an import batch
#[derive(Debug, Clone, PartialEq)]
pub enum ImportProgress {
    Started {
        owner_id: i64,
        total: usize,
    },
    FileImported {
        owner_id: i64,
        name: String,
        track_id: String,
    },
    FileSkipped {
        owner_id: i64,
        name: String,
        reason: SkipReason,
    },
    Complete {
        owner_id: i64,
        added: usize,
        skipped: usize,
    },
}

impl ImportProgress {
    pub fn owner_id(&self) -> i64 {
        match self {
            ImportProgress::Started { owner_id, .. }
            | ImportProgress::FileImported { owner_id, .. }
            | ImportProgress::FileSkipped { owner_id, .. }
            | ImportProgress::Complete { owner_id, .. } => *owner_id,
        }
    }
}

/// Outcome of an import batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub added: usize,
    pub skipped: usize,
}

impl fmt::Display for ImportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let noun = if self.added == 1 { "track" } else { "tracks" };
        write!(f, "Added {} {}", self.added, noun)?;
        if self.skipped > 0 {
            write!(f, ", skipped {}", self.skipped)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_display() {
        let summary = ImportSummary {
            added: 1,
            skipped: 0,
        };
        assert_eq!(summary.to_string(), "Added 1 track");

        let summary = ImportSummary {
            added: 3,
            skipped: 2,
        };
        assert_eq!(summary.to_string(), "Added 3 tracks, skipped 2");
    }

    #[test]
    fn test_from_path_uses_file_name() {
        let file = ImportFile::from_path("/music/Band - Song.flac");
        assert_eq!(file.name, "Band - Song.flac");
        assert!(file.declared_type.is_none());
    }
}
