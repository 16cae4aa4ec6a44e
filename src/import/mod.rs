// # Import Module
//
// Local file import, split into small testable pieces:
//
// - **classify**: audio / video / unsupported from MIME type or extension
// - **filename**: artist and title from the file name
// - **duplicates**: soft title collision check
// - **probe**: duration extraction under a timeout
// - **service**: the per-file pipeline over a batch
//
// Public API:
// - `ImportService`: run a batch with `import_files`
// - `ImportProgressHandle`: subscribe to progress updates
// - `ImportFile`, `ImportSummary`, `ImportProgress`, `SkipReason`

pub mod classify;
mod duplicates;
pub mod filename;
pub mod probe;
mod progress;
mod service;
mod types;

pub use duplicates::title_collides;
pub use filename::{FilenameParser, ParsedFilename};
pub use probe::{extract_duration, MediaProbe, ProbeError, ProbeInput, SymphoniaProbe};
pub use progress::ImportProgressHandle;
pub use service::{ImportConfig, ImportError, ImportService, MAX_FILE_SIZE};
pub use types::{FileOrigin, ImportFile, ImportProgress, ImportSummary, SkipReason};
