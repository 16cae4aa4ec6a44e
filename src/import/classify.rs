use crate::db::MediaKind;

pub const AUDIO_EXTENSIONS: [&str; 7] = ["mp3", "wav", "flac", "ogg", "m4a", "aac", "wma"];
pub const VIDEO_EXTENSIONS: [&str; 7] = ["mp4", "mp5", "mkv", "avi", "webm", "mov", "wmv"];

pub const AUDIO_MIME_TYPES: [&str; 7] = [
    "audio/mpeg",
    "audio/wav",
    "audio/flac",
    "audio/ogg",
    "audio/mp4",
    "audio/aac",
    "audio/x-ms-wma",
];
pub const VIDEO_MIME_TYPES: [&str; 6] = [
    "video/mp4",
    "video/x-matroska",
    "video/avi",
    "video/webm",
    "video/quicktime",
    "video/x-ms-wmv",
];

/// Decide whether a file is audio, video or neither
///
/// A recognised declared MIME type wins; otherwise the extension decides.
pub fn classify(name: &str, declared_type: Option<&str>) -> Option<MediaKind> {
    declared_type
        .and_then(kind_from_mime)
        .or_else(|| extension(name).and_then(|ext| kind_from_extension(&ext)))
}

pub fn kind_from_mime(mime: &str) -> Option<MediaKind> {
    let mime = mime.trim().to_ascii_lowercase();
    if AUDIO_MIME_TYPES.contains(&mime.as_str()) {
        Some(MediaKind::Audio)
    } else if VIDEO_MIME_TYPES.contains(&mime.as_str()) {
        Some(MediaKind::Video)
    } else {
        None
    }
}

pub fn kind_from_extension(ext: &str) -> Option<MediaKind> {
    let ext = ext.to_ascii_lowercase();
    if AUDIO_EXTENSIONS.contains(&ext.as_str()) {
        Some(MediaKind::Audio)
    } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        Some(MediaKind::Video)
    } else {
        None
    }
}

/// Lowercased text after the last dot, if any
pub fn extension(name: &str) -> Option<String> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_classification() {
        assert_eq!(classify("song.MP3", None), Some(MediaKind::Audio));
        assert_eq!(classify("clip.mkv", None), Some(MediaKind::Video));
        assert_eq!(classify("clip.mp5", None), Some(MediaKind::Video));
        assert_eq!(classify("notes.txt", None), None);
        assert_eq!(classify("README", None), None);
        assert_eq!(classify(".mp3", None), None);
    }

    #[test]
    fn test_declared_type_wins_over_extension() {
        assert_eq!(classify("track.mp4", Some("audio/mp4")), Some(MediaKind::Audio));
        assert_eq!(classify("movie.bin", Some("video/webm")), Some(MediaKind::Video));
    }

    #[test]
    fn test_unknown_declared_type_falls_back_to_extension() {
        assert_eq!(
            classify("song.flac", Some("application/octet-stream")),
            Some(MediaKind::Audio)
        );
        assert_eq!(classify("doc.pdf", Some("application/pdf")), None);
    }
}
