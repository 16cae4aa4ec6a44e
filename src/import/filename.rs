pub const DEFAULT_ARTIST: &str = "Unknown Artist";
pub const DEFAULT_ALBUM: &str = "Unknown Album";

/// Separators between artist and title, tried in order
pub const DEFAULT_DELIMITERS: [&str; 3] = [" - ", " – ", "_-_"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFilename {
    pub artist: String,
    pub title: String,
}

/// Derives artist and title from names like `Artist - Title.mp3`
#[derive(Debug, Clone)]
pub struct FilenameParser {
    delimiters: Vec<String>,
}

impl Default for FilenameParser {
    fn default() -> Self {
        Self::new(DEFAULT_DELIMITERS.iter().map(|d| d.to_string()).collect())
    }
}

impl FilenameParser {
    pub fn new(delimiters: Vec<String>) -> Self {
        FilenameParser { delimiters }
    }

    /// Split at the first occurrence of the first delimiter present
    ///
    /// Everything before it is the artist, everything after it the title.
    /// Without a usable delimiter the whole stem is the title.
    pub fn parse(&self, name: &str) -> ParsedFilename {
        let stem = strip_extension(name);

        for delimiter in self.delimiters.iter().filter(|d| !d.is_empty()) {
            if let Some((artist, title)) = stem.split_once(delimiter.as_str()) {
                let (artist, title) = (artist.trim(), title.trim());
                if artist.is_empty() || title.is_empty() {
                    break;
                }
                return ParsedFilename {
                    artist: artist.to_string(),
                    title: title.to_string(),
                };
            }
        }

        ParsedFilename {
            artist: DEFAULT_ARTIST.to_string(),
            title: stem.trim().to_string(),
        }
    }
}

/// Name without the text after its last dot; names without a dot are kept whole
fn strip_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(index) if index > 0 => &name[..index],
        _ => name,
    }
}
