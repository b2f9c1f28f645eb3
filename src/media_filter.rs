//! Name-based gate for supported media files.
//!
//! Matching is ASCII case-insensitive (`clip.MP4` is accepted). File contents are never opened.

use std::path::Path;

/// Audio/video container extensions the decoder can handle.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    // audio
    "wav", "mp3", "flac", "ogg", "oga", "opus", "m4a", "aac", "aiff", "aif", "caf", "wma",
    // video
    "mp4", "m4v", "mov", "mkv", "webm", "avi",
];

/// Decides whether a discovered path is a media file worth transcribing.
#[derive(Debug, Clone)]
pub struct MediaFilter {
    extensions: Vec<String>,
}

impl Default for MediaFilter {
    fn default() -> Self {
        Self::new(SUPPORTED_EXTENSIONS.iter().copied())
    }
}

impl MediaFilter {
    /// Build a filter from a custom allow-list. Leading dots are ignored.
    pub fn new<'a>(extensions: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            extensions: extensions
                .into_iter()
                .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        }
    }

    /// True iff the file name's extension is on the allow-list.
    pub fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.accepts_extension(ext))
            .unwrap_or(false)
    }

    pub fn accepts_extension(&self, ext: &str) -> bool {
        self.extensions
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(ext))
    }
}
