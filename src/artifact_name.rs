//! Artifact naming contract, shared by the result writer and the completion cache.
//!
//! Version 1:
//! - caption artifact: `<base_name>_<model_size>.vtt`
//! - metadata artifact: `<base_name>_<model_size>.json`
//!
//! `base_name` is the input file's path relative to the input root, without its extension, with
//! `/` separating directories. Nested inputs therefore land in the same nesting under the output
//! directory. Model size names never contain `_`, so splitting at the last underscore is
//! unambiguous even when the base name has underscores of its own.

use std::path::{Component, Path, PathBuf};

use serde::Serialize;

use crate::model_size::ModelSize;

/// Revision of the naming layout described above.
pub const NAMING_VERSION: u32 = 1;

pub const CAPTION_EXTENSION: &str = "vtt";
pub const METADATA_EXTENSION: &str = "json";

const KEY_SEPARATOR: char = '_';

/// Identity of a finished transcription: one file transcribed by one model tier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CompletionKey {
    pub base_name: String,
    pub model_size: ModelSize,
}

impl CompletionKey {
    pub fn new(base_name: impl Into<String>, model_size: ModelSize) -> Self {
        Self {
            base_name: base_name.into(),
            model_size,
        }
    }

    /// `<base_name>_<model_size>`, still using `/` for nesting.
    pub fn stem(&self) -> String {
        format!("{}{KEY_SEPARATOR}{}", self.base_name, self.model_size)
    }

    pub fn caption_path(&self, output_dir: &Path) -> PathBuf {
        self.artifact_path(output_dir, CAPTION_EXTENSION)
    }

    pub fn metadata_path(&self, output_dir: &Path) -> PathBuf {
        self.artifact_path(output_dir, METADATA_EXTENSION)
    }

    // Built by hand: `Path::with_extension` would eat dots inside the base name.
    fn artifact_path(&self, output_dir: &Path, ext: &str) -> PathBuf {
        let file_name = format!("{}.{ext}", self.stem());
        let mut path = output_dir.to_path_buf();
        path.extend(file_name.split('/'));
        path
    }
}

/// Relative, extension-less, `/`-joined form of `path` under `root`.
///
/// Returns `None` for paths outside `root`, paths that are not valid UTF-8, or paths with no
/// file stem.
pub fn relative_stem(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let stem = relative.file_stem()?.to_str()?;

    let mut parts = Vec::new();
    if let Some(parent) = relative.parent() {
        for component in parent.components() {
            match component {
                Component::Normal(part) => parts.push(part.to_str()?),
                Component::CurDir => {}
                _ => return None,
            }
        }
    }
    parts.push(stem);

    Some(parts.join("/"))
}

/// Reverse the naming contract for a caption artifact found under the output directory.
///
/// `relative` is the artifact's path relative to the output root. Anything that does not follow
/// the contract (wrong extension, no separator, unknown model size, empty base name) yields `None`.
pub fn parse_artifact_name(relative: &Path) -> Option<CompletionKey> {
    let ext = relative.extension()?.to_str()?;
    if ext != CAPTION_EXTENSION {
        return None;
    }

    let stem = relative_stem(Path::new(""), relative)?;
    let (base_name, model) = stem.rsplit_once(KEY_SEPARATOR)?;
    if base_name.is_empty() || base_name.ends_with('/') {
        return None;
    }

    let model_size = model.parse::<ModelSize>().ok()?;
    Some(CompletionKey::new(base_name, model_size))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caption_path_follows_contract() {
        let key = CompletionKey::new("a", ModelSize::Base);
        assert_eq!(
            key.caption_path(Path::new("output")),
            Path::new("output").join("a_base.vtt")
        );
        assert_eq!(
            key.metadata_path(Path::new("output")),
            Path::new("output").join("a_base.json")
        );
    }

    #[test]
    fn nested_base_names_map_to_nested_paths() {
        let key = CompletionKey::new("season1/ep.01", ModelSize::Small);
        assert_eq!(
            key.caption_path(Path::new("out")),
            Path::new("out").join("season1").join("ep.01_small.vtt")
        );
    }

    #[test]
    fn relative_stem_strips_root_and_extension() {
        let root = Path::new("/media");
        assert_eq!(
            relative_stem(root, Path::new("/media/a.wav")),
            Some("a".to_owned())
        );
        assert_eq!(
            relative_stem(root, Path::new("/media/x/y/clip.final.mp4")),
            Some("x/y/clip.final".to_owned())
        );
        assert_eq!(relative_stem(root, Path::new("/elsewhere/a.wav")), None);
    }

    #[test]
    fn parse_reverses_caption_path() {
        let key = CompletionKey::new("my_talk/part_2", ModelSize::Medium);
        let out = Path::new("out");
        let path = key.caption_path(out);
        let relative = path.strip_prefix(out).expect("under output root");
        assert_eq!(parse_artifact_name(relative), Some(key));
    }

    #[test]
    fn parse_ignores_malformed_names() {
        assert_eq!(parse_artifact_name(Path::new("a_base.json")), None);
        assert_eq!(parse_artifact_name(Path::new("a.vtt")), None);
        assert_eq!(parse_artifact_name(Path::new("a_huge.vtt")), None);
        assert_eq!(parse_artifact_name(Path::new("_base.vtt")), None);
        assert_eq!(parse_artifact_name(Path::new("notes.txt")), None);
    }

    #[test]
    fn current_layout_is_version_one() {
        let key = CompletionKey::new("a", ModelSize::Base);
        assert_eq!(NAMING_VERSION, 1);
        assert_eq!(key.caption_path(Path::new("out")), Path::new("out/a_base.vtt"));
    }
}
