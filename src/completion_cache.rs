//! Index of finished work, rebuilt from the output directory at batch start.
//!
//! There is no manifest: a caption artifact on disk is the only proof of completion, so a crash
//! halfway through a run leaves the cache consistent with whatever actually got written.

use std::collections::HashSet;
use std::path::Path;

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::Result;
use crate::artifact_name::{CompletionKey, parse_artifact_name};
use crate::error::Error;

/// Set of [`CompletionKey`]s whose caption artifacts already exist.
///
/// Read-only once built, so it can be shared across threads without locking.
#[derive(Debug, Clone, Default)]
pub struct CompletionCache {
    keys: HashSet<CompletionKey>,
}

impl CompletionCache {
    /// Scan `output_dir` recursively and collect every artifact that follows the naming contract.
    ///
    /// A missing output directory is an empty cache. Unrelated or malformed files are skipped.
    pub fn build(output_dir: &Path) -> Result<Self> {
        let mut keys = HashSet::new();
        if !output_dir.is_dir() {
            return Ok(Self { keys });
        }

        for entry in WalkDir::new(output_dir).follow_links(false) {
            let entry = match entry {
                Ok(entry) => entry,
                // The root itself is unreadable: nothing can be trusted.
                Err(err) if err.depth() == 0 => return Err(root_error(output_dir, err)),
                Err(err) => {
                    warn!(error = %err, "skipping unreadable output entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let Ok(relative) = entry.path().strip_prefix(output_dir) else {
                continue;
            };

            match parse_artifact_name(relative) {
                Some(key) => {
                    keys.insert(key);
                }
                None => debug!(path = %entry.path().display(), "ignoring unrelated output file"),
            }
        }

        Ok(Self { keys })
    }

    pub fn contains(&self, key: &CompletionKey) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

fn root_error(output_dir: &Path, err: walkdir::Error) -> Error {
    match err.into_io_error() {
        Some(io) => Error::io(output_dir, io),
        None => Error::msg(format!("cannot scan {}", output_dir.display())),
    }
}
