//! Relocation of files that failed processing.
//!
//! Collision policy: an existing target is never overwritten. The stem gets a numeric suffix
//! instead (`c.mp3`, then `c-1.mp3`, `c-2.mp3`, ...).

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{info, warn};

use crate::error::QuarantineError;

/// Upper bound on collision suffixes before giving up.
const MAX_SUFFIX: u32 = 10_000;

/// Moves failing files into a holding directory.
///
/// Moves go through an internal lock so two callers can never pick the same free target name.
#[derive(Debug)]
pub struct QuarantineHandler {
    dir: PathBuf,
    lock: Mutex<()>,
}

impl QuarantineHandler {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Move `source` into the quarantine directory and return its new location.
    ///
    /// On error the source is left where it was.
    pub fn quarantine(&self, source: &Path) -> Result<PathBuf, QuarantineError> {
        // A poisoned lock only means another move panicked; the guarded state is `()`.
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        fs::create_dir_all(&self.dir).map_err(|source| QuarantineError::CreateDir {
            path: self.dir.clone(),
            source,
        })?;

        let file_name = source
            .file_name()
            .ok_or_else(|| QuarantineError::NoFileName(source.to_path_buf()))?;
        let target = free_target(&self.dir, Path::new(file_name))?;

        move_file(source, &target).map_err(|err| QuarantineError::Move {
            from: source.to_path_buf(),
            to: target.clone(),
            source: err,
        })?;

        info!(from = %source.display(), to = %target.display(), "file quarantined");
        Ok(target)
    }
}

/// First name under `dir` that does not exist yet.
fn free_target(dir: &Path, file_name: &Path) -> Result<PathBuf, QuarantineError> {
    let candidate = dir.join(file_name);
    if !candidate.exists() {
        return Ok(candidate);
    }

    let stem = file_name
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = file_name
        .extension()
        .map(|e| e.to_string_lossy().into_owned());

    for n in 1..=MAX_SUFFIX {
        let name = match &ext {
            Some(ext) => format!("{stem}-{n}.{ext}"),
            None => format!("{stem}-{n}"),
        };
        let candidate = dir.join(name);
        if !candidate.exists() {
            return Ok(candidate);
        }
    }

    Err(QuarantineError::Exhausted(dir.join(file_name)))
}

/// Rename, falling back to copy + remove when the rename cannot be done (e.g. across devices).
fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    let rename_err = match fs::rename(from, to) {
        Ok(()) => return Ok(()),
        Err(err) => err,
    };

    // Nothing to copy: report the original failure.
    if !from.is_file() {
        return Err(rename_err);
    }

    if let Err(err) = fs::copy(from, to) {
        let _ = fs::remove_file(to);
        return Err(err);
    }

    // The copy is complete, so the data survives even if removing the source fails.
    if let Err(err) = fs::remove_file(from) {
        warn!(path = %from.display(), error = %err, "copied into quarantine but could not remove source");
        let _ = fs::remove_file(to);
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quarantine_moves_file_and_creates_dir() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let source = dir.path().join("c.mp3");
        fs::write(&source, b"corrupt")?;

        let handler = QuarantineHandler::new(dir.path().join("failed"));
        let target = handler.quarantine(&source)?;

        assert!(!source.exists());
        assert_eq!(target, dir.path().join("failed").join("c.mp3"));
        assert_eq!(fs::read(&target)?, b"corrupt");
        Ok(())
    }

    #[test]
    fn name_collisions_are_disambiguated() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let qdir = dir.path().join("failed");
        fs::create_dir_all(&qdir)?;
        fs::write(qdir.join("c.mp3"), b"first")?;
        fs::write(qdir.join("c-1.mp3"), b"second")?;

        let source = dir.path().join("c.mp3");
        fs::write(&source, b"third")?;

        let target = QuarantineHandler::new(&qdir).quarantine(&source)?;
        assert_eq!(target, qdir.join("c-2.mp3"));
        assert_eq!(fs::read(qdir.join("c.mp3"))?, b"first");
        assert_eq!(fs::read(qdir.join("c-1.mp3"))?, b"second");
        assert_eq!(fs::read(&target)?, b"third");
        Ok(())
    }

    #[test]
    fn unusable_quarantine_dir_leaves_source_in_place() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        // A regular file where the quarantine directory should be.
        let blocker = dir.path().join("failed");
        fs::write(&blocker, b"not a dir")?;

        let source = dir.path().join("c.mp3");
        fs::write(&source, b"corrupt")?;

        let err = QuarantineHandler::new(&blocker)
            .quarantine(&source)
            .unwrap_err();
        assert!(matches!(err, QuarantineError::CreateDir { .. }));
        assert!(source.exists());
        Ok(())
    }

    #[test]
    fn missing_source_is_an_error() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let handler = QuarantineHandler::new(dir.path().join("failed"));
        let err = handler
            .quarantine(&dir.path().join("ghost.wav"))
            .unwrap_err();
        assert!(matches!(err, QuarantineError::Move { .. }));
        Ok(())
    }
}
