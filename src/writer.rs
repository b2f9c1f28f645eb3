//! Durable serialization of transcripts into caption/metadata artifacts.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use tempfile::NamedTempFile;

use crate::artifact_name::CompletionKey;
use crate::error::WriteError;
use crate::json_array_encoder::JsonArrayEncoder;
use crate::segment_encoder::SegmentEncoder;
use crate::transcript::Transcript;
use crate::vtt_encoder::VttEncoder;

/// Turns a [`Transcript`] into artifacts on disk.
///
/// Writing the same key twice must overwrite cleanly.
pub trait ResultWriter {
    /// Write every artifact for `key` under `output_dir` and return their paths.
    fn write(
        &self,
        transcript: &Transcript,
        key: &CompletionKey,
        output_dir: &Path,
    ) -> Result<Vec<PathBuf>, WriteError>;
}

/// Writes a WebVTT caption file and, optionally, a JSON segment dump next to it.
///
/// Each artifact is encoded into a temp file in its destination directory, then renamed into
/// place. The caption is renamed last; its presence is what marks the key as done. If the caption
/// cannot be placed, artifacts already placed for the key are removed again.
#[derive(Debug, Clone, Copy, Default)]
pub struct CaptionWriter {
    pub write_metadata: bool,
}

impl CaptionWriter {
    pub fn new(write_metadata: bool) -> Self {
        Self { write_metadata }
    }
}

impl ResultWriter for CaptionWriter {
    fn write(
        &self,
        transcript: &Transcript,
        key: &CompletionKey,
        output_dir: &Path,
    ) -> Result<Vec<PathBuf>, WriteError> {
        let caption_path = key.caption_path(output_dir);
        let dir = caption_path
            .parent()
            .ok_or_else(|| WriteError::NoParent(caption_path.clone()))?;
        fs::create_dir_all(dir).map_err(|source| WriteError::CreateDir {
            path: dir.to_path_buf(),
            source,
        })?;

        // Encode everything before anything becomes visible.
        let metadata = if self.write_metadata {
            let metadata_path = key.metadata_path(output_dir);
            let staged = stage(&metadata_path, |w| {
                encode(JsonArrayEncoder::new(w), transcript)
            })?;
            Some((staged, metadata_path))
        } else {
            None
        };
        let caption = stage(&caption_path, |w| encode(VttEncoder::new(w), transcript))?;

        let mut written = Vec::with_capacity(2);
        if let Some((staged, metadata_path)) = metadata {
            commit(staged, &metadata_path)?;
            written.push(metadata_path);
        }

        if let Err(err) = commit(caption, &caption_path) {
            // A failed key leaves nothing behind in the output directory.
            for path in &written {
                let _ = fs::remove_file(path);
            }
            return Err(err);
        }
        written.push(caption_path);

        Ok(written)
    }
}

fn encode<E: SegmentEncoder>(mut encoder: E, transcript: &Transcript) -> anyhow::Result<()> {
    for seg in &transcript.segments {
        encoder.write_segment(seg)?;
    }
    encoder.close()
}

/// Encode into a synced temp file next to `path`.
fn stage(
    path: &Path,
    fill: impl FnOnce(&mut dyn Write) -> anyhow::Result<()>,
) -> Result<NamedTempFile, WriteError> {
    stage_with(path, fill).map_err(|source| WriteError::Artifact {
        path: path.to_path_buf(),
        source,
    })
}

fn stage_with(
    path: &Path,
    fill: impl FnOnce(&mut dyn Write) -> anyhow::Result<()>,
) -> anyhow::Result<NamedTempFile> {
    let dir = path
        .parent()
        .context("artifact path has no parent directory")?;
    let mut tmp = NamedTempFile::new_in(dir).context("failed to create temp file")?;

    {
        let mut w = BufWriter::new(tmp.as_file_mut());
        fill(&mut w)?;
        w.flush()?;
    }

    tmp.as_file().sync_all()?;
    Ok(tmp)
}

/// Rename a staged temp file into place.
fn commit(staged: NamedTempFile, path: &Path) -> Result<(), WriteError> {
    staged
        .persist(path)
        .map_err(|err| WriteError::Artifact {
            path: path.to_path_buf(),
            source: anyhow::Error::new(err.error).context("failed to move artifact into place"),
        })?;
    Ok(())
}
