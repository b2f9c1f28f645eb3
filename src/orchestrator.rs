//! The batch loop: discover → filter → cache → transcribe → write or quarantine → report.
//!
//! Files are handled strictly one after another. A failure in one file is turned into a
//! [`FileReport`] and the loop moves on; only setup problems (missing input directory, unreadable
//! output directory while building the cache) abort a run.

use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime};

use tracing::{debug, info_span, warn};
use walkdir::WalkDir;

use crate::Result;
use crate::artifact_name::{CompletionKey, relative_stem};
use crate::completion_cache::CompletionCache;
use crate::engine::{TranscriptionEngine, transcribe_guarded};
use crate::error::{Error, FileError};
use crate::media_filter::MediaFilter;
use crate::opts::TranscriptionOptions;
use crate::quarantine::QuarantineHandler;
use crate::telemetry::{BatchSummary, FileOutcome, FileReport, Telemetry};
use crate::writer::{CaptionWriter, ResultWriter};

pub const DEFAULT_OUTPUT_DIR: &str = "output";

/// Where a batch reads from and writes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchConfig {
    pub input_dir: PathBuf,

    /// Defaults to `output`.
    pub output_dir: PathBuf,

    /// When false the completion cache is never built and every file is reprocessed.
    pub skip_existing: bool,

    /// When `None`, failures are only reported; files stay where they are.
    pub quarantine_dir: Option<PathBuf>,
}

impl BatchConfig {
    pub fn new(input_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            skip_existing: false,
            quarantine_dir: None,
        }
    }
}

/// A supported media file found during the walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    pub path: PathBuf,
    /// Path relative to the input root, without extension, `/`-separated.
    pub base_name: String,
    pub extension: String,
    pub discovered_at: SystemTime,
}

impl MediaFile {
    /// `None` when the path is outside `root` or not valid UTF-8.
    pub fn new(root: &Path, path: &Path, discovered_at: SystemTime) -> Option<Self> {
        let base_name = relative_stem(root, path)?;
        let extension = path.extension()?.to_str()?.to_owned();
        Some(Self {
            path: path.to_path_buf(),
            base_name,
            extension,
            discovered_at,
        })
    }
}

/// Drives a [`TranscriptionEngine`] over every file in the input directory.
pub struct BatchOrchestrator<E, W = CaptionWriter> {
    config: BatchConfig,
    opts: TranscriptionOptions,
    engine: E,
    writer: W,
    filter: MediaFilter,
    quarantine: Option<QuarantineHandler>,
}

impl<E: TranscriptionEngine, W: ResultWriter> BatchOrchestrator<E, W> {
    pub fn new(config: BatchConfig, opts: TranscriptionOptions, engine: E, writer: W) -> Self {
        let quarantine = config.quarantine_dir.clone().map(QuarantineHandler::new);
        Self {
            config,
            opts,
            engine,
            writer,
            filter: MediaFilter::default(),
            quarantine,
        }
    }

    /// Replace the default extension allow-list.
    pub fn with_filter(mut self, filter: MediaFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    pub fn options(&self) -> &TranscriptionOptions {
        &self.opts
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Visit every file under the input directory once.
    pub fn run(&mut self, telemetry: &mut dyn Telemetry) -> Result<BatchSummary> {
        let started = Instant::now();

        if !self.config.input_dir.is_dir() {
            return Err(Error::InputDirMissing(self.config.input_dir.clone()));
        }

        let cache = if self.config.skip_existing {
            let cache = CompletionCache::build(&self.config.output_dir)?;
            debug!(entries = cache.len(), "completion cache built");
            cache
        } else {
            CompletionCache::default()
        };

        // Collected up front: artifacts and quarantined files created during the run are never
        // revisited.
        let files = self.discover();
        telemetry.on_start(files.len());

        let mut summary = BatchSummary {
            discovered: files.len(),
            ..Default::default()
        };

        for (path, discovered_at) in files {
            let span = info_span!("file", path = %path.display());
            let _enter = span.enter();

            let report = self.process(path, discovered_at, &cache);
            summary.record(&report);
            telemetry.on_file(&report);
        }

        summary.elapsed = started.elapsed();
        telemetry.on_finish(&summary);
        Ok(summary)
    }

    /// All regular files under the input directory, sorted and stamped with when the walk saw
    /// them. The output and quarantine directories are pruned when they live inside it.
    fn discover(&self) -> Vec<(PathBuf, SystemTime)> {
        let pruned: Vec<PathBuf> = [
            Some(&self.config.output_dir),
            self.config.quarantine_dir.as_ref(),
        ]
        .into_iter()
        .flatten()
        .filter_map(|dir| dir.canonicalize().ok())
        .collect();

        let walker = WalkDir::new(&self.config.input_dir)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                if entry.depth() == 0 || !entry.file_type().is_dir() {
                    return true;
                }
                match entry.path().canonicalize() {
                    Ok(dir) => !pruned.contains(&dir),
                    Err(_) => true,
                }
            });

        let mut files = Vec::new();
        for entry in walker {
            match entry {
                Ok(entry) if entry.file_type().is_file() => {
                    files.push((entry.into_path(), SystemTime::now()))
                }
                Ok(_) => {}
                Err(err) => warn!(error = %err, "skipping unreadable directory entry"),
            }
        }
        files
    }

    fn process(
        &mut self,
        path: PathBuf,
        discovered_at: SystemTime,
        cache: &CompletionCache,
    ) -> FileReport {
        if !self.filter.accepts(&path) {
            return FileReport::skipped(path, FileOutcome::FilteredOut);
        }

        let Some(media) = MediaFile::new(&self.config.input_dir, &path, discovered_at) else {
            debug!("file name cannot be keyed, skipping");
            return FileReport::skipped(path, FileOutcome::FilteredOut);
        };

        let key = CompletionKey::new(media.base_name.as_str(), self.opts.model_size);
        if self.config.skip_existing && cache.contains(&key) {
            return FileReport::skipped(media.path, FileOutcome::CacheHit);
        }

        let started = Instant::now();
        let result = self.transcribe_and_write(&media, &key);
        let duration = Some(started.elapsed());

        match result {
            Ok(artifacts) => FileReport {
                path: media.path,
                outcome: FileOutcome::Succeeded,
                duration,
                error: None,
                artifacts,
                quarantined_to: None,
            },
            Err(err) => {
                let mut report = self.handle_failure(media.path, err);
                report.duration = duration;
                report
            }
        }
    }

    fn transcribe_and_write(
        &mut self,
        media: &MediaFile,
        key: &CompletionKey,
    ) -> std::result::Result<Vec<PathBuf>, FileError> {
        let transcript = transcribe_guarded(&mut self.engine, &media.path, &self.opts)?;
        let artifacts = self
            .writer
            .write(&transcript, key, &self.config.output_dir)?;
        Ok(artifacts)
    }

    fn handle_failure(&self, path: PathBuf, err: FileError) -> FileReport {
        let mut report = FileReport::skipped(path, FileOutcome::Failed);
        let reason = err.to_string();

        let Some(quarantine) = &self.quarantine else {
            report.error = Some(reason);
            return report;
        };

        match quarantine.quarantine(&report.path) {
            Ok(target) => {
                report.outcome = FileOutcome::Quarantined;
                report.quarantined_to = Some(target);
                report.error = Some(reason);
            }
            Err(quarantine_err) => {
                report.outcome = FileOutcome::QuarantineFailed;
                report.error = Some(format!("{reason} (quarantine failed: {quarantine_err})"));
            }
        }
        report
    }
}
