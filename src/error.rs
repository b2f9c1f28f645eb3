use std::path::PathBuf;

use thiserror::Error;

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Crate-wide error type for setup failures.
///
/// Per-file failures never surface through this type; they are converted into a
/// [`crate::telemetry::FileOutcome`] by the orchestrator. Only conditions that make the whole
/// batch meaningless (missing input directory, unusable output directory) end up here.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Message(String),

    #[error("input directory not found: {}", .0.display())]
    InputDirMissing(PathBuf),

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub(crate) fn msg(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Message(format!("{err:#}"))
    }
}

/// The transcription engine could not produce a transcript for a file.
///
/// Recoverable at batch level: the orchestrator quarantines the file and moves on.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to decode media: {0}")]
    Decode(String),

    #[error("failed to load model: {0}")]
    ModelLoad(String),

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("engine panicked: {0}")]
    Panicked(String),
}

/// Serializing a transcript to disk failed.
///
/// Handled exactly like an [`EngineError`].
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("failed to create output directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write artifact {}: {source}", path.display())]
    Artifact {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("artifact path has no parent directory: {}", .0.display())]
    NoParent(PathBuf),
}

/// Moving a failing file into quarantine did not work.
///
/// Best-effort: the orchestrator logs this and leaves the file where it was.
#[derive(Debug, Error)]
pub enum QuarantineError {
    #[error("failed to create quarantine directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("source has no file name: {}", .0.display())]
    NoFileName(PathBuf),

    #[error("failed to move {} to {}: {source}", from.display(), to.display())]
    Move {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no free quarantine name for {}", .0.display())]
    Exhausted(PathBuf),
}

/// Why processing a single file failed.
#[derive(Debug, Error)]
pub enum FileError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Write(#[from] WriteError),
}
