//! `caption_batch`: transcribe a directory of audio/video files into WebVTT captions.
//!
//! This crate provides:
//! - A batch orchestrator that walks an input directory and resolves every file exactly once
//! - An idempotency cache rebuilt from the output directory, so re-runs skip finished work
//! - Quarantine of files that make the engine (or the writer) fail
//! - A Whisper-backed transcription engine (symphonia decoding, whisper.cpp inference)
//! - Atomic caption/metadata writers
//!
//! The engine and writer sit behind traits, so the orchestration loop is testable without a model.

// High-level API (most consumers should start here).
pub mod opts;
pub mod orchestrator;

// Configuration vocabulary.
pub mod model_size;

// Gates in front of the engine.
pub mod artifact_name;
pub mod completion_cache;
pub mod media_filter;

// Engine interface and the built-in Whisper engine.
pub mod backends;
pub mod engine;
pub mod transcript;

// Audio decoding.
pub mod audio_pipeline;
pub mod decoder;

// Output encoders and the result writer.
pub mod json_array_encoder;
pub mod segment_encoder;
pub mod vtt_encoder;
pub mod writer;

// Failure handling and reporting.
pub mod quarantine;
pub mod telemetry;

// Logging configuration.
#[cfg(feature = "logging")]
pub mod logging;

mod error;

pub use artifact_name::CompletionKey;
pub use backends::whisper::WhisperEngine;
pub use completion_cache::CompletionCache;
pub use engine::TranscriptionEngine;
pub use error::{EngineError, Error, FileError, QuarantineError, Result, WriteError};
pub use media_filter::MediaFilter;
pub use model_size::ModelSize;
pub use opts::{Precision, TranscriptionOptions};
pub use orchestrator::{BatchConfig, BatchOrchestrator, MediaFile};
pub use quarantine::QuarantineHandler;
pub use telemetry::{BatchSummary, FileOutcome, FileReport, Telemetry, TracingTelemetry};
pub use transcript::{Segment, Token, Transcript};
pub use writer::{CaptionWriter, ResultWriter};
