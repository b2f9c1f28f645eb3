//! Transcript data produced by a [`crate::engine::TranscriptionEngine`].

use std::path::PathBuf;

use serde::Serialize;

use crate::model_size::ModelSize;

/// A timed span of recognized speech.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Segment {
    pub start_seconds: f32,
    pub end_seconds: f32,
    pub text: String,

    /// Word-level tokens. Empty unless word-level timestamps were requested.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tokens: Vec<Token>,
}

/// A single token produced by the engine.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Token {
    /// Start time in seconds (whisper returns centiseconds).
    pub start_seconds: f32,
    /// End time in seconds (whisper returns centiseconds).
    pub end_seconds: f32,
    /// Token text.
    pub text: String,
    /// Probability assigned to this token.
    pub probability: f32,
}

/// Everything the engine produced for one file.
///
/// The orchestrator only looks at `source` and `model_size`; the rest is for the writer.
#[derive(Debug, Clone, PartialEq)]
pub struct Transcript {
    pub source: PathBuf,
    pub model_size: ModelSize,
    /// Detected or requested language code, when known.
    pub language: Option<String>,
    pub segments: Vec<Segment>,
}

pub(crate) fn centiseconds_to_seconds(value: i64) -> f32 {
    if value < 0 { 0.0 } else { value as f32 / 100.0 }
}
