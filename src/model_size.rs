use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

use crate::opts::Precision;

const MODEL_BASE_URL: &str = "https://huggingface.co/ggerganov/whisper.cpp/resolve/main";

/// A Whisper quality/speed tier.
///
/// The textual name (`as_str`) is part of the artifact naming contract, so it must stay stable
/// and must never contain an underscore.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum ModelSize {
    #[default]
    Tiny,
    Base,
    Small,
    Medium,
    Large,
    Turbo,
}

impl ModelSize {
    pub const ALL: [ModelSize; 6] = [
        ModelSize::Tiny,
        ModelSize::Base,
        ModelSize::Small,
        ModelSize::Medium,
        ModelSize::Large,
        ModelSize::Turbo,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ModelSize::Tiny => "tiny",
            ModelSize::Base => "base",
            ModelSize::Small => "small",
            ModelSize::Medium => "medium",
            ModelSize::Large => "large",
            ModelSize::Turbo => "turbo",
        }
    }

    /// GGML file name for this tier at the given precision.
    ///
    /// Reduced precision maps to the quantized weights published alongside each tier.
    pub fn model_file_name(self, precision: Precision) -> &'static str {
        match (self, precision) {
            (ModelSize::Tiny, Precision::Full) => "ggml-tiny.bin",
            (ModelSize::Tiny, Precision::Reduced) => "ggml-tiny-q5_1.bin",
            (ModelSize::Base, Precision::Full) => "ggml-base.bin",
            (ModelSize::Base, Precision::Reduced) => "ggml-base-q5_1.bin",
            (ModelSize::Small, Precision::Full) => "ggml-small.bin",
            (ModelSize::Small, Precision::Reduced) => "ggml-small-q5_1.bin",
            (ModelSize::Medium, Precision::Full) => "ggml-medium.bin",
            (ModelSize::Medium, Precision::Reduced) => "ggml-medium-q5_0.bin",
            (ModelSize::Large, Precision::Full) => "ggml-large-v3.bin",
            (ModelSize::Large, Precision::Reduced) => "ggml-large-v3-q5_0.bin",
            (ModelSize::Turbo, Precision::Full) => "ggml-large-v3-turbo.bin",
            (ModelSize::Turbo, Precision::Reduced) => "ggml-large-v3-turbo-q5_0.bin",
        }
    }

    /// Where the model file for this tier lives inside `models_dir`.
    pub fn model_path(self, models_dir: &Path, precision: Precision) -> PathBuf {
        models_dir.join(self.model_file_name(precision))
    }

    /// Download URL for the model file (whisper.cpp's Hugging Face repo).
    pub fn download_url(self, precision: Precision) -> String {
        format!("{MODEL_BASE_URL}/{}", self.model_file_name(precision))
    }
}

impl fmt::Display for ModelSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown model size '{0}'")]
pub struct UnknownModelSize(pub String);

impl FromStr for ModelSize {
    type Err = UnknownModelSize;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModelSize::ALL
            .into_iter()
            .find(|size| size.as_str() == s)
            .ok_or_else(|| UnknownModelSize(s.to_owned()))
    }
}
