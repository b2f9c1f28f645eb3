//! [`TranscriptionEngine`] backed by `whisper-rs` / `whisper.cpp`.

use std::path::{Path, PathBuf};

use tracing::{debug, info};
use whisper_rs::WhisperContext;

use crate::decoder::decode_file;
use crate::engine::TranscriptionEngine;
use crate::error::EngineError;
use crate::model_size::ModelSize;
use crate::opts::{Precision, TranscriptionOptions};
use crate::transcript::Transcript;

mod ctx;
mod logging;
mod segments;
mod token;

use segments::collect_segments;

/// Whisper engine holding one loaded model.
///
/// Loading is the expensive part, so an engine is built once per batch and reused for every file.
/// The loaded tier is fixed; asking for a different `model_size` fails instead of silently
/// transcribing with the wrong model.
pub struct WhisperEngine {
    ctx: WhisperContext,
    model_size: ModelSize,
    precision: Precision,
    model_path: PathBuf,
}

impl WhisperEngine {
    /// Load the model file for `opts.model_size` / `opts.precision` from `models_dir`.
    pub fn load(models_dir: &Path, opts: &TranscriptionOptions) -> Result<Self, EngineError> {
        let model_path = opts.model_size.model_path(models_dir, opts.precision);
        Self::from_model_file(&model_path, opts.model_size, opts.precision)
    }

    /// Load an explicit GGML model file and label it with the tier it implements.
    pub fn from_model_file(
        model_path: &Path,
        model_size: ModelSize,
        precision: Precision,
    ) -> Result<Self, EngineError> {
        info!(model = %model_path.display(), %model_size, "loading whisper model");
        let ctx = ctx::get_context(model_path)
            .map_err(|err| EngineError::ModelLoad(format!("{err:#}")))?;

        Ok(Self {
            ctx,
            model_size,
            precision,
            model_path: model_path.to_path_buf(),
        })
    }

    pub fn model_size(&self) -> ModelSize {
        self.model_size
    }

    pub fn precision(&self) -> Precision {
        self.precision
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }
}

impl TranscriptionEngine for WhisperEngine {
    fn transcribe(
        &mut self,
        path: &Path,
        opts: &TranscriptionOptions,
    ) -> Result<Transcript, EngineError> {
        if opts.model_size != self.model_size {
            return Err(EngineError::ModelLoad(format!(
                "engine has '{}' loaded but '{}' was requested",
                self.model_size, opts.model_size
            )));
        }

        let samples = decode_file(path).map_err(|err| EngineError::Decode(format!("{err:#}")))?;
        debug!(path = %path.display(), samples = samples.len(), "decoded media");

        let segments = if samples.is_empty() {
            Vec::new()
        } else {
            collect_segments(&self.ctx, opts, &samples)
                .map_err(|err| EngineError::Inference(format!("{err:#}")))?
        };

        Ok(Transcript {
            source: path.to_path_buf(),
            model_size: self.model_size,
            language: opts.language.clone(),
            segments,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_model_file_is_a_model_load_error() {
        let opts = TranscriptionOptions::default();
        let err = match WhisperEngine::load(Path::new("/no/such/models"), &opts) {
            Ok(_) => panic!("expected model load to fail"),
            Err(err) => err,
        };
        assert!(matches!(err, EngineError::ModelLoad(ref msg) if msg.contains("ggml-tiny.bin")));
    }
}
