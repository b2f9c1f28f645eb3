use std::path::Path;

use anyhow::{Context, Result, ensure};
use whisper_rs::{WhisperContext, WhisperContextParameters};

use super::logging::init_whisper_logging;

/// Load a GGML model and return an initialized `WhisperContext`.
pub fn get_context(model_path: &Path) -> Result<WhisperContext> {
    init_whisper_logging();

    ensure!(
        model_path.is_file(),
        "model file not found at '{}' (fetch it with `fetch-model`)",
        model_path.display()
    );

    let path_str = model_path
        .to_str()
        .with_context(|| format!("model path is not valid UTF-8: {}", model_path.display()))?;

    let ctx_params = WhisperContextParameters::default();
    let ctx = WhisperContext::new_with_params(path_str, ctx_params)
        .with_context(|| format!("failed to load model from path: {path_str}"))?;

    Ok(ctx)
}
