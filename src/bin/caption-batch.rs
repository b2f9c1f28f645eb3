use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tracing::{error, info};

use caption_batch::logging::{self, LogConfig};
use caption_batch::opts::parse_language;
use caption_batch::{
    BatchConfig, BatchOrchestrator, BatchSummary, CaptionWriter, FileReport, ModelSize, Precision,
    Telemetry, TracingTelemetry, TranscriptionOptions, WhisperEngine,
};

#[derive(Parser, Debug)]
#[command(name = "caption-batch")]
#[command(about = "Transcribe every audio/video file in a directory into WebVTT captions")]
struct Params {
    /// Directory to scan (recursively) for media files.
    #[arg(short = 'd', long = "directory")]
    directory: PathBuf,

    /// Directory receiving `<name>_<model>.vtt` files.
    #[arg(short = 'o', long = "output", default_value = "output")]
    output: PathBuf,

    /// Model tier. Part of every output file name.
    #[arg(short = 'm', long = "model", value_enum, default_value_t = ModelSize::Tiny)]
    model: ModelSize,

    /// Spoken language: a name ("English"), an ISO code ("en"), or "auto".
    #[arg(short = 'l', long = "language", default_value = "English")]
    language: String,

    /// Use quantized model weights.
    #[arg(long = "reduced-precision", default_value_t = false)]
    reduced_precision: bool,

    /// Ask the engine for token-level timestamps (kept in the JSON metadata).
    #[arg(long = "word-timestamps", default_value_t = false)]
    word_timestamps: bool,

    /// Skip files whose captions already exist for this model.
    #[arg(long = "skip-existing", default_value_t = false)]
    skip_existing: bool,

    /// Move files that fail to transcribe into this directory.
    #[arg(short = 'q', long = "quarantine")]
    quarantine: Option<PathBuf>,

    /// Also write `<name>_<model>.json` with the full transcript.
    #[arg(long = "metadata", default_value_t = false)]
    metadata: bool,

    /// Directory holding `ggml-*.bin` model files (see `fetch-model`).
    #[arg(long = "models-dir", default_value = "./models")]
    models_dir: PathBuf,

    /// Append JSON logs to this file in addition to stderr.
    #[arg(long = "log-file")]
    log_file: Option<PathBuf>,
}

impl Params {
    fn batch_config(&self) -> BatchConfig {
        BatchConfig {
            input_dir: self.directory.clone(),
            output_dir: self.output.clone(),
            skip_existing: self.skip_existing,
            quarantine_dir: self.quarantine.clone(),
        }
    }

    fn transcription_options(&self) -> Result<TranscriptionOptions> {
        let language = parse_language(&self.language)?;
        Ok(TranscriptionOptions {
            model_size: self.model,
            language,
            precision: if self.reduced_precision {
                Precision::Reduced
            } else {
                Precision::Full
            },
            word_level_timestamps: self.word_timestamps,
        })
    }
}

/// Logs through `tracing` and advances a progress bar per file.
struct ProgressTelemetry {
    inner: TracingTelemetry,
    bar: ProgressBar,
}

impl ProgressTelemetry {
    fn new() -> Result<Self> {
        let bar = ProgressBar::hidden();
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {wide_msg}",
            )
            .context("invalid progress template")?
            .progress_chars("#>-"),
        );
        Ok(Self {
            inner: TracingTelemetry,
            bar,
        })
    }
}

impl Telemetry for ProgressTelemetry {
    fn on_start(&mut self, discovered: usize) {
        self.inner.on_start(discovered);
        self.bar.set_length(discovered as u64);
        self.bar.set_draw_target(ProgressDrawTarget::stderr());
    }

    fn on_file(&mut self, report: &FileReport) {
        let inner = &mut self.inner;
        self.bar.suspend(|| inner.on_file(report));
        if let Some(name) = report.path.file_name() {
            self.bar.set_message(name.to_string_lossy().into_owned());
        }
        self.bar.inc(1);
    }

    fn on_finish(&mut self, summary: &BatchSummary) {
        self.bar.finish_and_clear();
        self.inner.on_finish(summary);
    }
}

fn main() {
    let params = Params::parse();

    let _log_guard = match logging::init(&LogConfig {
        file: params.log_file.clone(),
    }) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("failed to initialize logging: {err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = run(&params) {
        error!(error = ?err, "caption-batch failed");
        std::process::exit(1);
    }
}

fn run(params: &Params) -> Result<()> {
    let config = params.batch_config();
    let opts = params.transcription_options()?;

    if !config.input_dir.is_dir() {
        anyhow::bail!("input directory not found: {}", config.input_dir.display());
    }

    let engine = WhisperEngine::load(&params.models_dir, &opts).with_context(|| {
        format!(
            "failed to load the {} model from {} (run `fetch-model --model-size {}`)",
            opts.model_size,
            params.models_dir.display(),
            opts.model_size
        )
    })?;
    info!(
        model = %engine.model_path().display(),
        model_size = %engine.model_size(),
        precision = ?engine.precision(),
        "model ready"
    );

    let mut orchestrator =
        BatchOrchestrator::new(config, opts, engine, CaptionWriter::new(params.metadata));
    let mut telemetry = ProgressTelemetry::new()?;
    let summary = orchestrator.run(&mut telemetry)?;

    info!(
        succeeded = summary.succeeded,
        failures = summary.failures(),
        "done"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_defaults() -> anyhow::Result<()> {
        let params = Params::try_parse_from(["caption-batch", "-d", "media"])?;
        assert_eq!(params.directory, PathBuf::from("media"));
        assert_eq!(params.output, PathBuf::from("output"));
        assert_eq!(params.model, ModelSize::Tiny);
        assert_eq!(params.language, "English");
        assert_eq!(params.models_dir, PathBuf::from("./models"));
        assert!(params.quarantine.is_none());
        assert!(!params.skip_existing);

        let opts = params.transcription_options()?;
        assert_eq!(opts.language.as_deref(), Some("en"));
        assert_eq!(opts.precision, Precision::Full);
        Ok(())
    }

    #[test]
    fn params_map_onto_batch_config_and_options() -> anyhow::Result<()> {
        let params = Params::try_parse_from([
            "caption-batch",
            "--directory",
            "in",
            "-o",
            "out",
            "-m",
            "base",
            "-l",
            "auto",
            "--reduced-precision",
            "--word-timestamps",
            "--skip-existing",
            "-q",
            "failed",
            "--metadata",
        ])?;

        let config = params.batch_config();
        assert_eq!(config.input_dir, PathBuf::from("in"));
        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert!(config.skip_existing);
        assert_eq!(config.quarantine_dir, Some(PathBuf::from("failed")));

        let opts = params.transcription_options()?;
        assert_eq!(opts.model_size, ModelSize::Base);
        assert_eq!(opts.language, None);
        assert_eq!(opts.precision, Precision::Reduced);
        assert!(opts.word_level_timestamps);
        assert!(params.metadata);
        Ok(())
    }

    #[test]
    fn params_require_directory() {
        let err = Params::try_parse_from(["caption-batch"])
            .err()
            .expect("expected missing-args error");
        assert!(err.to_string().contains("--directory"));
    }

    #[test]
    fn unknown_model_is_rejected() {
        assert!(Params::try_parse_from(["caption-batch", "-d", "in", "-m", "huge"]).is_err());
    }
}
