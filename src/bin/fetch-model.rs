// Downloads the GGML weights for a model tier into the models directory used by `caption-batch`.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::blocking::Client;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use caption_batch::{ModelSize, Precision};

#[derive(Parser, Debug)]
#[command(name = "fetch-model")]
#[command(about = "Download Whisper models for caption-batch", long_about = None)]
struct Args {
    /// List model tiers with their file names and exit.
    #[arg(long)]
    list: bool,

    /// Model tier to download.
    #[arg(long = "model-size", value_enum, required_unless_present = "list")]
    model_size: Option<ModelSize>,

    /// Download the quantized weights instead of the full-precision ones.
    #[arg(long = "reduced-precision", default_value_t = false)]
    reduced_precision: bool,

    /// Target directory to store models (created if missing).
    #[arg(long, default_value = "./models")]
    dir: PathBuf,
}

impl Args {
    fn precision(&self) -> Precision {
        if self.reduced_precision {
            Precision::Reduced
        } else {
            Precision::Full
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.list {
        print!("{}", model_list_string());
        return Ok(());
    }

    let Some(model_size) = args.model_size else {
        anyhow::bail!("--model-size is required");
    };
    let precision = args.precision();

    fs::create_dir_all(&args.dir)
        .with_context(|| format!("failed to create target dir: {}", args.dir.display()))?;

    let dest_path = model_size.model_path(&args.dir, precision);
    if dest_path.exists() {
        println!("already exists: {}", dest_path.display());
        return Ok(());
    }

    let url = model_size.download_url(precision);
    println!("downloading {}", model_size.model_file_name(precision));
    println!("    {url}");

    let client = Client::builder()
        .user_agent("caption-batch-fetch-model")
        .build()
        .context("failed to build HTTP client")?;

    download_to_path(&client, &url, &dest_path)?;

    println!("saved: {}", dest_path.display());
    Ok(())
}

fn model_list_string() -> String {
    let mut out = String::from("Model tiers (full / reduced precision):\n");
    for size in ModelSize::ALL {
        out.push_str(&format!(
            "  - {:<7} {} / {}\n",
            size.as_str(),
            size.model_file_name(Precision::Full),
            size.model_file_name(Precision::Reduced)
        ));
    }
    out
}

fn download_to_path(client: &Client, url: &str, dest_path: &Path) -> Result<()> {
    let resp = client
        .get(url)
        .send()
        .with_context(|| format!("request failed: {url}"))?
        .error_for_status()
        .with_context(|| format!("download failed (bad status): {url}"))?;

    let total = resp.content_length();
    download_to_path_with_reader(resp, total, dest_path)
}

/// Stream `reader` into `dest_path.part`, then fsync and rename into place.
fn download_to_path_with_reader<R: Read>(
    mut reader: R,
    total_bytes: Option<u64>,
    dest_path: &Path,
) -> Result<()> {
    let pb = match total_bytes {
        Some(total) if total > 0 => ProgressBar::new(total),
        _ => ProgressBar::new_spinner(),
    };
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} {bytes}/{total_bytes} {bar:40.cyan/blue} {eta}",
        )
        .context("invalid progress template")?
        .progress_chars("#>-"),
    );

    let tmp_path = PathBuf::from(format!("{}.part", dest_path.display()));

    let result = (|| -> Result<()> {
        let mut file = fs::File::create(&tmp_path)
            .with_context(|| format!("failed to create temp file: {}", tmp_path.display()))?;

        let mut buf = [0u8; 64 * 1024];
        loop {
            let n = reader.read(&mut buf)?;
            if n == 0 {
                break;
            }
            file.write_all(&buf[..n])?;
            pb.inc(n as u64);
        }

        file.sync_all()?;
        fs::rename(&tmp_path, dest_path)
            .with_context(|| format!("failed to move into place: {}", dest_path.display()))?;
        Ok(())
    })();

    pb.finish_and_clear();
    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_list_mentions_every_tier() {
        let list = model_list_string();
        for size in ModelSize::ALL {
            assert!(list.contains(size.model_file_name(Precision::Full)));
            assert!(list.contains(size.model_file_name(Precision::Reduced)));
        }
    }

    #[test]
    fn args_require_model_size_unless_list() {
        let err = Args::try_parse_from(["fetch-model"])
            .err()
            .expect("expected missing-args error");
        assert!(err.to_string().contains("--model-size"));

        let args = Args::try_parse_from(["fetch-model", "--list"]).expect("parse list args");
        assert!(args.list);
        assert!(args.model_size.is_none());
    }

    #[test]
    fn args_select_precision() -> anyhow::Result<()> {
        let args = Args::try_parse_from([
            "fetch-model",
            "--model-size",
            "small",
            "--reduced-precision",
        ])?;
        assert_eq!(args.model_size, Some(ModelSize::Small));
        assert_eq!(args.precision(), Precision::Reduced);
        assert_eq!(args.dir, PathBuf::from("./models"));
        Ok(())
    }

    #[test]
    fn download_to_path_with_reader_writes_and_renames() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let dest_path = dir.path().join("ggml-tiny.bin");
        let tmp_path = PathBuf::from(format!("{}.part", dest_path.display()));

        let bytes = b"abc123".to_vec();
        download_to_path_with_reader(
            std::io::Cursor::new(bytes.clone()),
            Some(bytes.len() as u64),
            &dest_path,
        )?;

        assert!(!tmp_path.exists());
        assert_eq!(fs::read(&dest_path)?, bytes);
        Ok(())
    }

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("simulated read failure"))
        }
    }

    #[test]
    fn download_to_path_with_reader_cleans_up_part_file_on_error() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let dest_path = dir.path().join("ggml-tiny.bin");
        let tmp_path = PathBuf::from(format!("{}.part", dest_path.display()));

        let err = download_to_path_with_reader(FailingReader, None, &dest_path).unwrap_err();
        assert!(err.to_string().contains("simulated read failure"));
        assert!(!dest_path.exists());
        assert!(!tmp_path.exists());
        Ok(())
    }
}
