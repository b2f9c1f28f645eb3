//! Decode a media file (audio or video container) into mono `f32` samples at Whisper's sample
//! rate.
//!
//! Files are opened as seekable sources, so containers that keep their index at the end
//! (MP4/MOV with a trailing `moov`) decode fine. The decoded samples are held in memory.

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use symphonia::core::codecs::{CODEC_TYPE_NULL, Decoder, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, Packet, Track};
use symphonia::core::io::{MediaSourceStream, MediaSourceStreamOptions};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::audio_pipeline::AudioPipeline;

/// Decode the default audio track of `path` into mono 16 kHz samples.
pub fn decode_file(path: &Path) -> Result<Vec<f32>> {
    let file =
        File::open(path).with_context(|| format!("failed to open media: {}", path.display()))?;

    let hint_extension = path.extension().and_then(|ext| ext.to_str());
    let (mut format, track) = probe_and_pick_audio_track(file, hint_extension)?;
    let mut decoder = make_decoder_for_track(&track)?;
    let mut pipeline = AudioPipeline::new();

    while let Some(packet) = next_packet(&mut format)? {
        // Video and subtitle tracks share the container.
        if packet.track_id() != track.id {
            continue;
        }
        decode_packet_into(&mut decoder, &packet, &mut pipeline)?;
    }

    pipeline.finish().context("audio pipeline failed during finalize")
}

/// Probe the container and pick the first decodable track with a known sample rate.
fn probe_and_pick_audio_track(
    file: File,
    hint_extension: Option<&str>,
) -> Result<(Box<dyn FormatReader>, Track)> {
    let mss_opts = MediaSourceStreamOptions {
        // Symphonia expects a power-of-two buffer > 32KiB for good probing behavior.
        buffer_len: 256 * 1024,
    };
    let mss = MediaSourceStream::new(Box::new(file), mss_opts);

    let mut hint = Hint::new();
    if let Some(ext) = hint_extension {
        hint.with_extension(ext);
    }

    let format_opts: FormatOptions = Default::default();
    let metadata_opts: MetadataOptions = Default::default();

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &format_opts, &metadata_opts)
        .map_err(|e| anyhow!(e))
        .context("failed to probe media container")?;

    let format = probed.format;
    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL && t.codec_params.sample_rate.is_some())
        .cloned()
        .ok_or_else(|| anyhow!("no audio track found"))?;

    Ok((format, track))
}

fn make_decoder_for_track(track: &Track) -> Result<Box<dyn Decoder>> {
    let decoder_opts: DecoderOptions = Default::default();

    symphonia::default::get_codecs()
        .make(&track.codec_params, &decoder_opts)
        .map_err(|e| anyhow!(e))
        .context("unsupported codec for audio track")
}

/// `Ok(None)` at end of stream.
///
/// An `UnexpectedEof` is the normal way Symphonia reports the end of a file; other IO errors are
/// real failures (truncated or unreadable media) and must surface.
fn next_packet(format: &mut Box<dyn FormatReader>) -> Result<Option<Packet>> {
    match format.next_packet() {
        Ok(packet) => Ok(Some(packet)),
        Err(SymphoniaError::IoError(err)) if err.kind() == std::io::ErrorKind::UnexpectedEof => {
            Ok(None)
        }
        Err(SymphoniaError::ResetRequired) => Ok(None),
        Err(e) => Err(anyhow!(e)).context("failed reading packet"),
    }
}

/// Decode one packet into the pipeline. Corrupt frames are skipped, anything else is fatal.
fn decode_packet_into(
    decoder: &mut Box<dyn Decoder>,
    packet: &Packet,
    pipeline: &mut AudioPipeline,
) -> Result<()> {
    match decoder.decode(packet) {
        Ok(decoded) => pipeline
            .push(&decoded)
            .context("audio pipeline failed while processing decoded samples"),
        Err(SymphoniaError::DecodeError(_)) => Ok(()),
        Err(e) => Err(anyhow!(e)).context("decoder failure"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn decode_missing_file_errors() {
        let err = decode_file(Path::new("/definitely/not/here.wav")).unwrap_err();
        assert!(err.to_string().contains("failed to open media"));
    }

    #[test]
    fn decode_garbage_fails_probing() -> anyhow::Result<()> {
        let mut file = tempfile::Builder::new().suffix(".mp3").tempfile()?;
        file.write_all(b"this is not audio at all")?;
        file.flush()?;

        let err = decode_file(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("failed to probe media container"));
        Ok(())
    }

    #[test]
    fn decode_pcm_wav_yields_samples() -> anyhow::Result<()> {
        let mut file = tempfile::Builder::new().suffix(".wav").tempfile()?;
        file.write_all(&pcm16_mono_wav(16_000, &[0, 1000, -1000, i16::MAX]))?;
        file.flush()?;

        let samples = decode_file(file.path())?;
        assert_eq!(samples.len(), 4);
        assert!((samples[3] - 1.0).abs() < 1e-3);
        Ok(())
    }

    fn pcm16_mono_wav(rate: u32, samples: &[i16]) -> Vec<u8> {
        let data_len = (samples.len() * 2) as u32;
        let mut out = Vec::new();
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&(36 + data_len).to_le_bytes());
        out.extend_from_slice(b"WAVEfmt ");
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes()); // PCM
        out.extend_from_slice(&1u16.to_le_bytes()); // mono
        out.extend_from_slice(&rate.to_le_bytes());
        out.extend_from_slice(&(rate * 2).to_le_bytes());
        out.extend_from_slice(&2u16.to_le_bytes());
        out.extend_from_slice(&16u16.to_le_bytes());
        out.extend_from_slice(b"data");
        out.extend_from_slice(&data_len.to_le_bytes());
        for s in samples {
            out.extend_from_slice(&s.to_le_bytes());
        }
        out
    }
}
