//! PCM normalization for the decoder.
//!
//! Decoded Symphonia buffers are converted to interleaved `f32`, downmixed to mono and resampled
//! to [`TARGET_SAMPLE_RATE`] when the source rate differs. Output accumulates in memory until
//! [`AudioPipeline::finish`].

use anyhow::{Context, Result, anyhow, bail};
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use symphonia::core::audio::{AudioBufferRef, SampleBuffer};

/// Whisper's expected mono sample rate (Hz).
pub const TARGET_SAMPLE_RATE: u32 = 16_000;

/// Source frames fed to rubato per `process()` call.
const RESAMPLER_CHUNK_FRAMES: usize = 2048;

pub struct AudioPipeline {
    sample_buf: Option<SampleBuffer<f32>>,

    // Set on the first decoded buffer; a mid-stream rate change is rejected.
    src_rate: Option<u32>,

    // Only present when the source rate differs from the target.
    resampler: Option<SincFixedIn<f32>>,

    // Mono source samples waiting for a full resampler block.
    pending: Vec<f32>,

    out: Vec<f32>,
}

impl Default for AudioPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioPipeline {
    pub fn new() -> Self {
        Self {
            sample_buf: None,
            src_rate: None,
            resampler: None,
            pending: Vec::new(),
            out: Vec::new(),
        }
    }

    /// Push one decoded buffer through downmix and (if needed) resampling.
    pub fn push(&mut self, decoded: &AudioBufferRef<'_>) -> Result<()> {
        let (interleaved, src_rate, channels) =
            decoded_to_interleaved_f32(decoded, &mut self.sample_buf)?;

        match self.src_rate {
            None => self.src_rate = Some(src_rate),
            Some(rate) if rate != src_rate => {
                bail!("sample rate changed mid-stream ({rate} Hz -> {src_rate} Hz)")
            }
            Some(_) => {}
        }

        let mono = downmix_to_mono(&interleaved, channels);
        self.push_mono(&mono, src_rate)
    }

    /// Flush the resampler tail and hand back every sample produced.
    pub fn finish(mut self) -> Result<Vec<f32>> {
        let Some(rs) = self.resampler.as_mut() else {
            return Ok(self.out);
        };

        if !self.pending.is_empty() {
            // rubato wants exact blocks; pad the tail with silence.
            let in_max = rs.input_frames_max();
            let rem = self.pending.len() % in_max;
            if rem != 0 {
                self.pending.resize(self.pending.len() + (in_max - rem), 0.0);
            }
            self.drain_full_blocks()?;
        }

        Ok(self.out)
    }

    fn push_mono(&mut self, mono: &[f32], src_rate: u32) -> Result<()> {
        if src_rate == TARGET_SAMPLE_RATE {
            self.out.extend_from_slice(mono);
            return Ok(());
        }

        self.ensure_resampler(src_rate)?;
        self.pending.extend_from_slice(mono);
        self.drain_full_blocks()
    }

    fn ensure_resampler(&mut self, src_rate: u32) -> Result<()> {
        if self.resampler.is_some() {
            return Ok(());
        }

        let rs = SincFixedIn::<f32>::new(
            TARGET_SAMPLE_RATE as f64 / src_rate as f64,
            2.0,
            SincInterpolationParameters {
                sinc_len: 256,
                f_cutoff: 0.95,
                interpolation: SincInterpolationType::Linear,
                oversampling_factor: 256,
                window: WindowFunction::BlackmanHarris2,
            },
            RESAMPLER_CHUNK_FRAMES,
            1,
        )
        .map_err(|e| anyhow!(e))
        .context("failed to init resampler")?;

        self.resampler = Some(rs);
        Ok(())
    }

    fn drain_full_blocks(&mut self) -> Result<()> {
        let rs = self
            .resampler
            .as_mut()
            .ok_or_else(|| anyhow!("resampler not initialized"))?;
        let in_max = rs.input_frames_max();

        while self.pending.len() >= in_max {
            let block: Vec<f32> = self.pending.drain(..in_max).collect();
            let mut resampled = rs
                .process(&[block], None)
                .map_err(|e| anyhow!(e))
                .context("resampler process failed")?;

            let mono = resampled
                .pop()
                .ok_or_else(|| anyhow!("expected mono output from resampler"))?;
            self.out.extend_from_slice(&mono);
        }

        Ok(())
    }
}

fn decoded_to_interleaved_f32(
    decoded: &AudioBufferRef<'_>,
    sample_buf: &mut Option<SampleBuffer<f32>>,
) -> Result<(Vec<f32>, u32, usize)> {
    let spec = *decoded.spec();
    let capacity = decoded.capacity() as u64;

    // Packets can grow (e.g. variable frame sizes); reallocate when the scratch buffer is too small.
    let too_small = sample_buf
        .as_ref()
        .is_none_or(|buf| buf.capacity() < decoded.capacity() * spec.channels.count());
    if too_small {
        *sample_buf = Some(SampleBuffer::<f32>::new(capacity, spec));
    }

    let buf = sample_buf
        .as_mut()
        .ok_or_else(|| anyhow!("sample buffer not initialized"))?;
    buf.copy_interleaved_ref(decoded.clone());

    let channels = spec.channels.count();
    if channels == 0 {
        bail!("decoded audio had zero channels");
    }

    Ok((buf.samples().to_vec(), spec.rate, channels))
}

/// Equal-weight average across channels.
fn downmix_to_mono(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels == 1 {
        return interleaved.to_vec();
    }

    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}
