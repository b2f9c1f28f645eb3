use anyhow::{Context, Result};
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperSegment, WhisperState};

use crate::opts::TranscriptionOptions;
use crate::transcript::{Segment, Token, centiseconds_to_seconds};

use super::token::tokens_from_segment;

/// Run a full Whisper pass over `samples` and collect every segment.
pub(super) fn collect_segments(
    ctx: &WhisperContext,
    opts: &TranscriptionOptions,
    samples: &[f32],
) -> Result<Vec<Segment>> {
    let state = run_whisper_full(ctx, opts, samples)?;
    state
        .as_iter()
        .map(|whisper_segment| to_segment(whisper_segment, opts.word_level_timestamps))
        .collect()
}

fn to_segment(segment: WhisperSegment, word_level: bool) -> Result<Segment> {
    let text = segment
        .to_str()
        .context("failed to get segment text")?
        .trim()
        .to_owned();

    if !word_level {
        return Ok(Segment {
            start_seconds: centiseconds_to_seconds(segment.start_timestamp()),
            end_seconds: centiseconds_to_seconds(segment.end_timestamp()),
            text,
            tokens: Vec::new(),
        });
    }

    let tokens: Vec<Token> = tokens_from_segment(&segment)?
        .into_iter()
        .filter(|token| !is_special_token(&token.text))
        .collect();

    // Token timing is tighter than segment timing (no leading/trailing silence) when available.
    let (start_seconds, end_seconds) = segment_bounds(&segment, &tokens);

    Ok(Segment {
        start_seconds,
        end_seconds,
        text,
        tokens,
    })
}

/// Whisper control tokens look like `[_BEG_]` or `[_TT_50]`.
fn is_special_token(text: &str) -> bool {
    text.starts_with("[_") && text.ends_with(']')
}

fn segment_bounds(segment: &WhisperSegment, tokens: &[Token]) -> (f32, f32) {
    let timed = tokens
        .iter()
        .filter(|t| t.start_seconds > 0.0 || t.end_seconds > 0.0);

    let mut bounds: Option<(f32, f32)> = None;
    for token in timed {
        bounds = Some(match bounds {
            None => (token.start_seconds, token.end_seconds),
            Some((s, e)) => (s.min(token.start_seconds), e.max(token.end_seconds)),
        });
    }

    match bounds {
        Some((s, e)) if e >= s => (s, e),
        _ => (
            centiseconds_to_seconds(segment.start_timestamp()),
            centiseconds_to_seconds(segment.end_timestamp()),
        ),
    }
}

fn build_full_params(opts: &TranscriptionOptions) -> FullParams<'_, '_> {
    let mut params = FullParams::new(SamplingStrategy::BeamSearch {
        beam_size: 5,
        patience: 1.0,
    });

    params.set_n_threads(num_cpus::get() as i32);
    params.set_translate(false);
    params.set_language(opts.language.as_deref());
    params.set_no_context(true);
    params.set_single_segment(false);

    params.set_print_progress(false);
    params.set_print_special(false);
    params.set_print_realtime(false);
    params.set_print_timestamps(false);

    params.set_token_timestamps(opts.word_level_timestamps);

    params
}

fn run_whisper_full(
    ctx: &WhisperContext,
    opts: &TranscriptionOptions,
    samples: &[f32],
) -> Result<WhisperState> {
    let params = build_full_params(opts);

    let mut state = ctx
        .create_state()
        .context("failed to create whisper state")?;

    state
        .full(params, samples)
        .context("failed to run whisper full()")?;

    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn special_tokens_are_recognized() {
        assert!(is_special_token("[_BEG_]"));
        assert!(is_special_token("[_TT_50]"));
        assert!(!is_special_token(" hello"));
        assert!(!is_special_token("[music]"));
    }
}
