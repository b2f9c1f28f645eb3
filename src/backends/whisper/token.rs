use anyhow::{Context, Result};
use whisper_rs::WhisperSegment;

use crate::transcript::{Token, centiseconds_to_seconds};

pub(super) fn tokens_from_segment(segment: &WhisperSegment) -> Result<Vec<Token>> {
    let token_count = segment.n_tokens();
    let token_count = usize::try_from(token_count)
        .with_context(|| format!("segment reported negative token count: {token_count}"))?;

    (0..token_count)
        .map(|idx| {
            let token = segment
                .get_token(idx as i32)
                .with_context(|| format!("failed to get token {idx} from segment"))?;
            let data = token.token_data();
            let text = token
                .to_str()
                .with_context(|| format!("failed to get token text at index {idx}"))?
                .to_owned();

            Ok(Token {
                start_seconds: centiseconds_to_seconds(data.t0),
                end_seconds: centiseconds_to_seconds(data.t1),
                text,
                probability: data.p,
            })
        })
        .collect()
}
