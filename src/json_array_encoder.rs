use anyhow::{Result, bail};
use std::io::Write;

use crate::segment_encoder::SegmentEncoder;
use crate::transcript::Segment;

/// A `SegmentEncoder` that writes segments as a single JSON array, one element per line.
///
/// Example output:
/// ```json
/// [
/// {"start_seconds":0.0,"end_seconds":1.2,"text":"hello"},
/// {"start_seconds":1.2,"end_seconds":2.5,"text":"world"}
/// ]
/// ```
pub struct JsonArrayEncoder<W: Write> {
    w: W,

    /// Whether the opening `[` has been written.
    started: bool,

    /// Whether the next element is the first one (no leading comma).
    first: bool,

    closed: bool,
}

impl<W: Write> JsonArrayEncoder<W> {
    pub fn new(w: W) -> Self {
        Self {
            w,
            started: false,
            first: true,
            closed: false,
        }
    }

    fn start_if_needed(&mut self) -> Result<()> {
        if !self.started {
            self.w.write_all(b"[")?;
            self.started = true;
        }
        Ok(())
    }
}

impl<W: Write> SegmentEncoder for JsonArrayEncoder<W> {
    fn write_segment(&mut self, seg: &Segment) -> Result<()> {
        if self.closed {
            bail!("cannot write segment: encoder is already closed");
        }

        self.start_if_needed()?;

        if self.first {
            self.w.write_all(b"\n")?;
        } else {
            self.w.write_all(b",\n")?;
        }
        self.first = false;

        serde_json::to_writer(&mut self.w, seg)?;
        Ok(())
    }

    /// Terminate the array (an empty transcript yields `[]`) and flush. Idempotent.
    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }

        self.start_if_needed()?;
        if !self.first {
            self.w.write_all(b"\n")?;
        }
        self.w.write_all(b"]\n")?;
        self.w.flush()?;

        self.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::Token;

    fn seg(start: f32, end: f32, text: &str) -> Segment {
        Segment {
            start_seconds: start,
            end_seconds: end,
            text: text.to_string(),
            tokens: Vec::new(),
        }
    }

    #[test]
    fn json_array_close_without_segments_emits_empty_array() -> anyhow::Result<()> {
        let mut out = Vec::new();
        let mut enc = JsonArrayEncoder::new(&mut out);
        enc.close()?;
        enc.close()?;
        assert_eq!(std::str::from_utf8(&out)?, "[]\n");
        Ok(())
    }

    #[test]
    fn json_array_is_valid_and_keeps_tokens() -> anyhow::Result<()> {
        let mut out = Vec::new();
        let mut enc = JsonArrayEncoder::new(&mut out);

        let mut with_words = seg(1.0, 2.5, "world");
        with_words.tokens.push(Token {
            start_seconds: 1.0,
            end_seconds: 2.5,
            text: " world".to_owned(),
            probability: 0.9,
        });

        enc.write_segment(&seg(0.0, 1.0, "hello"))?;
        enc.write_segment(&with_words)?;
        enc.close()?;

        let parsed: serde_json::Value = serde_json::from_slice(&out)?;
        let arr = parsed.as_array().expect("expected JSON array");
        assert_eq!(arr.len(), 2);
        assert_eq!(arr[0]["text"], "hello");
        assert!(arr[0].get("tokens").is_none());
        assert_eq!(arr[1]["tokens"][0]["text"], " world");
        Ok(())
    }

    #[test]
    fn json_array_write_after_close_errors() -> anyhow::Result<()> {
        let mut out = Vec::new();
        let mut enc = JsonArrayEncoder::new(&mut out);
        enc.close()?;
        let err = enc.write_segment(&seg(0.0, 1.0, "nope")).unwrap_err();
        assert!(err.to_string().contains("already closed"));
        Ok(())
    }
}
