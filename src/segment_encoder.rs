use anyhow::Result;

use crate::transcript::Segment;

/// Streams transcript segments into some serialized form.
///
/// `close` finalizes the output and must be idempotent; writing after `close` is an error.
pub trait SegmentEncoder {
    fn write_segment(&mut self, seg: &Segment) -> Result<()>;
    fn close(&mut self) -> Result<()>;
}
