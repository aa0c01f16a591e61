//! Seam between the session and concrete document parsers.

use crate::error::Result;
use crate::types::SlideRecord;

/// Turns a presentation file's bytes into ordered slide records.
///
/// Implementations must be pure: the same bytes always give the same records,
/// with `slide_number` running 1..=N and no slide dropped.
pub trait DeckExtractor {
    fn extract(&self, data: &[u8]) -> Result<Vec<SlideRecord>>;
}
