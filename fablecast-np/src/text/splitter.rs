//! Paragraph extraction
//!
//! Splits raw book text into ordered, immutable [`ParagraphUnit`]s. The
//! primary delimiter is the blank line (`\n\n`); texts that arrive with
//! single-newline paragraph breaks (common in plain-text book dumps) fall
//! back to splitting on single newlines. Paragraph order is significant and
//! preserved end-to-end.

use fablecast_common::ParagraphUnit;

/// Primary paragraph delimiter
const PARAGRAPH_DELIMITER: &str = "\n\n";

/// Split source text into ordered paragraph units.
///
/// Whitespace-only fragments are dropped; indices are assigned after
/// filtering so they are always contiguous from zero.
pub fn split_paragraphs(text: &str) -> Vec<ParagraphUnit> {
    let primary: Vec<&str> = text
        .split(PARAGRAPH_DELIMITER)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();

    // Fallback: texts with single-newline breaks produce one giant "paragraph"
    // under the primary delimiter; re-split those on line boundaries.
    let pieces: Vec<&str> = if primary.len() <= 1 && text.trim().contains('\n') {
        text.lines()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect()
    } else {
        primary
    };

    pieces
        .into_iter()
        .enumerate()
        .map(|(index, piece)| ParagraphUnit::new(index, piece))
        .collect()
}
