//! Overlapping character-window chunker.
//!
//! Splits extracted document text into windows of at most `chunk_size`
//! characters. A window's end is pulled back to the last paragraph break,
//! line break, or space past its overlap region when one exists; otherwise the
//! text is cut hard. The next window starts exactly `chunk_overlap` characters
//! before the previous window's end, so adjacent chunks always share an
//! `chunk_overlap`-character boundary region.
//!
//! Whitespace-only windows at the start or end of the text are dropped.
//! Interior ones are kept so the shared-region guarantee holds throughout.
//!
//! Sizes count Unicode scalar values, so multi-byte scripts (Arabic) are never
//! split inside a character.
//!
//! Each chunk receives a random UUID plus a SHA-256 hash of its text.

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::models::Chunk;

/// Preferred break points, strongest first.
const SEPARATORS: [&[char]; 3] = [&['\n', '\n'], &['\n'], &[' ']];

/// Split text into overlapping segments.
///
/// Returns an empty vector for blank input and a single segment (the input
/// unchanged) when it fits in one window. `chunk_overlap` must be smaller
/// than `chunk_size`; configuration validation enforces this.
pub fn split_text(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    if text.trim().is_empty() || chunk_size == 0 {
        return Vec::new();
    }

    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= chunk_size {
        return vec![text.to_string()];
    }

    let overlap = chunk_overlap.min(chunk_size - 1);
    let mut segments = Vec::new();
    let mut start = 0usize;

    loop {
        let hard_end = (start + chunk_size).min(chars.len());
        if hard_end == chars.len() {
            segments.push(chars[start..].iter().collect::<String>());
            break;
        }

        // Never break inside the overlap region, and avoid tiny windows.
        let min_end = (start + overlap + 1).max(start + chunk_size / 2);
        let end = find_break(&chars, min_end, hard_end).unwrap_or(hard_end);

        segments.push(chars[start..end].iter().collect::<String>());
        start = end - overlap;
    }

    // Only the ends are trimmed; dropping an interior window would break the
    // shared region between its neighbours.
    let Some(first) = segments.iter().position(|s| !s.trim().is_empty()) else {
        return Vec::new();
    };
    let last = segments
        .iter()
        .rposition(|s| !s.trim().is_empty())
        .unwrap_or(first);
    segments.truncate(last + 1);
    segments.drain(..first);
    segments
}

/// Latest position in `min_end..=max_end` that directly follows a separator.
fn find_break(chars: &[char], min_end: usize, max_end: usize) -> Option<usize> {
    for sep in SEPARATORS {
        let found = (min_end..=max_end)
            .rev()
            .find(|&end| end >= sep.len() && chars[end - sep.len()..end] == *sep);
        if found.is_some() {
            return found;
        }
    }
    None
}

/// Split a document's text into [`Chunk`]s with contiguous indices from 0.
pub fn chunk_text(
    document_id: &str,
    text: &str,
    chunk_size: usize,
    chunk_overlap: usize,
) -> Vec<Chunk> {
    split_text(text, chunk_size, chunk_overlap)
        .into_iter()
        .enumerate()
        .map(|(i, segment)| make_chunk(document_id, i as i64, segment))
        .collect()
}

fn make_chunk(document_id: &str, index: i64, text: String) -> Chunk {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    Chunk {
        id: Uuid::new_v4().to_string(),
        document_id: document_id.to_string(),
        chunk_index: index,
        text,
        hash,
    }
}
