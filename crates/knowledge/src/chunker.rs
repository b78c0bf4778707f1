//! Text chunking into overlapping fixed-size windows.

use crate::types::ChunkCandidate;

/// Split text into windows of at most `chunk_size` bytes, each starting
/// `overlap` bytes before the previous one ended.
///
/// Window edges are moved to UTF-8 character boundaries. The final window
/// always reaches the end of the text; an `overlap` not smaller than
/// `chunk_size` is ignored. Chunks that are blank after trimming are dropped.
pub fn chunk_text(
    source_id: &str,
    text: &str,
    chunk_size: usize,
    overlap: usize,
) -> Vec<ChunkCandidate> {
    let chunk_size = chunk_size.max(1);
    let overlap = if overlap < chunk_size { overlap } else { 0 };

    let mut chunks = Vec::new();
    let mut position = 0u32;
    let mut start = 0;

    while start < text.len() {
        let mut end = (start + chunk_size).min(text.len());
        while end > start && !text.is_char_boundary(end) {
            end -= 1;
        }
        if end == start {
            // Window smaller than one character: take the whole character
            end = next_char_boundary(text, start + 1);
        }

        let window = text[start..end].trim();
        if !window.is_empty() {
            chunks.push(ChunkCandidate {
                source_id: source_id.to_string(),
                position,
                text: window.to_string(),
                metadata: serde_json::json!({
                    "start": start,
                    "end": end,
                }),
            });
            position += 1;
        }

        if end == text.len() {
            break;
        }

        let mut next_start = end.saturating_sub(overlap);
        while next_start > start && !text.is_char_boundary(next_start) {
            next_start -= 1;
        }
        start = if next_start > start { next_start } else { end };
    }

    tracing::debug!(
        "Chunked text into {} chunks (size: {}, overlap: {})",
        chunks.len(),
        chunk_size,
        overlap
    );

    chunks
}

fn next_char_boundary(text: &str, mut idx: usize) -> usize {
    while idx < text.len() && !text.is_char_boundary(idx) {
        idx += 1;
    }
    idx.min(text.len())
}
