//! Text chunking with configurable size and overlap.

/// Chunk text into overlapping segments.
///
/// Sizes are in bytes, adjusted to UTF-8 boundaries. Every byte of the
/// trimmed input lands in at least one chunk; each chunk after the first
/// repeats up to `overlap` bytes of its predecessor.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let text = text.trim();
    if text.is_empty() || chunk_size == 0 {
        return vec![];
    }

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < text.len() {
        let mut end = (start + chunk_size).min(text.len());
        while end > start && !text.is_char_boundary(end) {
            end -= 1;
        }
        if end == start {
            // chunk_size smaller than one character
            end = start + text[start..].chars().next().map_or(1, char::len_utf8);
        }

        let piece = &text[start..end];
        let trimmed = piece.trim();
        if !trimmed.is_empty() {
            chunks.push(trimmed.to_string());
        }

        if end == text.len() {
            break;
        }

        // step back from where this chunk actually ended, never stalling
        let mut next_start = end.saturating_sub(overlap).max(start + 1);
        while next_start < end && !text.is_char_boundary(next_start) {
            next_start += 1;
        }
        start = next_start;
    }

    tracing::debug!(
        "Chunked text into {} chunks (size: {}, overlap: {})",
        chunks.len(),
        chunk_size,
        overlap
    );

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_text_basic() {
        let text = "a".repeat(1000);
        let chunks = chunk_text(&text, 200, 50);

        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.len() <= 200));
    }

    #[test]
    fn test_chunk_text_no_overlap() {
        let text = "a".repeat(300);
        let chunks = chunk_text(&text, 100, 0);

        assert_eq!(chunks.len(), 3);
    }

    #[test]
    fn test_chunk_text_empty() {
        assert!(chunk_text("", 100, 10).is_empty());
        assert!(chunk_text("   \n", 100, 10).is_empty());
    }

    #[test]
    fn test_short_text_is_one_chunk() {
        let chunks = chunk_text("Q3 revenue grew", 1000, 100);
        assert_eq!(chunks, vec!["Q3 revenue grew".to_string()]);
    }

    #[test]
    fn test_chunk_text_with_overlap() {
        let text = "abcdefghijklmnopqrstuvwxyz".repeat(10);
        let chunks = chunk_text(&text, 50, 10);

        let first_tail: String = chunks[0].chars().skip(40).collect();
        assert!(chunks[1].starts_with(&first_tail));
    }

    #[test]
    fn test_short_tail_is_kept() {
        let text = format!("{}TAIL5", "a".repeat(300));
        let chunks = chunk_text(&text, 100, 0);

        assert_eq!(chunks.len(), 4);
        assert_eq!(chunks.last().map(String::as_str), Some("TAIL5"));
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_multibyte_char_at_cut_is_kept() {
        let text = format!("{}é{}", "a".repeat(9), "b".repeat(20));
        let chunks = chunk_text(&text, 10, 0);

        assert_eq!(chunks[0], "aaaaaaaaa");
        assert!(chunks[1].starts_with('é'));
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_overlap_covers_every_byte() {
        let text = "Grand Prix à Singapour, lap 42 🏎️ pit stop".repeat(8);
        let chunks = chunk_text(&text, 32, 12);

        assert!(chunks.iter().all(|c| c.len() <= 32));
        assert_eq!(chunks.last().map(|c| text.ends_with(c.as_str())), Some(true));
        for word in ["Grand", "Singapour", "pit", "stop"] {
            assert!(chunks.iter().any(|c| c.contains(word)));
        }
    }

    #[test]
    fn test_chunk_text_utf8_boundaries() {
        let text = "Grand Prix à Singapour 🏎️ ".repeat(40);
        let chunks = chunk_text(&text, 64, 8);
        assert!(!chunks.is_empty());
    }
}
