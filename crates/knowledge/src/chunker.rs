//! Overlapping text chunker.
//!
//! Splits a document into windows of at most `chunk_size` characters where
//! each window starts exactly `overlap` characters before the previous one
//! ended. Window ends prefer, in order: paragraph breaks, line breaks,
//! sentence boundaries, word boundaries, and finally a hard cut.
//!
//! Chunks are never trimmed. Dropping the first `overlap` characters of every
//! chunk after the first and concatenating the rest yields the input again.

use unicode_segmentation::UnicodeSegmentation;

/// Candidate split positions of one kind, as sorted char offsets.
struct Boundaries {
    paragraphs: Vec<usize>,
    lines: Vec<usize>,
    sentences: Vec<usize>,
    words: Vec<usize>,
}

impl Boundaries {
    fn scan(text: &str, chars: &[char]) -> Self {
        let mut paragraphs = Vec::new();
        let mut lines = Vec::new();
        let mut words = Vec::new();

        for pos in 1..chars.len() {
            let prev = chars[pos - 1];
            if prev == '\n' {
                lines.push(pos);
                if pos >= 2 && chars[pos - 2] == '\n' {
                    paragraphs.push(pos);
                }
            }
            if prev.is_whitespace() && !chars[pos].is_whitespace() {
                words.push(pos);
            }
        }

        // Sentence starts come back as byte offsets
        let byte_starts: Vec<usize> = text
            .split_sentence_bound_indices()
            .map(|(idx, _)| idx)
            .filter(|&idx| idx > 0)
            .collect();
        let mut sentences = Vec::with_capacity(byte_starts.len());
        let mut next = byte_starts.iter().peekable();
        for (char_pos, (byte_pos, _)) in text.char_indices().enumerate() {
            while let Some(&&start) = next.peek() {
                if start > byte_pos {
                    break;
                }
                if start == byte_pos {
                    sentences.push(char_pos);
                }
                next.next();
            }
        }

        Self {
            paragraphs,
            lines,
            sentences,
            words,
        }
    }

    /// Best split in `lo..=hi`: the last position of the most preferred kind.
    fn best_in(&self, lo: usize, hi: usize) -> Option<usize> {
        [&self.paragraphs, &self.lines, &self.sentences, &self.words]
            .into_iter()
            .find_map(|positions| last_in_range(positions, lo, hi))
    }
}

fn last_in_range(sorted: &[usize], lo: usize, hi: usize) -> Option<usize> {
    let end = sorted.partition_point(|&p| p <= hi);
    match end.checked_sub(1).map(|i| sorted[i]) {
        Some(pos) if pos >= lo => Some(pos),
        _ => None,
    }
}

/// Split `text` into overlapping chunks.
///
/// `overlap` is clamped below `chunk_size`. Empty or whitespace-only input
/// gives no chunks.
pub fn chunk(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let size = chunk_size.max(1);
    let overlap = overlap.min(size - 1);
    let chars: Vec<char> = text.chars().collect();
    let total = chars.len();

    if total <= size {
        return vec![text.to_string()];
    }

    let boundaries = Boundaries::scan(text, &chars);
    // A semantic split must keep half a window and always move past the overlap
    let min_len = (size / 2).max(overlap + 1);

    let mut chunks = Vec::new();
    let mut start = 0;
    loop {
        if total - start <= size {
            chunks.push(chars[start..].iter().collect());
            break;
        }

        let hard_end = start + size;
        let end = boundaries
            .best_in(start + min_len, hard_end)
            .unwrap_or(hard_end);

        chunks.push(chars[start..end].iter().collect());
        start = end - overlap;
    }

    tracing::debug!(
        "Chunked {} chars into {} chunks (size {}, overlap {})",
        total,
        chunks.len(),
        size,
        overlap
    );
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reconstruct(chunks: &[String], overlap: usize) -> String {
        let mut out = String::new();
        for (i, chunk) in chunks.iter().enumerate() {
            if i == 0 {
                out.push_str(chunk);
            } else {
                out.extend(chunk.chars().skip(overlap));
            }
        }
        out
    }

    fn assert_overlaps(chunks: &[String], overlap: usize) {
        for pair in chunks.windows(2) {
            let prev: Vec<char> = pair[0].chars().collect();
            let tail: String = prev[prev.len() - overlap..].iter().collect();
            let head: String = pair[1].chars().take(overlap).collect();
            assert_eq!(tail, head);
        }
    }

    #[test]
    fn test_empty_and_whitespace_input() {
        assert!(chunk("", 500, 50).is_empty());
        assert!(chunk("   \n\t  ", 500, 50).is_empty());
    }

    #[test]
    fn test_short_input_is_single_chunk() {
        let chunks = chunk("Section 303 covers theft offenses.", 500, 50);
        assert_eq!(chunks, vec!["Section 303 covers theft offenses.".to_string()]);
    }

    #[test]
    fn test_1200_chars_with_sentences() {
        let text: String = "The accused entered the premises at night. "
            .repeat(30)
            .chars()
            .take(1200)
            .collect();

        let chunks = chunk(&text, 500, 50);

        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.chars().count() <= 500));
        assert_eq!(chunks[0].chars().count(), 473);
        assert!(chunks[1].starts_with("night. The accused"));
        assert_overlaps(&chunks, 50);
        assert_eq!(reconstruct(&chunks, 50), text);
    }

    #[test]
    fn test_hard_cut_without_boundaries() {
        let text = "x".repeat(1200);
        let chunks = chunk(&text, 500, 50);

        let lengths: Vec<usize> = chunks.iter().map(|c| c.len()).collect();
        assert_eq!(lengths, vec![500, 500, 300]);
        assert_eq!(reconstruct(&chunks, 50), text);
    }

    #[test]
    fn test_prefers_paragraph_breaks() {
        let first = "a".repeat(300);
        let second = "b ".repeat(200);
        let text = format!("{}\n\n{}", first, second);

        let chunks = chunk(&text, 500, 50);

        assert!(chunks[0].ends_with("\n\n"));
        assert_eq!(chunks[0].chars().count(), 302);
        assert_overlaps(&chunks, 50);
        assert_eq!(reconstruct(&chunks, 50), text);
    }

    #[test]
    fn test_ignores_boundaries_that_leave_tiny_windows() {
        // The only line break sits 10 chars in; splitting there would waste a window
        let text = format!("{}\n{}", "a".repeat(10), "b".repeat(990));
        let chunks = chunk(&text, 500, 50);

        assert_eq!(chunks[0].chars().count(), 500);
        assert_eq!(reconstruct(&chunks, 50), text);
    }

    #[test]
    fn test_overlap_is_clamped() {
        let text = "y".repeat(30);
        let chunks = chunk(&text, 10, 25);

        assert!(chunks.iter().all(|c| c.chars().count() <= 10));
        assert_overlaps(&chunks, 9);
        assert_eq!(reconstruct(&chunks, 9), text);
    }

    #[test]
    fn test_multibyte_text() {
        let text = "धारा ३०३ चोरी के अपराध। ".repeat(60);
        let chunks = chunk(&text, 120, 20);

        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.chars().count() <= 120));
        assert_overlaps(&chunks, 20);
        assert_eq!(reconstruct(&chunks, 20), text);
    }
}
