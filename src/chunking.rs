//! Splits text into an ordered sequence of overlapping chunks.
//!
//! Boundary preference, in order: double newline, single newline, sentence
//! terminator, whitespace, hard cut. The last `overlap` characters of chunk
//! N are carried forward to the start of chunk N+1.

use unicode_segmentation::UnicodeSegmentation;

/// Split `text` into chunks of at most `chunk_size` characters, carrying
/// `overlap` characters of context between successive chunks.
///
/// Panics if `overlap >= chunk_size` — a programming error, not a runtime
/// condition the caller should handle (see `Config::from_env`, which
/// rejects this combination before it ever reaches here).
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    assert!(
        overlap < chunk_size,
        "overlap ({}) must be < chunk_size ({})",
        overlap,
        chunk_size
    );

    if text.trim().is_empty() {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut remaining = text;

    loop {
        let remaining_trimmed = remaining.trim_start();
        if remaining_trimmed.is_empty() {
            break;
        }

        if remaining_trimmed.chars().count() <= chunk_size {
            chunks.push(remaining_trimmed.trim().to_string());
            break;
        }

        let split_at = find_split_point(remaining_trimmed, chunk_size);
        let (head, tail) = char_split(remaining_trimmed, split_at);
        let head = head.trim();
        if !head.is_empty() {
            chunks.push(head.to_string());
        }

        remaining = carry_overlap(head, tail, overlap);
    }

    chunks
}

/// Build the next window: the trailing `overlap` characters of the chunk
/// just produced, followed by whatever text remains.
fn carry_overlap<'a>(head: &str, tail: &'a str, overlap: usize) -> String {
    let head_chars: Vec<char> = head.chars().collect();
    let carried_start = head_chars.len().saturating_sub(overlap);
    let carried: String = head_chars[carried_start..].iter().collect();
    format!("{}{}", carried, tail)
}

/// Find the preferred split point, in characters, at or before `budget`.
fn find_split_point(text: &str, budget: usize) -> usize {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= budget {
        return chars.len();
    }

    if let Some(pos) = rfind_within(&chars, budget, "\n\n") {
        return pos;
    }
    if let Some(pos) = rfind_within(&chars, budget, "\n") {
        return pos;
    }
    if let Some(pos) = sentence_boundary_within(text, &chars, budget) {
        return pos;
    }
    if let Some(pos) = rfind_within(&chars, budget, " ") {
        return pos;
    }

    budget
}

/// Rightmost occurrence of `needle`, ending at or before `budget` chars in,
/// returned as the character offset immediately after the needle.
fn rfind_within(chars: &[char], budget: usize, needle: &str) -> Option<usize> {
    let needle_chars: Vec<char> = needle.chars().collect();
    let window_end = budget.min(chars.len());
    if window_end < needle_chars.len() {
        return None;
    }
    for start in (0..=window_end - needle_chars.len()).rev() {
        if chars[start..start + needle_chars.len()] == needle_chars[..] {
            return Some(start + needle_chars.len());
        }
    }
    None
}

/// Rightmost sentence-terminator boundary (via Unicode sentence
/// segmentation) at or before `budget` characters.
fn sentence_boundary_within(text: &str, chars: &[char], budget: usize) -> Option<usize> {
    let window_end = budget.min(chars.len());
    let mut best = None;
    let mut char_pos = 0usize;
    for sentence in text.split_sentence_bounds() {
        let sentence_len = sentence.chars().count();
        let end = char_pos + sentence_len;
        if end > window_end {
            break;
        }
        if end > 0 {
            best = Some(end);
        }
        char_pos = end;
    }
    best
}

fn char_split(text: &str, at: usize) -> (&str, &str) {
    let byte_at = text
        .char_indices()
        .nth(at)
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    text.split_at(byte_at)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_yields_no_chunks() {
        assert!(chunk_text("", 100, 10).is_empty());
        assert!(chunk_text("   \n  ", 100, 10).is_empty());
    }

    #[test]
    fn short_input_yields_one_chunk() {
        let chunks = chunk_text("hello world", 100, 10);
        assert_eq!(chunks, vec!["hello world"]);
    }

    #[test]
    fn chunks_never_exceed_budget() {
        let text = "word ".repeat(500);
        let chunks = chunk_text(&text, 120, 20);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 120, "chunk too long: {}", chunk.len());
            assert!(!chunk.is_empty());
        }
    }

    #[test]
    fn prefers_paragraph_boundaries() {
        let text = format!("{}\n\n{}", "a".repeat(50), "b".repeat(50));
        let chunks = chunk_text(&text, 60, 10);
        assert_eq!(chunks[0], "a".repeat(50));
    }

    #[test]
    #[should_panic]
    fn rejects_overlap_not_smaller_than_chunk_size() {
        chunk_text("anything", 10, 10);
    }

    #[test]
    fn overlap_is_carried_into_next_chunk() {
        let text = format!("{} {}", "x".repeat(90), "y".repeat(90));
        let chunks = chunk_text(&text, 100, 20);
        assert!(chunks.len() >= 2);
        let tail_of_first: String = chunks[0].chars().rev().take(20).collect::<Vec<_>>().into_iter().rev().collect();
        assert!(chunks[1].starts_with(&tail_of_first) || chunks[1].contains(&tail_of_first[..5]));
    }
}
