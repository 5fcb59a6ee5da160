use super::text::{char_len, find_char, head, rfind_char, skip, tail};

const SENTENCE_BREAK: &str = ". ";

/// Fraction of `max_chunk_size` past which a truncated chunk is cut back
/// to its last sentence break
const TRUNCATION_SENTENCE_FLOOR: f32 = 0.8;

/// Second chunking pass: borrow context from neighbouring chunks.
///
/// Each chunk is prefixed with the trailing `ratio` of its predecessor and
/// suffixed with the leading `ratio` of its successor. A borrowed window is
/// shortened to a sentence break when one falls within its first half.
/// Results longer than `max_chunk_size` characters are truncated, preferring
/// a sentence break in the last fifth.
pub fn apply_semantic_overlap(chunks: &[String], ratio: f32, max_chunk_size: usize) -> Vec<String> {
    if chunks.len() <= 1 {
        return chunks.to_vec();
    }

    let last = chunks.len() - 1;
    chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| {
            let mut enhanced = chunk.clone();

            if i > 0 {
                if let Some(prefix) = leading_context(&chunks[i - 1], ratio) {
                    enhanced = format!("{} {}", prefix, enhanced);
                }
            }

            if i < last {
                if let Some(suffix) = trailing_context(&chunks[i + 1], ratio) {
                    enhanced = format!("{} {}", enhanced, suffix);
                }
            }

            truncate_at_sentence(&enhanced, max_chunk_size).trim().to_string()
        })
        .collect()
}

/// Tail of the previous chunk, starting after its last sentence break when
/// that break lies in the second half of the window
fn leading_context(prev: &str, ratio: f32) -> Option<&str> {
    let size = window_size(prev, ratio);
    if size == 0 {
        return None;
    }

    let window = tail(prev, size);
    match rfind_char(window, SENTENCE_BREAK) {
        Some(pos) if pos > size / 2 => Some(skip(window, pos + SENTENCE_BREAK.len())),
        _ => Some(window),
    }
}

/// Head of the next chunk, ending at its first sentence break when that
/// break lies in the first half of the window
fn trailing_context(next: &str, ratio: f32) -> Option<&str> {
    let size = window_size(next, ratio);
    if size == 0 {
        return None;
    }

    let window = head(next, size);
    match find_char(window, SENTENCE_BREAK) {
        Some(pos) if pos > 0 && pos < size / 2 => Some(head(window, pos + 1)),
        _ => Some(window),
    }
}

fn window_size(text: &str, ratio: f32) -> usize {
    (char_len(text) as f32 * ratio) as usize
}

fn truncate_at_sentence(text: &str, max_chunk_size: usize) -> &str {
    if char_len(text) <= max_chunk_size {
        return text;
    }

    let truncated = head(text, max_chunk_size);
    match rfind_char(truncated, SENTENCE_BREAK) {
        Some(pos) if pos as f32 > max_chunk_size as f32 * TRUNCATION_SENTENCE_FLOOR => {
            head(truncated, pos + 1)
        }
        _ => truncated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_chunk_untouched() {
        let chunks = vec!["only one".to_string()];
        assert_eq!(apply_semantic_overlap(&chunks, 0.15, 100), chunks);
    }

    #[test]
    fn test_neighbours_are_borrowed() {
        let chunks = vec!["a".repeat(20), "b".repeat(20), "c".repeat(20)];
        let out = apply_semantic_overlap(&chunks, 0.25, 1000);
        assert_eq!(out[0], format!("{} {}", "a".repeat(20), "b".repeat(5)));
        assert_eq!(out[1], format!("{} {} {}", "a".repeat(5), "b".repeat(20), "c".repeat(5)));
        assert_eq!(out[2], format!("{} {}", "b".repeat(5), "c".repeat(20)));
    }

    #[test]
    fn test_previous_window_starts_after_sentence_break() {
        // 40 chars; 50% window = last 20 chars, break at index 12
        let prev = format!("{}xxxxxxx tail. end pt", "p".repeat(20));
        let chunks = vec![prev, "next chunk".to_string()];
        let out = apply_semantic_overlap(&chunks, 0.5, 1000);
        assert_eq!(out[1], "end pt next chunk");
    }

    #[test]
    fn test_next_window_ends_at_sentence_break() {
        // 40 chars; 50% window = first 20 chars, break at index 3
        let next = format!("One. two three four{}", "n".repeat(21));
        let chunks = vec!["first".to_string(), next];
        let out = apply_semantic_overlap(&chunks, 0.5, 1000);
        assert_eq!(out[0], "first One.");
    }

    #[test]
    fn test_truncation_prefers_late_sentence_break() {
        let text = format!("{}. {}", "s".repeat(90), "t".repeat(30));
        assert_eq!(truncate_at_sentence(&text, 100), format!("{}.", "s".repeat(90)));

        let early = format!("{}. {}", "s".repeat(10), "t".repeat(120));
        assert_eq!(char_len(truncate_at_sentence(&early, 100)), 100);
    }

    #[test]
    fn test_zero_ratio_borrows_nothing() {
        let chunks = vec!["left".to_string(), "right".to_string()];
        assert_eq!(apply_semantic_overlap(&chunks, 0.0, 100), chunks);
    }
}
