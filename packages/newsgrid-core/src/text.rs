//! Text normalization and sanitization shared by the dedup engine and the
//! extraction ensemble.

use unicode_normalization::UnicodeNormalization;

/// Lowercases, applies NFKD normalization, collapses whitespace runs, and
/// strips punctuation. Used as the canonical form for content hashing and
/// shingling so that trivial formatting differences (extra spaces, smart
/// quotes, accents) don't defeat duplicate detection.
#[must_use]
pub fn normalize_text(text: &str) -> String {
    let lowered = text.to_lowercase();
    let decomposed: String = lowered.nfkd().collect();

    let mut out = String::with_capacity(decomposed.len());
    let mut last_was_space = false;
    for ch in decomposed.chars() {
        if ch.is_whitespace() {
            if !last_was_space {
                out.push(' ');
                last_was_space = true;
            }
            continue;
        }
        if ch.is_alphanumeric() {
            out.push(ch);
            last_was_space = false;
        }
        // Punctuation and combining marks are dropped entirely.
    }
    out.trim().to_string()
}

/// Strips C0 control characters (except tab and newline), collapses runs of
/// spaces/tabs to a single space, caps consecutive newlines at two, and trims
/// leading/trailing whitespace. Applied to extracted article bodies before
/// they're stored or hashed.
#[must_use]
pub fn sanitize_text(text: &str) -> String {
    let mut cleaned = String::with_capacity(text.len());
    for ch in text.chars() {
        if ch == '\t' || ch == '\n' {
            cleaned.push(ch);
        } else if ch.is_control() {
            continue;
        } else {
            cleaned.push(ch);
        }
    }

    let space_collapsed = {
        let mut out = String::with_capacity(cleaned.len());
        let mut last_was_blank = false;
        for ch in cleaned.chars() {
            if ch == ' ' || ch == '\t' {
                if !last_was_blank {
                    out.push(' ');
                    last_was_blank = true;
                }
            } else {
                out.push(ch);
                last_was_blank = false;
            }
        }
        out
    };

    let mut result = String::with_capacity(space_collapsed.len());
    let mut newline_run = 0;
    for ch in space_collapsed.chars() {
        if ch == '\n' {
            newline_run += 1;
            if newline_run <= 2 {
                result.push(ch);
            }
        } else {
            newline_run = 0;
            result.push(ch);
        }
    }

    result.trim().to_string()
}

/// Splits normalized text into word-level shingles of `size` consecutive
/// words. Used as the input set for MinHash signatures.
#[must_use]
pub fn word_shingles(normalized: &str, size: usize) -> Vec<String> {
    let words: Vec<&str> = normalized.split_whitespace().collect();
    if words.len() < size {
        return if words.is_empty() {
            Vec::new()
        } else {
            vec![words.join(" ")]
        };
    }
    words
        .windows(size)
        .map(|w| w.join(" "))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_lowercases_and_strips_punctuation() {
        assert_eq!(normalize_text("Hello, World!"), "hello world");
    }

    #[test]
    fn normalize_collapses_whitespace() {
        assert_eq!(normalize_text("a   b\t\tc\n\nd"), "a b c d");
    }

    #[test]
    fn sanitize_strips_control_chars_keeps_tab_newline() {
        let input = "hello\x07world\tfoo\nbar";
        assert_eq!(sanitize_text(input), "helloworld\tfoo\nbar");
    }

    #[test]
    fn sanitize_caps_consecutive_newlines_at_two() {
        let input = "a\n\n\n\n\nb";
        assert_eq!(sanitize_text(input), "a\n\nb");
    }

    #[test]
    fn sanitize_collapses_space_and_tab_runs() {
        assert_eq!(sanitize_text("a    b\t\t\tc"), "a b c");
    }

    #[test]
    fn shingles_of_short_text_yields_single_shingle() {
        let shingles = word_shingles("a b", 3);
        assert_eq!(shingles, vec!["a b".to_string()]);
    }

    #[test]
    fn shingles_window_over_words() {
        let shingles = word_shingles("a b c d", 3);
        assert_eq!(shingles, vec!["a b c".to_string(), "b c d".to_string()]);
    }

    #[test]
    fn shingles_of_empty_text_is_empty() {
        assert!(word_shingles("", 3).is_empty());
    }
}
