/// Bounds on the tokenised document shape.
pub const MAX_SENTENCES: usize = 1000;
pub const MAX_SENTENCE_LEN: usize = 1024;
pub const MAX_WORDS: usize = 500;
pub const MAX_WORD_LEN: usize = 128;

const TERMINATORS: [char; 3] = ['.', '!', '?'];

/// Word and character counts derived from a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextStats {
    pub words: u64,
    pub chars: u64,
    pub sentences: u64,
}

/// Splits text into sentences. A sentence is a maximal run terminated by
/// `.`, `!` or `?`, terminator included, trimmed of surrounding whitespace.
/// Over-long runs split at the length bound; residual unterminated text
/// forms a final sentence if non-empty after trimming.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut current_chars = 0;

    for c in text.chars() {
        if sentences.len() >= MAX_SENTENCES {
            break;
        }

        current.push(c);
        current_chars += 1;

        if TERMINATORS.contains(&c) || current_chars >= MAX_SENTENCE_LEN {
            flush_sentence(&mut current, &mut sentences);
            current_chars = 0;
        }
    }

    if sentences.len() < MAX_SENTENCES {
        flush_sentence(&mut current, &mut sentences);
    }

    sentences
}

fn flush_sentence(current: &mut String, sentences: &mut Vec<String>) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed.to_string());
    }
    current.clear();
}

/// Splits a sentence into words on runs of whitespace. Words are truncated
/// at the length bound and the total count is bounded.
pub fn split_words(sentence: &str) -> Vec<String> {
    sentence
        .split_whitespace()
        .take(MAX_WORDS)
        .map(truncate_word)
        .collect()
}

fn truncate_word(word: &str) -> String {
    if word.chars().count() <= MAX_WORD_LEN {
        return word.to_string();
    }
    word.chars().take(MAX_WORD_LEN).collect()
}

/// Rebuilds a body by concatenating sentences with single-space separators.
pub fn rebuild(sentences: &[String]) -> String {
    sentences.join(" ")
}

/// Recomputes the cached statistics from a body. Word counts are summed per
/// sentence so they agree with what edits observe.
pub fn text_stats(text: &str) -> TextStats {
    let sentences = split_sentences(text);
    let words = sentences
        .iter()
        .map(|s| split_words(s).len() as u64)
        .sum();

    TextStats {
        words,
        chars: text.chars().count() as u64,
        sentences: sentences.len() as u64,
    }
}
