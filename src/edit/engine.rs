use crate::error::{Result, ServiceError};

use super::parser;
use super::script::EditScript;

/// Applies an edit script to a body and returns the rebuilt text.
///
/// The target sentence index may equal the sentence count, which appends a
/// new empty sentence. Any out-of-range word index fails the whole edit; the
/// caller commits nothing in that case. If the mutated sentence re-tokenises
/// into several sentences (an inserted word carried a terminator), they
/// replace the original in place and later indices shift.
pub fn apply_edit(body: &str, script: &EditScript) -> Result<String> {
    let mut sentences = parser::split_sentences(body);
    let count = sentences.len();

    if script.sentence_index > count {
        return Err(ServiceError::InvalidIndex(format!(
            "sentence index {} out of range (max {})",
            script.sentence_index, count
        )));
    }

    let mut working = if script.sentence_index < count {
        sentences[script.sentence_index].clone()
    } else {
        String::new()
    };

    for insert in &script.inserts {
        working = insert_word(&working, insert.word_index, &insert.word)?;
    }

    let replacement = parser::split_sentences(&working);

    if script.sentence_index < count {
        sentences.splice(script.sentence_index..script.sentence_index + 1, replacement);
    } else {
        sentences.extend(replacement);
    }

    Ok(parser::rebuild(&sentences))
}

fn insert_word(sentence: &str, word_index: usize, word: &str) -> Result<String> {
    let mut words = parser::split_words(sentence);

    if word_index > words.len() {
        return Err(ServiceError::InvalidIndex(format!(
            "word index {} out of range (max {})",
            word_index,
            words.len()
        )));
    }

    words.insert(word_index, word.to_string());
    Ok(words.join(" "))
}
