use crate::error::{Result, ServiceError};

/// One word insertion inside the working sentence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordInsert {
    pub word_index: usize,
    pub word: String,
}

/// A parsed edit script: one target sentence plus an ordered list of word
/// insertions applied to it.
///
/// Wire form: `<sentence-index>|<word-index>|<word>|<word-index>|<word>|…`
/// Because `|` is the field separator it cannot appear inside a word; the
/// encoder rejects such words rather than escaping them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditScript {
    pub sentence_index: usize,
    pub inserts: Vec<WordInsert>,
}

impl EditScript {
    pub fn new(sentence_index: usize) -> EditScript {
        EditScript {
            sentence_index,
            inserts: Vec::new(),
        }
    }

    pub fn insert(mut self, word_index: usize, word: &str) -> EditScript {
        self.inserts.push(WordInsert {
            word_index,
            word: word.to_string(),
        });
        self
    }

    pub fn parse(payload: &str) -> Result<EditScript> {
        let mut fields: Vec<&str> = payload.split('|').collect();

        // A trailing separator produces one empty field; drop it.
        if fields.last() == Some(&"") {
            fields.pop();
        }

        if fields.is_empty() {
            return Err(ServiceError::InvalidParameters(
                "empty edit script".to_string(),
            ));
        }

        let sentence_index = parse_index(fields[0], "sentence index")?;

        let pairs = &fields[1..];
        if pairs.len() % 2 != 0 {
            return Err(ServiceError::InvalidParameters(
                "edit script has an unpaired word index".to_string(),
            ));
        }

        let mut inserts = Vec::with_capacity(pairs.len() / 2);
        for pair in pairs.chunks(2) {
            let word_index = parse_index(pair[0], "word index")?;
            inserts.push(WordInsert {
                word_index,
                word: pair[1].to_string(),
            });
        }

        Ok(EditScript {
            sentence_index,
            inserts,
        })
    }

    pub fn encode(&self) -> Result<String> {
        let mut out = format!("{}|", self.sentence_index);
        for insert in &self.inserts {
            if insert.word.contains('|') {
                return Err(ServiceError::InvalidParameters(
                    "words may not contain the '|' separator".to_string(),
                ));
            }
            out.push_str(&format!("{}|{}|", insert.word_index, insert.word));
        }
        Ok(out)
    }
}

fn parse_index(field: &str, what: &str) -> Result<usize> {
    field
        .trim()
        .parse::<usize>()
        .map_err(|_| ServiceError::InvalidParameters(format!("malformed {}: {:?}", what, field)))
}
