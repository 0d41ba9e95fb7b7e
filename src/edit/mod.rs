//! Sentence & Word Edit Engine
//!
//! Documents are plain text decomposed into sentences (terminated by `.`,
//! `!` or `?`) and whitespace-separated words. Edits are structured word
//! insertions addressed by `(sentence index, word index)` and arrive on the
//! wire as a `|`-delimited edit script.
//!
//! ## Submodules
//! - **`parser`**: tokenisation, rebuild and derived statistics.
//! - **`script`**: the wire edit-script format.
//! - **`engine`**: applies a script to a body, re-splitting sentences when
//!   an inserted word carries a terminator.

pub mod engine;
pub mod parser;
pub mod script;

#[cfg(test)]
mod tests;
