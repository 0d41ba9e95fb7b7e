#[cfg(test)]
mod tests {
    use crate::edit::engine::apply_edit;
    use crate::edit::parser::{rebuild, split_sentences, split_words, text_stats, MAX_WORD_LEN};
    use crate::edit::script::EditScript;
    use crate::error::ServiceError;

    // ============================================================
    // SENTENCE TOKENISATION
    // ============================================================

    #[test]
    fn test_split_on_all_terminators() {
        let sentences = split_sentences("First. Second! Third?");
        assert_eq!(sentences, vec!["First.", "Second!", "Third?"]);
    }

    #[test]
    fn test_terminator_is_kept_and_whitespace_trimmed() {
        let sentences = split_sentences("  Hello world.   Goodbye world.  ");
        assert_eq!(sentences, vec!["Hello world.", "Goodbye world."]);
    }

    #[test]
    fn test_residual_text_forms_final_sentence() {
        let sentences = split_sentences("Done. trailing words");
        assert_eq!(sentences, vec!["Done.", "trailing words"]);
    }

    #[test]
    fn test_whitespace_only_residual_is_dropped() {
        let sentences = split_sentences("Done.   ");
        assert_eq!(sentences, vec!["Done."]);
    }

    #[test]
    fn test_empty_body_has_no_sentences() {
        assert!(split_sentences("").is_empty());
        assert!(split_sentences("   ").is_empty());
    }

    // ============================================================
    // WORD TOKENISATION
    // ============================================================

    #[test]
    fn test_words_split_on_whitespace_runs() {
        let words = split_words("Hello   cruel\tworld.");
        assert_eq!(words, vec!["Hello", "cruel", "world."]);
    }

    #[test]
    fn test_overlong_word_is_truncated() {
        let long = "x".repeat(MAX_WORD_LEN + 10);
        let words = split_words(&long);
        assert_eq!(words[0].chars().count(), MAX_WORD_LEN);
    }

    #[test]
    fn test_rebuild_joins_with_single_spaces() {
        let sentences = vec!["One.".to_string(), "Two.".to_string()];
        assert_eq!(rebuild(&sentences), "One. Two.");
    }

    // ============================================================
    // EDIT SCRIPT PARSING
    // ============================================================

    #[test]
    fn test_parse_script_with_trailing_separator() {
        let script = EditScript::parse("0|1|cruel|").unwrap();
        assert_eq!(script.sentence_index, 0);
        assert_eq!(script.inserts.len(), 1);
        assert_eq!(script.inserts[0].word_index, 1);
        assert_eq!(script.inserts[0].word, "cruel");
    }

    #[test]
    fn test_parse_script_multiple_inserts() {
        let script = EditScript::parse("2|0|a|3|b|").unwrap();
        assert_eq!(script.sentence_index, 2);
        assert_eq!(script.inserts.len(), 2);
        assert_eq!(script.inserts[1].word_index, 3);
        assert_eq!(script.inserts[1].word, "b");
    }

    #[test]
    fn test_parse_script_empty_insert_list() {
        let script = EditScript::parse("4|").unwrap();
        assert_eq!(script.sentence_index, 4);
        assert!(script.inserts.is_empty());
    }

    #[test]
    fn test_parse_script_unpaired_index_rejected() {
        assert!(matches!(
            EditScript::parse("0|1|"),
            Err(ServiceError::InvalidParameters(_))
        ));
    }

    #[test]
    fn test_parse_script_garbage_index_rejected() {
        assert!(EditScript::parse("zero|").is_err());
        assert!(EditScript::parse("").is_err());
    }

    #[test]
    fn test_encode_rejects_separator_in_word() {
        let script = EditScript::new(0).insert(0, "a|b");
        assert!(script.encode().is_err());
    }

    #[test]
    fn test_encode_parse_roundtrip() {
        let script = EditScript::new(1).insert(0, "alpha").insert(2, "beta.");
        let encoded = script.encode().unwrap();
        assert_eq!(EditScript::parse(&encoded).unwrap(), script);
    }

    // ============================================================
    // EDIT APPLICATION
    // ============================================================

    #[test]
    fn test_insert_word_mid_sentence() {
        let script = EditScript::parse("0|1|cruel|").unwrap();
        let body = apply_edit("Hello world. Goodbye world.", &script).unwrap();
        assert_eq!(body, "Hello cruel world. Goodbye world.");
    }

    #[test]
    fn test_word_index_at_count_appends() {
        // "Hello world." has two words; index 2 appends.
        let script = EditScript::new(0).insert(2, "again");
        let body = apply_edit("Hello world.", &script).unwrap();
        assert_eq!(body, "Hello world. again");
    }

    #[test]
    fn test_word_index_past_count_fails() {
        let script = EditScript::new(0).insert(3, "nope");
        let err = apply_edit("Hello world.", &script).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidIndex(_)));
    }

    #[test]
    fn test_sentence_index_at_count_appends_sentence() {
        let script = EditScript::new(1).insert(0, "Farewell.");
        let body = apply_edit("Hello world.", &script).unwrap();
        assert_eq!(body, "Hello world. Farewell.");
    }

    #[test]
    fn test_sentence_index_past_count_fails() {
        let script = EditScript::new(2).insert(0, "nope");
        let err = apply_edit("Hello world.", &script).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidIndex(_)));
    }

    #[test]
    fn test_failed_insert_aborts_whole_edit() {
        // First insert is fine, second is out of range; nothing may apply.
        let script = EditScript::new(0).insert(0, "ok").insert(10, "bad");
        assert!(apply_edit("Hello world.", &script).is_err());
    }

    #[test]
    fn test_inserted_terminator_splits_sentence_in_place() {
        // "One two three." with "stop." inserted after "One" splits into two
        // sentences, shifting the following sentence's index by one.
        let script = EditScript::new(0).insert(1, "stop.");
        let body = apply_edit("One two three. Last.", &script).unwrap();
        assert_eq!(body, "One stop. two three. Last.");

        let sentences = split_sentences(&body);
        assert_eq!(sentences.len(), 3);
        assert_eq!(sentences[2], "Last.");
    }

    #[test]
    fn test_empty_edit_list_is_noop_on_body() {
        let script = EditScript::parse("0|").unwrap();
        let body = apply_edit("Hello world. Goodbye world.", &script).unwrap();
        assert_eq!(body, "Hello world. Goodbye world.");
    }

    #[test]
    fn test_sequential_inserts_observe_prior_inserts() {
        // Second insert's index is relative to the already-mutated sentence.
        let script = EditScript::new(0).insert(0, "a").insert(1, "b");
        let body = apply_edit("c.", &script).unwrap();
        assert_eq!(body, "a b c.");
    }

    // ============================================================
    // STATISTICS
    // ============================================================

    #[test]
    fn test_stats_count_words_chars_sentences() {
        let stats = text_stats("Hello world. Goodbye world.");
        assert_eq!(stats.words, 4);
        assert_eq!(stats.sentences, 2);
        assert_eq!(stats.chars, "Hello world. Goodbye world.".chars().count() as u64);
    }

    #[test]
    fn test_stats_empty_body() {
        let stats = text_stats("");
        assert_eq!(stats.words, 0);
        assert_eq!(stats.chars, 0);
        assert_eq!(stats.sentences, 0);
    }

    #[test]
    fn test_stats_match_recount_after_edit() {
        let script = EditScript::parse("0|1|cruel|").unwrap();
        let body = apply_edit("Hello world.", &script).unwrap();
        let stats = text_stats(&body);
        assert_eq!(stats.words, 3);
        assert_eq!(stats.chars, body.chars().count() as u64);
    }
}
