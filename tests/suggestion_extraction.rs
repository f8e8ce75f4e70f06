//! Suggestion extraction against the reply shapes collaborators produce.

use doc_chat::{SuggestedChange, extract_suggested_change};

fn change(original: &str, suggested: &str, reasoning: Option<&str>) -> Option<SuggestedChange> {
    Some(SuggestedChange {
        original_text: original.to_string(),
        suggested_text: suggested.to_string(),
        reasoning: reasoning.map(str::to_string),
    })
}

mod direct {
    use super::*;

    #[test]
    fn pretty_printed_object() {
        let reply = r#"{
  "type": "text_change",
  "originalText": "The results was good.",
  "suggestedText": "The results were good.",
  "reasoning": "Subject-verb agreement"
}"#;
        assert_eq!(
            extract_suggested_change(reply),
            change(
                "The results was good.",
                "The results were good.",
                Some("Subject-verb agreement")
            )
        );
    }

    #[test]
    fn escaped_quotes_survive_json_parsing() {
        let reply = r#"{"originalText": "say \"hi\"", "suggestedText": "say \"hello\""}"#;
        assert_eq!(
            extract_suggested_change(reply),
            change("say \"hi\"", "say \"hello\"", None)
        );
    }

    #[test]
    fn unfenced_trailing_commas() {
        let reply = "{\"originalText\": \"a\", \"suggestedText\": \"b\", \"reasoning\": \"c\",\n}";
        assert_eq!(extract_suggested_change(reply), change("a", "b", Some("c")));
    }
}

mod embedded {
    use super::*;

    #[test]
    fn fenced_with_leading_prose() {
        let reply = " Sure! ```json\n{\"type\":\"text_change\",\"originalText\":\"foo\",\"suggestedText\":\"bar\",\"reasoning\":\"clarity\"} ```";
        assert_eq!(
            extract_suggested_change(reply),
            change("foo", "bar", Some("clarity"))
        );
    }

    #[test]
    fn object_followed_by_explanation() {
        let reply = "Here you go:\n{\"originalText\": \"x\", \"suggestedText\": \"y\"}\nLet me know if that helps.";
        assert_eq!(extract_suggested_change(reply), change("x", "y", None));
    }

    #[test]
    fn typed_object_preferred_over_earlier_objects() {
        let reply = concat!(
            r#"Context: {"originalText": "a"} and "#,
            r#"{"type": "text_change", "originalText": "b", "suggestedText": "c"}"#
        );
        assert_eq!(extract_suggested_change(reply), change("b", "c", None));
    }
}

mod fallback {
    use super::*;

    #[test]
    fn loose_fields_without_valid_object() {
        let reply = r#"originalText is "ignored"; "originalText": "old", "suggestedText": "new""#;
        assert_eq!(extract_suggested_change(reply), change("old", "new", None));
    }

    #[test]
    fn missing_suggested_text() {
        assert_eq!(
            extract_suggested_change(r#"{"originalText": "only one field"}"#),
            None
        );
    }
}

mod plain_text {
    use super::*;

    #[test]
    fn prose_reply() {
        assert_eq!(
            extract_suggested_change("Your second paragraph could use a stronger opening."),
            None
        );
    }

    #[test]
    fn code_snippet_with_braces() {
        let reply = "Try this:\n```rust\nfn main() { println!(\"hi\"); }\n```";
        assert_eq!(extract_suggested_change(reply), None);
    }

    #[test]
    fn empty_reply() {
        assert_eq!(extract_suggested_change(""), None);
    }
}
