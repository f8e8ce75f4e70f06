//! Extraction of structured edit suggestions from free-form collaborator
//! replies.
//!
//! The collaborator is asked to answer with a bare JSON object when it proposes
//! a change, but replies routinely arrive wrapped in code fences, surrounded by
//! prose, or with trailing commas. Extraction therefore tries progressively
//! looser strategies and never fails: a reply with no usable suggestion is
//! plain text.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::LazyLock;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestedChange {
    pub original_text: String,
    pub suggested_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

static FENCE_JSON: LazyLock<Regex> = LazyLock::new(|| compile(r"```json\s*"));
static FENCE: LazyLock<Regex> = LazyLock::new(|| compile(r"```\s*"));
static TRAILING_COMMA_OBJECT: LazyLock<Regex> = LazyLock::new(|| compile(r",\s*\}"));
static TRAILING_COMMA_ARRAY: LazyLock<Regex> = LazyLock::new(|| compile(r",\s*\]"));

/// Candidate object patterns, most specific first.
static CANDIDATES: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        compile(r#"(?s)\{\s*"type"\s*:\s*"text_change".*?\}"#),
        compile(r#"(?s)\{\s*"originalText".*?"suggestedText".*?\}"#),
        compile(r"(?s)\{.*?\}"),
    ]
});

static ORIGINAL_FIELD: LazyLock<Regex> =
    LazyLock::new(|| compile(r#""originalText"\s*:\s*"([^"]*?)""#));
static SUGGESTED_FIELD: LazyLock<Regex> =
    LazyLock::new(|| compile(r#""suggestedText"\s*:\s*"([^"]*?)""#));
static REASONING_FIELD: LazyLock<Regex> =
    LazyLock::new(|| compile(r#""reasoning"\s*:\s*"([^"]*?)""#));

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static pattern compiles")
}

/// Pulls a suggested change out of a collaborator reply, or `None` if the
/// reply should be shown as ordinary text.
pub fn extract_suggested_change(response: &str) -> Option<SuggestedChange> {
    tracing::debug!(
        response_len = response.len(),
        preview = %preview(response),
        "extracting suggested change"
    );

    if let Some(change) = parse_candidate(&clean_json_string(response)) {
        tracing::debug!("parsed entire response as JSON");
        return Some(change);
    }

    if let Some(change) = extract_with_patterns(response) {
        tracing::debug!("extracted JSON object from response");
        return Some(change);
    }

    if let Some(change) = extract_fields(response) {
        tracing::debug!("extracted suggestion fields directly");
        return Some(change);
    }

    tracing::debug!("no suggested change found, treating as text");
    None
}

/// Removes code-fence markers and trailing commas before closing brackets.
pub fn clean_json_string(text: &str) -> String {
    let text = text.trim();
    let text = FENCE_JSON.replace_all(text, "");
    let text = FENCE.replace_all(&text, "");
    let text = TRAILING_COMMA_OBJECT.replace_all(&text, "}");
    TRAILING_COMMA_ARRAY.replace_all(&text, "]").into_owned()
}

fn extract_with_patterns(text: &str) -> Option<SuggestedChange> {
    CANDIDATES.iter().find_map(|pattern| {
        pattern
            .find_iter(text)
            .find_map(|candidate| parse_candidate(&clean_json_string(candidate.as_str())))
    })
}

fn extract_fields(text: &str) -> Option<SuggestedChange> {
    let capture = |pattern: &Regex| {
        pattern
            .captures(text)
            .and_then(|captures| captures.get(1))
            .map(|value| value.as_str().to_string())
    };
    Some(SuggestedChange {
        original_text: capture(&ORIGINAL_FIELD)?,
        suggested_text: capture(&SUGGESTED_FIELD)?,
        reasoning: capture(&REASONING_FIELD),
    })
}

/// Accepts a JSON object with non-empty `originalText` and `suggestedText`.
fn parse_candidate(json: &str) -> Option<SuggestedChange> {
    let value: Value = serde_json::from_str(json).ok()?;
    let object = value.as_object()?;
    let field = |name: &str| {
        object
            .get(name)
            .and_then(Value::as_str)
            .filter(|text| !text.is_empty())
            .map(str::to_string)
    };
    Some(SuggestedChange {
        original_text: field("originalText")?,
        suggested_text: field("suggestedText")?,
        reasoning: field("reasoning"),
    })
}

fn preview(text: &str) -> String {
    text.chars().take(120).collect()
}
