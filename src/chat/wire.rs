//! Wire formats between the conversation controller, the relay, and the
//! upstream text-generation service.

use super::ChatError;
use super::prompt;
use crate::config::CollaboratorConfig;
use crate::suggestion::SuggestedChange;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: PromptRole,
    pub content: String,
}

impl PromptMessage {
    pub fn new(role: PromptRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestKind {
    #[default]
    Chat,
    ApplyChanges,
}

/// Body sent to the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollaboratorRequest {
    pub messages: Vec<PromptMessage>,
    #[serde(rename = "type", default)]
    pub kind: RequestKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_html: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_changes: Option<SuggestedChange>,
}

impl CollaboratorRequest {
    pub fn chat(messages: Vec<PromptMessage>) -> Self {
        Self {
            messages,
            kind: RequestKind::Chat,
            document_html: None,
            suggested_changes: None,
        }
    }

    pub fn apply_changes(document_html: &str, change: &SuggestedChange) -> Self {
        Self {
            messages: prompt::apply_changes_messages(document_html, change),
            kind: RequestKind::ApplyChanges,
            document_html: Some(document_html.to_string()),
            suggested_changes: Some(change.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CollaboratorResponse {
    Content { content: String },
    Error { error: String },
}

/// Interprets a relay reply. Non-2xx statuses and `{error}` bodies are
/// service failures; anything unparseable is malformed.
pub fn parse_response(status: u16, body: &str) -> Result<String, ChatError> {
    let parsed = serde_json::from_str::<CollaboratorResponse>(body);
    if !(200..300).contains(&status) {
        let message = match parsed {
            Ok(CollaboratorResponse::Error { error }) => error,
            _ => format!("HTTP {status}"),
        };
        return Err(ChatError::Service(message));
    }
    match parsed {
        Ok(CollaboratorResponse::Content { content }) => Ok(content),
        Ok(CollaboratorResponse::Error { error }) => Err(ChatError::Service(error)),
        Err(err) => Err(ChatError::MalformedResponse(err.to_string())),
    }
}

/// Chat-completion request the relay forwards upstream.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpstreamRequest {
    pub model: String,
    pub messages: Vec<PromptMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl UpstreamRequest {
    /// Builds the upstream request. Apply-changes requests that carry both
    /// the document and the change get the fixed editing prompt and the
    /// low-temperature sampling profile; everything else is a chat turn.
    pub fn from_request(request: &CollaboratorRequest, config: &CollaboratorConfig) -> Self {
        if let (RequestKind::ApplyChanges, Some(html), Some(change)) = (
            request.kind,
            &request.document_html,
            &request.suggested_changes,
        ) {
            return Self {
                model: config.model.clone(),
                messages: prompt::apply_changes_messages(html, change),
                max_tokens: config.apply_max_tokens,
                temperature: config.apply_temperature,
            };
        }
        Self {
            model: config.model.clone(),
            messages: request.messages.clone(),
            max_tokens: config.chat_max_tokens,
            temperature: config.chat_temperature,
        }
    }
}

pub const NO_RESPONSE: &str = "No response received";

/// Content of the first choice of an upstream completion body.
pub fn completion_content(body: &str) -> Result<String, ChatError> {
    let value: Value =
        serde_json::from_str(body).map_err(|err| ChatError::MalformedResponse(err.to_string()))?;
    if let Some(message) = value
        .pointer("/error/message")
        .and_then(Value::as_str)
    {
        return Err(ChatError::Service(message.to_string()));
    }
    let content = value
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .filter(|content| !content.is_empty())
        .unwrap_or(NO_RESPONSE);
    Ok(content.to_string())
}

/// Strips a code-fence wrapper from an apply-changes reply and checks that
/// what remains looks like markup.
pub fn clean_apply_response(response: &str) -> Result<String, ChatError> {
    let trimmed = response.trim();
    let cleaned = match trimmed
        .strip_prefix("```html")
        .or_else(|| trimmed.strip_prefix("```"))
    {
        Some(rest) => {
            let rest = rest.trim_start();
            rest.strip_suffix("```").unwrap_or(rest).trim_end()
        }
        None => trimmed,
    };
    if !cleaned.contains('<') || !cleaned.contains('>') {
        tracing::warn!(
            response_len = response.len(),
            "apply-changes reply contains no markup"
        );
        return Err(ChatError::InvalidHtmlResponse);
    }
    Ok(cleaned.to_string())
}
