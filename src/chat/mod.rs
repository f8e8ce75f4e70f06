//! Conversation controller: message history, request sequencing, and the
//! suggestion lifecycle.
//!
//! Requests are split into a `begin_*` step that records state and builds the
//! collaborator request, and a `finish_*` step that consumes the reply. Every
//! request carries a sequence number; a reply whose request has since been
//! superseded by a newer one of the same kind is discarded.

use crate::markup::extract_plain_text;
use crate::suggestion::{SuggestedChange, extract_suggested_change};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

pub mod prompt;
pub mod wire;

pub use wire::{
    CollaboratorRequest, CollaboratorResponse, PromptMessage, PromptRole, RequestKind,
    UpstreamRequest, clean_apply_response, completion_content, parse_response,
};

/// Shown instead of the raw JSON when a reply carries a suggestion.
pub const SUGGESTION_SUMMARY: &str = "I've analyzed your selected text and prepared some improvements. You can review the suggested changes below and apply them if you'd like.";

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("{0}")]
    Service(String),
    #[error("request failed: {0}")]
    Transport(String),
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("Invalid HTML response from AI")]
    InvalidHtmlResponse,
    #[error("Failed to apply changes to document")]
    ApplyFailed(#[source] Box<ChatError>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl From<Role> for PromptRole {
    fn from(role: Role) -> Self {
        match role {
            Role::User => PromptRole::User,
            Role::Assistant => PromptRole::Assistant,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: Uuid,
    pub role: Role,
    pub content: String,
    pub timestamp_ms: u64,
    /// Plain text of the selection the user asked about.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_change: Option<SuggestedChange>,
    #[serde(default)]
    pub applied: bool,
}

impl ChatMessage {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content: content.into(),
            timestamp_ms: unix_millis(),
            document_context: None,
            suggested_change: None,
            applied: false,
        }
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or_default()
}

/// Anything that can turn a collaborator request into reply text.
pub trait Collaborator {
    fn complete(
        &self,
        request: &CollaboratorRequest,
    ) -> impl Future<Output = Result<String, ChatError>>;
}

#[derive(Debug, Clone)]
pub struct PendingSend {
    pub sequence: u64,
    pub request: CollaboratorRequest,
}

#[derive(Debug, Clone)]
pub struct PendingApply {
    pub sequence: u64,
    pub message_id: Uuid,
    pub request: CollaboratorRequest,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// The assistant reply was appended under this id.
    Reply(Uuid),
    /// The request failed; the error is recorded on the conversation.
    Failed,
    /// A newer request was issued; the reply was dropped.
    Stale,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Updated document markup, ready for `Editor::replace`.
    Applied(String),
    Stale,
}

#[derive(Debug, Default)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
    is_loading: bool,
    error: Option<String>,
    next_sequence: u64,
    latest_send: Option<u64>,
    latest_apply: Option<u64>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn message(&self, id: Uuid) -> Option<&ChatMessage> {
        self.messages.iter().find(|message| message.id == id)
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Records the user's message and builds the chat request: system
    /// prompt, prior history, then the new message.
    pub fn begin_send(
        &mut self,
        content: &str,
        document_html: &str,
        selected_html: Option<&str>,
    ) -> PendingSend {
        let mut messages = Vec::with_capacity(self.messages.len() + 2);
        messages.push(PromptMessage::new(
            PromptRole::System,
            prompt::chat_system_prompt(document_html, selected_html),
        ));
        messages.extend(
            self.messages
                .iter()
                .map(|message| PromptMessage::new(message.role.into(), message.content.clone())),
        );
        messages.push(PromptMessage::new(PromptRole::User, content));

        let mut user = ChatMessage::new(Role::User, content);
        user.document_context = selected_html.map(extract_plain_text);
        self.messages.push(user);
        self.is_loading = true;
        self.error = None;

        let sequence = self.next_sequence();
        self.latest_send = Some(sequence);
        tracing::debug!(sequence, history = messages.len(), "sending chat message");

        PendingSend {
            sequence,
            request: CollaboratorRequest::chat(messages),
        }
    }

    pub fn finish_send(
        &mut self,
        sequence: u64,
        result: Result<String, ChatError>,
    ) -> SendOutcome {
        if self.latest_send != Some(sequence) {
            tracing::warn!(sequence, latest = ?self.latest_send, "discarding stale chat reply");
            return SendOutcome::Stale;
        }
        self.latest_send = None;
        self.is_loading = false;

        match result {
            Ok(reply) => {
                let suggestion = extract_suggested_change(&reply);
                let content = if suggestion.is_some() {
                    SUGGESTION_SUMMARY.to_string()
                } else {
                    reply
                };
                let mut assistant = ChatMessage::new(Role::Assistant, content);
                assistant.suggested_change = suggestion;
                let id = assistant.id;
                self.messages.push(assistant);
                SendOutcome::Reply(id)
            }
            Err(err) => {
                tracing::warn!(error = %err, "chat request failed");
                self.error = Some(err.to_string());
                SendOutcome::Failed
            }
        }
    }

    pub fn begin_apply(
        &mut self,
        change: &SuggestedChange,
        document_html: &str,
        message_id: Uuid,
    ) -> PendingApply {
        self.is_loading = true;
        self.error = None;
        let sequence = self.next_sequence();
        self.latest_apply = Some(sequence);
        tracing::debug!(sequence, %message_id, "applying suggested change");

        PendingApply {
            sequence,
            message_id,
            request: CollaboratorRequest::apply_changes(document_html, change),
        }
    }

    /// Consumes an apply-changes reply. On success the originating message
    /// is marked applied and the cleaned markup is returned; the document
    /// itself is never touched here.
    pub fn finish_apply(
        &mut self,
        pending: &PendingApply,
        result: Result<String, ChatError>,
    ) -> Result<ApplyOutcome, ChatError> {
        if self.latest_apply != Some(pending.sequence) {
            tracing::warn!(sequence = pending.sequence, "discarding stale apply reply");
            return Ok(ApplyOutcome::Stale);
        }
        self.latest_apply = None;
        self.is_loading = false;

        match result.and_then(|reply| clean_apply_response(&reply)) {
            Ok(markup) => {
                self.mark_applied(pending.message_id);
                tracing::info!(message_id = %pending.message_id, "suggested change applied");
                Ok(ApplyOutcome::Applied(markup))
            }
            Err(err) => {
                tracing::warn!(error = %err, "applying changes failed");
                let err = ChatError::ApplyFailed(Box::new(err));
                self.error = Some(err.to_string());
                Err(err)
            }
        }
    }

    pub async fn send_message<C: Collaborator>(
        &mut self,
        collaborator: &C,
        content: &str,
        document_html: &str,
        selected_html: Option<&str>,
    ) -> SendOutcome {
        let pending = self.begin_send(content, document_html, selected_html);
        let result = collaborator.complete(&pending.request).await;
        self.finish_send(pending.sequence, result)
    }

    pub async fn apply_changes<C: Collaborator>(
        &mut self,
        collaborator: &C,
        change: &SuggestedChange,
        document_html: &str,
        message_id: Uuid,
    ) -> Result<ApplyOutcome, ChatError> {
        let pending = self.begin_apply(change, document_html, message_id);
        let result = collaborator.complete(&pending.request).await;
        self.finish_apply(&pending, result)
    }

    /// Flags the message's suggestion as applied. Returns false if the
    /// message is unknown or was already applied.
    pub fn mark_applied(&mut self, id: Uuid) -> bool {
        match self.messages.iter_mut().find(|message| message.id == id) {
            Some(message) if !message.applied => {
                message.applied = true;
                true
            }
            _ => false,
        }
    }

    /// Drops all messages. Replies to requests still in flight are ignored.
    pub fn clear_messages(&mut self) {
        self.messages.clear();
        self.is_loading = false;
        self.error = None;
        self.latest_send = None;
        self.latest_apply = None;
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    fn next_sequence(&mut self) -> u64 {
        self.next_sequence += 1;
        self.next_sequence
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "<p>The quick brown fox</p>";

    fn suggestion_reply() -> String {
        r#"{"type":"text_change","originalText":"quick","suggestedText":"swift"}"#.to_string()
    }

    #[test]
    fn test_begin_send_builds_history() {
        let mut chat = Conversation::new();
        let first = chat.begin_send("hello", DOC, None);
        chat.finish_send(first.sequence, Ok("hi there".to_string()));

        let second = chat.begin_send("and now?", DOC, Some("<p>quick</p>"));
        let roles: Vec<_> = second.request.messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![
                PromptRole::System,
                PromptRole::User,
                PromptRole::Assistant,
                PromptRole::User
            ]
        );
        assert_eq!(second.request.messages[3].content, "and now?");
        assert!(chat.is_loading());
        assert_eq!(
            chat.messages().last().unwrap().document_context.as_deref(),
            Some("quick")
        );
    }

    #[test]
    fn test_suggestion_reply_shows_summary() {
        let mut chat = Conversation::new();
        let pending = chat.begin_send("make it better", DOC, Some("<p>quick</p>"));
        let SendOutcome::Reply(id) = chat.finish_send(pending.sequence, Ok(suggestion_reply()))
        else {
            panic!("expected reply");
        };
        let message = chat.message(id).unwrap();
        assert_eq!(message.content, SUGGESTION_SUMMARY);
        assert_eq!(message.suggested_change.as_ref().unwrap().suggested_text, "swift");
        assert!(!message.applied);
        assert!(!chat.is_loading());
    }

    #[test]
    fn test_failure_records_error() {
        let mut chat = Conversation::new();
        let pending = chat.begin_send("hello", DOC, None);
        let outcome = chat.finish_send(
            pending.sequence,
            Err(ChatError::Service("quota exceeded".to_string())),
        );
        assert_eq!(outcome, SendOutcome::Failed);
        assert_eq!(chat.error(), Some("quota exceeded"));
        assert_eq!(chat.messages().len(), 1);
        chat.clear_error();
        assert_eq!(chat.error(), None);
    }

    #[test]
    fn test_stale_reply_is_discarded() {
        let mut chat = Conversation::new();
        let older = chat.begin_send("one", DOC, None);
        let newer = chat.begin_send("two", DOC, None);

        assert_eq!(
            chat.finish_send(older.sequence, Ok("late".to_string())),
            SendOutcome::Stale
        );
        assert!(chat.is_loading());
        assert!(matches!(
            chat.finish_send(newer.sequence, Ok("fresh".to_string())),
            SendOutcome::Reply(_)
        ));
        assert_eq!(chat.messages().last().unwrap().content, "fresh");
        assert_eq!(chat.messages().len(), 3);
    }

    #[test]
    fn test_apply_marks_message_once() {
        let mut chat = Conversation::new();
        let pending = chat.begin_send("fix", DOC, Some("<p>quick</p>"));
        let SendOutcome::Reply(id) = chat.finish_send(pending.sequence, Ok(suggestion_reply()))
        else {
            panic!("expected reply");
        };
        let change = chat.message(id).unwrap().suggested_change.clone().unwrap();

        let apply = chat.begin_apply(&change, DOC, id);
        assert_eq!(apply.request.kind, RequestKind::ApplyChanges);
        let outcome = chat
            .finish_apply(&apply, Ok("```html\n<p>The swift brown fox</p>\n```".to_string()))
            .unwrap();
        assert_eq!(
            outcome,
            ApplyOutcome::Applied("<p>The swift brown fox</p>".to_string())
        );
        assert!(chat.message(id).unwrap().applied);
        assert!(!chat.mark_applied(id));
    }

    #[test]
    fn test_apply_rejects_non_markup() {
        let mut chat = Conversation::new();
        let change = SuggestedChange {
            original_text: "quick".to_string(),
            suggested_text: "swift".to_string(),
            reasoning: None,
        };
        let id = Uuid::new_v4();
        let apply = chat.begin_apply(&change, DOC, id);
        let err = chat
            .finish_apply(&apply, Ok("Sorry, I can't.".to_string()))
            .unwrap_err();
        assert!(matches!(&err, ChatError::ApplyFailed(inner) if matches!(**inner, ChatError::InvalidHtmlResponse)));
        assert_eq!(chat.error(), Some("Failed to apply changes to document"));
        assert!(!chat.is_loading());
    }

    #[test]
    fn test_clear_messages_drops_pending_replies() {
        let mut chat = Conversation::new();
        let pending = chat.begin_send("hello", DOC, None);
        chat.clear_messages();
        assert_eq!(
            chat.finish_send(pending.sequence, Ok("late".to_string())),
            SendOutcome::Stale
        );
        assert!(chat.messages().is_empty());
    }

    #[test]
    fn test_message_serde_shape() {
        let message = ChatMessage::new(Role::User, "hi");
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["role"], "user");
        assert!(json.get("timestampMs").is_some());
        assert!(json.get("documentContext").is_none());
        assert_eq!(json["applied"], false);
    }
}
