//! End-to-end conversation flows against a scripted collaborator.

use doc_chat::chat::{PromptRole, RequestKind, SUGGESTION_SUMMARY};
use doc_chat::{
    ApplyOutcome, ChatError, Collaborator, CollaboratorRequest, Conversation, EditOrigin, Editor,
    Point, Range, SendOutcome,
};
use futures::executor::block_on;
use std::cell::RefCell;
use std::collections::VecDeque;

/// Replies with queued responses and records every request it sees.
#[derive(Default)]
struct ScriptedCollaborator {
    replies: RefCell<VecDeque<Result<String, String>>>,
    requests: RefCell<Vec<CollaboratorRequest>>,
}

impl ScriptedCollaborator {
    fn with_replies(replies: impl IntoIterator<Item = Result<&'static str, &'static str>>) -> Self {
        let collaborator = Self::default();
        collaborator.replies.borrow_mut().extend(
            replies
                .into_iter()
                .map(|reply| reply.map(str::to_string).map_err(str::to_string)),
        );
        collaborator
    }

    fn requests(&self) -> Vec<CollaboratorRequest> {
        self.requests.borrow().clone()
    }
}

impl Collaborator for ScriptedCollaborator {
    async fn complete(&self, request: &CollaboratorRequest) -> Result<String, ChatError> {
        self.requests.borrow_mut().push(request.clone());
        match self.replies.borrow_mut().pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(ChatError::Service(message)),
            None => Err(ChatError::Transport("no scripted reply".to_string())),
        }
    }
}

const SUGGESTION: &str = r#"```json
{"type": "text_change", "originalText": "teh cat", "suggestedText": "the cat", "reasoning": "typo"}
```"#;

#[test]
fn suggestion_accepted_into_editor() {
    let collaborator = ScriptedCollaborator::with_replies([
        Ok(SUGGESTION),
        Ok("```html\n<p>I saw <strong>the cat</strong> today.</p>\n```"),
    ]);
    let mut editor = Editor::new("<p>I saw <strong>teh cat</strong> today.</p>");
    editor.focus();
    editor
        .select(Range::new(
            Point::new(vec![0, 1], 0),
            Point::new(vec![0, 1], 7),
        ))
        .unwrap();
    let selected = editor.document_selection().unwrap().text.clone();

    let mut chat = Conversation::new();
    let outcome = block_on(chat.send_message(
        &collaborator,
        "fix the typo",
        editor.markup(),
        Some(selected.as_str()),
    ));
    let SendOutcome::Reply(id) = outcome else {
        panic!("expected a reply, got {outcome:?}");
    };

    let reply = chat.message(id).unwrap();
    assert_eq!(reply.content, SUGGESTION_SUMMARY);
    let change = reply.suggested_change.clone().unwrap();
    assert_eq!(change.suggested_text, "the cat");
    assert_eq!(chat.messages()[0].document_context.as_deref(), Some("teh cat"));

    let applied = block_on(chat.apply_changes(&collaborator, &change, editor.markup(), id)).unwrap();
    let ApplyOutcome::Applied(markup) = applied else {
        panic!("expected applied markup");
    };
    let event = editor.replace(&markup);

    assert_eq!(event.origin, EditOrigin::ExternalReplacement);
    assert_eq!(editor.markup(), "<p>I saw <strong>the cat</strong> today.</p>");
    assert!(editor.document_selection().is_none());
    assert!(chat.message(id).unwrap().applied);
    assert!(!chat.is_loading());

    let requests = collaborator.requests();
    assert_eq!(requests[0].kind, RequestKind::Chat);
    assert!(requests[0].messages[0].content.contains("SELECTED TEXT"));
    assert_eq!(requests[1].kind, RequestKind::ApplyChanges);
    assert_eq!(
        requests[1].document_html.as_deref(),
        Some("<p>I saw <strong>teh cat</strong> today.</p>")
    );
}

#[test]
fn plain_reply_is_shown_verbatim() {
    let collaborator = ScriptedCollaborator::with_replies([Ok("It reads clearly.")]);
    let mut chat = Conversation::new();
    let outcome = block_on(chat.send_message(&collaborator, "thoughts?", "<p>x</p>", None));
    let SendOutcome::Reply(id) = outcome else {
        panic!("expected a reply");
    };
    let message = chat.message(id).unwrap();
    assert_eq!(message.content, "It reads clearly.");
    assert!(message.suggested_change.is_none());
    assert!(chat.messages()[0].document_context.is_none());
}

#[test]
fn history_is_replayed_on_later_turns() {
    let collaborator = ScriptedCollaborator::with_replies([Ok("first"), Ok("second")]);
    let mut chat = Conversation::new();
    block_on(chat.send_message(&collaborator, "one", "<p>x</p>", None));
    block_on(chat.send_message(&collaborator, "two", "<p>x</p>", None));

    let last = collaborator.requests().pop().unwrap();
    let turns: Vec<_> = last
        .messages
        .iter()
        .map(|message| (message.role, message.content.as_str()))
        .skip(1)
        .collect();
    assert_eq!(
        turns,
        vec![
            (PromptRole::User, "one"),
            (PromptRole::Assistant, "first"),
            (PromptRole::User, "two"),
        ]
    );
    assert_eq!(chat.messages().len(), 4);
}

#[test]
fn service_failure_is_recoverable() {
    let collaborator =
        ScriptedCollaborator::with_replies([Err("OpenAI API key not configured"), Ok("back")]);
    let mut chat = Conversation::new();

    let outcome = block_on(chat.send_message(&collaborator, "hi", "<p>x</p>", None));
    assert_eq!(outcome, SendOutcome::Failed);
    assert_eq!(chat.error(), Some("OpenAI API key not configured"));
    assert!(!chat.is_loading());

    chat.clear_error();
    let outcome = block_on(chat.send_message(&collaborator, "retry", "<p>x</p>", None));
    assert!(matches!(outcome, SendOutcome::Reply(_)));
    assert_eq!(chat.error(), None);
}

#[test]
fn invalid_apply_reply_leaves_document_untouched() {
    let collaborator = ScriptedCollaborator::with_replies([Ok(SUGGESTION), Ok("I can't do that.")]);
    let mut editor = Editor::new("<p>teh cat</p>");
    let mut chat = Conversation::new();
    let SendOutcome::Reply(id) =
        block_on(chat.send_message(&collaborator, "fix", editor.markup(), Some("<p>teh cat</p>")))
    else {
        panic!("expected a reply");
    };
    let change = chat.message(id).unwrap().suggested_change.clone().unwrap();

    let result = block_on(chat.apply_changes(&collaborator, &change, editor.markup(), id));
    assert!(matches!(result, Err(ChatError::ApplyFailed(_))));
    assert!(!chat.message(id).unwrap().applied);
    assert_eq!(editor.version(), 0);
    assert_eq!(editor.markup(), "<p>teh cat</p>");

    // A failed apply does not consume the suggestion.
    assert!(chat.mark_applied(id));
}

#[test]
fn overlapping_sends_keep_only_the_latest_reply() {
    let mut chat = Conversation::new();
    let first = chat.begin_send("first question", "<p>x</p>", None);
    let second = chat.begin_send("second question", "<p>x</p>", None);

    let outcome = chat.finish_send(second.sequence, Ok("answer two".to_string()));
    assert!(matches!(outcome, SendOutcome::Reply(_)));
    assert_eq!(
        chat.finish_send(first.sequence, Ok("answer one".to_string())),
        SendOutcome::Stale
    );
    let contents: Vec<_> = chat.messages().iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["first question", "second question", "answer two"]);
}
