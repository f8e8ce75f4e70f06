use super::wire::{PromptMessage, PromptRole};
use crate::markup::extract_plain_text;
use crate::suggestion::SuggestedChange;

const ASSISTANT_INTRO: &str = "You are an intelligent document assistant. You can help users edit, improve, and work with their rich text documents.";

const GENERAL_GUIDANCE: &str = "When providing regular assistance (not text changes):
1. Consider the full document context
2. Be specific about what should be changed
3. Provide clear explanations
4. Keep suggestions contextually appropriate
5. Consider that the document supports rich text formatting

You can help with:
- Editing and improving text
- Grammar and style corrections
- Content suggestions and expansions
- Restructuring and organization
- Formatting recommendations
- Converting between different text formats
- Answering questions about the content";

const EDITOR_INSTRUCTIONS: &str = "You are a precise document editor. You will receive an HTML document and specific text changes to apply.

Your task:
1. Find the EXACT original text in the document
2. Replace it with the suggested text
3. Preserve ALL other formatting and content
4. Return ONLY the complete updated HTML document

CRITICAL: You must respond with ONLY the updated HTML document. No JSON, no explanations, no additional text - just the raw HTML.

The original text to find and replace will be provided as plain text, but you need to find it within the HTML structure and replace it while preserving the HTML formatting around it.";

/// System prompt for a chat turn. Both inputs are markup; the prompt embeds
/// their plain text. The selection section and the JSON reply schema are
/// only included for a non-blank selection.
pub fn chat_system_prompt(document_html: &str, selected_html: Option<&str>) -> String {
    let document_text = extract_plain_text(document_html);
    let mut prompt = format!(
        "{ASSISTANT_INTRO}\n\nFULL DOCUMENT CONTEXT:\n\"\"\"\n{document_text}\n\"\"\""
    );

    let selected_text = selected_html
        .map(extract_plain_text)
        .filter(|text| !text.trim().is_empty());
    if let Some(selected) = selected_text {
        let quoted = selected.replace('"', "\\\"");
        prompt.push_str(&format!(
            "

SELECTED TEXT (user is asking about this specific portion):
\"\"\"
{selected}
\"\"\"

The user has selected the above text and is asking about it. Please focus your response on this selected text while considering the full document context.

IMPORTANT: If the user is requesting changes, edits, improvements, or replacements to the selected text, you MUST respond with ONLY a JSON object in this exact format:

{{
  \"type\": \"text_change\",
  \"originalText\": \"{quoted}\",
  \"suggestedText\": \"your improved/changed version here\",
  \"reasoning\": \"brief explanation of why you made these changes\"
}}

DO NOT include any other text, explanations, or formatting in your response when providing suggested changes - ONLY the JSON object.

If the user is asking questions, requesting explanations, or not asking for text changes, respond normally with helpful text (not JSON)."
        ));
    }

    prompt.push_str("\n\n");
    prompt.push_str(GENERAL_GUIDANCE);
    prompt
}

/// Messages asking the collaborator to apply `change` to the document.
pub fn apply_changes_messages(document_html: &str, change: &SuggestedChange) -> Vec<PromptMessage> {
    let request = format!(
        "Please find and replace this text in the document:

FIND THIS EXACT TEXT: \"{}\"
REPLACE WITH: \"{}\"

DOCUMENT HTML:
{document_html}

Return only the updated HTML document.",
        change.original_text, change.suggested_text
    );
    vec![
        PromptMessage::new(PromptRole::System, EDITOR_INSTRUCTIONS),
        PromptMessage::new(PromptRole::User, request),
    ]
}
