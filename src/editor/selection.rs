//! Tracks the user's range selection and publishes it as assistant context.

use super::range::{self, Range};
use crate::doc::{Document, serialize};
use serde::{Deserialize, Serialize};

/// The selection as seen outside the editor.
///
/// Offsets are relative to the selected text (`0..text length`), not to the
/// document. `text` holds the serialized markup of the selected fragment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSelection {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionInfo {
    pub range: Range,
    pub text: String,
    pub html: String,
}

#[derive(Debug, Default)]
pub struct SelectionTracker {
    info: Option<SelectionInfo>,
    published: Option<DocumentSelection>,
    focused: bool,
}

impl SelectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selection(&self) -> Option<&DocumentSelection> {
        self.published.as_ref()
    }

    pub fn info(&self) -> Option<&SelectionInfo> {
        self.info.as_ref()
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    /// Handles a change of the live selection. Only captures while focused.
    pub fn on_selection_change(&mut self, doc: &Document, live: Option<&Range>) {
        let Some(range) = live.filter(|range| !range.is_collapsed()) else {
            tracing::debug!("clearing selection (none or collapsed)");
            self.clear();
            return;
        };
        if self.focused {
            self.capture(doc, range);
        }
    }

    /// Handles focus. Returns a previously captured range to restore onto the
    /// live selection, if it is still valid.
    pub fn on_focus(&mut self, doc: &Document, live: Option<&Range>) -> Option<Range> {
        self.focused = true;
        if live.is_some_and(|range| !range.is_collapsed()) {
            let info = self.info.as_ref()?;
            let still_valid = range::has_path(doc, &info.range.anchor.path)
                && range::has_path(doc, &info.range.focus.path);
            still_valid.then(|| info.range.clone())
        } else {
            self.clear();
            None
        }
    }

    /// Handles blur, preserving a live non-collapsed selection.
    pub fn on_blur(&mut self, doc: &Document, live: Option<&Range>) {
        self.focused = false;
        match live.filter(|range| !range.is_collapsed()) {
            Some(range) => {
                tracing::debug!("preserving selection on blur");
                self.capture(doc, range);
            }
            None => self.clear(),
        }
    }

    pub fn clear(&mut self) {
        self.info = None;
        self.published = None;
    }

    /// Clears the captured selection when it refers to paths that no longer
    /// exist. Returns true if it was cleared.
    pub fn validate(&mut self, doc: &Document) -> bool {
        let Some(info) = &self.info else {
            return false;
        };
        if range::has_path(doc, &info.range.anchor.path)
            && range::has_path(doc, &info.range.focus.path)
        {
            return false;
        }
        tracing::debug!("clearing invalid selection");
        self.clear();
        true
    }

    fn capture(&mut self, doc: &Document, range: &Range) {
        if !range::is_valid_point(doc, &range.anchor) || !range::is_valid_point(doc, &range.focus) {
            tracing::warn!(?range, "selection refers to missing positions");
            self.clear();
            return;
        }

        let text = range::string(doc, range);
        let html = serialize(&range::fragment(doc, range));
        tracing::debug!(
            text_len = text.len(),
            html_len = html.len(),
            "captured selection"
        );

        self.published = Some(DocumentSelection {
            start: 0,
            end: text.chars().count(),
            text: html.clone(),
        });
        self.info = Some(SelectionInfo {
            range: range.clone(),
            text,
            html,
        });
    }
}
