//! Editing runtime for the structured document.
//!
//! The editor exclusively owns the document tree. Every content change bumps
//! the version counter once and yields a [`ChangeEvent`] tagged with its
//! [`EditOrigin`], so observers can tell user edits from external
//! replacements without relying on side-channel flags.

use crate::doc::{Alignment, Block, BlockKind, Document, HeadingLevel, InlineText, MarkKind};
use serde::{Deserialize, Serialize};

pub mod range;
mod selection;

pub use range::{Point, Range};
pub use selection::{DocumentSelection, SelectionInfo, SelectionTracker};

use range::{TextPosition, from_text_position, text_block_paths, to_text_position};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EditOrigin {
    UserEdit,
    ExternalReplacement,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub version: u64,
    pub origin: EditOrigin,
    pub markup: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EditError {
    #[error("no selection")]
    NoSelection,
    #[error("selection is collapsed")]
    CollapsedSelection,
    #[error("path not found")]
    PathNotFound,
    #[error("invalid offset")]
    InvalidOffset,
}

/// Block formats a selection can be switched to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockFormat {
    Paragraph,
    Heading(HeadingLevel),
    BlockQuote,
    CodeBlock,
    BulletedList,
    NumberedList,
}

impl BlockFormat {
    fn is_list(self) -> bool {
        matches!(self, BlockFormat::BulletedList | BlockFormat::NumberedList)
    }

    fn matches(self, block: &Block, list: Option<&Block>) -> bool {
        match (self, list.map(|list| &list.kind)) {
            (BlockFormat::BulletedList, Some(BlockKind::BulletedList { .. })) => true,
            (BlockFormat::NumberedList, Some(BlockKind::NumberedList { .. })) => true,
            (BlockFormat::BulletedList | BlockFormat::NumberedList, _) => false,
            (BlockFormat::Paragraph, _) => matches!(block.kind, BlockKind::Paragraph { .. }),
            (BlockFormat::Heading(level), _) => {
                matches!(block.kind, BlockKind::Heading { level: l, .. } if l == level)
            }
            (BlockFormat::BlockQuote, _) => matches!(block.kind, BlockKind::BlockQuote { .. }),
            (BlockFormat::CodeBlock, _) => matches!(block.kind, BlockKind::CodeBlock { .. }),
        }
    }

    fn text_kind(self, children: Vec<InlineText>) -> BlockKind {
        match self {
            BlockFormat::Paragraph => BlockKind::Paragraph { children },
            BlockFormat::Heading(level) => BlockKind::Heading { level, children },
            BlockFormat::BlockQuote => BlockKind::BlockQuote { children },
            BlockFormat::CodeBlock => BlockKind::CodeBlock { children },
            BlockFormat::BulletedList | BlockFormat::NumberedList => {
                BlockKind::ListItem { children }
            }
        }
    }

    fn list_kind(self, children: Vec<Block>) -> BlockKind {
        match self {
            BlockFormat::NumberedList => BlockKind::NumberedList { children },
            _ => BlockKind::BulletedList { children },
        }
    }
}

#[derive(Debug)]
pub struct Editor {
    document: Document,
    selection: Option<Range>,
    version: u64,
    markup: String,
    tracker: SelectionTracker,
}

impl Editor {
    pub fn new(markup: &str) -> Self {
        let document = Document::parse(markup);
        let markup = document.serialize();
        Self {
            document,
            selection: None,
            version: 0,
            markup,
            tracker: SelectionTracker::new(),
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Markup of the current tree, as last published.
    pub fn markup(&self) -> &str {
        &self.markup
    }

    /// The live selection inside the editing surface.
    pub fn selection(&self) -> Option<&Range> {
        self.selection.as_ref()
    }

    /// The selection published as assistant context.
    pub fn document_selection(&self) -> Option<&DocumentSelection> {
        self.tracker.selection()
    }

    pub fn selection_info(&self) -> Option<&SelectionInfo> {
        self.tracker.info()
    }

    pub fn is_focused(&self) -> bool {
        self.tracker.is_focused()
    }

    pub fn select(&mut self, range: Range) -> Result<(), EditError> {
        if !range::is_valid_point(&self.document, &range.anchor)
            || !range::is_valid_point(&self.document, &range.focus)
        {
            return Err(EditError::PathNotFound);
        }
        self.selection = Some(range);
        self.tracker
            .on_selection_change(&self.document, self.selection.as_ref());
        Ok(())
    }

    pub fn deselect(&mut self) {
        self.selection = None;
        self.tracker.on_selection_change(&self.document, None);
    }

    pub fn focus(&mut self) {
        if let Some(restored) = self.tracker.on_focus(&self.document, self.selection.as_ref()) {
            self.selection = Some(restored);
        }
    }

    pub fn blur(&mut self) {
        self.tracker.on_blur(&self.document, self.selection.as_ref());
    }

    pub fn clear_selection(&mut self) {
        self.tracker.clear();
    }

    /// Atomically replaces the whole document with freshly parsed markup.
    ///
    /// The new tree is built before anything is swapped, so no observer can
    /// see a partially replaced document. The cursor moves to the document
    /// start and any captured selection is discarded.
    pub fn replace(&mut self, markup: &str) -> ChangeEvent {
        let document = Document::parse(markup);
        let cursor = range::start_point(&document);

        self.document = document;
        self.selection = Some(Range::collapsed(cursor));
        self.tracker.clear();

        tracing::info!(
            markup_len = markup.len(),
            blocks = self.document.blocks().len(),
            "replaced document content"
        );
        self.publish(EditOrigin::ExternalReplacement)
    }

    /// Applies externally supplied content unless it is the echo of the
    /// editor's own last published markup.
    pub fn sync_external(&mut self, markup: &str) -> Option<ChangeEvent> {
        if markup == self.markup {
            return None;
        }
        tracing::debug!("external content change detected");
        Some(self.replace(markup))
    }

    pub fn insert_text(&mut self, text: &str) -> Result<ChangeEvent, EditError> {
        let range = self.selection.clone().ok_or(EditError::NoSelection)?;
        if !range.is_collapsed() {
            self.delete_range_in_place(&range)?;
        }
        let range = self.selection.clone().ok_or(EditError::NoSelection)?;
        let point = range.anchor;
        let position = self.position(&point)?;
        if self.is_in_divider(&point) {
            return Err(EditError::PathNotFound);
        }

        let leaf = self.leaf_mut(&point.path)?;
        let byte = byte_offset(&leaf.text, point.offset).ok_or(EditError::InvalidOffset)?;
        leaf.text.insert_str(byte, text);

        let caret = TextPosition {
            block: position.block,
            offset: position.offset + text.chars().count(),
        };
        self.selection = Some(Range::collapsed(from_text_position(&self.document, caret)));
        Ok(self.publish(EditOrigin::UserEdit))
    }

    pub fn delete_selection(&mut self) -> Result<ChangeEvent, EditError> {
        let range = self.selection.clone().ok_or(EditError::NoSelection)?;
        self.delete_range(&range)
    }

    /// Removes the content covered by `range`, merging the boundary blocks.
    /// The cursor ends up where the range started.
    pub fn delete_range(&mut self, range: &Range) -> Result<ChangeEvent, EditError> {
        if range.is_collapsed() {
            return Err(EditError::CollapsedSelection);
        }
        self.delete_range_in_place(range)?;
        Ok(self.publish(EditOrigin::UserEdit))
    }

    pub fn has_path(&self, path: &[usize]) -> bool {
        range::has_path(&self.document, path)
    }

    /// Plain text covered by `range`.
    pub fn string(&self, range: &Range) -> String {
        range::string(&self.document, range)
    }

    pub fn fragment(&self, range: &Range) -> Vec<Block> {
        range::fragment(&self.document, range)
    }

    /// Mark state of the first selected leaf.
    pub fn is_mark_active(&self, kind: MarkKind) -> bool {
        let Some(selection) = &self.selection else {
            return false;
        };
        let (start, end) = (selection.start(), selection.end());
        range::leaves(&self.document)
            .into_iter()
            .filter(|(path, _)| *path >= start.path && *path <= end.path)
            // A start point at the very end of a leaf selects nothing in it.
            .find(|(path, leaf)| {
                selection.is_collapsed() || *path != start.path || start.offset < leaf.char_len()
            })
            .is_some_and(|(_, leaf)| leaf.marks.get(kind))
    }

    pub fn toggle_mark(&mut self, kind: MarkKind) -> Result<ChangeEvent, EditError> {
        let range = self.selection.clone().ok_or(EditError::NoSelection)?;
        if range.is_collapsed() {
            return Err(EditError::CollapsedSelection);
        }
        let value = !self.is_mark_active(kind);
        let start = self.position(range.start())?;
        let end = self.position(range.end())?;

        let paths = text_block_paths(&self.document);
        for ordinal in start.block..=end.block {
            let from = if ordinal == start.block { start.offset } else { 0 };
            let to = if ordinal == end.block {
                Some(end.offset)
            } else {
                None
            };
            let leaves = self.leaves_mut(&paths[ordinal])?;
            let (head, rest) = split_leaves(std::mem::take(leaves), from);
            let (mut middle, tail) = match to {
                Some(to) => split_leaves(rest, to - from),
                None => (rest, Vec::new()),
            };
            for leaf in &mut middle {
                leaf.marks.set(kind, value);
            }
            *leaves = normalize_leaves(head.into_iter().chain(middle).chain(tail).collect());
        }

        self.restore_selection(&range, start, end);
        Ok(self.publish(EditOrigin::UserEdit))
    }

    /// True if any block touched by the selection has the given format.
    pub fn is_block_active(&self, format: BlockFormat) -> bool {
        let Some((start, end)) = self.selected_positions() else {
            return false;
        };
        text_block_paths(&self.document)
            .iter()
            .enumerate()
            .filter(|(ordinal, _)| (start.block..=end.block).contains(ordinal))
            .any(|(_, path)| {
                let block = self.block_at(path);
                let list = (path.len() > 1).then(|| self.block_at(&path[..1])).flatten();
                block.is_some_and(|block| format.matches(block, list))
            })
    }

    /// Switches the selected blocks to `format`, or back to paragraphs when
    /// they already have it. List formats wrap the blocks into one list.
    pub fn toggle_block(&mut self, format: BlockFormat) -> Result<ChangeEvent, EditError> {
        let range = self.selection.clone().ok_or(EditError::NoSelection)?;
        let (start, end) = self.selected_positions().ok_or(EditError::PathNotFound)?;
        let active = self.is_block_active(format);
        let target = if active { BlockFormat::Paragraph } else { format };
        let wrap = !active && format.is_list();

        let selected = start.block..=end.block;
        let mut ordinal = 0;
        let mut before = Vec::new();
        let mut converted = Vec::new();
        let mut after = Vec::new();

        for block in std::mem::take(self.document.blocks_mut()) {
            if block.is_list() {
                let Block { kind, align } = block;
                let rebuild = |items: Vec<Block>| Block {
                    kind: match &kind {
                        BlockKind::NumberedList { .. } => BlockKind::NumberedList { children: items },
                        _ => BlockKind::BulletedList { children: items },
                    },
                    align,
                };
                let items = match &kind {
                    BlockKind::BulletedList { children } | BlockKind::NumberedList { children } => {
                        children.clone()
                    }
                    _ => Vec::new(),
                };
                let mut pending = Vec::new();
                for item in items {
                    if selected.contains(&ordinal) {
                        if !pending.is_empty() {
                            before.push(rebuild(std::mem::take(&mut pending)));
                        }
                        converted.push(convert_block(item, target));
                    } else {
                        pending.push(item);
                    }
                    ordinal += 1;
                }
                if !pending.is_empty() {
                    let list = rebuild(pending);
                    if converted.is_empty() {
                        before.push(list);
                    } else {
                        after.push(list);
                    }
                }
            } else {
                if selected.contains(&ordinal) {
                    converted.push(convert_block(block, target));
                } else if converted.is_empty() {
                    before.push(block);
                } else {
                    after.push(block);
                }
                ordinal += 1;
            }
        }

        let blocks = self.document.blocks_mut();
        blocks.extend(before);
        if wrap {
            blocks.push(Block::new(format.list_kind(converted)));
        } else {
            blocks.extend(converted);
        }
        blocks.extend(after);
        self.document.ensure_not_empty();

        self.restore_selection(&range, start, end);
        Ok(self.publish(EditOrigin::UserEdit))
    }

    pub fn toggle_alignment(&mut self, align: Alignment) -> Result<ChangeEvent, EditError> {
        let (start, end) = self.selected_positions().ok_or(EditError::NoSelection)?;
        let paths: Vec<_> = text_block_paths(&self.document)
            .into_iter()
            .skip(start.block)
            .take(end.block - start.block + 1)
            .collect();
        let active = paths
            .iter()
            .any(|path| self.block_at(path).is_some_and(|b| b.align == Some(align)));
        for path in &paths {
            if let Some(block) = self.block_at_mut(path) {
                block.align = if active { None } else { Some(align) };
            }
        }
        Ok(self.publish(EditOrigin::UserEdit))
    }

    /// Inserts a divider and an empty paragraph after the block holding the
    /// cursor, then moves the cursor into the new paragraph.
    pub fn insert_divider(&mut self) -> Result<ChangeEvent, EditError> {
        let blocks = self.document.blocks_mut();
        let index = match &self.selection {
            Some(range) => range.end().path.first().copied().ok_or(EditError::PathNotFound)?,
            None => blocks.len() - 1,
        };
        if index >= blocks.len() {
            return Err(EditError::PathNotFound);
        }
        blocks.insert(index + 1, Block::divider());
        blocks.insert(index + 2, Block::empty_paragraph());
        self.selection = Some(Range::collapsed(Point::new(vec![index + 2, 0], 0)));
        Ok(self.publish(EditOrigin::UserEdit))
    }

    fn publish(&mut self, origin: EditOrigin) -> ChangeEvent {
        self.version += 1;
        self.markup = self.document.serialize();
        if origin == EditOrigin::UserEdit {
            self.tracker.validate(&self.document);
        }
        tracing::debug!(version = self.version, ?origin, "document changed");
        ChangeEvent {
            version: self.version,
            origin,
            markup: self.markup.clone(),
        }
    }

    fn delete_range_in_place(&mut self, range: &Range) -> Result<(), EditError> {
        let start = self.position(range.start())?;
        let end = self.position(range.end())?;
        let paths = text_block_paths(&self.document);

        if start.block == end.block {
            let leaves = self.leaves_mut(&paths[start.block])?;
            let (head, rest) = split_leaves(std::mem::take(leaves), start.offset);
            let (_, tail) = split_leaves(rest, end.offset - start.offset);
            *leaves = normalize_leaves(head.into_iter().chain(tail).collect());
        } else {
            let end_leaves = self.leaves_mut(&paths[end.block])?.clone();
            let (_, tail) = split_leaves(end_leaves, end.offset);

            // A divider cannot hold text, so the tail stays in the end block
            // and the divider goes with the rest of the range.
            let removed = if self.is_in_divider(range.start()) {
                *self.leaves_mut(&paths[end.block])? = normalize_leaves(tail);
                &paths[start.block..end.block]
            } else {
                let leaves = self.leaves_mut(&paths[start.block])?;
                let (head, _) = split_leaves(std::mem::take(leaves), start.offset);
                *leaves = normalize_leaves(head.into_iter().chain(tail).collect());
                &paths[start.block + 1..=end.block]
            };

            for path in removed.iter().rev() {
                remove_block(self.document.blocks_mut(), path);
            }
            self.document
                .blocks_mut()
                .retain(|block| block.items().is_none_or(|items| !items.is_empty()));
            self.document.ensure_not_empty();
        }

        self.selection = Some(Range::collapsed(from_text_position(&self.document, start)));
        Ok(())
    }

    fn selected_positions(&self) -> Option<(TextPosition, TextPosition)> {
        let range = self.selection.as_ref()?;
        let start = to_text_position(&self.document, range.start())?;
        let end = to_text_position(&self.document, range.end())?;
        Some((start, end))
    }

    fn restore_selection(&mut self, previous: &Range, start: TextPosition, end: TextPosition) {
        let start = from_text_position(&self.document, start);
        let end = from_text_position(&self.document, end);
        self.selection = Some(if previous.is_backward() {
            Range::new(end, start)
        } else {
            Range::new(start, end)
        });
    }

    fn is_in_divider(&self, point: &Point) -> bool {
        point
            .path
            .split_last()
            .and_then(|(_, block_path)| self.block_at(block_path))
            .is_some_and(Block::is_divider)
    }

    fn position(&self, point: &Point) -> Result<TextPosition, EditError> {
        to_text_position(&self.document, point).ok_or(EditError::PathNotFound)
    }

    fn block_at(&self, path: &[usize]) -> Option<&Block> {
        match range::node_at(&self.document, path)? {
            range::NodeRef::Block(block) => Some(block),
            range::NodeRef::Leaf(_) => None,
        }
    }

    fn block_at_mut(&mut self, path: &[usize]) -> Option<&mut Block> {
        let (first, rest) = path.split_first()?;
        let mut block = self.document.blocks_mut().get_mut(*first)?;
        for index in rest {
            block = block.items_mut()?.get_mut(*index)?;
        }
        Some(block)
    }

    fn leaves_mut(&mut self, block_path: &[usize]) -> Result<&mut Vec<InlineText>, EditError> {
        self.block_at_mut(block_path)
            .and_then(Block::leaves_mut)
            .ok_or(EditError::PathNotFound)
    }

    fn leaf_mut(&mut self, path: &[usize]) -> Result<&mut InlineText, EditError> {
        let (leaf, block_path) = path.split_last().ok_or(EditError::PathNotFound)?;
        self.leaves_mut(block_path)?
            .get_mut(*leaf)
            .ok_or(EditError::PathNotFound)
    }
}

impl Default for Editor {
    fn default() -> Self {
        Self::new("")
    }
}

fn convert_block(block: Block, format: BlockFormat) -> Block {
    let children = block.leaves().cloned().unwrap_or_else(|| vec![InlineText::empty()]);
    Block {
        kind: format.text_kind(children),
        align: block.align,
    }
}

fn remove_block(blocks: &mut Vec<Block>, path: &[usize]) {
    match path {
        [index] if *index < blocks.len() => {
            blocks.remove(*index);
        }
        [index, rest @ ..] => {
            if let Some(items) = blocks.get_mut(*index).and_then(Block::items_mut) {
                remove_block(items, rest);
            }
        }
        _ => {}
    }
}

/// Splits leaves at a character offset counted across the whole run.
fn split_leaves(leaves: Vec<InlineText>, at: usize) -> (Vec<InlineText>, Vec<InlineText>) {
    let mut head = Vec::new();
    let mut tail = Vec::new();
    let mut consumed = 0;
    for leaf in leaves {
        let len = leaf.char_len();
        if consumed + len <= at {
            head.push(leaf);
        } else if consumed >= at {
            tail.push(leaf);
        } else {
            let split = at - consumed;
            head.push(InlineText::styled(range::char_slice(&leaf.text, 0, split), leaf.marks));
            tail.push(InlineText::styled(range::char_slice(&leaf.text, split, len), leaf.marks));
        }
        consumed += len;
    }
    (head, tail)
}

/// Drops empty leaves and merges neighbours with identical marks, keeping at
/// least one leaf.
fn normalize_leaves(leaves: Vec<InlineText>) -> Vec<InlineText> {
    let fallback = leaves.first().map(|leaf| leaf.marks).unwrap_or_default();
    let mut out: Vec<InlineText> = Vec::with_capacity(leaves.len());
    for leaf in leaves.into_iter().filter(|leaf| !leaf.text.is_empty()) {
        match out.last_mut() {
            Some(last) if last.marks == leaf.marks => last.text.push_str(&leaf.text),
            _ => out.push(leaf),
        }
    }
    if out.is_empty() {
        out.push(InlineText::styled("", fallback));
    }
    out
}

fn byte_offset(text: &str, char_offset: usize) -> Option<usize> {
    if char_offset == 0 {
        return Some(0);
    }
    text.char_indices()
        .map(|(index, _)| index)
        .chain(std::iter::once(text.len()))
        .nth(char_offset)
}
