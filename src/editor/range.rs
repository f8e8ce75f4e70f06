//! Points, ranges, and range queries over the document tree.
//!
//! A path addresses a node from the root: `[block]`, `[block, leaf]`, or
//! `[list, item, leaf]`. Points address a leaf and a character offset in it.

use crate::doc::{Block, Children, Document, InlineText};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Point {
    pub path: Vec<usize>,
    pub offset: usize,
}

impl Point {
    pub fn new(path: Vec<usize>, offset: usize) -> Self {
        Self { path, offset }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
    pub anchor: Point,
    pub focus: Point,
}

impl Range {
    pub fn new(anchor: Point, focus: Point) -> Self {
        Self { anchor, focus }
    }

    pub fn collapsed(point: Point) -> Self {
        Self {
            anchor: point.clone(),
            focus: point,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    pub fn is_backward(&self) -> bool {
        self.focus < self.anchor
    }

    pub fn start(&self) -> &Point {
        if self.is_backward() {
            &self.focus
        } else {
            &self.anchor
        }
    }

    pub fn end(&self) -> &Point {
        if self.is_backward() {
            &self.anchor
        } else {
            &self.focus
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    Block(&'a Block),
    Leaf(&'a InlineText),
}

pub fn node_at<'a>(doc: &'a Document, path: &[usize]) -> Option<NodeRef<'a>> {
    let (first, rest) = path.split_first()?;
    let mut block = doc.blocks().get(*first)?;
    for (depth, index) in rest.iter().enumerate() {
        match block.children() {
            Children::Inline(leaves) => {
                let leaf = leaves.get(*index)?;
                // Leaves have no children.
                return (depth + 1 == rest.len()).then_some(NodeRef::Leaf(leaf));
            }
            Children::Blocks(items) => block = items.get(*index)?,
        }
    }
    Some(NodeRef::Block(block))
}

pub fn has_path(doc: &Document, path: &[usize]) -> bool {
    node_at(doc, path).is_some()
}

pub fn leaf_at<'a>(doc: &'a Document, path: &[usize]) -> Option<&'a InlineText> {
    match node_at(doc, path)? {
        NodeRef::Leaf(leaf) => Some(leaf),
        NodeRef::Block(_) => None,
    }
}

/// True when the point names an existing leaf and an offset inside it.
pub fn is_valid_point(doc: &Document, point: &Point) -> bool {
    leaf_at(doc, &point.path).is_some_and(|leaf| point.offset <= leaf.char_len())
}

/// Every leaf with its path, in document order.
pub fn leaves(doc: &Document) -> Vec<(Vec<usize>, &InlineText)> {
    let mut out = Vec::new();
    let mut prefix = Vec::new();
    collect_leaves(doc.blocks(), &mut prefix, &mut out);
    out
}

fn collect_leaves<'a>(
    blocks: &'a [Block],
    prefix: &mut Vec<usize>,
    out: &mut Vec<(Vec<usize>, &'a InlineText)>,
) {
    for (index, block) in blocks.iter().enumerate() {
        prefix.push(index);
        match block.children() {
            Children::Inline(children) => {
                for (leaf_index, leaf) in children.iter().enumerate() {
                    let mut path = prefix.clone();
                    path.push(leaf_index);
                    out.push((path, leaf));
                }
            }
            Children::Blocks(items) => collect_leaves(items, prefix, out),
        }
        prefix.pop();
    }
}

/// Paths of the blocks that directly hold leaves, in document order.
pub fn text_block_paths(doc: &Document) -> Vec<Vec<usize>> {
    let mut out = Vec::new();
    let mut prefix = Vec::new();
    collect_text_blocks(doc.blocks(), &mut prefix, &mut out);
    out
}

fn collect_text_blocks(blocks: &[Block], prefix: &mut Vec<usize>, out: &mut Vec<Vec<usize>>) {
    for (index, block) in blocks.iter().enumerate() {
        prefix.push(index);
        match block.items() {
            Some(items) => collect_text_blocks(items, prefix, out),
            None => out.push(prefix.clone()),
        }
        prefix.pop();
    }
}

pub fn start_point(doc: &Document) -> Point {
    leaves(doc)
        .into_iter()
        .next()
        .map(|(path, _)| Point::new(path, 0))
        .unwrap_or_else(|| Point::new(vec![0, 0], 0))
}

pub fn end_point(doc: &Document) -> Point {
    leaves(doc)
        .into_iter()
        .last()
        .map(|(path, leaf)| Point::new(path, leaf.char_len()))
        .unwrap_or_else(|| Point::new(vec![0, 0], 0))
}

/// Plain text covered by the range. Leaf texts are concatenated with no
/// separator between blocks.
pub fn string(doc: &Document, range: &Range) -> String {
    let (start, end) = (range.start(), range.end());
    let mut out = String::new();
    for (path, leaf) in leaves(doc) {
        if path < start.path || path > end.path {
            continue;
        }
        let from = if path == start.path { start.offset } else { 0 };
        let to = if path == end.path {
            end.offset
        } else {
            leaf.char_len()
        };
        out.push_str(&char_slice(&leaf.text, from, to));
    }
    out
}

/// The blocks covered by the range, keeping their enclosing structure and
/// trimming the boundary leaves to the range.
pub fn fragment(doc: &Document, range: &Range) -> Vec<Block> {
    let mut prefix = Vec::new();
    fragment_blocks(doc.blocks(), &mut prefix, range.start(), range.end())
}

fn fragment_blocks(
    blocks: &[Block],
    prefix: &mut Vec<usize>,
    start: &Point,
    end: &Point,
) -> Vec<Block> {
    let depth = prefix.len() + 1;
    let low = &start.path[..depth.min(start.path.len())];
    let high = &end.path[..depth.min(end.path.len())];

    let mut out = Vec::new();
    for (index, block) in blocks.iter().enumerate() {
        prefix.push(index);
        if prefix.as_slice() >= low && prefix.as_slice() <= high {
            let mut copy = block.clone();
            if let Some(items) = copy.items_mut() {
                let source = block.items().map(Vec::as_slice).unwrap_or(&[]);
                *items = fragment_blocks(source, prefix, start, end);
            } else if let Some(leaves) = copy.leaves_mut() {
                *leaves = fragment_leaves(leaves, prefix, start, end);
            }
            out.push(copy);
        }
        prefix.pop();
    }
    out
}

fn fragment_leaves(
    leaves: &[InlineText],
    prefix: &[usize],
    start: &Point,
    end: &Point,
) -> Vec<InlineText> {
    let mut out = Vec::new();
    for (index, leaf) in leaves.iter().enumerate() {
        let mut path = prefix.to_vec();
        path.push(index);
        if path < start.path || path > end.path {
            continue;
        }
        let from = if path == start.path { start.offset } else { 0 };
        let to = if path == end.path {
            end.offset
        } else {
            leaf.char_len()
        };
        out.push(InlineText::styled(char_slice(&leaf.text, from, to), leaf.marks));
    }
    out
}

pub(crate) fn char_slice(text: &str, from: usize, to: usize) -> String {
    text.chars().skip(from).take(to.saturating_sub(from)).collect()
}

/// A position expressed as (text-block ordinal, character offset within the
/// block). Stable across leaf splitting and list wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct TextPosition {
    pub block: usize,
    pub offset: usize,
}

pub(crate) fn to_text_position(doc: &Document, point: &Point) -> Option<TextPosition> {
    let (leaf_index, block_path) = point.path.split_last()?;
    let ordinal = text_block_paths(doc)
        .iter()
        .position(|path| path.as_slice() == block_path)?;
    let leaf = leaf_at(doc, &point.path)?;
    if point.offset > leaf.char_len() {
        return None;
    }
    let NodeRef::Block(block) = node_at(doc, block_path)? else {
        return None;
    };
    let before: usize = block.leaves()?[..*leaf_index]
        .iter()
        .map(InlineText::char_len)
        .sum();
    Some(TextPosition {
        block: ordinal,
        offset: before + point.offset,
    })
}

pub(crate) fn from_text_position(doc: &Document, position: TextPosition) -> Point {
    let paths = text_block_paths(doc);
    let Some(block_path) = paths.get(position.block).or_else(|| paths.last()) else {
        return start_point(doc);
    };
    let leaves = match node_at(doc, block_path) {
        Some(NodeRef::Block(block)) => block.leaves().cloned().unwrap_or_default(),
        _ => Vec::new(),
    };

    let mut consumed = 0;
    for (index, leaf) in leaves.iter().enumerate() {
        let len = leaf.char_len();
        if position.offset <= consumed + len {
            let mut path = block_path.clone();
            path.push(index);
            return Point::new(path, position.offset - consumed);
        }
        consumed += len;
    }

    let mut path = block_path.clone();
    let last = leaves.len().saturating_sub(1);
    path.push(last);
    let offset = leaves.get(last).map_or(0, InlineText::char_len);
    Point::new(path, offset)
}
