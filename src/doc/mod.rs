//! Rich-text document model, markup parser, and serializer.
//!
//! A document is an ordered, never-empty sequence of blocks. Text-bearing
//! blocks hold inline leaves; list containers hold list-item blocks.

use serde::{Deserialize, Serialize};

mod parser;
mod serialize;

pub use parser::Parser;
pub use serialize::{serialize, serialize_block, serialize_inline};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkKind {
    Code,
    Bold,
    Italic,
    Underline,
    Strikethrough,
}

impl MarkKind {
    /// Wrapping order used by the serializer, innermost first.
    pub const NESTING_ORDER: [MarkKind; 5] = [
        MarkKind::Code,
        MarkKind::Bold,
        MarkKind::Italic,
        MarkKind::Underline,
        MarkKind::Strikethrough,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            MarkKind::Code => "code",
            MarkKind::Bold => "strong",
            MarkKind::Italic => "em",
            MarkKind::Underline => "u",
            MarkKind::Strikethrough => "s",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "strong" | "b" => Some(MarkKind::Bold),
            "em" | "i" => Some(MarkKind::Italic),
            "u" => Some(MarkKind::Underline),
            "s" | "strike" | "del" => Some(MarkKind::Strikethrough),
            "code" => Some(MarkKind::Code),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Marks {
    #[serde(default, skip_serializing_if = "is_false")]
    pub bold: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub italic: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub underline: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub strikethrough: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub code: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl Marks {
    pub fn get(&self, kind: MarkKind) -> bool {
        match kind {
            MarkKind::Code => self.code,
            MarkKind::Bold => self.bold,
            MarkKind::Italic => self.italic,
            MarkKind::Underline => self.underline,
            MarkKind::Strikethrough => self.strikethrough,
        }
    }

    pub fn set(&mut self, kind: MarkKind, value: bool) {
        match kind {
            MarkKind::Code => self.code = value,
            MarkKind::Bold => self.bold = value,
            MarkKind::Italic => self.italic = value,
            MarkKind::Underline => self.underline = value,
            MarkKind::Strikethrough => self.strikethrough = value,
        }
    }

    pub fn with(mut self, kind: MarkKind) -> Self {
        self.set(kind, true);
        self
    }

    pub fn is_plain(&self) -> bool {
        *self == Marks::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InlineText {
    pub text: String,
    #[serde(flatten)]
    pub marks: Marks,
}

impl InlineText {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            marks: Marks::default(),
        }
    }

    pub fn styled(text: impl Into<String>, marks: Marks) -> Self {
        Self {
            text: text.into(),
            marks,
        }
    }

    pub fn empty() -> Self {
        Self::plain("")
    }

    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Left,
    Center,
    Right,
    Justify,
}

impl Alignment {
    pub fn as_str(self) -> &'static str {
        match self {
            Alignment::Left => "left",
            Alignment::Center => "center",
            Alignment::Right => "right",
            Alignment::Justify => "justify",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HeadingLevel {
    #[serde(rename = "1")]
    One,
    #[serde(rename = "2")]
    Two,
    #[serde(rename = "3")]
    Three,
}

impl HeadingLevel {
    pub fn tag(self) -> &'static str {
        match self {
            HeadingLevel::One => "h1",
            HeadingLevel::Two => "h2",
            HeadingLevel::Three => "h3",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum BlockKind {
    Paragraph { children: Vec<InlineText> },
    Heading { level: HeadingLevel, children: Vec<InlineText> },
    BlockQuote { children: Vec<InlineText> },
    CodeBlock { children: Vec<InlineText> },
    Divider { children: Vec<InlineText> },
    BulletedList { children: Vec<Block> },
    NumberedList { children: Vec<Block> },
    ListItem { children: Vec<InlineText> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    #[serde(flatten)]
    pub kind: BlockKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub align: Option<Alignment>,
}

/// Borrowed view over a block's children.
#[derive(Debug, Clone, Copy)]
pub enum Children<'a> {
    Inline(&'a [InlineText]),
    Blocks(&'a [Block]),
}

impl Block {
    pub fn new(kind: BlockKind) -> Self {
        Self { kind, align: None }
    }

    pub fn aligned(mut self, align: Alignment) -> Self {
        self.align = Some(align);
        self
    }

    pub fn paragraph(children: Vec<InlineText>) -> Self {
        Self::new(BlockKind::Paragraph { children })
    }

    pub fn empty_paragraph() -> Self {
        Self::paragraph(vec![InlineText::empty()])
    }

    pub fn heading(level: HeadingLevel, children: Vec<InlineText>) -> Self {
        Self::new(BlockKind::Heading { level, children })
    }

    pub fn divider() -> Self {
        Self::new(BlockKind::Divider {
            children: vec![InlineText::empty()],
        })
    }

    pub fn list_item(children: Vec<InlineText>) -> Self {
        Self::new(BlockKind::ListItem { children })
    }

    pub fn children(&self) -> Children<'_> {
        match &self.kind {
            BlockKind::Paragraph { children }
            | BlockKind::Heading { children, .. }
            | BlockKind::BlockQuote { children }
            | BlockKind::CodeBlock { children }
            | BlockKind::Divider { children }
            | BlockKind::ListItem { children } => Children::Inline(children),
            BlockKind::BulletedList { children } | BlockKind::NumberedList { children } => {
                Children::Blocks(children)
            }
        }
    }

    pub fn leaves(&self) -> Option<&Vec<InlineText>> {
        match &self.kind {
            BlockKind::Paragraph { children }
            | BlockKind::Heading { children, .. }
            | BlockKind::BlockQuote { children }
            | BlockKind::CodeBlock { children }
            | BlockKind::Divider { children }
            | BlockKind::ListItem { children } => Some(children),
            BlockKind::BulletedList { .. } | BlockKind::NumberedList { .. } => None,
        }
    }

    pub fn leaves_mut(&mut self) -> Option<&mut Vec<InlineText>> {
        match &mut self.kind {
            BlockKind::Paragraph { children }
            | BlockKind::Heading { children, .. }
            | BlockKind::BlockQuote { children }
            | BlockKind::CodeBlock { children }
            | BlockKind::Divider { children }
            | BlockKind::ListItem { children } => Some(children),
            BlockKind::BulletedList { .. } | BlockKind::NumberedList { .. } => None,
        }
    }

    pub fn items(&self) -> Option<&Vec<Block>> {
        match &self.kind {
            BlockKind::BulletedList { children } | BlockKind::NumberedList { children } => {
                Some(children)
            }
            _ => None,
        }
    }

    pub fn items_mut(&mut self) -> Option<&mut Vec<Block>> {
        match &mut self.kind {
            BlockKind::BulletedList { children } | BlockKind::NumberedList { children } => {
                Some(children)
            }
            _ => None,
        }
    }

    pub fn is_list(&self) -> bool {
        self.items().is_some()
    }

    /// Dividers carry a placeholder leaf that is never written out.
    pub fn is_divider(&self) -> bool {
        matches!(self.kind, BlockKind::Divider { .. })
    }

    /// Concatenated text of all leaves; list items are separated by newlines.
    pub fn plain_text(&self) -> String {
        match self.children() {
            Children::Inline(leaves) => leaves.iter().map(|leaf| leaf.text.as_str()).collect(),
            Children::Blocks(items) => items
                .iter()
                .map(Block::plain_text)
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

/// The structured document tree. Always holds at least one block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Block>", into = "Vec<Block>")]
pub struct Document {
    blocks: Vec<Block>,
}

impl From<Vec<Block>> for Document {
    fn from(blocks: Vec<Block>) -> Self {
        Self::from_blocks(blocks)
    }
}

impl From<Document> for Vec<Block> {
    fn from(doc: Document) -> Self {
        doc.blocks
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            blocks: vec![Block::empty_paragraph()],
        }
    }

    pub fn from_blocks(blocks: Vec<Block>) -> Self {
        let mut doc = Self { blocks };
        doc.ensure_not_empty();
        doc
    }

    pub fn parse(markup: &str) -> Self {
        Self::from_blocks(Parser::parse(markup))
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub(crate) fn blocks_mut(&mut self) -> &mut Vec<Block> {
        &mut self.blocks
    }

    pub fn into_blocks(self) -> Vec<Block> {
        self.blocks
    }

    pub(crate) fn ensure_not_empty(&mut self) {
        if self.blocks.is_empty() {
            self.blocks.push(Block::empty_paragraph());
        }
    }

    pub fn serialize(&self) -> String {
        serialize(&self.blocks)
    }

    pub fn plain_text(&self) -> String {
        self.blocks
            .iter()
            .map(Block::plain_text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn char_count(&self) -> usize {
        self.plain_text().chars().count()
    }

    pub fn word_count(&self) -> usize {
        self.plain_text().split_whitespace().count()
    }

    /// True for the single-empty-paragraph placeholder document.
    pub fn is_empty(&self) -> bool {
        match self.blocks.as_slice() {
            [Block {
                kind: BlockKind::Paragraph { children },
                ..
            }] => matches!(children.as_slice(), [leaf] if leaf.text.is_empty()),
            _ => false,
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}
