use super::{Alignment, Block, BlockKind, InlineText, MarkKind};

/// Serializes blocks to markup, one top-level block per line.
pub fn serialize(blocks: &[Block]) -> String {
    blocks
        .iter()
        .map(serialize_block)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Serializes a run of inline leaves without any block wrapper.
pub fn serialize_inline(leaves: &[InlineText]) -> String {
    leaves.iter().map(serialize_leaf).collect()
}

fn serialize_leaf(leaf: &InlineText) -> String {
    let mut text = encode_leaf_text(&leaf.text);
    for kind in MarkKind::NESTING_ORDER {
        if leaf.marks.get(kind) {
            let tag = kind.tag();
            text = format!("<{tag}>{text}</{tag}>");
        }
    }
    text
}

/// Escapes `&`, `<` and `>`. Carriage returns become `&#13;` because HTML
/// input preprocessing folds a literal CR into LF.
fn encode_leaf_text(text: &str) -> String {
    let escaped = html_escape::encode_text(text);
    if escaped.contains('\r') {
        escaped.replace('\r', "&#13;")
    } else {
        escaped.into_owned()
    }
}

pub fn serialize_block(block: &Block) -> String {
    let style = align_style(block.align);
    match &block.kind {
        BlockKind::Paragraph { children } => {
            format!("<p{style}>{}</p>", serialize_inline(children))
        }
        BlockKind::Heading { level, children } => {
            let tag = level.tag();
            format!("<{tag}{style}>{}</{tag}>", serialize_inline(children))
        }
        BlockKind::BlockQuote { children } => format!(
            "<blockquote{style}><p>{}</p></blockquote>",
            serialize_inline(children)
        ),
        BlockKind::CodeBlock { children } => format!(
            "<pre{style}><code>{}</code></pre>",
            serialize_inline(children)
        ),
        BlockKind::Divider { .. } => "<hr>".to_string(),
        BlockKind::BulletedList { children } => format!("<ul>{}</ul>", serialize_items(children)),
        BlockKind::NumberedList { children } => format!("<ol>{}</ol>", serialize_items(children)),
        BlockKind::ListItem { children } => format!("<li>{}</li>", serialize_inline(children)),
    }
}

fn serialize_items(items: &[Block]) -> String {
    items.iter().map(serialize_block).collect()
}

fn align_style(align: Option<Alignment>) -> String {
    match align {
        // Left is the rendering default and is never written out.
        None | Some(Alignment::Left) => String::new(),
        Some(align) => format!(r#" style="text-align: {}""#, align.as_str()),
    }
}
