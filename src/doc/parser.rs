use super::{Alignment, Block, BlockKind, HeadingLevel, InlineText, MarkKind};
use crate::markup::{MarkupNode, parse_fragment};

pub struct Parser;

impl Parser {
    /// Parses markup into blocks. Never fails: empty or unusable input
    /// yields a single empty paragraph.
    pub fn parse(markup: &str) -> Vec<Block> {
        if markup.trim().is_empty() {
            tracing::debug!("empty markup, using default paragraph");
            return vec![Block::empty_paragraph()];
        }

        let nodes = parse_fragment(markup);
        let blocks = Self::parse_nodes(&nodes);
        tracing::debug!(
            markup_len = markup.len(),
            blocks = blocks.len(),
            "parsed markup into blocks"
        );
        blocks
    }

    /// Builds blocks from an already-parsed node list.
    pub fn parse_nodes(nodes: &[MarkupNode]) -> Vec<Block> {
        let mut blocks = Vec::new();
        for node in nodes.iter().filter(|node| node.is_element()) {
            parse_block(node, &mut blocks);
        }

        if blocks.is_empty() {
            let raw: String = nodes.iter().map(MarkupNode::text_content).collect();
            if !raw.is_empty() {
                blocks.push(Block::paragraph(vec![InlineText::plain(raw)]));
            }
        }

        if blocks.is_empty() {
            blocks.push(Block::empty_paragraph());
        }
        blocks
    }
}

fn parse_block(element: &MarkupNode, out: &mut Vec<Block>) {
    let Some(tag) = element.tag() else {
        return;
    };
    let align = alignment_of(element);

    let block = match tag {
        "h1" | "h2" | "h3" => {
            let level = match tag {
                "h1" => HeadingLevel::One,
                "h2" => HeadingLevel::Two,
                _ => HeadingLevel::Three,
            };
            BlockKind::Heading {
                level,
                children: inline_or_raw(element, parse_inline(element)),
            }
        }
        "blockquote" => BlockKind::BlockQuote {
            children: inline_or_raw(element, parse_inline_children(element)),
        },
        "pre" => BlockKind::CodeBlock {
            children: inline_or_raw(element, parse_code_block(element)),
        },
        "hr" => {
            out.push(Block::divider());
            return;
        }
        "ul" | "ol" => {
            let items: Vec<Block> = element
                .descendants_by_tag("li")
                .into_iter()
                .map(|item| Block::list_item(inline_or_raw(item, parse_inline(item))))
                .collect();
            // A list without items has nothing to edit.
            if items.is_empty() {
                return;
            }
            let kind = if tag == "ul" {
                BlockKind::BulletedList { children: items }
            } else {
                BlockKind::NumberedList { children: items }
            };
            out.push(Block::new(kind));
            return;
        }
        _ => {
            let children = parse_inline(element);
            if !children.is_empty() {
                BlockKind::Paragraph { children }
            } else if tag == "p" {
                BlockKind::Paragraph {
                    children: vec![InlineText::plain(element.text_content())],
                }
            } else {
                return;
            }
        }
    };

    out.push(Block { kind: block, align });
}

/// Inline leaves of `node` and its descendants.
///
/// Formatting elements OR their flag onto every leaf they contain; any other
/// element is transparent.
pub(crate) fn parse_inline(node: &MarkupNode) -> Vec<InlineText> {
    match node {
        MarkupNode::Text(text) => {
            if text.is_empty() {
                Vec::new()
            } else {
                vec![InlineText::plain(text.clone())]
            }
        }
        MarkupNode::Element { tag, .. } => {
            let mut leaves = parse_inline_children(node);
            if let Some(kind) = MarkKind::from_tag(tag) {
                if leaves.is_empty() {
                    leaves.push(InlineText::plain(node.text_content()));
                }
                for leaf in &mut leaves {
                    leaf.marks.set(kind, true);
                }
            }
            leaves
        }
    }
}

fn parse_inline_children(node: &MarkupNode) -> Vec<InlineText> {
    node.children().iter().flat_map(parse_inline).collect()
}

/// `<pre><code>…</code></pre>` is how code blocks are written out, so a
/// single wrapping `<code>` element is not treated as a code mark.
fn parse_code_block(element: &MarkupNode) -> Vec<InlineText> {
    match element.children() {
        [only] if only.tag() == Some("code") => parse_inline_children(only),
        _ => parse_inline(element),
    }
}

fn inline_or_raw(element: &MarkupNode, leaves: Vec<InlineText>) -> Vec<InlineText> {
    if leaves.is_empty() {
        vec![InlineText::plain(element.text_content())]
    } else {
        leaves
    }
}

fn alignment_of(element: &MarkupNode) -> Option<Alignment> {
    let style = element.attr("style")?;
    for declaration in style.split(';') {
        let Some((property, value)) = declaration.split_once(':') else {
            continue;
        };
        if !property.trim().eq_ignore_ascii_case("text-align") {
            continue;
        }
        return match value.trim().to_ascii_lowercase().as_str() {
            "center" => Some(Alignment::Center),
            "right" => Some(Alignment::Right),
            "justify" => Some(Alignment::Justify),
            _ => None,
        };
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc::Marks;

    fn bold() -> Marks {
        Marks::default().with(MarkKind::Bold)
    }

    #[test]
    fn test_empty_input_yields_default_paragraph() {
        assert_eq!(Parser::parse(""), vec![Block::empty_paragraph()]);
        assert_eq!(Parser::parse("  \n\t "), vec![Block::empty_paragraph()]);
    }

    #[test]
    fn test_mixed_marks_paragraph() {
        let blocks = Parser::parse("<p><strong>Hello</strong> <em>world</em></p>");
        assert_eq!(
            blocks,
            vec![Block::paragraph(vec![
                InlineText::styled("Hello", bold()),
                InlineText::plain(" "),
                InlineText::styled("world", Marks::default().with(MarkKind::Italic)),
            ])]
        );
    }

    #[test]
    fn test_nested_marks_accumulate() {
        let blocks = Parser::parse("<p><b><i><u>x</u></i></b></p>");
        let expected = Marks::default()
            .with(MarkKind::Bold)
            .with(MarkKind::Italic)
            .with(MarkKind::Underline);
        assert_eq!(
            blocks,
            vec![Block::paragraph(vec![InlineText::styled("x", expected)])]
        );
    }

    #[test]
    fn test_empty_mark_element_synthesizes_leaf() {
        let blocks = Parser::parse("<p>a<strong></strong></p>");
        assert_eq!(
            blocks,
            vec![Block::paragraph(vec![
                InlineText::plain("a"),
                InlineText::styled("", bold()),
            ])]
        );
    }

    #[test]
    fn test_unknown_inline_elements_are_transparent() {
        let blocks = Parser::parse(r#"<p><span>a<a href="x">b</a></span></p>"#);
        assert_eq!(
            blocks,
            vec![Block::paragraph(vec![
                InlineText::plain("a"),
                InlineText::plain("b"),
            ])]
        );
    }

    #[test]
    fn test_headings_and_alignment() {
        let blocks = Parser::parse(
            r#"<h1 style="text-align: center">A</h1><h2>B</h2><h3 style="text-align:right">C</h3>"#,
        );
        assert_eq!(
            blocks,
            vec![
                Block::heading(HeadingLevel::One, vec![InlineText::plain("A")])
                    .aligned(Alignment::Center),
                Block::heading(HeadingLevel::Two, vec![InlineText::plain("B")]),
                Block::heading(HeadingLevel::Three, vec![InlineText::plain("C")])
                    .aligned(Alignment::Right),
            ]
        );
    }

    #[test]
    fn test_left_alignment_is_unset() {
        let blocks = Parser::parse(r#"<p style="text-align: left">x</p>"#);
        assert_eq!(blocks[0].align, None);
    }

    #[test]
    fn test_empty_paragraph_keeps_placeholder() {
        assert_eq!(Parser::parse("<p></p>"), vec![Block::empty_paragraph()]);
    }

    #[test]
    fn test_empty_div_is_dropped() {
        let blocks = Parser::parse("<div></div><p>x</p>");
        assert_eq!(blocks, vec![Block::paragraph(vec![InlineText::plain("x")])]);
    }

    #[test]
    fn test_div_becomes_paragraph() {
        let blocks = Parser::parse("<div>x</div>");
        assert_eq!(blocks, vec![Block::paragraph(vec![InlineText::plain("x")])]);
    }

    #[test]
    fn test_lists() {
        let blocks = Parser::parse("<ul><li>a</li><li><b>b</b></li></ul><ol><li>c</li></ol>");
        assert_eq!(
            blocks,
            vec![
                Block::new(BlockKind::BulletedList {
                    children: vec![
                        Block::list_item(vec![InlineText::plain("a")]),
                        Block::list_item(vec![InlineText::styled("b", bold())]),
                    ]
                }),
                Block::new(BlockKind::NumberedList {
                    children: vec![Block::list_item(vec![InlineText::plain("c")])]
                }),
            ]
        );
    }

    #[test]
    fn test_list_without_items_is_dropped() {
        let blocks = Parser::parse("<ul></ul>");
        assert_eq!(blocks, vec![Block::empty_paragraph()]);
    }

    #[test]
    fn test_blockquote_flattens_children() {
        let blocks = Parser::parse("<blockquote><p>quoted <em>text</em></p></blockquote>");
        assert_eq!(
            blocks,
            vec![Block::new(BlockKind::BlockQuote {
                children: vec![
                    InlineText::plain("quoted "),
                    InlineText::styled("text", Marks::default().with(MarkKind::Italic)),
                ]
            })]
        );
    }

    #[test]
    fn test_code_block_wrapper_is_not_a_mark() {
        let blocks = Parser::parse("<pre><code>let x = 1;</code></pre>");
        assert_eq!(
            blocks,
            vec![Block::new(BlockKind::CodeBlock {
                children: vec![InlineText::plain("let x = 1;")]
            })]
        );
    }

    #[test]
    fn test_divider() {
        let blocks = Parser::parse("<p>a</p><hr><p>b</p>");
        assert_eq!(blocks[1], Block::divider());
    }

    #[test]
    fn test_plain_text_falls_back_to_paragraph() {
        let blocks = Parser::parse("just some text");
        assert_eq!(
            blocks,
            vec![Block::paragraph(vec![InlineText::plain("just some text")])]
        );
    }

    #[test]
    fn test_top_level_text_between_blocks_is_ignored() {
        let blocks = Parser::parse("<p>a</p>\nstray\n<p>b</p>");
        assert_eq!(blocks.len(), 2);
    }
}
