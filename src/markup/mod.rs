//! Abstract markup node tree.
//!
//! Markup strings are parsed with the HTML5 tree construction algorithm (the
//! same one a browser applies to `innerHTML`) and then lowered into a small,
//! owned node tree that the document parser walks. Nothing downstream depends
//! on the DOM implementation used here.

use html5ever::tendril::TendrilSink;
use html5ever::{ParseOpts, QualName, local_name, ns};
use markup5ever_rcdom::{Handle, NodeData, RcDom};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkupNode {
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
        children: Vec<MarkupNode>,
    },
    Text(String),
}

impl MarkupNode {
    pub fn element(tag: &str, children: Vec<MarkupNode>) -> Self {
        MarkupNode::Element {
            tag: tag.to_ascii_lowercase(),
            attrs: Vec::new(),
            children,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        MarkupNode::Text(text.into())
    }

    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        if let MarkupNode::Element { attrs, .. } = &mut self {
            attrs.push((name.to_ascii_lowercase(), value.to_string()));
        }
        self
    }

    pub fn tag(&self) -> Option<&str> {
        match self {
            MarkupNode::Element { tag, .. } => Some(tag),
            MarkupNode::Text(_) => None,
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        match self {
            MarkupNode::Element { attrs, .. } => attrs
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.as_str()),
            MarkupNode::Text(_) => None,
        }
    }

    pub fn children(&self) -> &[MarkupNode] {
        match self {
            MarkupNode::Element { children, .. } => children,
            MarkupNode::Text(_) => &[],
        }
    }

    pub fn is_element(&self) -> bool {
        matches!(self, MarkupNode::Element { .. })
    }

    /// Concatenated text of this node and all of its descendants.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            MarkupNode::Text(text) => out.push_str(text),
            MarkupNode::Element { children, .. } => {
                for child in children {
                    child.collect_text(out);
                }
            }
        }
    }

    /// Descendants (excluding `self`) with the given tag, in document order.
    pub fn descendants_by_tag<'a>(&'a self, tag: &str) -> Vec<&'a MarkupNode> {
        let mut found = Vec::new();
        for child in self.children() {
            child.collect_by_tag(tag, &mut found);
        }
        found
    }

    fn collect_by_tag<'a>(&'a self, tag: &str, found: &mut Vec<&'a MarkupNode>) {
        if self.tag() == Some(tag) {
            found.push(self);
        }
        for child in self.children() {
            child.collect_by_tag(tag, found);
        }
    }
}

/// Parses a markup string as the children of a `<div>`, the way assigning
/// `innerHTML` does.
///
/// Malformed markup is repaired the way a browser would repair it. Elements
/// that would normally move to `<head>` stay in place. Comments, doctypes
/// and processing instructions are dropped.
pub fn parse_fragment(html: &str) -> Vec<MarkupNode> {
    let context = QualName::new(None, ns!(html), local_name!("div"));
    let dom = html5ever::parse_fragment(
        RcDom::default(),
        ParseOpts::default(),
        context,
        Vec::new(),
        false,
    )
    .one(html);
    // Fragment parsing builds everything under a synthetic <html> root.
    let root = dom.document.children.borrow().first().cloned();
    root.map(|root| lower_children(&root)).unwrap_or_default()
}

/// Text content of a markup string, with all tags removed.
pub fn extract_plain_text(html: &str) -> String {
    parse_fragment(html)
        .iter()
        .map(MarkupNode::text_content)
        .collect()
}

fn lower_children(handle: &Handle) -> Vec<MarkupNode> {
    handle.children.borrow().iter().filter_map(lower).collect()
}

fn lower(handle: &Handle) -> Option<MarkupNode> {
    match &handle.data {
        NodeData::Text { contents } => {
            let text: &str = &contents.borrow();
            Some(MarkupNode::Text(text.to_string()))
        }
        NodeData::Element { name, attrs, .. } => {
            let attrs = attrs
                .borrow()
                .iter()
                .map(|attr| {
                    let value: &str = &attr.value;
                    (attr.name.local.to_string(), value.to_string())
                })
                .collect();
            Some(MarkupNode::Element {
                tag: name.local.to_string().to_ascii_lowercase(),
                attrs,
                children: lower_children(handle),
            })
        }
        _ => None,
    }
}
