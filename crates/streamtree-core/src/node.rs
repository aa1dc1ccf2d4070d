//! The typed tree handed to renderers.
//!
//! Every node carries `raw`, the verbatim (or reconstructed) markdown it
//! came from, which renderers use for keys and diffing. Constructs that
//! have a terminator also carry `loading`: `true` while that terminator has
//! not been seen in the input parsed so far.

use crate::enums::Alignment;
use crate::token::ContainerAttrs;
use serde::Serialize;

/// A node in the parsed tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Node {
    // === Inline ===
    Text {
        content: String,
        raw: String,
    },
    InlineCode {
        code: String,
        raw: String,
        loading: bool,
    },
    MathInline {
        content: String,
        raw: String,
        loading: bool,
    },
    HtmlInline {
        tag: String,
        content: String,
        raw: String,
        loading: bool,
    },
    Link {
        href: String,
        title: Option<String>,
        text: String,
        children: Vec<Node>,
        raw: String,
        loading: bool,
    },
    Image {
        src: String,
        alt: String,
        title: Option<String>,
        raw: String,
        loading: bool,
    },
    Strong {
        children: Vec<Node>,
        raw: String,
        loading: bool,
    },
    Emphasis {
        children: Vec<Node>,
        raw: String,
        loading: bool,
    },
    Strikethrough {
        children: Vec<Node>,
        raw: String,
        loading: bool,
    },
    Highlight {
        children: Vec<Node>,
        raw: String,
        loading: bool,
    },
    Insert {
        children: Vec<Node>,
        raw: String,
        loading: bool,
    },
    Subscript {
        children: Vec<Node>,
        raw: String,
    },
    Superscript {
        children: Vec<Node>,
        raw: String,
    },
    HardBreak {
        raw: String,
    },
    FootnoteReference {
        id: String,
        raw: String,
    },
    FootnoteAnchor {
        id: String,
        raw: String,
    },

    // === Block ===
    Paragraph {
        children: Vec<Node>,
        raw: String,
    },
    Heading {
        level: u8,
        children: Vec<Node>,
        raw: String,
    },
    ThematicBreak {
        raw: String,
    },
    List {
        ordered: bool,
        start: Option<u64>,
        items: Vec<Node>,
        raw: String,
    },
    ListItem {
        checked: Option<bool>,
        children: Vec<Node>,
        raw: String,
    },
    Blockquote {
        children: Vec<Node>,
        raw: String,
    },
    Table {
        header: Vec<Node>,
        rows: Vec<Node>,
        raw: String,
        loading: bool,
    },
    TableRow {
        cells: Vec<Node>,
        raw: String,
    },
    TableCell {
        header: bool,
        align: Alignment,
        children: Vec<Node>,
        raw: String,
    },
    CodeBlock {
        language: String,
        code: String,
        raw: String,
        loading: bool,
        indented: bool,
        diff: bool,
        original_code: Option<String>,
        updated_code: Option<String>,
    },
    MathBlock {
        content: String,
        raw: String,
        loading: bool,
    },
    HtmlBlock {
        tag: String,
        content: String,
        raw: String,
        loading: bool,
    },
    Footnote {
        id: String,
        children: Vec<Node>,
        raw: String,
    },
    DefinitionList {
        items: Vec<Node>,
        raw: String,
    },
    DefinitionItem {
        term: Vec<Node>,
        definition: Vec<Node>,
        raw: String,
    },
    Admonition {
        kind: String,
        title: String,
        attrs: Option<ContainerAttrs>,
        children: Vec<Node>,
        raw: String,
        loading: bool,
    },
    Container {
        name: String,
        args: String,
        attrs: Option<ContainerAttrs>,
        children: Vec<Node>,
        raw: String,
        loading: bool,
    },
    CustomTag {
        tag: String,
        attrs: Vec<(String, String)>,
        content: String,
        children: Vec<Node>,
        raw: String,
        loading: bool,
    },
}

impl Node {
    /// Plain text node whose raw equals its content.
    pub fn text(content: impl Into<String>) -> Self {
        let content = content.into();
        Node::Text {
            raw: content.clone(),
            content,
        }
    }

    /// The node's type tag, as serialized.
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Text { .. } => "text",
            Node::InlineCode { .. } => "inline_code",
            Node::MathInline { .. } => "math_inline",
            Node::HtmlInline { .. } => "html_inline",
            Node::Link { .. } => "link",
            Node::Image { .. } => "image",
            Node::Strong { .. } => "strong",
            Node::Emphasis { .. } => "emphasis",
            Node::Strikethrough { .. } => "strikethrough",
            Node::Highlight { .. } => "highlight",
            Node::Insert { .. } => "insert",
            Node::Subscript { .. } => "subscript",
            Node::Superscript { .. } => "superscript",
            Node::HardBreak { .. } => "hard_break",
            Node::FootnoteReference { .. } => "footnote_reference",
            Node::FootnoteAnchor { .. } => "footnote_anchor",
            Node::Paragraph { .. } => "paragraph",
            Node::Heading { .. } => "heading",
            Node::ThematicBreak { .. } => "thematic_break",
            Node::List { .. } => "list",
            Node::ListItem { .. } => "list_item",
            Node::Blockquote { .. } => "blockquote",
            Node::Table { .. } => "table",
            Node::TableRow { .. } => "table_row",
            Node::TableCell { .. } => "table_cell",
            Node::CodeBlock { .. } => "code_block",
            Node::MathBlock { .. } => "math_block",
            Node::HtmlBlock { .. } => "html_block",
            Node::Footnote { .. } => "footnote",
            Node::DefinitionList { .. } => "definition_list",
            Node::DefinitionItem { .. } => "definition_item",
            Node::Admonition { .. } => "admonition",
            Node::Container { .. } => "container",
            Node::CustomTag { .. } => "custom_tag",
        }
    }

    /// Verbatim source of this node.
    pub fn raw(&self) -> &str {
        match self {
            Node::Text { raw, .. }
            | Node::InlineCode { raw, .. }
            | Node::MathInline { raw, .. }
            | Node::HtmlInline { raw, .. }
            | Node::Link { raw, .. }
            | Node::Image { raw, .. }
            | Node::Strong { raw, .. }
            | Node::Emphasis { raw, .. }
            | Node::Strikethrough { raw, .. }
            | Node::Highlight { raw, .. }
            | Node::Insert { raw, .. }
            | Node::Subscript { raw, .. }
            | Node::Superscript { raw, .. }
            | Node::HardBreak { raw }
            | Node::FootnoteReference { raw, .. }
            | Node::FootnoteAnchor { raw, .. }
            | Node::Paragraph { raw, .. }
            | Node::Heading { raw, .. }
            | Node::ThematicBreak { raw }
            | Node::List { raw, .. }
            | Node::ListItem { raw, .. }
            | Node::Blockquote { raw, .. }
            | Node::Table { raw, .. }
            | Node::TableRow { raw, .. }
            | Node::TableCell { raw, .. }
            | Node::CodeBlock { raw, .. }
            | Node::MathBlock { raw, .. }
            | Node::HtmlBlock { raw, .. }
            | Node::Footnote { raw, .. }
            | Node::DefinitionList { raw, .. }
            | Node::DefinitionItem { raw, .. }
            | Node::Admonition { raw, .. }
            | Node::Container { raw, .. }
            | Node::CustomTag { raw, .. } => raw.as_str(),
        }
    }

    /// The loading flag, for kinds that have one.
    pub fn loading(&self) -> Option<bool> {
        match self {
            Node::InlineCode { loading, .. }
            | Node::MathInline { loading, .. }
            | Node::HtmlInline { loading, .. }
            | Node::Link { loading, .. }
            | Node::Image { loading, .. }
            | Node::Strong { loading, .. }
            | Node::Emphasis { loading, .. }
            | Node::Strikethrough { loading, .. }
            | Node::Highlight { loading, .. }
            | Node::Insert { loading, .. }
            | Node::Table { loading, .. }
            | Node::CodeBlock { loading, .. }
            | Node::MathBlock { loading, .. }
            | Node::HtmlBlock { loading, .. }
            | Node::Admonition { loading, .. }
            | Node::Container { loading, .. }
            | Node::CustomTag { loading, .. } => Some(*loading),
            Node::Text { .. }
            | Node::Subscript { .. }
            | Node::Superscript { .. }
            | Node::HardBreak { .. }
            | Node::FootnoteReference { .. }
            | Node::FootnoteAnchor { .. }
            | Node::Paragraph { .. }
            | Node::Heading { .. }
            | Node::ThematicBreak { .. }
            | Node::List { .. }
            | Node::ListItem { .. }
            | Node::Blockquote { .. }
            | Node::TableRow { .. }
            | Node::TableCell { .. }
            | Node::Footnote { .. }
            | Node::DefinitionList { .. }
            | Node::DefinitionItem { .. } => None,
        }
    }

    /// Direct children, in document order.
    pub fn child_nodes(&self) -> Vec<&Node> {
        match self {
            Node::Link { children, .. }
            | Node::Strong { children, .. }
            | Node::Emphasis { children, .. }
            | Node::Strikethrough { children, .. }
            | Node::Highlight { children, .. }
            | Node::Insert { children, .. }
            | Node::Subscript { children, .. }
            | Node::Superscript { children, .. }
            | Node::Paragraph { children, .. }
            | Node::Heading { children, .. }
            | Node::ListItem { children, .. }
            | Node::Blockquote { children, .. }
            | Node::TableCell { children, .. }
            | Node::Footnote { children, .. }
            | Node::Admonition { children, .. }
            | Node::Container { children, .. }
            | Node::CustomTag { children, .. } => children.iter().collect(),
            Node::List { items, .. } | Node::DefinitionList { items, .. } => {
                items.iter().collect()
            }
            Node::Table { header, rows, .. } => header.iter().chain(rows.iter()).collect(),
            Node::TableRow { cells, .. } => cells.iter().collect(),
            Node::DefinitionItem {
                term, definition, ..
            } => term.iter().chain(definition.iter()).collect(),
            Node::Text { .. }
            | Node::InlineCode { .. }
            | Node::MathInline { .. }
            | Node::HtmlInline { .. }
            | Node::Image { .. }
            | Node::HardBreak { .. }
            | Node::FootnoteReference { .. }
            | Node::FootnoteAnchor { .. }
            | Node::ThematicBreak { .. }
            | Node::CodeBlock { .. }
            | Node::MathBlock { .. }
            | Node::HtmlBlock { .. } => Vec::new(),
        }
    }

    /// Visit this node and all descendants depth-first.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Node)) {
        visit(self);
        for child in self.child_nodes() {
            child.walk(visit);
        }
    }

    /// Concatenated content of all descendant text nodes.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        self.walk(&mut |node| {
            if let Node::Text { content, .. } = node {
                out.push_str(content);
            }
        });
        out
    }
}

/// Visit every node of a forest depth-first.
pub fn walk_all<'a>(nodes: &'a [Node], visit: &mut impl FnMut(&'a Node)) {
    for node in nodes {
        node.walk(visit);
    }
}
