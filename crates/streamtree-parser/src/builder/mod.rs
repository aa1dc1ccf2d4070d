//! Node builder.
//!
//! Walks the repaired token list once and produces the typed tree:
//! - container tokens consume everything up to their matching close
//! - leaf tokens map to a single node
//! - inline runs are built by [`inline`]
//!
//! Every node gets a `raw` string: the source slice recorded on the open
//! token where the tokenizer had one, otherwise a reconstruction from the
//! tokens. Loading flags come from the tokens (set by the tokenizer and the
//! fixup passes) and are never set once the caller marks input final.

mod code;
pub mod cursor;
mod inline;
mod list;
mod table;
mod tags;

pub use cursor::TokenCursor;

use crate::entities::decode_html_entities;
use crate::math::normalize_math;
use crate::matcher::MatcherCache;
use crate::tokenizer::Tokenizer;
use streamtree_config::ParseOptions;
use streamtree_core::{raw_of, Nesting, Node, Token, TokenKind};

/// Builds nodes from tokens under one set of parse options.
#[derive(Debug, Clone, Copy)]
pub struct NodeBuilder<'a> {
    pub(crate) options: &'a ParseOptions,
    pub(crate) tokenizer: &'a Tokenizer,
    pub(crate) matchers: &'a MatcherCache,
    /// Building inside a closed container, where nothing can still grow.
    pub(crate) settled: bool,
}

impl<'a> NodeBuilder<'a> {
    pub fn new(options: &'a ParseOptions, tokenizer: &'a Tokenizer, matchers: &'a MatcherCache) -> Self {
        Self {
            options,
            tokenizer,
            matchers,
            settled: false,
        }
    }

    /// Build the block nodes of a whole document.
    pub fn build(&self, tokens: &[Token]) -> Vec<Node> {
        let mut nodes = self.blocks(tokens);
        list::drop_marker_paragraph(&mut nodes, self.options.is_final);
        nodes
    }

    fn is_final(&self) -> bool {
        self.options.is_final
    }

    /// Build a sequence of block nodes.
    pub(crate) fn blocks(&self, tokens: &[Token]) -> Vec<Node> {
        let mut cursor = TokenCursor::new(tokens);
        let mut nodes = Vec::new();
        while let Some(token) = cursor.advance() {
            if let Some(node) = self.block(token, &mut cursor) {
                nodes.push(node);
            }
        }
        nodes
    }

    fn block(&self, token: &Token, cursor: &mut TokenCursor<'_>) -> Option<Node> {
        use TokenKind::*;
        match token.kind {
            ParagraphOpen => {
                let (inner, _) = cursor.until(token.kind);
                Some(self.paragraph(token, inner))
            }
            HeadingOpen => {
                let (inner, _) = cursor.until(token.kind);
                let children = self.inline_children(inner);
                let level = token
                    .tag
                    .trim_start_matches('h')
                    .parse::<u8>()
                    .unwrap_or(1)
                    .clamp(1, 6);
                Some(Node::Heading {
                    level,
                    raw: raw_or(token, || format!("{} {}", token.markup, raw_of_inline(inner))),
                    children,
                })
            }
            BlockquoteOpen => {
                let (inner, _) = cursor.until(token.kind);
                Some(self.blockquote(token, inner))
            }
            BulletListOpen | OrderedListOpen => {
                let (inner, _) = cursor.until(token.kind);
                Some(self.list(token, inner))
            }
            ListItemOpen => {
                let (inner, _) = cursor.until(token.kind);
                Some(self.list_item(token, inner))
            }
            TableOpen => {
                let (inner, _) = cursor.until(token.kind);
                Some(self.table(token, inner))
            }
            FootnoteOpen => {
                let (inner, _) = cursor.until(token.kind);
                Some(self.footnote(token, inner))
            }
            DlOpen => {
                let (inner, _) = cursor.until(token.kind);
                Some(self.definition_list(token, inner))
            }
            AdmonitionOpen | ContainerOpen => {
                let (inner, closed) = cursor.until(token.kind);
                Some(self.container(token, inner, closed))
            }
            Inline => Some(Node::Paragraph {
                children: self.inlines(&token.children),
                raw: raw_of(&token.children),
            }),
            Fence => Some(self.fence(token)),
            CodeBlock => Some(self.indented_code(token)),
            HtmlBlock => Some(self.html_block(token, cursor)),
            MathBlock => Some(Node::MathBlock {
                content: normalize_math(&token.content, &self.options.math, self.matchers),
                raw: raw_or_info(token),
                loading: !self.is_final() && token.meta.loading,
            }),
            Hr => Some(Node::ThematicBreak {
                raw: token.markup.clone(),
            }),
            // Table parts and definition parts outside their parent.
            TheadOpen | TbodyOpen | TrOpen | ThOpen | TdOpen | DtOpen | DdOpen => {
                cursor.until(token.kind);
                None
            }
            ParagraphClose | HeadingClose | BlockquoteClose | BulletListClose
            | OrderedListClose | ListItemClose | TableClose | TheadClose | TbodyClose
            | TrClose | ThClose | TdClose | FootnoteClose | DlClose | DtClose | DdClose
            | AdmonitionClose | ContainerClose => None,
            Text | Softbreak | Hardbreak | CodeInline | HtmlInline | MathInline | LinkOpen
            | LinkClose | Image | StrongOpen | StrongClose | EmOpen | EmClose | SOpen | SClose
            | MarkOpen | MarkClose | InsOpen | InsClose | SubOpen | SubClose | SupOpen
            | SupClose | FootnoteRef | FootnoteAnchor => {
                log::trace!("skipping stray inline token {:?} at block level", token.kind);
                None
            }
        }
    }

    fn paragraph(&self, open: &Token, inner: &[Token]) -> Node {
        let raw = raw_or(open, || raw_of_inline(inner));
        let children = inline_tokens(inner);

        if let Some(math) = lone_display_math(children) {
            return Node::MathBlock {
                content: normalize_math(math.content.trim(), &self.options.math, self.matchers),
                raw,
                loading: math.meta.loading && !self.is_final(),
            };
        }
        Node::Paragraph {
            children: self.inlines(children),
            raw,
        }
    }

    fn blockquote(&self, open: &Token, inner: &[Token]) -> Node {
        let children = self.blocks(inner);
        let raw = raw_or(open, || raw_of_blocks(inner));
        match open.attr("alert") {
            Some(kind) => Node::Admonition {
                kind: kind.to_lowercase(),
                title: capitalize(kind),
                attrs: None,
                children,
                raw,
                loading: false,
            },
            None => Node::Blockquote { children, raw },
        }
    }

    fn footnote(&self, open: &Token, inner: &[Token]) -> Node {
        let id = open.attr("id").unwrap_or_default().to_string();
        let mut children = self.blocks(inner);
        let anchor = Node::FootnoteAnchor {
            id: id.clone(),
            raw: String::new(),
        };
        if let Some(Node::Paragraph { children: last, .. }) = children.last_mut() {
            last.push(anchor);
        } else {
            children.push(anchor);
        }
        Node::Footnote {
            id,
            children,
            raw: open.content.clone(),
        }
    }

    fn definition_list(&self, open: &Token, inner: &[Token]) -> Node {
        let mut cursor = TokenCursor::new(inner);
        let mut items: Vec<Node> = Vec::new();
        while let Some(token) = cursor.advance() {
            match token.kind {
                TokenKind::DtOpen => {
                    let (term, _) = cursor.until(token.kind);
                    items.push(Node::DefinitionItem {
                        term: self.inline_children(term),
                        definition: Vec::new(),
                        raw: raw_or(token, || raw_of_inline(term)),
                    });
                }
                TokenKind::DdOpen => {
                    let (body, _) = cursor.until(token.kind);
                    let blocks = self.blocks(body);
                    let dd_raw = raw_or(token, || raw_of_blocks(body));
                    match items.last_mut() {
                        Some(Node::DefinitionItem {
                            definition, raw, ..
                        }) => {
                            definition.extend(blocks);
                            raw.push('\n');
                            raw.push_str(&dd_raw);
                        }
                        _ => items.push(Node::DefinitionItem {
                            term: Vec::new(),
                            definition: blocks,
                            raw: dd_raw,
                        }),
                    }
                }
                _ => {}
            }
        }
        Node::DefinitionList {
            items,
            raw: open.content.clone(),
        }
    }

    fn container(&self, open: &Token, inner: &[Token], closed: bool) -> Node {
        let inner_builder = Self {
            settled: self.settled || open.meta.closed == Some(true),
            ..*self
        };
        let children = inner_builder.blocks(inner);
        let loading = !self.is_final() && (open.meta.loading || !closed);
        let raw = open.content.clone();
        let attrs = open.meta.attrs.clone();
        let args = open.meta.args.clone().unwrap_or_default();

        if open.is(TokenKind::AdmonitionOpen) {
            let title = if args.trim().is_empty() {
                capitalize(&open.info)
            } else {
                decode_html_entities(args.trim())
            };
            Node::Admonition {
                kind: open.info.clone(),
                title,
                attrs,
                children,
                raw,
                loading,
            }
        } else {
            Node::Container {
                name: open.info.clone(),
                args,
                attrs,
                children,
                raw,
                loading,
            }
        }
    }

    /// Inline nodes of the single inline run inside a leaf block.
    fn inline_children(&self, inner: &[Token]) -> Vec<Node> {
        self.inlines(inline_tokens(inner))
    }
}

/// Children of the first inline token in `inner`.
fn inline_tokens(inner: &[Token]) -> &[Token] {
    inner
        .iter()
        .find(|t| t.is(TokenKind::Inline))
        .map_or(&[], |t| t.children.as_slice())
}

fn raw_of_inline(inner: &[Token]) -> String {
    raw_of(inline_tokens(inner))
}

/// Reconstructed source of a block token run.
fn raw_of_blocks(tokens: &[Token]) -> String {
    tokens
        .iter()
        .filter(|t| t.kind.nesting() == Nesting::Atomic && !t.kind.is_inline())
        .map(Token::raw_text)
        .collect::<Vec<_>>()
        .join("\n")
}

/// The open token's recorded source, or a reconstruction.
fn raw_or(token: &Token, fallback: impl FnOnce() -> String) -> String {
    if token.content.is_empty() {
        fallback()
    } else {
        token.content.clone()
    }
}

fn raw_or_info(token: &Token) -> String {
    if token.info.is_empty() {
        format!("{}\n{}\n{}", token.markup, token.content, token.markup)
    } else {
        token.info.clone()
    }
}

/// A paragraph holding nothing but one `$$…$$` span is a math block.
fn lone_display_math(children: &[Token]) -> Option<&Token> {
    let mut meaningful = children.iter().filter(|t| match t.kind {
        TokenKind::Text => !t.content.trim().is_empty(),
        TokenKind::Softbreak => false,
        _ => true,
    });
    let first = meaningful.next()?;
    if meaningful.next().is_some() {
        return None;
    }
    (first.is(TokenKind::MathInline) && first.markup == "$$").then_some(first)
}

pub(crate) fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{finished, kinds, streaming};
    use super::*;

    #[test]
    fn test_paragraph_and_heading() {
        let nodes = finished("# Title\n\nSome *text*.");
        assert_eq!(kinds(&nodes), vec!["heading", "paragraph"]);
        match &nodes[0] {
            Node::Heading { level, raw, .. } => {
                assert_eq!(*level, 1);
                assert_eq!(raw, "# Title");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(nodes[1].raw(), "Some *text*.");
    }

    #[test]
    fn test_softbreak_becomes_newline_text() {
        let nodes = finished("one\ntwo");
        match &nodes[0] {
            Node::Paragraph { children, .. } => {
                assert_eq!(children.len(), 1);
                assert_eq!(children[0], Node::text("one\ntwo"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_blockquote_and_rule() {
        let nodes = finished("> quoted\n\n---");
        assert_eq!(kinds(&nodes), vec!["blockquote", "thematic_break"]);
        assert_eq!(nodes[0].plain_text(), "quoted");
    }

    #[test]
    fn test_alert_becomes_admonition() {
        let nodes = finished("> [!WARNING]\n> Careful");
        match &nodes[0] {
            Node::Admonition { kind, title, .. } => {
                assert_eq!(kind, "warning");
                assert_eq!(title, "Warning");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_container_loading_until_closed() {
        let nodes = streaming("::: warning\nbody");
        assert_eq!(nodes.len(), 1);
        match &nodes[0] {
            Node::Admonition {
                loading, children, ..
            } => {
                assert!(*loading);
                assert_eq!(children[0].plain_text(), "body");
            }
            other => panic!("unexpected {:?}", other),
        }

        let nodes = streaming("::: warning\nbody\n:::");
        assert_eq!(nodes[0].loading(), Some(false));
    }

    #[test]
    fn test_admonition_title_from_args() {
        let nodes = finished("::: tip Fish &amp; chips\nbody\n:::");
        match &nodes[0] {
            Node::Admonition { title, kind, .. } => {
                assert_eq!(kind, "tip");
                assert_eq!(title, "Fish & chips");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_generic_container() {
        let nodes = finished("::: steps {\"count\": 2}\n1. a\n:::");
        match &nodes[0] {
            Node::Container {
                name,
                attrs,
                children,
                ..
            } => {
                assert_eq!(name, "steps");
                assert!(attrs.is_some());
                assert_eq!(kinds(children), vec!["list"]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_footnote_anchor_appended() {
        let nodes = finished("Text[^1]\n\n[^1]: The note.");
        let footnote = nodes.iter().find(|n| n.kind() == "footnote").unwrap();
        match footnote {
            Node::Footnote { id, children, .. } => {
                assert_eq!(id, "1");
                match &children[0] {
                    Node::Paragraph { children, .. } => {
                        assert_eq!(children.last().map(Node::kind), Some("footnote_anchor"));
                    }
                    other => panic!("unexpected {:?}", other),
                }
            }
            other => panic!("unexpected {:?}", other),
        }
        let reference = nodes[0].child_nodes()[1];
        assert_eq!(reference.kind(), "footnote_reference");
    }

    #[test]
    fn test_definition_list() {
        let nodes = finished("Term\n: Definition one\n: Definition two");
        match &nodes[0] {
            Node::DefinitionList { items, .. } => {
                assert_eq!(items.len(), 1);
                match &items[0] {
                    Node::DefinitionItem {
                        term, definition, ..
                    } => {
                        assert_eq!(term[0], Node::text("Term"));
                        assert_eq!(definition.len(), 2);
                    }
                    other => panic!("unexpected {:?}", other),
                }
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_math_block_loading() {
        let nodes = streaming("$$\nx^2");
        match &nodes[0] {
            Node::MathBlock { content, loading, .. } => {
                assert_eq!(content, "x^2");
                assert!(*loading);
            }
            other => panic!("unexpected {:?}", other),
        }
        let nodes = finished("$$\nx^2");
        assert_eq!(nodes[0].loading(), Some(false));
    }

    #[test]
    fn test_inline_display_math_paragraph_is_block() {
        let nodes = finished("$$x + y$$");
        assert_eq!(kinds(&nodes), vec!["math_block"]);
    }

    #[test]
    fn test_indented_prose_and_code() {
        let nodes = finished("    This is just indented text");
        assert_eq!(kinds(&nodes), vec!["paragraph"]);
        assert_eq!(nodes[0].plain_text(), "This is just indented text");

        let nodes = finished("    const x = 1");
        assert_eq!(kinds(&nodes), vec!["code_block"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(finished("").is_empty());
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("WARNING"), "Warning");
        assert_eq!(capitalize("tip"), "Tip");
        assert_eq!(capitalize(""), "");
    }
}
