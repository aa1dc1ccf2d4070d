//! Inline runs to inline nodes.

use super::{NodeBuilder, TokenCursor};
use crate::math::normalize_math;
use streamtree_core::{raw_of, Node, Token, TokenKind};

impl NodeBuilder<'_> {
    /// Build the nodes of one inline run. Adjacent text (including soft
    /// breaks, which become `"\n"`) is merged into a single text node.
    pub(crate) fn inlines(&self, tokens: &[Token]) -> Vec<Node> {
        let mut cursor = TokenCursor::new(tokens);
        let mut nodes: Vec<Node> = Vec::new();
        while let Some(token) = cursor.advance() {
            match self.inline(token, &mut cursor) {
                Some(Node::Text { content, raw }) => push_text(&mut nodes, &content, &raw),
                Some(node) => nodes.push(node),
                None => {}
            }
        }
        nodes
    }

    fn inline(&self, token: &Token, cursor: &mut TokenCursor<'_>) -> Option<Node> {
        use TokenKind::*;
        let node = match token.kind {
            Text => Node::text(token.content.clone()),
            Softbreak => Node::text("\n"),
            Hardbreak => Node::HardBreak {
                raw: token.raw_text(),
            },
            CodeInline => Node::InlineCode {
                code: token.content.clone(),
                raw: token.raw_text(),
                loading: token.meta.loading,
            },
            MathInline => Node::MathInline {
                content: normalize_math(&token.content, &self.options.math, self.matchers),
                raw: token.raw_text(),
                loading: token.meta.loading,
            },
            HtmlInline => self.html_inline(token),
            Image => Node::Image {
                src: token.attr("src").unwrap_or_default().to_string(),
                alt: token.content.clone(),
                title: token.attr("title").map(str::to_string),
                raw: token.raw_text(),
                loading: token.meta.loading,
            },
            LinkOpen => {
                let (inner, closed) = cursor.until(token.kind);
                let children = self.inlines(inner);
                let text = children.iter().map(Node::plain_text).collect::<String>();
                let close = closer(cursor, closed);
                Node::Link {
                    href: token.attr("href").unwrap_or_default().to_string(),
                    title: token.attr("title").map(str::to_string),
                    text,
                    raw: format!("[{}{}", raw_of(inner), close.map_or("", |t| t.markup.as_str())),
                    children,
                    loading: token.meta.loading || (!closed && !self.options.is_final),
                }
            }
            StrongOpen | EmOpen | SOpen | MarkOpen | InsOpen | SubOpen | SupOpen => {
                let (inner, closed) = cursor.until(token.kind);
                let children = self.inlines(inner);
                let mut raw = format!("{}{}", token.markup, raw_of(inner));
                if closed && !token.meta.loading {
                    raw.push_str(&token.markup);
                }
                let loading = token.meta.loading || (!closed && !self.options.is_final);
                span_node(token.kind, children, raw, loading)?
            }
            FootnoteRef => Node::FootnoteReference {
                id: token.content.clone(),
                raw: token.raw_text(),
            },
            FootnoteAnchor => Node::FootnoteAnchor {
                id: token.content.clone(),
                raw: String::new(),
            },
            LinkClose | StrongClose | EmClose | SClose | MarkClose | InsClose | SubClose
            | SupClose => return None,
            ParagraphOpen | ParagraphClose | HeadingOpen | HeadingClose | BlockquoteOpen
            | BlockquoteClose | BulletListOpen | BulletListClose | OrderedListOpen
            | OrderedListClose | ListItemOpen | ListItemClose | TableOpen | TableClose
            | TheadOpen | TheadClose | TbodyOpen | TbodyClose | TrOpen | TrClose | ThOpen
            | ThClose | TdOpen | TdClose | FootnoteOpen | FootnoteClose | DlOpen | DlClose
            | DtOpen | DtClose | DdOpen | DdClose | AdmonitionOpen | AdmonitionClose
            | ContainerOpen | ContainerClose | Inline | Fence | CodeBlock | HtmlBlock
            | MathBlock | Hr => {
                log::trace!("skipping block token {:?} inside inline run", token.kind);
                return None;
            }
        };
        Some(node)
    }
}

/// The close token `until` just consumed, if it found one.
fn closer<'t>(cursor: &TokenCursor<'t>, closed: bool) -> Option<&'t Token> {
    if !closed {
        return None;
    }
    cursor.last()
}

fn span_node(open: TokenKind, children: Vec<Node>, raw: String, loading: bool) -> Option<Node> {
    let node = match open {
        TokenKind::StrongOpen => Node::Strong {
            children,
            raw,
            loading,
        },
        TokenKind::EmOpen => Node::Emphasis {
            children,
            raw,
            loading,
        },
        TokenKind::SOpen => Node::Strikethrough {
            children,
            raw,
            loading,
        },
        TokenKind::MarkOpen => Node::Highlight {
            children,
            raw,
            loading,
        },
        TokenKind::InsOpen => Node::Insert {
            children,
            raw,
            loading,
        },
        TokenKind::SubOpen => Node::Subscript { children, raw },
        TokenKind::SupOpen => Node::Superscript { children, raw },
        _ => return None,
    };
    Some(node)
}

fn push_text(nodes: &mut Vec<Node>, content: &str, raw: &str) {
    if let Some(Node::Text {
        content: last,
        raw: last_raw,
    }) = nodes.last_mut()
    {
        last.push_str(content);
        last_raw.push_str(raw);
        return;
    }
    nodes.push(Node::Text {
        content: content.to_string(),
        raw: raw.to_string(),
    });
}

#[cfg(test)]
mod tests {
    use super::super::testing::{finished, streaming};
    use streamtree_core::Node;

    fn inline_of(nodes: &[Node]) -> Vec<Node> {
        match &nodes[0] {
            Node::Paragraph { children, .. } => children.clone(),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_emphasis_nodes() {
        let children = inline_of(&finished("a **b** *c* ~~d~~ `e`"));
        let kinds: Vec<_> = children.iter().map(Node::kind).collect();
        assert_eq!(
            kinds,
            vec![
                "text",
                "strong",
                "text",
                "emphasis",
                "text",
                "strikethrough",
                "text",
                "inline_code"
            ]
        );
        assert_eq!(children[1].raw(), "**b**");
        assert_eq!(children[1].loading(), Some(false));
    }

    #[test]
    fn test_guessed_strong_raw_has_no_closer() {
        let children = inline_of(&streaming("say **bold"));
        match &children[1] {
            Node::Strong { raw, loading, .. } => {
                assert_eq!(raw, "**bold");
                assert!(*loading);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_link_node() {
        let children = inline_of(&finished("see [docs](http://x.io \"Docs\")"));
        match &children[1] {
            Node::Link {
                href,
                title,
                text,
                raw,
                loading,
                ..
            } => {
                assert_eq!(href, "http://x.io");
                assert_eq!(title.as_deref(), Some("Docs"));
                assert_eq!(text, "docs");
                assert_eq!(raw, "[docs](http://x.io \"Docs\")");
                assert!(!*loading);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_partial_link_loading() {
        let children = inline_of(&streaming("see [docs](http://exa"));
        match &children[1] {
            Node::Link {
                href, loading, raw, ..
            } => {
                assert_eq!(href, "http://exa");
                assert!(*loading);
                assert_eq!(raw, "[docs](http://exa");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_image_node() {
        let children = inline_of(&finished("![alt text](a.png)"));
        match &children[0] {
            Node::Image { src, alt, .. } => {
                assert_eq!(src, "a.png");
                assert_eq!(alt, "alt text");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_inline_math_normalised() {
        let children = inline_of(&finished("area $frac{1}{2}$"));
        match &children[1] {
            Node::MathInline { content, .. } => assert_eq!(content, "\\frac{1}{2}"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_hard_break() {
        let children = inline_of(&finished("a  \nb"));
        assert_eq!(children[1].kind(), "hard_break");
    }

    #[test]
    fn test_highlight_node() {
        let children = inline_of(&finished("a ==b=="));
        assert_eq!(children[1].kind(), "highlight");
    }
}
