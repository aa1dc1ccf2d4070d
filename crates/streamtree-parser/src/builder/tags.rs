//! HTML blocks, inline HTML and custom tags.
//!
//! Tags listed in `escape_html_tags` are shown as literal text. Tags listed
//! in `custom_html_tags` become `custom_tag` nodes whose inner content is
//! parsed as markdown. A block-level custom tag may span several blocks
//! (the tokenizer ends an HTML block at the first blank line), so its
//! builder keeps consuming siblings until the closing tag shows up.

use super::{inline_tokens, NodeBuilder, TokenCursor};
use crate::fixups::{self, PassContext};
use crate::html::{parse_tag, HtmlTag, TagForm};
use regex::Regex;
use streamtree_core::{raw_of, Node, Token, TokenKind};

impl NodeBuilder<'_> {
    pub(crate) fn html_inline(&self, token: &Token) -> Node {
        let parsed = parse_tag(&token.content);
        let tag = if token.tag.is_empty() {
            parsed.as_ref().map(|t| t.name.clone()).unwrap_or_default()
        } else {
            token.tag.clone()
        };

        if !tag.is_empty() && self.options.is_escaped_tag(&tag) {
            return Node::text(token.content.clone());
        }
        if !tag.is_empty() && self.options.is_custom_tag(&tag) {
            return Node::CustomTag {
                attrs: parsed.map(|t| t.attrs).unwrap_or_default(),
                content: raw_of(&token.children),
                children: self.inlines(&token.children),
                raw: token.content.clone(),
                loading: token.meta.loading,
                tag,
            };
        }
        Node::HtmlInline {
            tag,
            content: token.content.clone(),
            raw: token.content.clone(),
            loading: token.meta.loading,
        }
    }

    pub(crate) fn html_block(&self, token: &Token, cursor: &mut TokenCursor<'_>) -> Node {
        let content = token.content.trim_end_matches('\n');
        let Some(tag) = parse_tag(content) else {
            return Node::HtmlBlock {
                tag: String::new(),
                content: content.to_string(),
                raw: content.to_string(),
                loading: false,
            };
        };

        if self.options.is_escaped_tag(&tag.name) {
            return Node::Paragraph {
                children: vec![Node::text(content)],
                raw: content.to_string(),
            };
        }
        if self.options.is_custom_tag(&tag.name) && tag.form != TagForm::Close {
            return self.custom_block(content, tag, cursor);
        }

        let closed = self
            .matchers
            .closing_tag(&tag.name)
            .map_or(true, |re| re.is_match(&content[tag.len..]));
        Node::HtmlBlock {
            loading: tag.is_open()
                && !closed
                && !self.settled
                && cursor.at_tail()
                && !self.options.is_final,
            tag: tag.name,
            content: content.to_string(),
            raw: content.to_string(),
        }
    }

    fn custom_block(&self, content: &str, tag: HtmlTag, cursor: &mut TokenCursor<'_>) -> Node {
        let after = &content[tag.len..];
        let closing = self.matchers.closing_tag(&tag.name);
        let HtmlTag { name, attrs, form, .. } = tag;

        if form == TagForm::SelfClosing {
            return Node::CustomTag {
                tag: name,
                attrs,
                content: String::new(),
                children: Vec::new(),
                raw: content.to_string(),
                loading: false,
            };
        }

        if let Some(m) = closing.as_ref().and_then(|re| re.find(after)) {
            let inner = &after[..m.start()];
            return Node::CustomTag {
                tag: name,
                attrs,
                content: inner.trim_matches('\n').to_string(),
                children: self.reparse(inner, true),
                raw: content.to_string(),
                loading: false,
            };
        }

        let mut body = SpanningBody::new(content, after);
        body.children = self.reparse(after, self.settled || !cursor.at_tail());
        if let Some(closing) = &closing {
            self.consume_until_close(closing, cursor, &mut body);
        }

        Node::CustomTag {
            tag: name,
            attrs,
            content: body.inner.trim_matches('\n').to_string(),
            children: body.children,
            raw: body.raw,
            loading: !body.closed && !self.settled && !self.options.is_final,
        }
    }

    /// Fold sibling blocks into a custom tag until one carries its closing
    /// tag, either as an HTML block or as inline HTML ending a paragraph.
    fn consume_until_close(&self, closing: &Regex, cursor: &mut TokenCursor<'_>, body: &mut SpanningBody) {
        while let Some(next) = cursor.advance() {
            match next.kind {
                TokenKind::HtmlBlock => {
                    if let Some(m) = closing.find(&next.content) {
                        let before = &next.content[..m.start()];
                        body.children.extend(self.reparse(before, true));
                        body.push(before, next.content.trim_end_matches('\n'));
                        body.closed = true;
                        return;
                    }
                }
                TokenKind::ParagraphOpen => {
                    let (inner, _) = cursor.until(next.kind);
                    let run = inline_tokens(inner);
                    if let Some(at) = run
                        .iter()
                        .position(|t| t.is(TokenKind::HtmlInline) && closing.is_match(&t.content))
                    {
                        let mut before = &run[..at];
                        while before.last().map_or(false, |t| t.is(TokenKind::Softbreak)) {
                            before = &before[..before.len() - 1];
                        }
                        let text = raw_of(before);
                        if !before.is_empty() {
                            body.children.push(Node::Paragraph {
                                children: self.inlines(before),
                                raw: text.clone(),
                            });
                        }
                        body.push(&text, &raw_of(run));
                        body.closed = true;
                        return;
                    }
                    let node = self.paragraph(next, inner);
                    body.push(node.raw(), node.raw());
                    body.children.push(node);
                    continue;
                }
                _ => {}
            }
            if let Some(node) = self.block(next, cursor) {
                body.push(node.raw(), node.raw());
                body.children.push(node);
            }
        }
    }

    /// Parse a fragment of tag content as its own markdown document.
    fn reparse(&self, text: &str, complete: bool) -> Vec<Node> {
        let text = text.trim_matches('\n');
        if text.trim().is_empty() {
            return Vec::new();
        }
        let options = if complete && !self.options.is_final {
            self.options.clone().with_final(true)
        } else {
            self.options.clone()
        };
        let tokens = self.tokenizer.tokenize(text, &options);
        let ctx = PassContext::new(&options, self.tokenizer, self.matchers);
        let tokens = fixups::repair(tokens, &ctx);
        NodeBuilder::new(&options, self.tokenizer, self.matchers).blocks(&tokens)
    }
}

/// A custom tag being assembled from several blocks.
struct SpanningBody {
    inner: String,
    raw: String,
    children: Vec<Node>,
    closed: bool,
}

impl SpanningBody {
    fn new(raw: &str, inner: &str) -> Self {
        Self {
            inner: inner.to_string(),
            raw: raw.to_string(),
            children: Vec::new(),
            closed: false,
        }
    }

    fn push(&mut self, inner: &str, raw: &str) {
        self.inner.push_str("\n\n");
        self.inner.push_str(inner);
        self.raw.push_str("\n\n");
        self.raw.push_str(raw);
    }
}
