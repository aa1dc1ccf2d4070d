//! Inline HTML repair.
//!
//! The tokenizer emits each inline tag as its own `html_inline` token and
//! leaves a half-typed tag (`<span cla`) as text. This pass hides the
//! half-typed tag at the stream tail and folds an opening tag, its content
//! and its closing tag into a single `html_inline` token whose `children`
//! hold the inner run.

use super::PassContext;
use crate::html::parse_tag;
use regex::Regex;
use std::sync::LazyLock;
use streamtree_core::{raw_of, Token, TokenKind};

static PARTIAL_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^<(/?([A-Za-z][\w-]*(\s[^<>]*)?)?)$").unwrap());

pub fn apply(children: Vec<Token>, ctx: &PassContext<'_>) -> Vec<Token> {
    let mut children: Vec<Token> = children
        .into_iter()
        .filter(|t| !t.is(TokenKind::HtmlInline) || t.content.contains('>'))
        .collect();

    if ctx.guessing() {
        truncate_partial_tag(&mut children);
    }
    if !children.iter().any(|t| t.is(TokenKind::HtmlInline)) {
        return children;
    }
    fold_elements(children, ctx)
}

/// Cut a tag still being typed off the end of the run.
fn truncate_partial_tag(children: &mut Vec<Token>) {
    let Some(last) = children.last_mut() else {
        return;
    };
    if !last.is(TokenKind::Text) {
        return;
    }
    let Some(at) = last.content.rfind('<') else {
        return;
    };
    if PARTIAL_TAG.is_match(&last.content[at..]) {
        last.content.truncate(at);
        if last.content.is_empty() {
            children.pop();
        }
    }
}

fn fold_elements(children: Vec<Token>, ctx: &PassContext<'_>) -> Vec<Token> {
    let mut out = Vec::with_capacity(children.len());
    let mut rest = children.into_iter().collect::<std::collections::VecDeque<_>>();

    while let Some(token) = rest.pop_front() {
        let tag = match token.is(TokenKind::HtmlInline).then(|| parse_tag(&token.content)) {
            Some(Some(tag)) if tag.is_open() => tag,
            _ => {
                out.push(token);
                continue;
            }
        };

        let close = find_close(&tag.name, rest.make_contiguous(), ctx);
        let (inner, closer, loading) = match close {
            Some(at) => {
                let mut inner: Vec<Token> = rest.drain(..=at).collect();
                let closer = inner.pop();
                (inner, closer, false)
            }
            None if ctx.guessing() => (rest.drain(..).collect(), None, true),
            None => {
                out.push(token.with_tag(tag.name));
                continue;
            }
        };

        let mut content = token.content.clone();
        content.push_str(&raw_of(&inner));
        if let Some(closer) = &closer {
            content.push_str(&closer.content);
        }
        out.push(
            Token::new(TokenKind::HtmlInline)
                .with_tag(tag.name)
                .with_content(content)
                .with_children(inner)
                .loading(loading),
        );
    }
    out
}

/// Index of the closing tag for `name`, skipping nested elements of the
/// same name.
fn find_close(name: &str, tokens: &[Token], ctx: &PassContext<'_>) -> Option<usize> {
    let closing = ctx.matchers.closing_tag(name)?;
    let mut depth = 0usize;
    for (idx, token) in tokens.iter().enumerate() {
        if !token.is(TokenKind::HtmlInline) {
            continue;
        }
        if closing.is_match(&token.content) {
            if depth == 0 {
                return Some(idx);
            }
            depth -= 1;
        } else if parse_tag(&token.content).map_or(false, |t| t.is_open() && t.name == name) {
            depth += 1;
        }
    }
    None
}
