//! `==highlight==` and `++insert++`.
//!
//! The tokenizer has no syntax for either, so both arrive as text. Pairs
//! are split into `mark`/`ins` tokens here; at the stream tail an opener
//! without its closer becomes a loading span like strong does.

use super::strong::{guess_open_span, Delimiter};
use super::{text_tokens, PassContext};
use crate::tokenizer::is_word_char;
use std::collections::VecDeque;
use streamtree_core::{Token, TokenKind};

const MARK: Delimiter = Delimiter {
    markup: "==",
    open: TokenKind::MarkOpen,
};
const INS: Delimiter = Delimiter {
    markup: "++",
    open: TokenKind::InsOpen,
};

pub fn apply(children: Vec<Token>, ctx: &PassContext<'_>) -> Vec<Token> {
    if !ctx.options.features.highlight_marks {
        return children;
    }
    let mut children = children;
    for delim in [MARK, INS] {
        if children
            .iter()
            .any(|t| t.is(TokenKind::Text) && t.content.contains(delim.markup))
        {
            children = split_pairs(children, delim);
        }
    }
    if ctx.guessing() {
        children = guess_open_span(children, &[MARK, INS]);
    }
    children
}

fn split_pairs(children: Vec<Token>, delim: Delimiter) -> Vec<Token> {
    let Some(close_kind) = delim.open.closing() else {
        return children;
    };
    let width = delim.markup.len();
    let mut pending: VecDeque<Token> = children.into();
    let mut out = Vec::with_capacity(pending.len());
    let mut prev: Option<char> = None;

    while let Some(token) = pending.pop_front() {
        if !token.is(TokenKind::Text) {
            prev = token.raw_text().chars().last().or(prev);
            out.push(token);
            continue;
        }
        let text = token.content.as_str();
        let Some(at) = find_open(text, prev, delim.markup) else {
            prev = text.chars().last().or(prev);
            out.push(token);
            continue;
        };
        let after = &text[at + width..];

        let (inner, tail) = if let Some(close) = find_close(after, delim.markup) {
            (text_tokens(&after[..close]), after[close + width..].to_string())
        } else {
            let found = pending.iter().enumerate().find_map(|(k, t)| {
                if !t.is(TokenKind::Text) {
                    return None;
                }
                find_close(&t.content, delim.markup).map(|c| (k, c))
            });
            let Some((k, close)) = found else {
                prev = text.chars().last().or(prev);
                out.push(token);
                continue;
            };
            let mut between: Vec<Token> = pending.drain(..=k).collect();
            let closer = between.pop().map(|t| t.content).unwrap_or_default();
            let mut inner = text_tokens(after);
            inner.extend(between);
            inner.extend(text_tokens(&closer[..close]));
            (inner, closer[close + width..].to_string())
        };

        out.extend(text_tokens(&text[..at]));
        out.push(Token::delimiter(delim.open, delim.markup));
        out.extend(inner);
        out.push(Token::delimiter(close_kind, delim.markup));
        prev = delim.markup.chars().last();
        if !tail.is_empty() {
            pending.push_front(Token::text(tail));
        }
    }
    out
}

fn find_open(text: &str, prev: Option<char>, markup: &str) -> Option<usize> {
    let mut before = prev;
    for (at, c) in text.char_indices() {
        let boundary = before.map_or(true, |b| !is_word_char(b) && !markup.starts_with(b));
        before = Some(c);
        if !boundary || !text[at..].starts_with(markup) {
            continue;
        }
        let next = text[at + markup.len()..].chars().next();
        if next.map_or(false, |n| !n.is_whitespace() && !markup.starts_with(n)) {
            return Some(at);
        }
    }
    None
}

fn find_close(text: &str, markup: &str) -> Option<usize> {
    let mut from = 0;
    while let Some(offset) = text[from..].find(markup) {
        let at = from + offset;
        let before_ok = text[..at].chars().last().map_or(true, |b| !b.is_whitespace());
        let after_ok = !text[at + markup.len()..].starts_with(markup);
        if before_ok && after_ok {
            return Some(at);
        }
        from = at + markup.len();
    }
    None
}
