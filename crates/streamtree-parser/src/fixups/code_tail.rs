//! Inline code still being typed.
//!
//! Matched backtick runs are already `code_inline` tokens, so a backtick
//! run left in text at the stream tail is an opener whose closer has not
//! arrived. Everything after it is code, not markdown.

use super::{text_tokens, PassContext};
use streamtree_core::{raw_of, Token, TokenKind};

pub fn apply(children: Vec<Token>, ctx: &PassContext<'_>) -> Vec<Token> {
    if !ctx.guessing() {
        return children;
    }
    let Some((idx, at, width)) = find_open_run(&children) else {
        return children;
    };

    let mut children = children;
    let rest = children.split_off(idx + 1);
    let Some(token) = children.pop() else {
        return rest;
    };
    let text = token.content;
    let mut code = text[at + width..].to_string();
    code.push_str(&raw_of(&rest));

    children.extend(text_tokens(&text[..at]));
    if !code.is_empty() {
        children.push(
            Token::new(TokenKind::CodeInline)
                .with_markup(&text[at..at + width])
                .with_content(code)
                .loading(true),
        );
    }
    children
}

/// Token index, byte offset and width of the first backtick run with no
/// run of the same width after it.
fn find_open_run(children: &[Token]) -> Option<(usize, usize, usize)> {
    for (idx, token) in children.iter().enumerate() {
        if !token.is(TokenKind::Text) {
            continue;
        }
        let text = token.content.as_str();
        let mut from = 0;
        while let Some(offset) = text[from..].find('`') {
            let at = from + offset;
            let width = text[at..].chars().take_while(|&c| c == '`').count();
            let after = at + width;
            if !has_run(&text[after..], width) && !later_has_run(&children[idx + 1..], width) {
                return Some((idx, at, width));
            }
            from = after;
        }
    }
    None
}

fn later_has_run(tokens: &[Token], width: usize) -> bool {
    tokens
        .iter()
        .any(|t| t.is(TokenKind::Text) && has_run(&t.content, width))
}

/// Whether `text` contains a backtick run of exactly `width`.
fn has_run(text: &str, width: usize) -> bool {
    text.split(|c| c != '`')
        .any(|run| run.len() == width)
}
