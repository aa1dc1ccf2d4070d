//! Strong/emphasis repair.
//!
//! Three fixes, applied in order:
//! 1. delimiter pairs glued to a literal run of the same character are
//!    demoted back to text;
//! 2. strong spans the tokenizer split around inline math are merged;
//! 3. at the streaming tail, an opener whose closer has not arrived yet
//!    becomes a loading span over the rest of the run.

use super::{merge_text, text_tokens, PassContext};
use crate::tokenizer::is_word_char;
use streamtree_core::{Token, TokenKind};

/// A delimiter the tail guess may open.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Delimiter {
    pub markup: &'static str,
    pub open: TokenKind,
}

const STRONG_STAR: Delimiter = Delimiter {
    markup: "**",
    open: TokenKind::StrongOpen,
};
const STRONG_UNDERSCORE: Delimiter = Delimiter {
    markup: "__",
    open: TokenKind::StrongOpen,
};
const STRIKE: Delimiter = Delimiter {
    markup: "~~",
    open: TokenKind::SOpen,
};
const EM_STAR: Delimiter = Delimiter {
    markup: "*",
    open: TokenKind::EmOpen,
};
const EM_UNDERSCORE: Delimiter = Delimiter {
    markup: "_",
    open: TokenKind::EmOpen,
};

pub fn apply(children: Vec<Token>, ctx: &PassContext<'_>) -> Vec<Token> {
    let children = demote_bordered(children);
    let children = merge_math_split(children);
    if !ctx.guessing() {
        return children;
    }

    let mut delimiters = Vec::with_capacity(5);
    if !ctx.options.require_closing_strong {
        delimiters.extend([STRONG_STAR, STRONG_UNDERSCORE]);
    }
    if ctx.options.features.strikethrough {
        delimiters.push(STRIKE);
    }
    delimiters.extend([EM_STAR, EM_UNDERSCORE]);
    guess_open_span(children, &delimiters)
}

/// Demote an open/close pair whose opener touches a literal run of its own
/// delimiter character, e.g. the `**` inside `***text**`.
fn demote_bordered(mut tokens: Vec<Token>) -> Vec<Token> {
    let mut changed = false;
    for i in 0..tokens.len() {
        let kind = tokens[i].kind;
        if kind != TokenKind::StrongOpen && kind != TokenKind::EmOpen {
            continue;
        }
        let Some(c) = tokens[i].markup.chars().next() else {
            continue;
        };
        let prev_touches = i > 0
            && tokens[i - 1].is(TokenKind::Text)
            && tokens[i - 1].content.ends_with(c);
        let next_touches = tokens
            .get(i + 1)
            .map_or(false, |t| t.is(TokenKind::Text) && t.content.starts_with(c));
        if !prev_touches && !next_touches {
            continue;
        }
        if let Some(j) = matching_close(&tokens, i) {
            for at in [i, j] {
                let markup = std::mem::take(&mut tokens[at].markup);
                tokens[at] = Token::text(markup);
            }
            changed = true;
        }
    }
    if changed {
        merge_text(tokens)
    } else {
        tokens
    }
}

fn matching_close(tokens: &[Token], open: usize) -> Option<usize> {
    let kind = tokens[open].kind;
    let close = kind.closing()?;
    let mut depth = 0usize;
    for (j, token) in tokens.iter().enumerate().skip(open + 1) {
        if token.kind == kind {
            depth += 1;
        } else if token.kind == close {
            if depth == 0 {
                return Some(j);
            }
            depth -= 1;
        }
    }
    None
}

/// Rejoin strong spans fragmented by inline math.
fn merge_math_split(tokens: Vec<Token>) -> Vec<Token> {
    if !tokens.iter().any(|t| t.is(TokenKind::MathInline)) {
        return tokens;
    }

    let mut out = Vec::with_capacity(tokens.len());
    let mut i = 0;
    while i < tokens.len() {
        if let Some((merged, used)) = literal_shape(&tokens[i..]).or_else(|| split_shape(&tokens[i..])) {
            out.extend(merged);
            i += used;
        } else {
            out.push(tokens[i].clone());
            i += 1;
        }
    }
    merge_text(out)
}

/// `text "…**a "` + math + `text " b** …"`.
fn literal_shape(tokens: &[Token]) -> Option<(Vec<Token>, usize)> {
    let [lead, math, tail, ..] = tokens else {
        return None;
    };
    if !lead.is(TokenKind::Text) || !math.is(TokenKind::MathInline) || !tail.is(TokenKind::Text) {
        return None;
    }
    if lead.content.matches("**").count() % 2 == 0 {
        return None;
    }
    let open = lead.content.rfind("**")?;
    let close = tail.content.find("**")?;

    let mut merged = text_tokens(&lead.content[..open]);
    merged.push(Token::delimiter(TokenKind::StrongOpen, "**"));
    merged.extend(text_tokens(&lead.content[open + 2..]));
    merged.push(math.clone());
    merged.extend(text_tokens(&tail.content[..close]));
    merged.push(Token::delimiter(TokenKind::StrongClose, "**"));
    merged.extend(text_tokens(&tail.content[close + 2..]));
    Some((merged, 3))
}

/// `strong(text)` `strong(math)` followed by text holding the real closer.
fn split_shape(tokens: &[Token]) -> Option<(Vec<Token>, usize)> {
    let [o1, text, c1, o2, math, c2, tail, ..] = tokens else {
        return None;
    };
    let shape = o1.is(TokenKind::StrongOpen)
        && text.is(TokenKind::Text)
        && c1.is(TokenKind::StrongClose)
        && o2.is(TokenKind::StrongOpen)
        && math.is(TokenKind::MathInline)
        && c2.is(TokenKind::StrongClose)
        && tail.is(TokenKind::Text);
    if !shape {
        return None;
    }
    let close = tail.content.find("**")?;

    let mut merged = vec![o1.clone(), text.clone(), math.clone()];
    merged.extend(text_tokens(&tail.content[..close]));
    merged.push(c2.clone());
    merged.extend(text_tokens(&tail.content[close + 2..]));
    Some((merged, 7))
}

/// Open a loading span at the first unmatched left-flanking opener in the
/// run. Everything after the opener becomes the span's content, minus a
/// half-typed closer at the very end.
pub(crate) fn guess_open_span(children: Vec<Token>, delimiters: &[Delimiter]) -> Vec<Token> {
    let children = drop_dangling_opener(children, delimiters);

    let mut prev_char: Option<char> = None;
    for (idx, token) in children.iter().enumerate() {
        if !token.is(TokenKind::Text) {
            prev_char = token.raw_text().chars().last().or(prev_char);
            continue;
        }
        if let Some((at, delim)) = find_opener(&token.content, prev_char, delimiters, &children[idx + 1..]) {
            return open_span(children, idx, at, delim, delimiters);
        }
        prev_char = token.content.chars().last().or(prev_char);
    }
    children
}

fn open_span(
    mut children: Vec<Token>,
    idx: usize,
    at: usize,
    delim: Delimiter,
    delimiters: &[Delimiter],
) -> Vec<Token> {
    let rest = children.split_off(idx + 1);
    let Some(token) = children.pop() else {
        return rest;
    };
    let text = token.content;
    let after = &text[at + delim.markup.len()..];

    let mut inner = text_tokens(after);
    inner.extend(rest);
    trim_partial_closer(&mut inner, delim);
    let inner = guess_open_span(inner, delimiters);

    children.extend(text_tokens(&text[..at]));
    children.push(Token::delimiter(delim.open, delim.markup).loading(true));
    children.extend(inner);
    if let Some(close) = delim.open.closing() {
        children.push(Token::delimiter(close, delim.markup).loading(true));
    }
    children
}

/// Position and delimiter of the first opener in `text` that can open and
/// has no closer anywhere after it.
fn find_opener(
    text: &str,
    prev: Option<char>,
    delimiters: &[Delimiter],
    later: &[Token],
) -> Option<(usize, Delimiter)> {
    let mut before = prev;
    for (at, c) in text.char_indices() {
        let boundary = before.map_or(true, can_precede_opener);
        before = Some(c);
        if !boundary {
            continue;
        }
        for delim in delimiters {
            if !text[at..].starts_with(delim.markup) {
                continue;
            }
            let after = &text[at + delim.markup.len()..];
            let opens = after
                .chars()
                .next()
                .map_or(false, |next| !next.is_whitespace() && next != c);
            if !opens {
                continue;
            }
            let closed_later = after.contains(delim.markup)
                || later
                    .iter()
                    .any(|t| t.is(TokenKind::Text) && t.content.contains(delim.markup));
            if !closed_later {
                return Some((at, *delim));
            }
        }
    }
    None
}

/// Whether an opener may follow `c`. Delimiters glued to a word (including
/// CJK text, which has no spaces) or to URL-ish punctuation never open.
fn can_precede_opener(c: char) -> bool {
    !is_word_char(c) && !matches!(c, '/' | '\\' | ':' | '.' | '=' | '*' | '_' | '~' | '`' | '+')
}

/// Remove trailing delimiter characters that can only be the start of the
/// closer, e.g. the lone `*` in `**bold*`.
fn trim_partial_closer(inner: &mut Vec<Token>, delim: Delimiter) {
    let width = delim.markup.len();
    let Some(c) = delim.markup.chars().next() else {
        return;
    };
    if width < 2 {
        return;
    }
    if let Some(last) = inner.last_mut() {
        if last.is(TokenKind::Text) {
            let run = last.content.chars().rev().take_while(|&x| x == c).count();
            if run > 0 && run < width {
                let keep = last.content.len() - run;
                last.content.truncate(keep);
            }
        }
    }
    if inner.last().map_or(false, |t| t.is(TokenKind::Text) && t.content.is_empty()) {
        inner.pop();
    }
}

/// Hide a multi-char opener typed at the very end with nothing after it
/// yet: `hello **`.
fn drop_dangling_opener(mut children: Vec<Token>, delimiters: &[Delimiter]) -> Vec<Token> {
    let Some(last) = children.last_mut() else {
        return children;
    };
    if !last.is(TokenKind::Text) {
        return children;
    }
    for delim in delimiters.iter().filter(|d| d.markup.len() > 1) {
        if let Some(head) = last.content.strip_suffix(delim.markup) {
            if head.chars().last().map_or(true, char::is_whitespace) {
                let keep = head.len();
                last.content.truncate(keep);
                break;
            }
        }
    }
    if last.content.is_empty() {
        children.pop();
    }
    children
}
