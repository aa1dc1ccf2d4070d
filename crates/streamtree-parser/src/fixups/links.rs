//! Link repair.
//!
//! The tokenizer only recognises complete links, so while a link is being
//! typed its pieces arrive as literal text: `[label](http://exa`. This
//! pass turns such text back into `link_open`/label/`link_close` tokens so
//! the renderer can show a link in progress instead of leaking brackets and
//! URL fragments into the paragraph.

use super::{text_tokens, PassContext};
use std::collections::VecDeque;
use streamtree_core::{raw_of, Token, TokenKind};

/// Repair links in one inline run.
pub fn apply(children: Vec<Token>, ctx: &PassContext<'_>) -> Vec<Token> {
    if !children
        .iter()
        .any(|t| t.is(TokenKind::Text) && t.content.contains('['))
    {
        return children;
    }

    let mut pending: VecDeque<Token> = children.into();
    let mut out = Vec::with_capacity(pending.len());

    while let Some(token) = pending.pop_front() {
        if !token.is(TokenKind::Text) || !token.content.contains('[') {
            out.push(token);
            continue;
        }
        match find_link(&token.content, &pending, ctx) {
            Some(link) => {
                pending.drain(..link.consumed);
                if let Some(rest) = link.emit(&mut out) {
                    pending.push_front(Token::text(rest));
                }
            }
            None => out.push(token),
        }
    }

    out
}

/// A link found in text, with everything needed to rebuild it.
#[derive(Debug)]
struct FoundLink {
    prefix: String,
    /// Emphasis run wrapping the link: delimiter char and length.
    marker: Option<(char, usize)>,
    image: bool,
    label: Vec<Token>,
    href: String,
    title: Option<String>,
    /// Destination text as written, for the close token's markup.
    dest: String,
    closed: bool,
    trailing: String,
    /// Tokens after the current one that were folded into the label.
    consumed: usize,
}

impl FoundLink {
    /// Push the rebuilt tokens and return any text left after the link.
    fn emit(self, out: &mut Vec<Token>) -> Option<String> {
        let loading = !self.closed;
        out.extend(text_tokens(&self.prefix));

        let wrappers = match self.marker {
            Some((c, 1)) => vec![(TokenKind::EmOpen, c.to_string())],
            Some((c, 2)) => vec![(TokenKind::StrongOpen, c.to_string().repeat(2))],
            Some((c, 3)) => vec![
                (TokenKind::EmOpen, c.to_string()),
                (TokenKind::StrongOpen, c.to_string().repeat(2)),
            ],
            _ => Vec::new(),
        };
        for (kind, markup) in &wrappers {
            out.push(Token::delimiter(*kind, markup.clone()).loading(loading));
        }

        if self.image {
            let mut image = Token::new(TokenKind::Image)
                .with_tag("img")
                .with_content(raw_of(&self.label))
                .with_attr("src", self.href)
                .loading(loading);
            if let Some(title) = self.title {
                image.set_attr("title", title);
            }
            out.push(image);
        } else {
            let mut open = Token::new(TokenKind::LinkOpen)
                .with_attr("href", self.href)
                .loading(loading);
            if let Some(title) = self.title {
                open.set_attr("title", title);
            }
            out.push(open);
            out.extend(self.label);
            let markup = format!("]({}{}", self.dest, if self.closed { ")" } else { "" });
            out.push(
                Token::new(TokenKind::LinkClose)
                    .with_markup(markup)
                    .loading(loading),
            );
        }

        for (kind, markup) in wrappers.into_iter().rev() {
            if let Some(close) = kind.closing() {
                out.push(Token::delimiter(close, markup).loading(loading));
            }
        }

        if self.trailing.is_empty() {
            None
        } else {
            Some(self.trailing)
        }
    }
}

fn find_link(text: &str, rest: &VecDeque<Token>, ctx: &PassContext<'_>) -> Option<FoundLink> {
    text.match_indices('[')
        .find_map(|(open, _)| link_at(text, open, rest, ctx))
}

/// Try to read a link whose label bracket sits at `open`.
fn link_at(text: &str, open: usize, rest: &VecDeque<Token>, ctx: &PassContext<'_>) -> Option<FoundLink> {
    let image = text[..open].ends_with('!');
    let start = if image { open - 1 } else { open };
    let before = &text[..start];
    let after_open = &text[open + 1..];

    // The label may run across several tokens: `[**bold** text](…`.
    let (label, after_bracket, consumed, at_end) = match after_open.find(']') {
        Some(close) => (
            text_tokens(&after_open[..close]),
            &after_open[close + 1..],
            0,
            rest.is_empty(),
        ),
        None => {
            let mut label = text_tokens(after_open);
            let mut found = None;
            for (k, token) in rest.iter().enumerate() {
                match token.kind {
                    TokenKind::Text => match token.content.find(']') {
                        Some(close) => {
                            label.extend(text_tokens(&token.content[..close]));
                            found = Some((k, &token.content[close + 1..]));
                            break;
                        }
                        None => label.push(token.clone()),
                    },
                    TokenKind::LinkOpen
                    | TokenKind::LinkClose
                    | TokenKind::Image
                    | TokenKind::Softbreak
                    | TokenKind::Hardbreak => return None,
                    _ => label.push(token.clone()),
                }
            }
            let (k, after) = found?;
            (label, after, k + 1, k + 1 == rest.len())
        }
    };

    let destination = after_bracket.strip_prefix('(')?;
    let (dest, closed, trailing) = match find_close_paren(destination) {
        Some(end) => (&destination[..end], true, &destination[end + 1..]),
        None if at_end => (destination, false, ""),
        None => return None,
    };
    if !closed && !ctx.guessing() {
        return None;
    }

    let (href, title) = split_title(dest.trim());

    // `**[label](url)**`: a run right before the bracket wraps the link
    // when the same run follows it, or when the link is still open.
    // Strict strong never wraps an open link in a strong run.
    let mut prefix = before.to_string();
    let mut trailing = trailing.to_string();
    let mut marker = None;
    if let Some((c, n)) = marker_run(before) {
        let run = c.to_string().repeat(n);
        let strict = ctx.options.require_closing_strong && n >= 2;
        if (!closed && !strict) || trailing.starts_with(&run) {
            prefix.truncate(before.len() - n);
            if closed {
                trailing.drain(..n);
            }
            marker = Some((c, n));
        }
    }

    Some(FoundLink {
        prefix,
        marker,
        image,
        label,
        href,
        title,
        dest: dest.to_string(),
        closed,
        trailing,
        consumed,
    })
}

/// Position of the `)` closing a destination, allowing balanced parens.
fn find_close_paren(dest: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in dest.char_indices() {
        match c {
            '(' => depth += 1,
            ')' if depth == 0 => return Some(i),
            ')' => depth -= 1,
            _ => {}
        }
    }
    None
}

/// `url "title"` into its parts. A half-typed title still splits.
fn split_title(dest: &str) -> (String, Option<String>) {
    match dest.find(" \"") {
        Some(at) => {
            let title = dest[at + 2..].trim_end_matches('"');
            (dest[..at].trim().to_string(), Some(title.to_string()))
        }
        None => (dest.to_string(), None),
    }
}

/// Trailing `*`/`_` run of up to three chars at the end of `before`.
fn marker_run(before: &str) -> Option<(char, usize)> {
    let c = before.chars().last()?;
    if c != '*' && c != '_' {
        return None;
    }
    let n = before.chars().rev().take_while(|&x| x == c).count();
    (n <= 3).then_some((c, n))
}
