//! Token fixup passes.
//!
//! Each pass is a pure function from a token list to a token list. Block
//! passes see the whole document; inline passes see the children of one
//! [`TokenKind::Inline`] token at a time.
//!
//! Passes that guess at half-typed constructs only do so for the inline
//! run at the very end of the document (the only place a streaming prefix
//! can be cut off) and never when the caller has marked the input final.

pub mod code_tail;
pub mod html_inline;
pub mod indented_code;
pub mod links;
pub mod marks;
pub mod strong;

use crate::matcher::MatcherCache;
use crate::tokenizer::Tokenizer;
use streamtree_config::ParseOptions;
use streamtree_core::{raw_of, Nesting, Token, TokenKind};

/// Everything a pass may consult besides the tokens themselves.
#[derive(Debug, Clone, Copy)]
pub struct PassContext<'a> {
    pub options: &'a ParseOptions,
    pub tokenizer: &'a Tokenizer,
    pub matchers: &'a MatcherCache,
    /// The inline run being repaired ends the document.
    pub tail: bool,
}

impl<'a> PassContext<'a> {
    pub fn new(options: &'a ParseOptions, tokenizer: &'a Tokenizer, matchers: &'a MatcherCache) -> Self {
        Self {
            options,
            tokenizer,
            matchers,
            tail: false,
        }
    }

    /// Whether half-typed constructs may be completed speculatively.
    pub fn guessing(&self) -> bool {
        self.tail && !self.options.is_final
    }

    fn at_tail(self, tail: bool) -> Self {
        Self { tail, ..self }
    }
}

/// A token-stream transform.
pub type Pass = fn(Vec<Token>, &PassContext<'_>) -> Vec<Token>;

/// Passes over the block token list, in order.
pub const BLOCK_PASSES: &[(&str, Pass)] = &[("indented_code", indented_code::apply)];

/// Passes over each inline run, in order.
pub const INLINE_PASSES: &[(&str, Pass)] = &[
    ("html_inline", html_inline::apply),
    ("code_tail", code_tail::apply),
    ("links", links::apply),
    ("strong", strong::apply),
    ("marks", marks::apply),
];

/// Run every pass over a tokenized document.
pub fn repair(tokens: Vec<Token>, ctx: &PassContext<'_>) -> Vec<Token> {
    let mut tokens = tokens;
    for (name, pass) in BLOCK_PASSES {
        tokens = pass(tokens, ctx);
        log::trace!("block pass {} -> {} tokens", name, tokens.len());
    }

    let tail = tail_inline(&tokens);
    for (idx, token) in tokens.iter_mut().enumerate() {
        if !token.is(TokenKind::Inline) {
            continue;
        }
        let local = ctx.at_tail(tail == Some(idx));
        let mut children = std::mem::take(&mut token.children);
        for (name, pass) in INLINE_PASSES {
            children = pass(children, &local);
            log::trace!("inline pass {} -> {} children", name, children.len());
        }
        token.content = raw_of(&children);
        token.children = children;
    }
    tokens
}

/// Index of the inline token that ends the document, if the document ends
/// in inline content. Closes synthesized for unterminated blocks do not
/// count as an ending; closes of terminated containers do.
pub fn tail_inline(tokens: &[Token]) -> Option<usize> {
    for (idx, token) in tokens.iter().enumerate().rev() {
        if token.kind.nesting() == Nesting::Close && token.meta.closed != Some(true) {
            continue;
        }
        return token.is(TokenKind::Inline).then_some(idx);
    }
    None
}

/// Concatenate adjacent text tokens and drop empty ones.
pub(crate) fn merge_text(tokens: Vec<Token>) -> Vec<Token> {
    let mut out: Vec<Token> = Vec::with_capacity(tokens.len());
    for token in tokens {
        if token.is(TokenKind::Text) {
            if token.content.is_empty() {
                continue;
            }
            if let Some(last) = out.last_mut() {
                if last.is(TokenKind::Text) && !last.meta.loading {
                    last.content.push_str(&token.content);
                    continue;
                }
            }
        }
        out.push(token);
    }
    out
}

/// A text token, or nothing for empty text.
pub(crate) fn text_tokens(text: &str) -> Vec<Token> {
    if text.is_empty() {
        Vec::new()
    } else {
        vec![Token::text(text)]
    }
}
