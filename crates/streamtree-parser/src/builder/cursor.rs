//! Index bookkeeping over a token slice.

use streamtree_core::{Nesting, Token, TokenKind};

/// Forward-only cursor over a token slice.
#[derive(Debug, Clone)]
pub struct TokenCursor<'t> {
    tokens: &'t [Token],
    pos: usize,
}

impl<'t> TokenCursor<'t> {
    pub fn new(tokens: &'t [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    /// The next token, without consuming it.
    pub fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    /// Consume and return the next token.
    pub fn advance(&mut self) -> Option<&'t Token> {
        let token = self.tokens.get(self.pos)?;
        self.pos += 1;
        Some(token)
    }

    /// The most recently consumed token.
    pub fn last(&self) -> Option<&'t Token> {
        self.pos.checked_sub(1).and_then(|at| self.tokens.get(at))
    }

    /// Consume everything up to the close matching an already consumed
    /// `open` token. Returns the tokens in between and whether the close
    /// was found; the close itself is consumed.
    pub fn until(&mut self, open: TokenKind) -> (&'t [Token], bool) {
        let start = self.pos;
        let Some(close) = open.closing() else {
            return (&self.tokens[start..start], true);
        };
        let mut depth = 0usize;
        while let Some(token) = self.tokens.get(self.pos) {
            if token.kind == open {
                depth += 1;
            } else if token.kind == close {
                if depth == 0 {
                    let inner = &self.tokens[start..self.pos];
                    self.pos += 1;
                    return (inner, true);
                }
                depth -= 1;
            }
            self.pos += 1;
        }
        (&self.tokens[start..], false)
    }

    /// Everything not yet consumed.
    pub fn rest(&self) -> &'t [Token] {
        &self.tokens[self.pos.min(self.tokens.len())..]
    }

    pub fn is_done(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    /// Whether nothing but closes of open-ended blocks remain, i.e. the
    /// last consumed token ends the document.
    pub fn at_tail(&self) -> bool {
        self.rest()
            .iter()
            .all(|t| t.kind.nesting() == Nesting::Close && t.meta.closed != Some(true))
    }
}
