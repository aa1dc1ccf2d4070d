//! Single-line indented code that is really prose.
//!
//! Four leading spaces are enough for CommonMark to call a line code, and
//! generated text often indents a stray sentence. A single-line indented
//! block that matches none of the code heuristics below is turned back
//! into a paragraph. Multi-line blocks are always left alone.

use super::PassContext;
use regex::Regex;
use std::sync::LazyLock;
use streamtree_core::{Token, TokenKind};

/// Ordered "looks like code" checks. The first match wins.
static HEURISTICS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    [
        (
            "keyword",
            r#"^(?:(?:const|let|var|mut)\s+[A-Za-z_$][\w$]*|(?:function|def|fn|class|struct|enum|trait|impl|interface|type|namespace)\s*[A-Za-z_$<({]|import\s+[\w{*"'.]|export\s+(?:default|const|let|function|class|type|\{|\*)|from\s+\S+\s+import\s|use\s+[\w:]+(?:::|;)|require\(|package\s+[\w.]+;?$|#(?:include|define|import)\b|(?:return|yield|await|throw|raise)(?:\s|;|$)|(?:if|for|while|switch|catch|elif|match)\s*\()"#,
        ),
        (
            "call",
            r"(?:^|[^\w$])[A-Za-z_$][\w$]*\([^()]*\)|[A-Za-z_$][\w$]*\.[A-Za-z_$][\w$]*\s*[(\[=;]",
        ),
        (
            "operator",
            r"===|!==|==|!=|<=|>=|=>|(?:^|[^-])->|::|\+=|-=|\*=|/=|&&|\|\||\+\+|^[A-Za-z_$][\w$.\[\]]*\s*=\s*\S",
        ),
        (
            "command",
            r"^(?:https?://|www\.|\.{0,2}/[\w.~-]|~/|\$\s|(?:npm|npx|yarn|pnpm|bun|deno|cargo|rustup|git|pip3?|python3?|node|cd|ls|mkdir|rm|cp|mv|echo|sudo|docker|kubectl|curl|wget|brew|apt(?:-get)?|go\s+(?:run|build|get|test|mod))\s)",
        ),
        ("brackets", r"^[\s{}\[\]()<>;,]+$"),
        (
            "number",
            r"(?i)^[-+]?\d[\d_,]*(?:\.\d+)?(?:e[-+]?\d+)?\s*(?:%|px|em|rem|ms|s|b|kb|mb|gb|tb|k|m|g|h|min|hz|khz|mhz|ghz)?$",
        ),
        ("comment", r"^(?://|/\*|\*/|#!|<!--|--\s|#\s|;;)|(?:\*/|-->)$"),
        ("terminator", r"[;{}]\s*$|^[{}]"),
    ]
    .into_iter()
    .map(|(name, pattern)| (name, Regex::new(pattern).unwrap()))
    .collect()
});

pub fn apply(tokens: Vec<Token>, ctx: &PassContext<'_>) -> Vec<Token> {
    if !tokens.iter().any(|t| t.is(TokenKind::CodeBlock)) {
        return tokens;
    }

    let mut out = Vec::with_capacity(tokens.len());
    for token in tokens {
        let line = token.content.trim_end_matches('\n');
        if !token.is(TokenKind::CodeBlock) || line.contains('\n') || line.trim().is_empty() {
            out.push(token);
            continue;
        }
        if let Some(rule) = looks_like_code(line) {
            log::trace!("indented line kept as code ({}): {}", rule, line);
            out.push(token);
            continue;
        }

        let text = line.trim();
        let children = ctx.tokenizer.tokenize_inline(text, ctx.options);
        out.push(Token::new(TokenKind::ParagraphOpen).with_tag("p").with_map(token.map));
        out.push(
            Token::new(TokenKind::Inline)
                .with_content(text)
                .with_map(token.map)
                .with_children(children),
        );
        out.push(Token::new(TokenKind::ParagraphClose).with_tag("p"));
    }
    out
}

/// Name of the first heuristic that calls `line` code.
pub fn looks_like_code(line: &str) -> Option<&'static str> {
    let line = line.trim();
    HEURISTICS
        .iter()
        .find(|(_, re)| re.is_match(line))
        .map(|(name, _)| *name)
}
