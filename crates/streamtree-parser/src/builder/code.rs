//! Fenced and indented code blocks.

use super::NodeBuilder;
use streamtree_core::{Node, Token};

/// Unified-diff header lines that belong to neither side.
const DIFF_METADATA: &[&str] = &["diff ", "index ", "--- ", "+++ ", "@@ "];

impl NodeBuilder<'_> {
    pub(crate) fn fence(&self, token: &Token) -> Node {
        let language = token
            .info
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_string();
        let code = token
            .content
            .strip_suffix('\n')
            .unwrap_or(&token.content)
            .to_string();
        let closed = token.meta.closed != Some(false);
        let loading = !self.options.is_final && token.meta.loading;

        let mut raw = format!("{}{}\n{}", token.markup, token.info, token.content);
        if closed {
            raw.push_str(&token.markup);
        }

        let diff = language.starts_with("diff");
        let (original_code, updated_code) = if diff {
            let (original, updated) = split_diff(&code);
            (Some(original), Some(updated))
        } else {
            (None, None)
        };

        Node::CodeBlock {
            language,
            code,
            raw,
            loading,
            indented: false,
            diff,
            original_code,
            updated_code,
        }
    }

    pub(crate) fn indented_code(&self, token: &Token) -> Node {
        let code = token.content.trim_end_matches('\n').to_string();
        let raw = code
            .lines()
            .map(|line| format!("{}{}", token.markup, line))
            .collect::<Vec<_>>()
            .join("\n");
        Node::CodeBlock {
            language: String::new(),
            code,
            raw,
            loading: false,
            indented: true,
            diff: false,
            original_code: None,
            updated_code: None,
        }
    }
}

/// Split a unified diff into the code before and after the change.
///
/// Context lines go to both sides with their leading space removed;
/// `-` lines only to the original, `+` lines only to the update.
pub fn split_diff(code: &str) -> (String, String) {
    let mut original = Vec::new();
    let mut updated = Vec::new();
    for line in code.lines() {
        if DIFF_METADATA.iter().any(|prefix| line.starts_with(prefix)) {
            continue;
        }
        match line.chars().next() {
            Some('-') => original.push(&line[1..]),
            Some('+') => updated.push(&line[1..]),
            Some(' ') => {
                original.push(&line[1..]);
                updated.push(&line[1..]);
            }
            _ => {
                original.push(line);
                updated.push(line);
            }
        }
    }
    (original.join("\n"), updated.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::super::testing::{finished, streaming};
    use super::*;

    #[test]
    fn test_fence_fields() {
        let nodes = finished("```rust title=x\nfn main() {}\n```");
        match &nodes[0] {
            Node::CodeBlock {
                language,
                code,
                loading,
                indented,
                diff,
                raw,
                ..
            } => {
                assert_eq!(language, "rust");
                assert_eq!(code, "fn main() {}");
                assert!(!*loading);
                assert!(!*indented);
                assert!(!*diff);
                assert_eq!(raw, "```rust title=x\nfn main() {}\n```");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_unclosed_fence_loading() {
        let nodes = streaming("```py\nprint(1)\n``");
        match &nodes[0] {
            Node::CodeBlock { code, loading, .. } => {
                assert_eq!(code, "print(1)");
                assert!(*loading);
            }
            other => panic!("unexpected {:?}", other),
        }
        let nodes = finished("```py\nprint(1)");
        assert_eq!(nodes[0].loading(), Some(false));
    }

    #[test]
    fn test_diff_fence_split() {
        let source = "```diff\ndiff --git a/x b/x\nindex 1..2\n--- a/x\n+++ b/x\n@@ -1,3 +1,3 @@\n keep\n-old\n+new\n```";
        let nodes = finished(source);
        match &nodes[0] {
            Node::CodeBlock {
                diff,
                original_code,
                updated_code,
                ..
            } => {
                assert!(*diff);
                assert_eq!(original_code.as_deref(), Some("keep\nold"));
                assert_eq!(updated_code.as_deref(), Some("keep\nnew"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_split_diff_plain_lines_go_to_both() {
        let (original, updated) = split_diff("plain\n-a\n+b");
        assert_eq!(original, "plain\na");
        assert_eq!(updated, "plain\nb");
    }

    #[test]
    fn test_indented_code_block() {
        let nodes = finished("    let a = 1;\n    let b = 2;");
        match &nodes[0] {
            Node::CodeBlock {
                code,
                indented,
                raw,
                ..
            } => {
                assert_eq!(code, "let a = 1;\nlet b = 2;");
                assert!(*indented);
                assert_eq!(raw, "    let a = 1;\n    let b = 2;");
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
