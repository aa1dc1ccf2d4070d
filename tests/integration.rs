//! Integration tests for streamtree.
//!
//! These drive the whole pipeline through the public API and check the
//! streaming contract: prefixes of a document parse into trees whose
//! unterminated constructs are marked loading, and the marks clear once
//! the terminator arrives or the caller declares the input final.

use streamtree_config::Config;
use streamtree_core::{walk_all, Node, Result, Token, TokenKind};
use streamtree_parser::{parse_markdown, MarkdownParser, ParseOptions};
use streamtree_plugin::{HookOutput, TokenHook};

const DOCUMENT: &str = "# Title

Some **bold** and *em* text with `code` and a [link](https://example.com/docs).

- item one
- item two

```rust
fn main() {}
```

> a quote

| a | b |
|---|---|
| 1 | 2 |

::: tip
Careful
:::

Done.
";

fn streaming(text: &str) -> Vec<Node> {
    parse_markdown(text, &ParseOptions::default())
}

fn finished(text: &str) -> Vec<Node> {
    parse_markdown(text, &ParseOptions::default().with_final(true))
}

/// Kinds of every node marked loading, in tree order.
fn loading(nodes: &[Node]) -> Vec<&'static str> {
    let mut kinds = Vec::new();
    walk_all(nodes, &mut |node| {
        if node.loading() == Some(true) {
            kinds.push(node.kind());
        }
    });
    kinds
}

fn plain(nodes: &[Node]) -> String {
    nodes.iter().map(Node::plain_text).collect::<Vec<_>>().join("\n")
}

/// Every char-boundary prefix of `text`, shortest first.
fn prefixes(text: &str) -> impl Iterator<Item = &str> {
    text.char_indices()
        .map(|(at, c)| at + c.len_utf8())
        .map(move |end| &text[..end])
}

fn first_of<'a>(nodes: &'a [Node], kind: &str) -> Option<&'a Node> {
    let mut found = None;
    walk_all(nodes, &mut |node| {
        if found.is_none() && node.kind() == kind {
            found = Some(node);
        }
    });
    found
}

// =============================================================================
// Whole documents
// =============================================================================

#[test]
fn test_complete_document_has_no_loading() {
    let nodes = streaming(DOCUMENT);
    assert_eq!(loading(&nodes), Vec::<&str>::new());
    let kinds: Vec<_> = nodes.iter().map(Node::kind).collect();
    assert_eq!(
        kinds,
        vec![
            "heading",
            "paragraph",
            "list",
            "code_block",
            "blockquote",
            "table",
            "admonition",
            "paragraph"
        ]
    );
}

#[test]
fn test_final_prefixes_never_load() {
    for prefix in prefixes(DOCUMENT) {
        let nodes = finished(prefix);
        assert!(loading(&nodes).is_empty(), "prefix {:?}", prefix);
    }
}

#[test]
fn test_every_prefix_parses() {
    let parser = MarkdownParser::new();
    let options = ParseOptions::default();
    for prefix in prefixes(DOCUMENT) {
        let nodes = parser.parse(prefix, &options);
        if !prefix.trim().is_empty() {
            assert!(!nodes.is_empty(), "prefix {:?}", prefix);
        }
    }
}

#[test]
fn test_final_is_idempotent() {
    let once = finished(DOCUMENT);
    let twice = finished(DOCUMENT);
    assert_eq!(once, twice);
    assert_eq!(once, streaming(DOCUMENT));
}

#[test]
fn test_empty_and_whitespace() {
    assert!(streaming("").is_empty());
    assert!(streaming("\n\n   \n").is_empty());
}

// =============================================================================
// Inline constructs
// =============================================================================

#[test]
fn test_strong_loading_then_closed() {
    let nodes = streaming("Hello **wor");
    let strong = first_of(&nodes, "strong").expect("strong");
    assert_eq!(strong.loading(), Some(true));
    assert_eq!(strong.plain_text(), "wor");

    let nodes = streaming("Hello **world**");
    let strong = first_of(&nodes, "strong").expect("strong");
    assert_eq!(strong.loading(), Some(false));
    assert_eq!(strong.raw(), "**world**");
}

#[test]
fn test_strong_never_reopens_once_closed() {
    let text = "Hello **world** and more";
    let closed_at = "Hello **world**".len();
    for prefix in prefixes(text).filter(|p| p.len() >= closed_at) {
        assert!(loading(&streaming(prefix)).is_empty(), "prefix {:?}", prefix);
    }
}

#[test]
fn test_strict_strong_leaves_delimiters_literal() {
    let options = ParseOptions::default().with_require_closing_strong(true);
    let nodes = parse_markdown("Hello **wor", &options);
    assert!(first_of(&nodes, "strong").is_none());
    assert_eq!(plain(&nodes), "Hello **wor");
}

#[test]
fn test_cjk_strong() {
    let nodes = finished("这是**重要**的内容");
    let strong = first_of(&nodes, "strong").expect("strong");
    assert_eq!(strong.plain_text(), "重要");
}

#[test]
fn test_cjk_intraword_opener_stays_literal() {
    let nodes = streaming("某某**科技有限公司");
    assert!(first_of(&nodes, "strong").is_none());
    assert!(plain(&nodes).contains("**"));
}

#[test]
fn test_partial_closing_fence_hidden() {
    let nodes = streaming("```\nlet a = 1;\n``");
    match &nodes[0] {
        Node::CodeBlock { code, loading, .. } => {
            assert_eq!(code, "let a = 1;");
            assert!(*loading);
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_link_prefixes_never_leak_url() {
    let text = "See [the docs](https://example.com/docs) and [more](https://example.com/more).";
    for prefix in prefixes(text) {
        let nodes = streaming(prefix);
        assert!(!plain(&nodes).contains("(http"), "prefix {:?}", prefix);
    }
}

#[test]
fn test_partial_link_loading() {
    let nodes = streaming("See [the docs](https://exa");
    match first_of(&nodes, "link") {
        Some(Node::Link {
            href, text, loading, ..
        }) => {
            assert_eq!(text, "the docs");
            assert!(href.starts_with("https://exa"));
            assert!(*loading);
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_inline_code_tail() {
    let nodes = streaming("run `cargo te");
    match first_of(&nodes, "inline_code") {
        Some(Node::InlineCode { code, loading, .. }) => {
            assert_eq!(code, "cargo te");
            assert!(*loading);
        }
        other => panic!("unexpected {:?}", other),
    }
    assert!(first_of(&finished("run `cargo te"), "inline_code").is_none());
}

// =============================================================================
// Blocks
// =============================================================================

#[test]
fn test_fence_loading_until_closed() {
    let nodes = streaming("```rust\nfn main() {");
    match &nodes[0] {
        Node::CodeBlock {
            language,
            code,
            loading,
            ..
        } => {
            assert_eq!(language, "rust");
            assert_eq!(code, "fn main() {");
            assert!(*loading);
        }
        other => panic!("unexpected {:?}", other),
    }

    let nodes = streaming("```rust\nfn main() {}\n```");
    assert_eq!(nodes[0].loading(), Some(false));
}

#[test]
fn test_diff_fence_split() {
    let nodes = finished("```diff\n@@ -1 +1 @@\n keep\n-old\n+new\n```");
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
fn test_indented_prose_and_code() {
    let nodes = finished("    This is just indented text");
    assert_eq!(nodes[0].kind(), "paragraph");
    assert_eq!(nodes[0].plain_text(), "This is just indented text");

    let nodes = finished("    const x = 1");
    match &nodes[0] {
        Node::CodeBlock { indented, code, .. } => {
            assert!(*indented);
            assert_eq!(code, "const x = 1");
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_admonition_loading_then_cleared() {
    let nodes = streaming("::: warning\nBe careful");
    match &nodes[0] {
        Node::Admonition {
            kind,
            title,
            loading,
            ..
        } => {
            assert_eq!(kind, "warning");
            assert_eq!(title, "Warning");
            assert!(*loading);
        }
        other => panic!("unexpected {:?}", other),
    }

    let nodes = streaming("::: warning\nBe careful\n:::");
    assert_eq!(nodes[0].loading(), Some(false));
    assert_eq!(finished("::: warning\nBe careful")[0].loading(), Some(false));
}

#[test]
fn test_math_block() {
    let nodes = streaming("$$\nx^2 + y^2");
    assert_eq!(nodes[0].kind(), "math_block");
    assert_eq!(nodes[0].loading(), Some(true));

    let nodes = streaming("$$\nx^2 + y^2\n$$");
    assert_eq!(nodes[0].loading(), Some(false));
}

#[test]
fn test_custom_tag_spans_until_closed() {
    let options = ParseOptions::default().with_custom_html_tags(["thinking"]);
    let nodes = parse_markdown("<thinking>\nstep one\n\nstep two", &options);
    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0].kind(), "custom_tag");
    assert_eq!(nodes[0].loading(), Some(true));

    let nodes = parse_markdown("<thinking>\nstep one\n\nstep two\n</thinking>\n\nanswer", &options);
    let kinds: Vec<_> = nodes.iter().map(Node::kind).collect();
    assert_eq!(kinds, vec!["custom_tag", "paragraph"]);
    assert_eq!(nodes[0].loading(), Some(false));
}

const SETTLING: &str = "> ```
> code
> ```

::: tip
| a |
|---|
| 1 |
:::

::: note
<div>
x
:::

after paragraph
";

#[test]
fn test_terminated_blocks_settle_in_every_later_prefix() {
    let fence_end = SETTLING.find("> ```\n\n").map(|at| at + "> ```".len()).unwrap();
    let table_end = SETTLING.find("| 1 |\n:::").map(|at| at + "| 1 |\n:::".len()).unwrap();
    let html_end = SETTLING.find("x\n:::").map(|at| at + "x\n:::".len()).unwrap();
    let settled_at = [("code_block", fence_end), ("table", table_end), ("html_block", html_end)];

    for prefix in prefixes(SETTLING) {
        let nodes = streaming(prefix);
        for (kind, end) in settled_at {
            if prefix.len() < end {
                continue;
            }
            let node = first_of(&nodes, kind).unwrap_or_else(|| panic!("{} in {:?}", kind, prefix));
            assert_eq!(node.loading(), Some(false), "{} in {:?}", kind, prefix);
        }
    }
    assert!(loading(&streaming(SETTLING)).is_empty());
}

#[test]
fn test_strict_strong_before_open_link() {
    let options = ParseOptions::default().with_require_closing_strong(true);
    let nodes = parse_markdown("x **[a](http://ex", &options);
    assert!(first_of(&nodes, "strong").is_none());
    assert!(first_of(&nodes, "link").is_some());
    assert!(plain(&nodes).starts_with("x **"));
}

// =============================================================================
// Configuration and hooks
// =============================================================================

#[test]
fn test_options_from_inline_config() {
    let config: Config = toml::from_str(
        r#"
        [html]
        CustomTags = ["aside"]

        [parse]
        RequireClosingStrong = true
        "#,
    )
    .unwrap();
    let options = config.options();
    assert!(options.is_custom_tag("aside"));

    let nodes = parse_markdown("Hello **wor", &options);
    assert!(first_of(&nodes, "strong").is_none());
}

struct Headings;

impl TokenHook for Headings {
    fn name(&self) -> &str {
        "headings"
    }

    fn post_transform(&self, tokens: Vec<Token>) -> Result<HookOutput> {
        let headings = tokens
            .iter()
            .filter(|t| t.is(TokenKind::HeadingOpen))
            .count();
        Ok(HookOutput::Nodes(vec![Node::text(format!("{} headings", headings))]))
    }
}

#[test]
fn test_post_hook_short_circuits() {
    let parser = MarkdownParser::new().with_hook(Box::new(Headings));
    let nodes = parser.parse("# a\n\n## b\n\ntext", &ParseOptions::default());
    assert_eq!(nodes, vec![Node::text("2 headings")]);
}
