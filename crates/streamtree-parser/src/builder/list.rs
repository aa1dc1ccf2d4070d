//! Lists and list-item normalisation.
//!
//! While an ordered list is streaming, the next item's marker often
//! arrives before its text: `1. first\n2` parses as a lazy continuation of
//! the first item, `1. first\n\n2` as a stray paragraph. Both fragments are
//! removed until the input is final, so the list does not flicker.

use super::{NodeBuilder, TokenCursor};
use regex::Regex;
use std::sync::LazyLock;
use streamtree_core::{Node, Token, TokenKind};

static MARKER_FRAGMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n\s*\d+[.)]?\s*$").unwrap());
static BARE_MARKER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+[.)]?$").unwrap());

impl NodeBuilder<'_> {
    pub(crate) fn list(&self, open: &Token, inner: &[Token]) -> Node {
        let ordered = open.is(TokenKind::OrderedListOpen);
        let mut cursor = TokenCursor::new(inner);
        let mut items = Vec::new();
        while let Some(token) = cursor.advance() {
            if token.is(TokenKind::ListItemOpen) {
                let (body, _) = cursor.until(token.kind);
                items.push(self.list_item(token, body));
            }
        }

        let last = items.len().saturating_sub(1);
        for (idx, item) in items.iter_mut().enumerate() {
            trim_item(item, ordered && idx == last && !self.options.is_final);
        }

        Node::List {
            ordered,
            start: if ordered {
                open.attr("start").and_then(|s| s.parse().ok())
            } else {
                None
            },
            items,
            raw: open.content.clone(),
        }
    }

    pub(crate) fn list_item(&self, open: &Token, body: &[Token]) -> Node {
        Node::ListItem {
            checked: open.attr("checked").and_then(|c| c.parse().ok()),
            children: self.blocks(body),
            raw: open.content.clone(),
        }
    }
}

/// Trim trailing whitespace from the end of an item's last paragraph, and
/// optionally a leaked next-item marker. Text and raw are trimmed together.
fn trim_item(item: &mut Node, strip_marker: bool) {
    let Node::ListItem { children, .. } = item else {
        return;
    };
    let Some(Node::Paragraph {
        children: inline,
        raw,
    }) = children.last_mut()
    else {
        return;
    };

    if strip_marker {
        if let Some(m) = MARKER_FRAGMENT.find(raw.as_str()) {
            let cut = m.as_str().to_string();
            raw.truncate(m.start());
            strip_text_suffix(inline, cut.trim_end());
        }
    }

    let trimmed = raw.trim_end().len();
    raw.truncate(trimmed);
    if let Some(Node::Text { content, raw }) = inline.last_mut() {
        let keep = content.trim_end().len();
        content.truncate(keep);
        let keep = raw.trim_end().len();
        raw.truncate(keep);
    }
    if matches!(inline.last(), Some(Node::Text { content, .. }) if content.is_empty()) {
        inline.pop();
    }
}

fn strip_text_suffix(inline: &mut [Node], suffix: &str) {
    if let Some(Node::Text { content, raw }) = inline.last_mut() {
        let trimmed = content.trim_end();
        if let Some(head) = trimmed.strip_suffix(suffix) {
            let keep = head.len();
            content.truncate(keep);
            raw.truncate(raw.len().min(keep));
        }
    }
}

/// Drop a bare `2.`-style paragraph right after a trailing ordered list.
pub(crate) fn drop_marker_paragraph(nodes: &mut Vec<Node>, is_final: bool) {
    if is_final || nodes.len() < 2 {
        return;
    }
    let n = nodes.len();
    let after_ordered = matches!(nodes[n - 2], Node::List { ordered: true, .. });
    let bare = match &nodes[n - 1] {
        Node::Paragraph { raw, .. } => BARE_MARKER.is_match(raw.trim()),
        _ => false,
    };
    if after_ordered && bare {
        nodes.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{finished, kinds, streaming};
    use super::*;

    fn items(node: &Node) -> &[Node] {
        match node {
            Node::List { items, .. } => items,
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_ordered_list_start() {
        let nodes = finished("3. three\n4. four");
        match &nodes[0] {
            Node::List {
                ordered,
                start,
                items,
                ..
            } => {
                assert!(*ordered);
                assert_eq!(*start, Some(3));
                assert_eq!(items.len(), 2);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_task_items() {
        let nodes = finished("- [x] done\n- [ ] todo\n- plain");
        let checked: Vec<_> = items(&nodes[0])
            .iter()
            .map(|item| match item {
                Node::ListItem { checked, .. } => *checked,
                _ => None,
            })
            .collect();
        assert_eq!(checked, vec![Some(true), Some(false), None]);
    }

    #[test]
    fn test_leaked_marker_stripped_while_streaming() {
        let nodes = streaming("1. first\n2");
        let list = items(&nodes[0]);
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].plain_text(), "first");

        let nodes = finished("1. first\n2");
        assert_eq!(items(&nodes[0])[0].plain_text(), "first\n2");
    }

    #[test]
    fn test_bare_marker_paragraph_dropped() {
        let nodes = streaming("1. first\n\n2.");
        assert_eq!(kinds(&nodes), vec!["list"]);
        let nodes = streaming("1. first\n\n2");
        assert_eq!(kinds(&nodes), vec!["list"]);
    }

    #[test]
    fn test_trailing_whitespace_trimmed() {
        let nodes = finished("- item   ");
        match &items(&nodes[0])[0] {
            Node::ListItem { children, .. } => match &children[0] {
                Node::Paragraph { children, raw } => {
                    assert_eq!(raw, "item");
                    assert_eq!(children[0], Node::text("item"));
                }
                other => panic!("unexpected {:?}", other),
            },
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_nested_list() {
        let nodes = finished("- a\n  - b\n- c");
        let list = items(&nodes[0]);
        assert_eq!(list.len(), 2);
        match &list[0] {
            Node::ListItem { children, .. } => {
                assert_eq!(kinds(children), vec!["paragraph", "list"]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
