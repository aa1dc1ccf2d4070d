//! Tables.

use super::{inline_tokens, NodeBuilder, TokenCursor};
use streamtree_core::{raw_of, Alignment, Node, Token, TokenKind};

impl NodeBuilder<'_> {
    pub(crate) fn table(&self, open: &Token, inner: &[Token]) -> Node {
        let mut header = Vec::new();
        let mut rows = Vec::new();
        let mut cursor = TokenCursor::new(inner);
        while let Some(token) = cursor.advance() {
            match token.kind {
                TokenKind::TheadOpen => {
                    let (section, _) = cursor.until(token.kind);
                    header.extend(self.rows(section));
                }
                TokenKind::TbodyOpen => {
                    let (section, _) = cursor.until(token.kind);
                    rows.extend(self.rows(section));
                }
                _ => {}
            }
        }

        Node::Table {
            header,
            rows,
            raw: open.content.clone(),
            loading: open.meta.loading && !self.options.is_final,
        }
    }

    fn rows(&self, section: &[Token]) -> Vec<Node> {
        let mut rows = Vec::new();
        let mut cursor = TokenCursor::new(section);
        while let Some(token) = cursor.advance() {
            if token.is(TokenKind::TrOpen) {
                let (row, _) = cursor.until(token.kind);
                rows.push(self.row(row));
            }
        }
        rows
    }

    fn row(&self, row: &[Token]) -> Node {
        let mut cells = Vec::new();
        let mut cursor = TokenCursor::new(row);
        while let Some(token) = cursor.advance() {
            if !matches!(token.kind, TokenKind::ThOpen | TokenKind::TdOpen) {
                continue;
            }
            let (cell, _) = cursor.until(token.kind);
            let run = inline_tokens(cell);
            cells.push(Node::TableCell {
                header: token.is(TokenKind::ThOpen),
                align: token.attr("style").map_or(Alignment::None, Alignment::from_attr),
                children: self.inlines(run),
                raw: raw_of(run),
            });
        }

        let raw = format!(
            "| {} |",
            cells.iter().map(Node::raw).collect::<Vec<_>>().join(" | ")
        );
        Node::TableRow { cells, raw }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{finished, streaming};
    use super::*;

    const TABLE: &str = "| a | b |\n|:--|--:|\n| 1 | **2** |";

    #[test]
    fn test_table_shape() {
        let nodes = finished(TABLE);
        match &nodes[0] {
            Node::Table {
                header,
                rows,
                loading,
                ..
            } => {
                assert_eq!(header.len(), 1);
                assert_eq!(rows.len(), 1);
                assert!(!*loading);
                match &rows[0] {
                    Node::TableRow { cells, raw } => {
                        assert_eq!(raw, "| 1 | **2** |");
                        match &cells[1] {
                            Node::TableCell {
                                header,
                                align,
                                children,
                                ..
                            } => {
                                assert!(!*header);
                                assert_eq!(*align, Alignment::Right);
                                assert_eq!(children[0].kind(), "strong");
                            }
                            other => panic!("unexpected {:?}", other),
                        }
                    }
                    other => panic!("unexpected {:?}", other),
                }
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_table_loading_while_last_block() {
        let nodes = streaming(TABLE);
        assert_eq!(nodes[0].loading(), Some(true));

        let nodes = streaming(&format!("{}\n\nafter", TABLE));
        assert_eq!(nodes[0].loading(), Some(false));
    }
}
