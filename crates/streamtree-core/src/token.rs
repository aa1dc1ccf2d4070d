//! Flat tokens produced by the tokenizer adapter.
//!
//! The shape follows the markdown-it convention: container blocks are
//! `*_open`/`*_close` pairs, leaf blocks with inline content carry a single
//! [`TokenKind::Inline`] token whose `children` hold the inline run, and
//! everything else is atomic.

use crate::enums::Nesting;
use crate::types::LineSpan;
use serde::{Deserialize, Serialize};

/// Every token type the pipeline understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    // === Block containers ===
    ParagraphOpen,
    ParagraphClose,
    HeadingOpen,
    HeadingClose,
    BlockquoteOpen,
    BlockquoteClose,
    BulletListOpen,
    BulletListClose,
    OrderedListOpen,
    OrderedListClose,
    ListItemOpen,
    ListItemClose,
    TableOpen,
    TableClose,
    TheadOpen,
    TheadClose,
    TbodyOpen,
    TbodyClose,
    TrOpen,
    TrClose,
    ThOpen,
    ThClose,
    TdOpen,
    TdClose,
    FootnoteOpen,
    FootnoteClose,
    DlOpen,
    DlClose,
    DtOpen,
    DtClose,
    DdOpen,
    DdClose,
    AdmonitionOpen,
    AdmonitionClose,
    ContainerOpen,
    ContainerClose,

    // === Block leaves ===
    Inline,
    Fence,
    CodeBlock,
    HtmlBlock,
    MathBlock,
    Hr,

    // === Inline ===
    Text,
    Softbreak,
    Hardbreak,
    CodeInline,
    HtmlInline,
    MathInline,
    LinkOpen,
    LinkClose,
    Image,
    StrongOpen,
    StrongClose,
    EmOpen,
    EmClose,
    SOpen,
    SClose,
    MarkOpen,
    MarkClose,
    InsOpen,
    InsClose,
    SubOpen,
    SubClose,
    SupOpen,
    SupClose,
    FootnoteRef,
    FootnoteAnchor,
}

impl TokenKind {
    /// The matching close kind for an open kind.
    pub fn closing(self) -> Option<TokenKind> {
        use TokenKind::*;
        let close = match self {
            ParagraphOpen => ParagraphClose,
            HeadingOpen => HeadingClose,
            BlockquoteOpen => BlockquoteClose,
            BulletListOpen => BulletListClose,
            OrderedListOpen => OrderedListClose,
            ListItemOpen => ListItemClose,
            TableOpen => TableClose,
            TheadOpen => TheadClose,
            TbodyOpen => TbodyClose,
            TrOpen => TrClose,
            ThOpen => ThClose,
            TdOpen => TdClose,
            FootnoteOpen => FootnoteClose,
            DlOpen => DlClose,
            DtOpen => DtClose,
            DdOpen => DdClose,
            AdmonitionOpen => AdmonitionClose,
            ContainerOpen => ContainerClose,
            LinkOpen => LinkClose,
            StrongOpen => StrongClose,
            EmOpen => EmClose,
            SOpen => SClose,
            MarkOpen => MarkClose,
            InsOpen => InsClose,
            SubOpen => SubClose,
            SupOpen => SupClose,
            _ => return None,
        };
        Some(close)
    }

    /// How this kind affects nesting.
    pub fn nesting(self) -> Nesting {
        use TokenKind::*;
        match self {
            ParagraphClose | HeadingClose | BlockquoteClose | BulletListClose
            | OrderedListClose | ListItemClose | TableClose | TheadClose | TbodyClose
            | TrClose | ThClose | TdClose | FootnoteClose | DlClose | DtClose | DdClose
            | AdmonitionClose | ContainerClose | LinkClose | StrongClose | EmClose | SClose
            | MarkClose | InsClose | SubClose | SupClose => Nesting::Close,
            _ if self.closing().is_some() => Nesting::Open,
            _ => Nesting::Atomic,
        }
    }

    /// Whether tokens of this kind live inside an inline run.
    pub fn is_inline(self) -> bool {
        use TokenKind::*;
        matches!(
            self,
            Text | Softbreak
                | Hardbreak
                | CodeInline
                | HtmlInline
                | MathInline
                | LinkOpen
                | LinkClose
                | Image
                | StrongOpen
                | StrongClose
                | EmOpen
                | EmClose
                | SOpen
                | SClose
                | MarkOpen
                | MarkClose
                | InsOpen
                | InsClose
                | SubOpen
                | SubClose
                | SupOpen
                | SupClose
                | FootnoteRef
                | FootnoteAnchor
        )
    }
}

/// Attribute payload of a `::: name {…}` container opening line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContainerAttrs {
    /// Parsed as JSON or as a loose object literal
    Object(serde_json::Map<String, serde_json::Value>),
    /// Neither parser accepted it
    Raw(String),
}

/// Free-form extension data attached to a token.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenMeta {
    /// Whether the terminator of a fence/container/math block was seen
    pub closed: Option<bool>,
    /// Set on tokens synthesized for a construct still being typed
    pub loading: bool,
    /// Bare arguments after a container name
    pub args: Option<String>,
    /// Attribute payload of a container
    pub attrs: Option<ContainerAttrs>,
    /// Code block came from indentation rather than a fence
    pub indented: bool,
}

/// A single token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    /// Token type
    pub kind: TokenKind,
    /// HTML-ish tag name (`h2`, `th`, `span`)
    pub tag: String,
    /// Text payload
    pub content: String,
    /// Inline sub-tokens (only on [`TokenKind::Inline`])
    pub children: Vec<Token>,
    /// Literal delimiter text (`**`, a backtick run, a fence)
    pub markup: String,
    /// Fence info string or container name
    pub info: String,
    /// Source line span (block tokens)
    pub map: Option<LineSpan>,
    /// Ordered attributes
    pub attrs: Vec<(String, String)>,
    /// Extension data
    pub meta: TokenMeta,
}

impl Token {
    /// Create an empty token of the given kind.
    pub fn new(kind: TokenKind) -> Self {
        Self {
            kind,
            tag: String::new(),
            content: String::new(),
            children: Vec::new(),
            markup: String::new(),
            info: String::new(),
            map: None,
            attrs: Vec::new(),
            meta: TokenMeta::default(),
        }
    }

    /// Create a text token.
    pub fn text(content: impl Into<String>) -> Self {
        Self::new(TokenKind::Text).with_content(content)
    }

    /// Create an open/close delimiter token with its markup.
    pub fn delimiter(kind: TokenKind, markup: impl Into<String>) -> Self {
        Self::new(kind).with_markup(markup)
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn with_markup(mut self, markup: impl Into<String>) -> Self {
        self.markup = markup.into();
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    pub fn with_info(mut self, info: impl Into<String>) -> Self {
        self.info = info.into();
        self
    }

    pub fn with_map(mut self, map: Option<LineSpan>) -> Self {
        self.map = map;
        self
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    pub fn with_children(mut self, children: Vec<Token>) -> Self {
        self.children = children;
        self
    }

    /// Mark this token as a construct that is still being typed.
    pub fn loading(mut self, loading: bool) -> Self {
        self.meta.loading = loading;
        self
    }

    /// Look up an attribute value.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Set an attribute, replacing an existing value in place.
    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attrs.iter_mut().find(|(key, _)| *key == name) {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((name, value)),
        }
    }

    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }

    /// Approximate the markdown source this token came from.
    ///
    /// Used for a node's `raw` and when passes re-merge tokens into text.
    pub fn raw_text(&self) -> String {
        use TokenKind::*;
        match self.kind {
            Text | HtmlInline | HtmlBlock => self.content.clone(),
            Softbreak => "\n".to_string(),
            Hardbreak => {
                if self.markup.is_empty() {
                    "  \n".to_string()
                } else {
                    self.markup.clone()
                }
            }
            CodeInline | MathInline => format!("{}{}{}", self.markup, self.content, self.markup),
            LinkOpen => "[".to_string(),
            LinkClose => self.markup.clone(),
            Image => {
                let src = self.attr("src").unwrap_or_default();
                format!("![{}]({})", self.content, src)
            }
            FootnoteRef => format!("[^{}]", self.content),
            FootnoteAnchor => String::new(),
            Inline => self.children.iter().map(Token::raw_text).collect(),
            _ if self.kind.is_inline() => self.markup.clone(),
            _ => self.content.clone(),
        }
    }
}

/// Concatenate the raw text of a run of tokens.
pub fn raw_of(tokens: &[Token]) -> String {
    tokens.iter().map(Token::raw_text).collect()
}
