//! Tokenizer adapter.
//!
//! Runs `pulldown-cmark` over the source and flattens its event stream
//! into the flat token shape the fixup passes and the builder work on:
//! `*_open`/`*_close` pairs for containers, one [`TokenKind::Inline`]
//! token per run of inline content, atomic tokens for everything else.
//! Block tokens carry line maps relative to the whole document.

use crate::container::{self, ContainerBlock, MathBlockSpan, ScanOptions, Segment};
use pulldown_cmark::{
    Alignment as CmAlignment, BlockQuoteKind, CodeBlockKind, CowStr, Event, HeadingLevel, Options,
    Parser, Tag, TagEnd,
};
use std::borrow::Cow;
use std::ops::Range;
use streamtree_config::{FeaturesConfig, ParseOptions};
use streamtree_core::{raw_of, LineSpan, Token, TokenKind};

/// Markdown tokenizer. Stateless; every call re-derives tokens from the
/// full text it is given.
#[derive(Debug, Clone, Copy, Default)]
pub struct Tokenizer;

impl Tokenizer {
    /// Create a new tokenizer.
    pub fn new() -> Self {
        Self
    }

    /// Tokenize a whole document.
    pub fn tokenize(&self, text: &str, options: &ParseOptions) -> Vec<Token> {
        let text = normalize_newlines(text);
        let tokens = self.tokenize_at(&text, 0, true, options);
        log::trace!("tokenized {} bytes into {} tokens", text.len(), tokens.len());
        tokens
    }

    /// Tokenize `text` as a single paragraph and return its inline children.
    pub fn tokenize_inline(&self, text: &str, options: &ParseOptions) -> Vec<Token> {
        let text = normalize_newlines(text);
        let tokens = Flattener::new(text.trim(), 0, options).run(&pulldown_options(&options.features));
        tokens
            .into_iter()
            .find(|t| t.is(TokenKind::Inline))
            .map(|t| t.children)
            .unwrap_or_default()
    }

    /// `ends_document` is false when more input is known to follow `text`,
    /// as for the body of a closed container.
    fn tokenize_at(
        &self,
        text: &str,
        first_line: usize,
        ends_document: bool,
        options: &ParseOptions,
    ) -> Vec<Token> {
        let scan = ScanOptions {
            containers: options.features.containers,
            math: options.features.math,
        };
        let cm_options = pulldown_options(&options.features);

        let segments = container::split_blocks(text, first_line, scan);
        // Index past which only blank markdown remains.
        let tail = segments
            .iter()
            .rposition(|segment| !is_blank(segment))
            .unwrap_or(0);

        let mut tokens = Vec::new();
        for (at, segment) in segments.into_iter().enumerate() {
            let last = ends_document && at >= tail;
            match segment {
                Segment::Markdown { text, line } => {
                    let flattener = Flattener::new(text, line, options).ending_document(last);
                    tokens.extend(flattener.run(&cm_options));
                }
                Segment::Container(block) => self.push_container(block, last, options, &mut tokens),
                Segment::Math(block) => {
                    tokens.push(math_block_token(block, last && !options.is_final));
                }
            }
        }
        tokens
    }

    fn push_container(
        &self,
        block: ContainerBlock<'_>,
        ends_document: bool,
        options: &ParseOptions,
        tokens: &mut Vec<Token>,
    ) {
        let ContainerBlock {
            opening,
            marker,
            body,
            body_line,
            span,
            closed,
            raw,
        } = block;

        let (open_kind, close_kind) = if options.is_admonition(&opening.name) {
            (TokenKind::AdmonitionOpen, TokenKind::AdmonitionClose)
        } else {
            (TokenKind::ContainerOpen, TokenKind::ContainerClose)
        };

        let mut open = Token::new(open_kind)
            .with_info(opening.name.to_lowercase())
            .with_markup(marker)
            .with_content(raw)
            .with_map(Some(span))
            .loading(!closed && ends_document && !options.is_final);
        open.meta.closed = Some(closed);
        if !opening.args.is_empty() {
            open.meta.args = Some(opening.args);
        }
        open.meta.attrs = opening.attrs;

        let mut close = Token::new(close_kind).with_markup(marker);
        close.meta.closed = Some(closed);

        tokens.push(open);
        tokens.extend(self.tokenize_at(body, body_line, ends_document && !closed, options));
        tokens.push(close);
    }
}

/// A markdown segment holding nothing but whitespace.
fn is_blank(segment: &Segment<'_>) -> bool {
    matches!(segment, Segment::Markdown { text, .. } if text.trim().is_empty())
}

/// `streaming` is true when the block may still grow.
fn math_block_token(block: MathBlockSpan<'_>, streaming: bool) -> Token {
    let mut token = Token::new(TokenKind::MathBlock)
        .with_content(block.content)
        .with_markup(block.markup)
        .with_info(block.raw)
        .with_map(Some(block.span))
        .loading(!block.closed && streaming);
    token.meta.closed = Some(block.closed);
    token
}

/// Tokenizer grammar extensions for the enabled features.
pub fn pulldown_options(features: &FeaturesConfig) -> Options {
    let mut options = Options::empty();
    let flags = [
        (features.tables, Options::ENABLE_TABLES),
        (features.footnotes, Options::ENABLE_FOOTNOTES),
        (features.strikethrough, Options::ENABLE_STRIKETHROUGH),
        (features.task_lists, Options::ENABLE_TASKLISTS),
        (features.math, Options::ENABLE_MATH),
        (features.definition_lists, Options::ENABLE_DEFINITION_LIST),
        (features.alerts, Options::ENABLE_GFM),
        (features.super_sub, Options::ENABLE_SUPERSCRIPT),
        (features.super_sub, Options::ENABLE_SUBSCRIPT),
    ];
    for (enabled, flag) in flags {
        if enabled {
            options.insert(flag);
        }
    }
    options
}

fn normalize_newlines(text: &str) -> Cow<'_, str> {
    if text.contains('\r') {
        Cow::Owned(text.replace("\r\n", "\n").replace('\r', "\n"))
    } else {
        Cow::Borrowed(text)
    }
}

/// Check if a character is CJK (Chinese, Japanese, Korean).
///
/// Used to decide whether a delimiter sits inside a word: CJK text has no
/// spaces between words, so a delimiter glued to CJK on the left is
/// intraword just like one glued to a letter.
pub fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{4E00}'..='\u{9FFF}' |   // CJK Unified Ideographs
        '\u{3400}'..='\u{4DBF}' |   // CJK Unified Ideographs Extension A
        '\u{20000}'..='\u{2A6DF}' | // CJK Unified Ideographs Extension B
        '\u{2A700}'..='\u{2B73F}' | // CJK Unified Ideographs Extension C
        '\u{2B740}'..='\u{2B81F}' | // CJK Unified Ideographs Extension D
        '\u{F900}'..='\u{FAFF}' |   // CJK Compatibility Ideographs
        '\u{3040}'..='\u{309F}' |   // Hiragana
        '\u{30A0}'..='\u{30FF}' |   // Katakana
        '\u{31F0}'..='\u{31FF}' |   // Katakana Phonetic Extensions
        '\u{AC00}'..='\u{D7AF}' |   // Hangul Syllables
        '\u{1100}'..='\u{11FF}'     // Hangul Jamo
    )
}

/// Whether `c` glues a following delimiter to the word before it.
pub fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || is_cjk(c)
}

// =============================================================================
// Event flattening
// =============================================================================

/// Inline content being collected for the current leaf block.
#[derive(Debug)]
struct InlineRun {
    children: Vec<Token>,
    start: usize,
    end: usize,
    /// Opened for loose inline content (tight list items and the like);
    /// closing it also emits the paragraph close.
    synthetic: bool,
}

#[derive(Debug)]
struct CodeDraft {
    fenced: Option<String>,
    content: String,
}

#[derive(Debug)]
struct ImageDraft {
    src: String,
    title: String,
    alt: String,
    /// Nested tags inside the alt text.
    depth: usize,
}

struct Flattener<'s> {
    source: &'s str,
    line_starts: Vec<usize>,
    first_line: usize,
    is_final: bool,
    /// Whether the end of `source` is the end of the input so far.
    ends_document: bool,
    /// Blockquote nesting depth.
    quotes: usize,
    out: Vec<Token>,
    run: Option<InlineRun>,
    code: Option<CodeDraft>,
    html: Option<String>,
    image: Option<ImageDraft>,
    /// Markup of open inline delimiters, innermost last.
    delimiters: Vec<String>,
    /// Destinations of open links, innermost last.
    links: Vec<(String, String)>,
    aligns: Vec<CmAlignment>,
    cell: usize,
    in_head: bool,
    tbody_open: bool,
    table_open: Option<usize>,
    last_item: Option<usize>,
}

impl<'s> Flattener<'s> {
    fn new(source: &'s str, first_line: usize, options: &ParseOptions) -> Self {
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self {
            source,
            line_starts,
            first_line,
            is_final: options.is_final,
            ends_document: true,
            quotes: 0,
            out: Vec::new(),
            run: None,
            code: None,
            html: None,
            image: None,
            delimiters: Vec::new(),
            links: Vec::new(),
            aligns: Vec::new(),
            cell: 0,
            in_head: false,
            tbody_open: false,
            table_open: None,
            last_item: None,
        }
    }

    fn ending_document(mut self, ends_document: bool) -> Self {
        self.ends_document = ends_document;
        self
    }

    fn run(mut self, options: &Options) -> Vec<Token> {
        if self.source.is_empty() {
            return Vec::new();
        }
        let parser = Parser::new_ext(self.source, *options).into_offset_iter();
        for (event, range) in parser {
            self.event(event, range);
        }
        self.close_synthetic();
        self.out
    }

    fn event(&mut self, event: Event<'s>, range: Range<usize>) {
        match event {
            Event::Start(tag) => self.start(tag, range),
            Event::End(tag) => self.end(tag, range),
            Event::Text(text) => self.text(text, range),
            Event::Code(code) => {
                let markup = self.leading_run(range.start, '`');
                let token = Token::new(TokenKind::CodeInline)
                    .with_content(code.into_string())
                    .with_markup(markup);
                self.push_inline(token, range);
            }
            Event::InlineMath(math) => {
                let token = Token::new(TokenKind::MathInline)
                    .with_content(math.into_string())
                    .with_markup("$");
                self.push_inline(token, range);
            }
            Event::DisplayMath(math) => {
                let token = Token::new(TokenKind::MathInline)
                    .with_content(math.into_string())
                    .with_markup("$$");
                self.push_inline(token, range);
            }
            Event::Html(html) => match self.html.as_mut() {
                Some(block) => block.push_str(&html),
                None => {
                    let token = Token::new(TokenKind::HtmlInline).with_content(html.into_string());
                    self.push_inline(token, range);
                }
            },
            Event::InlineHtml(html) => {
                let token = Token::new(TokenKind::HtmlInline).with_content(html.into_string());
                self.push_inline(token, range);
            }
            Event::FootnoteReference(label) => {
                let token = Token::new(TokenKind::FootnoteRef).with_content(label.into_string());
                self.push_inline(token, range);
            }
            Event::SoftBreak => {
                if self.image.is_some() {
                    self.push_alt(" ");
                } else {
                    self.push_inline(Token::new(TokenKind::Softbreak), range);
                }
            }
            Event::HardBreak => {
                let markup = self.source[range.clone()].to_string();
                self.push_inline(Token::new(TokenKind::Hardbreak).with_markup(markup), range);
            }
            Event::Rule => {
                self.close_synthetic();
                let markup = self.source[range.clone()].trim().to_string();
                let token = Token::new(TokenKind::Hr)
                    .with_tag("hr")
                    .with_markup(markup)
                    .with_map(self.span(&range));
                self.out.push(token);
            }
            Event::TaskListMarker(checked) => {
                if let Some(idx) = self.last_item {
                    self.out[idx].set_attr("checked", checked.to_string());
                }
            }
            #[allow(unreachable_patterns)]
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'s>, range: Range<usize>) {
        if let Some(image) = self.image.as_mut() {
            image.depth += 1;
            return;
        }

        match tag {
            Tag::Paragraph => {
                self.close_synthetic();
                self.open_block(TokenKind::ParagraphOpen, "p", "", &range);
                self.begin_run(range.start, false);
            }
            Tag::Heading { level, .. } => {
                self.close_synthetic();
                let level = heading_level(level);
                let markup = "#".repeat(level);
                self.open_block(TokenKind::HeadingOpen, &format!("h{}", level), &markup, &range);
                self.begin_run(range.start, false);
            }
            Tag::BlockQuote(kind) => {
                self.close_synthetic();
                self.quotes += 1;
                self.open_block(TokenKind::BlockquoteOpen, "blockquote", ">", &range);
                if let Some(kind) = kind {
                    if let Some(last) = self.out.last_mut() {
                        last.set_attr("alert", alert_name(kind));
                    }
                }
            }
            Tag::CodeBlock(kind) => {
                self.close_synthetic();
                let fenced = match kind {
                    CodeBlockKind::Fenced(info) => Some(info.into_string()),
                    CodeBlockKind::Indented => None,
                };
                self.code = Some(CodeDraft {
                    fenced,
                    content: String::new(),
                });
            }
            Tag::HtmlBlock => {
                self.close_synthetic();
                self.html = Some(String::new());
            }
            Tag::List(Some(start)) => {
                self.close_synthetic();
                let markup = self.ordered_delimiter(range.start);
                self.open_block(TokenKind::OrderedListOpen, "ol", &markup, &range);
                if let Some(last) = self.out.last_mut() {
                    last.set_attr("start", start.to_string());
                }
            }
            Tag::List(None) => {
                self.close_synthetic();
                let markup = self.source[range.start..]
                    .trim_start()
                    .chars()
                    .next()
                    .map(String::from)
                    .unwrap_or_default();
                self.open_block(TokenKind::BulletListOpen, "ul", &markup, &range);
            }
            Tag::Item => {
                self.close_synthetic();
                self.open_block(TokenKind::ListItemOpen, "li", "", &range);
                self.last_item = Some(self.out.len() - 1);
            }
            Tag::FootnoteDefinition(label) => {
                self.close_synthetic();
                self.open_block(TokenKind::FootnoteOpen, "section", "", &range);
                if let Some(last) = self.out.last_mut() {
                    last.set_attr("id", label.into_string());
                }
            }
            Tag::DefinitionList => {
                self.close_synthetic();
                self.open_block(TokenKind::DlOpen, "dl", "", &range);
            }
            Tag::DefinitionListTitle => {
                self.close_synthetic();
                self.open_block(TokenKind::DtOpen, "dt", "", &range);
                self.begin_run(range.start, false);
            }
            Tag::DefinitionListDefinition => {
                self.close_synthetic();
                self.open_block(TokenKind::DdOpen, "dd", ":", &range);
            }
            Tag::Table(aligns) => {
                self.close_synthetic();
                self.aligns = aligns;
                self.tbody_open = false;
                self.open_block(TokenKind::TableOpen, "table", "", &range);
                self.table_open = Some(self.out.len() - 1);
            }
            Tag::TableHead => {
                self.in_head = true;
                self.cell = 0;
                self.out.push(Token::new(TokenKind::TheadOpen).with_tag("thead"));
                self.out.push(Token::new(TokenKind::TrOpen).with_tag("tr"));
            }
            Tag::TableRow => {
                if !self.tbody_open {
                    self.tbody_open = true;
                    self.out.push(Token::new(TokenKind::TbodyOpen).with_tag("tbody"));
                }
                self.cell = 0;
                self.out.push(Token::new(TokenKind::TrOpen).with_tag("tr"));
            }
            Tag::TableCell => {
                let (kind, tag) = if self.in_head {
                    (TokenKind::ThOpen, "th")
                } else {
                    (TokenKind::TdOpen, "td")
                };
                let mut token = Token::new(kind).with_tag(tag);
                if let Some(align) = self.aligns.get(self.cell).and_then(|a| align_style(*a)) {
                    token.set_attr("style", align);
                }
                self.out.push(token);
                self.begin_run(range.start, false);
            }
            Tag::Emphasis => {
                let markup = self.source[range.start..].chars().take(1).collect::<String>();
                self.open_delimiter(TokenKind::EmOpen, markup, range);
            }
            Tag::Strong => {
                let markup = self.source[range.start..].chars().take(2).collect::<String>();
                self.open_delimiter(TokenKind::StrongOpen, markup, range);
            }
            Tag::Strikethrough => {
                let markup = self.leading_run(range.start, '~');
                self.open_delimiter(TokenKind::SOpen, markup, range);
            }
            Tag::Superscript => self.open_delimiter(TokenKind::SupOpen, "^".to_string(), range),
            Tag::Subscript => self.open_delimiter(TokenKind::SubOpen, "~".to_string(), range),
            Tag::Link {
                dest_url, title, ..
            } => {
                let mut token = Token::new(TokenKind::LinkOpen).with_attr("href", dest_url.to_string());
                if !title.is_empty() {
                    token.set_attr("title", title.to_string());
                }
                self.links.push((dest_url.into_string(), title.into_string()));
                self.push_inline(token, range);
            }
            Tag::Image {
                dest_url, title, ..
            } => {
                self.image = Some(ImageDraft {
                    src: dest_url.into_string(),
                    title: title.into_string(),
                    alt: String::new(),
                    depth: 0,
                });
            }
            #[allow(unreachable_patterns)]
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd, range: Range<usize>) {
        if self.image.is_some() {
            self.end_in_image(tag, range);
            return;
        }

        match tag {
            TagEnd::Paragraph => {
                self.finish_run();
                self.out.push(Token::new(TokenKind::ParagraphClose).with_tag("p"));
            }
            TagEnd::Heading(level) => {
                self.finish_run();
                let level = heading_level(level);
                self.out
                    .push(Token::new(TokenKind::HeadingClose).with_tag(format!("h{}", level)));
            }
            TagEnd::BlockQuote(_) => {
                self.quotes = self.quotes.saturating_sub(1);
                self.close_block(TokenKind::BlockquoteClose, "blockquote");
            }
            TagEnd::CodeBlock => self.emit_code(range),
            TagEnd::HtmlBlock => {
                let content = self.html.take().unwrap_or_default();
                let token = Token::new(TokenKind::HtmlBlock)
                    .with_content(content)
                    .with_map(self.span(&range));
                self.out.push(token);
            }
            TagEnd::List(true) => self.close_block(TokenKind::OrderedListClose, "ol"),
            TagEnd::List(false) => self.close_block(TokenKind::BulletListClose, "ul"),
            TagEnd::Item => self.close_block(TokenKind::ListItemClose, "li"),
            TagEnd::FootnoteDefinition => self.close_block(TokenKind::FootnoteClose, "section"),
            TagEnd::DefinitionList => self.close_block(TokenKind::DlClose, "dl"),
            TagEnd::DefinitionListTitle => {
                self.finish_run();
                self.out.push(Token::new(TokenKind::DtClose).with_tag("dt"));
            }
            TagEnd::DefinitionListDefinition => self.close_block(TokenKind::DdClose, "dd"),
            TagEnd::Table => {
                if self.tbody_open {
                    self.out.push(Token::new(TokenKind::TbodyClose).with_tag("tbody"));
                    self.tbody_open = false;
                }
                self.out.push(Token::new(TokenKind::TableClose).with_tag("table"));
                let loading = !self.is_final && self.table_is_open_ended(&range);
                if let Some(idx) = self.table_open.take() {
                    self.out[idx].meta.loading = loading;
                }
            }
            TagEnd::TableHead => {
                self.in_head = false;
                self.out.push(Token::new(TokenKind::TrClose).with_tag("tr"));
                self.out.push(Token::new(TokenKind::TheadClose).with_tag("thead"));
            }
            TagEnd::TableRow => self.out.push(Token::new(TokenKind::TrClose).with_tag("tr")),
            TagEnd::TableCell => {
                self.finish_run();
                let (kind, tag) = if self.in_head {
                    (TokenKind::ThClose, "th")
                } else {
                    (TokenKind::TdClose, "td")
                };
                self.out.push(Token::new(kind).with_tag(tag));
                self.cell += 1;
            }
            TagEnd::Emphasis => self.close_delimiter(TokenKind::EmClose, range),
            TagEnd::Strong => self.close_delimiter(TokenKind::StrongClose, range),
            TagEnd::Strikethrough => self.close_delimiter(TokenKind::SClose, range),
            TagEnd::Superscript => self.close_delimiter(TokenKind::SupClose, range),
            TagEnd::Subscript => self.close_delimiter(TokenKind::SubClose, range),
            TagEnd::Link => {
                let (href, title) = self.links.pop().unwrap_or_default();
                let markup = if title.is_empty() {
                    format!("]({})", href)
                } else {
                    format!("]({} \"{}\")", href, title)
                };
                self.push_inline(Token::new(TokenKind::LinkClose).with_markup(markup), range);
            }
            #[allow(unreachable_patterns)]
            _ => {}
        }
    }

    fn end_in_image(&mut self, tag: TagEnd, range: Range<usize>) {
        let nested = self.image.as_ref().map_or(0, |image| image.depth);
        if nested > 0 {
            if let Some(image) = self.image.as_mut() {
                image.depth -= 1;
            }
            return;
        }
        if !matches!(tag, TagEnd::Image) {
            return;
        }
        if let Some(image) = self.image.take() {
            let mut token = Token::new(TokenKind::Image)
                .with_tag("img")
                .with_content(image.alt)
                .with_attr("src", image.src);
            if !image.title.is_empty() {
                token.set_attr("title", image.title);
            }
            self.push_inline(token, range);
        }
    }

    fn text(&mut self, text: CowStr<'s>, range: Range<usize>) {
        if let Some(code) = self.code.as_mut() {
            code.content.push_str(&text);
            return;
        }
        if let Some(html) = self.html.as_mut() {
            html.push_str(&text);
            return;
        }
        if self.image.is_some() {
            self.push_alt(&text);
            return;
        }

        self.ensure_run(range.start);
        if let Some(run) = self.run.as_mut() {
            run.end = run.end.max(range.end);
            match run.children.last_mut() {
                Some(last) if last.is(TokenKind::Text) => last.content.push_str(&text),
                _ => run.children.push(Token::text(text.into_string())),
            }
        }
    }

    fn push_alt(&mut self, text: &str) {
        if let Some(image) = self.image.as_mut() {
            image.alt.push_str(text);
        }
    }

    fn push_inline(&mut self, token: Token, range: Range<usize>) {
        if self.image.is_some() {
            let text = token.raw_text();
            self.push_alt(&text);
            return;
        }
        self.ensure_run(range.start);
        if let Some(run) = self.run.as_mut() {
            run.end = run.end.max(range.end);
            run.children.push(token);
        }
    }

    fn open_delimiter(&mut self, kind: TokenKind, markup: String, range: Range<usize>) {
        self.delimiters.push(markup.clone());
        self.push_inline(Token::delimiter(kind, markup), range);
    }

    fn close_delimiter(&mut self, kind: TokenKind, range: Range<usize>) {
        let markup = self.delimiters.pop().unwrap_or_default();
        self.push_inline(Token::delimiter(kind, markup), range);
    }

    fn begin_run(&mut self, start: usize, synthetic: bool) {
        self.run = Some(InlineRun {
            children: Vec::new(),
            start,
            end: start,
            synthetic,
        });
    }

    /// Open a paragraph for inline content that arrived outside one.
    fn ensure_run(&mut self, start: usize) {
        if self.run.is_none() {
            self.out.push(Token::new(TokenKind::ParagraphOpen).with_tag("p"));
            self.begin_run(start, true);
        }
    }

    fn finish_run(&mut self) {
        let Some(run) = self.run.take() else {
            return;
        };
        let map = self.span(&(run.start..run.end));
        let synthetic = run.synthetic;
        let token = Token::new(TokenKind::Inline)
            .with_content(raw_of(&run.children))
            .with_children(run.children)
            .with_map(map);

        if synthetic {
            if let Some(open) = self.out.iter_mut().rev().find(|t| t.is(TokenKind::ParagraphOpen)) {
                open.map = map;
            }
        }
        self.out.push(token);
        if synthetic {
            self.out.push(Token::new(TokenKind::ParagraphClose).with_tag("p"));
        }
    }

    fn close_synthetic(&mut self) {
        if self.run.as_ref().map_or(false, |run| run.synthetic) {
            self.finish_run();
        }
    }

    fn open_block(&mut self, kind: TokenKind, tag: &str, markup: &str, range: &Range<usize>) {
        let raw = self.source[range.clone()].trim_end_matches('\n').to_string();
        let token = Token::new(kind)
            .with_tag(tag)
            .with_markup(markup)
            .with_content(raw)
            .with_map(self.span(range));
        self.out.push(token);
    }

    fn close_block(&mut self, kind: TokenKind, tag: &str) {
        self.close_synthetic();
        self.out.push(Token::new(kind).with_tag(tag));
    }

    fn emit_code(&mut self, range: Range<usize>) {
        let Some(draft) = self.code.take() else {
            return;
        };
        let raw = &self.source[range.clone()];
        let map = self.span(&range);

        let token = match draft.fenced {
            Some(info) => {
                let opening = raw.lines().next().unwrap_or_default();
                let indent = opening.len() - opening.trim_start().len();
                let fence_char = opening.trim_start().chars().next().unwrap_or('`');
                let fence_len = self.leading_run(range.start + indent, fence_char).chars().count();
                let closed = fence_is_closed(raw, fence_char, fence_len, self.quotes);
                let settled = closed || self.is_final || !self.at_end(&range);
                let content = if closed {
                    draft.content
                } else {
                    strip_partial_fence(&draft.content, fence_char, fence_len)
                };

                let mut token = Token::new(TokenKind::Fence)
                    .with_tag("code")
                    .with_info(info.trim())
                    .with_markup(fence_char.to_string().repeat(fence_len))
                    .with_content(content)
                    .with_map(map)
                    .loading(!settled);
                token.meta.closed = Some(closed);
                token.meta.indented = indent > 0;
                token
            }
            None => Token::new(TokenKind::CodeBlock)
                .with_tag("code")
                .with_markup("    ")
                .with_content(draft.content)
                .with_map(map),
        };
        self.out.push(token);
    }

    /// A table is still growing while nothing but whitespace follows it and
    /// that whitespace holds no blank line.
    /// True when nothing but whitespace follows `range` in the input.
    fn at_end(&self, range: &Range<usize>) -> bool {
        self.ends_document && self.source[range.end.min(self.source.len())..].trim().is_empty()
    }

    fn table_is_open_ended(&self, range: &Range<usize>) -> bool {
        if !self.at_end(range) {
            return false;
        }
        let tail = &self.source[range.start..];
        let newlines = tail
            .chars()
            .rev()
            .take_while(|c| c.is_whitespace())
            .filter(|&c| c == '\n')
            .count();
        newlines < 2
    }

    fn leading_run(&self, at: usize, c: char) -> String {
        self.source[at.min(self.source.len())..]
            .chars()
            .take_while(|&ch| ch == c)
            .collect()
    }

    fn ordered_delimiter(&self, at: usize) -> String {
        self.source[at..]
            .trim_start()
            .chars()
            .find(|c| !c.is_ascii_digit())
            .filter(|c| *c == '.' || *c == ')')
            .unwrap_or('.')
            .to_string()
    }

    fn line_of(&self, offset: usize) -> usize {
        self.line_starts
            .partition_point(|&start| start <= offset)
            .saturating_sub(1)
    }

    fn span(&self, range: &Range<usize>) -> Option<LineSpan> {
        let start = self.line_of(range.start);
        let end = self.line_of(range.end.saturating_sub(1).max(range.start)) + 1;
        Some(LineSpan::new(start, end).offset(self.first_line))
    }
}

fn heading_level(level: HeadingLevel) -> usize {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

fn alert_name(kind: BlockQuoteKind) -> &'static str {
    match kind {
        BlockQuoteKind::Note => "note",
        BlockQuoteKind::Tip => "tip",
        BlockQuoteKind::Important => "important",
        BlockQuoteKind::Warning => "warning",
        BlockQuoteKind::Caution => "caution",
    }
}

fn align_style(align: CmAlignment) -> Option<&'static str> {
    match align {
        CmAlignment::None => None,
        CmAlignment::Left => Some("text-align:left"),
        CmAlignment::Center => Some("text-align:center"),
        CmAlignment::Right => Some("text-align:right"),
    }
}

/// Whether the last non-blank line of a fenced block is a closing fence.
fn fence_is_closed(raw: &str, fence_char: char, fence_len: usize, quotes: usize) -> bool {
    let lines: Vec<&str> = raw
        .lines()
        .map(|l| strip_quote_markers(l, quotes))
        .filter(|l| !l.trim().is_empty())
        .collect();
    if lines.len() < 2 {
        return false;
    }
    let last = lines[lines.len() - 1].trim();
    last.chars().count() >= fence_len && last.chars().all(|c| c == fence_char)
}

/// Drop a half-typed closing fence (fewer fence chars than the opening)
/// from the end of unclosed code.
/// Drop up to `depth` leading `>` markers from a quoted line.
fn strip_quote_markers(line: &str, depth: usize) -> &str {
    let mut rest = line;
    for _ in 0..depth {
        match rest.trim_start().strip_prefix('>') {
            Some(next) => rest = next,
            None => break,
        }
    }
    rest
}

fn strip_partial_fence(content: &str, fence_char: char, fence_len: usize) -> String {
    let body = content.trim_end_matches('\n');
    let (head, last) = match body.rfind('\n') {
        Some(i) => (&body[..i + 1], &body[i + 1..]),
        None => ("", body),
    };
    let trimmed = last.trim();
    let partial = !trimmed.is_empty()
        && trimmed.chars().count() < fence_len
        && trimmed.chars().all(|c| c == fence_char);
    if partial {
        head.to_string()
    } else {
        content.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenize(text: &str) -> Vec<Token> {
        Tokenizer::new().tokenize(text, &ParseOptions::default())
    }

    fn kinds(tokens: &[Token]) -> Vec<TokenKind> {
        tokens.iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_paragraph_shape() {
        let tokens = tokenize("hello *world*");
        assert_eq!(
            kinds(&tokens),
            vec![TokenKind::ParagraphOpen, TokenKind::Inline, TokenKind::ParagraphClose]
        );
        let children = kinds(&tokens[1].children);
        assert_eq!(
            children,
            vec![TokenKind::Text, TokenKind::EmOpen, TokenKind::Text, TokenKind::EmClose]
        );
        assert_eq!(tokens[1].children[1].markup, "*");
        assert_eq!(tokens[0].map, Some(LineSpan::new(0, 1)));
    }

    #[test]
    fn test_adjacent_text_is_merged() {
        let tokens = tokenize("[citation](http://url1");
        assert_eq!(tokens[1].children.len(), 1);
        assert_eq!(tokens[1].children[0].content, "[citation](http://url1");
    }

    #[test]
    fn test_tight_list_items_get_paragraphs() {
        let tokens = tokenize("- a\n- b\n");
        assert_eq!(
            kinds(&tokens),
            vec![
                TokenKind::BulletListOpen,
                TokenKind::ListItemOpen,
                TokenKind::ParagraphOpen,
                TokenKind::Inline,
                TokenKind::ParagraphClose,
                TokenKind::ListItemClose,
                TokenKind::ListItemOpen,
                TokenKind::ParagraphOpen,
                TokenKind::Inline,
                TokenKind::ParagraphClose,
                TokenKind::ListItemClose,
                TokenKind::BulletListClose,
            ]
        );
        assert_eq!(tokens[0].markup, "-");
    }

    #[test]
    fn test_ordered_list_start_and_task_marker() {
        let tokens = tokenize("3) done\n");
        assert!(tokens[0].is(TokenKind::OrderedListOpen));
        assert_eq!(tokens[0].attr("start"), Some("3"));
        assert_eq!(tokens[0].markup, ")");
        assert_eq!(tokens[1].attr("checked"), None);

        let tokens = tokenize("- [x] done\n");
        assert_eq!(tokens[1].attr("checked"), Some("true"));
    }

    #[test]
    fn test_fence_closed_and_open() {
        let tokens = tokenize("```rust\nfn main() {}\n```\n");
        assert!(tokens[0].is(TokenKind::Fence));
        assert_eq!(tokens[0].info, "rust");
        assert_eq!(tokens[0].meta.closed, Some(true));
        assert!(!tokens[0].meta.loading);

        let tokens = tokenize("```rust\nfn main() {}\n``");
        assert_eq!(tokens[0].meta.closed, Some(false));
        assert!(tokens[0].meta.loading);
        assert_eq!(tokens[0].content, "fn main() {}\n");
    }

    #[test]
    fn test_indented_code_block() {
        let tokens = tokenize("    let x = 1;\n");
        assert!(tokens[0].is(TokenKind::CodeBlock));
        assert_eq!(tokens[0].content, "let x = 1;\n");
    }

    #[test]
    fn test_table_tokens_and_loading() {
        let tokens = tokenize("| a | b |\n|:--|--:|\n| 1 | 2 |\n");
        assert!(tokens[0].is(TokenKind::TableOpen));
        assert!(tokens[0].meta.loading);
        let th = tokens.iter().find(|t| t.is(TokenKind::ThOpen)).unwrap();
        assert_eq!(th.attr("style"), Some("text-align:left"));

        let tokens = tokenize("| a | b |\n|---|---|\n| 1 | 2 |\n\n");
        assert!(!tokens[0].meta.loading);

        let tokens = tokenize("| a | b |\n|---|---|\n| 1 | 2 |\n\nafter");
        assert!(!tokens[0].meta.loading);
    }

    #[test]
    fn test_quoted_fence_closes() {
        let tokens = tokenize("> ```\n> code\n> ```\n\nafter paragraph");
        let fence = tokens.iter().find(|t| t.is(TokenKind::Fence)).unwrap();
        assert_eq!(fence.meta.closed, Some(true));
        assert!(!fence.meta.loading);

        let tokens = tokenize("> ```\n> code");
        let fence = tokens.iter().find(|t| t.is(TokenKind::Fence)).unwrap();
        assert!(fence.meta.loading);

        // The quote ended, so the fence can no longer grow.
        let tokens = tokenize("> ```\n> code\n\nafter");
        let fence = tokens.iter().find(|t| t.is(TokenKind::Fence)).unwrap();
        assert_eq!(fence.meta.closed, Some(false));
        assert!(!fence.meta.loading);
    }

    #[test]
    fn test_strip_quote_markers() {
        assert_eq!(strip_quote_markers("> > ```", 2).trim(), "```");
        assert_eq!(strip_quote_markers("> ```", 2).trim(), "```");
        assert_eq!(strip_quote_markers("```", 1), "```");
    }

    #[test]
    fn test_table_settles_at_segment_boundary() {
        let tokens = tokenize("::: tip\n| a |\n|---|\n| 1 |\n:::\n\nafter paragraph");
        let table = tokens.iter().find(|t| t.is(TokenKind::TableOpen)).unwrap();
        assert!(!table.meta.loading);

        let tokens = tokenize("| a |\n|---|\n| 1 |\n::: tip\nx\n:::\n\nafter");
        assert!(tokens[0].is(TokenKind::TableOpen));
        assert!(!tokens[0].meta.loading);

        let tokens = tokenize("::: tip\n| a |\n|---|\n| 1 |");
        let table = tokens.iter().find(|t| t.is(TokenKind::TableOpen)).unwrap();
        assert!(table.meta.loading);
    }

    #[test]
    fn test_math_block_in_closed_container_settles() {
        let tokens = tokenize("::: tip\n$$\na+b\n:::\n");
        let math = tokens.iter().find(|t| t.is(TokenKind::MathBlock));
        assert!(math.map_or(true, |t| !t.meta.loading));
    }

    #[test]
    fn test_image_alt_collected() {
        let tokens = tokenize("![a *b*](x.png \"t\")");
        let image = &tokens[1].children[0];
        assert!(image.is(TokenKind::Image));
        assert_eq!(image.content, "a b");
        assert_eq!(image.attr("src"), Some("x.png"));
        assert_eq!(image.attr("title"), Some("t"));
    }

    #[test]
    fn test_container_tokens() {
        let tokens = tokenize("::: warning Heads up\nbody\n");
        assert!(tokens[0].is(TokenKind::AdmonitionOpen));
        assert_eq!(tokens[0].info, "warning");
        assert_eq!(tokens[0].meta.args.as_deref(), Some("Heads up"));
        assert!(tokens[0].meta.loading);
        assert_eq!(tokens[2].map, Some(LineSpan::new(1, 2)));
        assert!(tokens.last().unwrap().is(TokenKind::AdmonitionClose));

        let tokens = tokenize("::: demo\nbody\n:::");
        assert!(tokens[0].is(TokenKind::ContainerOpen));
        assert!(!tokens[0].meta.loading);
    }

    #[test]
    fn test_math_block_token() {
        let tokens = tokenize("$$\na+b\n");
        assert!(tokens[0].is(TokenKind::MathBlock));
        assert_eq!(tokens[0].content, "a+b");
        assert!(tokens[0].meta.loading);
    }

    #[test]
    fn test_final_clears_loading() {
        let options = ParseOptions::default().with_final(true);
        let tokens = Tokenizer::new().tokenize("```\ncode", &options);
        assert_eq!(tokens[0].meta.closed, Some(false));
        assert!(!tokens[0].meta.loading);
    }

    #[test]
    fn test_tokenize_inline() {
        let children = Tokenizer::new().tokenize_inline("  a &amp; `b`", &ParseOptions::default());
        assert_eq!(children[0].content, "a & ");
        assert!(children[1].is(TokenKind::CodeInline));
    }

    #[test]
    fn test_strip_partial_fence() {
        assert_eq!(strip_partial_fence("a\n``", '`', 3), "a\n");
        assert_eq!(strip_partial_fence("a\nb", '`', 3), "a\nb");
        assert_eq!(strip_partial_fence("``", '`', 3), "");
    }

    #[test]
    fn test_is_cjk() {
        assert!(is_cjk('中'));
        assert!(is_cjk('日'));
        assert!(is_cjk('한'));
        assert!(is_cjk('あ'));
        assert!(!is_cjk('A'));
        assert!(!is_cjk('1'));
        assert!(is_word_char('司'));
        assert!(!is_word_char(' '));
    }

    #[test]
    fn test_crlf_normalized() {
        let tokens = tokenize("a\r\nb");
        assert_eq!(tokens[1].children.len(), 3);
    }
}
