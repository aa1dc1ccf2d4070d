//! Block pre-scanner for constructs the markdown tokenizer has no grammar
//! for: `::: name` containers and standalone `$$` / `\[` math blocks.
//!
//! The scanner splits the source into segments. Plain markdown segments go
//! to the tokenizer untouched; container bodies are tokenized recursively.

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;
use streamtree_core::{ContainerAttrs, LineSpan};

/// `::: name rest`, up to three spaces of indentation.
static CONTAINER_OPEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ {0,3}(:{3,})[ \t]*([A-Za-z][\w-]*)(.*)$").unwrap());

/// A bare `:::` line.
static CONTAINER_CLOSE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ {0,3}:{3,}[ \t]*$").unwrap());

/// Opening code fence: indentation, fence run, info.
static FENCE_OPEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ {0,3}(`{3,}[^`]*|~{3,}.*)$").unwrap());

/// Which block kinds the scanner looks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ScanOptions {
    pub containers: bool,
    pub math: bool,
}

/// A parsed `::: name args {attrs}` opening line.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerOpening {
    pub name: String,
    pub args: String,
    pub attrs: Option<ContainerAttrs>,
}

#[derive(Debug)]
pub(crate) struct ContainerBlock<'a> {
    pub opening: ContainerOpening,
    pub marker: &'a str,
    pub body: &'a str,
    pub body_line: usize,
    pub span: LineSpan,
    pub closed: bool,
    pub raw: &'a str,
}

#[derive(Debug)]
pub(crate) struct MathBlockSpan<'a> {
    pub content: String,
    pub markup: &'static str,
    pub span: LineSpan,
    pub closed: bool,
    pub raw: &'a str,
}

#[derive(Debug)]
pub(crate) enum Segment<'a> {
    Markdown { text: &'a str, line: usize },
    Container(ContainerBlock<'a>),
    Math(MathBlockSpan<'a>),
}

/// Source lines with their byte ranges. `end` excludes the newline,
/// `next` is where the following line starts.
struct Lines<'a> {
    text: &'a str,
    ranges: Vec<(usize, usize, usize)>,
}

impl<'a> Lines<'a> {
    fn new(text: &'a str) -> Self {
        let mut ranges = Vec::new();
        let mut start = 0;
        for piece in text.split_inclusive('\n') {
            let next = start + piece.len();
            let end = if piece.ends_with('\n') { next - 1 } else { next };
            ranges.push((start, end, next));
            start = next;
        }
        Self { text, ranges }
    }

    fn len(&self) -> usize {
        self.ranges.len()
    }

    fn line(&self, i: usize) -> &'a str {
        let (start, end, _) = self.ranges[i];
        &self.text[start..end]
    }

    /// Source covering lines `[from, to)`, newlines included.
    fn slice(&self, from: usize, to: usize) -> &'a str {
        if from >= to || from >= self.len() {
            return "";
        }
        let start = self.ranges[from].0;
        let end = self.ranges[to.min(self.len()) - 1].2;
        &self.text[start..end]
    }
}

/// Fence state while skipping code: fence char and run length.
type Fence = (char, usize);

fn fence_open(line: &str) -> Option<Fence> {
    let caps = FENCE_OPEN_RE.captures(line)?;
    let run = caps.get(1)?.as_str().trim_start();
    let c = run.chars().next()?;
    Some((c, run.chars().take_while(|&ch| ch == c).count()))
}

fn fence_closes(line: &str, (c, len): Fence) -> bool {
    let trimmed = line.trim();
    trimmed.len() >= len && trimmed.chars().all(|ch| ch == c)
}

/// Split `text` into markdown, container and math segments.
pub(crate) fn split_blocks(text: &str, first_line: usize, scan: ScanOptions) -> Vec<Segment<'_>> {
    let lines = Lines::new(text);
    if !scan.containers && !scan.math {
        return vec![Segment::Markdown {
            text,
            line: first_line,
        }];
    }

    let mut segments = Vec::new();
    let mut markdown_from = 0;
    let mut fence: Option<Fence> = None;
    let mut i = 0;

    while i < lines.len() {
        let line = lines.line(i);

        if let Some(open) = fence {
            if fence_closes(line, open) {
                fence = None;
            }
            i += 1;
            continue;
        }
        if let Some(open) = fence_open(line) {
            fence = Some(open);
            i += 1;
            continue;
        }

        let found = if scan.containers {
            scan_container(&lines, i, first_line)
        } else {
            None
        };
        let found = match found {
            Some(found) => Some(found),
            None if scan.math => scan_math(&lines, i, first_line),
            None => None,
        };

        match found {
            Some((segment, next)) => {
                push_markdown(&mut segments, &lines, markdown_from, i, first_line);
                segments.push(segment);
                i = next;
                markdown_from = next;
            }
            None => i += 1,
        }
    }

    push_markdown(&mut segments, &lines, markdown_from, lines.len(), first_line);
    segments
}

fn push_markdown<'a>(
    segments: &mut Vec<Segment<'a>>,
    lines: &Lines<'a>,
    from: usize,
    to: usize,
    first_line: usize,
) {
    let text = lines.slice(from, to);
    if !text.is_empty() {
        segments.push(Segment::Markdown {
            text,
            line: first_line + from,
        });
    }
}

fn scan_container<'a>(
    lines: &Lines<'a>,
    at: usize,
    first_line: usize,
) -> Option<(Segment<'a>, usize)> {
    let caps = CONTAINER_OPEN_RE.captures(lines.line(at))?;
    let marker = caps.get(1)?.as_str();
    let name = caps.get(2)?.as_str();
    let rest = caps.get(3).map_or("", |m| m.as_str());
    let opening = parse_opening(name, rest);

    let close = find_container_close(lines, at + 1);
    let body_end = close.unwrap_or(lines.len());
    let next = close.map_or(lines.len(), |c| c + 1);

    let block = ContainerBlock {
        opening,
        marker,
        body: lines.slice(at + 1, body_end),
        body_line: first_line + at + 1,
        span: LineSpan::new(at, next).offset(first_line),
        closed: close.is_some(),
        raw: lines.slice(at, next).trim_end_matches('\n'),
    };
    Some((Segment::Container(block), next))
}

/// Index of the `:::` line closing the container whose body starts at
/// `from`, honouring nested containers and fenced code.
fn find_container_close(lines: &Lines<'_>, from: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut fence: Option<Fence> = None;

    for j in from..lines.len() {
        let line = lines.line(j);
        if let Some(open) = fence {
            if fence_closes(line, open) {
                fence = None;
            }
            continue;
        }
        if let Some(open) = fence_open(line) {
            fence = Some(open);
        } else if CONTAINER_OPEN_RE.is_match(line) {
            depth += 1;
        } else if CONTAINER_CLOSE_RE.is_match(line) {
            if depth == 0 {
                return Some(j);
            }
            depth -= 1;
        }
    }
    None
}

fn scan_math<'a>(lines: &Lines<'a>, at: usize, first_line: usize) -> Option<(Segment<'a>, usize)> {
    let line = lines.line(at);
    let (markup, close, rest) = if let Some(rest) = line.strip_prefix("$$") {
        ("$$", "$$", rest)
    } else if let Some(rest) = line.strip_prefix("\\[") {
        ("\\[", "\\]", rest)
    } else {
        return None;
    };

    let mut content = Vec::new();
    let mut closed = false;
    let mut next = at + 1;

    let rest = rest.trim();
    if let Some(inner) = rest.strip_suffix(close) {
        // Whole block on one line.
        content.push(inner.trim());
        closed = true;
    } else if !rest.is_empty() {
        // `$$5` and friends are prose, not a block opener.
        return None;
    } else {
        for j in at + 1..lines.len() {
            next = j + 1;
            let current = lines.line(j).trim_end();
            if let Some(inner) = current.strip_suffix(close) {
                if !inner.trim().is_empty() {
                    content.push(inner.trim_end());
                }
                closed = true;
                break;
            }
            content.push(current);
        }
    }

    let block = MathBlockSpan {
        content: content.join("\n"),
        markup,
        span: LineSpan::new(at, next).offset(first_line),
        closed,
        raw: lines.slice(at, next).trim_end_matches('\n'),
    };
    Some((Segment::Math(block), next))
}

/// Parse what follows the name on an opening line into args and attrs.
pub fn parse_opening(name: &str, rest: &str) -> ContainerOpening {
    let (args, payload) = match find_payload(rest) {
        Some((start, end)) => {
            let args = rest[..start].trim().to_string();
            (args, Some(&rest[start..end]))
        }
        None => (rest.trim().to_string(), None),
    };

    ContainerOpening {
        name: name.to_string(),
        args,
        attrs: payload.map(parse_attrs),
    }
}

/// Byte range of the first `{…}` payload outside quotes. An unbalanced
/// payload runs to the end of the line.
fn find_payload(rest: &str) -> Option<(usize, usize)> {
    let mut quote: Option<char> = None;
    let mut depth = 0usize;
    let mut start = None;
    let mut escaped = false;

    for (i, c) in rest.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match (quote, c) {
            (Some(_), '\\') => escaped = true,
            (Some(q), _) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '{') => {
                if depth == 0 && start.is_none() {
                    start = Some(i);
                }
                depth += 1;
            }
            (None, '}') if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    return start.map(|s| (s, i + 1));
                }
            }
            _ => {}
        }
    }

    start.map(|s| (s, rest.len()))
}

/// Strict JSON, then the loose object grammar, then the raw string.
pub fn parse_attrs(payload: &str) -> ContainerAttrs {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(payload) {
        return ContainerAttrs::Object(map);
    }
    match parse_loose_object(payload) {
        Some(map) => ContainerAttrs::Object(map),
        None => {
            log::debug!("container attrs kept raw: {}", payload);
            ContainerAttrs::Raw(payload.to_string())
        }
    }
}

/// `{ key: value, 'other': "v", flag: true }` with scalar values only.
fn parse_loose_object(payload: &str) -> Option<Map<String, Value>> {
    let mut chars = payload.trim().chars().peekable();
    if chars.next()? != '{' {
        return None;
    }

    let mut map = Map::new();
    loop {
        skip_ws(&mut chars);
        match chars.peek()? {
            '}' => {
                chars.next();
                break;
            }
            ',' => {
                chars.next();
                continue;
            }
            _ => {}
        }

        let key = match chars.peek()? {
            '"' | '\'' => read_quoted(&mut chars)?,
            _ => read_ident(&mut chars)?,
        };

        skip_ws(&mut chars);
        match chars.next()? {
            ':' | '=' => {}
            _ => return None,
        }
        skip_ws(&mut chars);

        let value = match chars.peek()? {
            '"' | '\'' => Value::String(read_quoted(&mut chars)?),
            '{' | '[' => return None,
            _ => bare_value(&read_bare(&mut chars))?,
        };
        map.insert(key, value);

        skip_ws(&mut chars);
        match chars.next()? {
            ',' => continue,
            '}' => break,
            _ => return None,
        }
    }

    if chars.all(char::is_whitespace) {
        Some(map)
    } else {
        None
    }
}

type Chars<'a> = std::iter::Peekable<std::str::Chars<'a>>;

fn skip_ws(chars: &mut Chars<'_>) {
    while chars.next_if(|c| c.is_whitespace()).is_some() {}
}

fn read_quoted(chars: &mut Chars<'_>) -> Option<String> {
    let quote = chars.next()?;
    let mut out = String::new();
    loop {
        match chars.next()? {
            '\\' => out.push(chars.next()?),
            c if c == quote => return Some(out),
            c => out.push(c),
        }
    }
}

fn read_ident(chars: &mut Chars<'_>) -> Option<String> {
    let mut out = String::new();
    while let Some(c) = chars.next_if(|&c| c.is_alphanumeric() || matches!(c, '_' | '-' | '$')) {
        out.push(c);
    }
    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}

fn read_bare(chars: &mut Chars<'_>) -> String {
    let mut out = String::new();
    while let Some(c) = chars.next_if(|&c| c != ',' && c != '}') {
        out.push(c);
    }
    out.trim().to_string()
}

fn bare_value(word: &str) -> Option<Value> {
    if word.is_empty() {
        return None;
    }
    Some(match word {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        "null" => Value::Null,
        _ => match serde_json::from_str::<Value>(word) {
            Ok(number @ Value::Number(_)) => number,
            _ => Value::String(word.to_string()),
        },
    })
}
