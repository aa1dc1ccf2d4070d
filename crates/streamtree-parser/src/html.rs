//! Recognising single HTML tags inside `html_inline` / `html_block` text.

use crate::entities::decode_html_entities;
use regex::Regex;
use std::sync::LazyLock;

static TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*<(/)?\s*([A-Za-z][\w:-]*)((?:\s[^<>]*?)?)\s*(/)?>").unwrap()
});

static ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([A-Za-z_:@][\w:.@-]*)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#)
        .unwrap()
});

/// Elements that never have a closing tag.
const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagForm {
    Open,
    Close,
    /// `<x/>` or a void element
    SelfClosing,
}

/// A tag found at the start of some HTML text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlTag {
    /// Lowercased element name
    pub name: String,
    pub form: TagForm,
    /// Attributes in source order, values entity-decoded
    pub attrs: Vec<(String, String)>,
    /// Byte length of the tag text, including leading whitespace
    pub len: usize,
}

impl HtmlTag {
    pub fn is_open(&self) -> bool {
        self.form == TagForm::Open
    }
}

/// Parse the tag that starts `html`. Comments, doctypes and processing
/// instructions are not tags.
pub fn parse_tag(html: &str) -> Option<HtmlTag> {
    let caps = TAG.captures(html)?;
    let name = caps.get(2)?.as_str().to_lowercase();
    let closing = caps.get(1).is_some();
    let self_closing = caps.get(4).is_some() || is_void(&name);
    let form = match (closing, self_closing) {
        (true, _) => TagForm::Close,
        (false, true) => TagForm::SelfClosing,
        (false, false) => TagForm::Open,
    };
    let attrs = if closing {
        Vec::new()
    } else {
        parse_attrs(caps.get(3).map_or("", |m| m.as_str()))
    };
    Some(HtmlTag {
        name,
        form,
        attrs,
        len: caps.get(0).map_or(0, |m| m.end()),
    })
}

pub fn is_void(name: &str) -> bool {
    VOID_TAGS.contains(&name.to_ascii_lowercase().as_str())
}

/// Attribute list of a tag body. Bare attributes get an empty value.
pub fn parse_attrs(body: &str) -> Vec<(String, String)> {
    ATTR.captures_iter(body)
        .filter_map(|caps| {
            let name = caps.get(1)?.as_str().to_string();
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map_or(String::new(), |m| decode_html_entities(m.as_str()));
            Some((name, value))
        })
        .collect()
}
