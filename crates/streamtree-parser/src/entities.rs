//! HTML entity decoding for text the tokenizer never sees as markdown:
//! container titles and attribute values of custom tags.

use std::collections::HashMap;
use std::sync::LazyLock;

/// Named entities, keyed without the surrounding `&`/`;`.
static HTML_ENTITIES: LazyLock<HashMap<&'static str, char>> = LazyLock::new(|| {
    let mut m = HashMap::new();
    // Markup
    m.insert("amp", '&');
    m.insert("lt", '<');
    m.insert("gt", '>');
    m.insert("quot", '"');
    m.insert("apos", '\'');
    m.insert("nbsp", '\u{a0}');
    // Typography
    m.insert("copy", '©');
    m.insert("reg", '®');
    m.insert("trade", '™');
    m.insert("mdash", '—');
    m.insert("ndash", '–');
    m.insert("hellip", '…');
    m.insert("laquo", '«');
    m.insert("raquo", '»');
    m.insert("bull", '•');
    m.insert("middot", '·');
    m.insert("deg", '°');
    m.insert("sect", '§');
    m.insert("para", '¶');
    // Arrows
    m.insert("larr", '←');
    m.insert("rarr", '→');
    m.insert("uarr", '↑');
    m.insert("darr", '↓');
    // Math
    m.insert("times", '×');
    m.insert("divide", '÷');
    m.insert("plusmn", '±');
    m.insert("ne", '≠');
    m.insert("le", '≤');
    m.insert("ge", '≥');
    m.insert("infin", '∞');
    // Currency
    m.insert("euro", '€');
    m.insert("pound", '£');
    m.insert("yen", '¥');
    m.insert("cent", '¢');
    m
});

/// Longest entity body we bother looking for.
const MAX_ENTITY_LEN: usize = 10;

/// Decode named and numeric HTML entities in one left-to-right pass.
///
/// Unknown or malformed entities are kept verbatim, so decoding is safe to
/// apply to text that was never escaped.
pub fn decode_html_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let mut result = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(amp) = rest.find('&') {
        result.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        let decoded = after
            .find(';')
            .filter(|&end| end > 0 && end <= MAX_ENTITY_LEN)
            .and_then(|end| decode_entity(&after[..end]).map(|c| (c, end)));

        match decoded {
            Some((c, end)) => {
                result.push(c);
                rest = &after[end + 1..];
            }
            None => {
                result.push('&');
                rest = after;
            }
        }
    }

    result.push_str(rest);
    result
}

fn decode_entity(body: &str) -> Option<char> {
    if let Some(num) = body.strip_prefix('#') {
        let codepoint = match num.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse::<u32>().ok()?,
        };
        return char::from_u32(codepoint).filter(|&c| c != '\0');
    }
    HTML_ENTITIES.get(body).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_entities() {
        assert_eq!(decode_html_entities("&copy;"), "©");
        assert_eq!(decode_html_entities("Q&amp;A"), "Q&A");
        assert_eq!(decode_html_entities("&lt;div&gt;"), "<div>");
    }

    #[test]
    fn test_numeric_entities() {
        assert_eq!(decode_html_entities("&#169;"), "©");
        assert_eq!(decode_html_entities("&#x00A9;"), "©");
        assert_eq!(decode_html_entities("&#0;"), "&#0;");
    }

    #[test]
    fn test_single_pass() {
        assert_eq!(decode_html_entities("&amp;amp;"), "&amp;");
    }

    #[test]
    fn test_unknown_kept() {
        assert_eq!(decode_html_entities("a & b"), "a & b");
        assert_eq!(decode_html_entities("&bogus; &"), "&bogus; &");
        assert_eq!(decode_html_entities("AT&T;"), "AT&T;");
    }
}
