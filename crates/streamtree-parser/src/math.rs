//! Math content normalisation.
//!
//! Math typed by a model often passes through a JSON string on its way
//! here, where `\f`, `\t`, `\b` and friends are read as escapes: `\frac`
//! arrives as form-feed + `rac`. Commands also lose their backslash
//! entirely (`frac{1}{2}`). Both are restored for the configured command
//! names.

use crate::matcher::MatcherCache;
use streamtree_config::MathOptions;

/// Control characters that stand in for a backslash plus a letter.
const CONTROL_ESCAPES: &[(char, char)] = &[
    ('\u{08}', 'b'),
    ('\u{0C}', 'f'),
    ('\t', 't'),
    ('\r', 'r'),
    ('\n', 'n'),
    ('\u{0B}', 'v'),
    ('\u{07}', 'a'),
];

pub fn normalize_math(content: &str, options: &MathOptions, matchers: &MatcherCache) -> String {
    let mut text = restore_control_escapes(content, &options.commands);

    if let Some(bare) = matchers.bare_commands(&options.commands) {
        // Each match consumes the char before the command, so adjacent
        // commands need a second sweep.
        for _ in 0..2 {
            let next = bare.replace_all(&text, "${1}\\${2}${3}").into_owned();
            if next == text {
                break;
            }
            text = next;
        }
    }

    if options.escape_exclamation {
        text = escape_exclamation(&text);
    }
    text
}

fn restore_control_escapes(content: &str, commands: &[String]) -> String {
    if !content.chars().any(|c| CONTROL_ESCAPES.iter().any(|(ctl, _)| *ctl == c)) {
        return content.to_string();
    }

    let mut out = String::with_capacity(content.len() + 8);
    for (at, c) in content.char_indices() {
        let letter = CONTROL_ESCAPES
            .iter()
            .find(|(ctl, _)| *ctl == c)
            .map(|(_, letter)| *letter);
        let Some(letter) = letter else {
            out.push(c);
            continue;
        };

        let tail: String = content[at + c.len_utf8()..]
            .chars()
            .take_while(|c| c.is_ascii_alphabetic())
            .collect();
        let word = format!("{}{}", letter, tail);
        if commands.iter().any(|cmd| *cmd == word) {
            out.push('\\');
            out.push(letter);
        } else {
            out.push(c);
        }
    }
    out
}

fn escape_exclamation(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev = None;
    for c in text.chars() {
        if c == '!' && prev != Some('\\') {
            out.push('\\');
        }
        out.push(c);
        prev = Some(c);
    }
    out
}
