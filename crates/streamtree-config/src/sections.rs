//! Smaller configuration sections: HTML tags, parse behaviour, math, containers.

use serde::{Deserialize, Serialize};

/// Inline/block HTML handling.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HtmlConfig {
    /// Tag names kept as structured `custom_tag` nodes instead of raw HTML.
    #[serde(default)]
    pub custom_tags: Vec<String>,

    /// Tag names always rendered as literal text. Wins over `custom_tags`.
    #[serde(default)]
    pub escape_tags: Vec<String>,
}

impl HtmlConfig {
    pub fn merge(&mut self, other: &HtmlConfig) {
        extend_unique(&mut self.custom_tags, &other.custom_tags);
        extend_unique(&mut self.escape_tags, &other.escape_tags);
    }
}

/// Parse-time behaviour switches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ParseConfig {
    /// Strict mode: unmatched strong delimiters stay literal.
    #[serde(default)]
    pub require_closing_strong: bool,

    /// Entries kept in the per-parser matcher cache.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: u64,
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            require_closing_strong: false,
            cache_capacity: default_cache_capacity(),
        }
    }
}

impl ParseConfig {
    pub fn merge(&mut self, other: &ParseConfig) {
        *self = other.clone();
    }
}

/// Math content normalisation.
///
/// LLM output frequently loses backslashes in front of TeX commands, either
/// outright (`frac{1}{2}`) or by having `\f`, `\t`, `\b`, `\r`, `\v` turned
/// into control characters by an intermediate string escape. Commands listed
/// here are restored when found in math content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MathOptions {
    /// TeX command names (without backslash) eligible for repair.
    #[serde(default = "default_math_commands")]
    pub commands: Vec<String>,

    /// Escape bare `!` as `\!`.
    #[serde(default)]
    pub escape_exclamation: bool,
}

impl Default for MathOptions {
    fn default() -> Self {
        Self {
            commands: default_math_commands(),
            escape_exclamation: false,
        }
    }
}

impl MathOptions {
    pub fn merge(&mut self, other: &MathOptions) {
        extend_unique(&mut self.commands, &other.commands);
        self.escape_exclamation = other.escape_exclamation;
    }
}

/// `::: name` container handling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainersConfig {
    /// Names rendered as admonitions; anything else is a generic container.
    #[serde(default = "default_admonitions")]
    pub admonitions: Vec<String>,
}

impl Default for ContainersConfig {
    fn default() -> Self {
        Self {
            admonitions: default_admonitions(),
        }
    }
}

impl ContainersConfig {
    pub fn merge(&mut self, other: &ContainersConfig) {
        extend_unique(&mut self.admonitions, &other.admonitions);
    }
}

fn extend_unique(into: &mut Vec<String>, from: &[String]) {
    for item in from {
        if !into.contains(item) {
            into.push(item.clone());
        }
    }
}

fn default_cache_capacity() -> u64 {
    crate::options::DEFAULT_CACHE_CAPACITY
}

pub(crate) fn default_math_commands() -> Vec<String> {
    [
        "frac", "dfrac", "tfrac", "sqrt", "text", "textbf", "mathrm", "mathbf", "mathbb",
        "mathcal", "boldsymbol", "times", "cdot", "cdots", "ldots", "div", "pm", "left",
        "right", "sum", "prod", "int", "iint", "oint", "lim", "log", "ln", "sin", "cos",
        "tan", "alpha", "beta", "gamma", "delta", "epsilon", "theta", "lambda", "mu", "pi",
        "rho", "sigma", "tau", "phi", "omega", "Delta", "Sigma", "Omega", "infty", "leq",
        "geq", "neq", "approx", "equiv", "partial", "nabla", "rightarrow", "Rightarrow",
        "leftarrow", "to", "begin", "end", "hat", "bar", "vec", "overline", "quad", "qquad",
        "binom", "vert", "forall", "exists", "in", "notin", "subset", "cup", "cap",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

pub(crate) fn default_admonitions() -> Vec<String> {
    [
        "admonition",
        "info",
        "warning",
        "error",
        "tip",
        "danger",
        "note",
        "caution",
        "important",
        "success",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
