//! Resolved per-call parse options.
//!
//! `ParseOptions` is what the parser actually reads. It is built from a
//! [`Config`](crate::Config) or constructed directly by callers, and is
//! passed explicitly to every parse call; there is no process-wide default.

use crate::features::FeaturesConfig;
use crate::sections::{default_admonitions, MathOptions};
use std::collections::BTreeSet;

/// Matcher cache capacity when none is configured.
pub const DEFAULT_CACHE_CAPACITY: u64 = 128;

/// Options for a single parse call.
///
/// # Example
///
/// ```
/// use streamtree_config::ParseOptions;
///
/// let options = ParseOptions::default()
///     .with_custom_html_tags(["thinking"])
///     .with_final(true);
/// assert!(options.is_custom_tag("THINKING"));
/// assert!(options.is_final);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    /// Tokenizer grammar extensions.
    pub features: FeaturesConfig,
    /// Lowercased tag names kept as structured nodes.
    pub custom_html_tags: BTreeSet<String>,
    /// Lowercased tag names forced to literal text. Overrides `custom_html_tags`.
    pub escape_html_tags: BTreeSet<String>,
    /// Unmatched strong delimiters stay literal; no mid-state guessing.
    pub require_closing_strong: bool,
    /// The caller guarantees no more text will arrive for this document.
    pub is_final: bool,
    /// Math normalisation settings.
    pub math: MathOptions,
    /// Lowercased container names rendered as admonitions.
    pub admonitions: BTreeSet<String>,
    /// Matcher cache capacity for parsers built from these options.
    pub cache_capacity: u64,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            features: FeaturesConfig::default(),
            custom_html_tags: BTreeSet::new(),
            escape_html_tags: BTreeSet::new(),
            require_closing_strong: false,
            is_final: false,
            math: MathOptions::default(),
            admonitions: lowercase_set(default_admonitions()),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl ParseOptions {
    pub fn with_final(mut self, is_final: bool) -> Self {
        self.is_final = is_final;
        self
    }

    pub fn with_require_closing_strong(mut self, strict: bool) -> Self {
        self.require_closing_strong = strict;
        self
    }

    pub fn with_custom_html_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.custom_html_tags
            .extend(tags.into_iter().map(|t| t.as_ref().to_lowercase()));
        self
    }

    pub fn with_escape_html_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.escape_html_tags
            .extend(tags.into_iter().map(|t| t.as_ref().to_lowercase()));
        self
    }

    pub fn with_features(mut self, features: FeaturesConfig) -> Self {
        self.features = features;
        self
    }

    pub fn with_math(mut self, math: MathOptions) -> Self {
        self.math = math;
        self
    }

    /// Whether `tag` should become a `custom_tag` node.
    pub fn is_custom_tag(&self, tag: &str) -> bool {
        let tag = tag.to_lowercase();
        self.custom_html_tags.contains(&tag) && !self.escape_html_tags.contains(&tag)
    }

    /// Whether `tag` must be rendered as literal text.
    pub fn is_escaped_tag(&self, tag: &str) -> bool {
        self.escape_html_tags.contains(&tag.to_lowercase())
    }

    /// Whether a container name is an admonition.
    pub fn is_admonition(&self, name: &str) -> bool {
        self.admonitions.contains(&name.to_lowercase())
    }
}

pub(crate) fn lowercase_set<I, S>(items: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    items
        .into_iter()
        .map(|s| s.as_ref().trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}
