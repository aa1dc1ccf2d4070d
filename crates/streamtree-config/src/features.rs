//! Grammar extension flags.
//!
//! This module contains the `FeaturesConfig` struct which decides which
//! extensions the tokenizer adapter enables.

use serde::{Deserialize, Serialize};

/// Grammar extension flags.
///
/// Controls which markdown extensions the tokenizer recognises.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FeaturesConfig {
    /// GFM pipe tables.
    /// Default: true
    #[serde(default = "default_true")]
    pub tables: bool,

    /// `[^1]` footnote references and definitions.
    /// Default: true
    #[serde(default = "default_true")]
    pub footnotes: bool,

    /// `~~strike~~`.
    /// Default: true
    #[serde(default = "default_true")]
    pub strikethrough: bool,

    /// `- [x]` task list items.
    /// Default: true
    #[serde(default = "default_true")]
    pub task_lists: bool,

    /// `$inline$`, `$$display$$` and `\[ … \]` math.
    /// Default: true
    #[serde(default = "default_true")]
    pub math: bool,

    /// Term / `: definition` lists.
    /// Default: true
    #[serde(default = "default_true")]
    pub definition_lists: bool,

    /// `::: name` custom containers and admonitions.
    /// Default: true
    #[serde(default = "default_true")]
    pub containers: bool,

    /// `==highlight==` and `++insert++` marks.
    /// Default: true
    #[serde(default = "default_true")]
    pub highlight_marks: bool,

    /// `^super^` and `~sub~`.
    /// Default: false (conflicts with single-tilde usage in prose)
    #[serde(default)]
    pub super_sub: bool,

    /// GFM `> [!NOTE]` alerts rendered as admonitions.
    /// Default: true
    #[serde(default = "default_true")]
    pub alerts: bool,
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            tables: true,
            footnotes: true,
            strikethrough: true,
            task_lists: true,
            math: true,
            definition_lists: true,
            containers: true,
            highlight_marks: true,
            super_sub: false,
            alerts: true,
        }
    }
}

impl FeaturesConfig {
    /// Merge another FeaturesConfig into this one.
    ///
    /// All fields are copied from `other`; TOML cannot distinguish "unset"
    /// from "set to the default", so an override file restates what it keeps.
    pub fn merge(&mut self, other: &FeaturesConfig) {
        *self = other.clone();
    }

    /// Create a new FeaturesConfig with all extensions enabled.
    pub fn all_enabled() -> Self {
        Self {
            tables: true,
            footnotes: true,
            strikethrough: true,
            task_lists: true,
            math: true,
            definition_lists: true,
            containers: true,
            highlight_marks: true,
            super_sub: true,
            alerts: true,
        }
    }

    /// Create a new FeaturesConfig with plain CommonMark only.
    pub fn all_disabled() -> Self {
        Self {
            tables: false,
            footnotes: false,
            strikethrough: false,
            task_lists: false,
            math: false,
            definition_lists: false,
            containers: false,
            highlight_marks: false,
            super_sub: false,
            alerts: false,
        }
    }
}

fn default_true() -> bool {
    true
}
