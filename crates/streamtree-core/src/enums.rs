//! Small closed enums shared by tokens and nodes.

use serde::{Deserialize, Serialize};

/// Column alignment of a table cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    /// No explicit alignment
    #[default]
    None,
    /// `:---`
    Left,
    /// `:---:`
    Center,
    /// `---:`
    Right,
}

impl Alignment {
    /// Parse the `style="text-align:…"` value used on cell tokens.
    pub fn from_attr(value: &str) -> Self {
        match value.trim().trim_start_matches("text-align:").trim() {
            "left" => Alignment::Left,
            "center" => Alignment::Center,
            "right" => Alignment::Right,
            _ => Alignment::None,
        }
    }
}

impl std::fmt::Display for Alignment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Alignment::None => write!(f, "none"),
            Alignment::Left => write!(f, "left"),
            Alignment::Center => write!(f, "center"),
            Alignment::Right => write!(f, "right"),
        }
    }
}

/// How a token affects nesting depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Nesting {
    /// Opens a container (`*_open`)
    Open,
    /// Closes a container (`*_close`)
    Close,
    /// Stands alone
    Atomic,
}

impl std::fmt::Display for Nesting {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Nesting::Open => write!(f, "open"),
            Nesting::Close => write!(f, "close"),
            Nesting::Atomic => write!(f, "atomic"),
        }
    }
}
