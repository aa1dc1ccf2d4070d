//! Streamtree Config
//!
//! This crate handles configuration loading and management
//! for streamtree, supporting TOML configuration files, and resolves it
//! into the [`ParseOptions`] every parse call takes.
//!
//! # Overview
//!
//! Configuration is loaded from platform-specific locations:
//! - Linux: `~/.config/streamtree/config.toml`
//! - macOS: `~/Library/Application Support/streamtree/config.toml`
//! - Windows: `%APPDATA%\streamtree\config.toml`
//!
//! # Example
//!
//! ```no_run
//! use streamtree_config::Config;
//!
//! // Load config with defaults
//! let config = Config::load().unwrap();
//!
//! // Or load with an override file
//! let config = Config::load_with_override(Some("./custom.toml")).unwrap();
//! let options = config.options();
//! ```

mod features;
mod options;
mod sections;

pub use features::FeaturesConfig;
pub use options::{ParseOptions, DEFAULT_CACHE_CAPACITY};
pub use sections::{ContainersConfig, HtmlConfig, MathOptions, ParseConfig};

use options::lowercase_set;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use streamtree_core::{Result, StreamtreeError};

/// Default TOML configuration string.
const DEFAULT_TOML: &str = r#"[features]
Tables          = true
Footnotes       = true
Strikethrough   = true
TaskLists       = true
Math            = true
DefinitionLists = true
Containers      = true
HighlightMarks  = true
SuperSub        = false
Alerts          = true

[html]
CustomTags = []
EscapeTags = []

[parse]
RequireClosingStrong = false
CacheCapacity        = 128

[math]
EscapeExclamation = false

[containers]
Admonitions = ["admonition", "info", "warning", "error", "tip", "danger", "note", "caution", "important", "success"]
"#;

/// Main configuration structure.
///
/// Contains all configuration sections for streamtree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Grammar extensions
    #[serde(default)]
    pub features: FeaturesConfig,

    /// HTML tag handling
    #[serde(default)]
    pub html: HtmlConfig,

    /// Parse behaviour
    #[serde(default)]
    pub parse: ParseConfig,

    /// Math normalisation
    #[serde(default)]
    pub math: MathOptions,

    /// Container handling
    #[serde(default)]
    pub containers: ContainersConfig,
}

impl Config {
    /// Returns the default TOML configuration string.
    ///
    /// # Example
    ///
    /// ```
    /// use streamtree_config::Config;
    /// let toml = Config::default_toml();
    /// assert!(toml.contains("[features]"));
    /// assert!(toml.contains("[html]"));
    /// ```
    pub fn default_toml() -> &'static str {
        DEFAULT_TOML
    }

    /// Returns the platform-specific configuration file path.
    pub fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Returns the platform-specific configuration directory.
    pub fn config_dir() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "streamtree")
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Ensures the config file exists, creating it with defaults if not.
    ///
    /// # Returns
    ///
    /// The path to the config file.
    pub fn ensure_config_file() -> Result<PathBuf> {
        let config_dir = Self::config_dir()
            .ok_or_else(|| StreamtreeError::Config("Could not determine config directory".into()))?;

        std::fs::create_dir_all(&config_dir)?;

        let config_path = config_dir.join("config.toml");
        if !config_path.exists() {
            std::fs::write(&config_path, DEFAULT_TOML)?;
        }

        Ok(config_path)
    }

    /// Load configuration from the default platform-specific path.
    ///
    /// If no config file exists, returns the default configuration.
    pub fn load() -> Result<Self> {
        if let Some(config_path) = Self::config_path() {
            if config_path.exists() {
                return Self::load_from(&config_path);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| StreamtreeError::Config(format!("Parse error in {}: {}", path.display(), e)))
    }

    /// Load configuration with an optional override file or string.
    ///
    /// 1. Load the base config from the default location
    /// 2. If `override_config` names an existing file, load and merge it;
    ///    otherwise treat it as inline TOML
    ///
    /// # Example
    ///
    /// ```no_run
    /// use streamtree_config::Config;
    ///
    /// let config = Config::load_with_override(Some("[parse]\nRequireClosingStrong = true")).unwrap();
    /// assert!(config.parse.require_closing_strong);
    /// ```
    pub fn load_with_override(override_config: Option<&str>) -> Result<Self> {
        let mut config = Self::load()?;

        if let Some(override_str) = override_config {
            let override_path = Path::new(override_str);

            let override_toml = if override_path.exists() {
                std::fs::read_to_string(override_path)?
            } else {
                override_str.to_string()
            };

            let override_config: Config = toml::from_str(&override_toml)
                .map_err(|e| StreamtreeError::Config(format!("Override parse error: {}", e)))?;

            config.merge(&override_config);
        }

        Ok(config)
    }

    /// Merge another config into this one.
    ///
    /// Scalar values from `other` take precedence; tag and name lists are
    /// unioned.
    ///
    /// # Example
    ///
    /// ```
    /// use streamtree_config::Config;
    ///
    /// let mut base = Config::default();
    /// let override_config: Config = toml::from_str(r#"
    ///     [html]
    ///     CustomTags = ["thinking"]
    /// "#).unwrap();
    ///
    /// base.merge(&override_config);
    /// assert_eq!(base.html.custom_tags, vec!["thinking"]);
    /// ```
    pub fn merge(&mut self, other: &Config) {
        self.features.merge(&other.features);
        self.html.merge(&other.html);
        self.parse.merge(&other.parse);
        self.math.merge(&other.math);
        self.containers.merge(&other.containers);
    }

    /// Save configuration to a file.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| StreamtreeError::Config(format!("Serialization error: {}", e)))?;
        std::fs::write(path, toml_string)?;
        Ok(())
    }

    /// Resolve this config into per-call parse options.
    ///
    /// # Example
    ///
    /// ```
    /// use streamtree_config::Config;
    /// let options = Config::default().options();
    /// assert!(options.is_admonition("tip"));
    /// ```
    pub fn options(&self) -> ParseOptions {
        ParseOptions {
            features: self.features.clone(),
            custom_html_tags: lowercase_set(&self.html.custom_tags),
            escape_html_tags: lowercase_set(&self.html.escape_tags),
            require_closing_strong: self.parse.require_closing_strong,
            is_final: false,
            math: self.math.clone(),
            admonitions: lowercase_set(&self.containers.admonitions),
            cache_capacity: self.parse.cache_capacity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.features.tables);
        assert!(config.html.custom_tags.is_empty());
        assert!(!config.parse.require_closing_strong);
        assert_eq!(config.parse.cache_capacity, 128);
    }

    #[test]
    fn test_default_toml_matches_default() {
        let config: Config = toml::from_str(DEFAULT_TOML).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_merge() {
        let mut base = Config::default();

        let override_toml = r#"
            [html]
            CustomTags = ["thinking"]
            [parse]
            RequireClosingStrong = true
        "#;
        let override_config: Config = toml::from_str(override_toml).unwrap();

        base.merge(&override_config);
        assert_eq!(base.html.custom_tags, vec!["thinking"]);
        assert!(base.parse.require_closing_strong);
    }

    #[test]
    fn test_config_path() {
        // On CI/containers this might be None, so we just check it doesn't panic
        if let Some(p) = Config::config_path() {
            assert!(p.to_string_lossy().contains("streamtree"));
        }
    }

    #[test]
    fn test_options_resolution() {
        let mut config = Config::default();
        config.html.custom_tags = vec!["Thinking".into(), "script".into()];
        config.html.escape_tags = vec!["script".into()];
        let options = config.options();
        assert!(options.is_custom_tag("thinking"));
        assert!(!options.is_custom_tag("script"));
        assert!(options.is_escaped_tag("script"));
    }

    #[test]
    fn test_save_to_then_load_from() {
        let path = std::env::temp_dir().join(format!("streamtree-save-{}.toml", std::process::id()));
        let mut config = Config::default();
        config.html.custom_tags = vec!["thinking".into()];
        config.parse.cache_capacity = 16;

        config.save_to(&path).unwrap();
        let loaded = Config::load_from(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_roundtrip_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(config, parsed);
    }
}
