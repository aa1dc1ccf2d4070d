//! Command-line interface for streamtree.

use clap::Parser;
use std::path::PathBuf;
use streamtree_config::ParseOptions;

/// streamtree - parse (possibly incomplete) markdown into a JSON node tree.
///
/// Each input is parsed as one document and its tree printed as JSON.
/// Without `--final` the input is treated as a stream snapshot that may
/// still grow, so unterminated constructs come back marked `loading`.
#[derive(Parser, Debug)]
#[command(
    name = "streamtree",
    version,
    about = "Parse streaming markdown into a JSON node tree",
    after_help = "Examples:\n  \
                  echo 'Hello **wor' | streamtree\n  \
                  streamtree --final README.md\n  \
                  streamtree --custom-tag thinking -c settings.toml reply.md\n  \
                  streamtree --stream chunk.md"
)]
pub struct Cli {
    /// Input files to parse (reads from stdin if not provided)
    #[arg(value_name = "FILE")]
    pub files: Vec<PathBuf>,

    /// Set the logging level (trace, debug, info, warn, error)
    #[arg(short = 'l', long = "loglevel", default_value = "warn")]
    pub log_level: String,

    /// Use a custom config file or inline TOML
    #[arg(short = 'c', long = "config")]
    pub config: Option<String>,

    /// The input is complete; no construct is reported as loading
    #[arg(long = "final")]
    pub is_final: bool,

    /// Re-parse every prefix of the input and report loading transitions
    #[arg(long = "stream")]
    pub stream: bool,

    /// Leave unmatched strong delimiters literal
    #[arg(long = "strict-strong")]
    pub strict_strong: bool,

    /// Keep this HTML tag as a structured node (repeatable)
    #[arg(long = "custom-tag", value_name = "TAG")]
    pub custom_tags: Vec<String>,

    /// Render this HTML tag as literal text (repeatable)
    #[arg(long = "escape-tag", value_name = "TAG")]
    pub escape_tags: Vec<String>,

    /// Pretty-print the JSON output
    #[arg(long = "pretty")]
    pub pretty: bool,

    /// Show configuration paths and exit
    #[arg(long = "paths")]
    pub show_paths: bool,

    /// Write the default config file if it does not exist and exit
    #[arg(long = "init-config")]
    pub init_config: bool,

    /// Write the resolved configuration to PATH and exit
    #[arg(long = "dump-config", value_name = "PATH")]
    pub dump_config: Option<PathBuf>,
}

impl Cli {
    /// Check if we should read from stdin.
    pub fn should_read_stdin(&self) -> bool {
        self.files.is_empty()
    }

    /// Layer the command-line switches over options resolved from config.
    pub fn apply(&self, mut options: ParseOptions) -> ParseOptions {
        if self.strict_strong {
            options = options.with_require_closing_strong(true);
        }
        options
            .with_custom_html_tags(&self.custom_tags)
            .with_escape_html_tags(&self.escape_tags)
            .with_final(self.is_final)
    }
}

/// Show paths information.
pub fn show_paths() {
    use streamtree_config::Config;

    let config_path = Config::config_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(not found)".to_string());

    println!("paths:");
    println!("  config                {}", config_path);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_default() {
        let cli = Cli::parse_from(["streamtree"]);
        assert!(cli.files.is_empty());
        assert_eq!(cli.log_level, "warn");
        assert!(!cli.is_final);
        assert!(!cli.stream);
        assert!(!cli.init_config);
        assert!(cli.dump_config.is_none());
        assert!(cli.should_read_stdin());
    }

    #[test]
    fn test_cli_config_actions() {
        let cli = Cli::parse_from(["streamtree", "--init-config"]);
        assert!(cli.init_config);

        let cli = Cli::parse_from(["streamtree", "--dump-config", "out.toml", "-c", "[parse]"]);
        assert_eq!(cli.dump_config, Some(PathBuf::from("out.toml")));
        assert_eq!(cli.config.as_deref(), Some("[parse]"));
    }

    #[test]
    fn test_cli_parse_with_file() {
        let cli = Cli::parse_from(["streamtree", "test.md"]);
        assert_eq!(cli.files, vec![PathBuf::from("test.md")]);
        assert!(!cli.should_read_stdin());
    }

    #[test]
    fn test_cli_parse_with_options() {
        let cli = Cli::parse_from([
            "streamtree",
            "-l",
            "debug",
            "--final",
            "--strict-strong",
            "--custom-tag",
            "thinking",
            "--custom-tag",
            "Aside",
            "--escape-tag",
            "script",
            "--pretty",
            "file.md",
        ]);
        assert_eq!(cli.log_level, "debug");
        assert!(cli.is_final);
        assert!(cli.strict_strong);
        assert!(cli.pretty);
        assert_eq!(cli.custom_tags, vec!["thinking", "Aside"]);
        assert_eq!(cli.escape_tags, vec!["script"]);
    }

    #[test]
    fn test_apply_layers_flags() {
        let cli = Cli::parse_from([
            "streamtree",
            "--final",
            "--strict-strong",
            "--custom-tag",
            "Aside",
            "--escape-tag",
            "script",
        ]);
        let options = cli.apply(ParseOptions::default());
        assert!(options.is_final);
        assert!(options.require_closing_strong);
        assert!(options.is_custom_tag("aside"));
        assert!(options.is_escaped_tag("script"));
    }

    #[test]
    fn test_apply_keeps_config_strictness() {
        let cli = Cli::parse_from(["streamtree"]);
        let options = cli.apply(ParseOptions::default().with_require_closing_strong(true));
        assert!(options.require_closing_strong);
        assert!(!options.is_final);
    }
}
