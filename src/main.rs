//! streamtree - parse streaming markdown into a JSON node tree.
//!
//! This binary is a thin CLI over the streamtree library: it resolves
//! options from config and flags, parses files or stdin, and prints the
//! resulting tree as JSON.

mod cli;

use clap::Parser as ClapParser;
use cli::Cli;
use log::{debug, error, info, trace, LevelFilter};
use serde::Serialize;
use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;
use streamtree_config::{Config, ParseOptions};
use streamtree_core::{walk_all, Node};
use streamtree_parser::MarkdownParser;

fn main() {
    let cli = <Cli as ClapParser>::parse();

    // Handle --paths flag
    if cli.show_paths {
        cli::show_paths();
        return;
    }

    setup_logging(&cli.log_level);
    info!("streamtree v{}", env!("CARGO_PKG_VERSION"));

    // Config actions run instead of parsing
    if cli.init_config {
        match Config::ensure_config_file() {
            Ok(path) => println!("{}", path.display()),
            Err(e) => {
                error!("Failed to create config: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }
    if let Some(path) = &cli.dump_config {
        if let Err(e) = dump_config(&load_config(&cli), path) {
            error!("Failed to write config: {}", e);
            std::process::exit(1);
        }
        return;
    }

    if let Err(e) = run(&cli) {
        error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Set up logging based on the log level argument.
fn setup_logging(level: &str) {
    let filter = match level.to_lowercase().as_str() {
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "info" => LevelFilter::Info,
        "warn" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        _ => LevelFilter::Warn,
    };

    env_logger::Builder::new()
        .filter_level(filter)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {}: {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}

/// Main application logic.
fn run(cli: &Cli) -> io::Result<()> {
    let options = load_options(cli);
    debug!("Parse options: {:?}", options);

    let parser = MarkdownParser::from_options(&options);
    let stdout = io::stdout();
    let mut out = stdout.lock();

    for (name, text) in read_inputs(cli)? {
        info!("Parsing {} ({} bytes)", name, text.len());
        if cli.stream {
            report_stream(&parser, &text, &options, &mut out)?;
        }
        let nodes = parser.parse(&text, &options);
        trace!("{} top-level nodes", nodes.len());
        write_json(&mut out, &nodes, cli.pretty)?;
    }

    out.flush()
}

/// Resolve parse options from config, then command-line flags.
fn load_options(cli: &Cli) -> ParseOptions {
    cli.apply(load_config(cli).options())
}

/// Load the config file and any `-c` override, falling back to defaults.
fn load_config(cli: &Cli) -> Config {
    match Config::load_with_override(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load config: {}", e);
            Config::default()
        }
    }
}

fn dump_config(config: &Config, path: &Path) -> streamtree_core::Result<()> {
    config.save_to(path)?;
    info!("Wrote config to {}", path.display());
    Ok(())
}

/// Collect the documents to parse as `(name, text)` pairs.
fn read_inputs(cli: &Cli) -> io::Result<Vec<(String, String)>> {
    if cli.should_read_stdin() {
        info!("Reading from stdin");
        let mut text = String::new();
        io::stdin().lock().read_to_string(&mut text)?;
        return Ok(vec![("<stdin>".to_string(), text)]);
    }

    cli.files
        .iter()
        .map(|path| Ok((path.display().to_string(), fs::read_to_string(path)?)))
        .collect()
}

fn write_json<W, T>(out: &mut W, value: &T, pretty: bool) -> io::Result<()>
where
    W: Write,
    T: Serialize + ?Sized,
{
    if pretty {
        serde_json::to_writer_pretty(&mut *out, value)?;
    } else {
        serde_json::to_writer(&mut *out, value)?;
    }
    writeln!(out)
}

/// One line of `--stream` output: the prefix length at which the set of
/// loading nodes changed, and that set.
#[derive(Debug, Serialize, PartialEq)]
struct LoadingChange {
    offset: usize,
    loading: Vec<&'static str>,
}

/// Kinds of every node in `nodes` currently marked loading, in tree order.
fn loading_kinds(nodes: &[Node]) -> Vec<&'static str> {
    let mut kinds = Vec::new();
    walk_all(nodes, &mut |node| {
        if node.loading() == Some(true) {
            kinds.push(node.kind());
        }
    });
    kinds
}

/// Parse every character prefix of `text` and collect the points where
/// the loading set changes.
fn loading_changes(
    parser: &MarkdownParser,
    text: &str,
    options: &ParseOptions,
) -> Vec<LoadingChange> {
    let mut changes = Vec::new();
    let mut previous: Vec<&'static str> = Vec::new();

    let ends = text
        .char_indices()
        .map(|(at, c)| at + c.len_utf8())
        .filter(|&end| end < text.len());
    for end in ends {
        let loading = loading_kinds(&parser.parse(&text[..end], options));
        if loading != previous {
            changes.push(LoadingChange {
                offset: end,
                loading: loading.clone(),
            });
            previous = loading;
        }
    }
    changes
}

fn report_stream<W: Write>(
    parser: &MarkdownParser,
    text: &str,
    options: &ParseOptions,
    out: &mut W,
) -> io::Result<()> {
    for change in loading_changes(parser, text, options) {
        write_json(out, &change, false)?;
    }
    Ok(())
}
