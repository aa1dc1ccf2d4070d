//! Streamtree Parser
//!
//! Turns markdown that may still be arriving (model output streamed a few
//! characters at a time) into a typed node tree. Each call parses the full
//! text received so far; constructs whose terminator has not arrived yet
//! are still recognised and carry `loading: true`.
//!
//! # Pipeline
//!
//! 1. [`Tokenizer`] flattens `pulldown-cmark` events (plus `:::` containers
//!    and standalone math blocks) into markdown-it style tokens
//! 2. pre-transform hooks
//! 3. [`fixups`] repair what the tokenizer cannot see in a prefix: half
//!    typed links, emphasis and code, partial HTML tags, indented prose
//! 4. post-transform hooks, which may replace the result outright
//! 5. [`NodeBuilder`] walks the tokens into [`Node`]s
//!
//! # Example
//!
//! ```
//! use streamtree_parser::{MarkdownParser, Node, ParseOptions};
//!
//! let parser = MarkdownParser::new();
//! let nodes = parser.parse("Streaming **bold te", &ParseOptions::default());
//!
//! match &nodes[0] {
//!     Node::Paragraph { children, .. } => {
//!         assert_eq!(children[1].kind(), "strong");
//!         assert_eq!(children[1].loading(), Some(true));
//!     }
//!     other => panic!("unexpected {:?}", other),
//! }
//! ```

pub mod builder;
pub mod container;
pub mod entities;
pub mod fixups;
pub mod html;
pub mod math;
pub mod matcher;
pub mod tokenizer;

pub use builder::{NodeBuilder, TokenCursor};
pub use entities::decode_html_entities;
pub use fixups::PassContext;
pub use matcher::MatcherCache;
pub use math::normalize_math;
pub use streamtree_config::ParseOptions;
pub use streamtree_core::{Node, Token, TokenKind};
pub use tokenizer::{is_cjk, is_word_char, Tokenizer};

use std::sync::LazyLock;
use streamtree_plugin::{HookManager, HookOutput, TokenHook};

/// Markdown to node-tree parser.
///
/// Holds no per-document state: the same instance can parse any number of
/// documents, from any number of threads. The only thing shared between
/// calls is the bounded cache of compiled tag/command matchers.
#[derive(Debug, Default)]
pub struct MarkdownParser {
    tokenizer: Tokenizer,
    matchers: MatcherCache,
    hooks: HookManager,
}

impl MarkdownParser {
    /// Create a parser with the default matcher cache size.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a parser whose matcher cache holds at most `capacity` entries.
    pub fn with_capacity(capacity: u64) -> Self {
        Self {
            tokenizer: Tokenizer::new(),
            matchers: MatcherCache::new(capacity),
            hooks: HookManager::new(),
        }
    }

    /// Create a parser sized from a set of options.
    pub fn from_options(options: &ParseOptions) -> Self {
        Self::with_capacity(options.cache_capacity)
    }

    /// Register a token hook.
    pub fn register_hook(&mut self, hook: Box<dyn TokenHook>) {
        log::debug!("registering hook {}", hook.name());
        self.hooks.register(hook);
    }

    /// Builder-style [`register_hook`](Self::register_hook).
    pub fn with_hook(mut self, hook: Box<dyn TokenHook>) -> Self {
        self.register_hook(hook);
        self
    }

    pub fn hooks(&self) -> &HookManager {
        &self.hooks
    }

    /// Tokenize `text` and run the pre-transform hooks.
    pub fn tokenize(&self, text: &str, options: &ParseOptions) -> Vec<Token> {
        let tokens = self.tokenizer.tokenize(text, options);
        log::debug!("tokenized {} bytes into {} tokens", text.len(), tokens.len());
        if self.hooks.is_empty() {
            tokens
        } else {
            self.hooks.run_pre(tokens)
        }
    }

    /// Run the fixup passes over a token list.
    pub fn repair(&self, tokens: Vec<Token>, options: &ParseOptions) -> Vec<Token> {
        let ctx = PassContext::new(options, &self.tokenizer, &self.matchers);
        let tokens = fixups::repair(tokens, &ctx);
        log::debug!("repaired token list: {} tokens", tokens.len());
        tokens
    }

    /// Build nodes from a (repaired) token list.
    pub fn build(&self, tokens: &[Token], options: &ParseOptions) -> Vec<Node> {
        NodeBuilder::new(options, &self.tokenizer, &self.matchers).build(tokens)
    }

    /// Parse the markdown received so far.
    ///
    /// Empty input yields an empty tree. Parsing never fails: input the
    /// heuristics cannot classify comes back as text.
    pub fn parse(&self, text: &str, options: &ParseOptions) -> Vec<Node> {
        if text.is_empty() {
            return Vec::new();
        }

        let tokens = self.tokenize(text, options);
        let tokens = self.repair(tokens, options);
        let tokens = if self.hooks.is_empty() {
            tokens
        } else {
            match self.hooks.run_post(tokens) {
                HookOutput::Nodes(nodes) => return nodes,
                HookOutput::Tokens(tokens) => tokens,
            }
        };

        let nodes = self.build(&tokens, options);
        log::debug!(
            "built {} top-level nodes (final: {})",
            nodes.len(),
            options.is_final
        );
        nodes
    }

    /// Number of compiled matchers currently cached.
    pub fn cache_len(&self) -> u64 {
        self.matchers.len()
    }

    pub fn clear_cache(&self) {
        self.matchers.clear();
    }
}

static SHARED: LazyLock<MarkdownParser> = LazyLock::new(MarkdownParser::new);

/// Parse with a process-wide parser that has no hooks.
pub fn parse_markdown(text: &str, options: &ParseOptions) -> Vec<Node> {
    SHARED.parse(text, options)
}
