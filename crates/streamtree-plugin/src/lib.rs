//! Streamtree Hook System
//!
//! This crate provides the extension points for embedding-specific token
//! and tree rewriting. Hooks run synchronously inside a parse call, once
//! before the fixup passes and once right before node building.
//!
//! # Hook Behavior
//!
//! - `pre_transform` receives the raw tokenizer output and returns a new list
//! - `post_transform` receives the repaired list and returns either
//!   [`HookOutput::Tokens`] (keep building) or [`HookOutput::Nodes`]
//!   (replace the build output entirely)
//! - A hook that returns `Err` or panics is skipped: the failure is logged
//!   and the tokens it was given are passed on unchanged
//!
//! # Example
//!
//! ```
//! use streamtree_core::{Result, Token, TokenKind};
//! use streamtree_plugin::{HookManager, TokenHook};
//!
//! struct DropRules;
//!
//! impl TokenHook for DropRules {
//!     fn name(&self) -> &str { "drop-rules" }
//!
//!     fn pre_transform(&self, tokens: Vec<Token>) -> Result<Vec<Token>> {
//!         Ok(tokens.into_iter().filter(|t| !t.is(TokenKind::Hr)).collect())
//!     }
//! }
//!
//! let mut hooks = HookManager::new();
//! hooks.register(Box::new(DropRules));
//! let out = hooks.run_pre(vec![Token::new(TokenKind::Hr)]);
//! assert!(out.is_empty());
//! ```

use std::panic::{catch_unwind, AssertUnwindSafe};
use streamtree_core::{Node, Result, Token};

/// Result of a post-transform hook.
#[derive(Debug, Clone, PartialEq)]
pub enum HookOutput {
    /// Continue with these tokens.
    Tokens(Vec<Token>),
    /// Use these nodes as the parse result; the builder is skipped.
    Nodes(Vec<Node>),
}

impl HookOutput {
    /// Create a token output.
    pub fn tokens(tokens: Vec<Token>) -> Self {
        Self::Tokens(tokens)
    }

    /// Create a node output.
    pub fn nodes(nodes: Vec<Node>) -> Self {
        Self::Nodes(nodes)
    }

    /// Whether this output replaces the built tree.
    pub fn is_nodes(&self) -> bool {
        matches!(self, Self::Nodes(_))
    }
}

/// Caller-supplied token transform.
///
/// Both methods default to the identity, so a hook only overrides the
/// stage it cares about. Hooks must not keep references to the lists they
/// are given; they take and return owned values.
pub trait TokenHook: Send + Sync {
    /// Hook name for identification and logging.
    fn name(&self) -> &str;

    /// Rewrite tokenizer output before the fixup passes run.
    fn pre_transform(&self, tokens: Vec<Token>) -> Result<Vec<Token>> {
        Ok(tokens)
    }

    /// Rewrite the repaired token list right before node building.
    fn post_transform(&self, tokens: Vec<Token>) -> Result<HookOutput> {
        Ok(HookOutput::Tokens(tokens))
    }

    /// Hook priority (lower = runs first).
    ///
    /// Default is 0.
    fn priority(&self) -> i32 {
        0
    }
}

/// Ordered collection of hooks.
///
/// The manager handles:
/// - Hook registration with priority sorting
/// - Isolation of failing hooks
/// - Short-circuiting once a post hook produces nodes
#[derive(Default)]
pub struct HookManager {
    /// Registered hooks (sorted by priority)
    hooks: Vec<Box<dyn TokenHook>>,
}

impl std::fmt::Debug for HookManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookManager")
            .field("hooks", &self.hook_names())
            .finish()
    }
}

impl HookManager {
    /// Create a new empty hook manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a hook.
    ///
    /// Hooks are sorted by priority after registration; equal priorities
    /// keep registration order.
    pub fn register(&mut self, hook: Box<dyn TokenHook>) {
        self.hooks.push(hook);
        self.hooks.sort_by_key(|h| h.priority());
    }

    /// Get the number of registered hooks.
    pub fn hook_count(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Get hook names in run order.
    pub fn hook_names(&self) -> Vec<&str> {
        self.hooks.iter().map(|h| h.name()).collect()
    }

    /// Run every pre-transform hook in order.
    pub fn run_pre(&self, mut tokens: Vec<Token>) -> Vec<Token> {
        for hook in &self.hooks {
            let input = tokens.clone();
            match guarded(hook.name(), || hook.pre_transform(input)) {
                Some(next) => tokens = next,
                None => continue,
            }
        }
        tokens
    }

    /// Run every post-transform hook in order.
    ///
    /// Stops at the first hook that returns nodes.
    pub fn run_post(&self, mut tokens: Vec<Token>) -> HookOutput {
        for hook in &self.hooks {
            let input = tokens.clone();
            match guarded(hook.name(), || hook.post_transform(input)) {
                Some(HookOutput::Tokens(next)) => tokens = next,
                Some(HookOutput::Nodes(nodes)) => {
                    log::debug!("hook {} replaced the tree ({} nodes)", hook.name(), nodes.len());
                    return HookOutput::Nodes(nodes);
                }
                None => continue,
            }
        }
        HookOutput::Tokens(tokens)
    }
}

/// Call a hook, turning an error or a panic into `None`.
fn guarded<T>(name: &str, call: impl FnOnce() -> Result<T>) -> Option<T> {
    match catch_unwind(AssertUnwindSafe(call)) {
        Ok(Ok(value)) => Some(value),
        Ok(Err(e)) => {
            log::warn!("hook {} failed: {}", name, e);
            None
        }
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            log::warn!("hook {} panicked: {}", name, message);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use streamtree_core::{StreamtreeError, TokenKind};

    /// Appends a text token tagged with the hook's name.
    struct Tagger {
        name: &'static str,
        priority: i32,
    }

    impl TokenHook for Tagger {
        fn name(&self) -> &str {
            self.name
        }

        fn pre_transform(&self, mut tokens: Vec<Token>) -> Result<Vec<Token>> {
            tokens.push(Token::text(self.name));
            Ok(tokens)
        }

        fn priority(&self) -> i32 {
            self.priority
        }
    }

    struct Failing;

    impl TokenHook for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn pre_transform(&self, _tokens: Vec<Token>) -> Result<Vec<Token>> {
            Err(StreamtreeError::hook("failing", "nope"))
        }

        fn post_transform(&self, _tokens: Vec<Token>) -> Result<HookOutput> {
            panic!("boom");
        }
    }

    struct Replacer;

    impl TokenHook for Replacer {
        fn name(&self) -> &str {
            "replacer"
        }

        fn post_transform(&self, _tokens: Vec<Token>) -> Result<HookOutput> {
            Ok(HookOutput::nodes(vec![Node::text("replaced")]))
        }
    }

    fn contents(tokens: &[Token]) -> Vec<&str> {
        tokens.iter().map(|t| t.content.as_str()).collect()
    }

    #[test]
    fn test_hook_manager_new() {
        let manager = HookManager::new();
        assert_eq!(manager.hook_count(), 0);
        assert!(manager.is_empty());
    }

    #[test]
    fn test_priority_order() {
        let mut manager = HookManager::new();
        manager.register(Box::new(Tagger { name: "late", priority: 10 }));
        manager.register(Box::new(Tagger { name: "early", priority: -1 }));
        assert_eq!(manager.hook_names(), vec!["early", "late"]);

        let out = manager.run_pre(Vec::new());
        assert_eq!(contents(&out), vec!["early", "late"]);
    }

    #[test]
    fn test_error_keeps_input() {
        let mut manager = HookManager::new();
        manager.register(Box::new(Failing));
        manager.register(Box::new(Tagger { name: "after", priority: 1 }));

        let out = manager.run_pre(vec![Token::text("a")]);
        assert_eq!(contents(&out), vec!["a", "after"]);
    }

    #[test]
    fn test_panic_keeps_input() {
        let mut manager = HookManager::new();
        manager.register(Box::new(Failing));

        let out = manager.run_post(vec![Token::new(TokenKind::Hr)]);
        match out {
            HookOutput::Tokens(tokens) => {
                assert_eq!(tokens.len(), 1);
                assert!(tokens[0].is(TokenKind::Hr));
            }
            HookOutput::Nodes(_) => panic!("expected tokens"),
        }
    }

    #[test]
    fn test_nodes_short_circuit() {
        let mut manager = HookManager::new();
        manager.register(Box::new(Replacer));
        manager.register(Box::new(Failing));

        let out = manager.run_post(Vec::new());
        assert!(out.is_nodes());
        assert_eq!(out, HookOutput::Nodes(vec![Node::text("replaced")]));
    }

    #[test]
    fn test_default_methods_are_identity() {
        struct Noop;
        impl TokenHook for Noop {
            fn name(&self) -> &str {
                "noop"
            }
        }

        let mut manager = HookManager::new();
        manager.register(Box::new(Noop));
        let tokens = vec![Token::text("x")];
        assert_eq!(manager.run_pre(tokens.clone()), tokens);
        assert_eq!(manager.run_post(tokens.clone()), HookOutput::Tokens(tokens));
    }
}
