//! Compiled matcher cache shared by the fixup passes and the builder.

use moka::sync::Cache;
use regex::Regex;
use streamtree_config::DEFAULT_CACHE_CAPACITY;

/// Bounded cache of compiled regexes keyed by purpose and pattern input.
#[derive(Debug)]
pub struct MatcherCache {
    cache: Cache<String, Regex>,
}

impl Default for MatcherCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl MatcherCache {
    pub fn new(capacity: u64) -> Self {
        Self {
            cache: Cache::builder().max_capacity(capacity).build(),
        }
    }

    /// Matcher for the closing form of `tag`, e.g. `</details >`.
    pub fn closing_tag(&self, tag: &str) -> Option<Regex> {
        let key = format!("close:{}", tag.to_lowercase());
        self.get_or_compile(key, || {
            format!(r"(?i)</\s*{}\s*>", regex::escape(tag))
        })
    }

    /// Matcher for a command name written without its backslash, followed
    /// by `{`, `_` or `^`.
    pub fn bare_commands(&self, commands: &[String]) -> Option<Regex> {
        if commands.is_empty() {
            return None;
        }
        let key = format!("bare:{}", commands.join("|"));
        self.get_or_compile(key, || {
            let alternation = commands
                .iter()
                .map(|c| regex::escape(c))
                .collect::<Vec<_>>()
                .join("|");
            format!(r"(^|[^\\A-Za-z])({})([{{_^])", alternation)
        })
    }

    /// Entry count after pending evictions have been applied.
    pub fn len(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks();
    }

    fn get_or_compile(&self, key: String, pattern: impl FnOnce() -> String) -> Option<Regex> {
        if let Some(regex) = self.cache.get(&key) {
            return Some(regex);
        }
        match Regex::new(&pattern()) {
            Ok(regex) => {
                self.cache.insert(key, regex.clone());
                Some(regex)
            }
            Err(e) => {
                log::warn!("matcher {} failed to compile: {}", key, e);
                None
            }
        }
    }
}
