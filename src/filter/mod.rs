//! Path-segment exclusion filter.
//!
//! Patterns are matched against a single name (never a full path): exact
//! equality first, then glob semantics (`*suffix`, `prefix*`, ...).

pub mod defaults;

pub use defaults::DEFAULT_EXCLUDES;

use glob::{MatchOptions, Pattern};

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Ordered set of exclusion patterns (built-in list followed by user patterns)
#[derive(Debug, Clone)]
pub struct ExclusionFilter {
    patterns: Vec<String>,
    globs: Vec<Option<Pattern>>,
}

impl ExclusionFilter {
    /// Built-in excludes plus the given user patterns
    pub fn new<I, S>(user_patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let patterns = DEFAULT_EXCLUDES
            .iter()
            .map(|p| p.to_string())
            .chain(user_patterns.into_iter().map(Into::into))
            .collect();
        Self::from_patterns(patterns)
    }

    /// Only the given patterns, without the built-in list
    pub fn from_patterns(patterns: Vec<String>) -> Self {
        let patterns: Vec<String> = patterns
            .into_iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();

        // A pattern glob can't parse (e.g. a stray '[') still works as an exact name
        let globs = patterns
            .iter()
            .map(|p| {
                if has_wildcard(p) {
                    Pattern::new(p).ok()
                } else {
                    None
                }
            })
            .collect();

        Self { patterns, globs }
    }

    /// Returns true if `name` should not be synced
    pub fn should_exclude(&self, name: &str) -> bool {
        self.patterns
            .iter()
            .zip(&self.globs)
            .any(|(pattern, glob)| {
                pattern == name
                    || glob
                        .as_ref()
                        .is_some_and(|g| g.matches_with(name, MATCH_OPTIONS))
            })
    }

    /// Patterns in order, as passed to rsync `--exclude`
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

impl Default for ExclusionFilter {
    fn default() -> Self {
        Self::new(Vec::<String>::new())
    }
}

fn has_wildcard(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}
