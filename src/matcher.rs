//! Pattern matching with a bounded compiled-pattern cache
//!
//! A pattern is either a literal string, compared by exact equality only,
//! or a string containing one or more regular-expression segments bounded
//! by a configured delimiter pair (default `<` and `>`). Literal text
//! outside the delimiters is escaped; the whole expression is anchored, so
//! a pattern never matches a substring of the needle.
//!
//! Compiled expressions are cached in a bounded LRU keyed by the raw
//! pattern string. This is a compiled-pattern cache, not a match-result
//! cache: the same pattern evaluated against different needles reuses one
//! compiled entry, and eviction only costs a recompile on next use.

use lru::LruCache;
use parking_lot::Mutex;
use regex::Regex;
use std::num::NonZeroUsize;
use tracing::{debug, warn};

use crate::error::{IamError, Result};

/// Default capacity of the compiled-pattern cache
pub const DEFAULT_CACHE_CAPACITY: usize = 512;

/// Matcher configuration: delimiter pair and cache capacity
///
/// Fixed at construction; the matcher holds no process-global state.
#[derive(Debug, Clone, Copy)]
pub struct MatcherConfig {
    /// Character opening a regular-expression segment
    pub start_delimiter: char,

    /// Character closing a regular-expression segment
    pub end_delimiter: char,

    /// Compiled-pattern cache capacity; zero is corrected to the default
    pub capacity: usize,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            start_delimiter: '<',
            end_delimiter: '>',
            capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

/// Pattern matcher with a shared, thread-safe compiled-pattern cache
pub struct RegexMatcher {
    config: MatcherConfig,
    cache: Mutex<LruCache<String, Regex>>,
}

impl RegexMatcher {
    /// Create a matcher with the given configuration
    pub fn new(config: MatcherConfig) -> Self {
        let capacity = NonZeroUsize::new(config.capacity).unwrap_or_else(|| {
            warn!(
                requested = config.capacity,
                default = DEFAULT_CACHE_CAPACITY,
                "invalid pattern cache capacity, using default"
            );
            NonZeroUsize::new(DEFAULT_CACHE_CAPACITY).expect("default capacity is nonzero")
        });

        Self {
            config,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Test `needle` against a list of patterns, in order
    ///
    /// Returns `Ok(true)` at the first matching entry. Entries without a
    /// start delimiter are compared by exact equality; the rest are
    /// compiled (or served from the cache) and applied as anchored regular
    /// expressions. A malformed pattern aborts the whole call.
    pub fn matches(&self, haystack: &[String], needle: &str) -> Result<bool> {
        for pattern in haystack {
            if !pattern.contains(self.config.start_delimiter) {
                if pattern == needle {
                    return Ok(true);
                }
                continue;
            }

            let regex = self.lookup_or_compile(pattern)?;
            if regex.is_match(needle) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Number of entries currently cached
    pub fn cached_patterns(&self) -> usize {
        self.cache.lock().len()
    }

    fn lookup_or_compile(&self, pattern: &str) -> Result<Regex> {
        {
            let mut cache = self.cache.lock();
            if let Some(regex) = cache.get(pattern) {
                // Clone is cheap; the returned value stays valid even if
                // this slot is evicted by a concurrent insert.
                return Ok(regex.clone());
            }
        }

        let compiled = compile_delimited(
            pattern,
            self.config.start_delimiter,
            self.config.end_delimiter,
        )?;
        debug!(pattern, "compiled pattern");

        self.cache
            .lock()
            .put(pattern.to_string(), compiled.clone());
        Ok(compiled)
    }
}

impl Default for RegexMatcher {
    fn default() -> Self {
        Self::new(MatcherConfig::default())
    }
}

/// Compile a delimited pattern into an anchored regular expression
///
/// Text outside the delimiters is escaped literally; text inside is taken
/// as raw regex and wrapped in a non-capturing group.
pub(crate) fn compile_delimited(pattern: &str, start: char, end: char) -> Result<Regex> {
    let mut expr = String::with_capacity(pattern.len() + 8);
    expr.push('^');

    let mut literal = String::new();
    let mut inside = false;

    for ch in pattern.chars() {
        if inside {
            if ch == end {
                inside = false;
                expr.push(')');
            } else {
                expr.push(ch);
            }
        } else if ch == start {
            inside = true;
            expr.push_str(&regex::escape(&literal));
            literal.clear();
            expr.push_str("(?:");
        } else if ch == end {
            return Err(IamError::Compile {
                pattern: pattern.to_string(),
                reason: format!("end delimiter {end:?} without matching start delimiter"),
            });
        } else {
            literal.push(ch);
        }
    }

    if inside {
        return Err(IamError::Compile {
            pattern: pattern.to_string(),
            reason: format!("unterminated delimiter, expected {end:?}"),
        });
    }

    expr.push_str(&regex::escape(&literal));
    expr.push('$');

    Regex::new(&expr).map_err(|e| IamError::Compile {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}
