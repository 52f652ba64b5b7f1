// core/src/suggestion.rs
//
// Positional prefix matching and the suggestion engine built on it.

use std::cell::RefCell;
use std::num::NonZeroUsize;
use std::rc::Rc;

use lru::LruCache;
use tracing::debug;

use crate::idiom_store::IdiomStore;

/// Number of character columns in the idiom table.
pub const IDIOM_LEN: usize = 4;

/// Default cap on suggestion results.
pub const DEFAULT_SUGGESTION_LIMIT: usize = 10;

const CHAR_COLUMNS: [&str; IDIOM_LEN] = ["char1", "char2", "char3", "char4"];

/// A set of "character at position N" constraints against the idiom table.
///
/// Positions are 1-based. With an anchor, the anchor always takes position
/// 1 and typed characters start at position 2; a first typed character that
/// repeats the anchor is dropped. Without an anchor typed characters start
/// at position 1. Anything landing past position 4 is ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionalQuery {
    constraints: Vec<(usize, char)>,
}

impl PositionalQuery {
    pub fn new(lead: Option<char>, input: &[char]) -> Self {
        let mut constraints = Vec::with_capacity(IDIOM_LEN);

        let (typed, first_pos) = match lead {
            Some(anchor) => {
                constraints.push((1, anchor));
                let typed = match input.split_first() {
                    Some((first, rest)) if *first == anchor => rest,
                    _ => input,
                };
                (typed, 2)
            }
            None => (input, 1),
        };

        for (offset, ch) in typed.iter().enumerate() {
            let pos = first_pos + offset;
            if pos > IDIOM_LEN {
                break;
            }
            constraints.push((pos, *ch));
        }

        Self { constraints }
    }

    /// Convenience constructor over a typed string.
    pub fn from_input(lead: Option<char>, input: &str) -> Self {
        let chars: Vec<char> = input.chars().collect();
        Self::new(lead, &chars)
    }

    /// The `(position, char)` pairs, position ascending.
    pub fn constraints(&self) -> &[(usize, char)] {
        &self.constraints
    }

    pub fn is_unconstrained(&self) -> bool {
        self.constraints.is_empty()
    }

    /// Render the query. Values are bound parameters `?1..?n` in constraint
    /// order; the limit is bound as the last parameter.
    pub fn to_sql(&self) -> String {
        let mut sql = String::from("SELECT char1, char2, char3, char4 FROM idiom WHERE 1=1");
        for (i, (pos, _)) in self.constraints.iter().enumerate() {
            sql.push_str(&format!(" AND {} = ?{}", CHAR_COLUMNS[pos - 1], i + 1));
        }
        sql.push_str(&format!(" LIMIT ?{}", self.constraints.len() + 1));
        sql
    }

    /// Parameter values in the order `to_sql` expects them (limit excluded).
    pub fn params(&self) -> Vec<String> {
        self.constraints.iter().map(|(_, c)| c.to_string()).collect()
    }
}

type CacheKey = (Option<char>, String);

/// Suggestion front end over a shared `IdiomStore`.
///
/// Results are memoized in an LRU keyed by `(anchor, typed input)`. The
/// cache must be cleared whenever the store is reloaded.
pub struct SuggestionEngine {
    store: Rc<IdiomStore>,
    limit: usize,
    cache: RefCell<LruCache<CacheKey, Vec<String>>>,
    cache_hits: RefCell<usize>,
    cache_misses: RefCell<usize>,
}

impl SuggestionEngine {
    pub fn new(store: Rc<IdiomStore>, limit: usize, cache_capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(cache_capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            store,
            limit,
            cache: RefCell::new(LruCache::new(capacity)),
            cache_hits: RefCell::new(0),
            cache_misses: RefCell::new(0),
        }
    }

    pub fn store(&self) -> &Rc<IdiomStore> {
        &self.store
    }

    /// Up to `limit` idioms consistent with the anchor and the typed input.
    ///
    /// Advisory: a store failure yields an empty list, and that empty list
    /// is not cached.
    pub fn suggest(&self, input: &str, lead: Option<char>) -> Vec<String> {
        let key = (lead, input.to_string());
        if let Some(cached) = self.cache.borrow_mut().get(&key) {
            *self.cache_hits.borrow_mut() += 1;
            return cached.clone();
        }
        *self.cache_misses.borrow_mut() += 1;

        let query = PositionalQuery::from_input(lead, input);
        match self.store.query_positional(&query, self.limit) {
            Ok(words) => {
                debug!(?lead, input, count = words.len(), "suggestions");
                self.cache.borrow_mut().put(key, words.clone());
                words
            }
            Err(e) => {
                tracing::warn!(error = %e, ?lead, input, "suggestion query failed");
                Vec::new()
            }
        }
    }

    /// Returns (hits, misses).
    pub fn cache_stats(&self) -> (usize, usize) {
        (*self.cache_hits.borrow(), *self.cache_misses.borrow())
    }

    /// Hit rate as a percentage, or None before the first lookup.
    pub fn cache_hit_rate(&self) -> Option<f32> {
        let hits = *self.cache_hits.borrow();
        let total = hits + *self.cache_misses.borrow();
        if total == 0 {
            None
        } else {
            Some(hits as f32 / total as f32 * 100.0)
        }
    }

    pub fn cache_size(&self) -> usize {
        self.cache.borrow().len()
    }

    pub fn clear_cache(&self) {
        self.cache.borrow_mut().clear();
        *self.cache_hits.borrow_mut() = 0;
        *self.cache_misses.borrow_mut() = 0;
    }
}
