//! Idiom store over an embedded SQLite table.
//!
//! The bundled dataset is a SQLite file holding one table:
//!
//! ```text
//! idiom(char1..char4, py1..py4, mean, source, example)
//! ```
//!
//! It is loaded wholesale into an in-memory connection. The store owns that
//! connection explicitly (no global handle); callers share it through `Rc`.
//! Execution is single threaded, so the handle sits in a `RefCell` and is
//! swapped in place on a forced reload.
//!
//! Exact lookup and the continuation pick propagate errors. Random sampling
//! and positional prefix lookup are advisory and return an empty list on
//! failure after logging it.

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use rusqlite::types::Value;
use rusqlite::{params, Connection, DatabaseName, OptionalExtension, Row};
use tracing::{debug, info, warn};

use crate::cache::BlobCache;
use crate::idiom::Idiom;
use crate::source::DatasetSource;
use crate::suggestion::{PositionalQuery, IDIOM_LEN};
use crate::{Error, Result};

/// Cache key for the raw database blob.
pub const IDIOM_DB_CACHE_KEY: &str = "idiom_db_buffer";

/// Default number of idioms offered by `sample_random` callers.
pub const DEFAULT_RANDOM_COUNT: usize = 5;

const ROW_COLUMNS: &str = "char1, char2, char3, char4, py1, py2, py3, py4, mean, source, example";

const CREATE_TABLE: &str = "CREATE TABLE idiom (
    id INTEGER PRIMARY KEY,
    char1 TEXT, char2 TEXT, char3 TEXT, char4 TEXT,
    py1 TEXT, py2 TEXT, py3 TEXT, py4 TEXT,
    mean TEXT, source TEXT, example TEXT
)";

pub struct IdiomStore {
    source: Option<Box<dyn DatasetSource>>,
    cache: Option<Rc<BlobCache>>,
    conn: RefCell<Option<Connection>>,
}

impl std::fmt::Debug for IdiomStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdiomStore")
            .field("source", &self.source.as_ref().map(|s| s.describe()))
            .field("cached", &self.cache.is_some())
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

impl IdiomStore {
    /// An unloaded store that will fetch from `source` on first use.
    pub fn new(source: Box<dyn DatasetSource>) -> Self {
        Self {
            source: Some(source),
            cache: None,
            conn: RefCell::new(None),
        }
    }

    /// Attach a blob cache used to skip the fetch on later sessions.
    pub fn with_cache(mut self, cache: Rc<BlobCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Wrap an already populated connection. The resulting store has no
    /// source, so a forced reload fails and keeps this connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            source: None,
            cache: None,
            conn: RefCell::new(Some(conn)),
        }
    }

    /// Build an in-memory store holding exactly `idioms`, in order.
    pub fn from_idioms(idioms: &[Idiom]) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(CREATE_TABLE)?;
        {
            let mut stmt = conn.prepare(&format!(
                "INSERT INTO idiom ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                ROW_COLUMNS
            ))?;
            for idiom in idioms {
                let chars: Vec<Option<String>> = (0..IDIOM_LEN)
                    .map(|i| idiom.word.chars().nth(i).map(String::from))
                    .collect();
                let py: Vec<&str> = idiom.pinyin.split_whitespace().collect();
                let py_at = |i: usize| py.get(i).map(|s| s.to_string());
                stmt.execute(params![
                    chars[0],
                    chars[1],
                    chars[2],
                    chars[3],
                    py_at(0),
                    py_at(1),
                    py_at(2),
                    py_at(3),
                    idiom.explanation,
                    idiom.derivation,
                    idiom.example,
                ])?;
            }
        }
        Ok(Self::from_connection(conn))
    }

    pub fn is_loaded(&self) -> bool {
        self.conn.borrow().is_some()
    }

    /// Load the dataset unless it is already loaded and `force_reload` is
    /// false.
    ///
    /// Without `force_reload` a blob found in the cache is used instead of
    /// fetching. A freshly fetched blob is written back to the cache once it
    /// has been materialized. On failure the previous handle is kept.
    pub fn initialize(&self, force_reload: bool) -> Result<()> {
        if self.is_loaded() && !force_reload {
            return Ok(());
        }

        if !force_reload {
            if let Some(bytes) = self.cached_blob() {
                match materialize(&bytes) {
                    Ok((conn, rows)) => {
                        info!(rows, "idiom database hydrated from cache");
                        *self.conn.borrow_mut() = Some(conn);
                        return Ok(());
                    }
                    Err(e) => warn!(error = %e, "cached idiom database unusable, refetching"),
                }
            }
        }

        let source = self
            .source
            .as_ref()
            .ok_or_else(|| Error::Load("idiom store has no dataset source".into()))?;
        let bytes = source.fetch()?;
        let (conn, rows) = materialize(&bytes)?;
        info!(rows, source = %source.describe(), "idiom database loaded");

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.set(IDIOM_DB_CACHE_KEY, &bytes) {
                warn!(error = %e, "failed to cache idiom database");
            }
        }

        *self.conn.borrow_mut() = Some(conn);
        Ok(())
    }

    fn cached_blob(&self) -> Option<Vec<u8>> {
        let cache = self.cache.as_ref()?;
        match cache.get(IDIOM_DB_CACHE_KEY) {
            Ok(blob) => blob,
            Err(e) => {
                warn!(error = %e, "idiom cache read failed");
                None
            }
        }
    }

    /// Run `f` against the loaded connection, loading it first if needed.
    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> rusqlite::Result<T>) -> Result<T> {
        self.initialize(false)?;
        let guard = self.conn.borrow();
        let conn = guard
            .as_ref()
            .ok_or_else(|| Error::Load("idiom database not loaded".into()))?;
        Ok(f(conn)?)
    }

    /// Number of rows in the idiom table.
    pub fn len(&self) -> Result<usize> {
        self.with_conn(|conn| {
            conn.query_row("SELECT count(*) FROM idiom", [], |r| r.get::<_, i64>(0))
        })
        .map(|n| n as usize)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// The idiom whose four characters equal `word`.
    ///
    /// Anything other than exactly four characters is `None` without
    /// touching the database.
    pub fn lookup_exact(&self, word: &str) -> Result<Option<Idiom>> {
        let chars: Vec<String> = word.chars().map(String::from).collect();
        if chars.len() != IDIOM_LEN {
            return Ok(None);
        }

        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM idiom WHERE char1 = ?1 AND char2 = ?2 AND char3 = ?3 AND char4 = ?4 LIMIT 1",
                ROW_COLUMNS
            );
            debug!(%sql, word, "exact lookup");
            let mut stmt = conn.prepare_cached(&sql)?;
            stmt.query_row(params![chars[0], chars[1], chars[2], chars[3]], row_to_idiom)
                .optional()
        })
    }

    /// Up to `count` idioms drawn at random. Advisory.
    pub fn sample_random(&self, count: usize) -> Vec<String> {
        let result = self.with_conn(|conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT char1, char2, char3, char4 FROM idiom ORDER BY RANDOM() LIMIT ?1",
            )?;
            let rows = stmt.query_map([count as i64], row_to_word)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
        });
        match result {
            Ok(words) => words,
            Err(e) => {
                warn!(error = %e, count, "random sample failed");
                Vec::new()
            }
        }
    }

    /// Run a positional query, propagating failures.
    pub fn query_positional(&self, query: &PositionalQuery, limit: usize) -> Result<Vec<String>> {
        let sql = query.to_sql();
        let mut values: Vec<Value> = query.params().into_iter().map(Value::Text).collect();
        values.push(Value::Integer(limit as i64));

        self.with_conn(|conn| {
            debug!(%sql, params = ?query.params(), limit, "positional query");
            let mut stmt = conn.prepare_cached(&sql)?;
            let rows = stmt.query_map(rusqlite::params_from_iter(values.iter()), row_to_word)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
        })
    }

    /// Idioms matching `lead` at position 1 and `input` at the following
    /// positions, in table order, at most `limit`. Advisory.
    pub fn lookup_by_positional_prefix(
        &self,
        lead: Option<char>,
        input: &[char],
        limit: usize,
    ) -> Vec<String> {
        let query = PositionalQuery::new(lead, input);
        match self.query_positional(&query, limit) {
            Ok(words) => words,
            Err(e) => {
                warn!(error = %e, ?lead, "positional lookup failed");
                Vec::new()
            }
        }
    }

    /// One idiom picked uniformly at random among those starting with `ch`.
    pub fn random_starting_with(&self, ch: char) -> Result<Option<Idiom>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM idiom WHERE char1 = ?1 ORDER BY RANDOM() LIMIT 1",
                ROW_COLUMNS
            );
            debug!(%sql, lead = %ch, "continuation pick");
            let mut stmt = conn.prepare_cached(&sql)?;
            stmt.query_row([ch.to_string()], row_to_idiom).optional()
        })
    }

    /// Full records for idioms whose leading characters match `query`.
    ///
    /// Surface forms come from an unanchored positional lookup; each one is
    /// then looked up exactly and misses are dropped. Advisory.
    pub fn search_idioms(&self, query: &str, limit: usize) -> Vec<Idiom> {
        let chars: Vec<char> = query.chars().collect();
        if chars.is_empty() {
            return Vec::new();
        }
        self.lookup_by_positional_prefix(None, &chars, limit)
            .iter()
            .filter_map(|word| match self.lookup_exact(word) {
                Ok(found) => found,
                Err(e) => {
                    warn!(error = %e, word = %word, "idiom detail lookup failed");
                    None
                }
            })
            .collect()
    }
}

/// Stage `bytes` in a temporary file and restore it into a fresh in-memory
/// connection. Returns the connection and its idiom row count.
fn materialize(bytes: &[u8]) -> Result<(Connection, usize)> {
    let mut staged =
        tempfile::NamedTempFile::new().map_err(|e| Error::load("staging idiom database", e))?;
    staged
        .write_all(bytes)
        .and_then(|_| staged.flush())
        .map_err(|e| Error::load("staging idiom database", e))?;

    let mut conn =
        Connection::open_in_memory().map_err(|e| Error::load("opening in-memory database", e))?;
    conn.restore(
        DatabaseName::Main,
        staged.path(),
        None::<fn(rusqlite::backup::Progress)>,
    )
    .map_err(|e| Error::load("restoring idiom database", e))?;

    let rows: i64 = conn
        .query_row("SELECT count(*) FROM idiom", [], |r| r.get(0))
        .map_err(|e| Error::load("validating idiom database", e))?;
    Ok((conn, rows as usize))
}

fn row_to_word(row: &Row<'_>) -> rusqlite::Result<String> {
    let mut word = String::new();
    for i in 0..IDIOM_LEN {
        if let Some(ch) = row.get::<_, Option<String>>(i)? {
            word.push_str(&ch);
        }
    }
    Ok(word)
}

fn row_to_idiom(row: &Row<'_>) -> rusqlite::Result<Idiom> {
    let text = |i: usize| row.get::<_, Option<String>>(i);
    Ok(Idiom::from_columns(
        [text(0)?, text(1)?, text(2)?, text(3)?],
        [text(4)?, text(5)?, text(6)?, text(7)?],
        text(8)?,
        text(9)?,
        text(10)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::BytesSource;

    fn idiom(word: &str, pinyin: &str) -> Idiom {
        Idiom {
            word: word.into(),
            pinyin: pinyin.into(),
            explanation: format!("{}的解释", word),
            derivation: format!("{}的出处", word),
            example: String::new(),
        }
    }

    fn fixture() -> IdiomStore {
        IdiomStore::from_idioms(&[
            idiom("一马当先", "yī mǎ dāng xiān"),
            idiom("先声夺人", "xiān shēng duó rén"),
            idiom("先见之明", "xiān jiàn zhī míng"),
            idiom("人山人海", "rén shān rén hǎi"),
        ])
        .unwrap()
    }

    #[test]
    fn exact_lookup_hits_and_misses() {
        let store = fixture();
        let found = store.lookup_exact("先声夺人").unwrap().unwrap();
        assert_eq!(found.word, "先声夺人");
        assert_eq!(found.pinyin, "xiān shēng duó rén");
        assert_eq!(found.explanation, "先声夺人的解释");
        assert!(store.lookup_exact("先声夺魄").unwrap().is_none());
    }

    #[test]
    fn exact_lookup_rejects_wrong_length_without_loading() {
        // no source and no connection: any query would fail to load
        let store = IdiomStore {
            source: None,
            cache: None,
            conn: RefCell::new(None),
        };
        assert!(store.lookup_exact("一马").unwrap().is_none());
        assert!(store.lookup_exact("一马当先啊").unwrap().is_none());
        assert!(store.lookup_exact("一马当先").is_err());
    }

    #[test]
    fn random_sample_is_capped_and_distinct() {
        let store = fixture();
        let words = store.sample_random(3);
        assert_eq!(words.len(), 3);
        let mut dedup = words.clone();
        dedup.sort();
        dedup.dedup();
        assert_eq!(dedup.len(), 3);

        assert_eq!(store.sample_random(100).len(), 4);
        assert!(store.sample_random(0).is_empty());
    }

    #[test]
    fn continuation_pick_respects_lead() {
        let store = fixture();
        for _ in 0..10 {
            let pick = store.random_starting_with('先').unwrap().unwrap();
            assert!(pick.word.starts_with('先'));
        }
        assert!(store.random_starting_with('海').unwrap().is_none());
    }

    #[test]
    fn positional_prefix_in_table_order() {
        let store = fixture();
        assert_eq!(
            store.lookup_by_positional_prefix(Some('先'), &[], 10),
            vec!["先声夺人".to_string(), "先见之明".to_string()]
        );
        assert_eq!(
            store.lookup_by_positional_prefix(Some('先'), &['先', '见'], 10),
            vec!["先见之明".to_string()]
        );
        assert_eq!(store.lookup_by_positional_prefix(Some('先'), &[], 1).len(), 1);
    }

    #[test]
    fn unloadable_store_degrades_advisory_calls() {
        let store = IdiomStore::new(Box::new(BytesSource::new(b"not a database".to_vec())));
        assert!(store.sample_random(5).is_empty());
        assert!(store.lookup_by_positional_prefix(Some('先'), &[], 10).is_empty());
        assert!(store.initialize(false).unwrap_err().is_load());
        assert!(!store.is_loaded());
    }

    #[test]
    fn search_idioms_returns_full_records() {
        let store = fixture();
        let hits = store.search_idioms("人山", 10);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].derivation, "人山人海的出处");
        assert!(store.search_idioms("", 10).is_empty());
    }

    #[test]
    fn forced_reload_without_source_keeps_handle() {
        let store = fixture();
        assert!(store.initialize(true).unwrap_err().is_load());
        assert_eq!(store.len().unwrap(), 4);
    }
}
