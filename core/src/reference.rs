//! Static reference collections: dictionary characters, compound words and
//! two-part allegorical sayings (xiehouyu).
//!
//! Each collection is a flat JSON array shipped with the application. It is
//! parsed once, kept in memory for the rest of the process, and searched by
//! plain substring containment in collection order. When a `BlobCache` is
//! attached, parsed collections are stored there (bincode) so later sessions
//! skip both the fetch and the JSON parse.

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::rc::Rc;
use tracing::{info, warn};

use crate::cache::BlobCache;
use crate::source::DatasetSource;
use crate::{Error, Result};

/// Default cap on search results.
pub const DEFAULT_SEARCH_LIMIT: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    /// Single-character dictionary entries.
    Word,
    /// Compound words.
    Ci,
    /// Riddle / answer sayings.
    Xiehouyu,
}

impl ReferenceKind {
    pub const ALL: [ReferenceKind; 3] = [
        ReferenceKind::Word,
        ReferenceKind::Ci,
        ReferenceKind::Xiehouyu,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ReferenceKind::Word => "word",
            ReferenceKind::Ci => "ci",
            ReferenceKind::Xiehouyu => "xiehouyu",
        }
    }

    pub fn cache_key(&self) -> String {
        format!("json_data_{}", self.name())
    }
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ReferenceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "word" | "dictionary" => Ok(ReferenceKind::Word),
            "ci" => Ok(ReferenceKind::Ci),
            "xiehouyu" => Ok(ReferenceKind::Xiehouyu),
            other => Err(Error::Config(format!("unknown reference kind: {}", other))),
        }
    }
}

/// A dictionary character entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictionaryWord {
    pub word: String,
    #[serde(default)]
    pub oldword: Option<String>,
    #[serde(default)]
    pub pinyin: String,
    #[serde(default)]
    pub radicals: String,
    #[serde(default)]
    pub strokes: String,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub more: Option<String>,
}

/// A compound word entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CiItem {
    pub ci: String,
    #[serde(default)]
    pub explanation: String,
}

/// A two-part allegorical saying.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XiehouyuItem {
    pub riddle: String,
    pub answer: String,
}

/// Anything a reference collection can hold.
pub trait Entry: Clone + Serialize + DeserializeOwned {
    /// Case-sensitive substring test against the entry's primary text.
    fn matches(&self, query: &str) -> bool;
}

impl Entry for DictionaryWord {
    fn matches(&self, query: &str) -> bool {
        self.word.contains(query)
    }
}

impl Entry for CiItem {
    fn matches(&self, query: &str) -> bool {
        self.ci.contains(query)
    }
}

impl Entry for XiehouyuItem {
    fn matches(&self, query: &str) -> bool {
        self.riddle.contains(query) || self.answer.contains(query)
    }
}

/// A search hit of any kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ReferenceEntry {
    Word(DictionaryWord),
    Ci(CiItem),
    Xiehouyu(XiehouyuItem),
}

/// First `limit` entries matching `query`, in collection order. An empty
/// query matches nothing.
pub fn search_in<T: Entry>(items: &[T], query: &str, limit: usize) -> Vec<T> {
    if query.is_empty() {
        return Vec::new();
    }
    items
        .iter()
        .filter(|item| item.matches(query))
        .take(limit)
        .cloned()
        .collect()
}

pub struct ReferenceStore {
    word_source: Box<dyn DatasetSource>,
    ci_source: Box<dyn DatasetSource>,
    xiehouyu_source: Box<dyn DatasetSource>,
    cache: Option<Rc<BlobCache>>,
    limit: usize,
    words: Vec<DictionaryWord>,
    ci: Vec<CiItem>,
    xiehouyu: Vec<XiehouyuItem>,
}

impl fmt::Debug for ReferenceStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReferenceStore")
            .field("words", &self.words.len())
            .field("ci", &self.ci.len())
            .field("xiehouyu", &self.xiehouyu.len())
            .field("limit", &self.limit)
            .finish()
    }
}

impl ReferenceStore {
    pub fn new(
        word_source: Box<dyn DatasetSource>,
        ci_source: Box<dyn DatasetSource>,
        xiehouyu_source: Box<dyn DatasetSource>,
    ) -> Self {
        Self {
            word_source,
            ci_source,
            xiehouyu_source,
            cache: None,
            limit: DEFAULT_SEARCH_LIMIT,
            words: Vec::new(),
            ci: Vec::new(),
            xiehouyu: Vec::new(),
        }
    }

    pub fn with_cache(mut self, cache: Rc<BlobCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Populate the collection for `kind`.
    ///
    /// A non-empty collection is left alone unless `force_reload` is set.
    /// Otherwise the cache is consulted first (unless forced), then the
    /// source. On failure the previous collection stays in place.
    pub fn load(&mut self, kind: ReferenceKind, force_reload: bool) -> Result<()> {
        let cache = self.cache.as_deref();
        match kind {
            ReferenceKind::Word => load_collection(
                &mut self.words,
                kind,
                self.word_source.as_ref(),
                cache,
                force_reload,
            ),
            ReferenceKind::Ci => load_collection(
                &mut self.ci,
                kind,
                self.ci_source.as_ref(),
                cache,
                force_reload,
            ),
            ReferenceKind::Xiehouyu => load_collection(
                &mut self.xiehouyu,
                kind,
                self.xiehouyu_source.as_ref(),
                cache,
                force_reload,
            ),
        }
    }

    pub fn len(&self, kind: ReferenceKind) -> usize {
        match kind {
            ReferenceKind::Word => self.words.len(),
            ReferenceKind::Ci => self.ci.len(),
            ReferenceKind::Xiehouyu => self.xiehouyu.len(),
        }
    }

    pub fn is_loaded(&self, kind: ReferenceKind) -> bool {
        self.len(kind) > 0
    }

    pub fn search(&self, kind: ReferenceKind, query: &str) -> Vec<ReferenceEntry> {
        match kind {
            ReferenceKind::Word => self
                .search_words(query)
                .into_iter()
                .map(ReferenceEntry::Word)
                .collect(),
            ReferenceKind::Ci => self
                .search_ci(query)
                .into_iter()
                .map(ReferenceEntry::Ci)
                .collect(),
            ReferenceKind::Xiehouyu => self
                .search_xiehouyu(query)
                .into_iter()
                .map(ReferenceEntry::Xiehouyu)
                .collect(),
        }
    }

    pub fn search_words(&self, query: &str) -> Vec<DictionaryWord> {
        search_in(&self.words, query, self.limit)
    }

    pub fn search_ci(&self, query: &str) -> Vec<CiItem> {
        search_in(&self.ci, query, self.limit)
    }

    /// Matches on either half of the saying.
    pub fn search_xiehouyu(&self, query: &str) -> Vec<XiehouyuItem> {
        search_in(&self.xiehouyu, query, self.limit)
    }
}

fn load_collection<T: Entry>(
    slot: &mut Vec<T>,
    kind: ReferenceKind,
    source: &dyn DatasetSource,
    cache: Option<&BlobCache>,
    force_reload: bool,
) -> Result<()> {
    if !force_reload && !slot.is_empty() {
        return Ok(());
    }

    let key = kind.cache_key();
    if !force_reload {
        if let Some(cached) = cache.and_then(|c| read_cached::<T>(c, &key)) {
            info!(%kind, entries = cached.len(), "reference data hydrated from cache");
            *slot = cached;
            return Ok(());
        }
    }

    let bytes = source.fetch()?;
    let parsed: Vec<T> =
        serde_json::from_slice(&bytes).map_err(|e| Error::load(source.describe(), e))?;
    info!(%kind, entries = parsed.len(), source = %source.describe(), "reference data loaded");

    if let Some(cache) = cache {
        let stored = bincode::serialize(&parsed)
            .map_err(Error::from)
            .and_then(|blob| cache.set(&key, &blob).map_err(Error::from));
        if let Err(e) = stored {
            warn!(%kind, error = %e, "failed to cache reference data");
        }
    }

    *slot = parsed;
    Ok(())
}

fn read_cached<T: Entry>(cache: &BlobCache, key: &str) -> Option<Vec<T>> {
    let blob = match cache.get(key) {
        Ok(blob) => blob?,
        Err(e) => {
            warn!(key, error = %e, "reference cache read failed");
            return None;
        }
    };
    match bincode::deserialize(&blob) {
        Ok(entries) => Some(entries),
        Err(e) => {
            warn!(key, error = %e, "cached reference data unreadable, refetching");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ci(word: &str) -> CiItem {
        CiItem {
            ci: word.into(),
            explanation: String::new(),
        }
    }

    #[test]
    fn kind_names_and_keys() {
        assert_eq!(ReferenceKind::Word.cache_key(), "json_data_word");
        assert_eq!("dictionary".parse::<ReferenceKind>().unwrap(), ReferenceKind::Word);
        assert_eq!("xiehouyu".parse::<ReferenceKind>().unwrap(), ReferenceKind::Xiehouyu);
        assert!("idiom".parse::<ReferenceKind>().is_err());
    }

    #[test]
    fn empty_query_matches_nothing() {
        let items = vec![ci("天下"), ci("天空")];
        assert!(search_in(&items, "", 50).is_empty());
    }

    #[test]
    fn search_keeps_collection_order_and_caps() {
        let items: Vec<CiItem> = (0..80).map(|i| ci(&format!("天{}", i))).collect();
        let hits = search_in(&items, "天", 50);
        assert_eq!(hits.len(), 50);
        assert_eq!(hits[0].ci, "天0");
        assert_eq!(hits[49].ci, "天49");
    }

    #[test]
    fn xiehouyu_matches_either_half() {
        let items = vec![XiehouyuItem {
            riddle: "外甥打灯笼".into(),
            answer: "照舅（旧）".into(),
        }];
        assert_eq!(search_in(&items, "灯笼", 50).len(), 1);
        assert_eq!(search_in(&items, "照舅", 50).len(), 1);
        assert!(search_in(&items, "舅舅", 50).is_empty());
    }

    #[test]
    fn dictionary_json_shape() {
        let json = r#"[{"word":"嗄","oldword":"嗄","strokes":"13","pinyin":"á","radicals":"口","explanation":"嗄〈叹〉","more":"嗄 a"}]"#;
        let words: Vec<DictionaryWord> = serde_json::from_str(json).unwrap();
        assert_eq!(words[0].word, "嗄");
        assert_eq!(words[0].strokes, "13");
        assert!(words[0].matches("嗄"));
        assert!(!words[0].matches("口"));
    }

    #[test]
    fn bincode_roundtrip_keeps_optional_fields() {
        let words = vec![DictionaryWord {
            word: "吖".into(),
            oldword: None,
            pinyin: "ā".into(),
            radicals: "口".into(),
            strokes: "6".into(),
            explanation: String::new(),
            more: Some("more".into()),
        }];
        let blob = bincode::serialize(&words).unwrap();
        let back: Vec<DictionaryWord> = bincode::deserialize(&blob).unwrap();
        assert_eq!(back, words);
    }
}
