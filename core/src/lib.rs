//! guoxue-core
//!
//! Idiom chaining ("jielong"), idiom suggestion and reference lookup over
//! bundled Chinese datasets.
//!
//! Public API:
//! - `IdiomStore` - the embedded idiom table (exact, random, positional lookups)
//! - `SuggestionEngine` / `PositionalQuery` - per-position prefix matching
//! - `Referee`, `ChainValidator`, `RemoteReferee` - chain judgement
//! - `GameSession` - the append-only chain of one game
//! - `ReferenceStore` - dictionary, compound word and xiehouyu search
//! - `BlobCache` - persistent cache of downloaded / parsed datasets
//! - `Config` - dataset locations and limits, TOML backed
//! - `Library` - everything above wired together from a `Config`
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

pub mod error;
pub use error::{Error, Result};

pub mod idiom;
pub use idiom::{ChainStep, Idiom, JielongResponse, Speaker};

pub mod source;
pub use source::{source_for, BytesSource, DatasetSource, FileSource, HttpSource};

pub mod cache;
pub use cache::BlobCache;

pub mod idiom_store;
pub use idiom_store::IdiomStore;

pub mod suggestion;
pub use suggestion::{PositionalQuery, SuggestionEngine};

pub mod chain;
pub use chain::{check_structure, ChainValidator, Referee, Rejection};

pub mod session;
pub use session::GameSession;

pub mod reference;
pub use reference::{
    CiItem, DictionaryWord, ReferenceEntry, ReferenceKind, ReferenceStore, XiehouyuItem,
};

pub mod remote;
pub use remote::RemoteReferee;

#[cfg(test)]
mod test_support;

/// Dataset locations, limits and optional collaborators.
///
/// Every location is either a filesystem path or an `http(s)://` URL.
/// Missing keys in a TOML file take their defaults.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// SQLite idiom database.
    pub idiom_db: String,
    /// Dictionary characters JSON array.
    pub word_json: String,
    /// Compound words JSON array.
    pub ci_json: String,
    /// Xiehouyu JSON array.
    pub xiehouyu_json: String,

    /// Persistent blob cache file. No cache when unset.
    pub cache_path: Option<PathBuf>,

    /// Maximum suggestions per query
    pub suggestion_limit: usize,
    /// Maximum reference search hits
    pub search_limit: usize,
    /// Idioms offered by `Library::random_idioms`
    pub random_count: usize,
    /// Maximum entries in the suggestion cache
    pub max_cache_size: usize,

    /// Download timeout for URL locations. None waits forever.
    pub fetch_timeout_ms: Option<u64>,

    /// Remote referee endpoint. The local validator is used when unset.
    pub remote_endpoint: Option<String>,
    pub remote_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            idiom_db: "data/chinese-idioms-12976.db".to_string(),
            word_json: "data/word.json".to_string(),
            ci_json: "data/ci.json".to_string(),
            xiehouyu_json: "data/xiehouyu.json".to_string(),
            cache_path: None,
            suggestion_limit: suggestion::DEFAULT_SUGGESTION_LIMIT,
            search_limit: reference::DEFAULT_SEARCH_LIMIT,
            random_count: idiom_store::DEFAULT_RANDOM_COUNT,
            max_cache_size: 256,
            fetch_timeout_ms: None,
            remote_endpoint: None,
            remote_timeout_ms: remote::DEFAULT_REMOTE_TIMEOUT_MS,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load_toml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Save configuration to a TOML file.
    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }

    /// Load configuration from TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Serialize configuration to TOML string.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    /// Point relative dataset paths into `dir`. Only the file name of a
    /// relative path is kept, so `data/word.json` and `datasets/xinhua/word.json`
    /// both become `dir/word.json`. URLs and absolute paths are left alone.
    pub fn with_data_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        let dir = dir.as_ref();
        for location in [
            &mut self.idiom_db,
            &mut self.word_json,
            &mut self.ci_json,
            &mut self.xiehouyu_json,
        ] {
            if is_url(location) {
                continue;
            }
            let path = Path::new(location.as_str());
            if path.is_relative() {
                let file = path.file_name().map(PathBuf::from).unwrap_or_default();
                *location = dir.join(file).to_string_lossy().into_owned();
            }
        }
        self
    }

    pub fn fetch_timeout(&self) -> Option<Duration> {
        self.fetch_timeout_ms.map(Duration::from_millis)
    }

    /// Location configured for a reference collection.
    pub fn reference_location(&self, kind: ReferenceKind) -> &str {
        match kind {
            ReferenceKind::Word => &self.word_json,
            ReferenceKind::Ci => &self.ci_json,
            ReferenceKind::Xiehouyu => &self.xiehouyu_json,
        }
    }
}

fn is_url(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

/// Utility helpers.
pub mod utils {
    /// Normalize input strings (NFC) and trim whitespace.
    pub fn normalize(s: &str) -> String {
        use unicode_normalization::UnicodeNormalization;
        s.nfc().collect::<String>().trim().to_string()
    }
}

/// The whole application core wired from one `Config`.
pub struct Library {
    config: Config,
    cache: Option<Rc<BlobCache>>,
    idioms: Rc<IdiomStore>,
    suggestions: SuggestionEngine,
    validator: ChainValidator,
    reference: ReferenceStore,
    remote: Option<RemoteReferee>,
}

impl Library {
    /// Build every store from `config`. Nothing is fetched yet; datasets
    /// load on first use or through `initialize`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let cache = match &config.cache_path {
            Some(path) => Some(Rc::new(BlobCache::open(path)?)),
            None => None,
        };
        let timeout = config.fetch_timeout();

        let mut idioms = IdiomStore::new(source_for(&config.idiom_db, timeout));
        let mut reference = ReferenceStore::new(
            source_for(config.reference_location(ReferenceKind::Word), timeout),
            source_for(config.reference_location(ReferenceKind::Ci), timeout),
            source_for(config.reference_location(ReferenceKind::Xiehouyu), timeout),
        );
        if let Some(cache) = &cache {
            idioms = idioms.with_cache(Rc::clone(cache));
            reference = reference.with_cache(Rc::clone(cache));
        }

        Ok(Self::assemble(config.clone(), cache, idioms, reference))
    }

    /// Wire caller-provided stores, e.g. in-memory fixtures.
    pub fn with_stores(config: Config, idioms: IdiomStore, reference: ReferenceStore) -> Self {
        Self::assemble(config, None, idioms, reference)
    }

    fn assemble(
        config: Config,
        cache: Option<Rc<BlobCache>>,
        idioms: IdiomStore,
        reference: ReferenceStore,
    ) -> Self {
        let idioms = Rc::new(idioms);
        let suggestions = SuggestionEngine::new(
            Rc::clone(&idioms),
            config.suggestion_limit,
            config.max_cache_size,
        );
        let validator = ChainValidator::new(Rc::clone(&idioms));
        let reference = reference.with_limit(config.search_limit);
        let remote = config.remote_endpoint.as_ref().map(|endpoint| {
            let mut referee = RemoteReferee::new(endpoint.clone());
            referee.set_timeout(config.remote_timeout_ms);
            referee
        });

        Self {
            config,
            cache,
            idioms,
            suggestions,
            validator,
            reference,
            remote,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn cache(&self) -> Option<&BlobCache> {
        self.cache.as_deref()
    }

    pub fn idioms(&self) -> &IdiomStore {
        &self.idioms
    }

    pub fn suggestions(&self) -> &SuggestionEngine {
        &self.suggestions
    }

    pub fn validator(&self) -> &ChainValidator {
        &self.validator
    }

    pub fn reference(&self) -> &ReferenceStore {
        &self.reference
    }

    /// Load the idiom table unless already loaded.
    pub fn initialize(&self) -> Result<()> {
        self.idioms.initialize(false)
    }

    /// The referee games should use: remote when configured, local
    /// otherwise.
    pub fn referee(&self) -> &dyn Referee {
        match &self.remote {
            Some(remote) => remote as &dyn Referee,
            None => &self.validator,
        }
    }

    pub fn suggest(&self, input: &str, lead: Option<char>) -> Vec<String> {
        self.suggestions.suggest(input, lead)
    }

    /// A handful of random idioms to start a game with.
    pub fn random_idioms(&self) -> Vec<String> {
        self.idioms.sample_random(self.config.random_count)
    }

    pub fn search_idioms(&self, query: &str) -> Vec<Idiom> {
        self.idioms.search_idioms(query, self.config.suggestion_limit)
    }

    /// Search a reference collection, loading it first if needed.
    pub fn search(&mut self, kind: ReferenceKind, query: &str) -> Result<Vec<ReferenceEntry>> {
        self.reference.load(kind, false)?;
        Ok(self.reference.search(kind, query))
    }

    /// Force-reload every dataset: idioms first, then each reference
    /// collection. Stops at the first failure.
    pub fn refresh_all(&mut self) -> Result<()> {
        self.idioms.initialize(true)?;
        self.suggestions.clear_cache();
        for kind in ReferenceKind::ALL {
            self.reference.load(kind, true)?;
        }
        Ok(())
    }

    /// Drop every cached blob. A no-op without a cache.
    pub fn clear_cache(&self) -> Result<()> {
        if let Some(cache) = &self.cache {
            cache.clear()?;
        }
        Ok(())
    }
}
