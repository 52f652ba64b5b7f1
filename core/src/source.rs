//! Where bundled datasets come from.
//!
//! A `DatasetSource` yields the raw bytes of one dataset: the idiom database
//! file or one of the reference JSON arrays. Stores only ever talk to this
//! trait, so tests can hand them an in-memory or counting source.

use std::path::PathBuf;
use std::time::Duration;

use tracing::debug;

use crate::{Error, Result};

pub trait DatasetSource {
    /// Fetch the full dataset. Any failure is a load error.
    fn fetch(&self) -> Result<Vec<u8>>;

    /// Human readable location for logs and error messages.
    fn describe(&self) -> String;
}

/// A dataset shipped as a local file.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

impl DatasetSource for FileSource {
    fn fetch(&self) -> Result<Vec<u8>> {
        debug!(path = %self.path.display(), "reading dataset file");
        std::fs::read(&self.path).map_err(|e| Error::load(self.describe(), e))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// A dataset served over HTTP(S).
///
/// No timeout is applied unless one is configured; a stalled download
/// stalls the caller.
#[derive(Debug, Clone)]
pub struct HttpSource {
    url: String,
    timeout: Option<Duration>,
}

impl HttpSource {
    pub fn new<U: Into<String>>(url: U) -> Self {
        Self {
            url: url.into(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

impl DatasetSource for HttpSource {
    fn fetch(&self) -> Result<Vec<u8>> {
        debug!(url = %self.url, "downloading dataset");
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| Error::load(&self.url, e))?;

        let response = client
            .get(&self.url)
            .send()
            .map_err(|e| Error::load(&self.url, e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::load(&self.url, status));
        }

        let bytes = response.bytes().map_err(|e| Error::load(&self.url, e))?;
        Ok(bytes.to_vec())
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

/// A dataset held in memory. Handy for embedding callers and tests.
#[derive(Debug, Clone, Default)]
pub struct BytesSource {
    bytes: Vec<u8>,
}

impl BytesSource {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}

impl DatasetSource for BytesSource {
    fn fetch(&self) -> Result<Vec<u8>> {
        Ok(self.bytes.clone())
    }

    fn describe(&self) -> String {
        format!("<{} bytes in memory>", self.bytes.len())
    }
}

/// Pick a source for a configured location: `http://` and `https://` are
/// downloaded, anything else is treated as a file path.
pub fn source_for(location: &str, timeout: Option<Duration>) -> Box<dyn DatasetSource> {
    if location.starts_with("http://") || location.starts_with("https://") {
        Box::new(HttpSource::new(location).with_timeout(timeout))
    } else {
        Box::new(FileSource::new(location))
    }
}
