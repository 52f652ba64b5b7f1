//! Error type shared by every store in guoxue-core.
//!
//! Two tiers exist. Initialization-type operations (dataset fetch, database
//! construction, cache access) return `Err`. Advisory operations (random
//! sampling, suggestions) log and return an empty result instead. Chain
//! validation failures are not errors at all; they are carried as data in
//! `JielongResponse`.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// A dataset could not be fetched or materialized.
    #[error("load error: {0}")]
    Load(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("cache error: {0}")]
    Cache(#[from] redb::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),

    /// The external referee failed. Never to be read as "invalid idiom".
    #[error("remote referee error: {0}")]
    Remote(String),

    #[error("config error: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn load(context: impl std::fmt::Display, cause: impl std::fmt::Display) -> Self {
        Error::Load(format!("{}: {}", context, cause))
    }

    /// True for failures raised while fetching or materializing a dataset.
    pub fn is_load(&self) -> bool {
        matches!(self, Error::Load(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_error_display() {
        let err = Error::load("idiom db", "404 Not Found");
        assert_eq!(err.to_string(), "load error: idiom db: 404 Not Found");
        assert!(err.is_load());
    }

    #[test]
    fn io_and_codec_failures_keep_their_variant() {
        let io: Error = std::io::Error::new(std::io::ErrorKind::NotFound, "guoxue.toml").into();
        assert!(matches!(io, Error::Io(_)));
        let codec: Error = bincode::deserialize::<Vec<String>>(&[0xff]).unwrap_err().into();
        assert!(matches!(codec, Error::Codec(_)));
        assert!(!codec.is_load());
    }

    #[test]
    fn remote_error_is_not_load() {
        let err = Error::Remote("connection refused".into());
        assert!(!err.is_load());
    }
}
