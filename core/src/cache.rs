//! Persistent key-value blob cache.
//!
//! A single named redb table holding opaque byte blobs: the raw idiom
//! database and pre-parsed reference collections. There is no eviction and
//! no versioning; a forced refresh simply overwrites the key, and `clear`
//! drops the whole table.

use std::path::{Path, PathBuf};

use redb::{Database, ReadableTable, TableDefinition, TableError};

/// Redb-backed blob store.
pub struct BlobCache {
    db: Database,
    path: PathBuf,
}

impl std::fmt::Debug for BlobCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobCache").field("path", &self.path).finish()
    }
}

impl BlobCache {
    const TABLE_DEF: TableDefinition<'static, &'static str, &'static [u8]> =
        TableDefinition::new("static_data");

    /// Create or open the cache file at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, redb::Error> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(redb::Error::Io)?;
        }
        let db = Database::create(path.as_ref())?;
        Ok(Self {
            db,
            path: path.as_ref().to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Fetch the blob stored under `key`, if any.
    pub fn get(&self, key: &str) -> Result<Option<Vec<u8>>, redb::Error> {
        let read_txn = self.db.begin_read()?;
        let table = match read_txn.open_table(Self::TABLE_DEF) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(table.get(key)?.map(|v| v.value().to_vec()))
    }

    /// Store `value` under `key`, replacing any previous blob.
    pub fn set(&self, key: &str, value: &[u8]) -> Result<(), redb::Error> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(Self::TABLE_DEF)?;
            table.insert(key, value)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Remove every cached blob.
    pub fn clear(&self) -> Result<(), redb::Error> {
        let write_txn = self.db.begin_write()?;
        write_txn.delete_table(Self::TABLE_DEF)?;
        write_txn.commit()?;
        Ok(())
    }

    /// Keys and blob sizes, in key order.
    pub fn entries(&self) -> Result<Vec<(String, usize)>, redb::Error> {
        let read_txn = self.db.begin_read()?;
        let table = match read_txn.open_table(Self::TABLE_DEF) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut out = Vec::new();
        for item in table.iter()? {
            let (k, v) = item?;
            out.push((k.value().to_string(), v.value().len()));
        }
        Ok(out)
    }
}
