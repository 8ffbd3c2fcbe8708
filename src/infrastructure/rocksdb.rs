use crate::domain::ports::KeyValueStorage;
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, Options};
use std::io;
use std::path::Path;
use std::sync::Arc;

/// Column Family holding the SDK's persisted entries.
pub const CF_SDK_STORAGE: &str = "sdk_storage";

/// Key-value storage that survives restarts, backed by RocksDB.
///
/// Holds the cached remote config, certificate pins, the remembered bank app
/// and the remember-me cookies.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDbStorage {
    db: Arc<DB>,
}

impl RocksDbStorage {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// # Arguments
    ///
    /// * `path` - The filesystem path where the database will be stored.
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf = ColumnFamilyDescriptor::new(CF_SDK_STORAGE, Options::default());
        let db = DB::open_cf_descriptors(&opts, path, vec![cf]).map_err(io::Error::other)?;

        Ok(Self { db: Arc::new(db) })
    }

    fn cf(&self) -> io::Result<&ColumnFamily> {
        self.db
            .cf_handle(CF_SDK_STORAGE)
            .ok_or_else(|| io::Error::other("storage column family not found"))
    }
}

#[async_trait]
impl KeyValueStorage for RocksDbStorage {
    async fn get(&self, key: &str) -> io::Result<Option<String>> {
        let cf = self.cf()?;
        let Some(bytes) = self.db.get_cf(&cf, key).map_err(io::Error::other)? else {
            return Ok(None);
        };
        String::from_utf8(bytes)
            .map(Some)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    async fn set(&self, key: &str, value: &str) -> io::Result<()> {
        let cf = self.cf()?;
        self.db.put_cf(&cf, key, value).map_err(io::Error::other)
    }

    async fn remove(&self, key: &str) -> io::Result<()> {
        let cf = self.cf()?;
        self.db.delete_cf(&cf, key).map_err(io::Error::other)
    }
}
