use crate::domain::ports::ProcessStore;
use crate::domain::process::{ProcessId, ProcessRecord};
use crate::error::{BookingError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, DB, Options};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family for storing process records.
pub const CF_PROCESSES: &str = "processes";

/// A persistent process store using RocksDB.
///
/// Records are stored as JSON under their process id in the `processes`
/// column family, so unfinished processes can be recovered after a restart.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBProcessStore {
    db: Arc<DB>,
    // Serializes insert-if-absent; RocksDB has no conditional put.
    create_lock: Arc<Mutex<()>>,
}

impl RocksDBProcessStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that the "processes" column family exists.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_processes = ColumnFamilyDescriptor::new(CF_PROCESSES, Options::default());
        let db = DB::open_cf_descriptors(&opts, path, vec![cf_processes])?;

        Ok(Self {
            db: Arc::new(db),
            create_lock: Arc::new(Mutex::new(())),
        })
    }

    fn processes(&self) -> Result<&rocksdb::ColumnFamily> {
        self.db.cf_handle(CF_PROCESSES).ok_or_else(|| {
            BookingError::IoError(std::io::Error::other(
                "Processes column family not found",
            ))
        })
    }
}

#[async_trait]
impl ProcessStore for RocksDBProcessStore {
    async fn store(&self, record: ProcessRecord) -> Result<()> {
        let cf = self.processes()?;
        let value = serde_json::to_vec(&record)?;
        self.db.put_cf(cf, record.id.as_str().as_bytes(), value)?;
        Ok(())
    }

    async fn create(&self, record: ProcessRecord) -> Result<bool> {
        let _guard = self.create_lock.lock().await;
        let cf = self.processes()?;
        if self.db.get_pinned_cf(cf, record.id.as_str().as_bytes())?.is_some() {
            return Ok(false);
        }
        let value = serde_json::to_vec(&record)?;
        self.db.put_cf(cf, record.id.as_str().as_bytes(), value)?;
        Ok(true)
    }

    async fn get(&self, id: &ProcessId) -> Result<Option<ProcessRecord>> {
        let cf = self.processes()?;
        match self.db.get_cf(cf, id.as_str().as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn get_all(&self) -> Result<Vec<ProcessRecord>> {
        let cf = self.processes()?;
        let mut records = Vec::new();
        for item in self.db.iterator_cf(cf, rocksdb::IteratorMode::Start) {
            let (_key, value) = item?;
            records.push(serde_json::from_slice::<ProcessRecord>(&value)?);
        }
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(records)
    }
}
