use crate::domain::ports::ProcessStore;
use crate::domain::process::{ProcessId, ProcessRecord};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory store for process records.
///
/// Uses `Arc<RwLock<HashMap<ProcessId, ProcessRecord>>>` to allow shared concurrent access.
/// Nothing survives the process, so it suits tests and one-off demo runs.
#[derive(Default, Clone)]
pub struct InMemoryProcessStore {
    records: Arc<RwLock<HashMap<ProcessId, ProcessRecord>>>,
}

impl InMemoryProcessStore {
    /// Creates a new, empty in-memory process store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProcessStore for InMemoryProcessStore {
    async fn store(&self, record: ProcessRecord) -> Result<()> {
        let mut records = self.records.write().await;
        records.insert(record.id.clone(), record);
        Ok(())
    }

    async fn create(&self, record: ProcessRecord) -> Result<bool> {
        let mut records = self.records.write().await;
        match records.entry(record.id.clone()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(true)
            }
        }
    }

    async fn get(&self, id: &ProcessId) -> Result<Option<ProcessRecord>> {
        let records = self.records.read().await;
        Ok(records.get(id).cloned())
    }

    async fn get_all(&self) -> Result<Vec<ProcessRecord>> {
        let records = self.records.read().await;
        let mut all: Vec<ProcessRecord> = records.values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(all)
    }
}
