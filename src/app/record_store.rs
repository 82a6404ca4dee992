use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::app::record::LaiRecord;
use crate::error::AppError;

/// Storage for finished calculations.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn insert(&self, record: LaiRecord) -> Result<Uuid, AppError>;
    async fn get(&self, id: Uuid) -> Option<Arc<LaiRecord>>;
    async fn len(&self) -> usize;
}

#[derive(Default)]
pub struct InMemoryRecordStore {
    records: RwLock<HashMap<Uuid, Arc<LaiRecord>>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn insert(&self, record: LaiRecord) -> Result<Uuid, AppError> {
        let id = record.id;
        self.records.write().await.insert(id, Arc::new(record));
        Ok(id)
    }

    async fn get(&self, id: Uuid) -> Option<Arc<LaiRecord>> {
        self.records.read().await.get(&id).cloned()
    }

    async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}
