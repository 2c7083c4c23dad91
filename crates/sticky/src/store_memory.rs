//! In-memory store for tests and throwaway deployments.

use std::{
    collections::{HashMap, hash_map::Entry},
    sync::Mutex,
};

use async_trait::async_trait;

use crate::{
    Error, Result,
    store::StickyStore,
    types::{StickyCreate, StickyPatch, StickyRecord, now_ms},
};

/// In-memory store backed by `HashMap`. Nothing survives a restart.
pub struct InMemoryStore {
    records: Mutex<HashMap<String, StickyRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StickyStore for InMemoryStore {
    async fn get(&self, channel_id: &str) -> Result<Option<StickyRecord>> {
        let records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        Ok(records.get(channel_id).cloned())
    }

    async fn create(&self, create: StickyCreate) -> Result<StickyRecord> {
        let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        match records.entry(create.channel_id.clone()) {
            Entry::Occupied(_) => Err(Error::already_exists(create.channel_id)),
            Entry::Vacant(slot) => Ok(slot.insert(create.into_record(now_ms())).clone()),
        }
    }

    async fn update(&self, channel_id: &str, patch: StickyPatch) -> Result<StickyRecord> {
        let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        let record = records
            .get_mut(channel_id)
            .ok_or_else(|| Error::not_found(channel_id))?;
        patch.apply(record, now_ms());
        Ok(record.clone())
    }

    async fn delete(&self, channel_id: &str) -> Result<Option<StickyRecord>> {
        let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        Ok(records.remove(channel_id))
    }

    async fn list_all(&self) -> Result<Vec<StickyRecord>> {
        let records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        Ok(records.values().cloned().collect())
    }
}
