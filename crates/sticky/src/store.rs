//! Persistence trait for sticky records.

use async_trait::async_trait;

use crate::{
    Result,
    types::{StickyCreate, StickyPatch, StickyRecord},
};

/// Persistence backend for sticky records, keyed by channel id.
///
/// Every method is atomic with respect to a single record: two `update` calls
/// on the same channel never interleave their read and write halves.
#[async_trait]
pub trait StickyStore: Send + Sync {
    async fn get(&self, channel_id: &str) -> Result<Option<StickyRecord>>;
    /// Fails with [`crate::Error::AlreadyExists`] when the channel has a record.
    async fn create(&self, create: StickyCreate) -> Result<StickyRecord>;
    /// Fails with [`crate::Error::NotFound`] when the channel has no record.
    async fn update(&self, channel_id: &str, patch: StickyPatch) -> Result<StickyRecord>;
    /// Returns the removed record, or `None` if there was nothing to remove.
    async fn delete(&self, channel_id: &str) -> Result<Option<StickyRecord>>;
    async fn list_all(&self) -> Result<Vec<StickyRecord>>;
}
