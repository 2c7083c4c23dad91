//! JSON file-backed sticky store with atomic writes.

use std::path::PathBuf;

use {async_trait::async_trait, tokio::fs, tokio::sync::Mutex};

use crate::{
    Error, Result,
    store::StickyStore,
    types::{StickyCreate, StickyPatch, StickyRecord, now_ms},
};

/// File-backed store. All records live in one JSON array.
pub struct FileStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles on the file.
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    async fn load(&self) -> Result<Vec<StickyRecord>> {
        if !fs::try_exists(&self.path).await.unwrap_or(false) {
            return Ok(Vec::new());
        }
        let data = fs::read_to_string(&self.path).await?;
        if data.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&data)?)
    }

    /// Atomic write: write to temp, rename over target, keep `.bak`.
    async fn atomic_write(&self, records: &[StickyRecord]) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(records)?;
        let tmp = self.path.with_extension("json.tmp");

        fs::write(&tmp, json.as_bytes()).await?;

        if fs::try_exists(&self.path).await.unwrap_or(false) {
            let bak = self.path.with_extension("json.bak");
            let _ = fs::copy(&self.path, &bak).await;
        }

        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl StickyStore for FileStore {
    async fn get(&self, channel_id: &str) -> Result<Option<StickyRecord>> {
        Ok(self
            .load()
            .await?
            .into_iter()
            .find(|r| r.channel_id == channel_id))
    }

    async fn create(&self, create: StickyCreate) -> Result<StickyRecord> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.load().await?;
        if records.iter().any(|r| r.channel_id == create.channel_id) {
            return Err(Error::already_exists(create.channel_id));
        }
        let record = create.into_record(now_ms());
        records.push(record.clone());
        self.atomic_write(&records).await?;
        Ok(record)
    }

    async fn update(&self, channel_id: &str, patch: StickyPatch) -> Result<StickyRecord> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.load().await?;
        let record = records
            .iter_mut()
            .find(|r| r.channel_id == channel_id)
            .ok_or_else(|| Error::not_found(channel_id))?;
        patch.apply(record, now_ms());
        let updated = record.clone();
        self.atomic_write(&records).await?;
        Ok(updated)
    }

    async fn delete(&self, channel_id: &str) -> Result<Option<StickyRecord>> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.load().await?;
        let Some(pos) = records.iter().position(|r| r.channel_id == channel_id) else {
            return Ok(None);
        };
        let removed = records.remove(pos);
        self.atomic_write(&records).await?;
        Ok(Some(removed))
    }

    async fn list_all(&self) -> Result<Vec<StickyRecord>> {
        self.load().await
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, crate::types::WebhookIdentity, std::sync::Arc, tempfile::TempDir};

    fn make_store(dir: &std::path::Path) -> FileStore {
        FileStore::new(dir.join("stickies.json"))
    }

    fn create(channel: &str) -> StickyCreate {
        StickyCreate {
            channel_id: channel.into(),
            message: "welcome".into(),
            use_webhook: true,
        }
    }

    #[tokio::test]
    async fn survives_reopen() {
        let tmp = TempDir::new().unwrap();
        {
            let store = make_store(tmp.path());
            store.create(create("c1")).await.unwrap();
            store
                .update(
                    "c1",
                    StickyPatch::webhook_identity(WebhookIdentity {
                        id: "w1".into(),
                        token: "tok".into(),
                        name: "Sticky".into(),
                        avatar_url: None,
                    }),
                )
                .await
                .unwrap();
        }

        let reopened = make_store(tmp.path());
        let rec = reopened.get("c1").await.unwrap().unwrap();
        assert_eq!(rec.webhook_identity.unwrap().token, "tok");
    }

    #[tokio::test]
    async fn load_empty() {
        let tmp = TempDir::new().unwrap();
        assert!(make_store(tmp.path()).list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_create_rejected() {
        let tmp = TempDir::new().unwrap();
        let store = make_store(tmp.path());
        store.create(create("c1")).await.unwrap();
        assert!(matches!(
            store.create(create("c1")).await.unwrap_err(),
            Error::AlreadyExists { .. }
        ));
    }

    #[tokio::test]
    async fn backup_created_on_second_write() {
        let tmp = TempDir::new().unwrap();
        let store = make_store(tmp.path());
        store.create(create("c1")).await.unwrap();
        store.create(create("c2")).await.unwrap();
        assert!(tmp.path().join("stickies.json.bak").exists());
    }

    #[tokio::test]
    async fn delete_missing_is_none() {
        let tmp = TempDir::new().unwrap();
        let store = make_store(tmp.path());
        assert!(store.delete("c1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn concurrent_increments_serialize() {
        let tmp = TempDir::new().unwrap();
        let store = Arc::new(make_store(tmp.path()));
        store.create(create("c1")).await.unwrap();

        let mut tasks = Vec::new();
        for _ in 0..10 {
            let store = Arc::clone(&store);
            tasks.push(tokio::spawn(async move {
                store.update("c1", StickyPatch::increment()).await.unwrap();
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(store.get("c1").await.unwrap().unwrap().msg_count, 10);
    }
}
