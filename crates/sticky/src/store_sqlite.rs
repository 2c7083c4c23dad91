//! SQLite-backed sticky store using sqlx.

use {
    async_trait::async_trait,
    sqlx::{Row, SqlitePool, sqlite::SqlitePoolOptions, sqlite::SqliteRow},
    tokio::sync::Mutex,
};

use crate::{
    Error, Result,
    store::StickyStore,
    types::{StickyCreate, StickyPatch, StickyRecord, WebhookIdentity, now_ms},
};

const SELECT_COLUMNS: &str = "SELECT channel_id, message, msg_count, artifact_id, use_webhook,
        webhook_id, webhook_token, webhook_name, webhook_avatar_url,
        created_at_ms, updated_at_ms
     FROM sticky_records";

/// SQLite-backed persistence for sticky records.
pub struct SqliteStore {
    pool: SqlitePool,
    /// Serializes read-modify-write updates so concurrent patches never
    /// overwrite each other.
    write_lock: Mutex<()>,
}

impl SqliteStore {
    /// Create a new store with its own connection pool and run migrations.
    ///
    /// For a shared pool use [`SqliteStore::with_pool`] after calling
    /// [`crate::run_migrations`].
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        crate::run_migrations(&pool).await?;

        Ok(Self::with_pool(pool))
    }

    /// Create a store using an existing pool (migrations must already be run).
    pub fn with_pool(pool: SqlitePool) -> Self {
        Self {
            pool,
            write_lock: Mutex::new(()),
        }
    }
}

fn row_to_record(row: &SqliteRow) -> StickyRecord {
    let webhook_id: Option<String> = row.get("webhook_id");
    let webhook_token: Option<String> = row.get("webhook_token");
    let webhook_identity = match (webhook_id, webhook_token) {
        (Some(id), Some(token)) => Some(WebhookIdentity {
            id,
            token,
            name: row
                .get::<Option<String>, _>("webhook_name")
                .unwrap_or_default(),
            avatar_url: row.get("webhook_avatar_url"),
        }),
        _ => None,
    };

    StickyRecord {
        channel_id: row.get("channel_id"),
        message: row.get("message"),
        msg_count: row.get::<i64, _>("msg_count").max(0) as u64,
        artifact_id: row.get("artifact_id"),
        use_webhook: row.get::<i64, _>("use_webhook") != 0,
        webhook_identity,
        created_at_ms: row.get::<i64, _>("created_at_ms") as u64,
        updated_at_ms: row.get::<i64, _>("updated_at_ms") as u64,
    }
}

#[async_trait]
impl StickyStore for SqliteStore {
    async fn get(&self, channel_id: &str) -> Result<Option<StickyRecord>> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE channel_id = ?"))
            .bind(channel_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(row_to_record))
    }

    async fn create(&self, create: StickyCreate) -> Result<StickyRecord> {
        let record = create.into_record(now_ms());
        let result = sqlx::query(
            "INSERT OR IGNORE INTO sticky_records
                (channel_id, message, msg_count, use_webhook, created_at_ms, updated_at_ms)
             VALUES (?, ?, 0, ?, ?, ?)",
        )
        .bind(&record.channel_id)
        .bind(&record.message)
        .bind(i64::from(record.use_webhook))
        .bind(record.created_at_ms as i64)
        .bind(record.updated_at_ms as i64)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::already_exists(record.channel_id));
        }
        Ok(record)
    }

    async fn update(&self, channel_id: &str, patch: StickyPatch) -> Result<StickyRecord> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE channel_id = ?"))
            .bind(channel_id)
            .fetch_optional(&mut *tx)
            .await?;
        let mut record = row
            .as_ref()
            .map(row_to_record)
            .ok_or_else(|| Error::not_found(channel_id))?;

        patch.apply(&mut record, now_ms());
        let identity = record.webhook_identity.as_ref();

        sqlx::query(
            "UPDATE sticky_records SET
                message = ?, msg_count = ?, artifact_id = ?, use_webhook = ?,
                webhook_id = ?, webhook_token = ?, webhook_name = ?, webhook_avatar_url = ?,
                updated_at_ms = ?
             WHERE channel_id = ?",
        )
        .bind(&record.message)
        .bind(record.msg_count.min(i64::MAX as u64) as i64)
        .bind(&record.artifact_id)
        .bind(i64::from(record.use_webhook))
        .bind(identity.map(|i| i.id.as_str()))
        .bind(identity.map(|i| i.token.as_str()))
        .bind(identity.map(|i| i.name.as_str()))
        .bind(identity.and_then(|i| i.avatar_url.as_deref()))
        .bind(record.updated_at_ms as i64)
        .bind(channel_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(record)
    }

    async fn delete(&self, channel_id: &str) -> Result<Option<StickyRecord>> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE channel_id = ?"))
            .bind(channel_id)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(record) = row.as_ref().map(row_to_record) else {
            return Ok(None);
        };

        sqlx::query("DELETE FROM sticky_records WHERE channel_id = ?")
            .bind(channel_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(record))
    }

    async fn list_all(&self) -> Result<Vec<StickyRecord>> {
        let rows = sqlx::query(&format!("{SELECT_COLUMNS} ORDER BY created_at_ms ASC"))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(row_to_record).collect())
    }
}
