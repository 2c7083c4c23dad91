//! Store selection from `[storage]`.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use {anyhow::Context, tracing::info};

use {
    stickler_config::{StorageBackend, StorageConfig},
    stickler_sticky::{
        StickyStore, store_file::FileStore, store_memory::InMemoryStore,
        store_sqlite::SqliteStore,
    },
};

/// Where the backend keeps its data: the configured path or a default file
/// in `data_dir`. `None` for the in-memory backend.
pub fn resolve_path(config: &StorageConfig, data_dir: &Path) -> Option<PathBuf> {
    let default_name = match config.backend {
        StorageBackend::Sqlite => "stickler.db",
        StorageBackend::File => "stickler.json",
        StorageBackend::Memory => return None,
    };
    Some(
        config
            .path
            .clone()
            .unwrap_or_else(|| data_dir.join(default_name)),
    )
}

pub async fn open_store(config: &StorageConfig, data_dir: &Path) -> anyhow::Result<Arc<dyn StickyStore>> {
    let Some(path) = resolve_path(config, data_dir) else {
        info!(backend = %config.backend, "using in-memory store; stickies are lost on exit");
        return Ok(Arc::new(InMemoryStore::new()));
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    info!(backend = %config.backend, path = %path.display(), "opening sticky store");

    let store: Arc<dyn StickyStore> = match config.backend {
        StorageBackend::Sqlite => {
            let url = format!("sqlite://{}?mode=rwc", path.display());
            Arc::new(
                SqliteStore::new(&url)
                    .await
                    .with_context(|| format!("failed to open database {}", path.display()))?,
            )
        },
        StorageBackend::File => Arc::new(FileStore::new(path)),
        StorageBackend::Memory => Arc::new(InMemoryStore::new()),
    };
    Ok(store)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_paths_live_in_data_dir() {
        let data = Path::new("/var/lib/stickler");
        let sqlite = StorageConfig::default();
        assert_eq!(
            resolve_path(&sqlite, data),
            Some(PathBuf::from("/var/lib/stickler/stickler.db"))
        );

        let file = StorageConfig {
            backend: StorageBackend::File,
            path: None,
        };
        assert_eq!(
            resolve_path(&file, data),
            Some(PathBuf::from("/var/lib/stickler/stickler.json"))
        );

        let memory = StorageConfig {
            backend: StorageBackend::Memory,
            path: Some("ignored.db".into()),
        };
        assert_eq!(resolve_path(&memory, data), None);
    }

    #[test]
    fn explicit_path_wins() {
        let config = StorageConfig {
            backend: StorageBackend::Sqlite,
            path: Some("/tmp/custom.db".into()),
        };
        assert_eq!(
            resolve_path(&config, Path::new("/unused")),
            Some(PathBuf::from("/tmp/custom.db"))
        );
    }

    #[tokio::test]
    async fn opens_sqlite_in_nested_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let data_dir = tmp.path().join("nested").join("data");
        let store = open_store(&StorageConfig::default(), &data_dir).await.unwrap();
        assert!(store.list_all().await.unwrap().is_empty());
        assert!(data_dir.join("stickler.db").exists());
    }

    #[tokio::test]
    async fn opens_file_store() {
        let tmp = tempfile::tempdir().unwrap();
        let config = StorageConfig {
            backend: StorageBackend::File,
            path: None,
        };
        let store = open_store(&config, tmp.path()).await.unwrap();
        assert!(store.list_all().await.unwrap().is_empty());
    }
}
