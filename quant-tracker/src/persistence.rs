use crate::error::TrackerError;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;

/// Durable JSON object storage, keyed by a path under a configured prefix. The concrete
/// S3/filesystem driver is an external collaborator (spec's "S3 persistence drivers ... only
/// their required capabilities are specified"); this trait is the seam the Tracker depends on.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put_json(&self, path: &str, value: &Value) -> Result<(), TrackerError>;
    async fn get_json(&self, path: &str) -> Result<Option<Value>, TrackerError>;
}

/// In-memory store for tests and for driving the pipeline without a live broker/object
/// store, grounded on the teacher's `InMemoryRepository` split between storage backends.
#[derive(Default)]
pub struct InMemoryObjectStore {
    data: Mutex<HashMap<String, Value>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn put_json(&self, path: &str, value: &Value) -> Result<(), TrackerError> {
        self.data.lock().insert(path.to_string(), value.clone());
        Ok(())
    }

    async fn get_json(&self, path: &str) -> Result<Option<Value>, TrackerError> {
        Ok(self.data.lock().get(path).cloned())
    }
}

/// Filesystem-backed store for local/paper runs, writing one JSON file per path under a base
/// directory. The original's S3 driver is the out-of-scope production backend; this is the
/// local equivalent used when no object-store client is wired in.
pub struct FilesystemObjectStore {
    base_dir: PathBuf,
}

impl FilesystemObjectStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self { base_dir: base_dir.into() }
    }

    fn full_path(&self, path: &str) -> PathBuf {
        self.base_dir.join(path)
    }
}

#[async_trait]
impl ObjectStore for FilesystemObjectStore {
    async fn put_json(&self, path: &str, value: &Value) -> Result<(), TrackerError> {
        let full_path = self.full_path(path);
        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| TrackerError::PersistenceWrite { path: path.to_string(), detail: e.to_string() })?;
        }
        let rendered = serde_json::to_vec_pretty(value)
            .map_err(|e| TrackerError::PersistenceWrite { path: path.to_string(), detail: e.to_string() })?;
        tokio::fs::write(&full_path, rendered)
            .await
            .map_err(|e| TrackerError::PersistenceWrite { path: path.to_string(), detail: e.to_string() })
    }

    async fn get_json(&self, path: &str) -> Result<Option<Value>, TrackerError> {
        let full_path = self.full_path(path);
        match tokio::fs::read(&full_path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| TrackerError::PersistenceRead { path: path.to_string(), detail: e.to_string() }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(TrackerError::PersistenceRead { path: path.to_string(), detail: e.to_string() }),
        }
    }
}

/// Path templates, relative to a configured `prefix`, matching the original's
/// `strategy_orders/`, `strategy_positions/` and `strategy_pnl_history/` layout.
pub fn recent_orders_path(prefix: &str) -> String {
    format!("{prefix}/strategy_orders/recent_orders.json")
}

pub fn current_positions_path(prefix: &str) -> String {
    format!("{prefix}/strategy_positions/current_positions.json")
}

pub fn realized_pnl_path(prefix: &str) -> String {
    format!("{prefix}/strategy_positions/realized_pnl.json")
}

pub fn daily_archive_path(prefix: &str, date_key: &str) -> String {
    format!("{prefix}/strategy_pnl_history/{date_key}.json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn in_memory_store_round_trips() {
        let store = InMemoryObjectStore::new();
        assert_eq!(store.get_json("a").await.unwrap(), None);

        store.put_json("a", &json!({"x": 1})).await.unwrap();
        assert_eq!(store.get_json("a").await.unwrap(), Some(json!({"x": 1})));
    }
}
