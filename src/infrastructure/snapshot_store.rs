//! 目录快照存储 - 基础设施层
//!
//! 保存"当前任务名 + 工作项目录"，重启后可以恢复。
//! 作为可注入的副作用端口，核心不依赖具体存储位置。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{Result, SyncError};
use crate::models::{JobType, WorkItem};

/// 目录快照
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    pub job_name: Option<String>,
    #[serde(default)]
    pub job_type: JobType,
    #[serde(default)]
    pub items: Vec<WorkItem>,
}

/// 快照存储端口
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn load(&self) -> Result<Option<CatalogSnapshot>>;

    async fn save(&self, snapshot: &CatalogSnapshot) -> Result<()>;
}

/// JSON 文件快照
pub struct JsonFileSnapshotStore {
    path: PathBuf,
}

impl JsonFileSnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SnapshotStore for JsonFileSnapshotStore {
    async fn load(&self) -> Result<Option<CatalogSnapshot>> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("快照文件不存在: {}", self.path.display());
                return Ok(None);
            }
            Err(e) => return Err(SyncError::file(&self.path, e)),
        };

        let snapshot =
            serde_json::from_str(&content).map_err(|source| SyncError::SnapshotCorrupt {
                path: self.path.clone(),
                source,
            })?;

        Ok(Some(snapshot))
    }

    async fn save(&self, snapshot: &CatalogSnapshot) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| SyncError::file(parent, e))?;
        }

        let content =
            serde_json::to_string_pretty(snapshot).map_err(|source| SyncError::SnapshotCorrupt {
                path: self.path.clone(),
                source,
            })?;

        fs::write(&self.path, content)
            .await
            .map_err(|e| SyncError::file(&self.path, e))?;

        debug!(
            "快照已保存: {} ({} 个工作项)",
            self.path.display(),
            snapshot.items.len()
        );
        Ok(())
    }
}

/// 按顺序写快照
///
/// 快照在状态锁内领取序号，写入在锁外进行。
/// 序号不大于已写入序号的快照直接丢弃，旧目录不会覆盖新目录。
pub struct SnapshotWriter {
    store: Arc<dyn SnapshotStore>,
    issued: AtomicU64,
    saved: Mutex<u64>,
}

impl SnapshotWriter {
    pub fn new(store: Arc<dyn SnapshotStore>) -> Self {
        Self {
            store,
            issued: AtomicU64::new(0),
            saved: Mutex::new(0),
        }
    }

    pub fn store(&self) -> &Arc<dyn SnapshotStore> {
        &self.store
    }

    /// 领取写入序号（需要在生成快照的同一把锁内调用）
    pub fn issue(&self) -> u64 {
        self.issued.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// 写入快照
    ///
    /// # 返回
    /// - `Ok(true)`: 已写入
    /// - `Ok(false)`: 已有更新的快照写入，本次丢弃
    pub async fn write(&self, seq: u64, snapshot: &CatalogSnapshot) -> Result<bool> {
        let mut saved = self.saved.lock().await;
        if seq <= *saved {
            debug!("丢弃过期快照 #{} (已写入 #{})", seq, *saved);
            return Ok(false);
        }
        self.store.save(snapshot).await?;
        *saved = seq;
        Ok(true)
    }
}

/// 内存快照（不持久化）
#[derive(Default)]
pub struct MemorySnapshotStore {
    inner: Mutex<Option<CatalogSnapshot>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: CatalogSnapshot) -> Self {
        Self {
            inner: Mutex::new(Some(snapshot)),
        }
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn load(&self) -> Result<Option<CatalogSnapshot>> {
        Ok(self.inner.lock().await.clone())
    }

    async fn save(&self, snapshot: &CatalogSnapshot) -> Result<()> {
        *self.inner.lock().await = Some(snapshot.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WorkStatus;

    fn snapshot() -> CatalogSnapshot {
        CatalogSnapshot {
            job_name: Some("job-a".to_string()),
            job_type: JobType::Bias,
            items: vec![WorkItem::new(
                "w1",
                WorkStatus::ReadyForReview,
                "job-a",
                JobType::Bias,
            )],
        }
    }

    #[tokio::test]
    async fn test_file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileSnapshotStore::new(dir.path().join("nested").join("snap.json"));

        assert!(store.load().await.unwrap().is_none());
        store.save(&snapshot()).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(snapshot()));
    }

    #[tokio::test]
    async fn test_file_store_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileSnapshotStore::new(dir.path().join("absent.json"));
        assert_eq!(store.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_file_store_unreadable_path_is_file_error() {
        let dir = tempfile::tempdir().unwrap();
        // 目录不能当作文件读取
        let err = JsonFileSnapshotStore::new(dir.path()).load().await.unwrap_err();
        assert!(matches!(err, SyncError::File { .. }));
    }

    #[tokio::test]
    async fn test_writer_drops_older_snapshot() {
        let store = Arc::new(MemorySnapshotStore::new());
        let writer = SnapshotWriter::new(store.clone());

        let older = writer.issue();
        let newer = writer.issue();
        let mut latest = snapshot();
        latest.items[0].work_status = WorkStatus::Reviewed;

        assert!(writer.write(newer, &latest).await.unwrap());
        assert!(!writer.write(older, &snapshot()).await.unwrap());
        assert_eq!(store.load().await.unwrap(), Some(latest));
    }

    #[tokio::test]
    async fn test_file_store_reports_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snap.json");
        std::fs::write(&path, "{not json").unwrap();

        let err = JsonFileSnapshotStore::new(&path).load().await.unwrap_err();
        assert!(matches!(err, SyncError::SnapshotCorrupt { .. }));
    }
}
