//! 审阅会话 - 流程层
//!
//! 核心职责：把各项业务能力串成完整的审阅流程
//!
//! 流程顺序：
//! 1. 提交任务名 → 定时轮询目录
//! 2. 选择工作项 → 拉取详情 → 并发解析图片 → 建立编辑基线
//! 3. 记录编辑 → 提交修改 / 状态流转 → 用服务端文档替换基线
//! 4. 导出当前详情或整个任务
//!
//! 状态锁只在内存操作期间持有，不跨越任何网络等待。

use chrono::Utc;
use futures::stream::{self, StreamExt};
use serde_json::{Map, Value as JsonValue};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::clients::ReviewBackend;
use crate::error::{Result, SyncError};
use crate::export::{build_table, export_file_name, write_export, ExportRow, ExportTable};
use crate::infrastructure::{CatalogSnapshot, CredentialStore, SnapshotStore, SnapshotWriter};
use crate::models::{
    collect_findings, BiasFinding, CatalogSummary, WorkDetail, WorkItem, WorkStatus,
};
use crate::services::{
    CatalogLoader, DetailFetcher, EditOutcome, EditTracker, FieldEdit, ReferenceResolver,
    ResolvedImages, UpdateSubmitter,
};
use crate::workflow::review_state::ReviewState;

/// 轮询被跳过的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// 尚未提交任务名
    NoJob,
    /// 没有可用凭证
    NotAuthenticated,
}

/// 一次目录轮询的结果
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// 目录已整体替换
    Applied {
        job_name: String,
        count: usize,
        summary: CatalogSummary,
    },
    /// 响应已过期（有更新的轮询或任务名已变化），被丢弃
    Stale,
    Skipped(SkipReason),
}

/// 一次选择的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectOutcome {
    /// 同一工作项已选中，未发起请求
    Unchanged,
    /// 详情与图片已加载
    Loaded,
    /// 加载期间用户选择了其它工作项，结果被丢弃
    Superseded,
}

/// 导出结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReport {
    pub path: PathBuf,
    pub rows: usize,
    pub failed_rows: usize,
}

struct Capabilities {
    loader: CatalogLoader,
    fetcher: DetailFetcher,
    resolver: ReferenceResolver,
    submitter: UpdateSubmitter,
}

/// 审阅会话
///
/// - 持有显式状态容器，按引用交给轮询与选择操作
/// - 只依赖端口（后端、凭证、快照），不依赖具体实现
/// - 克隆后共享同一份状态
#[derive(Clone)]
pub struct ReviewSession {
    capabilities: Arc<Capabilities>,
    credentials: Arc<dyn CredentialStore>,
    snapshots: Arc<SnapshotWriter>,
    state: Arc<Mutex<ReviewState>>,
    export_concurrency: usize,
}

impl ReviewSession {
    /// 创建新的审阅会话
    ///
    /// # 参数
    /// - `backend`: 后端端口
    /// - `credentials`: 凭证存储
    /// - `snapshots`: 目录快照存储
    /// - `export_concurrency`: 批量导出时并发拉取详情的数量
    pub fn new(
        backend: Arc<dyn ReviewBackend>,
        credentials: Arc<dyn CredentialStore>,
        snapshots: Arc<dyn SnapshotStore>,
        export_concurrency: usize,
    ) -> Self {
        let capabilities = Capabilities {
            loader: CatalogLoader::new(backend.clone()),
            fetcher: DetailFetcher::new(backend.clone()),
            resolver: ReferenceResolver::new(backend.clone()),
            submitter: UpdateSubmitter::new(backend),
        };

        Self {
            capabilities: Arc::new(capabilities),
            credentials,
            snapshots: Arc::new(SnapshotWriter::new(snapshots)),
            state: Arc::new(Mutex::new(ReviewState::default())),
            export_concurrency: export_concurrency.max(1),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.credentials.is_authenticated()
    }

    /// 启动时恢复上次保存的目录
    ///
    /// # 返回
    /// 是否恢复了快照；读取失败只记录警告
    pub async fn restore(&self) -> bool {
        match self.snapshots.store().load().await {
            Ok(Some(snapshot)) => {
                info!(
                    "✓ 已恢复任务 {} 的目录快照 ({} 个工作项)",
                    snapshot.job_name.as_deref().unwrap_or("-"),
                    snapshot.items.len()
                );
                self.state.lock().await.catalog.restore(snapshot);
                true
            }
            Ok(None) => false,
            Err(e) => {
                warn!("⚠️ 快照恢复失败，从空目录开始: {}", e);
                false
            }
        }
    }

    // ========== 任务目录 ==========

    /// 提交任务名
    ///
    /// 任务名变化时同步清空目录和当前选择，进行中的轮询全部作废。
    pub async fn submit_job_name(&self, job_name: &str) -> Result<bool> {
        let job_name = job_name.trim();
        if job_name.is_empty() {
            return Err(SyncError::EmptyJobName);
        }

        let snapshot = {
            let mut state = self.state.lock().await;
            if !state.catalog.set_job_name(job_name) {
                return Ok(false);
            }
            state.selection.clear();
            (self.snapshots.issue(), state.catalog.snapshot())
        };

        info!("📋 切换任务: {}", job_name);
        self.persist(snapshot).await;
        Ok(true)
    }

    /// 轮询一次任务目录
    pub async fn poll_catalog(&self) -> Result<PollOutcome> {
        let Some(token) = self.credentials.token() else {
            return Ok(PollOutcome::Skipped(SkipReason::NotAuthenticated));
        };
        let Some(ticket) = self.state.lock().await.catalog.begin_poll() else {
            return Ok(PollOutcome::Skipped(SkipReason::NoJob));
        };

        let (job_type, items) = self
            .capabilities
            .loader
            .load(&token, &ticket.job_name)
            .await
            .map_err(|e| self.observe(e))?;

        let count = items.len();
        let (summary, snapshot) = {
            let mut state = self.state.lock().await;
            if !state.catalog.apply_poll(&ticket, job_type, items) {
                return Ok(PollOutcome::Stale);
            }
            (
                state.catalog.summary(),
                (self.snapshots.issue(), state.catalog.snapshot()),
            )
        };

        debug!("目录已更新 #{}: {} 个工作项", ticket.seq, count);
        self.persist(snapshot).await;
        Ok(PollOutcome::Applied {
            job_name: ticket.job_name,
            count,
            summary,
        })
    }

    pub async fn job_name(&self) -> Option<String> {
        self.state.lock().await.catalog.job_name().map(str::to_string)
    }

    pub async fn catalog(&self) -> Vec<WorkItem> {
        self.state.lock().await.catalog.items().to_vec()
    }

    pub async fn summary(&self) -> CatalogSummary {
        self.state.lock().await.catalog.summary()
    }

    // ========== 选择与详情 ==========

    /// 选择工作项：拉取详情并并发解析所有图片引用
    ///
    /// 同一工作项重复选择不会重复请求；切换工作项会丢弃未提交的修改。
    pub async fn select_work(&self, item: &WorkItem) -> Result<SelectOutcome> {
        let token = self.token()?;

        let generation = {
            let mut state = self.state.lock().await;
            let discarded = state.selection.current().map_or(0, |s| s.pending_count());
            match state.selection.begin(item) {
                None => return Ok(SelectOutcome::Unchanged),
                Some(generation) => {
                    if discarded > 0 {
                        warn!("⚠️ 切换到 {}，丢弃 {} 个未提交的修改", item, discarded);
                    }
                    generation
                }
            }
        };

        let detail = match self
            .capabilities
            .fetcher
            .fetch(&token, &item.job_name, &item.work_id)
            .await
        {
            Ok(detail) => detail,
            Err(e) => {
                let e = self.observe(e);
                let mut state = self.state.lock().await;
                if !state.selection.fail(generation) {
                    debug!("忽略过期选择的失败: {}", e);
                    return Ok(SelectOutcome::Superseded);
                }
                return Err(e);
            }
        };

        if !self.state.lock().await.selection.is_current(generation) {
            return Ok(SelectOutcome::Superseded);
        }

        let uris = detail.image_uris();
        let images = self.capabilities.resolver.resolve_all(&token, &uris).await;
        if images.unauthorized {
            self.credentials.invalidate();
        }

        let mut state = self.state.lock().await;
        if state
            .selection
            .complete(generation, EditTracker::new(detail), images)
        {
            debug!("✓ 已加载 {}", item);
            Ok(SelectOutcome::Loaded)
        } else {
            Ok(SelectOutcome::Superseded)
        }
    }

    /// 按 ID 选择；ID 为空或不在目录中时选择目录第一项
    pub async fn select_work_by_id(&self, work_id: Option<&str>) -> Result<(WorkItem, SelectOutcome)> {
        let item = {
            let state = self.state.lock().await;
            let catalog = &state.catalog;
            let found = work_id.and_then(|id| catalog.find(id));
            if found.is_none() {
                if let Some(id) = work_id {
                    warn!("⚠️ 目录中没有工作项 {}，改为选择第一项", id);
                }
            }
            found
                .or_else(|| catalog.items().first())
                .cloned()
                .ok_or_else(|| {
                    SyncError::not_found(format!(
                        "任务 {} 的工作项",
                        catalog.job_name().unwrap_or("-")
                    ))
                })?
        };

        let outcome = self.select_work(&item).await?;
        Ok((item, outcome))
    }

    pub async fn selected_item(&self) -> Option<WorkItem> {
        let state = self.state.lock().await;
        state.selection.current().map(|s| s.item.clone())
    }

    /// 当前显示的文档（基线 + 未提交的修改）
    pub async fn draft(&self) -> Option<WorkDetail> {
        let state = self.state.lock().await;
        state.selection.tracker().map(|t| t.draft().clone())
    }

    pub async fn pending_edits(&self) -> Map<String, JsonValue> {
        let state = self.state.lock().await;
        state
            .selection
            .tracker()
            .map(|t| t.pending().clone())
            .unwrap_or_default()
    }

    pub async fn images(&self) -> Option<ResolvedImages> {
        let state = self.state.lock().await;
        state.selection.images().cloned()
    }

    /// 当前工作项的偏差列表；处理失败的工作项没有偏差
    pub async fn bias_findings(&self) -> Vec<BiasFinding> {
        let state = self.state.lock().await;
        let Some(selection) = state.selection.current() else {
            return Vec::new();
        };
        if selection.item.work_status == WorkStatus::FailedToProcess {
            return Vec::new();
        }
        selection
            .tracker
            .as_ref()
            .map(|t| collect_findings(t.draft()))
            .unwrap_or_default()
    }

    // ========== 编辑与提交 ==========

    /// 记录一次编辑
    pub async fn record_edit(&self, field: &str, edit: FieldEdit) -> Result<EditOutcome> {
        let mut state = self.state.lock().await;
        let tracker = state.selection.tracker_mut().ok_or(SyncError::NoSelection)?;
        Ok(tracker.record(field, edit))
    }

    /// 提交全部未提交的修改
    ///
    /// # 返回
    /// 成功时返回服务端文档（成为新的基线）；失败时修改全部保留
    pub async fn submit_edits(&self) -> Result<WorkDetail> {
        let token = self.token()?;

        let (generation, item, submitted) = {
            let state = self.state.lock().await;
            let selection = state.selection.current().ok_or(SyncError::NoSelection)?;
            let tracker = selection.tracker.as_ref().ok_or(SyncError::NoSelection)?;
            (
                selection.generation,
                selection.item.clone(),
                tracker.pending().clone(),
            )
        };

        let doc = self
            .capabilities
            .submitter
            .submit(&token, &item.job_name, &item.work_id, &submitted)
            .await
            .map_err(|e| self.observe(e))?;

        let mut state = self.state.lock().await;
        if state.selection.is_current(generation) {
            if let Some(tracker) = state.selection.tracker_mut() {
                tracker.commit(doc.clone(), &submitted);
            }
        } else {
            debug!("{} 已不是当前选择，服务端文档不再应用", item);
        }
        Ok(doc)
    }

    /// 提交状态流转，并同步更新目录与当前选择
    ///
    /// 不影响当前选择中其它字段的未提交修改。
    pub async fn update_status(&self, item: &WorkItem, status: WorkStatus) -> Result<()> {
        let token = self.token()?;

        self.capabilities
            .submitter
            .submit_status(&token, item, status)
            .await
            .map_err(|e| self.observe(e))?;

        let snapshot = {
            let mut state = self.state.lock().await;
            if state.catalog.job_name() == Some(item.job_name.as_str()) {
                state.catalog.set_status(&item.work_id, status);
            }
            if let Some(selection) = state.selection.current_mut() {
                if selection.item.same_identity(item) {
                    selection.item.work_status = status;
                    if let Some(tracker) = selection.tracker.as_mut() {
                        tracker.apply_server_field(
                            "work_status",
                            JsonValue::String(status.as_str().to_string()),
                        );
                    }
                }
            }
            (self.snapshots.issue(), state.catalog.snapshot())
        };

        self.persist(snapshot).await;
        Ok(())
    }

    // ========== 导出 ==========

    /// 当前已加载的详情组成的表格
    pub async fn loaded_export_table(&self) -> Result<(String, ExportTable)> {
        let state = self.state.lock().await;
        let selection = state.selection.current().ok_or(SyncError::NoSelection)?;
        let tracker = selection.tracker.as_ref().ok_or(SyncError::NoSelection)?;
        let row = ExportRow::loaded(&selection.item, tracker.draft().clone());
        Ok((selection.item.job_name.clone(), build_table(&[row])))
    }

    /// 重新拉取任务中每个工作项的详情组成表格
    ///
    /// 单个工作项拉取失败会以错误行输出；凭证失效则中止导出。
    pub async fn job_export_table(&self) -> Result<(String, ExportTable)> {
        let token = self.token()?;
        let (job_name, items) = {
            let state = self.state.lock().await;
            let job_name = state
                .catalog
                .job_name()
                .ok_or(SyncError::NoJob)?
                .to_string();
            (job_name, state.catalog.items().to_vec())
        };
        if items.is_empty() {
            return Err(SyncError::NothingToExport { job_name });
        }

        info!("📤 开始导出任务 {} ({} 个工作项)", job_name, items.len());
        let token = token.as_str();
        let fetcher = &self.capabilities.fetcher;
        let rows: Vec<Result<ExportRow>> = stream::iter(items)
            .map(|item| async move {
                match fetcher.fetch(token, &item.job_name, &item.work_id).await {
                    Ok(detail) => Ok(ExportRow::loaded(&item, detail)),
                    Err(e) if e.is_unauthorized() => Err(e),
                    Err(e) => {
                        warn!("⚠️ {} 拉取失败，以错误行导出: {}", item, e);
                        Ok(ExportRow::failed(&item, e.to_string()))
                    }
                }
            })
            .buffered(self.export_concurrency)
            .collect()
            .await;

        let rows = rows
            .into_iter()
            .collect::<Result<Vec<_>>>()
            .map_err(|e| self.observe(e))?;
        Ok((job_name, build_table(&rows)))
    }

    /// 导出当前详情到文件
    pub async fn export_loaded(&self, dir: &Path) -> Result<ExportReport> {
        let (job_name, table) = self.loaded_export_table().await?;
        self.write_table(dir, &job_name, &table).await
    }

    /// 导出整个任务到文件
    pub async fn export_job(&self, dir: &Path) -> Result<ExportReport> {
        let (job_name, table) = self.job_export_table().await?;
        self.write_table(dir, &job_name, &table).await
    }

    // ========== 辅助函数 ==========

    async fn write_table(&self, dir: &Path, job_name: &str, table: &ExportTable) -> Result<ExportReport> {
        let file_name = export_file_name(job_name, Utc::now());
        let path = write_export(dir, &file_name, &table.to_csv()).await?;
        Ok(ExportReport {
            path,
            rows: table.row_count(),
            failed_rows: table.failed_rows,
        })
    }

    fn token(&self) -> Result<String> {
        self.credentials
            .token()
            .ok_or_else(|| SyncError::unauthorized("credential store"))
    }

    /// 凭证被拒绝时作废凭证，错误原样返回
    fn observe(&self, err: SyncError) -> SyncError {
        if err.is_unauthorized() {
            self.credentials.invalidate();
        }
        err
    }

    /// 按领取顺序写快照；失败只记录警告
    async fn persist(&self, (seq, snapshot): (u64, CatalogSnapshot)) {
        if let Err(e) = self.snapshots.write(seq, &snapshot).await {
            warn!("⚠️ 保存目录快照失败: {}", e);
        }
    }
}
