//! 审阅状态容器 - 流程层
//!
//! 显式的状态对象，由会话持有并按引用传给轮询与选择操作。
//! 两个防过期机制：
//! - 目录轮询使用递增序号，旧序号的响应不会覆盖新结果
//! - 每次选择递增代数，旧代数的详情/图片响应直接丢弃

use tracing::debug;

use crate::infrastructure::CatalogSnapshot;
use crate::models::{CatalogSummary, JobType, WorkItem, WorkStatus};
use crate::services::{EditTracker, ResolvedImages};

/// 一次目录轮询的凭据
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollTicket {
    pub seq: u64,
    pub job_name: String,
}

/// 任务目录
#[derive(Debug, Default)]
pub struct CatalogState {
    job_name: Option<String>,
    job_type: JobType,
    items: Vec<WorkItem>,
    issued_seq: u64,
    applied_seq: u64,
}

impl CatalogState {
    pub fn job_name(&self) -> Option<&str> {
        self.job_name.as_deref()
    }

    pub fn job_type(&self) -> JobType {
        self.job_type
    }

    pub fn items(&self) -> &[WorkItem] {
        &self.items
    }

    pub fn find(&self, work_id: &str) -> Option<&WorkItem> {
        self.items.iter().find(|item| item.work_id == work_id)
    }

    /// 切换任务名：同步清空目录，并作废所有进行中的轮询
    ///
    /// # 返回
    /// 任务名是否发生变化
    pub fn set_job_name(&mut self, job_name: &str) -> bool {
        if self.job_name.as_deref() == Some(job_name) {
            return false;
        }
        self.job_name = Some(job_name.to_string());
        self.job_type = JobType::Unknown;
        self.items.clear();
        self.applied_seq = self.issued_seq;
        true
    }

    /// 领取轮询序号；没有任务名时返回 `None`
    pub fn begin_poll(&mut self) -> Option<PollTicket> {
        let job_name = self.job_name.clone()?;
        self.issued_seq += 1;
        Some(PollTicket {
            seq: self.issued_seq,
            job_name,
        })
    }

    /// 应用轮询结果（整体替换）
    ///
    /// # 返回
    /// 序号过期或任务名已变化时返回 `false`，目录不变
    pub fn apply_poll(&mut self, ticket: &PollTicket, job_type: JobType, items: Vec<WorkItem>) -> bool {
        if ticket.seq <= self.applied_seq || self.job_name.as_deref() != Some(ticket.job_name.as_str())
        {
            debug!(
                "丢弃过期的轮询结果 #{} (已应用 #{})",
                ticket.seq, self.applied_seq
            );
            return false;
        }
        self.applied_seq = ticket.seq;
        self.job_type = job_type;
        self.items = items;
        true
    }

    /// 原位更新单个工作项的状态
    pub fn set_status(&mut self, work_id: &str, status: WorkStatus) -> bool {
        match self.items.iter_mut().find(|item| item.work_id == work_id) {
            Some(item) => {
                item.work_status = status;
                true
            }
            None => false,
        }
    }

    pub fn summary(&self) -> CatalogSummary {
        CatalogSummary::from_items(&self.items)
    }

    pub fn snapshot(&self) -> CatalogSnapshot {
        CatalogSnapshot {
            job_name: self.job_name.clone(),
            job_type: self.job_type,
            items: self.items.clone(),
        }
    }

    /// 从快照恢复；恢复后的目录会被下一次轮询整体替换
    pub fn restore(&mut self, snapshot: CatalogSnapshot) {
        self.job_name = snapshot.job_name;
        self.job_type = snapshot.job_type;
        self.items = snapshot.items;
        self.applied_seq = self.issued_seq;
    }
}

/// 选择的加载阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionPhase {
    Loading,
    Loaded,
    Failed,
}

/// 当前选择
#[derive(Debug)]
pub struct Selection {
    pub generation: u64,
    pub item: WorkItem,
    pub phase: SelectionPhase,
    pub tracker: Option<EditTracker>,
    pub images: ResolvedImages,
}

impl Selection {
    pub fn pending_count(&self) -> usize {
        self.tracker.as_ref().map_or(0, |t| t.pending().len())
    }
}

/// 选择状态（同一时刻只有一个选中项）
#[derive(Debug, Default)]
pub struct SelectionState {
    generation: u64,
    current: Option<Selection>,
}

impl SelectionState {
    pub fn current(&self) -> Option<&Selection> {
        self.current.as_ref()
    }

    pub fn current_mut(&mut self) -> Option<&mut Selection> {
        self.current.as_mut()
    }

    /// 当前选择对应的编辑追踪器
    pub fn tracker(&self) -> Option<&EditTracker> {
        self.current.as_ref().and_then(|s| s.tracker.as_ref())
    }

    pub fn tracker_mut(&mut self) -> Option<&mut EditTracker> {
        self.current.as_mut().and_then(|s| s.tracker.as_mut())
    }

    pub fn images(&self) -> Option<&ResolvedImages> {
        self.current.as_ref().map(|s| &s.images)
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.current
            .as_ref()
            .is_some_and(|s| s.generation == generation)
    }

    /// 开始新的选择
    ///
    /// # 返回
    /// 新的代数；同一工作项已选中（加载中或已加载）时返回 `None`
    pub fn begin(&mut self, item: &WorkItem) -> Option<u64> {
        if let Some(current) = &self.current {
            if current.item.same_identity(item) && current.phase != SelectionPhase::Failed {
                return None;
            }
        }

        self.generation += 1;
        self.current = Some(Selection {
            generation: self.generation,
            item: item.clone(),
            phase: SelectionPhase::Loading,
            tracker: None,
            images: ResolvedImages::default(),
        });
        Some(self.generation)
    }

    /// 加载完成；代数不匹配时丢弃
    pub fn complete(&mut self, generation: u64, tracker: EditTracker, images: ResolvedImages) -> bool {
        match self.current.as_mut() {
            Some(selection) if selection.generation == generation => {
                selection.tracker = Some(tracker);
                selection.images = images;
                selection.phase = SelectionPhase::Loaded;
                true
            }
            _ => false,
        }
    }

    pub fn fail(&mut self, generation: u64) -> bool {
        match self.current.as_mut() {
            Some(selection) if selection.generation == generation => {
                selection.phase = SelectionPhase::Failed;
                true
            }
            _ => false,
        }
    }

    /// 清除选择并作废进行中的加载
    pub fn clear(&mut self) {
        self.generation += 1;
        self.current = None;
    }
}

/// 审阅会话的全部可变状态
#[derive(Debug, Default)]
pub struct ReviewState {
    pub catalog: CatalogState,
    pub selection: SelectionState,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WorkDetail;

    fn item(id: &str, job: &str) -> WorkItem {
        WorkItem::new(id, WorkStatus::InQueue, job, JobType::Metadata)
    }

    #[test]
    fn test_job_change_clears_and_invalidates_tickets() {
        let mut catalog = CatalogState::default();
        catalog.set_job_name("a");
        let old = catalog.begin_poll().unwrap();
        assert!(catalog.apply_poll(&old, JobType::Metadata, vec![item("1", "a")]));

        let in_flight = catalog.begin_poll().unwrap();
        assert!(catalog.set_job_name("b"));
        assert!(catalog.items().is_empty());
        assert!(!catalog.apply_poll(&in_flight, JobType::Metadata, vec![item("2", "a")]));
        assert!(catalog.items().is_empty());

        let fresh = catalog.begin_poll().unwrap();
        assert_eq!(fresh.job_name, "b");
        assert!(catalog.apply_poll(&fresh, JobType::Bias, vec![item("3", "b")]));
        assert_eq!(catalog.job_type(), JobType::Bias);
    }

    #[test]
    fn test_older_poll_never_overwrites_newer() {
        let mut catalog = CatalogState::default();
        catalog.set_job_name("a");
        let first = catalog.begin_poll().unwrap();
        let second = catalog.begin_poll().unwrap();

        assert!(catalog.apply_poll(&second, JobType::Metadata, vec![item("new", "a")]));
        assert!(!catalog.apply_poll(&first, JobType::Metadata, vec![item("old", "a")]));
        assert_eq!(catalog.items()[0].work_id, "new");
    }

    #[test]
    fn test_same_job_name_keeps_catalog() {
        let mut catalog = CatalogState::default();
        catalog.set_job_name("a");
        let t = catalog.begin_poll().unwrap();
        catalog.apply_poll(&t, JobType::Metadata, vec![item("1", "a")]);
        assert!(!catalog.set_job_name("a"));
        assert_eq!(catalog.items().len(), 1);
    }

    #[test]
    fn test_no_ticket_without_job() {
        assert!(CatalogState::default().begin_poll().is_none());
    }

    #[test]
    fn test_selection_generations() {
        let mut selection = SelectionState::default();
        let first = selection.begin(&item("1", "a")).unwrap();
        assert!(selection.begin(&item("1", "a")).is_none());

        let second = selection.begin(&item("2", "a")).unwrap();
        assert!(!selection.is_current(first));
        assert!(!selection.complete(first, EditTracker::new(WorkDetail::new()), ResolvedImages::default()));
        assert!(selection.complete(second, EditTracker::new(WorkDetail::new()), ResolvedImages::default()));
        assert_eq!(selection.current().map(|s| s.phase), Some(SelectionPhase::Loaded));
    }

    #[test]
    fn test_failed_selection_can_be_retried() {
        let mut selection = SelectionState::default();
        let generation = selection.begin(&item("1", "a")).unwrap();
        assert!(selection.fail(generation));
        assert!(selection.begin(&item("1", "a")).is_some());
    }

    #[test]
    fn test_set_status_in_place() {
        let mut catalog = CatalogState::default();
        catalog.set_job_name("a");
        let t = catalog.begin_poll().unwrap();
        catalog.apply_poll(&t, JobType::Metadata, vec![item("1", "a"), item("2", "a")]);
        assert!(catalog.set_status("2", WorkStatus::Reviewed));
        assert!(!catalog.set_status("9", WorkStatus::Reviewed));
        assert_eq!(catalog.find("2").unwrap().work_status, WorkStatus::Reviewed);
        assert_eq!(catalog.summary().reviewed, 1);
    }
}
