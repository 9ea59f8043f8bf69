use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 工作项状态
///
/// 后端使用带空格的大写形式（如 `READY FOR REVIEW`），
/// 解析时同时接受下划线形式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkStatus {
    #[serde(rename = "IN QUEUE", alias = "IN_QUEUE")]
    InQueue,
    #[serde(rename = "IN PROGRESS", alias = "IN_PROGRESS")]
    InProgress,
    #[serde(rename = "READY FOR REVIEW", alias = "READY_FOR_REVIEW")]
    ReadyForReview,
    #[serde(rename = "REVIEWED")]
    Reviewed,
    #[serde(rename = "FAILED TO PROCESS", alias = "FAILED_TO_PROCESS")]
    FailedToProcess,
}

impl WorkStatus {
    pub const ALL: [WorkStatus; 5] = [
        WorkStatus::InQueue,
        WorkStatus::InProgress,
        WorkStatus::ReadyForReview,
        WorkStatus::Reviewed,
        WorkStatus::FailedToProcess,
    ];

    /// 后端使用的状态值
    pub fn as_str(self) -> &'static str {
        match self {
            WorkStatus::InQueue => "IN QUEUE",
            WorkStatus::InProgress => "IN PROGRESS",
            WorkStatus::ReadyForReview => "READY FOR REVIEW",
            WorkStatus::Reviewed => "REVIEWED",
            WorkStatus::FailedToProcess => "FAILED TO PROCESS",
        }
    }

    /// 从字符串解析状态（忽略大小写，下划线视为空格）
    pub fn parse(s: &str) -> Option<Self> {
        let normalized = s.trim().to_uppercase().replace('_', " ");
        Self::ALL.into_iter().find(|status| status.as_str() == normalized)
    }

    /// 是否已经处理结束（不会再变化，除非人工复核）
    pub fn is_finished(self) -> bool {
        matches!(
            self,
            WorkStatus::ReadyForReview | WorkStatus::Reviewed | WorkStatus::FailedToProcess
        )
    }
}

impl fmt::Display for WorkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("未知的工作项状态: {}", s))
    }
}

/// 任务类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobType {
    Metadata,
    Bias,
    #[default]
    #[serde(other)]
    Unknown,
}

impl JobType {
    pub fn parse(s: Option<&str>) -> Self {
        match s.map(|v| v.trim().to_lowercase()).as_deref() {
            Some("metadata") => JobType::Metadata,
            Some("bias") => JobType::Bias,
            _ => JobType::Unknown,
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobType::Metadata => "metadata",
            JobType::Bias => "bias",
            JobType::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// 工作项：任务输出的一个处理单元
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    pub work_id: String,
    pub work_status: WorkStatus,
    pub job_name: String,
    pub job_type: JobType,
}

impl WorkItem {
    pub fn new(
        work_id: impl Into<String>,
        work_status: WorkStatus,
        job_name: impl Into<String>,
        job_type: JobType,
    ) -> Self {
        Self {
            work_id: work_id.into(),
            work_status,
            job_name: job_name.into(),
            job_type,
        }
    }

    /// 是否与另一个工作项是同一个（任务名 + 工作ID）
    pub fn same_identity(&self, other: &WorkItem) -> bool {
        self.work_id == other.work_id && self.job_name == other.job_name
    }
}

impl fmt::Display for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[任务 {} 工作项 {}]", self.job_name, self.work_id)
    }
}

/// 目录统计（每个状态的数量）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CatalogSummary {
    pub in_queue: usize,
    pub in_progress: usize,
    pub ready_for_review: usize,
    pub reviewed: usize,
    pub failed: usize,
}

impl CatalogSummary {
    pub fn from_items(items: &[WorkItem]) -> Self {
        let mut summary = Self::default();
        for item in items {
            match item.work_status {
                WorkStatus::InQueue => summary.in_queue += 1,
                WorkStatus::InProgress => summary.in_progress += 1,
                WorkStatus::ReadyForReview => summary.ready_for_review += 1,
                WorkStatus::Reviewed => summary.reviewed += 1,
                WorkStatus::FailedToProcess => summary.failed += 1,
            }
        }
        summary
    }

    pub fn total(&self) -> usize {
        self.in_queue + self.in_progress + self.ready_for_review + self.reviewed + self.failed
    }

    pub fn finished(&self) -> usize {
        self.ready_for_review + self.reviewed + self.failed
    }

    /// 完成百分比（0-100），空目录为 0
    pub fn progress_percent(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        self.finished() as f64 * 100.0 / total as f64
    }
}

impl fmt::Display for CatalogSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "排队 {} | 处理中 {} | 待复核 {} | 已复核 {} | 失败 {} | 完成 {:.1}%",
            self.in_queue,
            self.in_progress,
            self.ready_for_review,
            self.reviewed,
            self.failed,
            self.progress_percent()
        )
    }
}
