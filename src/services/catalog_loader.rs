/// 任务目录加载 - 业务能力层
///
/// 职责：根据任务名拉取全部工作项及其状态。
/// 每次都返回完整目录，由调用方整体替换。
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::clients::{JobProgressResponse, ReviewBackend};
use crate::error::Result;
use crate::models::{JobType, WorkItem, WorkStatus};

/// 任务目录加载器
pub struct CatalogLoader {
    backend: Arc<dyn ReviewBackend>,
}

impl CatalogLoader {
    pub fn new(backend: Arc<dyn ReviewBackend>) -> Self {
        Self { backend }
    }

    /// 拉取任务目录
    ///
    /// # 参数
    /// - `token`: bearer 凭证
    /// - `job_name`: 任务名称
    ///
    /// # 返回
    /// 返回任务类型和工作项列表
    pub async fn load(&self, token: &str, job_name: &str) -> Result<(JobType, Vec<WorkItem>)> {
        debug!("拉取任务目录: {}", job_name);
        let response = self.backend.job_progress(token, job_name).await?;
        Ok(parse_job_progress(job_name, &response))
    }
}

/// 将 `{status: [work_id...]}` 展开为工作项列表
///
/// 未知的状态或格式不对的分组会被跳过并记录警告，不影响其它分组。
pub fn parse_job_progress(job_name: &str, response: &JobProgressResponse) -> (JobType, Vec<WorkItem>) {
    let job_type = JobType::parse(response.job_type.as_deref());
    let mut items = Vec::new();

    for (status_key, ids) in &response.job_progress {
        let Some(status) = WorkStatus::parse(status_key) else {
            warn!("⚠️ 跳过未知状态分组: {}", status_key);
            continue;
        };
        let Some(ids) = ids.as_array() else {
            warn!("⚠️ 状态 {} 的工作项列表格式不正确", status_key);
            continue;
        };

        for id in ids {
            match id {
                JsonValue::String(work_id) => {
                    items.push(WorkItem::new(work_id.as_str(), status, job_name, job_type));
                }
                JsonValue::Number(n) => {
                    items.push(WorkItem::new(n.to_string(), status, job_name, job_type));
                }
                other => warn!("⚠️ 忽略无效的工作项ID: {}", other),
            }
        }
    }

    (job_type, items)
}
