/// 更新提交 - 业务能力层
///
/// 字段修改与状态流转都走同一个更新接口
use serde_json::{Map, Value as JsonValue};
use std::sync::Arc;
use tracing::{debug, info};

use crate::clients::{FieldUpdate, ReviewBackend};
use crate::error::{Result, SyncError};
use crate::models::{WorkDetail, WorkItem, WorkStatus};

pub struct UpdateSubmitter {
    backend: Arc<dyn ReviewBackend>,
}

impl UpdateSubmitter {
    pub fn new(backend: Arc<dyn ReviewBackend>) -> Self {
        Self { backend }
    }

    /// 提交字段修改
    ///
    /// # 参数
    /// - `token`: bearer 凭证
    /// - `job_name` / `work_id`: 工作项标识
    /// - `edits`: 待提交的修改（不能为空）
    ///
    /// # 返回
    /// 返回服务端确认后的完整文档
    pub async fn submit(
        &self,
        token: &str,
        job_name: &str,
        work_id: &str,
        edits: &Map<String, JsonValue>,
    ) -> Result<WorkDetail> {
        if edits.is_empty() {
            return Err(SyncError::NoChanges);
        }

        debug!("📤 提交 {} 个字段: {}/{}", edits.len(), job_name, work_id);
        let update = FieldUpdate {
            job_name: job_name.to_string(),
            work_id: work_id.to_string(),
            updated_fields: edits.clone(),
        };
        let doc = self.backend.update_fields(token, &update).await?;
        info!("✓ 已提交 {}/{} 的 {} 个字段", job_name, work_id, edits.len());
        Ok(doc)
    }

    /// 提交状态流转
    pub async fn submit_status(
        &self,
        token: &str,
        item: &WorkItem,
        status: WorkStatus,
    ) -> Result<WorkDetail> {
        let mut fields = Map::new();
        fields.insert(
            "work_status".to_string(),
            JsonValue::String(status.as_str().to_string()),
        );

        let update = FieldUpdate {
            job_name: item.job_name.clone(),
            work_id: item.work_id.clone(),
            updated_fields: fields,
        };
        let doc = self.backend.update_fields(token, &update).await?;
        info!("✓ {} 状态已更新为 {}", item, status);
        Ok(doc)
    }
}
