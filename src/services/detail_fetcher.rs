/// 工作项详情拉取 - 业务能力层
///
/// 纯读取，不做跨调用缓存
use std::sync::Arc;
use tracing::debug;

use crate::clients::ReviewBackend;
use crate::error::Result;
use crate::models::WorkDetail;

pub struct DetailFetcher {
    backend: Arc<dyn ReviewBackend>,
}

impl DetailFetcher {
    pub fn new(backend: Arc<dyn ReviewBackend>) -> Self {
        Self { backend }
    }

    /// 拉取单个工作项的完整元数据
    pub async fn fetch(&self, token: &str, job_name: &str, work_id: &str) -> Result<WorkDetail> {
        debug!("拉取工作项详情: {}/{}", job_name, work_id);
        let detail = self.backend.work_detail(token, job_name, work_id).await?;
        debug!("工作项 {} 共 {} 个字段", work_id, detail.len());
        Ok(detail)
    }
}
