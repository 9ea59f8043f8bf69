/// 审阅后端 API 客户端
///
/// 封装任务进度、工作项详情、字段更新、预签名地址四个接口
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{Result, SyncError};
use crate::models::WorkDetail;

const JOB_PROGRESS_PATH: &str = "/api/job_progress";
const RESULTS_PATH: &str = "/api/results";
const PRESIGNED_URL_PATH: &str = "/api/presigned_url";

/// 任务进度响应：状态 -> 工作项 ID 列表
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct JobProgressResponse {
    #[serde(default)]
    pub job_progress: Map<String, JsonValue>,
    #[serde(default)]
    pub job_type: Option<String>,
}

/// 字段更新请求体
#[derive(Debug, Clone, Serialize)]
pub struct FieldUpdate {
    pub job_name: String,
    pub work_id: String,
    pub updated_fields: Map<String, JsonValue>,
}

#[derive(Deserialize)]
struct ItemEnvelope {
    item: WorkDetail,
}

#[derive(Deserialize)]
struct PresignedEnvelope {
    presigned_url: String,
}

/// 后端端口
///
/// 每个调用都显式传入 bearer 凭证，客户端本身不保存登录状态。
#[async_trait]
pub trait ReviewBackend: Send + Sync {
    async fn job_progress(&self, token: &str, job_name: &str) -> Result<JobProgressResponse>;

    async fn work_detail(&self, token: &str, job_name: &str, work_id: &str) -> Result<WorkDetail>;

    /// 提交字段更新，返回后端确认后的完整文档
    async fn update_fields(&self, token: &str, update: &FieldUpdate) -> Result<WorkDetail>;

    async fn presigned_url(&self, token: &str, uri: &str) -> Result<String>;
}

/// 基于 reqwest 的后端客户端
pub struct HttpReviewClient {
    http: Client,
    base_url: String,
}

impl HttpReviewClient {
    /// 创建新的后端客户端
    pub fn new(config: &Config) -> Self {
        Self::with_base_url(config.api_base_url.clone())
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// 发送请求并把 HTTP 状态映射到错误分类
    ///
    /// # 参数
    /// - `endpoint`: 接口路径（用于错误信息）
    /// - `what`: 资源描述（用于 404）
    /// - `request`: 已构造好的请求
    async fn send<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        what: impl FnOnce() -> String,
        request: RequestBuilder,
    ) -> Result<T> {
        let response = request.send().await.map_err(|e| {
            warn!("请求失败 {}: {}", endpoint, e);
            SyncError::unavailable(endpoint, e)
        })?;

        let status = response.status();
        debug!("{} -> {}", endpoint, status);

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(SyncError::unauthorized(endpoint))
            }
            StatusCode::NOT_FOUND => Err(SyncError::not_found(what())),
            s if !s.is_success() => {
                let body = response.text().await.unwrap_or_default();
                Err(SyncError::unavailable(
                    endpoint,
                    format!("HTTP {}: {}", s.as_u16(), crate::utils::logging::truncate_text(&body, 200)),
                ))
            }
            _ => response
                .json::<T>()
                .await
                .map_err(|e| SyncError::unavailable(endpoint, format!("响应解析失败: {}", e))),
        }
    }
}

#[async_trait]
impl ReviewBackend for HttpReviewClient {
    async fn job_progress(&self, token: &str, job_name: &str) -> Result<JobProgressResponse> {
        let request = self
            .http
            .get(self.url(JOB_PROGRESS_PATH))
            .bearer_auth(token)
            .query(&[("job_name", job_name)]);

        self.send(JOB_PROGRESS_PATH, || format!("任务 {}", job_name), request)
            .await
    }

    async fn work_detail(&self, token: &str, job_name: &str, work_id: &str) -> Result<WorkDetail> {
        let request = self
            .http
            .get(self.url(RESULTS_PATH))
            .bearer_auth(token)
            .query(&[("job_name", job_name), ("work_id", work_id)]);

        let envelope: ItemEnvelope = self
            .send(
                RESULTS_PATH,
                || format!("工作项 {}/{}", job_name, work_id),
                request,
            )
            .await?;
        Ok(envelope.item)
    }

    async fn update_fields(&self, token: &str, update: &FieldUpdate) -> Result<WorkDetail> {
        let request = self
            .http
            .put(self.url(RESULTS_PATH))
            .bearer_auth(token)
            .json(update);

        let envelope: ItemEnvelope = self
            .send(
                RESULTS_PATH,
                || format!("工作项 {}/{}", update.job_name, update.work_id),
                request,
            )
            .await?;
        Ok(envelope.item)
    }

    async fn presigned_url(&self, token: &str, uri: &str) -> Result<String> {
        let request = self
            .http
            .get(self.url(PRESIGNED_URL_PATH))
            .bearer_auth(token)
            .query(&[("s3_uri", uri)]);

        let envelope: PresignedEnvelope = self
            .send(PRESIGNED_URL_PATH, || format!("存储对象 {}", uri), request)
            .await?;
        Ok(envelope.presigned_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = HttpReviewClient::with_base_url("http://localhost:8000/");
        assert_eq!(client.url(RESULTS_PATH), "http://localhost:8000/api/results");
    }

    #[test]
    fn test_job_progress_response_tolerates_missing_fields() {
        let resp: JobProgressResponse = serde_json::from_value(json!({})).unwrap();
        assert!(resp.job_progress.is_empty());
        assert!(resp.job_type.is_none());
    }

    #[test]
    fn test_field_update_body_shape() {
        let mut fields = Map::new();
        fields.insert("work_status".to_string(), json!("REVIEWED"));
        let body = serde_json::to_value(FieldUpdate {
            job_name: "job".to_string(),
            work_id: "w1".to_string(),
            updated_fields: fields,
        })
        .unwrap();
        assert_eq!(
            body,
            json!({"job_name": "job", "work_id": "w1", "updated_fields": {"work_status": "REVIEWED"}})
        );
    }

    #[test]
    fn test_item_envelope_decodes_detail() {
        let env: ItemEnvelope =
            serde_json::from_value(json!({"item": {"work_id": "w1", "tags": ["a"]}})).unwrap();
        assert_eq!(env.item.work_id(), Some("w1"));
    }
}
