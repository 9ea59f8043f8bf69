//! 测试用的内存后端

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Map, Value as JsonValue};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use review_sync::clients::{FieldUpdate, JobProgressResponse, ReviewBackend};
use review_sync::error::{Result, SyncError};
use review_sync::infrastructure::{CredentialStore, MemorySnapshotStore, SessionCredentials};
use review_sync::models::{WorkDetail, WorkStatus};
use review_sync::workflow::ReviewSession;

#[derive(Default)]
struct Job {
    job_type: Option<String>,
    items: Vec<(String, WorkStatus)>,
}

/// 内存中的后端
///
/// - 记录每个接口的调用次数
/// - 可注入 401、后端不可用、延迟
/// - 更新时合并字段并递增 `revision`，模拟服务端改写文档
#[derive(Default)]
pub struct FakeBackend {
    jobs: Mutex<HashMap<String, Job>>,
    details: Mutex<HashMap<(String, String), Map<String, JsonValue>>>,
    unauthorized: AtomicBool,
    unauthorized_endpoints: Mutex<HashSet<String>>,
    fail_updates: AtomicBool,
    fail_progress: AtomicBool,
    failing_details: Mutex<HashSet<String>>,
    failing_presign: Mutex<HashSet<String>>,
    progress_delays: Mutex<VecDeque<Duration>>,
    detail_delays: Mutex<HashMap<String, Duration>>,
    last_update: Mutex<Option<FieldUpdate>>,
    revision: AtomicUsize,
    pub progress_calls: AtomicUsize,
    pub detail_calls: AtomicUsize,
    pub update_calls: AtomicUsize,
    pub presign_calls: AtomicUsize,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// 注册一个任务及其工作项
    pub fn add_job(&self, job_name: &str, job_type: &str, items: &[(&str, WorkStatus)]) {
        self.jobs.lock().unwrap().insert(
            job_name.to_string(),
            Job {
                job_type: Some(job_type.to_string()),
                items: items
                    .iter()
                    .map(|(id, status)| (id.to_string(), *status))
                    .collect(),
            },
        );
    }

    /// 注册工作项详情
    pub fn add_detail(&self, job_name: &str, work_id: &str, fields: JsonValue) {
        let mut map = fields.as_object().cloned().unwrap_or_default();
        map.insert("work_id".to_string(), json!(work_id));
        map.insert("job_name".to_string(), json!(job_name));
        self.details
            .lock()
            .unwrap()
            .insert((job_name.to_string(), work_id.to_string()), map);
    }

    pub fn set_unauthorized(&self, value: bool) {
        self.unauthorized.store(value, Ordering::SeqCst);
    }

    /// 只让某个接口返回 401
    pub fn set_unauthorized_endpoint(&self, endpoint: &str) {
        self.unauthorized_endpoints
            .lock()
            .unwrap()
            .insert(endpoint.to_string());
    }

    pub fn set_fail_updates(&self, value: bool) {
        self.fail_updates.store(value, Ordering::SeqCst);
    }

    pub fn set_fail_progress(&self, value: bool) {
        self.fail_progress.store(value, Ordering::SeqCst);
    }

    pub fn fail_detail(&self, work_id: &str) {
        self.failing_details.lock().unwrap().insert(work_id.to_string());
    }

    pub fn fail_presign(&self, uri: &str) {
        self.failing_presign.lock().unwrap().insert(uri.to_string());
    }

    /// 下一次任务进度请求的延迟（按调用顺序消费）
    pub fn queue_progress_delay(&self, delay: Duration) {
        self.progress_delays.lock().unwrap().push_back(delay);
    }

    pub fn delay_detail(&self, work_id: &str, delay: Duration) {
        self.detail_delays
            .lock()
            .unwrap()
            .insert(work_id.to_string(), delay);
    }

    pub fn last_update(&self) -> Option<FieldUpdate> {
        self.last_update.lock().unwrap().clone()
    }

    pub fn calls(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    fn check_auth(&self, endpoint: &str) -> Result<()> {
        if self.unauthorized.load(Ordering::SeqCst)
            || self.unauthorized_endpoints.lock().unwrap().contains(endpoint)
        {
            Err(SyncError::unauthorized(endpoint))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ReviewBackend for FakeBackend {
    async fn job_progress(&self, _token: &str, job_name: &str) -> Result<JobProgressResponse> {
        self.progress_calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.progress_delays.lock().unwrap().pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.check_auth("/api/job_progress")?;
        if self.fail_progress.load(Ordering::SeqCst) {
            return Err(SyncError::unavailable("/api/job_progress", "HTTP 502"));
        }

        let jobs = self.jobs.lock().unwrap();
        let job = jobs
            .get(job_name)
            .ok_or_else(|| SyncError::not_found(format!("任务 {}", job_name)))?;

        let mut progress = Map::new();
        for (id, status) in &job.items {
            let bucket = progress
                .entry(status.as_str().to_string())
                .or_insert_with(|| json!([]));
            if let Some(ids) = bucket.as_array_mut() {
                ids.push(json!(id));
            }
        }

        Ok(JobProgressResponse {
            job_progress: progress,
            job_type: job.job_type.clone(),
        })
    }

    async fn work_detail(&self, _token: &str, job_name: &str, work_id: &str) -> Result<WorkDetail> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.detail_delays.lock().unwrap().get(work_id).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.check_auth("/api/results")?;

        if self.failing_details.lock().unwrap().contains(work_id) {
            return Err(SyncError::unavailable("/api/results", "HTTP 500"));
        }

        let details = self.details.lock().unwrap();
        let map = details
            .get(&(job_name.to_string(), work_id.to_string()))
            .cloned()
            .ok_or_else(|| SyncError::not_found(format!("工作项 {}", work_id)))?;
        Ok(WorkDetail::from_map(map))
    }

    async fn update_fields(&self, _token: &str, update: &FieldUpdate) -> Result<WorkDetail> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        self.check_auth("/api/results")?;
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(SyncError::unavailable("/api/results", "HTTP 503"));
        }
        *self.last_update.lock().unwrap() = Some(update.clone());

        if let Some(status) = update
            .updated_fields
            .get("work_status")
            .and_then(JsonValue::as_str)
            .and_then(WorkStatus::parse)
        {
            if let Some(job) = self.jobs.lock().unwrap().get_mut(&update.job_name) {
                for (id, s) in job.items.iter_mut() {
                    if *id == update.work_id {
                        *s = status;
                    }
                }
            }
        }

        let mut details = self.details.lock().unwrap();
        let doc = details
            .get_mut(&(update.job_name.clone(), update.work_id.clone()))
            .ok_or_else(|| SyncError::not_found(format!("工作项 {}", update.work_id)))?;
        for (field, value) in &update.updated_fields {
            doc.insert(field.clone(), value.clone());
        }
        let revision = self.revision.fetch_add(1, Ordering::SeqCst) + 1;
        doc.insert("revision".to_string(), json!(revision));
        Ok(WorkDetail::from_map(doc.clone()))
    }

    async fn presigned_url(&self, _token: &str, uri: &str) -> Result<String> {
        self.presign_calls.fetch_add(1, Ordering::SeqCst);
        self.check_auth("/api/presigned_url")?;
        if self.failing_presign.lock().unwrap().contains(uri) {
            return Err(SyncError::unavailable("/api/presigned_url", "HTTP 500"));
        }
        Ok(format!("https://signed.example/{}", uri.trim_start_matches("s3://")))
    }
}

/// 会话 + 后端 + 凭证 + 快照
pub struct Harness {
    pub backend: Arc<FakeBackend>,
    pub credentials: Arc<SessionCredentials>,
    pub snapshots: Arc<MemorySnapshotStore>,
    pub session: ReviewSession,
}

impl Harness {
    pub fn new(backend: Arc<FakeBackend>) -> Self {
        let credentials = Arc::new(SessionCredentials::with_token("test-token"));
        let snapshots = Arc::new(MemorySnapshotStore::new());
        let session = ReviewSession::new(backend.clone(), credentials.clone(), snapshots.clone(), 2);
        Self {
            backend,
            credentials,
            snapshots,
            session,
        }
    }

    pub fn credentials_ok(&self) -> bool {
        self.credentials.is_authenticated()
    }
}

/// 一个包含元数据任务的后端
pub fn metadata_backend() -> Arc<FakeBackend> {
    let backend = FakeBackend::new();
    backend.add_job(
        "maps",
        "metadata",
        &[
            ("w1", WorkStatus::ReadyForReview),
            ("w2", WorkStatus::ReadyForReview),
            ("w3", WorkStatus::InProgress),
        ],
    );
    backend.add_detail(
        "maps",
        "w1",
        json!({
            "work_status": "READY FOR REVIEW",
            "image_s3_uris": ["s3://bucket/w1/p1.png", "s3://bucket/w1/p2.png"],
            "title": "Map of the county",
            "tags": ["a", "b"],
            "subject": {"value": "Geography", "explanation": "legend text"}
        }),
    );
    backend.add_detail(
        "maps",
        "w2",
        json!({
            "work_status": "READY FOR REVIEW",
            "image_s3_uris": ["s3://bucket/w2/p1.png"],
            "title": "Harbour chart",
            "tags": [],
            "scale": "1:10000"
        }),
    );
    backend.add_detail(
        "maps",
        "w3",
        json!({"work_status": "IN PROGRESS", "title": "Unfinished"}),
    );
    backend
}
