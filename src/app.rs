use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

use review_sync::clients::HttpReviewClient;
use review_sync::config::Config;
use review_sync::error::SyncError;
use review_sync::infrastructure::{CredentialStore, JsonFileSnapshotStore, SessionCredentials};
use review_sync::models::WorkItem;
use review_sync::orchestrator::{CatalogPoller, PollerExit};
use review_sync::services::{EditOutcome, FieldEdit, RejectReason};
use review_sync::utils::logging::{log_catalog_summary, log_export_complete, log_startup};
use review_sync::workflow::{PollOutcome, ReviewSession, SkipReason};

use crate::cli::Command;

/// 应用主结构
pub struct App {
    config: Config,
    credentials: Arc<SessionCredentials>,
    session: ReviewSession,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        log_startup(&config.api_base_url, config.poll_interval_secs);

        let credentials = Arc::new(SessionCredentials::new(config.api_token.clone()));
        if !credentials.is_authenticated() {
            warn!("⚠️ 未配置 REVIEW_API_TOKEN，请求将无法通过认证");
        }

        let session = ReviewSession::new(
            Arc::new(HttpReviewClient::new(&config)),
            credentials.clone(),
            Arc::new(JsonFileSnapshotStore::new(&config.snapshot_path)),
            config.export_concurrency,
        );
        session.restore().await;

        Ok(Self {
            config,
            credentials,
            session,
        })
    }

    /// 运行子命令
    pub async fn run(&self, command: Command) -> Result<()> {
        match command {
            Command::Watch { job } => self.watch(&job).await,
            Command::Show { job, work } => self.show(&job, work.as_deref()).await,
            Command::Edit {
                job,
                work,
                field,
                value,
                explanation,
            } => self.edit(&job, &work, &field, value, explanation).await,
            Command::Mark { job, work, status } => {
                self.load_job(&job).await?;
                let item = self.find_item(&job, &work).await?;
                self.session.update_status(&item, status).await?;
                info!("✓ {} 已标记为 {}", item, status);
                Ok(())
            }
            Command::Export { job, work, out } => self.export(&job, work.as_deref(), out).await,
        }
    }

    async fn watch(&self, job: &str) -> Result<()> {
        self.session.submit_job_name(job).await?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut handle =
            CatalogPoller::new(self.session.clone(), self.config.poll_interval()).spawn(shutdown_rx);

        let finished = tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.context("监听 Ctrl-C 失败")?;
                None
            }
            exit = &mut handle => Some(exit.context("轮询任务异常退出")?),
        };
        let exit = match finished {
            Some(exit) => exit,
            None => {
                shutdown_tx.send_replace(true);
                handle.await.context("轮询任务异常退出")?
            }
        };

        if exit == PollerExit::SessionExpired {
            bail!("凭证已失效，请重新登录后再运行");
        }
        Ok(())
    }

    async fn show(&self, job: &str, work: Option<&str>) -> Result<()> {
        self.load_job(job).await?;
        let (item, _) = self.session.select_work_by_id(work).await?;

        let draft = self
            .session
            .draft()
            .await
            .with_context(|| format!("{} 的详情未加载", item))?;
        println!("{}", serde_json::to_string_pretty(&draft)?);

        if let Some(images) = self.session.images().await {
            for uri in draft.image_uris() {
                match images.url_for(&uri) {
                    Some(url) => println!("🖼️ {} -> {}", uri, url),
                    None => println!("🖼️ {} -> (不可用)", uri),
                }
            }
        }

        let findings = self.session.bias_findings().await;
        if !findings.is_empty() {
            println!("{}", serde_json::to_string_pretty(&findings)?);
        }
        Ok(())
    }

    async fn edit(
        &self,
        job: &str,
        work: &str,
        field: &str,
        value: Option<String>,
        explanation: Option<String>,
    ) -> Result<()> {
        if value.is_none() && explanation.is_none() {
            bail!("至少需要 --value 或 --explanation 之一");
        }

        self.load_job(job).await?;
        let item = self.find_item(job, work).await?;
        self.session.select_work(&item).await?;

        let edits = value
            .map(FieldEdit::Text)
            .into_iter()
            .chain(explanation.map(FieldEdit::Explanation));
        for edit in edits {
            match self.session.record_edit(field, edit).await? {
                EditOutcome::Applied => {}
                EditOutcome::Rejected(RejectReason::Malformed(reason)) => {
                    return Err(SyncError::MalformedInput {
                        field: field.to_string(),
                        reason,
                    }
                    .into());
                }
                EditOutcome::Rejected(reason) => {
                    bail!("字段 {} 的修改被拒绝: {:?}", field, reason);
                }
            }
        }

        let doc = self.session.submit_edits().await?;
        println!("{}", serde_json::to_string_pretty(&doc)?);
        Ok(())
    }

    async fn export(&self, job: &str, work: Option<&str>, out: Option<PathBuf>) -> Result<()> {
        let dir = out.unwrap_or_else(|| PathBuf::from(&self.config.export_dir));
        self.load_job(job).await?;

        let report = match work {
            Some(work_id) => {
                let item = self.find_item(job, work_id).await?;
                self.session.select_work(&item).await?;
                self.session.export_loaded(&dir).await?
            }
            None => self.session.export_job(&dir).await?,
        };

        log_export_complete(report.rows, report.failed_rows, &report.path);
        Ok(())
    }

    /// 提交任务名并立即拉取一次目录
    async fn load_job(&self, job: &str) -> Result<()> {
        self.session.submit_job_name(job).await?;
        match self.session.poll_catalog().await? {
            PollOutcome::Applied {
                job_name, summary, ..
            } => {
                log_catalog_summary(&job_name, &summary);
                Ok(())
            }
            PollOutcome::Skipped(SkipReason::NotAuthenticated) => {
                bail!("没有可用凭证，请设置 REVIEW_API_TOKEN")
            }
            PollOutcome::Skipped(SkipReason::NoJob) | PollOutcome::Stale => {
                bail!("任务 {} 的目录加载被中断", job)
            }
        }
    }

    async fn find_item(&self, job: &str, work_id: &str) -> Result<WorkItem> {
        self.session
            .catalog()
            .await
            .into_iter()
            .find(|item| item.work_id == work_id)
            .with_context(|| format!("任务 {} 中没有工作项 {}", job, work_id))
    }

    pub fn is_authenticated(&self) -> bool {
        self.credentials.is_authenticated()
    }
}
