//! 目录轮询器 - 编排层
//!
//! ## 职责
//!
//! 按固定间隔调用 `ReviewSession::poll_catalog`，直到：
//! - 收到停止信号
//! - 凭证失效（需要重新登录后再启动）
//!
//! 单次轮询失败（后端暂时不可用）只记录警告，等待下一次。

use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::utils::logging::log_catalog_summary;
use crate::workflow::{PollOutcome, ReviewSession, SkipReason};

/// 轮询器退出原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerExit {
    /// 收到停止信号
    Shutdown,
    /// 凭证失效
    SessionExpired,
}

pub struct CatalogPoller {
    session: ReviewSession,
    interval: Duration,
}

impl CatalogPoller {
    pub fn new(session: ReviewSession, interval: Duration) -> Self {
        Self { session, interval }
    }

    /// 运行轮询循环
    ///
    /// # 参数
    /// - `shutdown`: 值变为 `true` 或发送端关闭时退出
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> PollerExit {
        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("⏱️ 目录轮询已启动，间隔 {:?}", self.interval);

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("目录轮询已停止");
                        return PollerExit::Shutdown;
                    }
                }
                _ = ticker.tick() => {
                    if let Some(exit) = self.poll_once().await {
                        return exit;
                    }
                }
            }
        }
    }

    /// 在后台任务中运行
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<PollerExit> {
        tokio::spawn(self.run(shutdown))
    }

    async fn poll_once(&self) -> Option<PollerExit> {
        match self.session.poll_catalog().await {
            Ok(PollOutcome::Applied {
                job_name, summary, ..
            }) => {
                log_catalog_summary(&job_name, &summary);
                None
            }
            Ok(PollOutcome::Stale) => {
                debug!("轮询结果已过期");
                None
            }
            Ok(PollOutcome::Skipped(SkipReason::NoJob)) => {
                debug!("尚未设置任务名，跳过轮询");
                None
            }
            Ok(PollOutcome::Skipped(SkipReason::NotAuthenticated)) => {
                warn!("🔒 没有可用凭证，停止轮询");
                Some(PollerExit::SessionExpired)
            }
            Err(e) if e.is_unauthorized() => {
                error!("🔒 {}，停止轮询", e);
                Some(PollerExit::SessionExpired)
            }
            Err(e) => {
                warn!("⚠️ 轮询失败，等待下一次: {}", e);
                None
            }
        }
    }
}
