//! 凭证存储 - 基础设施层
//!
//! 只持有 bearer 凭证，只暴露"读取/作废"能力。登录流程不在这里。

use tokio::sync::watch;
use tracing::warn;

/// 凭证存储
///
/// 核心只会读取凭证，并在后端拒绝凭证时调用 `invalidate`，
/// 由驱动方负责跳转登录并通过 `reauthenticate` 注入新凭证。
pub trait CredentialStore: Send + Sync {
    /// 当前凭证
    fn token(&self) -> Option<String>;

    /// 作废当前凭证
    fn invalidate(&self);

    fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }
}

/// 内存中的会话凭证
pub struct SessionCredentials {
    sender: watch::Sender<Option<String>>,
}

impl SessionCredentials {
    pub fn new(token: Option<String>) -> Self {
        let (sender, _) = watch::channel(token.filter(|t| !t.trim().is_empty()));
        Self { sender }
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self::new(Some(token.into()))
    }

    pub fn anonymous() -> Self {
        Self::new(None)
    }

    /// 重新登录后注入新凭证
    pub fn reauthenticate(&self, token: impl Into<String>) {
        self.sender.send_replace(Some(token.into()));
    }

    /// 订阅凭证变化（作废时收到 `None`）
    pub fn subscribe(&self) -> watch::Receiver<Option<String>> {
        self.sender.subscribe()
    }
}

impl CredentialStore for SessionCredentials {
    fn token(&self) -> Option<String> {
        self.sender.borrow().clone()
    }

    fn invalidate(&self) {
        let previous = self.sender.send_replace(None);
        if previous.is_some() {
            warn!("🔒 凭证已失效，需要重新登录");
        }
    }
}
