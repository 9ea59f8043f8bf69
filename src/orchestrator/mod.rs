//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 负责定时调度：按固定间隔驱动会话的目录轮询，
//! 并在凭证失效时停下来等待重新登录。
//!
//! ## 层次关系
//!
//! ```text
//! orchestrator::CatalogPoller (定时调度)
//!     ↓
//! workflow::ReviewSession (审阅流程 + 状态容器)
//!     ↓
//! services (能力层：目录 / 详情 / 图片 / 编辑 / 提交)
//!     ↓
//! clients + infrastructure (后端端口、凭证、快照)
//! ```

pub mod poller;

pub use poller::{CatalogPoller, PollerExit};
