//! # Review Sync
//!
//! 审阅同步引擎：跟踪异步文档处理任务，审阅并修改单个工作项的元数据，
//! 把修改推回后端，并把整个任务的结果导出为表格。
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure / Clients）
//! - `infrastructure/` - 持有外部资源，只暴露能力
//! - `CredentialStore` - 凭证读取与作废（会话失效是唯一跨组件传播的副作用）
//! - `SnapshotStore` - 目录快照的持久化端口
//! - `clients/` - `ReviewBackend` 后端端口及其 HTTP 实现
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，每个服务只负责一种能力
//! - `CatalogLoader` - 拉取任务目录
//! - `DetailFetcher` - 拉取单个工作项详情
//! - `ReferenceResolver` - 存储引用 → 短期可访问地址
//! - `EditTracker` - 记录未提交的修改（draft / pending 两份视图）
//! - `UpdateSubmitter` - 提交字段修改与状态流转
//! - `export/` - 单元格平铺与表格组装
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义完整的审阅流程
//! - `ReviewState` - 显式状态容器（目录 + 当前选择）
//! - `ReviewSession` - 流程编排（轮询 → 选择 → 编辑 → 提交 → 导出）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/poller` - 固定间隔的目录轮询，凭证失效时停止
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;
pub mod export;
pub mod infrastructure;
pub mod logger;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use clients::{HttpReviewClient, ReviewBackend};
pub use config::Config;
pub use error::{Result, SyncError};
pub use infrastructure::{CredentialStore, SessionCredentials, SnapshotStore};
pub use models::{FieldValue, WorkDetail, WorkItem, WorkStatus};
pub use orchestrator::CatalogPoller;
pub use workflow::ReviewSession;
