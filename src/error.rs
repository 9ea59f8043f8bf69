use std::path::PathBuf;
use thiserror::Error;

/// 同步引擎错误类型
///
/// 只有 `Unauthorized` 需要跨组件传播（会话失效）；
/// 其余错误要么返回给调用方，要么在局部降级处理。
#[derive(Debug, Error)]
pub enum SyncError {
    /// 凭证被后端拒绝（401/403）
    #[error("凭证无效或已过期 ({endpoint})")]
    Unauthorized { endpoint: String },

    /// 请求的资源不存在
    #[error("未找到: {what}")]
    NotFound { what: String },

    /// 后端或网络暂时不可用
    #[error("后端不可用 ({endpoint}): {reason}")]
    Unavailable { endpoint: String, reason: String },

    /// 提交时没有任何待提交的修改
    #[error("没有待提交的修改")]
    NoChanges,

    /// 存储对象标识格式不正确
    #[error("无效的存储引用: {uri}")]
    InvalidReference { uri: String },

    /// 编辑输入无法按字段结构解析
    #[error("字段 {field} 的输入无法解析: {reason}")]
    MalformedInput { field: String, reason: String },

    /// 提交的任务名为空
    #[error("任务名不能为空")]
    EmptyJobName,

    /// 尚未提交任务名称
    #[error("未设置任务名称")]
    NoJob,

    /// 当前没有选中的工作项
    #[error("未选择任何工作项")]
    NoSelection,

    /// 没有可导出的工作项
    #[error("任务 {job_name} 没有可导出的工作项")]
    NothingToExport { job_name: String },

    /// 文件读写失败
    #[error("文件操作失败 ({}): {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 快照文件内容损坏
    #[error("快照文件解析失败 ({}): {source}", path.display())]
    SnapshotCorrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 读取配置文件失败
    #[error("读取配置文件失败 ({}): {source}", path.display())]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// TOML 解析失败
    #[error("TOML解析失败 ({}): {source}", path.display())]
    TomlParseFailed {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// 配置值不合法
    #[error("配置项 {key} 不合法: {reason}")]
    InvalidValue { key: String, reason: String },
}

// ========== 便捷构造函数 ==========

impl SyncError {
    /// 创建后端不可用错误
    pub fn unavailable(endpoint: impl Into<String>, reason: impl ToString) -> Self {
        SyncError::Unavailable {
            endpoint: endpoint.into(),
            reason: reason.to_string(),
        }
    }

    /// 创建凭证失效错误
    pub fn unauthorized(endpoint: impl Into<String>) -> Self {
        SyncError::Unauthorized {
            endpoint: endpoint.into(),
        }
    }

    /// 创建资源不存在错误
    pub fn not_found(what: impl Into<String>) -> Self {
        SyncError::NotFound { what: what.into() }
    }

    /// 创建文件错误
    pub fn file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SyncError::File {
            path: path.into(),
            source,
        }
    }

    /// 是否为凭证失效错误
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, SyncError::Unauthorized { .. })
    }
}

// ========== Result 类型别名 ==========

/// 同步引擎结果类型
pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unauthorized_helper() {
        let err = SyncError::unauthorized("/api/results");
        assert!(err.is_unauthorized());
        assert!(err.to_string().contains("/api/results"));
        assert!(!SyncError::NoChanges.is_unauthorized());
    }

    #[test]
    fn test_config_error_wraps() {
        let err: SyncError = ConfigError::InvalidValue {
            key: "poll_interval_secs".to_string(),
            reason: "必须大于 0".to_string(),
        }
        .into();
        assert!(matches!(err, SyncError::Config(_)));
    }
}
