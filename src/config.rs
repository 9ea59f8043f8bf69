use crate::error::ConfigError;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// 程序配置文件
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 后端 API 根地址
    pub api_base_url: String,
    /// Bearer 凭证
    pub api_token: Option<String>,
    /// 任务进度轮询间隔（秒）
    pub poll_interval_secs: u64,
    /// 导出文件目录
    pub export_dir: String,
    /// 批量导出时同时拉取详情的数量
    pub export_concurrency: usize,
    /// 目录快照文件
    pub snapshot_path: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "https://api-url-not-configured.example".to_string(),
            api_token: None,
            poll_interval_secs: 5,
            export_dir: "exports".to_string(),
            export_concurrency: 4,
            snapshot_path: "review_snapshot.json".to_string(),
            verbose_logging: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// 从 TOML 文件加载配置，缺失的键使用默认值
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&content).map_err(|source| ConfigError::TomlParseFailed {
            path: path.to_path_buf(),
            source,
        })
    }

    /// 先读文件（如果给出），再用环境变量覆盖
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let base = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        let config = base.with_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn with_env_overrides(self) -> Self {
        Self {
            api_base_url: std::env::var("REVIEW_API_BASE_URL").unwrap_or(self.api_base_url),
            api_token: std::env::var("REVIEW_API_TOKEN").ok().or(self.api_token),
            poll_interval_secs: std::env::var("POLL_INTERVAL_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(self.poll_interval_secs),
            export_dir: std::env::var("EXPORT_DIR").unwrap_or(self.export_dir),
            export_concurrency: std::env::var("EXPORT_CONCURRENCY").ok().and_then(|v| v.parse().ok()).unwrap_or(self.export_concurrency),
            snapshot_path: std::env::var("SNAPSHOT_PATH").unwrap_or(self.snapshot_path),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(self.verbose_logging),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "poll_interval_secs".to_string(),
                reason: "必须大于 0".to_string(),
            });
        }
        if self.export_concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                key: "export_concurrency".to_string(),
                reason: "必须大于 0".to_string(),
            });
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_from_file_fills_missing_keys() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "api_base_url = \"https://review.example\"").unwrap();
        writeln!(file, "poll_interval_secs = 10").unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.api_base_url, "https://review.example");
        assert_eq!(config.poll_interval(), Duration::from_secs(10));
        assert_eq!(config.export_concurrency, 4);
        assert!(config.api_token.is_none());
    }

    #[test]
    fn test_from_file_reports_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "poll_interval_secs = \"soon\"").unwrap();

        let err = Config::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::TomlParseFailed { .. }));
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let config = Config {
            poll_interval_secs: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
