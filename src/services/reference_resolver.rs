/// 存储对象引用解析 - 业务能力层
///
/// 职责：把 `scheme://bucket/key` 形式的存储标识换成短期可访问的地址。
/// 单个引用失败只返回 `None`，只有凭证失效会向上传播。
use futures::future::join_all;
use regex::Regex;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};
use tracing::{debug, warn};

use crate::clients::ReviewBackend;
use crate::error::{Result, SyncError};

// scheme://bucket/key，bucket 不含空白，key 可以含空格
static RE_REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.-]*://[^/\s]+/.+$").unwrap());

/// 检查存储标识的格式
///
/// # 返回
/// 去掉首尾空白后的标识
pub fn validate_reference(uri: &str) -> Result<&str> {
    let trimmed = uri.trim();
    if RE_REFERENCE.is_match(trimmed) {
        Ok(trimmed)
    } else {
        Err(SyncError::InvalidReference {
            uri: uri.to_string(),
        })
    }
}

/// 一次选择对应的全部图片解析结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedImages {
    /// 存储标识 -> 可访问地址
    pub urls: HashMap<String, String>,
    /// 未能解析的标识（显示占位）
    pub unresolved: Vec<String>,
    /// 期间是否遇到凭证失效
    pub unauthorized: bool,
}

impl ResolvedImages {
    pub fn url_for(&self, uri: &str) -> Option<&str> {
        self.urls.get(uri).map(String::as_str)
    }

    pub fn resolved_count(&self) -> usize {
        self.urls.len()
    }
}

pub struct ReferenceResolver {
    backend: Arc<dyn ReviewBackend>,
}

impl ReferenceResolver {
    pub fn new(backend: Arc<dyn ReviewBackend>) -> Self {
        Self { backend }
    }

    /// 解析单个存储标识
    ///
    /// # 返回
    /// - `Ok(Some(url))`: 解析成功
    /// - `Ok(None)`: 格式错误或后端失败，调用方显示占位
    /// - `Err(Unauthorized)`: 凭证失效
    pub async fn resolve(&self, token: &str, uri: &str) -> Result<Option<String>> {
        let reference = match validate_reference(uri) {
            Ok(reference) => reference,
            Err(e) => {
                warn!("⚠️ {}", e);
                return Ok(None);
            }
        };

        match self.backend.presigned_url(token, reference).await {
            Ok(url) => {
                debug!("✓ 已解析 {}", uri);
                Ok(Some(url))
            }
            Err(e) if e.is_unauthorized() => Err(e),
            Err(e) => {
                warn!("⚠️ 解析存储引用失败 {}: {}", uri, e);
                Ok(None)
            }
        }
    }

    /// 并发解析全部标识，等全部结束后统一返回
    pub async fn resolve_all(&self, token: &str, uris: &[String]) -> ResolvedImages {
        let results = join_all(uris.iter().map(|uri| async move {
            (uri.clone(), self.resolve(token, uri).await)
        }))
        .await;

        let mut images = ResolvedImages::default();
        for (uri, result) in results {
            match result {
                Ok(Some(url)) => {
                    images.urls.insert(uri, url);
                }
                Ok(None) => images.unresolved.push(uri),
                Err(_) => {
                    images.unauthorized = true;
                    images.unresolved.push(uri);
                }
            }
        }

        debug!(
            "图片解析完成: 成功 {} / 失败 {}",
            images.urls.len(),
            images.unresolved.len()
        );
        images
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_reference() {
        assert!(validate_reference("s3://bucket/key.png").is_ok());
        assert_eq!(
            validate_reference(" s3://bucket/dir/page 1.png ").unwrap(),
            "s3://bucket/dir/page 1.png"
        );
        assert!(validate_reference("s3://my bucket/key.png").is_err());
        assert!(validate_reference("gs://b/k").is_ok());
        assert!(validate_reference("bucket/key").is_err());
        assert!(validate_reference("s3://bucket").is_err());
        assert!(validate_reference("s3://bucket/").is_err());
        assert!(validate_reference("").is_err());
    }
}
