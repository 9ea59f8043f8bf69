use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

use crate::models::field_value::{scalar_text, FieldValue};
use crate::models::work_detail::WorkDetail;

/// 偏差等级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BiasLevel {
    High,
    Medium,
    Low,
    /// 后端给出了无法识别的等级
    #[serde(other)]
    Unknown,
}

impl BiasLevel {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "high" => BiasLevel::High,
            "medium" => BiasLevel::Medium,
            "low" => BiasLevel::Low,
            _ => BiasLevel::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BiasLevel::High => "high",
            BiasLevel::Medium => "medium",
            BiasLevel::Low => "low",
            BiasLevel::Unknown => "unknown",
        }
    }
}

impl fmt::Display for BiasLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 一条偏差记录，附带其来源页面的图片引用
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiasFinding {
    pub bias_type: String,
    pub bias_level: BiasLevel,
    pub explanation: String,
    /// 页码（从1开始）
    pub page_number: usize,
    #[serde(rename = "imageUri")]
    pub image_uri: Option<String>,
}

/// 读取偏差条目中的字段，兼容 `type` / `bias_type` 两种写法
pub fn bias_entry_field(entry: &JsonValue, short: &str) -> String {
    let long = format!("bias_{}", short);
    entry
        .get(short)
        .or_else(|| entry.get(long.as_str()))
        .map(scalar_text)
        .unwrap_or_default()
}

/// 将按页排列的偏差结构展开为扁平列表
///
/// 第 N 页的记录对应 `image_s3_uris` 的第 N 个引用。
pub fn collect_findings(detail: &WorkDetail) -> Vec<BiasFinding> {
    let pages: &[JsonValue] = match detail.get("page_biases") {
        Some(FieldValue::BiasPages(pages)) | Some(FieldValue::List(pages)) => pages.as_slice(),
        Some(FieldValue::PageBiases(map)) => match map.get("page_biases") {
            Some(JsonValue::Array(pages)) => pages.as_slice(),
            _ => return Vec::new(),
        },
        _ => return Vec::new(),
    };
    let image_uris = detail.image_uris();

    pages
        .iter()
        .enumerate()
        .flat_map(|(page_index, page)| {
            let biases = page
                .get("biases")
                .and_then(JsonValue::as_array)
                .cloned()
                .unwrap_or_default();
            let image_uri = image_uris.get(page_index).cloned();
            biases.into_iter().map(move |entry| BiasFinding {
                bias_type: bias_entry_field(&entry, "type"),
                bias_level: BiasLevel::parse(&bias_entry_field(&entry, "level")),
                explanation: bias_entry_field(&entry, "explanation"),
                page_number: page_index + 1,
                image_uri: image_uri.clone(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_collect_findings_annotates_page_image() {
        let detail: WorkDetail = serde_json::from_value(json!({
            "work_id": "w1",
            "image_s3_uris": ["s3://bucket/p1.png", "s3://bucket/p2.png"],
            "page_biases": [
                {"biases": [{"type": "Gender", "level": "high", "explanation": "X"}]},
                {"biases": [
                    {"bias_type": "Racial", "bias_level": "LOW", "explanation": "Y"},
                    {"type": "Age", "level": "extreme", "explanation": "Z"}
                ]}
            ]
        }))
        .unwrap();

        let findings = collect_findings(&detail);
        assert_eq!(findings.len(), 3);
        assert_eq!(findings[0].bias_type, "Gender");
        assert_eq!(findings[0].bias_level, BiasLevel::High);
        assert_eq!(findings[0].page_number, 1);
        assert_eq!(findings[0].image_uri.as_deref(), Some("s3://bucket/p1.png"));
        assert_eq!(findings[1].bias_type, "Racial");
        assert_eq!(findings[1].bias_level, BiasLevel::Low);
        assert_eq!(findings[1].image_uri.as_deref(), Some("s3://bucket/p2.png"));
        assert_eq!(findings[2].bias_level, BiasLevel::Unknown);
    }

    #[test]
    fn test_missing_page_biases_yields_nothing() {
        let detail: WorkDetail = serde_json::from_value(json!({"work_id": "w1"})).unwrap();
        assert!(collect_findings(&detail).is_empty());
    }

    #[test]
    fn test_finding_serializes_image_uri_camel_case() {
        let finding = BiasFinding {
            bias_type: "Gender".to_string(),
            bias_level: BiasLevel::Medium,
            explanation: "X".to_string(),
            page_number: 1,
            image_uri: Some("s3://b/k".to_string()),
        };
        let value = serde_json::to_value(&finding).unwrap();
        assert_eq!(value["imageUri"], json!("s3://b/k"));
        assert_eq!(value["bias_level"], json!("medium"));
    }
}
