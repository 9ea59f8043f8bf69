use serde::de::Deserializer;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::models::field_value::FieldValue;

/// 带路由/展示含义的保留字段，不参与通用编辑与导出
pub const RESERVED_KEYS: [&str; 4] = ["work_id", "job_name", "work_status", "image_s3_uris"];

pub fn is_reserved(field: &str) -> bool {
    RESERVED_KEYS.contains(&field)
}

/// 单个工作项的完整元数据文档
///
/// 字段顺序与后端返回顺序一致；每个字段的形态在反序列化时确定。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkDetail {
    fields: Vec<(String, FieldValue)>,
}

impl WorkDetail {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(map: Map<String, JsonValue>) -> Self {
        Self {
            fields: map
                .into_iter()
                .map(|(name, value)| (name, FieldValue::classify(value)))
                .collect(),
        }
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value)
    }

    /// 设置字段；已存在则原位替换，否则追加到末尾
    pub fn set(&mut self, field: impl Into<String>, value: FieldValue) {
        let field = field.into();
        match self.fields.iter_mut().find(|(name, _)| *name == field) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((field, value)),
        }
    }

    pub fn contains(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// 所有字段名（含保留字段），保持原始顺序
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    /// 可编辑/可导出的字段
    pub fn editable_fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields
            .iter()
            .filter(|(name, _)| !is_reserved(name))
            .map(|(name, value)| (name.as_str(), value))
    }

    pub fn work_id(&self) -> Option<&str> {
        self.string_field("work_id")
    }

    pub fn job_name(&self) -> Option<&str> {
        self.string_field("job_name")
    }

    pub fn work_status(&self) -> Option<&str> {
        self.string_field("work_status")
    }

    /// 引用的图片存储标识（按页顺序）
    pub fn image_uris(&self) -> Vec<String> {
        match self.get("image_s3_uris") {
            Some(FieldValue::List(items)) => items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn to_json(&self) -> JsonValue {
        JsonValue::Object(
            self.fields
                .iter()
                .map(|(name, value)| (name.clone(), value.to_json()))
                .collect(),
        )
    }

    fn string_field(&self, field: &str) -> Option<&str> {
        match self.get(field) {
            Some(FieldValue::Scalar(JsonValue::String(s))) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl Serialize for WorkDetail {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for WorkDetail {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = Map::<String, JsonValue>::deserialize(deserializer)?;
        Ok(Self::from_map(map))
    }
}

impl FromIterator<(String, JsonValue)> for WorkDetail {
    fn from_iter<I: IntoIterator<Item = (String, JsonValue)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(name, value)| (name, FieldValue::classify(value)))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> WorkDetail {
        serde_json::from_value(json!({
            "work_id": "w1",
            "job_name": "job",
            "work_status": "READY FOR REVIEW",
            "image_s3_uris": ["s3://bucket/a.png", "s3://bucket/b.png"],
            "title": {"value": "Old map", "explanation": "caption"},
            "tags": ["a", "b"]
        }))
        .unwrap()
    }

    #[test]
    fn test_reserved_accessors() {
        let detail = sample();
        assert_eq!(detail.work_id(), Some("w1"));
        assert_eq!(detail.job_name(), Some("job"));
        assert_eq!(detail.work_status(), Some("READY FOR REVIEW"));
        assert_eq!(detail.image_uris().len(), 2);
    }

    #[test]
    fn test_editable_fields_skip_reserved_and_keep_order() {
        let detail = sample();
        let names: Vec<&str> = detail.editable_fields().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["title", "tags"]);
    }

    #[test]
    fn test_set_replaces_in_place() {
        let mut detail = sample();
        detail.set("title", FieldValue::classify(json!("New")));
        detail.set("notes", FieldValue::classify(json!("n")));
        let names: Vec<&str> = detail.field_names().collect();
        assert_eq!(names.last(), Some(&"notes"));
        assert_eq!(names[4], "title");
        assert_eq!(detail.get("title"), Some(&FieldValue::Scalar(json!("New"))));
    }

    #[test]
    fn test_serde_roundtrip_preserves_document() {
        let raw = sample().to_json();
        let text = serde_json::to_string(&sample()).unwrap();
        let back: JsonValue = serde_json::from_str(&text).unwrap();
        assert_eq!(back, raw);
    }
}
