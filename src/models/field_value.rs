//! 字段值的形态
//!
//! Work Detail 的字段是开放结构，同一个字段在不同任务里可能是标量、
//! 列表、`{value, explanation}` 结构或嵌套的偏差结构。
//! 形态只在解析时判断一次，之后编辑和导出都对 `FieldValue` 做穷尽匹配。

use serde::{Serialize, Serializer};
use serde_json::{Map, Value as JsonValue};

/// 已分类的字段值
///
/// 每个变体都保留原始 JSON，`to_json` 可以无损还原。
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// 空值
    Null,
    /// 字符串、数字或布尔
    Scalar(JsonValue),
    /// 普通列表（可能为空）
    List(Vec<JsonValue>),
    /// `{value, explanation?}`
    Annotated(Map<String, JsonValue>),
    /// `{biases: [...]}`
    Biases(Map<String, JsonValue>),
    /// `{page_biases: [{biases: [...]}, ...]}`
    PageBiases(Map<String, JsonValue>),
    /// `[{biases: [...]}, ...]`，按页排列
    BiasPages(Vec<JsonValue>),
    /// `{transcriptions: [...], model_notes?}`
    Transcription(Map<String, JsonValue>),
    /// 其它对象
    Object(Map<String, JsonValue>),
}

impl FieldValue {
    /// 判断 JSON 值的形态
    pub fn classify(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => FieldValue::Null,
            JsonValue::Array(items) => {
                if is_bias_page_list(&items) {
                    FieldValue::BiasPages(items)
                } else {
                    FieldValue::List(items)
                }
            }
            JsonValue::Object(map) => {
                if map.get("page_biases").is_some_and(JsonValue::is_array) {
                    FieldValue::PageBiases(map)
                } else if map.contains_key("value") {
                    FieldValue::Annotated(map)
                } else if map.get("biases").is_some_and(JsonValue::is_array) {
                    FieldValue::Biases(map)
                } else if map.get("transcriptions").is_some_and(JsonValue::is_array) {
                    FieldValue::Transcription(map)
                } else {
                    FieldValue::Object(map)
                }
            }
            scalar => FieldValue::Scalar(scalar),
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            FieldValue::Null => JsonValue::Null,
            FieldValue::Scalar(v) => v.clone(),
            FieldValue::List(items) | FieldValue::BiasPages(items) => JsonValue::Array(items.clone()),
            FieldValue::Annotated(map)
            | FieldValue::Biases(map)
            | FieldValue::PageBiases(map)
            | FieldValue::Transcription(map)
            | FieldValue::Object(map) => JsonValue::Object(map.clone()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// `{value, explanation}` 中的 value 部分
    pub fn annotated_value(&self) -> Option<&JsonValue> {
        match self {
            FieldValue::Annotated(map) => map.get("value"),
            _ => None,
        }
    }

    /// `{value, explanation}` 中的 explanation 部分
    pub fn explanation(&self) -> Option<&JsonValue> {
        match self {
            FieldValue::Annotated(map) => map.get("explanation").filter(|v| !v.is_null()),
            _ => None,
        }
    }

    /// 形态名称（用于日志）
    pub fn shape_name(&self) -> &'static str {
        match self {
            FieldValue::Null => "null",
            FieldValue::Scalar(_) => "scalar",
            FieldValue::List(_) => "list",
            FieldValue::Annotated(_) => "annotated",
            FieldValue::Biases(_) => "biases",
            FieldValue::PageBiases(_) => "page_biases",
            FieldValue::BiasPages(_) => "bias_pages",
            FieldValue::Transcription(_) => "transcription",
            FieldValue::Object(_) => "object",
        }
    }
}

impl From<JsonValue> for FieldValue {
    fn from(value: JsonValue) -> Self {
        FieldValue::classify(value)
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// 列表中每一项都是带 `biases` 数组的对象
fn is_bias_page_list(items: &[JsonValue]) -> bool {
    !items.is_empty()
        && items.iter().all(|item| {
            item.as_object()
                .and_then(|page| page.get("biases"))
                .is_some_and(JsonValue::is_array)
        })
}

/// 标量转文本：字符串原样，数字/布尔用字面量，空值为空串
pub fn scalar_text(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => String::new(),
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub fn is_scalar(value: &JsonValue) -> bool {
    matches!(
        value,
        JsonValue::String(_) | JsonValue::Number(_) | JsonValue::Bool(_)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classify_shapes() {
        assert!(matches!(FieldValue::classify(json!(null)), FieldValue::Null));
        assert!(matches!(FieldValue::classify(json!("x")), FieldValue::Scalar(_)));
        assert!(matches!(FieldValue::classify(json!(3)), FieldValue::Scalar(_)));
        assert!(matches!(FieldValue::classify(json!([])), FieldValue::List(_)));
        assert!(matches!(FieldValue::classify(json!(["a"])), FieldValue::List(_)));
        assert!(matches!(
            FieldValue::classify(json!({"value": "x", "explanation": "y"})),
            FieldValue::Annotated(_)
        ));
        assert!(matches!(
            FieldValue::classify(json!({"value": ["a"]})),
            FieldValue::Annotated(_)
        ));
        assert!(matches!(
            FieldValue::classify(json!({"biases": []})),
            FieldValue::Biases(_)
        ));
        assert!(matches!(
            FieldValue::classify(json!({"page_biases": [{"biases": []}]})),
            FieldValue::PageBiases(_)
        ));
        assert!(matches!(
            FieldValue::classify(json!([{"biases": []}, {"biases": [{"type": "x"}]}])),
            FieldValue::BiasPages(_)
        ));
        assert!(matches!(
            FieldValue::classify(json!({"transcriptions": [], "model_notes": "n"})),
            FieldValue::Transcription(_)
        ));
        assert!(matches!(
            FieldValue::classify(json!({"a": 1})),
            FieldValue::Object(_)
        ));
    }

    #[test]
    fn test_mixed_list_is_plain_list() {
        let value = FieldValue::classify(json!([{"biases": []}, "loose"]));
        assert!(matches!(value, FieldValue::List(_)));
    }

    #[test]
    fn test_to_json_is_lossless() {
        let raw = json!({"value": ["a", "b"], "explanation": "why", "confidence": 0.4});
        let value = FieldValue::classify(raw.clone());
        assert_eq!(value.to_json(), raw);
        assert_eq!(value.annotated_value(), Some(&json!(["a", "b"])));
        assert_eq!(value.explanation(), Some(&json!("why")));
    }

    #[test]
    fn test_scalar_text() {
        assert_eq!(scalar_text(&json!("abc")), "abc");
        assert_eq!(scalar_text(&json!(12)), "12");
        assert_eq!(scalar_text(&json!(true)), "true");
        assert_eq!(scalar_text(&json!(null)), "");
    }
}
