//! 单元格格式化
//!
//! 每种字段形态对应一种平铺规则，结果是未加引号的文本；
//! 加引号与转义由 [`quote`] 统一处理。

use serde_json::{Map, Value as JsonValue};

use crate::models::bias::bias_entry_field;
use crate::models::field_value::{is_scalar, scalar_text};
use crate::models::FieldValue;

/// 空偏差列表的标记
pub const NO_BIASES: &str = "No biases found";

/// 通用对象展开的最大嵌套深度
const MAX_FLATTEN_DEPTH: usize = 8;

/// 把字段值渲染为单元格文本
pub fn render_cell(value: &FieldValue) -> String {
    match value {
        FieldValue::Null => String::new(),
        FieldValue::Scalar(v) => scalar_text(v),
        FieldValue::List(items) => render_list(items),
        FieldValue::Annotated(map) => render_annotated(map),
        FieldValue::Biases(map) => match map.get("biases") {
            Some(JsonValue::Array(entries)) => render_bias_entries(entries),
            _ => NO_BIASES.to_string(),
        },
        FieldValue::PageBiases(map) => match map.get("page_biases") {
            Some(JsonValue::Array(pages)) => render_bias_pages(pages),
            _ => String::new(),
        },
        FieldValue::BiasPages(pages) => render_bias_pages(pages),
        FieldValue::Transcription(map) => render_transcription(map),
        FieldValue::Object(map) => render_object(map),
    }
}

/// RFC 4180 风格：整体加双引号，内部双引号加倍
pub fn quote(text: &str) -> String {
    format!("\"{}\"", text.replace('"', "\"\""))
}

// ========== 辅助函数 ==========

fn render_json(value: &JsonValue) -> String {
    render_cell(&FieldValue::classify(value.clone()))
}

/// 标量列表用逗号连接，否则输出紧凑 JSON
fn render_list(items: &[JsonValue]) -> String {
    if items.is_empty() {
        return String::new();
    }
    if items.iter().all(is_scalar) {
        return items
            .iter()
            .map(|item| scalar_text(item).trim().to_string())
            .collect::<Vec<_>>()
            .join(", ");
    }
    serde_json::to_string(items).unwrap_or_default()
}

/// `value (explanation)`，没有说明时只输出 value
fn render_annotated(map: &Map<String, JsonValue>) -> String {
    let value = map.get("value").map(render_json).unwrap_or_default();
    match map.get("explanation").map(scalar_text) {
        Some(explanation) if !explanation.is_empty() => format!("{} ({})", value, explanation),
        _ => value,
    }
}

/// 单页偏差列表：每条记录的字段用 ", " 连接，记录之间用 "; "
fn render_bias_entries(entries: &[JsonValue]) -> String {
    if entries.is_empty() {
        return NO_BIASES.to_string();
    }
    entries
        .iter()
        .map(|entry| match entry {
            JsonValue::Object(_) => format!(
                "Type: {}, Level: {}, Explanation: {}",
                bias_entry_field(entry, "type"),
                bias_entry_field(entry, "level"),
                bias_entry_field(entry, "explanation")
            ),
            other => scalar_text(other),
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// 按页排列的偏差：每页一个块，页之间空一行
fn render_bias_pages(pages: &[JsonValue]) -> String {
    pages
        .iter()
        .enumerate()
        .map(|(index, page)| {
            let biases = page
                .get("biases")
                .and_then(JsonValue::as_array)
                .map(Vec::as_slice)
                .unwrap_or_default();

            let body = if biases.is_empty() {
                NO_BIASES.to_string()
            } else {
                biases
                    .iter()
                    .map(|bias| {
                        format!(
                            "Type: {}\nLevel: {}\nExplanation: {}",
                            bias_entry_field(bias, "type"),
                            bias_entry_field(bias, "level"),
                            bias_entry_field(bias, "explanation")
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n\n")
            };
            format!("Page {}:\n{}", index + 1, body)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// 逐页的印刷体/手写转录，末尾附模型备注
fn render_transcription(map: &Map<String, JsonValue>) -> String {
    let mut lines = Vec::new();
    let pages = map
        .get("transcriptions")
        .and_then(JsonValue::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    for (index, page) in pages.iter().enumerate() {
        lines.push(format!("Page {}:", index + 1));
        for (key, title) in [("printed_text", "Printed text:"), ("handwriting", "Handwriting:")] {
            let texts = page
                .get(key)
                .and_then(JsonValue::as_array)
                .filter(|texts| !texts.is_empty());
            if let Some(texts) = texts {
                lines.push(title.to_string());
                lines.extend(texts.iter().map(|t| format!("  {}", scalar_text(t))));
            }
        }
        lines.push(String::new());
    }

    if let Some(notes) = map.get("model_notes").map(scalar_text).filter(|n| !n.is_empty()) {
        lines.push("Notes:".to_string());
        lines.push(notes);
    }

    lines.join("\n")
}

/// 通用对象：展开为 `a.b: v` 并用逗号连接，展开失败时输出格式化 JSON
fn render_object(map: &Map<String, JsonValue>) -> String {
    let mut pairs = Vec::new();
    match flatten_into(&mut pairs, "", map, 0) {
        Ok(()) => pairs.join(", "),
        Err(()) => serde_json::to_string_pretty(map).unwrap_or_default(),
    }
}

fn flatten_into(
    pairs: &mut Vec<String>,
    prefix: &str,
    map: &Map<String, JsonValue>,
    depth: usize,
) -> Result<(), ()> {
    if depth > MAX_FLATTEN_DEPTH {
        return Err(());
    }

    for (key, value) in map {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };

        match value {
            JsonValue::Object(inner) if !inner.is_empty() => {
                flatten_into(pairs, &path, inner, depth + 1)?
            }
            JsonValue::Object(_) => pairs.push(format!("{}: ", path)),
            JsonValue::Array(items) => pairs.push(format!("{}: {}", path, render_list(items))),
            scalar => pairs.push(format!("{}: {}", path, scalar_text(scalar))),
        }
    }
    Ok(())
}
