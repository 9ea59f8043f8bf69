//! 编辑追踪 - 业务能力层
//!
//! 维护两份视图：
//! - draft：基线 + 所有已记录的修改（界面看到的内容）
//! - pending：只有差异部分（提交的内容）
//!
//! 基线只在提交成功或服务端状态变化时被替换，输入过程中不会被改写。

use serde_json::{Map, Value as JsonValue};
use std::mem::discriminant;
use tracing::{debug, warn};

use crate::models::field_value::{is_scalar, scalar_text};
use crate::models::{is_reserved, FieldValue, WorkDetail};

/// 一次用户输入
#[derive(Debug, Clone, PartialEq)]
pub enum FieldEdit {
    /// 字段的文本输入：标量直接替换，列表按逗号拆分，
    /// `{value, explanation}` 替换 value 部分，其它结构按 JSON 解析
    Text(String),
    /// 只替换 `{value, explanation}` 的 explanation 部分
    Explanation(String),
}

/// 拒绝原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// 保留字段不可编辑
    ReservedField,
    /// 输入无法按字段结构解析
    Malformed(String),
    /// 字段不是 `{value, explanation}` 结构
    NoExplanation,
}

/// 记录结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    Applied,
    Rejected(RejectReason),
}

impl EditOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, EditOutcome::Applied)
    }
}

/// 当前选中工作项的编辑追踪器
#[derive(Debug, Clone, Default)]
pub struct EditTracker {
    baseline: WorkDetail,
    draft: WorkDetail,
    pending: Map<String, JsonValue>,
}

impl EditTracker {
    pub fn new(baseline: WorkDetail) -> Self {
        Self {
            draft: baseline.clone(),
            baseline,
            pending: Map::new(),
        }
    }

    pub fn baseline(&self) -> &WorkDetail {
        &self.baseline
    }

    pub fn draft(&self) -> &WorkDetail {
        &self.draft
    }

    pub fn pending(&self) -> &Map<String, JsonValue> {
        &self.pending
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// 记录一次编辑
    ///
    /// # 参数
    /// - `field`: 字段名
    /// - `edit`: 用户输入
    ///
    /// # 返回
    /// 被拒绝时 draft 与 pending 都保持不变
    pub fn record(&mut self, field: &str, edit: FieldEdit) -> EditOutcome {
        if is_reserved(field) {
            debug!("忽略对保留字段 {} 的编辑", field);
            return EditOutcome::Rejected(RejectReason::ReservedField);
        }

        let current = self.draft.get(field);
        let next = match interpret(field, current, edit) {
            Ok(value) => value,
            Err(reason) => {
                warn!("⚠️ 字段 {} 的编辑被拒绝: {:?}", field, reason);
                return EditOutcome::Rejected(reason);
            }
        };

        if self.baseline.get(field) == Some(&next) {
            self.pending.remove(field);
        } else {
            self.pending.insert(field.to_string(), next.to_json());
        }
        self.draft.set(field, next);
        EditOutcome::Applied
    }

    /// 提交成功后用服务端文档替换基线
    ///
    /// 提交期间新记录的修改（与已提交内容不同）会保留并重新叠加到 draft。
    pub fn commit(&mut self, server_doc: WorkDetail, submitted: &Map<String, JsonValue>) {
        self.pending
            .retain(|field, value| submitted.get(field) != Some(value));
        self.baseline = server_doc;
        self.rebuild_draft();
    }

    /// 服务端单字段变化（例如状态流转），不影响 pending
    pub fn apply_server_field(&mut self, field: &str, value: JsonValue) {
        self.baseline.set(field, FieldValue::classify(value));
        self.rebuild_draft();
    }

    fn rebuild_draft(&mut self) {
        let mut draft = self.baseline.clone();
        for (field, value) in &self.pending {
            draft.set(field.as_str(), FieldValue::classify(value.clone()));
        }
        self.draft = draft;
    }
}

// ========== 辅助函数 ==========

/// 按字段当前形态解释用户输入
fn interpret(
    field: &str,
    current: Option<&FieldValue>,
    edit: FieldEdit,
) -> Result<FieldValue, RejectReason> {
    match edit {
        FieldEdit::Explanation(text) => match current {
            Some(FieldValue::Annotated(map)) => {
                let mut map = map.clone();
                map.insert("explanation".to_string(), JsonValue::String(text));
                Ok(FieldValue::Annotated(map))
            }
            _ => Err(RejectReason::NoExplanation),
        },
        FieldEdit::Text(text) => match current {
            None | Some(FieldValue::Null) => Ok(FieldValue::Scalar(JsonValue::String(text))),
            Some(FieldValue::Scalar(old)) => Ok(FieldValue::Scalar(coerce_scalar(old, text))),
            Some(FieldValue::List(items)) if items.iter().all(is_scalar) => {
                Ok(FieldValue::List(split_values(&text)))
            }
            Some(FieldValue::Annotated(map)) => {
                let value = match map.get("value") {
                    Some(JsonValue::Array(_)) => JsonValue::Array(split_values(&text)),
                    Some(old) if !old.is_null() => coerce_scalar(old, text),
                    _ => JsonValue::String(text),
                };
                let mut map = map.clone();
                map.insert("value".to_string(), value);
                Ok(FieldValue::Annotated(map))
            }
            Some(
                structured @ (FieldValue::List(_)
                | FieldValue::Biases(_)
                | FieldValue::PageBiases(_)
                | FieldValue::BiasPages(_)
                | FieldValue::Transcription(_)
                | FieldValue::Object(_)),
            ) => parse_structured(field, structured, &text),
        },
    }
}

/// 结构化字段的输入必须是同一形态的 JSON
fn parse_structured(
    field: &str,
    current: &FieldValue,
    text: &str,
) -> Result<FieldValue, RejectReason> {
    let parsed: JsonValue = serde_json::from_str(text)
        .map_err(|e| RejectReason::Malformed(format!("{}: {}", field, e)))?;
    let next = FieldValue::classify(parsed);

    if discriminant(&next) == discriminant(current) {
        Ok(next)
    } else {
        Err(RejectReason::Malformed(format!(
            "{}: 期望 {} 结构，实际为 {}",
            field,
            current.shape_name(),
            next.shape_name()
        )))
    }
}

/// 保持原标量类型：数字/布尔字段输入能解析时沿用原类型，否则存为字符串
fn coerce_scalar(old: &JsonValue, text: String) -> JsonValue {
    match old {
        JsonValue::Number(_) => match serde_json::from_str::<JsonValue>(text.trim()) {
            Ok(number @ JsonValue::Number(_)) => number,
            _ => JsonValue::String(text),
        },
        JsonValue::Bool(_) => match text.trim() {
            "true" => JsonValue::Bool(true),
            "false" => JsonValue::Bool(false),
            _ => JsonValue::String(text),
        },
        _ => JsonValue::String(text),
    }
}

/// 按逗号拆分，去掉首尾空白并丢弃空段
///
/// 空输入得到空列表。
pub fn split_delimited(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}

fn split_values(text: &str) -> Vec<JsonValue> {
    split_delimited(text)
        .into_iter()
        .map(JsonValue::String)
        .collect()
}

/// 列表字段显示给用户时的文本形式（与拆分规则对应）
pub fn join_for_display(items: &[JsonValue]) -> String {
    items.iter().map(scalar_text).collect::<Vec<_>>().join(", ")
}
