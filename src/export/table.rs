//! 导出表格组装
//!
//! 列 = `work_id, work_status` + 所有详情字段的并集（去掉保留字段，按首次出现顺序）。
//! 单行拉取失败不影响整张表。

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

use crate::error::{Result, SyncError};
use crate::export::cell::{quote, render_cell};
use crate::models::{WorkDetail, WorkItem};

/// 拉取失败的行在各数据列中的标记
pub const FETCH_FAILED_MARKER: &str = "ERROR: failed to fetch metadata";
/// 拉取失败的行的状态列
pub const ERROR_STATUS: &str = "ERROR";
/// 只在存在失败行时追加的错误原因列
pub const ERROR_COLUMN: &str = "export_error";

const FIXED_COLUMNS: [&str; 2] = ["work_id", "work_status"];

/// 导出的一行
#[derive(Debug, Clone)]
pub struct ExportRow {
    pub work_id: String,
    pub work_status: String,
    /// 详情或失败原因
    pub detail: std::result::Result<WorkDetail, String>,
}

impl ExportRow {
    pub fn loaded(item: &WorkItem, detail: WorkDetail) -> Self {
        Self {
            work_id: item.work_id.clone(),
            work_status: item.work_status.to_string(),
            detail: Ok(detail),
        }
    }

    pub fn failed(item: &WorkItem, reason: impl Into<String>) -> Self {
        Self {
            work_id: item.work_id.clone(),
            work_status: item.work_status.to_string(),
            detail: Err(reason.into()),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.detail.is_err()
    }
}

/// 组装好的表格（单元格尚未加引号）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub failed_rows: usize,
}

impl ExportTable {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// 输出 CSV：每个单元格都加引号，行之间用 `\n`
    pub fn to_csv(&self) -> String {
        std::iter::once(&self.headers)
            .chain(self.rows.iter())
            .map(|cells| {
                cells
                    .iter()
                    .map(|cell| quote(cell))
                    .collect::<Vec<_>>()
                    .join(",")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// 发现列并逐行渲染
pub fn build_table(rows: &[ExportRow]) -> ExportTable {
    let mut fields: Vec<String> = Vec::new();
    for row in rows {
        if let Ok(detail) = &row.detail {
            for (name, _) in detail.editable_fields() {
                if !fields.iter().any(|f| f == name) {
                    fields.push(name.to_string());
                }
            }
        }
    }

    let failed_rows = rows.iter().filter(|r| r.is_failed()).count();
    let with_error_column = failed_rows > 0;

    let mut headers: Vec<String> = FIXED_COLUMNS.iter().map(|c| c.to_string()).collect();
    headers.extend(fields.iter().cloned());
    if with_error_column {
        headers.push(ERROR_COLUMN.to_string());
    }

    let body = rows
        .iter()
        .map(|row| {
            let mut cells = Vec::with_capacity(headers.len());
            cells.push(row.work_id.clone());
            match &row.detail {
                Ok(detail) => {
                    cells.push(row.work_status.clone());
                    cells.extend(
                        fields
                            .iter()
                            .map(|f| detail.get(f).map(render_cell).unwrap_or_default()),
                    );
                    if with_error_column {
                        cells.push(String::new());
                    }
                }
                Err(reason) => {
                    cells.push(ERROR_STATUS.to_string());
                    cells.extend(fields.iter().map(|_| FETCH_FAILED_MARKER.to_string()));
                    cells.push(reason.clone());
                }
            }
            cells
        })
        .collect();

    debug!(
        "表格组装完成: {} 列, {} 行 (失败 {})",
        headers.len(),
        rows.len(),
        failed_rows
    );

    ExportTable {
        headers,
        rows: body,
        failed_rows,
    }
}

/// 导出文件名：`<任务名>-all-results-<UTC 时间>.csv`
pub fn export_file_name(job_name: &str, at: DateTime<Utc>) -> String {
    let safe_job: String = job_name
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    format!(
        "{}-all-results-{}.csv",
        safe_job,
        at.format("%Y-%m-%dT%H-%M-%SZ")
    )
}

/// 写出导出文件，目录不存在时创建
pub async fn write_export(dir: &Path, file_name: &str, content: &str) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .await
        .map_err(|e| SyncError::file(dir, e))?;

    let path = dir.join(file_name);
    fs::write(&path, content).await.map_err(|e| {
        warn!("写入导出文件失败 {}: {}", path.display(), e);
        SyncError::file(&path, e)
    })?;
    Ok(path)
}
