/// 日志工具模块
///
/// 提供日志格式化和输出的辅助函数
use std::path::Path;
use tracing::info;

use crate::models::CatalogSummary;

/// 记录程序启动信息
///
/// # 参数
/// - `api_base_url`: 后端地址
/// - `poll_interval_secs`: 轮询间隔（秒）
pub fn log_startup(api_base_url: &str, poll_interval_secs: u64) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 审阅同步模式");
    info!("🌐 后端地址: {}", api_base_url);
    info!("⏱️ 轮询间隔: {} 秒", poll_interval_secs);
    info!("{}", "=".repeat(60));
}

/// 记录任务目录统计
///
/// # 参数
/// - `job_name`: 任务名称
/// - `summary`: 目录统计
pub fn log_catalog_summary(job_name: &str, summary: &CatalogSummary) {
    info!("\n{}", "─".repeat(60));
    info!("📊 任务 {} 进度: {:.1}%", job_name, summary.progress_percent());
    info!("{}", summary);
    info!("{}", "─".repeat(60));
}

/// 打印导出完成信息
///
/// # 参数
/// - `rows`: 导出行数
/// - `failed`: 拉取失败的行数
/// - `path`: 导出文件路径
pub fn log_export_complete(rows: usize, failed: usize, path: &Path) {
    info!("\n{}", "=".repeat(60));
    info!("📤 导出完成");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 行数: {}", rows);
    if failed > 0 {
        info!("⚠️ 拉取失败: {}", failed);
    }
    info!("{}", "=".repeat(60));
    info!("\n文件已保存至: {}", path.display());
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
