//! 命令行参数
//!
//! 每个子命令都是非交互的：参数进，日志和结果出。

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use review_sync::models::WorkStatus;

/// review-sync：跟踪处理任务、审阅并修改结果、导出表格
#[derive(Debug, Parser)]
#[command(name = "review-sync", version)]
pub struct Cli {
    /// TOML 配置文件（环境变量会覆盖其中的值）
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// 显示详细日志
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// 持续轮询任务进度，直到 Ctrl-C 或凭证失效
    Watch {
        /// 任务名称
        #[arg(long)]
        job: String,
    },

    /// 显示一个工作项的元数据、图片地址和偏差
    ///
    /// 不指定 `--work` 时显示目录中的第一项。
    Show {
        #[arg(long)]
        job: String,

        #[arg(long)]
        work: Option<String>,
    },

    /// 修改一个字段并提交
    Edit {
        #[arg(long)]
        job: String,

        #[arg(long)]
        work: String,

        /// 字段名
        #[arg(long)]
        field: String,

        /// 新值；列表字段用逗号分隔
        #[arg(long)]
        value: Option<String>,

        /// 新的说明（只适用于 `{value, explanation}` 字段）
        #[arg(long)]
        explanation: Option<String>,
    },

    /// 修改工作项状态（例如 REVIEWED）
    Mark {
        #[arg(long)]
        job: String,

        #[arg(long)]
        work: String,

        /// 目标状态，如 "REVIEWED" 或 READY_FOR_REVIEW
        #[arg(long)]
        status: WorkStatus,
    },

    /// 导出任务的全部结果为 CSV
    Export {
        #[arg(long)]
        job: String,

        /// 只导出这个工作项（已加载的详情）
        #[arg(long)]
        work: Option<String>,

        /// 输出目录（默认使用配置中的 export_dir）
        #[arg(long)]
        out: Option<PathBuf>,
    },
}
