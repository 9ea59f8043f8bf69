mod app;
mod cli;

use anyhow::{Context, Result};
use app::App;
use clap::Parser;
use cli::Cli;
use review_sync::config::Config;
use review_sync::logger;
use tracing::error;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 加载配置
    let config = Config::load(cli.config.as_deref()).context("加载配置失败")?;

    // 初始化日志
    logger::init(cli.verbose || config.verbose_logging);

    // 初始化并运行应用
    let app = App::initialize(config).await?;
    if let Err(e) = app.run(cli.command).await {
        if !app.is_authenticated() {
            error!("🔒 凭证已失效，请重新登录");
        }
        return Err(e);
    }

    Ok(())
}
