use tracing_subscriber::{fmt, EnvFilter};

/// 初始化日志
///
/// 优先使用 `RUST_LOG`，否则默认 `info`，详细模式下为 `debug`。
/// 重复调用不会报错。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
