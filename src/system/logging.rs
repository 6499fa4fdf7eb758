//! 日志初始化
//!
//! 重定向热路径上每个请求都可能产生 trace/debug 行，吞吐高时
//! 日志必须走非阻塞 writer；文件输出默认按天轮转并限制份数，
//! 生产部署建议 `format = "json"` 以便下游采集。
//! 过滤级别：RUST_LOG 优先，未设置时用 `[logging].level`。

use std::io::Write;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;

use crate::config::{AppConfig, LoggingConfig};

/// Result of logging initialization
pub struct LoggingInitResult {
    /// Worker guard that must be kept alive for the duration of the program
    pub guard: WorkerGuard,
    /// Warning if the configured target was unusable and stdout was used instead
    pub warning: Option<String>,
}

/// 选择日志输出目标
///
/// 配置的文件目标不可用时（权限、磁盘）回落到 stdout 并带回警告：
/// 日志系统自身的故障不应阻止数据面启动。
fn make_writer(config: &LoggingConfig) -> (Box<dyn Write + Send + Sync>, Option<String>) {
    let Some(log_file) = config.file.as_deref().filter(|p| !p.is_empty()) else {
        return (Box::new(std::io::stdout()), None);
    };

    if config.enable_rotation {
        let path = std::path::Path::new(log_file);
        let dir = path.parent().unwrap_or(std::path::Path::new("."));
        let prefix = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("shortspan.log")
            .trim_end_matches(".log");

        // 按天轮转：保留窗口与原始点击日志一样以天为粒度管理
        match rolling::Builder::new()
            .rotation(rolling::Rotation::DAILY)
            .filename_prefix(prefix)
            .filename_suffix("log")
            .max_log_files(config.max_backups as usize)
            .build(dir)
        {
            Ok(appender) => (Box::new(appender), None),
            Err(e) => (
                Box::new(std::io::stdout()),
                Some(format!(
                    "Failed to create rolling log appender for '{}': {}. Falling back to stdout.",
                    log_file, e
                )),
            ),
        }
    } else {
        match std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_file)
        {
            Ok(file) => (Box::new(file), None),
            Err(e) => (
                Box::new(std::io::stdout()),
                Some(format!(
                    "Failed to open log file '{}': {}. Falling back to stdout.",
                    log_file, e
                )),
            ),
        }
    }
}

/// 初始化 tracing（进程启动时调用一次，配置加载之后）
pub fn init_logging(config: &AppConfig) -> LoggingInitResult {
    let (writer, warning) = make_writer(&config.logging);
    let (non_blocking_writer, guard) = tracing_appender::non_blocking(writer);

    // RUST_LOG 优先于配置文件，便于线上临时调级
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.logging.level.clone()));

    let log_to_stdout = config
        .logging
        .file
        .as_deref()
        .is_none_or(|f| f.is_empty());

    let builder = tracing_subscriber::fmt()
        .with_writer(non_blocking_writer)
        .with_env_filter(filter)
        .with_target(true)
        // 文件输出不要 ANSI 转义
        .with_ansi(log_to_stdout);

    if config.logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }

    LoggingInitResult { guard, warning }
}
