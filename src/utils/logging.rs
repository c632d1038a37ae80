//! 日志工具模块
//!
//! 负责初始化 tracing，并提供运行过程中的日志格式化辅助函数

use std::fs::OpenOptions;
use std::io::Write;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::Config;
use crate::models::run_result::RunResult;

/// 初始化日志：同时输出到终端和日志文件
///
/// `RUST_LOG` 优先；未设置时按 `verbose_logging` 选择 info 或 debug。
pub fn init(config: &Config) -> Result<()> {
    let default_level = if config.verbose_logging { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("info,student_form_submit={}", default_level))
    });

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.output_log_file)
        .with_context(|| format!("无法打开日志文件: {}", config.output_log_file))?;
    file.write_all(log_header().as_bytes())?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(Mutex::new(file)),
        )
        .try_init()
        .context("日志系统初始化失败")?;

    Ok(())
}

fn log_header() -> String {
    format!(
        "{}\n学员信息录入日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    )
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 学员信息录入（人工确认模式）");
    info!("🌐 目标站点: {}", config.login_url);
    info!("{}", "=".repeat(60));
}

/// 记录批次加载信息
///
/// # 参数
/// - `total`: 记录总数
/// - `source`: 数据源描述
pub fn log_batch_loaded(total: usize, source: &str) {
    info!("✓ 从 {} 读取到 {} 位学员", source, total);
    info!("💡 每位学员填写完成后需要人工上传照片并提交\n");
}

/// 记录开始处理一位学员
pub fn log_record_start(index: usize, total: usize, identifier: &str) {
    info!("\n{}", "─".repeat(60));
    info!("[学员 {}/{}] 开始处理: {}", index, total, identifier);
}

/// 打印最终统计信息
///
/// # 参数
/// - `result`: 运行结果
/// - `log_file_path`: 日志文件路径
pub fn print_final_stats(result: &RunResult, log_file_path: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", result.success(), result.total());
    info!("❌ 未完成: {}", result.failed());
    for report in result.outcomes() {
        info!(
            "   第 {} 行 {}: {}",
            report.row, report.identifier, report.outcome
        );
    }
    if let Some(reason) = result.abort_reason() {
        info!("⛔ 运行提前结束: {}", reason);
    }
    info!("{}", "=".repeat(60));
    info!("\n日志已保存至: {}", log_file_path);
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_text_counts_chars() {
        assert_eq!(truncate_text("short", 10), "short");
        assert_eq!(truncate_text("আমার সোনার বাংলা", 4), "আমার...");
    }
}
