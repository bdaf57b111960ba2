//! API Template 主程序入口

use anyhow::{Context, Result};
use api_template::cli::{self, Args};
use api_template::config::{Config, TomlConfigLoader};
use api_template::logging::{LogConfig, LoggingSystem};
use clap::Parser;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_config = log_config_for(&args).await;
    let _logging_system = LoggingSystem::setup_logging(log_config).context("初始化日志系统失败")?;

    info!("{} v{} 启动", api_template::APP_NAME, api_template::VERSION);

    if let Err(e) = cli::execute(&args).await {
        error!("命令执行失败: {}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// 根据配置文件与命令行参数确定日志配置
///
/// 配置文件无法加载时使用默认日志配置，错误由命令本身报告。
async fn log_config_for(args: &Args) -> LogConfig {
    let config = TomlConfigLoader::default()
        .load_or_default(args.get_config_path())
        .await
        .unwrap_or_else(|_| Config::default());

    let log_config = LogConfig::from_config(&config.logging);
    match args.log_level {
        Some(level) => log_config.with_level(level.into()),
        None => log_config,
    }
}
