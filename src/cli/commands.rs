//! 命令处理逻辑
//!
//! 实现各种CLI命令的处理逻辑

use crate::app::AppContext;
use crate::cli::args::{Args, Commands, OutputFormat};
use crate::config::{default_config_template, ConfigLoader, TomlConfigLoader};
use crate::error::Result;
use crate::functions::FunctionHost;
use crate::health::{report_response, HealthReport, TagFilter};
use crate::web::WebServer;
use async_trait::async_trait;
use std::path::Path;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info};

/// 命令处理器trait
#[async_trait]
pub trait Command: Send + Sync {
    /// 执行命令
    async fn execute(&self, args: &Args) -> Result<()>;
}

/// 按子命令分发
pub async fn execute(args: &Args) -> Result<()> {
    match &args.command {
        Commands::Serve { .. } => ServeCommand.execute(args).await,
        Commands::Functions { .. } => FunctionsCommand.execute(args).await,
        Commands::Check { .. } => CheckCommand.execute(args).await,
        Commands::Init { .. } => InitCommand.execute(args).await,
        Commands::Validate { .. } => ValidateCommand.execute(args).await,
        Commands::Version { .. } => VersionCommand.execute(args).await,
    }
}

/// 创建关闭信号通道，收到 Ctrl+C 时广播
fn shutdown_on_ctrl_c() -> broadcast::Receiver<()> {
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                info!("收到中断信号，正在停止服务...");
                let _ = shutdown_tx.send(());
            }
            Err(err) => {
                error!("监听中断信号失败: {}", err);
            }
        }
    });

    shutdown_rx
}

/// HTTP 服务命令
pub struct ServeCommand;

#[async_trait]
impl Command for ServeCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        let Commands::Serve { port } = &args.command else {
            return Ok(());
        };

        let context = AppContext::load(&args.get_config_path()).await?;
        let mut config = context.config.server.clone();
        if let Some(port) = port {
            config.port = *port;
        }

        let mut server = WebServer::new(config, context.aggregator.clone(), shutdown_on_ctrl_c());
        server.start().await
    }
}

/// 函数宿主命令
pub struct FunctionsCommand;

#[async_trait]
impl Command for FunctionsCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        let Commands::Functions { port } = &args.command else {
            return Ok(());
        };

        let context = AppContext::load(&args.get_config_path()).await?;
        let mut config = context.config.functions.clone();
        if let Some(port) = port {
            config.port = *port;
        }

        let mut host = FunctionHost::new(config, context.aggregator.clone(), shutdown_on_ctrl_c());
        host.start().await
    }
}

/// 检测命令
pub struct CheckCommand;

#[async_trait]
impl Command for CheckCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        let Commands::Check { format, tags } = &args.command else {
            return Ok(());
        };

        let context = AppContext::load(&args.get_config_path()).await?;
        let filter = (!tags.is_empty()).then(|| TagFilter::any_of(tags.iter().cloned()));
        let report = context.aggregator.run(filter.as_ref()).await;

        match format {
            OutputFormat::Json => {
                let (_, body) = report_response(&report);
                println!("{}", serde_json::to_string_pretty(&body)?);
            }
            OutputFormat::Text => print_text_report(&report),
        }

        if report.status().is_available() {
            Ok(())
        } else {
            Err(anyhow::anyhow!("健康检测未通过: {}", report.status()).into())
        }
    }
}

/// 打印文本格式结果
fn print_text_report(report: &HealthReport) {
    println!(
        "整体状态: {} ({}ms)",
        report.status(),
        report.total_duration().as_millis()
    );

    for entry in report.entries() {
        let status_icon = if entry.status().is_healthy() { "✓" } else { "✗" };
        println!(
            "{} {} - {} - {}ms",
            status_icon,
            entry.name(),
            entry.status(),
            entry.duration_ms()
        );

        if let Some(error) = entry.error() {
            println!("  错误: {error}");
        } else if let Some(description) = entry.description() {
            println!("  描述: {description}");
        }
    }
}

/// 初始化命令
pub struct InitCommand;

#[async_trait]
impl Command for InitCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Init { config_path, force } = &args.command {
            self.create_config_file(config_path, *force).await
        } else {
            Ok(())
        }
    }
}

impl InitCommand {
    /// 创建配置文件
    async fn create_config_file(&self, config_path: &Path, force: bool) -> Result<()> {
        if config_path.exists() && !force {
            eprintln!("配置文件已存在: {}", config_path.display());
            eprintln!("使用 --force 参数覆盖现有文件");
            return Ok(());
        }

        if let Some(parent) = config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(config_path, default_config_template()).await?;

        println!("配置文件已创建: {}", config_path.display());
        Ok(())
    }
}

/// 验证命令
pub struct ValidateCommand;

#[async_trait]
impl Command for ValidateCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Validate {
            config_path,
            verbose,
        } = &args.command
        {
            let config_file = config_path
                .clone()
                .unwrap_or_else(|| args.get_config_path());

            self.validate_config_file(&config_file, *verbose).await
        } else {
            Ok(())
        }
    }
}

impl ValidateCommand {
    /// 验证配置文件
    async fn validate_config_file(&self, config_path: &Path, verbose: bool) -> Result<()> {
        println!("验证配置文件: {}", config_path.display());

        let loader = TomlConfigLoader::new(true);
        let config = loader.load_from_file(config_path).await?;

        if verbose {
            println!("配置验证通过！");
            println!(
                "HTTP服务: {} ({}:{})",
                if config.server.enabled { "启用" } else { "禁用" },
                config.server.bind_address,
                config.server.port
            );
            println!(
                "函数宿主: {}:{}",
                config.functions.bind_address, config.functions.port
            );
            println!("数据库: {}", config.database.connection_string);
            println!("探针超时: {}秒", config.health.probe_timeout_seconds);
            println!("日志级别: {}", config.logging.level);

            for (i, probe) in config.health.http_probes.iter().enumerate() {
                println!("  {}. {} ({} {})", i + 1, probe.name, probe.method, probe.url);
                println!("     期望状态码: {:?}", probe.expected_status_codes);
            }
        } else {
            println!("✓ 配置文件验证通过");
            println!("✓ 找到 {} 个HTTP探针配置", config.health.http_probes.len());
        }

        Ok(())
    }
}

/// 版本命令
pub struct VersionCommand;

#[async_trait]
impl Command for VersionCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Version { format } = &args.command {
            match format {
                OutputFormat::Json => {
                    let version_info = serde_json::json!({
                        "name": crate::APP_NAME,
                        "version": crate::VERSION,
                        "description": crate::APP_DESCRIPTION
                    });
                    println!("{}", serde_json::to_string_pretty(&version_info)?);
                }
                OutputFormat::Text => {
                    println!("{} v{}", crate::APP_NAME, crate::VERSION);
                    println!("{}", crate::APP_DESCRIPTION);
                }
            }
        }
        Ok(())
    }
}
