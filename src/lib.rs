//! API Template - Web/无服务器 API 模板
//!
//! 提供：
//! - 健康检测聚合与状态码映射
//! - HTTP 与函数宿主两种适配器
//! - 实体基础字段、通用仓储与命令/查询分发
//! - 结构化日志与 TOML 配置

pub mod app;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod functions;
pub mod health;
pub mod logging;
pub mod web;

// 重新导出主要类型
pub use app::AppContext;
pub use config::Config;
pub use error::AppError;
pub use health::{HealthAggregator, HealthReport, HealthStatus};

/// 应用程序版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 应用程序名称
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

/// 应用程序描述
pub const APP_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
