//! 配置管理模块
//!
//! 提供配置文件解析、环境变量替换与验证功能

pub mod loader;
pub mod types;

// 重新导出主要类型
pub use loader::{default_config_template, get_default_config_path, ConfigLoader, TomlConfigLoader};
pub use types::{
    validate_config, Config, DatabaseConfig, FunctionsConfig, HealthConfig, HttpProbeConfig,
    LoggingConfig, ServerConfig, FUNCTIONS_PORT_ENV,
};
