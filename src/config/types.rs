//! 配置数据结构定义
//!
//! 定义应用程序的配置结构体和验证逻辑

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// 函数宿主传入的监听端口环境变量
pub const FUNCTIONS_PORT_ENV: &str = "FUNCTIONS_CUSTOMHANDLER_PORT";

/// 主配置结构
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// HTTP 服务配置
    #[serde(default)]
    pub server: ServerConfig,
    /// 函数宿主配置
    #[serde(default)]
    pub functions: FunctionsConfig,
    /// 数据库配置
    #[serde(default)]
    pub database: DatabaseConfig,
    /// 健康检测配置
    #[serde(default)]
    pub health: HealthConfig,
    /// 日志配置
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP 服务配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    /// 是否启用
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// 绑定地址
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// 监听端口
    #[serde(default = "default_server_port")]
    pub port: u16,
    /// 是否启用 CORS
    #[serde(default)]
    pub cors_enabled: bool,
}

/// 函数宿主配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionsConfig {
    /// 绑定地址
    #[serde(default = "default_functions_bind_address")]
    pub bind_address: String,
    /// 监听端口，可被 `FUNCTIONS_CUSTOMHANDLER_PORT` 覆盖
    #[serde(default = "default_functions_port")]
    pub port: u16,
}

/// 数据库配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatabaseConfig {
    /// 连接字符串
    #[serde(default = "default_connection_string")]
    pub connection_string: String,
    /// 启动时是否自动创建数据库
    #[serde(default = "default_enabled")]
    pub ensure_created: bool,
}

/// 健康检测配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthConfig {
    /// 单个探针超时时间（秒）
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_seconds: u64,
    /// 额外的 HTTP 依赖探针
    #[serde(default)]
    pub http_probes: Vec<HttpProbeConfig>,
}

/// HTTP 依赖探针配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HttpProbeConfig {
    /// 探针名称
    pub name: String,
    /// 目标URL
    pub url: String,
    /// HTTP方法
    #[serde(default = "default_method")]
    pub method: String,
    /// 期望的状态码列表
    #[serde(default = "default_expected_status_codes")]
    pub expected_status_codes: Vec<u16>,
    /// 标签
    #[serde(default)]
    pub tags: Vec<String>,
    /// 描述
    pub description: Option<String>,
    /// 请求头
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,
    /// 是否使用JSON格式
    #[serde(default)]
    pub json_format: bool,
    /// 日志文件路径
    pub file_path: Option<PathBuf>,
    /// 按模块覆盖日志级别，如 `"api_template::health" = "debug"`
    #[serde(default)]
    pub module_levels: HashMap<String, String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            bind_address: default_bind_address(),
            port: default_server_port(),
            cors_enabled: false,
        }
    }
}

impl ServerConfig {
    /// 解析监听地址
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        parse_socket_addr(&self.bind_address, self.port)
    }
}

impl Default for FunctionsConfig {
    fn default() -> Self {
        Self {
            bind_address: default_functions_bind_address(),
            port: default_functions_port(),
        }
    }
}

impl FunctionsConfig {
    /// 解析监听地址
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        parse_socket_addr(&self.bind_address, self.port)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            connection_string: default_connection_string(),
            ensure_created: default_enabled(),
        }
    }
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            probe_timeout_seconds: default_probe_timeout(),
            http_probes: Vec::new(),
        }
    }
}

impl HealthConfig {
    /// 单个探针超时时间
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_seconds)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
            file_path: None,
            module_levels: HashMap::new(),
        }
    }
}

impl Config {
    /// 应用环境变量覆盖
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(port) = std::env::var(FUNCTIONS_PORT_ENV) {
            self.functions.port = port.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!("{FUNCTIONS_PORT_ENV} 不是有效端口: {port}"))
            })?;
        }
        Ok(())
    }
}

fn parse_socket_addr(bind_address: &str, port: u16) -> Result<SocketAddr, ConfigError> {
    format!("{bind_address}:{port}")
        .parse()
        .map_err(|e| ConfigError::ValidationError(format!("无效的监听地址 {bind_address}:{port}: {e}")))
}

// 默认值函数
fn default_enabled() -> bool {
    true
}
fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}
fn default_server_port() -> u16 {
    8080
}
fn default_functions_bind_address() -> String {
    "127.0.0.1".to_string()
}
fn default_functions_port() -> u16 {
    7071
}
fn default_connection_string() -> String {
    "Data Source=template.db".to_string()
}
fn default_probe_timeout() -> u64 {
    10
}
fn default_method() -> String {
    "GET".to_string()
}
fn default_expected_status_codes() -> Vec<u16> {
    vec![200]
}
fn default_log_level() -> String {
    "info".to_string()
}

/// 内置探针名称，HTTP 探针不能占用
const RESERVED_PROBE_NAMES: [&str; 2] = ["self", "database"];

/// 配置验证函数
///
/// # 参数
/// * `config` - 要验证的配置
///
/// # 返回
/// * `Result<(), String>` - 验证结果，错误时返回错误信息
pub fn validate_config(config: &Config) -> Result<(), String> {
    if config.server.enabled {
        if config.server.port == 0 {
            return Err("HTTP服务端口不能为0".to_string());
        }
        if config.server.bind_address.trim().is_empty() {
            return Err("HTTP服务绑定地址不能为空".to_string());
        }
    }

    if config.functions.bind_address.trim().is_empty() {
        return Err("函数宿主绑定地址不能为空".to_string());
    }

    if config.database.connection_string.trim().is_empty() {
        return Err("数据库连接字符串不能为空".to_string());
    }

    if config.health.probe_timeout_seconds == 0 {
        return Err("探针超时时间不能为0".to_string());
    }

    // 验证日志级别
    let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_log_levels.contains(&config.logging.level.as_str()) {
        return Err(format!(
            "无效的日志级别: {}，支持的级别: {:?}",
            config.logging.level, valid_log_levels
        ));
    }
    for (module, level) in &config.logging.module_levels {
        if module.trim().is_empty() {
            return Err("模块日志级别的模块名不能为空".to_string());
        }
        if !valid_log_levels.contains(&level.as_str()) {
            return Err(format!("模块 {module} 的日志级别无效: {level}"));
        }
    }

    let mut names = HashSet::new();
    for probe in &config.health.http_probes {
        if probe.name.trim().is_empty() {
            return Err("探针名称不能为空".to_string());
        }

        if RESERVED_PROBE_NAMES.contains(&probe.name.as_str()) {
            return Err(format!("探针名称 {} 为内置探针保留", probe.name));
        }

        if !names.insert(probe.name.as_str()) {
            return Err(format!("探针名称 {} 重复", probe.name));
        }

        // 验证URL格式
        if !probe.url.starts_with("http://") && !probe.url.starts_with("https://") {
            return Err(format!("探针 {} 的URL格式无效", probe.name));
        }

        // 验证状态码
        if probe.expected_status_codes.is_empty() {
            return Err(format!("探针 {} 必须指定期望的状态码", probe.name));
        }

        for &code in &probe.expected_status_codes {
            if !(100..=599).contains(&code) {
                return Err(format!("探针 {} 的状态码 {} 无效", probe.name, code));
            }
        }

        // 验证HTTP方法
        let valid_methods = ["GET", "POST", "PUT", "DELETE", "HEAD", "OPTIONS", "PATCH"];
        if !valid_methods.contains(&probe.method.as_str()) {
            return Err(format!(
                "探针 {} 的HTTP方法 {} 无效，支持的方法: {:?}",
                probe.name, probe.method, valid_methods
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_probe() -> HttpProbeConfig {
        HttpProbeConfig {
            name: "upstream".to_string(),
            url: "https://example.com/health".to_string(),
            method: "GET".to_string(),
            expected_status_codes: vec![200],
            tags: vec!["http".to_string()],
            description: Some("Upstream API".to_string()),
            headers: HashMap::new(),
        }
    }

    fn create_test_config() -> Config {
        let mut config = Config::default();
        config.health.http_probes.push(create_test_probe());
        config
    }

    #[test]
    fn test_config_serialization() {
        let config = create_test_config();

        // 测试序列化
        let serialized = toml::to_string(&config).expect("序列化失败");
        assert!(!serialized.is_empty());

        // 测试反序列化
        let deserialized: Config = toml::from_str(&serialized).expect("反序列化失败");
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_default_values() {
        let config: Config = toml::from_str("").unwrap();

        assert!(config.server.enabled);
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.bind_address, "0.0.0.0");
        assert_eq!(config.functions.port, 7071);
        assert_eq!(config.database.connection_string, "Data Source=template.db");
        assert!(config.database.ensure_created);
        assert_eq!(config.health.probe_timeout(), Duration::from_secs(10));
        assert!(config.health.http_probes.is_empty());
        assert_eq!(config.logging.level, "info");
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_http_probe_defaults() {
        let config: Config = toml::from_str(
            r#"
[[health.http_probes]]
name = "upstream"
url = "http://localhost:9000/health"
"#,
        )
        .unwrap();

        let probe = &config.health.http_probes[0];
        assert_eq!(probe.method, "GET");
        assert_eq!(probe.expected_status_codes, vec![200]);
        assert!(probe.tags.is_empty());
    }

    #[test]
    fn test_config_validation() {
        assert!(validate_config(&create_test_config()).is_ok());
    }

    #[test]
    fn test_config_validation_invalid_port() {
        let mut config = create_test_config();
        config.server.port = 0;

        let result = validate_config(&config);
        assert!(result.unwrap_err().contains("端口不能为0"));

        // 禁用 HTTP 服务时不检查端口
        config.server.enabled = false;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_config_validation_zero_timeout() {
        let mut config = create_test_config();
        config.health.probe_timeout_seconds = 0;
        assert!(validate_config(&config).unwrap_err().contains("超时"));
    }

    #[test]
    fn test_config_validation_invalid_log_level() {
        let mut config = create_test_config();
        config.logging.level = "verbose".to_string();
        assert!(validate_config(&config).unwrap_err().contains("日志级别"));
    }

    #[test]
    fn test_config_validation_module_levels() {
        let mut config = create_test_config();
        config
            .logging
            .module_levels
            .insert("api_template::health".to_string(), "debug".to_string());
        assert!(validate_config(&config).is_ok());

        config
            .logging
            .module_levels
            .insert("tower_http".to_string(), "loud".to_string());
        assert!(validate_config(&config).unwrap_err().contains("tower_http"));
    }

    #[test]
    fn test_config_validation_invalid_url() {
        let mut config = create_test_config();
        config.health.http_probes[0].url = "invalid-url".to_string();
        assert!(validate_config(&config).unwrap_err().contains("URL格式无效"));
    }

    #[test]
    fn test_config_validation_invalid_status_code() {
        let mut config = create_test_config();
        config.health.http_probes[0].expected_status_codes = vec![999];
        assert!(validate_config(&config).unwrap_err().contains("状态码"));
    }

    #[test]
    fn test_config_validation_invalid_method() {
        let mut config = create_test_config();
        config.health.http_probes[0].method = "INVALID".to_string();
        assert!(validate_config(&config).unwrap_err().contains("HTTP方法"));
    }

    #[test]
    fn test_config_validation_reserved_and_duplicate_names() {
        let mut config = create_test_config();
        config.health.http_probes[0].name = "database".to_string();
        assert!(validate_config(&config).unwrap_err().contains("保留"));

        let mut config = create_test_config();
        config.health.http_probes.push(create_test_probe());
        assert!(validate_config(&config).unwrap_err().contains("重复"));
    }

    #[test]
    fn test_socket_addr() {
        let server = ServerConfig {
            bind_address: "127.0.0.1".to_string(),
            port: 3000,
            ..Default::default()
        };
        assert_eq!(server.socket_addr().unwrap().to_string(), "127.0.0.1:3000");

        let bad = ServerConfig {
            bind_address: "not an address".to_string(),
            ..Default::default()
        };
        assert!(bad.socket_addr().is_err());
    }
}
