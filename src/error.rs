//! 错误处理模块
//!
//! 定义应用程序的统一错误类型

use thiserror::Error;

/// API Template 应用程序的主要错误类型
#[derive(Error, Debug)]
pub enum AppError {
    /// 配置相关错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    /// 健康探针相关错误
    #[error("健康探针错误: {0}")]
    Probe(#[from] ProbeError),

    /// 存储相关错误
    #[error("存储错误: {0}")]
    Storage(#[from] StorageError),

    /// 命令/查询分发错误
    #[error("分发错误: {0}")]
    Dispatch(#[from] DispatchError),

    /// IO错误
    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    /// JSON序列化/反序列化错误
    #[error("JSON错误: {0}")]
    Json(#[from] serde_json::Error),

    /// 其他错误
    #[error("其他错误: {0}")]
    Other(#[from] anyhow::Error),
}

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 配置文件解析错误
    #[error("配置文件解析失败: {0}")]
    ParseError(String),

    /// 配置验证错误
    #[error("配置验证失败: {0}")]
    ValidationError(String),

    /// 配置文件不存在
    #[error("配置文件不存在: {path}")]
    FileNotFound { path: String },

    /// 环境变量替换错误
    #[error("环境变量替换失败: {var}")]
    EnvVarError { var: String },

    /// 探针名称重复
    #[error("探针名称重复: {name}")]
    DuplicateProbe { name: String },
}

/// 健康探针错误类型
///
/// 这些错误只在探针内部产生，聚合器会把它们转换为 Unhealthy 条目，
/// 永远不会传播到适配器层。
#[derive(Error, Debug)]
pub enum ProbeError {
    /// 状态码不匹配
    #[error("unexpected status code: expected {expected:?}, got {actual}")]
    StatusCodeMismatch { expected: Vec<u16>, actual: u16 },

    /// 连接错误
    #[error("{0}")]
    Unreachable(String),

    /// 存储不可用
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// 存储错误类型
#[derive(Error, Debug)]
pub enum StorageError {
    /// SQLite 错误
    #[error("{0}")]
    Sqlite(#[from] rusqlite::Error),

    /// 实体序列化错误
    #[error("实体序列化失败: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 实体已存在
    #[error("实体已存在: {kind}/{id}")]
    Conflict { kind: &'static str, id: String },

    /// 后台任务失败
    #[error("存储任务执行失败: {0}")]
    Task(String),

    /// 连接字符串无效
    #[error("无效的连接字符串: {0}")]
    InvalidConnectionString(String),
}

/// 命令/查询分发错误类型
#[derive(Error, Debug, PartialEq, Eq)]
pub enum DispatchError {
    /// 没有注册处理器
    #[error("未注册处理器: {0}")]
    NoHandler(&'static str),

    /// 重复注册处理器
    #[error("处理器重复注册: {0}")]
    Duplicate(&'static str),

    /// 处理器执行失败
    #[error("处理器执行失败: {0}")]
    Handler(String),
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, AppError>;
