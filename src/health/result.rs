//! 健康检测结果数据结构
//!
//! 定义健康状态枚举、单个探针结果以及聚合报告

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// 健康状态枚举
///
/// 变体按严重程度递增声明，`Ord` 即严重程度排序：
/// `Healthy < Degraded < Unhealthy`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HealthStatus {
    /// 正常
    Healthy,
    /// 降级
    Degraded,
    /// 异常
    Unhealthy,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "Healthy"),
            HealthStatus::Degraded => write!(f, "Degraded"),
            HealthStatus::Unhealthy => write!(f, "Unhealthy"),
        }
    }
}

impl FromStr for HealthStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "healthy" => Ok(HealthStatus::Healthy),
            "degraded" => Ok(HealthStatus::Degraded),
            "unhealthy" => Ok(HealthStatus::Unhealthy),
            other => Err(format!("无效的健康状态: {other}")),
        }
    }
}

impl HealthStatus {
    /// 判断状态是否为健康
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }

    /// 判断实例是否仍可接收流量（降级也算可用）
    pub fn is_available(&self) -> bool {
        !matches!(self, HealthStatus::Unhealthy)
    }

    /// 取一组状态中最严重的一个，空集合视为健康
    pub fn worst<I>(statuses: I) -> HealthStatus
    where
        I: IntoIterator<Item = HealthStatus>,
    {
        statuses.into_iter().max().unwrap_or(HealthStatus::Healthy)
    }
}

/// 探针执行成功时返回的结论
///
/// 探针"成功返回"不代表依赖健康：数据库探针可以正常返回一个
/// Unhealthy 结论并附带错误信息。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    /// 健康状态
    pub status: HealthStatus,
    /// 描述信息
    pub description: Option<String>,
    /// 错误信息
    pub error: Option<String>,
}

impl ProbeOutcome {
    /// 健康结论
    pub fn healthy() -> Self {
        Self {
            status: HealthStatus::Healthy,
            description: None,
            error: None,
        }
    }

    /// 降级结论
    pub fn degraded(description: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Degraded,
            description: Some(description.into()),
            error: None,
        }
    }

    /// 异常结论，错误信息同时作为描述
    pub fn unhealthy(error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            status: HealthStatus::Unhealthy,
            description: Some(error.clone()),
            error: Some(error),
        }
    }

    /// 设置描述信息
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// 单个探针的执行结果
///
/// 字段只读：构造函数保证"存在错误信息则状态不为 Healthy"。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    name: String,
    status: HealthStatus,
    duration: Duration,
    description: Option<String>,
    error: Option<String>,
}

impl ProbeResult {
    /// 创建新的探针结果
    pub fn new(name: impl Into<String>, status: HealthStatus) -> Self {
        Self {
            name: name.into(),
            status,
            duration: Duration::ZERO,
            description: None,
            error: None,
        }
    }

    /// 根据探针结论创建结果
    pub fn from_outcome(name: impl Into<String>, outcome: ProbeOutcome, duration: Duration) -> Self {
        let mut result = Self::new(name, outcome.status).with_duration(duration);
        result.description = outcome.description;
        match outcome.error {
            Some(error) => result.with_error(error),
            None => result,
        }
    }

    /// 创建失败结果（探针返回错误、崩溃或超时）
    pub fn failed(name: impl Into<String>, message: impl Into<String>, duration: Duration) -> Self {
        let message = message.into();
        Self::new(name, HealthStatus::Unhealthy)
            .with_duration(duration)
            .with_description(message.clone())
            .with_error(message)
    }

    /// 设置耗时
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// 设置描述信息
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// 设置错误信息
    ///
    /// 携带错误的健康结果会被降为 Unhealthy。
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        if self.status.is_healthy() {
            self.status = HealthStatus::Unhealthy;
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> HealthStatus {
        self.status
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// 获取耗时（毫秒）
    pub fn duration_ms(&self) -> u64 {
        self.duration.as_millis() as u64
    }
}

/// 一次聚合运行产生的健康报告
///
/// 每次请求重新构建，构建后不可变。条目按探针注册顺序排列，名称唯一。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthReport {
    entries: Vec<ProbeResult>,
    status: HealthStatus,
    total_duration: Duration,
}

impl HealthReport {
    /// 创建健康报告，整体状态取所有条目中最严重的状态
    pub fn new(entries: Vec<ProbeResult>, total_duration: Duration) -> Self {
        let status = HealthStatus::worst(entries.iter().map(ProbeResult::status));
        Self {
            entries,
            status,
            total_duration,
        }
    }

    /// 整体状态
    pub fn status(&self) -> HealthStatus {
        self.status
    }

    /// 总耗时
    pub fn total_duration(&self) -> Duration {
        self.total_duration
    }

    /// 所有条目
    pub fn entries(&self) -> &[ProbeResult] {
        &self.entries
    }

    /// 按名称查找条目
    pub fn entry(&self, name: &str) -> Option<&ProbeResult> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    /// 所有条目名称
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(ProbeResult::name).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
