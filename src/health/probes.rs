//! 内置健康探针
//!
//! `self` 探针、SQLite `database` 探针，以及按配置注册的 HTTP 依赖探针

use crate::config::{HealthConfig, HttpProbeConfig};
use crate::domain::SqliteStore;
use crate::error::{ConfigError, ProbeError};
use crate::health::probe::{HealthProbe, HealthRegistry};
use crate::health::result::ProbeOutcome;
use async_trait::async_trait;
use reqwest::{Client, Method};
use std::error::Error as _;
use std::str::FromStr;
use std::time::Duration;

/// 进程自检探针，能响应即为健康
#[derive(Debug, Clone, Copy, Default)]
pub struct SelfProbe;

#[async_trait]
impl HealthProbe for SelfProbe {
    async fn check(&self) -> Result<ProbeOutcome, ProbeError> {
        Ok(ProbeOutcome::healthy())
    }
}

/// 数据库探针
///
/// 打开配置的 SQLite 数据库并执行 `SELECT 1`，连接在本次检测结束前释放。
#[derive(Debug, Clone)]
pub struct DatabaseProbe {
    store: SqliteStore,
}

impl DatabaseProbe {
    pub fn new(store: SqliteStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl HealthProbe for DatabaseProbe {
    async fn check(&self) -> Result<ProbeOutcome, ProbeError> {
        self.store.ping().await?;
        Ok(ProbeOutcome::healthy())
    }
}

/// HTTP 依赖探针
///
/// 请求目标URL，状态码在期望列表内即为健康。
#[derive(Debug, Clone)]
pub struct HttpProbe {
    /// HTTP客户端
    client: Client,
    /// 探针配置
    config: HttpProbeConfig,
    /// HTTP方法
    method: Method,
}

impl HttpProbe {
    /// 创建新的HTTP探针
    ///
    /// # 参数
    /// * `config` - 探针配置
    /// * `timeout` - 请求超时时间
    ///
    /// # 返回
    /// * `Result<Self, ConfigError>` - 探针实例
    pub fn new(config: HttpProbeConfig, timeout: Duration) -> Result<Self, ConfigError> {
        let method = Method::from_str(&config.method.to_uppercase()).map_err(|_| {
            ConfigError::ValidationError(format!("无效的HTTP方法: {}", config.method))
        })?;

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(format!("{}/{}", crate::APP_NAME, crate::VERSION))
            .build()
            .map_err(|e| ConfigError::ValidationError(format!("创建HTTP客户端失败: {e}")))?;

        Ok(Self {
            client,
            config,
            method,
        })
    }

    /// 描述请求失败原因
    ///
    /// 前缀标明失败阶段，其后保留 reqwest 及其底层错误链的原文。
    fn describe_request_error(error: &reqwest::Error) -> String {
        let stage = if error.is_timeout() {
            "request timed out"
        } else if error.is_connect() {
            "connection failed"
        } else if error.is_builder() || error.is_request() {
            "request could not be sent"
        } else if error.is_body() || error.is_decode() {
            "response could not be read"
        } else {
            "request failed"
        };

        let mut message = format!("{stage}: {error}");
        let mut source = error.source();
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        message
    }
}

#[async_trait]
impl HealthProbe for HttpProbe {
    async fn check(&self) -> Result<ProbeOutcome, ProbeError> {
        let mut request = self.client.request(self.method.clone(), &self.config.url);
        for (key, value) in &self.config.headers {
            request = request.header(key, value);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ProbeError::Unreachable(Self::describe_request_error(&e)))?;

        let status_code = response.status().as_u16();
        if !self.config.expected_status_codes.contains(&status_code) {
            return Err(ProbeError::StatusCodeMismatch {
                expected: self.config.expected_status_codes.clone(),
                actual: status_code,
            });
        }

        let outcome = ProbeOutcome::healthy();
        Ok(match &self.config.description {
            Some(description) => outcome.with_description(description.clone()),
            None => outcome,
        })
    }
}

/// 按配置构建探针注册表
///
/// 固定注册 `database`（标签 `database`）与 `self`（标签 `self`），
/// 随后依次注册配置的 HTTP 探针。
pub fn build_registry(
    health: &HealthConfig,
    store: SqliteStore,
) -> Result<HealthRegistry, ConfigError> {
    let mut builder = HealthRegistry::builder()
        .register("database", DatabaseProbe::new(store), ["database"])
        .register("self", SelfProbe, ["self"]);

    for probe in &health.http_probes {
        let tags = probe.tags.clone();
        builder = builder.register(
            probe.name.clone(),
            HttpProbe::new(probe.clone(), health.probe_timeout())?,
            tags,
        );
    }

    builder.build()
}
