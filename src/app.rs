//! 应用启动装配
//!
//! 根据配置创建存储、探针注册表与聚合器，供各适配器共享

use crate::config::{Config, TomlConfigLoader};
use crate::domain::SqliteStore;
use crate::error::Result;
use crate::health::{build_registry, HealthAggregator};
use log::{info, warn};
use std::path::Path;
use std::sync::Arc;

/// 应用上下文
#[derive(Debug, Clone)]
pub struct AppContext {
    /// 生效的配置
    pub config: Config,
    /// SQLite 存储
    pub store: SqliteStore,
    /// 健康检测聚合器
    pub aggregator: Arc<HealthAggregator>,
}

impl AppContext {
    /// 加载配置文件（不存在时使用默认配置）并完成装配
    pub async fn load(config_path: &Path) -> Result<Self> {
        let config = TomlConfigLoader::default()
            .load_or_default(config_path)
            .await?;
        Self::build(config).await
    }

    /// 按配置完成装配
    ///
    /// 建库失败只记录警告，由 `database` 探针如实报告数据库状态。
    pub async fn build(config: Config) -> Result<Self> {
        let store = SqliteStore::from_connection_string(&config.database.connection_string)?;

        if config.database.ensure_created {
            match store.ensure_created().await {
                Ok(()) => info!("数据库已就绪: {}", store.path().display()),
                Err(e) => warn!("创建数据库失败: {}", e),
            }
        }

        let registry = build_registry(&config.health, store.clone())?;
        info!("已注册 {} 个健康探针", registry.len());

        let aggregator =
            HealthAggregator::new(Arc::new(registry)).with_probe_timeout(config.health.probe_timeout());

        Ok(Self {
            config,
            store,
            aggregator: Arc::new(aggregator),
        })
    }
}
