//! Web服务器实现
//!
//! 提供HTTP服务器启动与优雅关闭

use super::{create_router, AppState};
use crate::config::ServerConfig;
use crate::error::Result;
use crate::health::HealthAggregator;
use axum::Router;
use log::info;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

/// Web服务器
pub struct WebServer {
    /// 配置
    config: ServerConfig,
    /// 路由状态
    state: AppState,
    /// 关闭信号接收器
    shutdown_rx: Option<broadcast::Receiver<()>>,
}

impl WebServer {
    /// 创建新的Web服务器
    pub fn new(
        config: ServerConfig,
        aggregator: Arc<HealthAggregator>,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            config,
            state: AppState::new(aggregator),
            shutdown_rx: Some(shutdown_rx),
        }
    }

    /// 启动Web服务器，直到收到关闭信号
    pub async fn start(&mut self) -> Result<()> {
        if !self.config.enabled {
            info!("Web服务器已禁用");
            return Ok(());
        }

        let addr = self.config.socket_addr()?;
        let listener = TcpListener::bind(addr).await?;
        self.serve(listener).await
    }

    /// 在已绑定的监听器上提供服务
    pub async fn serve(&mut self, listener: TcpListener) -> Result<()> {
        let shutdown_rx = self
            .shutdown_rx
            .take()
            .ok_or_else(|| anyhow::anyhow!("关闭信号接收器已被使用"))?;

        let router = create_router(self.state.clone(), self.config.cors_enabled);
        serve_until_shutdown("Web服务器", listener, router, shutdown_rx).await
    }
}

/// 运行路由直到收到关闭信号
///
/// HTTP 服务与函数宿主共用。
pub async fn serve_until_shutdown(
    name: &'static str,
    listener: TcpListener,
    router: Router,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<()> {
    let addr = listener.local_addr()?;
    info!("{}已启动: http://{}", name, addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
            info!("接收到关闭信号，正在关闭{}...", name);
        })
        .await?;

    info!("{}已关闭", name);
    Ok(())
}
