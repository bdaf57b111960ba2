//! HTTP 适配器
//!
//! 以 axum 暴露健康检测的完整报告、存活与就绪三个端点

use crate::health::HealthAggregator;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod handlers;
pub mod respond;
pub mod server;

pub use server::WebServer;

/// 路由共享状态
#[derive(Debug, Clone)]
pub struct AppState {
    /// 健康检测聚合器
    pub aggregator: Arc<HealthAggregator>,
}

impl AppState {
    pub fn new(aggregator: Arc<HealthAggregator>) -> Self {
        Self { aggregator }
    }
}

/// 创建路由
///
/// 同时挂载 `/health*` 与 `/api/health*` 两组路径。
pub fn create_router(state: AppState, cors_enabled: bool) -> Router {
    let mut router = Router::new();
    for prefix in ["/health", "/api/health"] {
        router = router
            .route(prefix, get(handlers::health_report))
            .route(&format!("{prefix}/live"), get(handlers::health_live))
            .route(&format!("{prefix}/ready"), get(handlers::health_ready));
    }

    let router = router
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if cors_enabled {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}
