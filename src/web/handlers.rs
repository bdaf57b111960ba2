//! Web 路由处理函数
//!
//! 处理函数只负责调用聚合器，状态码一律由映射层决定

use super::AppState;
use crate::health::{live_response, ready_response, report_response};
use axum::{extract::State, response::IntoResponse, Json};

/// 完整健康报告
pub async fn health_report(State(state): State<AppState>) -> impl IntoResponse {
    let report = state.aggregator.run_all().await;
    let (status_code, body) = report_response(&report);
    (status_code, Json(body))
}

/// 存活检测，不执行任何探针
pub async fn health_live() -> impl IntoResponse {
    let (status_code, body) = live_response();
    (status_code, Json(body))
}

/// 就绪检测
pub async fn health_ready(State(state): State<AppState>) -> impl IntoResponse {
    let report = state.aggregator.run_all().await;
    let (status_code, body) = ready_response(report.status());
    (status_code, Json(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProbeError;
    use crate::health::{probe_fn, HealthAggregator, HealthRegistry, ProbeOutcome};
    use axum::http::StatusCode;
    use std::sync::Arc;

    fn state(registry: HealthRegistry) -> AppState {
        AppState::new(Arc::new(HealthAggregator::new(Arc::new(registry))))
    }

    fn healthy_state() -> AppState {
        state(
            HealthRegistry::builder()
                .register("self", probe_fn(|| async { Ok(ProbeOutcome::healthy()) }), ["self"])
                .build()
                .unwrap(),
        )
    }

    fn failing_state() -> AppState {
        state(
            HealthRegistry::builder()
                .register(
                    "database",
                    probe_fn(|| async {
                        Err(ProbeError::Unreachable("connection refused".to_string()))
                    }),
                    ["database"],
                )
                .build()
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_health_report_handler() {
        let response = health_report(State(healthy_state())).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let response = health_report(State(failing_state())).await.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_health_ready_handler() {
        let response = health_ready(State(healthy_state())).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let response = health_ready(State(failing_state())).await.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_health_live_handler() {
        let response = health_live().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "application/json"
        );
    }
}
