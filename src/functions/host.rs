//! 函数宿主适配器
//!
//! 同时支持调用协议（`POST /{FunctionName}`）与 HTTP 直接转发两种模式

use crate::config::FunctionsConfig;
use crate::error::Result;
use crate::functions::invocation::{HttpOutput, HttpRequestData, InvocationRequest, InvocationResponse};
use crate::functions::registry::{FunctionContext, FunctionDefinition, FunctionRegistry};
use crate::health::HealthAggregator;
use crate::web::respond::{error_response, handle_error};
use crate::web::server::serve_until_shutdown;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// 宿主共享状态
#[derive(Debug, Clone)]
struct HostState {
    registry: Arc<FunctionRegistry>,
    context: FunctionContext,
}

/// 函数宿主
pub struct FunctionHost {
    config: FunctionsConfig,
    state: HostState,
    shutdown_rx: Option<broadcast::Receiver<()>>,
}

impl FunctionHost {
    /// 创建注册了健康检测函数的宿主
    pub fn new(
        config: FunctionsConfig,
        aggregator: Arc<HealthAggregator>,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> Self {
        Self::with_registry(config, FunctionRegistry::health(), aggregator, shutdown_rx)
    }

    /// 使用自定义注册表创建宿主
    pub fn with_registry(
        config: FunctionsConfig,
        registry: FunctionRegistry,
        aggregator: Arc<HealthAggregator>,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            config,
            state: HostState {
                registry: Arc::new(registry),
                context: FunctionContext { aggregator },
            },
            shutdown_rx: Some(shutdown_rx),
        }
    }

    /// 宿主路由
    pub fn router(&self) -> Router {
        create_function_router(self.state.registry.clone(), self.state.context.clone())
    }

    /// 启动宿主，直到收到关闭信号
    pub async fn start(&mut self) -> Result<()> {
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

        for function in self.state.registry.functions() {
            info!(function = function.name, route = function.route, "注册函数");
        }

        serve_until_shutdown("函数宿主", listener, self.router(), shutdown_rx).await
    }
}

/// 创建函数宿主路由
pub fn create_function_router(registry: Arc<FunctionRegistry>, context: FunctionContext) -> Router {
    Router::new()
        .route("/{function}", post(invoke))
        .fallback(forward)
        .with_state(HostState { registry, context })
        .layer(TraceLayer::new_for_http())
}

/// 执行函数并记录日志
async fn execute(
    function: &FunctionDefinition,
    context: FunctionContext,
    request: HttpRequestData,
) -> HttpOutput {
    if !function.allows(&request.method) {
        return HttpOutput::error(
            StatusCode::METHOD_NOT_ALLOWED,
            format!("method {} is not bound to function {}", request.method, function.name),
        );
    }

    let output = (function.handler)(context, request).await;
    info!(
        function = function.name,
        status_code = output.status_code,
        "函数执行完成"
    );
    output
}

/// 调用协议入口
async fn invoke(
    State(state): State<HostState>,
    Path(name): Path<String>,
    body: Bytes,
) -> Response {
    let Some(function) = state.registry.get(&name) else {
        error!(function = %name, "未注册的函数");
        return error_response(StatusCode::NOT_FOUND, format!("function {name} is not registered"));
    };

    let invocation: InvocationRequest = match serde_json::from_slice(&body) {
        Ok(invocation) => invocation,
        Err(e) => return handle_error(format!("invalid invocation payload: {e}")),
    };

    let request = match invocation.http_request() {
        Some(Ok(request)) => request,
        Some(Err(e)) => return handle_error(format!("invalid http trigger data: {e}")),
        None => return handle_error("invocation payload has no http trigger data"),
    };

    let output = execute(function, state.context.clone(), request).await;
    let logs = vec![format!(
        "Executed '{}' (status {})",
        function.name, output.status_code
    )];
    Json(InvocationResponse::new(output, logs)).into_response()
}

/// HTTP 直接转发入口
async fn forward(
    State(state): State<HostState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let Some(function) = state.registry.find_route(uri.path()) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let mut request = HttpRequestData::new(method.as_str(), uri.to_string());
    request.headers = headers
        .iter()
        .filter_map(|(key, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (key.to_string(), serde_json::Value::String(v.to_string())))
        })
        .collect();

    let output = execute(function, state.context.clone(), request).await;
    into_http_response(output)
}

fn into_http_response(output: HttpOutput) -> Response {
    let mut response = (output.status(), output.body).into_response();
    for (key, value) in &output.headers {
        if let (Ok(name), Ok(value)) = (
            axum::http::HeaderName::try_from(key.as_str()),
            axum::http::HeaderValue::try_from(value.as_str()),
        ) {
            response.headers_mut().insert(name, value);
        }
    }
    response
}
