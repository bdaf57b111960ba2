//! 函数注册表
//!
//! 显式登记每个函数的名称、触发路由、允许的方法与处理器

use crate::error::DispatchError;
use crate::functions::invocation::{HttpOutput, HttpRequestData};
use crate::health::{live_response, ready_response, report_response, HealthAggregator};
use futures::future::BoxFuture;
use std::sync::Arc;

/// 函数执行上下文
#[derive(Debug, Clone)]
pub struct FunctionContext {
    /// 健康检测聚合器
    pub aggregator: Arc<HealthAggregator>,
}

/// 函数处理器
pub type FunctionHandler = fn(FunctionContext, HttpRequestData) -> BoxFuture<'static, HttpOutput>;

/// 函数定义
#[derive(Clone)]
pub struct FunctionDefinition {
    /// 函数名称
    pub name: &'static str,
    /// HTTP 触发路由，不含前导斜杠
    pub route: &'static str,
    /// 触发器允许的方法（小写）
    pub methods: &'static [&'static str],
    /// 处理器
    pub handler: FunctionHandler,
}

impl FunctionDefinition {
    /// 方法是否由触发器绑定
    pub fn allows(&self, method: &str) -> bool {
        self.methods
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(method))
    }
}

impl std::fmt::Debug for FunctionDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionDefinition")
            .field("name", &self.name)
            .field("route", &self.route)
            .field("methods", &self.methods)
            .finish()
    }
}

/// 函数注册表
#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    functions: Vec<FunctionDefinition>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册函数，名称或路由重复时返回错误
    pub fn register(&mut self, definition: FunctionDefinition) -> Result<(), DispatchError> {
        if self
            .functions
            .iter()
            .any(|f| f.name == definition.name || f.route == definition.route)
        {
            return Err(DispatchError::Duplicate(definition.name));
        }
        self.functions.push(definition);
        Ok(())
    }

    /// 按名称查找函数
    pub fn get(&self, name: &str) -> Option<&FunctionDefinition> {
        self.functions.iter().find(|f| f.name == name)
    }

    /// 按触发路由查找函数
    pub fn find_route(&self, path: &str) -> Option<&FunctionDefinition> {
        let path = path.trim_matches('/');
        self.functions.iter().find(|f| f.route == path)
    }

    pub fn functions(&self) -> &[FunctionDefinition] {
        &self.functions
    }

    /// 健康检测函数集合：`Health`、`HealthLive`、`HealthReady`
    pub fn health() -> Self {
        Self {
            functions: vec![
                FunctionDefinition {
                    name: "Health",
                    route: "api/health",
                    methods: &["get"],
                    handler: health,
                },
                FunctionDefinition {
                    name: "HealthLive",
                    route: "api/health/live",
                    methods: &["get"],
                    handler: health_live,
                },
                FunctionDefinition {
                    name: "HealthReady",
                    route: "api/health/ready",
                    methods: &["get"],
                    handler: health_ready,
                },
            ],
        }
    }
}

fn health(ctx: FunctionContext, _req: HttpRequestData) -> BoxFuture<'static, HttpOutput> {
    Box::pin(async move {
        let report = ctx.aggregator.run_all().await;
        let (status_code, body) = report_response(&report);
        HttpOutput::json(status_code, &body)
    })
}

fn health_live(_ctx: FunctionContext, _req: HttpRequestData) -> BoxFuture<'static, HttpOutput> {
    Box::pin(async move {
        let (status_code, body) = live_response();
        HttpOutput::json(status_code, &body)
    })
}

fn health_ready(ctx: FunctionContext, _req: HttpRequestData) -> BoxFuture<'static, HttpOutput> {
    Box::pin(async move {
        let report = ctx.aggregator.run_all().await;
        let (status_code, body) = ready_response(report.status());
        HttpOutput::json(status_code, &body)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::{HealthRegistry, SelfProbe};
    use axum::http::StatusCode;

    fn context() -> FunctionContext {
        let registry = HealthRegistry::builder()
            .register("self", SelfProbe, ["self"])
            .build()
            .unwrap();
        FunctionContext {
            aggregator: Arc::new(HealthAggregator::new(Arc::new(registry))),
        }
    }

    #[test]
    fn test_health_registry_lookup() {
        let registry = FunctionRegistry::health();
        assert_eq!(registry.functions().len(), 3);
        assert_eq!(registry.get("HealthReady").unwrap().route, "api/health/ready");
        assert_eq!(registry.find_route("/api/health/live").unwrap().name, "HealthLive");
        assert!(registry.get("Missing").is_none());
        assert!(registry.find_route("api/other").is_none());
    }

    #[test]
    fn test_duplicate_registration() {
        let mut registry = FunctionRegistry::health();
        let duplicate = registry.get("Health").unwrap().clone();
        assert_eq!(
            registry.register(duplicate),
            Err(DispatchError::Duplicate("Health"))
        );
    }

    #[test]
    fn test_allowed_methods() {
        let registry = FunctionRegistry::health();
        let function = registry.get("Health").unwrap();
        assert!(function.allows("GET"));
        assert!(!function.allows("POST"));
    }

    #[tokio::test]
    async fn test_handlers() {
        let registry = FunctionRegistry::health();
        for function in registry.functions() {
            let output = (function.handler)(context(), HttpRequestData::new("GET", "")).await;
            assert_eq!(output.status(), StatusCode::OK, "{}", function.name);
        }
    }
}
