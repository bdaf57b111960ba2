//! 函数宿主适配器模块
//!
//! 以自定义处理器协议向无服务器函数宿主暴露健康检测函数

pub mod host;
pub mod invocation;
pub mod registry;

// 重新导出主要类型
pub use host::{create_function_router, FunctionHost};
pub use invocation::{HttpOutput, HttpRequestData, InvocationRequest, InvocationResponse};
pub use registry::{FunctionContext, FunctionDefinition, FunctionHandler, FunctionRegistry};
