//! 函数宿主调用协议
//!
//! 宿主以 `POST /{FunctionName}` 转发触发器数据，处理器返回输出绑定

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// HTTP 触发器的输入绑定名称
pub const HTTP_INPUT_BINDING: &str = "req";
/// HTTP 输出绑定名称
pub const HTTP_OUTPUT_BINDING: &str = "res";

/// 宿主发来的调用请求
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct InvocationRequest {
    /// 触发器与输入绑定数据，键为绑定名称
    #[serde(default)]
    pub data: HashMap<String, serde_json::Value>,
    /// 调用元数据
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl InvocationRequest {
    /// 解析 HTTP 触发器绑定
    pub fn http_request(&self) -> Option<Result<HttpRequestData, serde_json::Error>> {
        self.data
            .get(HTTP_INPUT_BINDING)
            .map(|value| serde_json::from_value(value.clone()))
    }
}

/// HTTP 触发器数据
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct HttpRequestData {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub query: HashMap<String, String>,
    /// 请求头，宿主可能以字符串或字符串数组传递
    #[serde(default)]
    pub headers: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub params: HashMap<String, String>,
    #[serde(default)]
    pub body: Option<serde_json::Value>,
}

impl HttpRequestData {
    /// 构造指定方法的请求
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            ..Default::default()
        }
    }
}

/// HTTP 输出绑定
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpOutput {
    pub status_code: u16,
    /// 已序列化的 JSON 响应体
    pub body: String,
    pub headers: BTreeMap<String, String>,
}

impl HttpOutput {
    /// 以 JSON 响应体构造输出
    pub fn json<T: Serialize>(status: StatusCode, body: &T) -> Self {
        match serde_json::to_string(body) {
            Ok(body) => Self::raw(status, body),
            Err(e) => {
                tracing::error!(error = %e, "响应体序列化失败");
                Self::error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
        }
    }

    /// 错误输出，响应体为 `{"message": ...}`
    pub fn error(status: StatusCode, message: impl Into<String>) -> Self {
        let body = serde_json::json!({ "message": message.into() });
        Self::raw(status, body.to_string())
    }

    fn raw(status: StatusCode, body: String) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        Self {
            status_code: status.as_u16(),
            body,
            headers,
        }
    }

    /// 状态码
    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

/// 调用输出集合
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct InvocationOutputs {
    pub res: HttpOutput,
}

/// 返回给宿主的调用结果
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct InvocationResponse {
    pub outputs: InvocationOutputs,
    pub logs: Vec<String>,
    pub return_value: Option<serde_json::Value>,
}

impl InvocationResponse {
    pub fn new(res: HttpOutput, logs: Vec<String>) -> Self {
        Self {
            outputs: InvocationOutputs { res },
            logs,
            return_value: None,
        }
    }
}
