//! 健康状态映射
//!
//! 把聚合后的健康状态映射为传输层状态码和响应体。
//! HTTP 服务与函数触发器都只通过这里决定状态码。

use crate::health::result::{HealthReport, HealthStatus, ProbeResult};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

/// 映射输入状态
///
/// 除了三种已知状态，还保留无法识别的状态值（例如解析失败的状态字符串），
/// 映射时统一落到 500 / "Unknown"。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappedStatus {
    /// 已知状态
    Known(HealthStatus),
    /// 无法识别的状态
    Unrecognized(String),
}

impl From<HealthStatus> for MappedStatus {
    fn from(status: HealthStatus) -> Self {
        MappedStatus::Known(status)
    }
}

impl MappedStatus {
    /// 从字符串解析状态，无法识别时保留原值
    pub fn parse(value: &str) -> Self {
        value
            .parse::<HealthStatus>()
            .map(MappedStatus::Known)
            .unwrap_or_else(|_| MappedStatus::Unrecognized(value.to_string()))
    }

    /// 报告中使用的状态名称
    fn report_label(&self) -> String {
        match self {
            MappedStatus::Known(status) => status.to_string(),
            MappedStatus::Unrecognized(_) => "Unknown".to_string(),
        }
    }
}

/// 完整健康报告响应体
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReportBody {
    /// 整体状态
    pub status: String,
    /// 总耗时（`hh:mm:ss.fffffff`）
    #[serde(with = "timespan")]
    pub total_duration: Duration,
    /// 各探针结果
    pub checks: Vec<CheckBody>,
}

/// 单个探针响应体
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckBody {
    /// 探针名称
    pub name: String,
    /// 探针状态
    pub status: String,
    /// 耗时
    #[serde(with = "timespan")]
    pub duration: Duration,
    /// 描述信息
    pub description: Option<String>,
    /// 错误信息
    pub error: Option<String>,
}

impl From<&ProbeResult> for CheckBody {
    fn from(result: &ProbeResult) -> Self {
        Self {
            name: result.name().to_string(),
            status: result.status().to_string(),
            duration: result.duration(),
            description: result.description().map(str::to_string),
            error: result.error().map(str::to_string),
        }
    }
}

/// 存活/就绪响应体
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusBody {
    /// 状态描述
    pub status: String,
    /// 响应时间戳
    pub timestamp: DateTime<Utc>,
}

impl StatusBody {
    fn now(status: &str) -> Self {
        Self {
            status: status.to_string(),
            timestamp: Utc::now(),
        }
    }
}

/// 完整报告的状态码
///
/// 降级仍返回 200。
pub fn report_status_code(status: &MappedStatus) -> StatusCode {
    match status {
        MappedStatus::Known(HealthStatus::Healthy) => StatusCode::OK,
        MappedStatus::Known(HealthStatus::Degraded) => StatusCode::OK,
        MappedStatus::Known(HealthStatus::Unhealthy) => StatusCode::SERVICE_UNAVAILABLE,
        MappedStatus::Unrecognized(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// 完整报告映射
pub fn report_response(report: &HealthReport) -> (StatusCode, HealthReportBody) {
    report_response_as(MappedStatus::from(report.status()), report)
}

/// 以指定状态映射完整报告
pub fn report_response_as(
    status: MappedStatus,
    report: &HealthReport,
) -> (StatusCode, HealthReportBody) {
    let body = HealthReportBody {
        status: status.report_label(),
        total_duration: report.total_duration(),
        checks: report.entries().iter().map(CheckBody::from).collect(),
    };
    (report_status_code(&status), body)
}

/// 存活检测映射，不依赖任何探针
pub fn live_response() -> (StatusCode, StatusBody) {
    (StatusCode::OK, StatusBody::now("Alive"))
}

/// 就绪检测映射
pub fn ready_response(status: impl Into<MappedStatus>) -> (StatusCode, StatusBody) {
    match status.into() {
        MappedStatus::Known(HealthStatus::Healthy) => (StatusCode::OK, StatusBody::now("Ready")),
        MappedStatus::Known(HealthStatus::Degraded) => {
            (StatusCode::OK, StatusBody::now("Ready (Degraded)"))
        }
        MappedStatus::Known(HealthStatus::Unhealthy) => {
            (StatusCode::SERVICE_UNAVAILABLE, StatusBody::now("Not Ready"))
        }
        MappedStatus::Unrecognized(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, StatusBody::now("Unknown"))
        }
    }
}

/// TimeSpan 风格的时长序列化：`[d.]hh:mm:ss[.fffffff]`
pub mod timespan {
    use serde::Serializer;
    use std::time::Duration;

    const TICKS_PER_SECOND: u128 = 10_000_000;

    /// 格式化时长
    pub fn format(duration: &Duration) -> String {
        let ticks = duration.as_nanos() / 100;
        let total_seconds = ticks / TICKS_PER_SECOND;
        let fraction = ticks % TICKS_PER_SECOND;

        let days = total_seconds / 86_400;
        let hours = (total_seconds % 86_400) / 3_600;
        let minutes = (total_seconds % 3_600) / 60;
        let seconds = total_seconds % 60;

        let mut formatted = String::new();
        if days > 0 {
            formatted.push_str(&format!("{days}."));
        }
        formatted.push_str(&format!("{hours:02}:{minutes:02}:{seconds:02}"));
        if fraction > 0 {
            formatted.push_str(&format!(".{fraction:07}"));
        }
        formatted
    }

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format(duration))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report_with(statuses: &[(&str, HealthStatus)]) -> HealthReport {
        let entries = statuses
            .iter()
            .map(|(name, status)| ProbeResult::new(*name, *status))
            .collect();
        HealthReport::new(entries, Duration::from_millis(15))
    }

    #[test]
    fn test_report_status_codes() {
        assert_eq!(
            report_status_code(&HealthStatus::Healthy.into()),
            StatusCode::OK
        );
        assert_eq!(
            report_status_code(&HealthStatus::Degraded.into()),
            StatusCode::OK
        );
        assert_eq!(
            report_status_code(&HealthStatus::Unhealthy.into()),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            report_status_code(&MappedStatus::Unrecognized("Flapping".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_report_body() {
        let report = report_with(&[
            ("self", HealthStatus::Healthy),
            ("cache", HealthStatus::Degraded),
        ]);

        let (code, body) = report_response(&report);
        assert_eq!(code, StatusCode::OK);
        assert_eq!(body.status, "Degraded");
        assert_eq!(body.checks.len(), 2);
        assert_eq!(body.checks[1].name, "cache");
        assert_eq!(body.checks[1].status, "Degraded");
    }

    #[test]
    fn test_report_unrecognized_status() {
        let report = report_with(&[("self", HealthStatus::Healthy)]);
        let (code, body) = report_response_as(MappedStatus::parse("Flapping"), &report);

        assert_eq!(code, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.status, "Unknown");
        assert_eq!(body.checks.len(), 1);
    }

    #[test]
    fn test_report_json_shape() {
        let report = HealthReport::new(
            vec![ProbeResult::failed(
                "database",
                "connection refused",
                Duration::from_millis(2),
            )],
            Duration::from_millis(3),
        );

        let (code, body) = report_response(&report);
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(code, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json["status"], "Unhealthy");
        assert_eq!(json["totalDuration"], "00:00:00.0030000");
        assert_eq!(json["checks"][0]["name"], "database");
        assert_eq!(json["checks"][0]["status"], "Unhealthy");
        assert_eq!(json["checks"][0]["duration"], "00:00:00.0020000");
        assert_eq!(json["checks"][0]["error"], "connection refused");
    }

    #[test]
    fn test_absent_fields_serialize_as_null() {
        let report = report_with(&[("self", HealthStatus::Healthy)]);
        let (_, body) = report_response(&report);
        let json = serde_json::to_value(&body).unwrap();

        assert!(json["checks"][0]["description"].is_null());
        assert!(json["checks"][0]["error"].is_null());
    }

    #[test]
    fn test_live_response() {
        let (code, body) = live_response();
        assert_eq!(code, StatusCode::OK);
        assert_eq!(body.status, "Alive");
    }

    #[test]
    fn test_ready_responses() {
        let (code, body) = ready_response(HealthStatus::Healthy);
        assert_eq!((code, body.status.as_str()), (StatusCode::OK, "Ready"));

        let (code, body) = ready_response(HealthStatus::Degraded);
        assert_eq!((code, body.status.as_str()), (StatusCode::OK, "Ready (Degraded)"));

        let (code, body) = ready_response(HealthStatus::Unhealthy);
        assert_eq!(
            (code, body.status.as_str()),
            (StatusCode::SERVICE_UNAVAILABLE, "Not Ready")
        );

        let (code, body) = ready_response(MappedStatus::parse("???"));
        assert_eq!(
            (code, body.status.as_str()),
            (StatusCode::INTERNAL_SERVER_ERROR, "Unknown")
        );
    }

    #[test]
    fn test_status_body_json_keys() {
        let (_, body) = ready_response(HealthStatus::Healthy);
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["status"], "Ready");
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn test_timespan_format() {
        assert_eq!(timespan::format(&Duration::ZERO), "00:00:00");
        assert_eq!(timespan::format(&Duration::from_millis(1)), "00:00:00.0010000");
        assert_eq!(timespan::format(&Duration::from_nanos(1_234_500)), "00:00:00.0012345");
        assert_eq!(timespan::format(&Duration::from_secs(3_723)), "01:02:03");
        assert_eq!(
            timespan::format(&(Duration::from_secs(90_061) + Duration::from_millis(500))),
            "1.01:01:01.5000000"
        );
    }
}
