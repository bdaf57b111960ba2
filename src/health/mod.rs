//! 健康检测模块
//!
//! 提供探针注册、并发聚合与状态码映射功能

pub mod aggregator;
pub mod mapper;
pub mod probe;
pub mod probes;
pub mod result;

// 重新导出主要类型
pub use aggregator::{HealthAggregator, DEFAULT_PROBE_TIMEOUT};
pub use mapper::{
    live_response, ready_response, report_response, CheckBody, HealthReportBody, MappedStatus,
    StatusBody,
};
pub use probe::{probe_fn, HealthProbe, HealthRegistry, HealthRegistryBuilder, TagFilter};
pub use probes::{build_registry, DatabaseProbe, HttpProbe, SelfProbe};
pub use result::{HealthReport, HealthStatus, ProbeOutcome, ProbeResult};
