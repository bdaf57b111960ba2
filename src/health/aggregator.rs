//! 健康检测聚合器
//!
//! 并发执行已注册的探针，收集每个探针的结果与耗时，并归约出整体状态

use crate::health::probe::{HealthRegistry, ProbeRegistration, TagFilter};
use crate::health::result::{HealthReport, ProbeResult};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, error};

/// 默认单个探针超时时间
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// 健康检测聚合器
///
/// 聚合器本身无状态，只持有只读的注册表，可在并发请求间共享。
#[derive(Debug, Clone)]
pub struct HealthAggregator {
    /// 探针注册表
    registry: Arc<HealthRegistry>,
    /// 单个探针超时时间
    probe_timeout: Duration,
}

impl HealthAggregator {
    /// 创建新的聚合器
    pub fn new(registry: Arc<HealthRegistry>) -> Self {
        Self {
            registry,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    /// 设置单个探针超时时间
    pub fn with_probe_timeout(mut self, probe_timeout: Duration) -> Self {
        self.probe_timeout = probe_timeout;
        self
    }

    /// 获取注册表
    pub fn registry(&self) -> &HealthRegistry {
        &self.registry
    }

    /// 执行全部探针
    pub async fn run_all(&self) -> HealthReport {
        self.run(None).await
    }

    /// 执行探针并生成健康报告
    ///
    /// 探针在独立任务中执行，调用方中途放弃等待不会取消进行中的探针，
    /// 它们仍会运行到完成或各自超时。
    ///
    /// # 参数
    /// * `filter` - 标签过滤器，`None` 时执行全部探针
    ///
    /// # 返回
    /// * `HealthReport` - 健康报告，聚合过程本身不会失败
    pub async fn run(&self, filter: Option<&TagFilter>) -> HealthReport {
        let start_time = Instant::now();
        let aggregator = self.clone();
        let owned_filter = filter.cloned();

        let task = tokio::spawn(async move { aggregator.collect(owned_filter.as_ref()).await });

        let report = match task.await {
            Ok(report) => report,
            Err(e) => {
                error!("健康检测任务异常结束: {}", e);
                let message = format!("health check task failed: {e}");
                let duration = start_time.elapsed();
                let entries = self
                    .registry
                    .select(filter)
                    .map(|registration| ProbeResult::failed(&registration.name, &message, duration))
                    .collect();
                HealthReport::new(entries, duration)
            }
        };

        debug!(
            status = %report.status(),
            probes = report.len(),
            total_ms = report.total_duration().as_millis() as u64,
            "健康检测聚合完成"
        );
        report
    }

    /// 并发执行选中的探针
    async fn collect(&self, filter: Option<&TagFilter>) -> HealthReport {
        let start_time = Instant::now();

        let probes = self
            .registry
            .select(filter)
            .map(|registration| Self::run_probe(registration, self.probe_timeout));
        let entries = futures::future::join_all(probes).await;

        HealthReport::new(entries, start_time.elapsed())
    }

    /// 执行单个探针，错误、崩溃与超时都记录为 Unhealthy
    async fn run_probe(registration: &ProbeRegistration, probe_timeout: Duration) -> ProbeResult {
        let start_time = Instant::now();
        let check = AssertUnwindSafe(registration.probe.check()).catch_unwind();
        let outcome = timeout(probe_timeout, check).await;
        let duration = start_time.elapsed();

        let result = match outcome {
            Ok(Ok(Ok(outcome))) => ProbeResult::from_outcome(&registration.name, outcome, duration),
            Ok(Ok(Err(e))) => ProbeResult::failed(&registration.name, e.to_string(), duration),
            Ok(Err(panic)) => {
                ProbeResult::failed(&registration.name, panic_message(panic.as_ref()), duration)
            }
            Err(_) => ProbeResult::failed(
                &registration.name,
                format!("probe timed out after {}ms", probe_timeout.as_millis()),
                duration,
            ),
        };

        crate::logging::probe_log(&result);

        result
    }
}

/// 提取 panic 携带的信息
fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("probe panicked: {message}")
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("probe panicked: {message}")
    } else {
        "probe panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProbeError;
    use crate::health::probe::probe_fn;
    use crate::health::result::{HealthStatus, ProbeOutcome};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn aggregator(registry: HealthRegistry) -> HealthAggregator {
        HealthAggregator::new(Arc::new(registry))
    }

    #[tokio::test]
    async fn test_empty_registry_is_healthy() {
        let report = aggregator(HealthRegistry::default()).run_all().await;
        assert!(report.is_empty());
        assert_eq!(report.status(), HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn test_failing_probe_does_not_abort_siblings() {
        let registry = HealthRegistry::builder()
            .register(
                "a",
                probe_fn(|| async {
                    Err(ProbeError::Unreachable("connection refused".to_string()))
                }),
                ["database"],
            )
            .register("b", probe_fn(|| async { Ok(ProbeOutcome::healthy()) }), ["self"])
            .build()
            .unwrap();

        let report = aggregator(registry).run_all().await;

        assert_eq!(report.len(), 2);
        let a = report.entry("a").unwrap();
        assert_eq!(a.status(), HealthStatus::Unhealthy);
        assert_eq!(a.error(), Some("connection refused"));
        assert_eq!(report.entry("b").unwrap().status(), HealthStatus::Healthy);
        assert_eq!(report.status(), HealthStatus::Unhealthy);
    }

    #[tokio::test]
    async fn test_panicking_probe_is_captured() {
        let registry = HealthRegistry::builder()
            .register(
                "explodes",
                probe_fn(|| async {
                    if true {
                        panic!("disk on fire");
                    }
                    Ok(ProbeOutcome::healthy())
                }),
                Vec::<String>::new(),
            )
            .register("self", probe_fn(|| async { Ok(ProbeOutcome::healthy()) }), ["self"])
            .build()
            .unwrap();

        let report = aggregator(registry).run_all().await;

        let entry = report.entry("explodes").unwrap();
        assert_eq!(entry.status(), HealthStatus::Unhealthy);
        assert!(entry.error().unwrap().contains("disk on fire"));
        assert_eq!(report.entry("self").unwrap().status(), HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn test_probe_timeout() {
        let registry = HealthRegistry::builder()
            .register(
                "hung",
                probe_fn(|| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok(ProbeOutcome::healthy())
                }),
                Vec::<String>::new(),
            )
            .build()
            .unwrap();

        let report = aggregator(registry)
            .with_probe_timeout(Duration::from_millis(20))
            .run_all()
            .await;

        let entry = report.entry("hung").unwrap();
        assert_eq!(entry.status(), HealthStatus::Unhealthy);
        assert_eq!(entry.error(), Some("probe timed out after 20ms"));
    }

    #[tokio::test]
    async fn test_worst_status_wins() {
        let registry = HealthRegistry::builder()
            .register("ok", probe_fn(|| async { Ok(ProbeOutcome::healthy()) }), ["self"])
            .register(
                "slow",
                probe_fn(|| async { Ok(ProbeOutcome::degraded("latency above 500ms")) }),
                ["cache"],
            )
            .build()
            .unwrap();

        let report = aggregator(registry).run_all().await;
        assert_eq!(report.status(), HealthStatus::Degraded);
        assert_eq!(
            report.entry("slow").unwrap().description(),
            Some("latency above 500ms")
        );
    }

    #[tokio::test]
    async fn test_filter_selects_probes() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let registry = HealthRegistry::builder()
            .register(
                "database",
                probe_fn(move || {
                    let counter = counter.clone();
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        Ok(ProbeOutcome::unhealthy("connection refused"))
                    }
                }),
                ["database"],
            )
            .register("self", probe_fn(|| async { Ok(ProbeOutcome::healthy()) }), ["self"])
            .build()
            .unwrap();

        let aggregator = aggregator(registry);
        let filter = TagFilter::any_of(["self"]);
        let report = aggregator.run(Some(&filter)).await;

        assert_eq!(report.names(), vec!["self"]);
        assert_eq!(report.status(), HealthStatus::Healthy);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_runs_are_idempotent() {
        let registry = HealthRegistry::builder()
            .register("self", probe_fn(|| async { Ok(ProbeOutcome::healthy()) }), ["self"])
            .register(
                "database",
                probe_fn(|| async { Ok(ProbeOutcome::unhealthy("connection refused")) }),
                ["database"],
            )
            .build()
            .unwrap();
        let aggregator = aggregator(registry);

        let first = aggregator.run_all().await;
        let second = aggregator.run_all().await;

        assert_eq!(first.names(), second.names());
        let statuses = |r: &HealthReport| r.entries().iter().map(|e| e.status()).collect::<Vec<_>>();
        assert_eq!(statuses(&first), statuses(&second));
        assert_eq!(first.status(), second.status());
    }

    #[tokio::test]
    async fn test_abandoned_run_lets_probes_finish() {
        let finished = Arc::new(AtomicUsize::new(0));
        let counter = finished.clone();

        let registry = HealthRegistry::builder()
            .register(
                "slow",
                probe_fn(move || {
                    let counter = counter.clone();
                    async move {
                        tokio::time::sleep(Duration::from_millis(200)).await;
                        counter.fetch_add(1, Ordering::SeqCst);
                        Ok(ProbeOutcome::healthy())
                    }
                }),
                ["self"],
            )
            .build()
            .unwrap();
        let aggregator = aggregator(registry);

        let abandoned = timeout(Duration::from_millis(50), aggregator.run_all()).await;
        assert!(abandoned.is_err());
        assert_eq!(finished.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(finished.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_probes_run_concurrently() {
        let slow = || {
            probe_fn(|| async {
                tokio::time::sleep(Duration::from_millis(200)).await;
                Ok(ProbeOutcome::healthy())
            })
        };
        let registry = HealthRegistry::builder()
            .register("one", slow(), ["self"])
            .register("two", slow(), ["self"])
            .register("three", slow(), ["self"])
            .build()
            .unwrap();

        let report = aggregator(registry).run_all().await;

        assert_eq!(report.len(), 3);
        assert!(report.total_duration() < Duration::from_millis(550));
    }
}
