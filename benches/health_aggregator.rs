//! 健康检测聚合基准测试
//!
//! 测试探针并发聚合与状态映射的开销

use api_template::error::ProbeError;
use api_template::health::{
    live_response, probe_fn, ready_response, report_response, HealthAggregator, HealthRegistry,
    HealthReport, HealthStatus, ProbeOutcome, ProbeResult, SelfProbe, TagFilter,
};
use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use std::sync::Arc;
use std::time::Duration;

fn registry(probe_count: usize) -> HealthRegistry {
    let mut builder = HealthRegistry::builder();
    for i in 0..probe_count {
        builder = if i % 5 == 4 {
            builder.register(
                format!("failing-{i}"),
                probe_fn(|| async { Err(ProbeError::Unreachable("connection refused".to_string())) }),
                ["external"],
            )
        } else {
            builder.register(format!("self-{i}"), SelfProbe, ["self"])
        };
    }
    builder.build().expect("探针名称唯一")
}

/// 聚合基准测试
fn aggregation_benchmark(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().expect("创建运行时失败");

    for probe_count in [2, 10, 50] {
        let aggregator = HealthAggregator::new(Arc::new(registry(probe_count)));
        c.bench_function(&format!("run_all_{probe_count}_probes"), |b| {
            b.iter(|| black_box(runtime.block_on(aggregator.run_all())))
        });
    }

    let aggregator = HealthAggregator::new(Arc::new(registry(50)));
    let filter = TagFilter::any_of(["self"]);
    c.bench_function("run_filtered_50_probes", |b| {
        b.iter(|| black_box(runtime.block_on(aggregator.run(Some(&filter)))))
    });
}

/// 映射基准测试
fn mapping_benchmark(c: &mut Criterion) {
    let entries = (0..20)
        .map(|i| {
            if i % 4 == 0 {
                ProbeResult::failed(format!("probe-{i}"), "connection refused", Duration::from_millis(3))
            } else {
                ProbeResult::new(format!("probe-{i}"), HealthStatus::Healthy)
                    .with_duration(Duration::from_micros(250))
            }
        })
        .collect();
    let report = HealthReport::new(entries, Duration::from_millis(5));

    c.bench_function("report_response_serialization", |b| {
        b.iter(|| {
            let (status, body) = report_response(black_box(&report));
            black_box((status, serde_json::to_string(&body).expect("序列化失败")))
        })
    });

    c.bench_function("ready_and_live_response", |b| {
        b.iter(|| {
            black_box(ready_response(black_box(HealthStatus::Degraded)));
            black_box(live_response())
        })
    });

    c.bench_function("probe_outcome_creation", |b| {
        b.iter(|| black_box(ProbeOutcome::degraded("cache warming up")))
    });
}

criterion_group!(benches, aggregation_benchmark, mapping_benchmark);
criterion_main!(benches);
