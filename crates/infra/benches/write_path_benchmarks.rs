use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use chrono::{Duration, Utc};
use chronicle_core::AggregateRoot;
use chronicle_infra::{EventWindow, InMemoryBackend, InMemoryUserService};
use chronicle_users::UserDraft;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap()
}

/// Create: insert + event append + commit.
fn bench_create_latency(c: &mut Criterion) {
    let rt = runtime();
    let service = InMemoryUserService::in_memory(InMemoryBackend::new());

    c.bench_function("create_user", |b| {
        b.to_async(&rt).iter(|| async {
            let committed = service
                .create_user(UserDraft::new("bench", "pw"))
                .await
                .unwrap();
            black_box(committed);
        });
    });
}

/// Update: locked read + write + event append + commit, always on the same row.
fn bench_update_latency(c: &mut Criterion) {
    let rt = runtime();
    let service = InMemoryUserService::in_memory(InMemoryBackend::new());
    let id = rt
        .block_on(service.create_user(UserDraft::new("bench", "pw")))
        .unwrap()
        .aggregate
        .id();

    let mut flip = false;
    c.bench_function("update_user", |b| {
        b.to_async(&rt).iter(|| {
            flip = !flip;
            let secret = if flip { "a" } else { "b" };
            let service = service.clone();
            async move {
                let committed = service
                    .update_user(id, UserDraft::new("bench", secret))
                    .await
                    .unwrap();
                black_box(committed);
            }
        });
    });
}

/// Windowed read over logs of increasing size.
fn bench_query_global(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("query_global");

    for event_count in [100usize, 1_000, 10_000].iter() {
        let service = InMemoryUserService::in_memory(InMemoryBackend::new());
        rt.block_on(async {
            for i in 0..*event_count {
                service
                    .create_user(UserDraft::new(format!("u{i}"), "pw"))
                    .await
                    .unwrap();
            }
        });

        group.throughput(Throughput::Elements(100));
        group.bench_with_input(
            BenchmarkId::from_parameter(event_count),
            event_count,
            |b, _| {
                b.to_async(&rt).iter(|| async {
                    let window = EventWindow::new(Some(Utc::now() - Duration::hours(1)), Some(100));
                    black_box(service.list_events(window).await.unwrap());
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_create_latency,
    bench_update_latency,
    bench_query_global
);
criterion_main!(benches);
