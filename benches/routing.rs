use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use trellis::{Container, HttpRequest, Router};

fn router_with(count: usize) -> Router {
    let mut router = Router::new();
    for i in 0..count {
        router
            .get(&format!("/api/v1/resource{}/{{id}}", i), || async { "dynamic" })
            .unwrap();
    }
    router.get("/api/v1/health", || async { "ok" }).unwrap();
    router
        .get(r"/api/v1/posts/{year:\d{4}}/{slug}", || async { "post" })
        .unwrap();
    router.get("/static/{*path}", || async { "file" }).unwrap();
    router
}

fn bench_route_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("route_lookup");

    for count in [10, 100, 1000] {
        let router = router_with(count);
        let last = format!("/api/v1/resource{}/42", count - 1);

        group.bench_with_input(BenchmarkId::new("static", count), &router, |b, router| {
            b.iter(|| router.find(black_box("GET"), black_box("/api/v1/health")))
        });
        group.bench_with_input(BenchmarkId::new("dynamic_last", count), &router, |b, router| {
            b.iter(|| router.find(black_box("GET"), black_box(&last)))
        });
        group.bench_with_input(BenchmarkId::new("regex", count), &router, |b, router| {
            b.iter(|| router.find(black_box("GET"), black_box("/api/v1/posts/2024/hello")))
        });
        group.bench_with_input(BenchmarkId::new("catch_all", count), &router, |b, router| {
            b.iter(|| router.find(black_box("GET"), black_box("/static/css/site/main.css")))
        });
        group.bench_with_input(BenchmarkId::new("miss", count), &router, |b, router| {
            b.iter(|| router.find(black_box("GET"), black_box("/nowhere/at/all")))
        });
    }

    group.finish();
}

fn bench_dispatch(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let router = router_with(100);
    let container = Container::new();

    c.bench_function("dispatch_dynamic", |b| {
        b.to_async(&rt).iter(|| async {
            router
                .handle(&container, HttpRequest::new("GET", "/api/v1/resource50/7"))
                .await
        })
    });
}

criterion_group!(routing_benches, bench_route_lookup, bench_dispatch);
criterion_main!(routing_benches);
