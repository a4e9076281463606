use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use routecache_core::matcher::matches;
use routecache_core::{RouteChannel, RouteSyntax};

/// Channel con N literales `/users/{i}` y un grupo `/users/:id`
fn populated_channel(literals: usize) -> RouteChannel<()> {
    let channel = RouteChannel::new(RouteSyntax::default()).unwrap();
    for i in 0..literals {
        channel.on(&format!("/users/{}", i), |_| {});
    }
    channel.on_group("/users/:id", |_| {}).unwrap();
    channel.on_group("*", |_| {}).unwrap();
    channel
}

/// Benchmark: matching en modo segmento y glob
fn bench_matcher(c: &mut Criterion) {
    let mut group = c.benchmark_group("matcher");

    group.bench_function("segment", |b| {
        b.iter(|| {
            std::hint::black_box(matches(
                "/users/124/news/0",
                "/users/:user_id/news/:news_id",
                '/',
                Some(':'),
                '*',
            ))
        });
    });

    group.bench_function("glob", |b| {
        b.iter(|| {
            std::hint::black_box(matches(
                "/users/124/news/0",
                "/users/*/news/*",
                '/',
                Some(':'),
                '*',
            ))
        });
    });

    // Patron adversario: muchos globs sin coincidencia posible
    let address = "/".to_string() + &"a".repeat(512);
    let pattern = "/".to_string() + &"*a".repeat(64) + "b";
    group.bench_function("glob_adversarial", |b| {
        b.iter(|| std::hint::black_box(matches(&address, &pattern, '/', Some(':'), '*')));
    });

    group.finish();
}

/// Benchmark: publish exacto vs publish de grupo
fn bench_publish(c: &mut Criterion) {
    let mut group = c.benchmark_group("publish");

    for size in [10usize, 100, 1_000] {
        let channel = populated_channel(size);
        group.throughput(Throughput::Elements(size as u64));

        group.bench_with_input(BenchmarkId::new("literal", size), &channel, |b, channel| {
            b.iter(|| std::hint::black_box(channel.publish("/users/5", false, &())));
        });

        group.bench_with_input(BenchmarkId::new("group", size), &channel, |b, channel| {
            b.iter(|| std::hint::black_box(channel.publish("/users/:id", false, &())));
        });

        group.bench_with_input(BenchmarkId::new("fallback_glob", size), &channel, |b, channel| {
            b.iter(|| std::hint::black_box(channel.publish("/users/*", false, &())));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_matcher, bench_publish);
criterion_main!(benches);
