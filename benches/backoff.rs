use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rebound::{classify, compute_delay, InstantSleeper, RetryConfig, RetryExecutor, ThreadRandom};
use std::time::Duration;

fn backoff_delay(c: &mut Criterion) {
    let config = RetryConfig::default();
    let random = ThreadRandom;

    c.bench_function("compute_delay_attempt_1_to_10", |b| {
        b.iter(|| {
            for attempt in 1..=10 {
                black_box(compute_delay(black_box(attempt), &config, &random));
            }
        });
    });
}

fn classify_messages(c: &mut Criterion) {
    let messages = [
        "request timed out after 30s",
        "connection refused by upstream",
        "HTTP 503 service unavailable",
        "429 too many requests",
        "something unexpected happened",
    ];

    c.bench_function("classify_mixed_messages", |b| {
        b.iter(|| {
            for message in &messages {
                black_box(classify(black_box(message)));
            }
        });
    });
}

fn execute_with_retries(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let config = RetryConfig::builder()
        .max_attempts(3)
        .base_delay(Duration::from_millis(1))
        .build()
        .unwrap();
    let executor = RetryExecutor::builder().config(config).with_sleeper(InstantSleeper).build();

    c.bench_function("execute_success_first_attempt", |b| {
        b.to_async(&rt).iter(|| async {
            let _ = black_box(executor.execute_as("bench", || async { Ok::<_, String>(()) }).await);
        });
    });

    c.bench_function("execute_exhausts_three_attempts", |b| {
        b.to_async(&rt).iter(|| async {
            let _ = black_box(
                executor.execute_as("bench", || async { Err::<(), _>("timeout".to_string()) }).await,
            );
        });
    });
}

criterion_group!(benches, backoff_delay, classify_messages, execute_with_retries);
criterion_main!(benches);
