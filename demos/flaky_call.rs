//! A flaky call retried with backoff, logged through `LogSink`.
//!
//! Run with `cargo run --example flaky_call`.
use rebound::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), RetryError<String>> {
    tracing_subscriber::fmt().with_max_level(tracing::Level::DEBUG).init();

    let config = RetryConfig::builder()
        .max_attempts(4)
        .base_delay(Duration::from_millis(200))
        .max_delay(Duration::from_secs(2))
        .jitter_ratio(0.2)
        .build()
        .expect("valid retry config");
    let executor = RetryExecutor::builder().config(config).with_sink(LogSink).build();
    let monitor = executor.monitor();

    let calls = Arc::new(AtomicUsize::new(0));
    let value = executor
        .execute_as("fetch-weather", || {
            let calls = calls.clone();
            async move {
                match calls.fetch_add(1, Ordering::SeqCst) {
                    0 => Err("connection reset by peer".to_string()),
                    1 => Err("HTTP 503 service unavailable".to_string()),
                    _ => Ok("sunny, 21C"),
                }
            }
        })
        .await?;

    println!("{}", value);
    if let Some(state) = monitor.retry_info("fetch-weather") {
        for attempt in &state.attempts {
            println!(
                "attempt {}: {}",
                attempt.attempt_number,
                attempt.error_message.as_deref().unwrap_or("ok")
            );
        }
    }
    println!("{:?}", monitor.metrics());
    Ok(())
}
