// crates/resilience/examples/resilience_demo.rs
//! Demonstration of resilience patterns

use breakwater_resilience::{
    BulkheadConfig, BulkheadExecutor, CircuitBreaker, CircuitBreakerConfig, RateLimitConfig,
    RateLimiter, RetryConfig, RetryExecutor, Timeout,
};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() {
    env_logger::init();

    println!("Resilience Patterns Demo");
    println!("========================\n");

    demo_retry().await;
    println!();
    demo_circuit_breaker().await;
    println!();
    demo_bulkhead().await;
    println!();
    demo_rate_limiter().await;
    println!();
    demo_timeout().await;
}

async fn demo_retry() {
    println!("1. Retry Pattern");
    println!("----------------");

    let executor = RetryExecutor::new(RetryConfig {
        max_attempts: 3,
        base_delay: Duration::from_millis(100),
        ..RetryConfig::default()
    });

    let attempts = Arc::new(AtomicU32::new(0));
    let counter = attempts.clone();

    let result = executor
        .execute(move || {
            let counter = counter.clone();
            async move {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                println!("  Attempt {}", n);
                if n < 3 {
                    Err("simulated failure")
                } else {
                    Ok(42)
                }
            }
        })
        .await;

    match result {
        Ok(value) => println!("✓ Success after retries: {}", value),
        Err(e) => println!("✗ Failed: {}", e),
    }
}

async fn demo_circuit_breaker() {
    println!("2. Circuit Breaker Pattern");
    println!("--------------------------");

    let cb = CircuitBreaker::new(
        "demo-service",
        CircuitBreakerConfig {
            failure_threshold: 3,
            success_threshold: 1,
            open_timeout: Duration::from_millis(100),
            ..CircuitBreakerConfig::default()
        },
    );

    for i in 1..=5 {
        let result = cb
            .execute(move || async move {
                if i <= 3 {
                    Err::<i32, _>("service unavailable")
                } else {
                    Ok(42)
                }
            })
            .await;

        match result {
            Ok(_) => println!("  Request {}: ✓ Success", i),
            Err(e) => println!("  Request {}: ✗ {}", i, e),
        }
    }

    println!("  Circuit state: {:?}", cb.state());

    tokio::time::sleep(Duration::from_millis(150)).await;
    println!("  Waited for open timeout...");

    let result = cb.execute(|| async { Ok::<_, &str>(42) }).await;
    match result {
        Ok(_) => println!("  After timeout: ✓ Request succeeded"),
        Err(e) => println!("  After timeout: ✗ {}", e),
    }

    println!("  Circuit state: {:?}", cb.state());
}

async fn demo_bulkhead() {
    println!("3. Bulkhead Pattern");
    println!("-------------------");

    let bulkhead = Arc::new(BulkheadExecutor::new(BulkheadConfig {
        max_concurrent: 2,
        max_wait: Duration::from_millis(50),
    }));

    println!("  Limit: {} concurrent calls", bulkhead.config().max_concurrent);

    let mut handles = Vec::new();
    for i in 1..=4 {
        let bulkhead = bulkhead.clone();
        handles.push(tokio::spawn(async move {
            let result = bulkhead
                .execute(|| async {
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    Ok::<_, &str>(())
                })
                .await;
            match result {
                Ok(()) => println!("  Call {}: ✓ Executed", i),
                Err(e) => println!("  Call {}: ✗ {}", i, e),
            }
        }));
    }
    for handle in handles {
        let _ = handle.await;
    }
}

async fn demo_rate_limiter() {
    println!("4. Rate Limiter Pattern");
    println!("-----------------------");

    let limiter = RateLimiter::new(RateLimitConfig {
        calls: 5,
        period: Duration::from_secs(1),
    });

    println!("  Limit: {} requests per second", limiter.config().calls);

    for i in 1..=7 {
        if limiter.allow() {
            println!("  Request {}: ✓ Allowed", i);
        } else {
            println!("  Request {}: ✗ Rate limited", i);
        }
    }
}

async fn demo_timeout() {
    println!("5. Timeout Pattern");
    println!("------------------");

    let timeout = Timeout::new(Duration::from_millis(50));

    let result = timeout
        .execute(|| async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            Ok::<_, &str>(42)
        })
        .await;
    match result {
        Ok(value) => println!("  Fast operation: ✓ Completed: {}", value),
        Err(e) => println!("  Fast operation: ✗ {}", e),
    }

    let result = timeout
        .execute(|| async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok::<_, &str>(42)
        })
        .await;
    match result {
        Ok(value) => println!("  Slow operation: ✓ Completed: {}", value),
        Err(e) => println!("  Slow operation: ✗ {}", e),
    }
}
