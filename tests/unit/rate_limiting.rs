//! Sliding-window property of the shared rate limiter

use fitbit_export::downloader::RateLimiter;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

#[tokio::test(start_paused = true)]
async fn test_no_window_ever_exceeds_the_budget() {
    let limit = 5;
    let interval = Duration::from_secs(60);
    let limiter = Arc::new(RateLimiter::new(limit, interval));
    let grants = Arc::new(Mutex::new(Vec::new()));

    let tasks: Vec<_> = (0..23)
        .map(|_| {
            let limiter = Arc::clone(&limiter);
            let grants = Arc::clone(&grants);
            tokio::spawn(async move {
                limiter.acquire().await;
                grants.lock().unwrap().push(Instant::now());
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }

    let mut grants = grants.lock().unwrap().clone();
    grants.sort();
    assert_eq!(grants.len(), 23);
    for (i, start) in grants.iter().enumerate() {
        let in_window = grants[i..]
            .iter()
            .take_while(|t| t.duration_since(*start) < interval)
            .count();
        assert!(in_window <= limit, "{in_window} grants within one window");
    }
}

#[tokio::test(start_paused = true)]
async fn test_budget_frees_up_as_the_window_slides() {
    let limiter = RateLimiter::new(2, Duration::from_secs(10));
    let start = Instant::now();

    limiter.acquire().await;
    tokio::time::sleep(Duration::from_secs(4)).await;
    limiter.acquire().await;

    // Third grant waits for the first to age out, not for a full window
    limiter.acquire().await;
    let waited = start.elapsed();
    assert!(waited >= Duration::from_secs(10));
    assert!(waited < Duration::from_secs(12));
}

#[tokio::test(start_paused = true)]
async fn test_shared_instance_throttles_all_callers() {
    let limiter = Arc::new(RateLimiter::fitbit());
    assert_eq!(limiter.limit(), Some(150));

    let start = Instant::now();
    for _ in 0..150 {
        limiter.acquire().await;
    }
    assert_eq!(start.elapsed(), Duration::ZERO);

    let other = Arc::clone(&limiter);
    other.acquire().await;
    assert!(start.elapsed() >= Duration::from_secs(3600));
}
