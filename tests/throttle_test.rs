use std::sync::Arc;
use std::time::Duration;

use rs_harvester::throttle::WINDOW;
use rs_harvester::{AdmissionThrottle, ThrottleConfig};
use tokio::time::Instant;

fn config(rpm: u32, floor_ms: u64, ceiling_ms: u64) -> ThrottleConfig {
    ThrottleConfig {
        requests_per_minute: rpm,
        gap_floor: Duration::from_millis(floor_ms),
        gap_ceiling: Duration::from_millis(ceiling_ms),
        failure_backoff: 1.5,
        success_recovery: 0.8,
    }
}

/// Every run of `budget + 1` consecutive admissions must span at least a window.
fn assert_window_budget(admissions: &[Instant], budget: usize) {
    for pair in admissions.windows(budget + 1) {
        let span = pair[budget].duration_since(pair[0]);
        assert!(span >= WINDOW, "{} admissions within {span:?}", budget + 1);
    }
}

#[tokio::test(start_paused = true)]
async fn sequential_admissions_respect_sliding_window() {
    let throttle = AdmissionThrottle::new(config(5, 100, 1_000));
    let mut admitted = Vec::new();

    for _ in 0..12 {
        throttle.acquire().await;
        admitted.push(Instant::now());
    }

    assert_window_budget(&admitted, 5);
    // The first five only wait for the gap.
    assert!(admitted[4].duration_since(admitted[0]) < Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn concurrent_admissions_share_one_budget() {
    let throttle = Arc::new(AdmissionThrottle::new(config(4, 50, 500)));
    let mut tasks = Vec::new();

    for _ in 0..10 {
        let throttle = Arc::clone(&throttle);
        tasks.push(tokio::spawn(async move {
            throttle.acquire().await;
            Instant::now()
        }));
    }

    let mut admitted = Vec::new();
    for task in tasks {
        admitted.push(task.await.expect("task finished"));
    }
    admitted.sort();

    assert_window_budget(&admitted, 4);
    assert_eq!(throttle.stats().await.admissions, 10);
}

#[tokio::test(start_paused = true)]
async fn gap_stays_within_bounds_under_repeated_outcomes() {
    let throttle = AdmissionThrottle::new(config(60, 200, 2_000));

    for _ in 0..20 {
        throttle.record_outcome(false).await;
        let gap = throttle.current_gap().await;
        assert!(gap <= Duration::from_millis(2_000));
    }
    assert_eq!(throttle.current_gap().await, Duration::from_millis(2_000));

    for _ in 0..30 {
        throttle.record_outcome(true).await;
        assert!(throttle.current_gap().await >= Duration::from_millis(200));
    }
    assert_eq!(throttle.current_gap().await, Duration::from_millis(200));
}

#[tokio::test(start_paused = true)]
async fn widened_gap_delays_next_admission() {
    let throttle = AdmissionThrottle::new(config(60, 1_000, 10_000));

    throttle.acquire().await;
    throttle.record_outcome(false).await;
    let waited = throttle.acquire().await;

    assert!(waited >= Duration::from_millis(1_500), "waited {waited:?}");
    let stats = throttle.stats().await;
    assert_eq!(stats.failures, 1);
    assert_eq!(stats.in_window, 2);
}
