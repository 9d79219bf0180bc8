//! Admission throttle.
//!
//! Bounds outbound fetches with two constraints that must both hold before a
//! request is admitted:
//!
//! - **Sliding window**: at most `requests_per_minute` admissions in any
//!   trailing 60-second window.
//! - **Minimum gap**: a delay since the previous admission that widens after
//!   failures and narrows after successes, always within `[floor, ceiling]`.
//!
//! When both constraints require waiting, the throttle waits for the longer
//! of the two. Admission is never denied, only delayed. All pacing in the
//! engine goes through here; there are no ad hoc sleeps elsewhere.
//!
//! Time is read from `tokio::time`, so tests can run with a paused clock.

use std::collections::VecDeque;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::error::{Error, Result};

/// Length of the sliding admission window.
pub const WINDOW: Duration = Duration::from_secs(60);

/// Throttle tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThrottleConfig {
    /// Maximum admissions per trailing 60-second window.
    pub requests_per_minute: u32,
    /// Smallest allowed inter-request gap; also the starting gap.
    pub gap_floor: Duration,
    /// Largest allowed inter-request gap.
    pub gap_ceiling: Duration,
    /// Gap multiplier after a failure (> 1).
    pub failure_backoff: f64,
    /// Gap multiplier after a success (< 1).
    pub success_recovery: f64,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        crate::options::EngineConfig::default().throttle_config()
    }
}

impl ThrottleConfig {
    /// Check the pacing values for consistency.
    pub fn validate(&self) -> Result<()> {
        if self.requests_per_minute == 0 {
            return Err(Error::Config("requests_per_minute must be > 0".into()));
        }
        if self.gap_floor.is_zero() {
            return Err(Error::Config("gap floor must be > 0".into()));
        }
        if self.gap_floor > self.gap_ceiling {
            return Err(Error::Config(format!(
                "gap floor ({:?}) exceeds gap ceiling ({:?})",
                self.gap_floor, self.gap_ceiling
            )));
        }
        if !(self.failure_backoff > 1.0 && self.failure_backoff.is_finite()) {
            return Err(Error::Config("failure_backoff must be a finite factor > 1".into()));
        }
        if !(self.success_recovery > 0.0 && self.success_recovery < 1.0) {
            return Err(Error::Config("success_recovery must be within (0, 1)".into()));
        }
        Ok(())
    }

    /// `gap * factor`, held within `[floor, ceiling]`.
    ///
    /// Products that do not fit a `Duration` saturate to the ceiling; NaN and
    /// negative products fall to the floor.
    fn scale(&self, gap: Duration, factor: f64) -> Duration {
        let secs = gap.as_secs_f64() * factor;
        let scaled = Duration::try_from_secs_f64(secs).unwrap_or(if secs > 0.0 {
            self.gap_ceiling
        } else {
            self.gap_floor
        });
        scaled.max(self.gap_floor).min(self.gap_ceiling)
    }
}

/// Throttle counters for status reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThrottleStats {
    pub requests_per_minute: u32,
    /// Total admissions since creation.
    pub admissions: u64,
    /// Admissions inside the current 60-second window.
    pub in_window: usize,
    pub successes: u64,
    pub failures: u64,
    pub current_gap: Duration,
    /// Sum of all waits returned by `acquire`.
    pub total_waited: Duration,
}

#[derive(Debug)]
struct ThrottleState {
    /// Timestamps of the most recent admissions, oldest first, at most
    /// `requests_per_minute` long.
    admissions: VecDeque<Instant>,
    gap: Duration,
    total_admissions: u64,
    successes: u64,
    failures: u64,
    total_waited: Duration,
}

impl ThrottleState {
    fn required_wait(&self, now: Instant, config: &ThrottleConfig) -> (Duration, Duration) {
        let budget = config.requests_per_minute.max(1) as usize;

        let window_wait = if self.admissions.len() >= budget {
            self.admissions
                .front()
                .map_or(Duration::ZERO, |oldest| (*oldest + WINDOW).saturating_duration_since(now))
        } else {
            Duration::ZERO
        };

        let gap_wait = self
            .admissions
            .back()
            .map_or(Duration::ZERO, |last| (*last + self.gap).saturating_duration_since(now));

        (window_wait, gap_wait)
    }

    fn admit(&mut self, at: Instant, budget: usize) {
        self.admissions.push_back(at);
        while self.admissions.len() > budget.max(1) {
            self.admissions.pop_front();
        }
        self.total_admissions += 1;
    }
}

/// Shared, internally serialized admission controller.
///
/// Wrap in an `Arc` to share between workers; every method takes `&self`.
/// Waiting callers hold only the admission turn, never the state lock, so
/// `record_outcome` and `stats` answer immediately even while an admission
/// is sleeping out the window.
#[derive(Debug)]
pub struct AdmissionThrottle {
    config: ThrottleConfig,
    /// Held by the one caller currently being admitted.
    turn: Mutex<()>,
    state: Mutex<ThrottleState>,
}

impl AdmissionThrottle {
    /// Build a throttle. Run [`ThrottleConfig::validate`] first when the
    /// values come from outside; out-of-range factors are clamped rather
    /// than rejected here.
    #[must_use]
    pub fn new(config: ThrottleConfig) -> Self {
        let state = ThrottleState {
            admissions: VecDeque::with_capacity(config.requests_per_minute as usize),
            gap: config.gap_floor,
            total_admissions: 0,
            successes: 0,
            failures: 0,
            total_waited: Duration::ZERO,
        };
        Self { config, turn: Mutex::new(()), state: Mutex::new(state) }
    }

    #[must_use]
    pub fn config(&self) -> &ThrottleConfig {
        &self.config
    }

    /// Wait until admitting the next request is safe, record the admission,
    /// and return how long the caller waited.
    ///
    /// Concurrent callers queue for the admission turn and are admitted one
    /// at a time, so every admission sees the previous one. The wait is
    /// re-evaluated after each sleep, so a gap widened by another worker's
    /// failure in the meantime still applies.
    pub async fn acquire(&self) -> Duration {
        let requested = Instant::now();
        let _turn = self.turn.lock().await;

        loop {
            let (window_wait, gap_wait) = self.state.lock().await.required_wait(Instant::now(), &self.config);
            let wait = window_wait.max(gap_wait);
            if wait.is_zero() {
                break;
            }
            debug!(
                wait_ms = wait.as_millis() as u64,
                window_ms = window_wait.as_millis() as u64,
                gap_ms = gap_wait.as_millis() as u64,
                "throttle delaying admission"
            );
            sleep(wait).await;
        }

        let admitted = Instant::now();
        let mut state = self.state.lock().await;
        state.admit(admitted, self.config.requests_per_minute as usize);

        let waited = admitted.saturating_duration_since(requested);
        state.total_waited += waited;
        waited
    }

    /// Adapt the minimum gap to the latest retrieval outcome.
    ///
    /// A failure multiplies the gap by `failure_backoff` (capped at the
    /// ceiling); a success multiplies it by `success_recovery` (held at the
    /// floor).
    pub async fn record_outcome(&self, success: bool) {
        let mut state = self.state.lock().await;
        let previous = state.gap;

        state.gap = if success {
            state.successes += 1;
            self.config.scale(previous, self.config.success_recovery)
        } else {
            state.failures += 1;
            self.config.scale(previous, self.config.failure_backoff)
        };

        if state.gap != previous {
            debug!(
                success,
                from_ms = previous.as_millis() as u64,
                gap_ms = state.gap.as_millis() as u64,
                "throttle gap adjusted"
            );
        }
    }

    /// Current minimum inter-request gap.
    pub async fn current_gap(&self) -> Duration {
        self.state.lock().await.gap
    }

    /// Counters and the current gap. An admission that is still waiting is
    /// not counted yet.
    pub async fn stats(&self) -> ThrottleStats {
        let state = self.state.lock().await;
        let now = Instant::now();
        let in_window = state
            .admissions
            .iter()
            .filter(|t| now.saturating_duration_since(**t) < WINDOW)
            .count();

        ThrottleStats {
            requests_per_minute: self.config.requests_per_minute,
            admissions: state.total_admissions,
            in_window,
            successes: state.successes,
            failures: state.failures,
            current_gap: state.gap,
            total_waited: state.total_waited,
        }
    }
}
