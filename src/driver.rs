//! Retrieval driver adapter.
//!
//! The browser is an external, stateful capability. The engine only relies
//! on [`BrowserDriver`]: navigate, wait for a condition, scroll to trigger
//! lazy content, and snapshot the DOM. Any automation backend (CDP,
//! WebDriver, a plain HTTP fetcher) can sit behind it, and
//! [`MockDriver`](crate::testing::MockDriver) serves canned pages in tests.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::Result;

/// HTTP-like status classification of a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageStatus {
    Success,
    ClientError,
    ServerError,
    Timeout,
}

impl PageStatus {
    /// Classify an HTTP status code. Anything below 400 counts as success.
    #[must_use]
    pub fn from_http(code: u16) -> Self {
        match code {
            400..=499 => Self::ClientError,
            500..=599 => Self::ServerError,
            _ => Self::Success,
        }
    }
}

/// Captured page state: markup, post-redirect URL, and status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomSnapshot {
    pub html: String,
    pub final_url: String,
    pub status: PageStatus,
    pub captured_at: DateTime<Utc>,
}

impl DomSnapshot {
    /// A successful snapshot captured now.
    pub fn new(html: impl Into<String>, final_url: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            final_url: final_url.into(),
            status: PageStatus::Success,
            captured_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn with_status(mut self, status: PageStatus) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn with_captured_at(mut self, captured_at: DateTime<Utc>) -> Self {
        self.captured_at = captured_at;
        self
    }
}

/// Result of a navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationOutcome {
    Loaded,
    Timeout,
    Failed(String),
}

impl NavigationOutcome {
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded)
    }
}

/// A single browser session.
///
/// A session is exclusively owned: navigation mutates its DOM state, so only
/// one request may use it at a time (`&mut self`). Timeouts are reported,
/// never raised; the caller snapshots whatever state exists.
#[async_trait]
pub trait BrowserDriver: Send {
    /// Load a URL.
    async fn navigate(&mut self, url: &Url) -> NavigationOutcome;

    /// Wait until an element matching `selector` is present.
    /// Returns `false` when the timeout elapsed first.
    async fn await_condition(&mut self, selector: &str, timeout: Duration) -> bool;

    /// Scroll to the bottom `iterations` times, settling `settle` after each.
    async fn trigger_lazy_load(&mut self, iterations: u32, settle: Duration);

    /// Capture the current markup, final URL and status.
    async fn snapshot(&mut self) -> DomSnapshot;

    /// Activate (click) the first element matching `selector`. Used by the
    /// pagination loop for next-page controls without an href.
    async fn click(&mut self, selector: &str) -> NavigationOutcome {
        NavigationOutcome::Failed(format!("click not supported by this driver: {selector}"))
    }

    /// Bring the session back to a neutral state after a failed or
    /// abandoned navigation, so the next request starts clean.
    async fn reset(&mut self) {}
}

#[async_trait]
impl<D: BrowserDriver + ?Sized> BrowserDriver for Box<D> {
    async fn navigate(&mut self, url: &Url) -> NavigationOutcome {
        (**self).navigate(url).await
    }

    async fn await_condition(&mut self, selector: &str, timeout: Duration) -> bool {
        (**self).await_condition(selector, timeout).await
    }

    async fn trigger_lazy_load(&mut self, iterations: u32, settle: Duration) {
        (**self).trigger_lazy_load(iterations, settle).await;
    }

    async fn snapshot(&mut self) -> DomSnapshot {
        (**self).snapshot().await
    }

    async fn click(&mut self, selector: &str) -> NavigationOutcome {
        (**self).click(selector).await
    }

    async fn reset(&mut self) {
        (**self).reset().await;
    }
}

/// Browser launch settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverConfig {
    pub headless: bool,
    pub user_agent: String,
    pub window_size: (u32, u32),
    pub page_load_timeout: Duration,
}

/// Launches independent browser sessions, one per pool worker.
#[async_trait]
pub trait DriverFactory: Send + Sync {
    type Driver: BrowserDriver + 'static;

    async fn launch(&self, config: &DriverConfig) -> Result<Self::Driver>;
}
