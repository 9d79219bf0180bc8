//! Testing utilities: a scripted browser driver and a controllable clock.
//!
//! These let applications (and this crate's own tests) exercise the
//! orchestrator without a real browser or wall-clock waits.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use dom_query::Document;
use url::Url;

use crate::clock::Clock;
use crate::driver::{BrowserDriver, DomSnapshot, DriverConfig, DriverFactory, NavigationOutcome, PageStatus};
use crate::error::Result;

/// How a canned page responds to navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockBehavior {
    /// Loads normally.
    Load,
    /// Reports a navigation timeout; the partial page is still snapshotable.
    NavigationTimeout,
    /// Reports a navigation failure (DNS, connection refused).
    NavigationError(String),
    /// Never finishes navigating. Used to exercise request deadlines.
    Hang,
    /// Panics inside `navigate`, taking the calling pool worker down.
    Panic,
}

/// A canned page.
#[derive(Debug, Clone)]
pub struct MockPage {
    pub html: String,
    pub status: PageStatus,
    /// Post-redirect URL, when different from the requested one.
    pub final_url: Option<String>,
    pub behavior: MockBehavior,
    /// Markup served after `trigger_lazy_load`.
    pub lazy_html: Option<String>,
    /// Page reached by `click` on this page.
    pub click_target: Option<String>,
}

impl MockPage {
    pub fn new(html: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            status: PageStatus::Success,
            final_url: None,
            behavior: MockBehavior::Load,
            lazy_html: None,
            click_target: None,
        }
    }

    #[must_use]
    pub fn with_status(mut self, status: PageStatus) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn with_behavior(mut self, behavior: MockBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    #[must_use]
    pub fn with_redirect(mut self, final_url: impl Into<String>) -> Self {
        self.final_url = Some(final_url.into());
        self
    }

    #[must_use]
    pub fn with_lazy_html(mut self, html: impl Into<String>) -> Self {
        self.lazy_html = Some(html.into());
        self
    }

    #[must_use]
    pub fn with_click_target(mut self, url: impl Into<String>) -> Self {
        self.click_target = Some(url.into());
        self
    }
}

/// Per-method call counts of a [`MockDriver`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MockCallCounts {
    pub navigate: usize,
    pub await_condition: usize,
    pub trigger_lazy_load: usize,
    pub snapshot: usize,
    pub click: usize,
    pub reset: usize,
}

impl MockCallCounts {
    /// Calls that touch the page (everything but `reset`).
    #[must_use]
    pub fn retrieval_calls(&self) -> usize {
        self.navigate + self.await_condition + self.trigger_lazy_load + self.snapshot + self.click
    }
}

#[derive(Debug, Default)]
struct MockState {
    pages: HashMap<String, MockPage>,
    counts: MockCallCounts,
    navigations: Vec<String>,
}

/// Scripted [`BrowserDriver`].
///
/// Clones share canned pages and call records, so a test can keep one
/// handle for assertions while the orchestrator owns another. The current
/// page is per clone, like a separate browser session.
#[derive(Debug, Clone, Default)]
pub struct MockDriver {
    state: Arc<RwLock<MockState>>,
    current: Option<Current>,
}

#[derive(Debug, Clone)]
struct Current {
    url: String,
    scrolled: bool,
}

fn page_key(url: &str) -> String {
    Url::parse(url.trim()).map_or_else(|_| url.trim().to_string(), String::from)
}

impl MockDriver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `page` for `url`.
    pub fn add_page(&self, url: &str, page: MockPage) {
        self.write().pages.insert(page_key(url), page);
    }

    #[must_use]
    pub fn with_page(self, url: &str, page: MockPage) -> Self {
        self.add_page(url, page);
        self
    }

    /// Serve successful HTML for `url`.
    #[must_use]
    pub fn with_html(self, url: &str, html: impl Into<String>) -> Self {
        self.with_page(url, MockPage::new(html))
    }

    pub fn calls(&self) -> MockCallCounts {
        self.read().counts
    }

    /// URLs passed to `navigate` (or reached by `click`), in order.
    pub fn navigations(&self) -> Vec<String> {
        self.read().navigations.clone()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, MockState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, MockState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn current_page(&self) -> Option<(Current, MockPage)> {
        let current = self.current.clone()?;
        let page = self.read().pages.get(&current.url).cloned()?;
        Some((current, page))
    }

    fn current_html(&self) -> Option<String> {
        self.current_page().map(|(current, page)| match page.lazy_html {
            Some(lazy) if current.scrolled => lazy,
            _ => page.html,
        })
    }
}

#[async_trait]
impl BrowserDriver for MockDriver {
    async fn navigate(&mut self, url: &Url) -> NavigationOutcome {
        let key = page_key(url.as_str());
        let page = {
            let mut state = self.write();
            state.counts.navigate += 1;
            state.navigations.push(key.clone());
            state.pages.get(&key).cloned()
        };

        let Some(page) = page else {
            self.current = None;
            return NavigationOutcome::Failed(format!("net::ERR_NAME_NOT_RESOLVED at {url}"));
        };

        match page.behavior {
            MockBehavior::Load => {
                self.current = Some(Current { url: key, scrolled: false });
                NavigationOutcome::Loaded
            }
            MockBehavior::NavigationTimeout => {
                self.current = Some(Current { url: key, scrolled: false });
                NavigationOutcome::Timeout
            }
            MockBehavior::NavigationError(reason) => {
                self.current = None;
                NavigationOutcome::Failed(reason)
            }
            MockBehavior::Hang => {
                tokio::time::sleep(Duration::from_secs(24 * 3600)).await;
                NavigationOutcome::Timeout
            }
            MockBehavior::Panic => panic!("mock browser crashed navigating {url}"),
        }
    }

    async fn await_condition(&mut self, selector: &str, _timeout: Duration) -> bool {
        self.write().counts.await_condition += 1;
        self.current_html()
            .is_some_and(|html| Document::from(html.as_str()).select(selector).length() > 0)
    }

    async fn trigger_lazy_load(&mut self, _iterations: u32, _settle: Duration) {
        self.write().counts.trigger_lazy_load += 1;
        if let Some(ref mut current) = self.current {
            current.scrolled = true;
        }
    }

    async fn snapshot(&mut self) -> DomSnapshot {
        self.write().counts.snapshot += 1;

        match self.current_page() {
            Some((current, page)) => {
                let status = if page.behavior == MockBehavior::NavigationTimeout {
                    PageStatus::Timeout
                } else {
                    page.status
                };
                let html = match page.lazy_html {
                    Some(lazy) if current.scrolled => lazy,
                    _ => page.html,
                };
                DomSnapshot::new(html, page.final_url.unwrap_or(current.url)).with_status(status)
            }
            None => DomSnapshot::new("", "about:blank").with_status(PageStatus::ClientError),
        }
    }

    async fn click(&mut self, selector: &str) -> NavigationOutcome {
        self.write().counts.click += 1;

        let Some((_, page)) = self.current_page() else {
            return NavigationOutcome::Failed("no page loaded".into());
        };
        let present = Document::from(page.html.as_str()).select(selector).length() > 0;
        let Some(target) = page.click_target.filter(|_| present) else {
            return NavigationOutcome::Failed(format!("nothing clickable at {selector:?}"));
        };

        let key = page_key(&target);
        let known = {
            let mut state = self.write();
            state.navigations.push(key.clone());
            state.pages.contains_key(&key)
        };
        if !known {
            return NavigationOutcome::Failed(format!("click led to unknown page {key}"));
        }
        self.current = Some(Current { url: key, scrolled: false });
        NavigationOutcome::Loaded
    }

    async fn reset(&mut self) {
        self.write().counts.reset += 1;
        self.current = None;
    }
}

/// Launches [`MockDriver`] sessions that share one script.
#[derive(Debug, Clone, Default)]
pub struct MockDriverFactory {
    template: MockDriver,
    launches: Arc<Mutex<usize>>,
}

impl MockDriverFactory {
    #[must_use]
    pub fn new(template: MockDriver) -> Self {
        Self { template, launches: Arc::default() }
    }

    /// Number of sessions launched so far.
    pub fn launches(&self) -> usize {
        *self.launches.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl DriverFactory for MockDriverFactory {
    type Driver = MockDriver;

    async fn launch(&self, _config: &DriverConfig) -> Result<MockDriver> {
        *self.launches.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        let mut driver = self.template.clone();
        driver.current = None;
        Ok(driver)
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl Default for ManualClock {
    /// Starts at 2024-01-01T00:00:00Z.
    fn default() -> Self {
        Self::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single().unwrap_or(DateTime::UNIX_EPOCH))
    }
}

impl ManualClock {
    #[must_use]
    pub fn new(start: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(start) }
    }

    pub fn advance(&self, by: Duration) {
        let delta = TimeDelta::from_std(by).unwrap_or(TimeDelta::MAX);
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now = now.checked_add_signed(delta).unwrap_or(DateTime::<Utc>::MAX_UTC);
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).expect("valid url")
    }

    #[tokio::test]
    async fn test_mock_serves_pages_and_counts_calls() {
        let handle = MockDriver::new().with_html("https://example.com", "<p id='x'>hi</p>");
        let mut driver = handle.clone();

        assert_eq!(driver.navigate(&url("https://example.com/")).await, NavigationOutcome::Loaded);
        assert!(driver.await_condition("#x", Duration::from_secs(1)).await);
        assert!(!driver.await_condition("#y", Duration::from_secs(1)).await);
        let snap = driver.snapshot().await;

        assert!(snap.html.contains("hi"));
        assert_eq!(snap.status, PageStatus::Success);
        assert_eq!(handle.calls().navigate, 1);
        assert_eq!(handle.calls().await_condition, 2);
        assert_eq!(handle.calls().snapshot, 1);
    }

    #[tokio::test]
    async fn test_unknown_url_fails_navigation() {
        let mut driver = MockDriver::new();
        let outcome = driver.navigate(&url("https://nowhere.example/")).await;
        assert!(matches!(outcome, NavigationOutcome::Failed(_)));
    }

    #[tokio::test]
    async fn test_lazy_html_after_scroll() {
        let mut driver = MockDriver::new().with_page(
            "https://example.com/feed",
            MockPage::new("<li>1</li>").with_lazy_html("<li>1</li><li>2</li>"),
        );
        driver.navigate(&url("https://example.com/feed")).await;
        driver.trigger_lazy_load(3, Duration::from_millis(10)).await;
        assert!(driver.snapshot().await.html.contains("<li>2</li>"));
    }

    #[test]
    fn test_manual_clock_advances() {
        let clock = ManualClock::default();
        let start = clock.now();
        clock.advance(Duration::from_secs(90));
        assert_eq!((clock.now() - start).num_seconds(), 90);
    }
}
