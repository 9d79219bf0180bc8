//! Orchestrator.
//!
//! Per request: check the cache, and on a miss take a throttle admission,
//! drive the browser (navigate, optional wait, optional scroll, snapshot)
//! under an overall deadline, extract, feed the outcome back to the
//! throttle, and store successful results.
//!
//! Retrieval problems never escape as errors. They come back as an
//! [`ExtractionResult`] with a non-success status and a reason, so batches
//! keep going. Only invalid URLs, selectors and configuration are errors.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use url::Url;

use crate::cache::{CacheStats, Fingerprint, FreshnessCache};
use crate::dom;
use crate::driver::{BrowserDriver, DomSnapshot, DriverFactory, NavigationOutcome, PageStatus};
use crate::error::{Error, Result};
use crate::extractor::{find_next_control, Extractor, NextControl};
use crate::options::{EngineConfig, PaginationOptions, ScrapeOptions, ScrapeRequest};
use crate::result::{ExtractionResult, PaginatedResult, PaginationStop, ResultStatus};
use crate::throttle::{AdmissionThrottle, ThrottleStats};
use crate::url_utils::{normalize_url, parse_request_url};

/// Engine status report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScraperStatus {
    pub headless: bool,
    pub workers: usize,
    pub throttle: ThrottleStats,
    pub cache: CacheStats,
}

/// How the browser reaches the page to capture.
enum Advance<'a> {
    Navigate(&'a Url),
    Click(&'a str),
}

/// Owned form of the next pagination move.
enum Step {
    Navigate(Url),
    Click(String),
}

/// What one retrieval produced.
enum Retrieval {
    Captured {
        snapshot: DomSnapshot,
        condition_timed_out: Option<String>,
    },
    Failed {
        status: ResultStatus,
        reason: String,
    },
}

impl Retrieval {
    fn reached_success(&self) -> bool {
        matches!(self, Self::Captured { snapshot, .. } if snapshot.status == PageStatus::Success)
    }
}

/// Single-session orchestrator.
///
/// Owns one browser session exclusively; requests through it run one at a
/// time. The throttle and cache are shared handles so several scrapers (see
/// [`ScraperPool`]) can pace and cache together.
pub struct Scraper<D: BrowserDriver> {
    driver: D,
    throttle: Arc<AdmissionThrottle>,
    cache: Arc<FreshnessCache>,
    extractor: Extractor,
    config: EngineConfig,
}

impl<D: BrowserDriver> Scraper<D> {
    /// Build a scraper with its own throttle and cache.
    pub fn new(driver: D, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let cache = Arc::new(FreshnessCache::from_config(&config)?);
        let throttle = Arc::new(AdmissionThrottle::new(config.throttle_config()));
        Self::with_shared(driver, config, throttle, cache)
    }

    /// Build a scraper on an existing throttle and cache.
    pub fn with_shared(
        driver: D,
        config: EngineConfig,
        throttle: Arc<AdmissionThrottle>,
        cache: Arc<FreshnessCache>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            driver,
            throttle,
            cache,
            extractor: Extractor::from_config(&config),
            config,
        })
    }

    /// Replace the extractor (article scoring, text cap).
    #[must_use]
    pub fn with_extractor(mut self, extractor: Extractor) -> Self {
        self.extractor = extractor;
        self
    }

    #[must_use]
    pub fn driver(&self) -> &D {
        &self.driver
    }

    #[must_use]
    pub fn cache(&self) -> &Arc<FreshnessCache> {
        &self.cache
    }

    #[must_use]
    pub fn throttle(&self) -> &Arc<AdmissionThrottle> {
        &self.throttle
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Scrape one URL.
    ///
    /// A live cache entry is returned without touching the throttle or the
    /// browser. Otherwise the page is retrieved and extracted; only results
    /// with `status = success` are cached.
    pub async fn scrape(&mut self, request: &ScrapeRequest) -> Result<ExtractionResult> {
        let url = parse_request_url(&request.url)?;
        let options = &request.options;
        options.validate()?;

        let fingerprint = Fingerprint::of(&url, options);
        if options.use_cache {
            if let Some(entry) = self.cache.lookup(&fingerprint) {
                info!(url = %url, "served from cache");
                return Ok(entry.value);
            }
        }

        let retrieval = self.retrieve(Advance::Navigate(&url), options).await;
        let result = self.assemble(&request.url, retrieval, options)?;

        if options.use_cache && result.is_success() {
            self.cache.store(fingerprint, result.clone(), self.cache.ttl());
        }
        Ok(result)
    }

    /// Scrape a URL with default options.
    pub async fn scrape_url(&mut self, url: &str) -> Result<ExtractionResult> {
        self.scrape(&ScrapeRequest::new(url)).await
    }

    /// Scrape requests one after another, one result per request in input
    /// order. A request that cannot even start (bad URL or selector) becomes
    /// an `invalid_request` result instead of stopping the batch.
    pub async fn scrape_multiple(&mut self, requests: &[ScrapeRequest]) -> Vec<ExtractionResult> {
        let total = requests.len();
        let mut results = Vec::with_capacity(total);

        for (i, request) in requests.iter().enumerate() {
            info!("[{}/{}] scraping {}", i + 1, total, request.url);
            results.push(self.scrape_or_degrade(request).await);
        }

        let failed = results.iter().filter(|r| !r.is_success()).count();
        info!(total, failed, "batch finished");
        results
    }

    /// [`scrape_multiple`](Self::scrape_multiple) over plain URLs sharing one set of options.
    pub async fn scrape_urls<S: AsRef<str>>(&mut self, urls: &[S], options: &ScrapeOptions) -> Vec<ExtractionResult> {
        let requests: Vec<ScrapeRequest> = urls
            .iter()
            .map(|u| ScrapeRequest::new(u.as_ref()).with_options(options.clone()))
            .collect();
        self.scrape_multiple(&requests).await
    }

    async fn scrape_or_degrade(&mut self, request: &ScrapeRequest) -> ExtractionResult {
        match self.scrape(request).await {
            Ok(result) => result,
            Err(e) => {
                warn!(url = %request.url, error = %e, "request rejected");
                ExtractionResult::failed(
                    &request.url,
                    ResultStatus::InvalidRequest,
                    e.to_string(),
                    request.options.selectors.keys(),
                )
            }
        }
    }

    /// Follow next-page controls from `request.url`, extracting every page.
    ///
    /// Stops when the current page has no next control or a disabled one,
    /// when the page cap is reached, when advancing returns to a visited
    /// page, or when a page fails to load. Pagination pages bypass the cache.
    pub async fn scrape_paginated(
        &mut self,
        request: &ScrapeRequest,
        pagination: &PaginationOptions,
    ) -> Result<PaginatedResult> {
        let start = parse_request_url(&request.url)?;
        let options = &request.options;
        options.validate()?;
        if let Some(ref selector) = pagination.next_selector {
            if dom_query::Matcher::new(selector).is_err() {
                return Err(Error::InvalidSelector {
                    name: "nextSelector".to_string(),
                    selector: selector.clone(),
                });
            }
        }

        let cap = pagination.max_pages.unwrap_or(self.config.max_pages).max(1);
        let mut pages: Vec<ExtractionResult> = Vec::new();
        let mut visited_urls: HashSet<String> = HashSet::new();
        let mut seen_content: HashSet<String> = HashSet::new();
        let mut step = Some(Step::Navigate(start.clone()));

        let stop_reason = loop {
            let Some(current) = step.take() else {
                break PaginationStop::NoNextControl;
            };

            let (label, retrieval) = match current {
                Step::Navigate(url) => {
                    visited_urls.insert(normalize_url(&url));
                    let label = if pages.is_empty() { request.url.clone() } else { url.to_string() };
                    (Some(label), self.retrieve(Advance::Navigate(&url), options).await)
                }
                Step::Click(selector) => (None, self.retrieve(Advance::Click(&selector), options).await),
            };

            let Retrieval::Captured { ref snapshot, .. } = retrieval else {
                let label = label.unwrap_or_else(|| request.url.clone());
                pages.push(self.assemble(&label, retrieval, options)?);
                break PaginationStop::RetrievalFailed;
            };
            let html = snapshot.html.clone();
            let final_url = snapshot.final_url.clone();

            // A click that leaves the page unchanged would loop forever.
            if !seen_content.insert(content_digest(&html)) {
                debug!(url = %final_url, "pagination reached an already extracted page");
                break PaginationStop::Cycle;
            }

            let page_url = Url::parse(&final_url).ok();
            if let Some(ref page_url) = page_url {
                visited_urls.insert(normalize_url(page_url));
            }

            let label = label.unwrap_or_else(|| final_url.clone());
            pages.push(self.assemble(&label, retrieval, options)?);
            info!(page = pages.len(), url = %label, "pagination page extracted");

            if pages.len() >= cap {
                break PaginationStop::PageCap;
            }

            let base = page_url.unwrap_or_else(|| start.clone());
            match next_control(&html, &base, pagination.next_selector.as_deref()) {
                None => break PaginationStop::NoNextControl,
                Some(control) if control.disabled => break PaginationStop::NextControlDisabled,
                Some(NextControl { href: Some(href), .. }) => {
                    if visited_urls.contains(&normalize_url(&href)) {
                        break PaginationStop::Cycle;
                    }
                    step = Some(Step::Navigate(href));
                }
                Some(NextControl { click_selector: Some(selector), .. }) => step = Some(Step::Click(selector)),
                Some(_) => break PaginationStop::NoNextControl,
            }
        };

        info!(url = %request.url, pages = pages.len(), ?stop_reason, "pagination finished");
        Ok(PaginatedResult { url: request.url.clone(), pages, stop_reason })
    }

    /// Throttle and cache statistics.
    pub async fn status(&self) -> ScraperStatus {
        ScraperStatus {
            headless: self.config.headless,
            workers: 1,
            throttle: self.throttle.stats().await,
            cache: self.cache.stats(),
        }
    }

    /// One throttled, deadline-bounded retrieval.
    async fn retrieve(&mut self, advance: Advance<'_>, options: &ScrapeOptions) -> Retrieval {
        let waited = self.throttle.acquire().await;
        if !waited.is_zero() {
            debug!(waited_ms = waited.as_millis() as u64, "admitted after throttle wait");
        }

        let deadline = self.config.request_deadline();
        let retrieval = match tokio::time::timeout(deadline, self.drive(&advance, options)).await {
            Ok(retrieval) => retrieval,
            Err(_) => {
                warn!(deadline_ms = deadline.as_millis() as u64, "request deadline exceeded");
                Retrieval::Failed {
                    status: ResultStatus::Timeout,
                    reason: format!("request deadline of {} ms exceeded", deadline.as_millis()),
                }
            }
        };

        if matches!(retrieval, Retrieval::Failed { .. }) {
            self.driver.reset().await;
        }
        self.throttle.record_outcome(retrieval.reached_success()).await;
        retrieval
    }

    /// Browser steps of one retrieval.
    async fn drive(&mut self, advance: &Advance<'_>, options: &ScrapeOptions) -> Retrieval {
        let (target, outcome) = match *advance {
            Advance::Navigate(url) => (url.to_string(), self.driver.navigate(url).await),
            Advance::Click(selector) => (format!("click {selector:?}"), self.driver.click(selector).await),
        };

        let navigation_timed_out = match outcome {
            NavigationOutcome::Loaded => false,
            NavigationOutcome::Timeout => {
                warn!(page = %target, "{}", Error::NavigationTimeout { url: target.clone() });
                true
            }
            NavigationOutcome::Failed(reason) => {
                let error = Error::NavigationError { url: target, reason };
                warn!(error = %error, "navigation failed");
                return Retrieval::Failed { status: ResultStatus::NavigationError, reason: error.to_string() };
            }
        };

        let mut condition_timed_out = None;
        if !navigation_timed_out {
            if let Some(ref selector) = options.wait_for_selector {
                if !self.driver.await_condition(selector, self.config.condition_timeout()).await {
                    let error = Error::ConditionTimeout { selector: selector.clone() };
                    warn!(error = %error, "continuing with current page state");
                    condition_timed_out = Some(error.to_string());
                }
            }
            if options.scroll {
                self.driver
                    .trigger_lazy_load(self.config.lazy_load_iterations, self.config.lazy_load_settle())
                    .await;
            }
        }

        let mut snapshot = self.driver.snapshot().await;
        if navigation_timed_out {
            snapshot.status = PageStatus::Timeout;
        }
        debug!(final_url = %snapshot.final_url, status = ?snapshot.status, bytes = snapshot.html.len(), "snapshot captured");

        Retrieval::Captured { snapshot, condition_timed_out }
    }

    /// Turn a retrieval into a result envelope.
    fn assemble(&self, url: &str, retrieval: Retrieval, options: &ScrapeOptions) -> Result<ExtractionResult> {
        match retrieval {
            Retrieval::Failed { status, reason } => Ok(ExtractionResult::failed(
                url,
                status,
                reason,
                options.selectors.keys(),
            )),
            Retrieval::Captured { snapshot, condition_timed_out } => {
                let mut result = self.extractor.extract(&snapshot, url, options)?;
                if let Some(reason) = condition_timed_out {
                    if result.status == ResultStatus::Success {
                        result.status = ResultStatus::ConditionTimeout;
                        result.reason = Some(reason.clone());
                    }
                    result.warnings.push(reason);
                }
                Ok(result)
            }
        }
    }
}

/// Next-page control of a captured page.
fn next_control(html: &str, base: &Url, selector: Option<&str>) -> Option<NextControl> {
    let doc = dom::parse(html);
    find_next_control(&doc, base, selector)
}

fn content_digest(html: &str) -> String {
    hex::encode(Sha256::digest(html.as_bytes()))
}

/// Bounded worker pool: each worker owns its own browser session; all share
/// one throttle and one cache.
pub struct ScraperPool<F: DriverFactory> {
    factory: F,
    config: EngineConfig,
    throttle: Arc<AdmissionThrottle>,
    cache: Arc<FreshnessCache>,
    extractor: Extractor,
}

impl<F: DriverFactory> ScraperPool<F> {
    pub fn new(factory: F, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            factory,
            throttle: Arc::new(AdmissionThrottle::new(config.throttle_config())),
            cache: Arc::new(FreshnessCache::from_config(&config)?),
            extractor: Extractor::from_config(&config),
            config,
        })
    }

    #[must_use]
    pub fn cache(&self) -> &Arc<FreshnessCache> {
        &self.cache
    }

    #[must_use]
    pub fn throttle(&self) -> &Arc<AdmissionThrottle> {
        &self.throttle
    }

    /// Scrape all requests with up to `config.workers` sessions.
    ///
    /// Results come back in input order regardless of completion order.
    /// Fails only when no browser session can be launched.
    pub async fn scrape_multiple(&self, requests: Vec<ScrapeRequest>) -> Result<Vec<ExtractionResult>> {
        let total = requests.len();
        if total == 0 {
            return Ok(Vec::new());
        }

        // URL and selector names per slot, for results a lost worker never produced.
        let labels: Vec<(String, Vec<String>)> = requests
            .iter()
            .map(|r| (r.url.clone(), r.options.selectors.keys().cloned().collect()))
            .collect();
        let queue: Arc<Mutex<VecDeque<(usize, ScrapeRequest)>>> =
            Arc::new(Mutex::new(requests.into_iter().enumerate().collect()));
        let slots: Arc<Mutex<Vec<Option<ExtractionResult>>>> = Arc::new(Mutex::new(vec![None; total]));
        let driver_config = self.config.driver_config();
        let worker_count = self.config.workers.min(total).max(1);

        let mut workers = JoinSet::new();
        for worker in 0..worker_count {
            let driver = match self.factory.launch(&driver_config).await {
                Ok(driver) => driver,
                Err(e) if workers.is_empty() => return Err(e),
                Err(e) => {
                    warn!(worker, error = %e, "browser launch failed, continuing with fewer workers");
                    break;
                }
            };

            let mut scraper = Scraper::with_shared(
                driver,
                self.config.clone(),
                Arc::clone(&self.throttle),
                Arc::clone(&self.cache),
            )?
            .with_extractor(self.extractor.clone());
            let queue = Arc::clone(&queue);
            let slots = Arc::clone(&slots);

            workers.spawn(async move {
                loop {
                    let next = queue.lock().await.pop_front();
                    let Some((index, request)) = next else {
                        break;
                    };
                    info!(worker, "[{}/{}] scraping {}", index + 1, total, request.url);
                    let result = scraper.scrape_or_degrade(&request).await;
                    slots.lock().await[index] = Some(result);
                }
            });
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "scrape worker aborted");
            }
        }

        // Requests held or still queued by an aborted worker are reported, not dropped.
        let slots = std::mem::take(&mut *slots.lock().await);
        Ok(slots
            .into_iter()
            .zip(labels)
            .map(|(slot, (url, names))| {
                slot.unwrap_or_else(|| {
                    ExtractionResult::failed(url, ResultStatus::NavigationError, "scrape worker aborted", &names)
                })
            })
            .collect())
    }

    /// Throttle and cache statistics.
    pub async fn status(&self) -> ScraperStatus {
        ScraperStatus {
            headless: self.config.headless,
            workers: self.config.workers,
            throttle: self.throttle.stats().await,
            cache: self.cache.stats(),
        }
    }
}
