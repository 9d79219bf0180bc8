use std::sync::Arc;
use std::time::Duration;

use rs_harvester::cache::{DiskBackend, MemoryBackend};
use rs_harvester::testing::ManualClock;
use rs_harvester::{extract_html, ExtractionResult, Fingerprint, FreshnessCache, ScrapeOptions};
use url::Url;

const HOUR: Duration = Duration::from_secs(3600);

fn page(url: &str) -> ExtractionResult {
    extract_html("<html><head><title>Cached</title></head><body><p>x</p></body></html>", url, &ScrapeOptions::default())
        .expect("extracted")
}

fn fingerprint(url: &str, options: &ScrapeOptions) -> Fingerprint {
    Fingerprint::of(&Url::parse(url).expect("valid url"), options)
}

#[test]
fn cache_serves_stored_result_until_ttl_elapses() {
    let clock = Arc::new(ManualClock::default());
    let cache = FreshnessCache::new(24 * HOUR).with_clock(clock.clone());
    let url = "https://example.com/a";
    let fp = fingerprint(url, &ScrapeOptions::default());

    cache.store(fp.clone(), page(url), cache.ttl());
    clock.advance(23 * HOUR);
    let hit = cache.lookup(&fp).expect("fresh entry");
    assert_eq!(hit.value.title(), Some("Cached"));

    clock.advance(2 * HOUR);
    assert!(cache.lookup(&fp).is_none());
    assert_eq!(cache.stats().entries, 0, "expired entry evicted on lookup");
}

#[test]
fn cache_entry_ttl_overrides_default() {
    let clock = Arc::new(ManualClock::default());
    let cache = FreshnessCache::new(24 * HOUR).with_clock(clock.clone());
    let fp = fingerprint("https://example.com/short", &ScrapeOptions::default());

    cache.store(fp.clone(), page("https://example.com/short"), Duration::from_secs(60));
    clock.advance(Duration::from_secs(61));
    assert!(cache.lookup(&fp).is_none());
}

#[test]
fn cache_keys_depend_on_selectors_and_mode() {
    let url = "https://example.com/product";
    let plain = ScrapeOptions::default();
    let with_price = ScrapeOptions::default().with_selector("price", ".price");
    let custom_only = with_price.clone().with_extract_all(false);

    assert_ne!(fingerprint(url, &plain), fingerprint(url, &with_price));
    assert_ne!(fingerprint(url, &with_price), fingerprint(url, &custom_only));
    assert_eq!(
        fingerprint(url, &plain),
        fingerprint("https://EXAMPLE.com/product#reviews", &plain.clone().with_scroll(true))
    );
}

#[test]
fn disabled_cache_never_hits() {
    let cache = FreshnessCache::disabled();
    let fp = fingerprint("https://example.com/", &ScrapeOptions::default());

    cache.store(fp.clone(), page("https://example.com/"), HOUR);
    assert!(cache.lookup(&fp).is_none());
    assert!(!cache.stats().enabled);
    assert_eq!(cache.stats().entries, 0);
}

#[test]
fn sweep_and_stats_report_ages() {
    let clock = Arc::new(ManualClock::default());
    let cache =
        FreshnessCache::with_backend(Box::new(MemoryBackend::new()), 24 * HOUR).with_clock(clock.clone());
    let options = ScrapeOptions::default();

    cache.store(fingerprint("https://example.com/old", &options), page("https://example.com/old"), 24 * HOUR);
    clock.advance(25 * HOUR);
    cache.store(fingerprint("https://example.com/new", &options), page("https://example.com/new"), 24 * HOUR);
    clock.advance(2 * HOUR);

    let stats = cache.stats();
    assert_eq!(stats.entries, 2);
    assert_eq!(stats.expired, 1);
    assert_eq!(stats.age_histogram.from_1h_to_6h, 1);
    assert_eq!(stats.age_histogram.over_24h, 1);

    assert_eq!(cache.sweep_expired(), 1);
    assert_eq!(cache.stats().entries, 1);

    cache.clear();
    assert_eq!(cache.stats().entries, 0);
}

#[test]
fn disk_cache_survives_reopen() {
    let dir = tempfile::tempdir().expect("temp dir");
    let url = "https://example.com/durable";
    let fp = fingerprint(url, &ScrapeOptions::default());

    {
        let cache = FreshnessCache::with_backend(Box::new(DiskBackend::open(dir.path()).expect("open")), 24 * HOUR);
        cache.store(fp.clone(), page(url), cache.ttl());
    }

    let reopened = FreshnessCache::with_backend(Box::new(DiskBackend::open(dir.path()).expect("reopen")), 24 * HOUR);
    let entry = reopened.lookup(&fp).expect("entry persisted");
    assert_eq!(entry.url, url);
    assert_eq!(entry.value.title(), Some("Cached"));
    assert_eq!(entry.ttl, 24 * HOUR);
}
