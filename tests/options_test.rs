use rs_harvester::{EngineConfig, Error, ScrapeOptions, ScrapeRequest, SelectorSpec};

#[test]
fn scrape_options_default_values_are_sensible() {
    let options = ScrapeOptions::default();
    assert!(options.selectors.is_empty());
    assert!(options.extract_all);
    assert!(options.wait_for_selector.is_none());
    assert!(!options.scroll);
    assert!(options.use_cache);
    assert!(options.runs_generic_extraction());
}

#[test]
fn engine_config_struct_update_syntax_overrides_selected_fields_only() {
    let config = EngineConfig {
        requests_per_minute: 12,
        cache_enabled: false,
        ..EngineConfig::default()
    };

    assert_eq!(config.requests_per_minute, 12);
    assert!(config.cache_ttl().is_zero());
    assert_eq!(config.gap_floor_ms, 2_000);
    assert!(config.validate().is_ok());
}

#[test]
fn engine_config_rejects_inconsistent_values() {
    for config in [
        EngineConfig { requests_per_minute: 0, ..EngineConfig::default() },
        EngineConfig { gap_floor_ms: 30_000, ..EngineConfig::default() },
        EngineConfig { failure_backoff: 0.5, ..EngineConfig::default() },
        EngineConfig { success_recovery: 1.2, ..EngineConfig::default() },
        EngineConfig { workers: 0, ..EngineConfig::default() },
    ] {
        assert!(matches!(config.validate(), Err(Error::Config(_))), "{config:?}");
    }
}

#[test]
fn engine_config_loads_partial_json() {
    let config: EngineConfig =
        serde_json::from_str(r#"{"requests_per_minute": 6, "cache_ttl_hours": 1}"#).expect("parsed");
    assert_eq!(config.requests_per_minute, 6);
    assert_eq!(config.cache_ttl().as_secs(), 3_600);
    assert!(config.headless);
}

#[test]
fn request_envelope_uses_camel_case_names() {
    let request: ScrapeRequest = serde_json::from_str(
        r#"{
            "url": "https://example.com/products",
            "selectors": {"name": "h2.title", "link": "a.product@href"},
            "extractAll": false,
            "waitForSelector": ".grid",
            "useCache": false
        }"#,
    )
    .expect("parsed");

    assert_eq!(request.url, "https://example.com/products");
    assert!(!request.options.extract_all);
    assert!(!request.options.use_cache);
    assert!(!request.options.scroll);
    assert_eq!(request.options.wait_for_selector.as_deref(), Some(".grid"));
    assert_eq!(
        request.options.selectors.keys().collect::<Vec<_>>(),
        vec!["name", "link"]
    );
}

#[test]
fn selector_attribute_suffix_is_parsed() {
    let spec = SelectorSpec::parse("a.product @href");
    assert_eq!(spec.css, "a.product");
    assert_eq!(spec.attribute.as_deref(), Some("href"));

    let plain = SelectorSpec::parse(r#"a[href*="@"]"#);
    assert_eq!(plain.css, r#"a[href*="@"]"#);
    assert!(plain.attribute.is_none());
}

#[test]
fn invalid_wait_selector_is_rejected() {
    let options = ScrapeOptions::default().with_wait_for("div[");
    match options.validate() {
        Err(Error::InvalidSelector { name, .. }) => assert_eq!(name, "waitForSelector"),
        other => panic!("expected InvalidSelector, got {other:?}"),
    }
}
