use rs_harvester::export::{results_summary_csv, table_to_csv, to_json_lines, to_json_pretty, write_json_lines};
use rs_harvester::{extract_html, ExtractionResult, ResultStatus, ScrapeOptions};

const URL: &str = "https://example.com/report";

fn report() -> ExtractionResult {
    let html = r#"<html><head><title>Q1 report, final</title></head><body>
        <table><tr><th>Region</th><th>Revenue</th></tr>
        <tr><td>North, East</td><td>1,200</td></tr>
        <tr><td>"South"</td><td>900</td></tr></table>
    </body></html>"#;
    extract_html(html, URL, &ScrapeOptions::default().with_selector("regions", "td:first-child")).expect("extracted")
}

#[test]
fn json_uses_camel_case_envelope() {
    let json = to_json_pretty(&report()).expect("json");
    let value: serde_json::Value = serde_json::from_str(&json).expect("valid json");

    assert_eq!(value["url"], URL);
    assert_eq!(value["status"], "success");
    assert!(value["data"]["tables"].is_array());
    assert!(value["data"]["structuredData"].is_array());
    assert_eq!(value["customData"]["regions"][0], "North, East");
}

#[test]
fn json_round_trips_results() {
    let original = report();
    let json = to_json_pretty(&original).expect("json");
    let parsed: ExtractionResult = serde_json::from_str(&json).expect("parsed");
    assert_eq!(parsed, original);
}

#[test]
fn json_lines_has_one_document_per_result() {
    let failed = ExtractionResult::failed(
        "https://example.com/missing",
        ResultStatus::NavigationError,
        "net::ERR_NAME_NOT_RESOLVED",
        &[],
    );
    let results = vec![report(), failed];

    let lines = to_json_lines(&results).expect("json lines");
    assert_eq!(lines.lines().count(), 2);

    let mut buffer = Vec::new();
    write_json_lines(&mut buffer, &results).expect("written");
    assert_eq!(String::from_utf8(buffer).expect("utf8"), lines);
}

#[test]
fn table_csv_quotes_fields() {
    let result = report();
    let tables = result.data.and_then(|d| d.tables).expect("tables");

    let csv = table_to_csv(&tables[0]).expect("csv");
    assert_eq!(csv, "Region,Revenue\r\n\"North, East\",\"1,200\"\r\n\"\"\"South\"\"\",900\r\n");
}

#[test]
fn summary_csv_lists_each_result() {
    let failed = ExtractionResult::failed("https://example.com/down", ResultStatus::ServerError, "503", &[]);
    let csv = results_summary_csv(&[report(), failed]);
    let lines: Vec<&str> = csv.split("\r\n").filter(|l| !l.is_empty()).collect();

    assert_eq!(lines[0], "url,status,title,word_count");
    assert!(lines[1].starts_with("https://example.com/report,success,\"Q1 report, final\","));
    assert_eq!(lines[2], "https://example.com/down,server_error,,0");
}
