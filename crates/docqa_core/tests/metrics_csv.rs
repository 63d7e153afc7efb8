use std::time::Duration;

use docqa_core::config::Pricing;
use docqa_core::metrics::{append_metrics_csv, estimate_cost, RequestMetrics};
use pretty_assertions::assert_eq;

#[test]
fn appends_rows_under_a_single_header() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("outputs").join("metrics.csv");

    let cost = estimate_cost(&Pricing::default(), 1200, 150);
    let first = RequestMetrics::new(
        "2026-01-01 10:00:00".to_string(),
        Duration::from_millis(250),
        1200,
        150,
        cost,
    );
    let second = RequestMetrics::new(
        "2026-01-01 10:05:00".to_string(),
        Duration::from_millis(1000),
        0,
        0,
        0.0,
    );
    append_metrics_csv(&path, &first).expect("first append");
    append_metrics_csv(&path, &second).expect("second append");

    let body = std::fs::read_to_string(&path).expect("read csv");
    let lines: Vec<&str> = body.lines().collect();
    assert_eq!(
        lines,
        vec![
            "timestamp,latency_ms,tokens_prompt,tokens_completion,tokens_total,estimated_cost_usd",
            "2026-01-01 10:00:00,250.000000,1200,150,1350,0.000270",
            "2026-01-01 10:05:00,1000.000000,0,0,0,0.000000",
        ]
    );
}

#[test]
fn rows_read_back_as_metrics() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("metrics.csv");
    let m = RequestMetrics::new(
        "2026-02-03 04:05:06".to_string(),
        Duration::from_micros(12_345),
        10,
        20,
        0.5,
    );
    append_metrics_csv(&path, &m).expect("append");

    let mut reader = csv::Reader::from_path(&path).expect("open csv");
    let rows: Vec<RequestMetrics> = reader
        .deserialize()
        .collect::<Result<_, _>>()
        .expect("decode rows");
    assert_eq!(rows, vec![m]);
}
