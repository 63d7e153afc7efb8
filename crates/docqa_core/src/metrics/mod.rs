use std::fs::{self, OpenOptions};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::config::Pricing;
use crate::error::AppError;

/// One row of the per-request metrics log. Latency and cost are kept pre-formatted
/// (six decimals) so the CSV stays stable across runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RequestMetrics {
    pub timestamp: String,
    pub latency_ms: String,
    pub tokens_prompt: u64,
    pub tokens_completion: u64,
    pub tokens_total: u64,
    pub estimated_cost_usd: String,
}

impl RequestMetrics {
    pub fn new(
        timestamp: String,
        latency: Duration,
        tokens_prompt: u64,
        tokens_completion: u64,
        cost_usd: f64,
    ) -> Self {
        Self {
            timestamp,
            latency_ms: format!("{:.6}", latency.as_secs_f64() * 1000.0),
            tokens_prompt,
            tokens_completion,
            tokens_total: tokens_prompt + tokens_completion,
            estimated_cost_usd: format!("{cost_usd:.6}"),
        }
    }
}

pub fn estimate_cost(pricing: &Pricing, input_tokens: u64, output_tokens: u64) -> f64 {
    (input_tokens as f64 / 1_000_000.0) * pricing.input_per_million
        + (output_tokens as f64 / 1_000_000.0) * pricing.output_per_million
}

/// Current UTC time as `YYYY-MM-DD HH:MM:SS`.
pub fn now_utc_timestamp() -> Result<String, AppError> {
    let fmt = time::format_description::parse("[year]-[month]-[day] [hour]:[minute]:[second]")
        .map_err(|e| {
            AppError::new("METRICS_TIME_FAILED", "Invalid timestamp format").with_details(e.to_string())
        })?;
    OffsetDateTime::now_utc().format(&fmt).map_err(|e| {
        AppError::new("METRICS_TIME_FAILED", "Failed to format time").with_details(e.to_string())
    })
}

pub fn now_rfc3339_utc() -> Result<String, AppError> {
    OffsetDateTime::now_utc().format(&Rfc3339).map_err(|e| {
        AppError::new("METRICS_TIME_FAILED", "Failed to format time").with_details(e.to_string())
    })
}

/// Append one row to the CSV at `path`, writing the header only when the file is new.
pub fn append_metrics_csv(path: &Path, metrics: &RequestMetrics) -> Result<(), AppError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(|e| {
            AppError::at_path("METRICS_WRITE_FAILED", "Failed to create metrics directory", dir, e)
        })?;
    }
    let is_new = !path.is_file();
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| AppError::at_path("METRICS_WRITE_FAILED", "Failed to open metrics CSV", path, e))?;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(is_new)
        .from_writer(file);
    writer.serialize(metrics).map_err(|e| {
        AppError::at_path("METRICS_WRITE_FAILED", "Failed to write metrics row", path, e)
    })?;
    writer
        .flush()
        .map_err(|e| AppError::at_path("METRICS_WRITE_FAILED", "Failed to flush metrics CSV", path, e))?;
    tracing::debug!(path = %path.display(), "appended request metrics");
    Ok(())
}
