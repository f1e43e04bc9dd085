use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use futures::future::join_all;
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{Result, StatsError};
use crate::types::{Period, RawRecord};

const DATE_FIELD: &str = "受付_年月日";
const COUNT_FIELD: &str = "相談件数";
const REGION_CODE_FIELD: &str = "全国地方公共団体コード";
const PREFECTURE_FIELD: &str = "都道府県名";
const MUNICIPALITY_FIELD: &str = "市区町村名";

/// A source of daily call-center records for a period.
#[async_trait]
pub trait DataSource: Send + Sync {
    async fn fetch(&self, period: &Period) -> Result<Vec<RawRecord>>;
}

/// Fetches records from the open-data REST endpoint.
pub struct HttpDataSource {
    client: reqwest::Client,
    endpoint: String,
    limit: u32,
}

impl HttpDataSource {
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            limit: config.limit,
        })
    }

    pub fn request_url(&self, period: &Period) -> Result<reqwest::Url> {
        request_url(&self.endpoint, self.limit, period)
    }
}

/// `<endpoint>?from=<date>&till=<date>&limit=<n>` for a period.
pub fn request_url(endpoint: &str, limit: u32, period: &Period) -> Result<reqwest::Url> {
    reqwest::Url::parse_with_params(
        endpoint,
        &[
            ("from", period.from_param()),
            ("till", period.till_param()),
            ("limit", limit.to_string()),
        ],
    )
    .map_err(|e| StatsError::Config(format!("Invalid endpoint {}: {}", endpoint, e)))
}

#[async_trait]
impl DataSource for HttpDataSource {
    async fn fetch(&self, period: &Period) -> Result<Vec<RawRecord>> {
        let url = self.request_url(period)?;
        let start = Instant::now();
        debug!(%url, "requesting records");

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(StatsError::Status(response.status().as_u16()));
        }

        let body = response.bytes().await?;
        let records = decode_body(&body)?;
        info!(
            from = %period.from,
            till = %period.till,
            records = records.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "fetched call-center records"
        );
        Ok(records)
    }
}

/// Fetch a period, treating any failure as "no data for this period".
pub async fn fetch_or_empty(source: &dyn DataSource, period: &Period) -> Vec<RawRecord> {
    match source.fetch(period).await {
        Ok(records) => records,
        Err(e) => {
            warn!(from = %period.from, till = %period.till, error = %e, "fetch failed");
            Vec::new()
        }
    }
}

/// Fetch several periods concurrently. Results keep the order of `periods`.
pub async fn fetch_many(
    source: &dyn DataSource,
    periods: &[Period],
) -> Vec<(Period, Result<Vec<RawRecord>>)> {
    let results = join_all(periods.iter().map(|period| source.fetch(period))).await;
    periods.iter().copied().zip(results).collect()
}

/// Decode a response body: a JSON array whose first element holds the records.
pub fn decode_body(body: &[u8]) -> Result<Vec<RawRecord>> {
    let value: Value = serde_json::from_slice(body)?;

    let items = match value.get(0).and_then(Value::as_array) {
        Some(items) => items,
        None => {
            debug!("response carried no record array");
            return Ok(Vec::new());
        }
    };

    let mut records = Vec::with_capacity(items.len());
    for item in items {
        match decode_record(item) {
            Some(record) => records.push(record),
            None => warn!(record = %item, "skipping record with malformed date"),
        }
    }
    Ok(records)
}

/// Decode one record object. Returns `None` when the date is missing or
/// unparseable; a missing or non-numeric count decodes as 0.
pub fn decode_record(item: &Value) -> Option<RawRecord> {
    let date = item
        .get(DATE_FIELD)
        .and_then(Value::as_str)
        .and_then(parse_record_date)?;

    Some(RawRecord {
        date,
        count: lenient_count(item.get(COUNT_FIELD)),
        region_code: text_field(item, REGION_CODE_FIELD),
        prefecture: text_field(item, PREFECTURE_FIELD),
        municipality: text_field(item, MUNICIPALITY_FIELD),
    })
}

/// Parse a source date: a plain `YYYY-MM-DD` or a timestamp whose calendar
/// date is taken as written.
pub fn parse_record_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt.date());
    }
    NaiveDate::parse_from_str(raw, "%Y/%m/%d").ok()
}

fn lenient_count(value: Option<&Value>) -> u64 {
    match value {
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

fn text_field(item: &Value, field: &str) -> Option<String> {
    match item.get(field)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
