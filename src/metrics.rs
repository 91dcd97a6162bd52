//! Report metrics sources
//!
//! Metrics are fetched once per category, one request at a time. A failed
//! fetch is not an error for the run: the category's metrics are recorded as
//! absent and its charts are still captured.

use crate::{Error, ReportCategory, Result};
use async_trait::async_trait;
use indexmap::IndexMap;
use log::{debug, warn};
use serde_json::Value;
use std::path::PathBuf;

/// Metrics per category; `None` where the fetch failed
pub type CategoryMetrics = IndexMap<ReportCategory, Option<Value>>;

#[async_trait]
pub trait MetricsSource: Send + Sync {
    /// Fetch the aggregated metrics of one category
    async fn fetch(&self, category: ReportCategory) -> Result<Value>;
}

/// Fetch every category in order, recording failures as `None`.
pub async fn fetch_all(source: &dyn MetricsSource, categories: &[ReportCategory]) -> CategoryMetrics {
    let mut out = CategoryMetrics::with_capacity(categories.len());
    for &category in categories {
        let metrics = match source.fetch(category).await {
            Ok(v) => {
                debug!("Fetched metrics for {}", category);
                Some(v)
            }
            Err(e) => {
                warn!("Metrics for {} unavailable: {}", category, e);
                None
            }
        };
        out.insert(category, metrics);
    }
    out
}

/// Reads `<dir>/<category>.json`
pub struct JsonDirMetrics {
    dir: PathBuf,
}

impl JsonDirMetrics {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl MetricsSource for JsonDirMetrics {
    async fn fetch(&self, category: ReportCategory) -> Result<Value> {
        let path = self.dir.join(format!("{}.json", category));
        let text = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| Error::MetricsError(format!("{}: {}", path.display(), e)))?;
        serde_json::from_str(&text).map_err(|e| Error::MetricsError(format!("{}: {}", path.display(), e)))
    }
}

/// Source that never has metrics, for capture-only runs
pub struct NoMetrics;

#[async_trait]
impl MetricsSource for NoMetrics {
    async fn fetch(&self, category: ReportCategory) -> Result<Value> {
        Err(Error::MetricsError(format!("no metrics source configured for {}", category)))
    }
}

/// GETs `<base_url>/<category>` and parses the JSON body
#[cfg(feature = "http")]
pub struct HttpMetricsSource {
    client: reqwest::Client,
    base_url: String,
}

#[cfg(feature = "http")]
impl HttpMetricsSource {
    pub fn new(base_url: impl Into<String>, timeout_ms: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| Error::ConfigError(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[cfg(feature = "http")]
#[async_trait]
impl MetricsSource for HttpMetricsSource {
    async fn fetch(&self, category: ReportCategory) -> Result<Value> {
        let url = format!("{}/{}", self.base_url, category);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| Error::MetricsError(format!("GET {}: {}", url, e)))?;
        resp.json::<Value>()
            .await
            .map_err(|e| Error::MetricsError(format!("GET {}: invalid JSON: {}", url, e)))
    }
}
