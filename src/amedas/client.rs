//! Upstream fetch: one GET per publication timestamp, outcome classified.

use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use reqwest::StatusCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::config::UpstreamConfig;

use super::timestamp::ObsTimestamp;
use super::types::{SharedSnapshot, Snapshot};

/// Classified result of a single upstream retrieval.
#[derive(Debug)]
pub enum FetchOutcome {
  /// Upstream published data for the timestamp.
  Published(SharedSnapshot),
  /// Upstream answered not-found: nothing published for the timestamp yet.
  NotPublished,
  /// Transport failure, unexpected status, or unparseable payload.
  /// Unknown state, so it must not be cached.
  Transient(String),
}

/// A source of snapshots, one retrieval per publication timestamp.
///
/// The resolver consults the cache under `cache_key` before calling
/// `fetch`, so implementations must derive the key solely from the
/// timestamp's upstream location.
#[async_trait]
pub trait Fetch: Send + Sync {
  /// Cache key for a timestamp: its fully-qualified upstream URL.
  fn cache_key(&self, ts: &ObsTimestamp) -> String;

  /// Perform the single retrieval for one publication timestamp.
  async fn fetch(&self, ts: &ObsTimestamp) -> FetchOutcome;
}

/// Amedas map-data client with connection pooling and a request timeout.
#[derive(Debug, Clone)]
pub struct AmedasClient {
  client: reqwest::Client,
  base_url: String,
}

impl AmedasClient {
  pub fn new(config: &UpstreamConfig) -> Result<Self> {
    let base_url = Url::parse(&config.base_url)
      .map_err(|e| eyre!("Invalid upstream base URL {}: {}", config.base_url, e))?;

    let client = reqwest::Client::builder()
      .user_agent(concat!("amedasd/", env!("CARGO_PKG_VERSION")))
      .pool_max_idle_per_host(4)
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()
      .map_err(|e| eyre!("Failed to build HTTP client: {}", e))?;

    Ok(Self {
      client,
      base_url: base_url.as_str().trim_end_matches('/').to_string(),
    })
  }

  fn url_for(&self, ts: &ObsTimestamp) -> String {
    format!("{}/{}.json", self.base_url, ts)
  }
}

#[async_trait]
impl Fetch for AmedasClient {
  fn cache_key(&self, ts: &ObsTimestamp) -> String {
    self.url_for(ts)
  }

  async fn fetch(&self, ts: &ObsTimestamp) -> FetchOutcome {
    let url = self.url_for(ts);

    debug!("Fetching snapshot: {}", url);

    let resp = match self.client.get(&url).send().await {
      Ok(resp) => resp,
      Err(e) => return FetchOutcome::Transient(format!("request error for {}: {}", ts, e)),
    };

    let status = resp.status();
    if status == StatusCode::NOT_FOUND {
      return FetchOutcome::NotPublished;
    }
    if !status.is_success() {
      return FetchOutcome::Transient(format!("upstream returned {} for {}", status, ts));
    }

    match resp.json::<Snapshot>().await {
      Ok(snapshot) => FetchOutcome::Published(Arc::new(snapshot)),
      Err(e) => FetchOutcome::Transient(format!("JSON parse error for {}: {}", ts, e)),
    }
  }
}
