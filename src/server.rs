//! HTTP shell: routing, handlers, and server startup.
//!
//! Deliberately thin: request handling is parameter extraction plus one
//! call into the resolver and one into the projector.

use axum::{
  extract::{Query, State},
  http::HeaderValue,
  response::{IntoResponse, Response},
  routing::get,
  Json, Router,
};
use chrono::Utc;
use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::amedas::client::AmedasClient;
use crate::amedas::projector::project;
use crate::amedas::resolver::{ResolverConfig, SnapshotResolver};
use crate::amedas::timestamp::TimestampGenerator;
use crate::cache::{MemoryStore, NoopStore, SnapshotStore};
use crate::config::Config;
use crate::error::ServiceError;

/// Shared state behind the handlers.
pub struct AppState {
  resolver: SnapshotResolver<AmedasClient>,
  default_station: String,
}

#[derive(Debug, Deserialize)]
struct LatestParams {
  station: Option<String>,
  metric: Option<String>,
}

fn router(state: Arc<AppState>) -> Router {
  Router::new()
    .route("/", get(latest))
    .route("/v1/latest", get(latest))
    .route("/healthz", get(healthz))
    .with_state(state)
}

async fn latest(
  State(state): State<Arc<AppState>>,
  Query(params): Query<LatestParams>,
) -> Result<Response, ServiceError> {
  let resolved = state.resolver.resolve_latest(Utc::now()).await?;

  let station = params.station.as_deref().unwrap_or(&state.default_station);
  let body = project(&resolved.snapshot, station, params.metric.as_deref())?;

  debug!(
    "{}: serving station {} from offset {}",
    resolved.timestamp, station, resolved.offset
  );

  let mut response = Json(body).into_response();
  if let Ok(value) = HeaderValue::from_str(resolved.timestamp.as_str()) {
    response.headers_mut().insert("x-observation-time", value);
  }
  Ok(response)
}

async fn healthz() -> Json<serde_json::Value> {
  Json(serde_json::json!({ "status": "ok" }))
}

/// Wire up the resolver from configuration and serve until shutdown.
pub async fn run(config: Config) -> Result<()> {
  let client = AmedasClient::new(&config.upstream)?;
  let timestamps = TimestampGenerator::new(
    config.upstream.cadence_minutes,
    config.upstream.utc_offset_hours,
  )?;

  let store: Arc<dyn SnapshotStore> = if config.cache.enabled {
    Arc::new(MemoryStore::new())
  } else {
    Arc::new(NoopStore)
  };

  let resolver = SnapshotResolver::new(
    client,
    store,
    timestamps,
    ResolverConfig {
      max_fallback: config.resolver.max_fallback,
      refresh_latest: config.resolver.refresh_latest,
      positive_ttl: Duration::from_secs(config.cache.positive_ttl_secs),
      negative_ttl: Duration::from_secs(config.cache.negative_ttl_secs),
    },
  );

  let state = Arc::new(AppState {
    resolver,
    default_station: config.default_station.0.clone(),
  });

  let addr: SocketAddr = config
    .server
    .bind
    .parse()
    .map_err(|e| eyre!("Invalid bind address {}: {}", config.server.bind, e))?;

  let listener = tokio::net::TcpListener::bind(addr)
    .await
    .map_err(|e| eyre!("Failed to bind {}: {}", addr, e))?;

  info!(%addr, "Starting amedasd");

  axum::serve(listener, router(state))
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|e| eyre!("Server error: {}", e))?;

  Ok(())
}

async fn shutdown_signal() {
  if tokio::signal::ctrl_c().await.is_ok() {
    info!("Shutdown signal received");
  }
}
