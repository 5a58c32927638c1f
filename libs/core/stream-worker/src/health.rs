//! Health and admin endpoints for worker hosts.
//!
//! - Liveness probes (`/health`, `/healthz`)
//! - Readiness probes (`/ready`, `/readyz`), backed by a Redis PING
//! - Queue monitoring (`/streams/info`) over the whole queue registry
//! - Prometheus metrics (`/metrics`)
//! - DLQ admin (`/admin/dlq/{queue}`, `/admin/dlq/{queue}/stats`)

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use redis::aio::ConnectionManager;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::dlq::DlqManager;
use crate::metrics;
use crate::registry::QueueName;

const DEFAULT_FAIL_RETAIN: i64 = 1000;

/// Shared state for health endpoints.
///
/// The monitoring surface enumerates the [`QueueName`] registry rather than
/// trusting caller-supplied stream names.
#[derive(Clone)]
pub struct HealthState {
    pub redis: ConnectionManager,
    pub app_name: String,
    pub app_version: String,
}

impl HealthState {
    pub fn new(
        redis: ConnectionManager,
        app_name: impl Into<String>,
        app_version: impl Into<String>,
    ) -> Self {
        Self {
            redis,
            app_name: app_name.into(),
            app_version: app_version.into(),
        }
    }

    fn dlq_manager(&self, queue: QueueName) -> DlqManager {
        DlqManager::new(self.redis.clone(), queue.dlq(), DEFAULT_FAIL_RETAIN)
    }
}

/// Build the health and admin router.
pub fn health_router(state: HealthState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/healthz", get(health_handler))
        .route("/ready", get(ready_handler))
        .route("/readyz", get(ready_handler))
        .route("/streams/info", get(streams_info_handler))
        .route("/metrics", get(metrics_handler))
        .route(
            "/admin/dlq/{queue}",
            get(dlq_list_handler).delete(dlq_purge_handler),
        )
        .route("/admin/dlq/{queue}/stats", get(dlq_stats_handler))
        .route("/admin/dlq/{queue}/{id}", axum::routing::delete(dlq_delete_handler))
        .with_state(state)
}

/// Liveness probe: OK whenever the server is running.
async fn health_handler(State(state): State<HealthState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "name": state.app_name,
        "version": state.app_version,
    }))
}

/// Readiness probe: checks broker connectivity.
async fn ready_handler(State(state): State<HealthState>) -> impl IntoResponse {
    let mut conn = state.redis.clone();

    let result: Result<String, _> = redis::cmd("PING").query_async(&mut conn).await;

    match result {
        Ok(_) => (StatusCode::OK, Json(json!({ "status": "ready" }))),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "not ready", "error": e.to_string() })),
        ),
    }
}

/// Depth and pending count for every registered queue.
async fn streams_info_handler(State(state): State<HealthState>) -> Json<Value> {
    let mut conn = state.redis.clone();
    let mut streams = Vec::new();

    for queue in QueueName::all() {
        let length: i64 = redis::cmd("XLEN")
            .arg(queue.stream())
            .query_async(&mut conn)
            .await
            .unwrap_or(0);

        let pending: Result<(i64, Option<String>, Option<String>, Option<Vec<(String, i64)>>), _> =
            redis::cmd("XPENDING")
                .arg(queue.stream())
                .arg(queue.consumer_group())
                .query_async(&mut conn)
                .await;

        let pending_count = pending.map(|(count, _, _, _)| count).unwrap_or(0);

        let dlq_length: i64 = redis::cmd("XLEN")
            .arg(queue.dlq())
            .query_async(&mut conn)
            .await
            .unwrap_or(0);

        streams.push(json!({
            "queue": queue.stream(),
            "consumer_group": queue.consumer_group(),
            "length": length,
            "pending": pending_count,
            "dlq_length": dlq_length,
        }));
    }

    Json(json!({ "streams": streams }))
}

/// Prometheus exposition endpoint.
async fn metrics_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4")],
        metrics::render_metrics(),
    )
}

#[derive(Debug, Deserialize)]
struct DlqListQuery {
    count: Option<usize>,
    offset: Option<String>,
}

fn parse_queue(raw: &str) -> Result<QueueName, (StatusCode, Json<Value>)> {
    raw.parse().map_err(|_| {
        (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("unknown queue '{raw}'") })),
        )
    })
}

/// List retained failures for a queue.
async fn dlq_list_handler(
    State(state): State<HealthState>,
    Path(queue): Path<String>,
    Query(query): Query<DlqListQuery>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let queue = parse_queue(&queue)?;
    let dlq = state.dlq_manager(queue);

    let entries = dlq
        .list(query.count.unwrap_or(50), query.offset.as_deref())
        .await
        .map_err(internal_error)?;

    Ok(Json(json!({ "queue": queue.stream(), "entries": entries })))
}

/// Stats for a queue's DLQ.
async fn dlq_stats_handler(
    State(state): State<HealthState>,
    Path(queue): Path<String>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let queue = parse_queue(&queue)?;
    let dlq = state.dlq_manager(queue);

    let stats = dlq.stats().await.map_err(internal_error)?;

    Ok(Json(serde_json::to_value(stats).unwrap_or_default()))
}

/// Drop one retained failure by its DLQ entry ID.
async fn dlq_delete_handler(
    State(state): State<HealthState>,
    Path((queue, id)): Path<(String, String)>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let queue = parse_queue(&queue)?;
    let dlq = state.dlq_manager(queue);

    let deleted = dlq.delete(&id).await.map_err(internal_error)?;

    Ok(Json(json!({ "queue": queue.stream(), "deleted": deleted })))
}

/// Drop every retained failure for a queue.
async fn dlq_purge_handler(
    State(state): State<HealthState>,
    Path(queue): Path<String>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let queue = parse_queue(&queue)?;
    let dlq = state.dlq_manager(queue);

    let purged = dlq.purge().await.map_err(internal_error)?;

    Ok(Json(json!({ "queue": queue.stream(), "purged": purged })))
}

fn internal_error(e: crate::error::StreamError) -> (StatusCode, Json<Value>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": e.to_string() })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_queue() {
        assert!(parse_queue("email").is_ok());
        assert!(parse_queue("activity_log").is_ok());
        assert!(parse_queue("nonsense").is_err());
    }
}
