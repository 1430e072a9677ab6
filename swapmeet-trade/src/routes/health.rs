use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::sync::Arc;

use swapmeet_shared::types::{HealthCheck, HealthResponse, HealthStatus};

use crate::store::TradeStore;
use crate::AppState;

/// Probes Postgres, Redis, MinIO and the RabbitMQ channel. Without Redis the
/// in-flight guard is skipped, and without RabbitMQ notices stay on this
/// instance, so those two only degrade the service.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Response {
    let database = state.trades.store().ping().map_err(|e| e.to_string());
    let redis = state.redis.ping().await.map_err(|e| e.to_string());
    let storage = state.minio.ping().await.map_err(|e| format!("{e:#}"));
    let rabbitmq = if state.rabbitmq.is_connected() {
        Ok(())
    } else {
        Err("channel not connected".to_string())
    };

    let response = HealthResponse::new("swapmeet-trade", env!("CARGO_PKG_VERSION"))
        .check(HealthCheck::required("database", database))
        .check(HealthCheck::required("storage", storage))
        .check(HealthCheck::optional("redis", redis))
        .check(HealthCheck::optional("rabbitmq", rabbitmq));

    let status = match response.status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status, Json(response)).into_response()
}

/// Returns Prometheus metrics.
pub async fn metrics(State(state): State<Arc<AppState>>) -> String {
    state.metrics_handle.render()
}
