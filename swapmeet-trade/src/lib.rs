pub mod config;
pub mod coordinator;
pub mod events;
pub mod feed;
pub mod inflight;
pub mod lifecycle;
pub mod models;
pub mod routes;
pub mod schema;
pub mod sse;
pub mod storage;
pub mod store;
pub mod view;

use std::future::Future;

use metrics_exporter_prometheus::PrometheusHandle;
use uuid::Uuid;

use swapmeet_shared::clients::minio::MinioClient;
use swapmeet_shared::clients::rabbitmq::RabbitMQClient;
use swapmeet_shared::clients::redis::RedisClient;
use swapmeet_shared::errors::AppResult;

use crate::config::AppConfig;
use crate::coordinator::TradeCoordinator;
use crate::feed::ChangeFeed;
use crate::store::PgTradeStore;

pub struct AppState {
    pub trades: TradeCoordinator<PgTradeStore>,
    pub feed: ChangeFeed,
    pub config: AppConfig,
    pub rabbitmq: RabbitMQClient,
    pub redis: RedisClient,
    pub minio: MinioClient,
    pub metrics_handle: PrometheusHandle,
}

impl AppState {
    /// Run a mutation under the caller's in-flight key for `target`.
    pub async fn guarded<T, F>(&self, user_id: Uuid, target: Uuid, action: &str, work: F) -> AppResult<T>
    where
        F: Future<Output = AppResult<T>>,
    {
        inflight::exclusive(
            &self.redis,
            inflight::inflight_key(user_id, target, action),
            self.config.in_flight_ttl_secs,
            work,
        )
        .await
    }
}
