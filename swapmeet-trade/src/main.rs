use std::sync::Arc;

use swapmeet_shared::clients::db::create_pool;
use swapmeet_shared::clients::minio::MinioClient;
use swapmeet_shared::clients::rabbitmq::RabbitMQClient;
use swapmeet_shared::clients::redis::RedisClient;

use swapmeet_trade::config::AppConfig;
use swapmeet_trade::coordinator::TradeCoordinator;
use swapmeet_trade::events;
use swapmeet_trade::feed::ChangeFeed;
use swapmeet_trade::routes;
use swapmeet_trade::store::PgTradeStore;
use swapmeet_trade::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    swapmeet_shared::middleware::init_tracing("swapmeet-trade");

    let config = AppConfig::load()?;
    let port = config.port;

    let db = create_pool(&config.database_url, config.db_pool_size)?;
    let rabbitmq = RabbitMQClient::connect(&config.rabbitmq_url).await?;
    let redis = RedisClient::connect(&config.redis_url).await?;

    let minio = MinioClient::new(
        &config.minio_endpoint,
        &config.minio_access_key,
        &config.minio_secret_key,
        &config.minio_bucket,
        &config.minio_public_url,
    )
    .await?;

    let metrics_handle = swapmeet_shared::middleware::init_metrics("swapmeet-trade")?;

    let feed = ChangeFeed::new();
    let trades = TradeCoordinator::new(PgTradeStore::new(db), feed.clone(), config.instance_id.clone());

    // Local commits out to RabbitMQ, other instances' commits back in.
    tokio::spawn(events::publisher::relay_local_changes(
        feed.clone(),
        rabbitmq.clone(),
        config.instance_id.clone(),
    ));

    let sub_feed = feed.clone();
    let sub_rabbitmq = rabbitmq.clone();
    let sub_instance = config.instance_id.clone();
    tokio::spawn(async move {
        if let Err(e) = events::subscriber::listen_remote_changes(sub_rabbitmq, sub_feed, sub_instance).await {
            tracing::error!(error = %e, "change subscriber failed");
        }
    });

    let instance_id = config.instance_id.clone();
    let state = Arc::new(AppState {
        trades,
        feed,
        config,
        rabbitmq,
        redis,
        minio,
        metrics_handle,
    });

    let app = routes::router(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, instance_id = %instance_id, "swapmeet-trade starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
