use tokio::sync::broadcast::error::RecvError;

use swapmeet_shared::clients::rabbitmq::{Delivery, RabbitMQClient};
use swapmeet_shared::types::event::{routing_keys, Event};
use swapmeet_shared::types::ChangeNotice;

use crate::feed::ChangeFeed;

const SOURCE: &str = "swapmeet-trade";

/// Wrap a notice in the shared event envelope.
pub fn change_event(notice: &ChangeNotice) -> Event<ChangeNotice> {
    Event::new(SOURCE, notice.event_name(), notice.clone())
}

/// Forward notices committed by this instance to RabbitMQ so other instances
/// can fan them out to their SSE clients. Runs until the feed closes.
pub async fn relay_local_changes(feed: ChangeFeed, rabbitmq: RabbitMQClient, instance_id: String) {
    let mut rx = feed.subscribe();
    tracing::info!(instance_id = %instance_id, "change relay started");

    loop {
        match rx.recv().await {
            Ok(notice) => {
                if notice.origin != instance_id {
                    continue;
                }
                let routing_key = routing_keys::trade_change(notice.table);
                if let Err(e) = rabbitmq.publish(routing_key, &change_event(&notice), Delivery::Transient).await {
                    tracing::error!(
                        error = %e,
                        notice_id = %notice.id,
                        match_id = %notice.match_id,
                        "failed to publish change notice"
                    );
                }
            }
            Err(RecvError::Lagged(n)) => {
                tracing::warn!("change relay lagged, {n} notices not forwarded");
            }
            Err(RecvError::Closed) => break,
        }
    }

    tracing::info!("change relay stopped");
}
