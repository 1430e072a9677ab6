use futures_lite::StreamExt;
use lapin::options::BasicAckOptions;

use swapmeet_shared::clients::rabbitmq::RabbitMQClient;
use swapmeet_shared::types::event::{routing_keys, Event};
use swapmeet_shared::types::ChangeNotice;

use crate::feed::ChangeFeed;

/// Decode a delivery and decide whether it should reach local subscribers.
/// Our own notices were already emitted locally when they were committed.
pub fn remote_notice(payload: &[u8], instance_id: &str) -> Result<Option<ChangeNotice>, serde_json::Error> {
    let event: Event<ChangeNotice> = serde_json::from_slice(payload)?;
    if event.data.origin == instance_id {
        return Ok(None);
    }
    Ok(Some(event.data))
}

/// Consume change notices from every instance on a queue private to this one.
pub async fn listen_remote_changes(
    rabbitmq: RabbitMQClient,
    feed: ChangeFeed,
    instance_id: String,
) -> anyhow::Result<()> {
    let queue = format!("swapmeet-trade.changes.{instance_id}");
    let mut consumer = rabbitmq
        .subscribe_exclusive(&queue, &[routing_keys::TRADE_CHANGE_ALL])
        .await?;

    tracing::info!(queue = %queue, "listening for remote change notices");

    while let Some(delivery) = consumer.next().await {
        match delivery {
            Ok(delivery) => {
                match remote_notice(&delivery.data, &instance_id) {
                    Ok(Some(notice)) => {
                        tracing::debug!(
                            notice_id = %notice.id,
                            origin = %notice.origin,
                            event = %notice.event_name(),
                            "remote change received"
                        );
                        feed.emit(notice);
                    }
                    Ok(None) => {}
                    Err(e) => {
                        tracing::error!(error = %e, "failed to deserialize change notice");
                    }
                }
                if let Err(e) = delivery.ack(BasicAckOptions::default()).await {
                    tracing::warn!(error = %e, "failed to ack change notice");
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "consumer error");
            }
        }
    }

    Ok(())
}
