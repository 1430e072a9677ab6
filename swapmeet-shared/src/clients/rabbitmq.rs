use std::sync::Arc;

use lapin::options::{
    BasicConsumeOptions, BasicPublishOptions, BasicQosOptions, ExchangeDeclareOptions,
    QueueBindOptions, QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties, Consumer, ExchangeKind};
use serde::Serialize;

use crate::types::Event;

pub const EXCHANGE_NAME: &str = "swapmeet.events";

/// Unacked deliveries a consumer may hold at once.
const PREFETCH: u16 = 64;

/// AMQP delivery mode for a published event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Lost if the broker restarts. Fine for invalidations.
    Transient,
    Persistent,
}

impl Delivery {
    fn mode(self) -> u8 {
        match self {
            Delivery::Transient => 1,
            Delivery::Persistent => 2,
        }
    }
}

#[derive(Clone)]
pub struct RabbitMQClient {
    channel: Channel,
}

impl RabbitMQClient {
    /// Open a channel and declare the durable `swapmeet.events` topic exchange.
    pub async fn connect(url: &str) -> Result<Self, lapin::Error> {
        let conn = Connection::connect(url, ConnectionProperties::default()).await?;
        let channel = conn.create_channel().await?;

        let durable = ExchangeDeclareOptions { durable: true, ..Default::default() };
        channel
            .exchange_declare(EXCHANGE_NAME, ExchangeKind::Topic, durable, FieldTable::default())
            .await?;
        channel.basic_qos(PREFETCH, BasicQosOptions::default()).await?;

        tracing::info!(exchange = EXCHANGE_NAME, "connected to RabbitMQ");
        Ok(Self { channel })
    }

    /// Publish `event` as JSON and wait for the broker's confirmation.
    pub async fn publish<T: Serialize>(
        &self,
        routing_key: &str,
        event: &Event<T>,
        delivery: Delivery,
    ) -> Result<(), lapin::Error> {
        let payload = encode(event)?;
        let properties = BasicProperties::default()
            .with_content_type("application/json".into())
            .with_delivery_mode(delivery.mode());

        self.channel
            .basic_publish(EXCHANGE_NAME, routing_key, BasicPublishOptions::default(), &payload, properties)
            .await?
            .await?;

        tracing::debug!(routing_key = %routing_key, event_id = %event.id, ?delivery, "event published");
        Ok(())
    }

    /// Consume on a queue private to this connection. It is deleted when the
    /// connection closes, so every instance receives its own copy.
    pub async fn subscribe_exclusive(
        &self,
        queue_name: &str,
        routing_keys: &[&str],
    ) -> Result<Consumer, lapin::Error> {
        let private = QueueDeclareOptions { exclusive: true, auto_delete: true, ..Default::default() };
        self.channel
            .queue_declare(queue_name, private, FieldTable::default())
            .await?;

        for key in routing_keys {
            self.channel
                .queue_bind(queue_name, EXCHANGE_NAME, key, QueueBindOptions::default(), FieldTable::default())
                .await?;
        }

        let consumer = self
            .channel
            .basic_consume(
                queue_name,
                &format!("{queue_name}-consumer"),
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await?;

        tracing::info!(queue = %queue_name, bindings = ?routing_keys, "subscribed to RabbitMQ queue");
        Ok(consumer)
    }

    pub fn is_connected(&self) -> bool {
        self.channel.status().connected()
    }
}

fn encode<T: Serialize>(event: &Event<T>) -> Result<Vec<u8>, lapin::Error> {
    serde_json::to_vec(event).map_err(|e| {
        tracing::error!(error = %e, event_type = %event.event_type, "failed to serialize event");
        lapin::Error::IOError(Arc::new(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
    })
}
