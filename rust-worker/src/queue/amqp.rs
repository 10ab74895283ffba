//! RabbitMQ consumer using lapin.
//!
//! Deliveries are pushed by the broker; this module turns that stream back
//! into bounded pull-style batches for the relay loop.

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{BoxStream, Stream, StreamExt};
use lapin::{
    message::Delivery,
    options::{BasicAckOptions, BasicConsumeOptions, BasicQosOptions, QueueDeclareOptions},
    types::FieldTable,
    Channel, Connection, ConnectionProperties,
};
use tokio::time::timeout;
use tracing::{debug, info};

use super::types::{QueueConsumer, QueueError, QueueMessage};

/// Batching consumer for a single queue.
pub struct AmqpConsumer {
    _connection: Connection,
    channel: Channel,
    deliveries: BoxStream<'static, Result<QueueMessage, QueueError>>,
    queue: String,
    receive_timeout: Duration,
    receive_linger: Duration,
}

impl AmqpConsumer {
    /// Connect to the broker and start consuming `queue`.
    ///
    /// This function:
    /// 1. Connects to RabbitMQ using the given URL
    /// 2. Limits unacknowledged deliveries to one batch
    /// 3. Declares the queue (idempotent operation)
    /// 4. Starts the consumer
    pub async fn connect(
        url: &str,
        queue: &str,
        prefetch: u16,
        receive_timeout: Duration,
        receive_linger: Duration,
    ) -> Result<Self, QueueError> {
        info!(url_length = url.len(), "rabbitmq_connecting");

        let connection = Connection::connect(url, ConnectionProperties::default())
            .await
            .map_err(QueueError::Connect)?;

        info!("rabbitmq_connected");

        let channel = connection
            .create_channel()
            .await
            .map_err(QueueError::Setup)?;

        channel
            .basic_qos(prefetch, BasicQosOptions::default())
            .await
            .map_err(QueueError::Setup)?;

        info!(prefetch_count = prefetch, "rabbitmq_qos_set");

        channel
            .queue_declare(
                queue,
                QueueDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(QueueError::Setup)?;

        let consumer = channel
            .basic_consume(
                queue,
                "queue-relay",
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(QueueError::Setup)?;

        info!(queue = %queue, "rabbitmq_consumer_started");

        let deliveries = consumer
            .map(|delivery| match delivery {
                Ok(delivery) => Ok(into_message(delivery)),
                Err(e) => Err(QueueError::Receive(e)),
            })
            .boxed();

        Ok(Self {
            _connection: connection,
            channel,
            deliveries,
            queue: queue.to_string(),
            receive_timeout,
            receive_linger,
        })
    }
}

fn into_message(mut delivery: Delivery) -> QueueMessage {
    let message_id = delivery
        .properties
        .message_id()
        .as_ref()
        .map(|s| s.to_string());

    QueueMessage {
        body: std::mem::take(&mut delivery.data),
        delivery_tag: delivery.delivery_tag,
        message_id,
    }
}

/// Pull up to `max_count` messages off a pushed delivery stream.
///
/// Waits `first_wait` for the first message and returns an empty batch if
/// none arrives. After that each further message may take at most `linger`.
/// A finished stream is reported as [`QueueError::Closed`].
pub async fn collect_batch<S>(
    deliveries: &mut S,
    max_count: usize,
    first_wait: Duration,
    linger: Duration,
) -> Result<Vec<QueueMessage>, QueueError>
where
    S: Stream<Item = Result<QueueMessage, QueueError>> + Unpin,
{
    let mut batch = Vec::with_capacity(max_count);

    while batch.len() < max_count {
        let wait = if batch.is_empty() { first_wait } else { linger };
        match timeout(wait, deliveries.next()).await {
            Ok(Some(message)) => batch.push(message?),
            Ok(None) => return Err(QueueError::Closed),
            Err(_) => break,
        }
    }

    Ok(batch)
}

#[async_trait]
impl QueueConsumer for AmqpConsumer {
    async fn receive_batch(&mut self, max_count: usize) -> Result<Vec<QueueMessage>, QueueError> {
        let batch = collect_batch(
            &mut self.deliveries,
            max_count,
            self.receive_timeout,
            self.receive_linger,
        )
        .await?;

        if batch.is_empty() {
            debug!(queue = %self.queue, "rabbitmq_receive_timeout");
        }

        Ok(batch)
    }

    async fn acknowledge(&mut self, message: &QueueMessage) -> Result<(), QueueError> {
        self.channel
            .basic_ack(message.delivery_tag, BasicAckOptions::default())
            .await
            .map_err(|source| QueueError::Acknowledge {
                delivery_tag: message.delivery_tag,
                source,
            })
    }
}
