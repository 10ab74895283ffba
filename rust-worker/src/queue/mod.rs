//! Queue module for the consuming side of the relay.
//!
//! This module provides:
//! - The message type and consumer contract the relay loop depends on
//! - An AMQP consumer implementing that contract over RabbitMQ
//!
//! ## Architecture
//!
//! ```text
//! Queue → QueueConsumer → Relay → Forwarder → Webhook
//! ```

pub mod amqp;
pub mod types;

pub use amqp::{collect_batch, AmqpConsumer};
pub use types::{QueueConsumer, QueueError, QueueMessage};
