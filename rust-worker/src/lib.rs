//! Queue relay - forwards queue messages to an HTTP webhook.
//!
//! This library provides the pieces assembled by the `queue-relay` binary:
//! - `relay`: the receive, forward, acknowledge loop
//! - `forwarder`: one POST per message to the webhook
//! - `queue`: the consumer contract and its RabbitMQ implementation
//! - `web`: the admin surface (`/health`, `/metrics`, `/post`)
//!
//! ## Architecture
//!
//! ```text
//! Queue → Relay → Forwarder → Webhook
//!           ↓
//!        Metrics ← Admin server
//! ```

pub mod config;
pub mod forwarder;
pub mod metrics;
pub mod queue;
pub mod relay;
pub mod tls;
pub mod web;

// Re-export commonly used types
pub use config::{Config, ConfigError, RECEIVE_BATCH_SIZE};
pub use forwarder::{ForwardFailure, ForwardOutcome, Forwarder};
pub use metrics::{MetricsSink, RelayMetrics};
pub use queue::{AmqpConsumer, QueueConsumer, QueueError, QueueMessage};
pub use relay::{AckPolicy, CycleReport, Relay, RelayError, RelayState};
pub use tls::{TrustConfiguration, TrustError};
pub use web::AppState;
