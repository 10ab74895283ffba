//! Relay loop - the receive, forward, acknowledge cycle.
//!
//! Messages are forwarded one at a time. Whether a message is acknowledged
//! after its forward attempt is decided by [`AckPolicy`] alone; today every
//! message is acknowledged, so a failed forward drops the message.

use std::convert::Infallible;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, info};

use crate::forwarder::{ForwardOutcome, Forwarder};
use crate::metrics::MetricsSink;
use crate::queue::{QueueConsumer, QueueError};

/// Where the relay currently is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Idle,
    Receiving,
    Forwarding,
    Acknowledging,
    FatalQueueError,
    FatalAckError,
}

impl RelayState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RelayState::FatalQueueError | RelayState::FatalAckError)
    }
}

/// Failures that stop the relay for good.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("fatal queue error: {0}")]
    Queue(#[source] QueueError),

    #[error("fatal acknowledge error: {0}")]
    Ack(#[source] QueueError),

    #[error("relay already stopped in state {0:?}")]
    Halted(RelayState),
}

/// Decides whether a message is removed from the queue after forwarding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AckPolicy {
    /// Acknowledge regardless of the forward outcome.
    #[default]
    Always,
}

impl AckPolicy {
    pub fn should_acknowledge(self, _outcome: &ForwardOutcome) -> bool {
        match self {
            AckPolicy::Always => true,
        }
    }
}

/// Counts for one completed receive-forward-acknowledge cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub received: usize,
    pub forwarded: usize,
    pub failed: usize,
    pub acknowledged: usize,
}

pub struct Relay<Q> {
    queue: Q,
    forwarder: Forwarder,
    metrics: Arc<dyn MetricsSink>,
    ack_policy: AckPolicy,
    batch_size: usize,
    state: RelayState,
}

impl<Q: QueueConsumer> Relay<Q> {
    pub fn new(
        queue: Q,
        forwarder: Forwarder,
        metrics: Arc<dyn MetricsSink>,
        batch_size: usize,
    ) -> Self {
        Self {
            queue,
            forwarder,
            metrics,
            ack_policy: AckPolicy::default(),
            batch_size,
            state: RelayState::Idle,
        }
    }

    pub fn with_ack_policy(mut self, ack_policy: AckPolicy) -> Self {
        self.ack_policy = ack_policy;
        self
    }

    pub fn state(&self) -> RelayState {
        self.state
    }

    pub fn queue(&self) -> &Q {
        &self.queue
    }

    fn transition(&mut self, next: RelayState) {
        debug!(from = ?self.state, to = ?next, "relay_state_changed");
        self.state = next;
    }

    /// Run cycles until a fatal error occurs.
    pub async fn run(&mut self) -> Result<Infallible, RelayError> {
        info!(
            webhook = %self.forwarder.url(),
            batch_size = self.batch_size,
            ack_policy = ?self.ack_policy,
            "relay_started"
        );

        loop {
            self.run_cycle().await?;
        }
    }

    /// Receive one batch and process every message in it.
    ///
    /// A relay in a terminal state refuses to run further cycles.
    pub async fn run_cycle(&mut self) -> Result<CycleReport, RelayError> {
        if self.state.is_terminal() {
            return Err(RelayError::Halted(self.state));
        }

        self.transition(RelayState::Receiving);
        let messages = match self.queue.receive_batch(self.batch_size).await {
            Ok(messages) => messages,
            Err(e) => {
                self.transition(RelayState::FatalQueueError);
                error!(error = %e, "relay_receive_failed");
                return Err(RelayError::Queue(e));
            }
        };

        info!(count = messages.len(), "relay_batch_received");
        self.metrics.increment_received(messages.len() as u64);

        let mut report = CycleReport {
            received: messages.len(),
            ..Default::default()
        };

        for message in &messages {
            self.transition(RelayState::Forwarding);
            let outcome = self.forwarder.forward(&message.body).await;

            let acked = if self.ack_policy.should_acknowledge(&outcome) {
                self.transition(RelayState::Acknowledging);
                Some(self.queue.acknowledge(message).await)
            } else {
                None
            };

            if outcome.is_forwarded() {
                report.forwarded += 1;
                self.metrics.increment_forwarded();
            } else {
                report.failed += 1;
                self.metrics.increment_error();
            }

            match acked {
                Some(Ok(())) => report.acknowledged += 1,
                Some(Err(e)) => {
                    self.transition(RelayState::FatalAckError);
                    error!(
                        delivery_tag = message.delivery_tag,
                        error = %e,
                        "queue_ack_failed"
                    );
                    return Err(RelayError::Ack(e));
                }
                None => {}
            }

            debug!(
                delivery_tag = message.delivery_tag,
                message_id = message.message_id.as_deref().unwrap_or("unknown"),
                forwarded = outcome.is_forwarded(),
                "relay_message_done"
            );
        }

        self.transition(RelayState::Idle);
        Ok(report)
    }
}
