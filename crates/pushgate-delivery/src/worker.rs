//! The per-subscription push worker.
//!
//! Each worker owns one subscription's cycle: it blocks on the retry
//! policy's timer, runs pull → send → ack when it fires, records the
//! outcome into its health string, and asks the registry to retire it when
//! the subscription turns out to be gone upstream. Stopping a worker
//! cancels its token; the loop observes cancellation at the timer or at any
//! in-flight broker or destination call.

use std::sync::Arc;

use base64::Engine;
use chrono::Utc;
use pushgate_ams::ReceivedMessagesList;
use tokio::sync::{mpsc, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::{
    consumer::{CancelableError, Consumer},
    error::{ConsumeError, WorkerError},
    retry::{new_retry_policy, RetryPolicy},
    sender::{MessageFormat, PushMsg, PushMsgs, Sender},
    subscription::{PushConfig, Subscription},
};

/// Timestamp layout used inside health strings.
const PUSH_ERR_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// A worker driving one subscription's push cycle.
///
/// Constructed by the registry and consumed by [`PushWorker::run`] on a
/// dedicated task; the registry keeps the [`WorkerHandle`] for status
/// queries and teardown.
pub struct PushWorker {
    sub: Arc<Subscription>,
    push_cfg: PushConfig,
    consumer: Arc<dyn Consumer>,
    sender: Arc<dyn Sender>,
    policy: Box<dyn RetryPolicy>,
    push_err: Arc<RwLock<String>>,
    cancel: CancellationToken,
    deactivate_tx: mpsc::Sender<CancelableError>,
}

/// The registry-side view of a running worker.
#[derive(Clone)]
pub struct WorkerHandle {
    sub: Arc<Subscription>,
    push_err: Arc<RwLock<String>>,
    cancel: CancellationToken,
}

impl PushWorker {
    /// Creates a worker for the subscription, building the retry policy its
    /// descriptor names.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::NotImplemented`] for an unknown retry policy
    /// tag and [`WorkerError::MissingPushConfig`] when the subscription
    /// carries no push configuration.
    pub fn new(
        sub: Arc<Subscription>,
        consumer: Arc<dyn Consumer>,
        sender: Arc<dyn Sender>,
        deactivate_tx: mpsc::Sender<CancelableError>,
    ) -> Result<Self, WorkerError> {
        let push_cfg = sub
            .push_config
            .clone()
            .ok_or(WorkerError::MissingPushConfig)?;
        let retry_cfg = push_cfg
            .retry_policy
            .clone()
            .ok_or(WorkerError::MissingPushConfig)?;

        let policy = new_retry_policy(&retry_cfg).map_err(|err| WorkerError::NotImplemented {
            policy_type: err.policy_type,
        })?;

        Ok(Self {
            sub,
            push_cfg,
            consumer,
            sender,
            policy,
            push_err: Arc::new(RwLock::new(String::new())),
            cancel: CancellationToken::new(),
            deactivate_tx,
        })
    }

    /// The registry-side handle for this worker.
    pub fn handle(&self) -> WorkerHandle {
        WorkerHandle {
            sub: Arc::clone(&self.sub),
            push_err: Arc::clone(&self.push_err),
            cancel: self.cancel.clone(),
        }
    }

    /// Runs the push cycle until the worker is stopped.
    ///
    /// Cycles fire on the retry policy's timer; after each one the policy is
    /// rearmed with the cycle's outcome. Cancellation is observed both while
    /// waiting on the timer and while a cycle is in flight, in which case
    /// the in-flight call is dropped and the health string left untouched.
    pub async fn run(mut self) {
        info!(subscription = %self.sub.full_name, "push worker started");

        loop {
            tokio::select! {
                () = self.policy.timer() => {
                    tokio::select! {
                        () = self.cancel.cancelled() => break,
                        () = self.push() => {}
                    }
                }
                () = self.cancel.cancelled() => break,
            }

            let last_err = self.push_err.read().await.clone();
            self.policy.reset(&last_err);
        }

        info!(subscription = %self.sub.full_name, "push worker stopped");
    }

    /// Executes one pull → send → ack cycle.
    async fn push(&self) {
        let rml = match self.consumer.consume(self.push_cfg.max_messages).await {
            Ok(rml) => rml,
            Err(err) => {
                if let Some(cancelable) = self.consumer.to_cancelable_error(&err) {
                    // the registry stops this worker once it reads the error
                    let _ = self.deactivate_tx.send(cancelable).await;
                    return;
                }

                if matches!(err, ConsumeError::NoNewMessages) {
                    debug!(resource = %self.consumer.resource_info(), "no new messages");
                    return;
                }

                error!(
                    resource = %self.consumer.resource_info(),
                    error = %err,
                    "could not consume message"
                );
                self.record_failure("Could not consume message", &err).await;
                return;
            }
        };

        let msgs = self.assemble(&rml);
        let format = MessageFormat::for_max_messages(self.push_cfg.max_messages);

        if let Err(err) = self.sender.send(&msgs, format).await {
            error!(
                endpoint = %self.sender.destination(),
                error = %err,
                "could not send message"
            );
            self.record_failure("Could not send message", &err).await;
            return;
        }

        // acks are cumulative up to the given id, so the last one of the
        // batch covers the whole cycle
        if let Some(last) = rml.last() {
            if let Err(err) = self.consumer.ack(&last.ack_id).await {
                error!(error = %err, "could not acknowledge message");
                self.record_failure("Could not acknowledge message", &err)
                    .await;
                return;
            }
        }

        self.push_err.write().await.clear();
    }

    /// Builds the push envelope, applying the subscription's base64 decode
    /// affordance. A payload that fails to decode is forwarded as received;
    /// messages are never dropped.
    fn assemble(&self, rml: &ReceivedMessagesList) -> PushMsgs {
        let subscription = self.consumer.resource_info();

        let messages = rml
            .received_messages
            .iter()
            .map(|received| {
                let mut message = received.message.clone();
                if self.push_cfg.base_64_decode {
                    message.data = self.decode_payload(&message.id, message.data);
                }
                PushMsg {
                    subscription: subscription.clone(),
                    message,
                }
            })
            .collect();

        PushMsgs { messages }
    }

    fn decode_payload(&self, message_id: &str, data: String) -> String {
        let decoded = match base64::engine::general_purpose::STANDARD.decode(&data) {
            Ok(decoded) => decoded,
            Err(err) => {
                error!(
                    subscription = %self.sub.full_name,
                    message_id,
                    error = %err,
                    "could not decode message"
                );
                return data;
            }
        };

        match String::from_utf8(decoded) {
            Ok(text) => text,
            Err(err) => {
                error!(
                    subscription = %self.sub.full_name,
                    message_id,
                    error = %err,
                    "could not decode message"
                );
                data
            }
        }
    }

    async fn record_failure(&self, action: &str, err: &(dyn std::fmt::Display + Send + Sync)) {
        let mut push_err = self.push_err.write().await;
        *push_err = format!(
            "{} - {}, {}",
            Utc::now().format(PUSH_ERR_TIME_FORMAT),
            action,
            err
        );
    }
}

impl WorkerHandle {
    /// The subscription this worker serves.
    pub fn subscription(&self) -> &Subscription {
        &self.sub
    }

    /// Whether the worker is experiencing any error handling its
    /// subscription: the timestamped description of the most recent failed
    /// step, or an all-clear message when the last cycle succeeded.
    pub async fn status(&self) -> String {
        let push_err = self.push_err.read().await;
        if push_err.is_empty() {
            return format!("Subscription {} is currently active", self.sub.full_name);
        }
        push_err.clone()
    }

    /// Stops the worker's push functionality.
    pub fn stop(&self) {
        self.cancel.cancel();
    }
}
