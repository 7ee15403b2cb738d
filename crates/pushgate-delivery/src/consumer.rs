//! The read side of a push cycle.
//!
//! A consumer wraps the broker client for one subscription: it pulls
//! batches, acknowledges them, and classifies broker errors into the two
//! kinds the worker cares about. Transient failures are recovered by the
//! retry policy; cancelable ones mean the subscription no longer exists
//! upstream and its worker must be retired.

use std::sync::Arc;

use async_trait::async_trait;
use pushgate_ams::{AmsClient, AmsError, ReceivedMessagesList};
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::ConsumeError;

/// Broker error message for a missing project.
pub const PROJECT_NOT_FOUND: &str = "project doesn't exist";
/// Broker error message for a missing subscription.
pub const SUBSCRIPTION_NOT_FOUND: &str = "Subscription doesn't exist";

/// An upstream error signifying the consumed resource is gone and its
/// worker must be torn down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelableError {
    /// The broker's error message.
    pub err_msg: String,
    /// Fully qualified name of the affected subscription.
    pub resource: String,
}

impl CancelableError {
    /// Creates a new cancelable error for the given resource.
    pub fn new(err_msg: impl Into<String>, resource: impl Into<String>) -> Self {
        Self {
            err_msg: err_msg.into(),
            resource: resource.into(),
        }
    }
}

/// Layout of the broker's structured error payload.
#[derive(Debug, Default, Deserialize)]
struct UpstreamErrorBody {
    #[serde(default)]
    error: UpstreamErrorDetail,
}

#[derive(Debug, Default, Deserialize)]
#[allow(dead_code)]
struct UpstreamErrorDetail {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

/// Consumes data from a source on behalf of one subscription.
#[async_trait]
pub trait Consumer: Send + Sync {
    /// Pulls up to `max_messages` messages from the source.
    async fn consume(&self, max_messages: i64) -> Result<ReceivedMessagesList, ConsumeError>;

    /// Acknowledges that a message has been successfully pulled and sent.
    async fn ack(&self, ack_id: &str) -> Result<(), ConsumeError>;

    /// A stable human readable identity of the data source.
    fn resource_info(&self) -> String;

    /// Attempts to classify an error as cancelable.
    fn to_cancelable_error(&self, err: &ConsumeError) -> Option<CancelableError>;
}

/// Classifies a consume error as cancelable for the given resource.
///
/// The broker error body must parse as its structured error payload and
/// the message must name a missing project or subscription; every other
/// error is transient.
pub fn classify_cancelable(err: &ConsumeError, resource: &str) -> Option<CancelableError> {
    let ConsumeError::Broker(AmsError::Upstream { body }) = err else {
        return None;
    };

    let parsed: UpstreamErrorBody = serde_json::from_str(body).ok()?;

    match parsed.error.message.as_str() {
        PROJECT_NOT_FOUND => Some(CancelableError::new(PROJECT_NOT_FOUND, resource)),
        SUBSCRIPTION_NOT_FOUND => Some(CancelableError::new(SUBSCRIPTION_NOT_FOUND, resource)),
        _ => None,
    }
}

/// Consumer over the broker's REST API.
pub struct AmsConsumer {
    client: Arc<AmsClient>,
    full_sub: String,
}

impl AmsConsumer {
    /// Creates a consumer for the given fully qualified subscription name.
    pub fn new(client: Arc<AmsClient>, full_sub: impl Into<String>) -> Self {
        Self {
            client,
            full_sub: full_sub.into(),
        }
    }
}

#[async_trait]
impl Consumer for AmsConsumer {
    async fn consume(&self, max_messages: i64) -> Result<ReceivedMessagesList, ConsumeError> {
        debug!(resource = %self.resource_info(), "trying to consume messages");

        let list = self
            .client
            .pull(&self.full_sub, max_messages, true)
            .await?;

        if list.is_empty() {
            return Err(ConsumeError::NoNewMessages);
        }

        info!(
            resource = %self.resource_info(),
            count = list.received_messages.len(),
            "messages consumed"
        );

        Ok(list)
    }

    async fn ack(&self, ack_id: &str) -> Result<(), ConsumeError> {
        self.client
            .ack(&self.full_sub, ack_id)
            .await
            .map_err(|err| ConsumeError::Ack {
                ack_id: ack_id.to_string(),
                resource: self.resource_info(),
                body: err.to_string(),
            })?;

        debug!(ack_id, resource = %self.resource_info(), "message acknowledged");
        Ok(())
    }

    fn resource_info(&self) -> String {
        format!("subscription {} from {}", self.full_sub, self.client.endpoint())
    }

    fn to_cancelable_error(&self, err: &ConsumeError) -> Option<CancelableError> {
        classify_cancelable(err, &self.full_sub)
    }
}
