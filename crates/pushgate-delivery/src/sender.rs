//! Delivery of pulled batches to external destinations.
//!
//! Two sender variants sit behind one contract: a generic HTTP sender that
//! posts the push envelope to any endpoint, and a chat-webhook sender that
//! posts a single message's payload into a channel. The envelope shape is
//! part of the contract with receivers: a subscription pulling one message
//! per cycle delivers the bare `{subscription, message}` object, anything
//! larger delivers `{messages: [...]}`.

use async_trait::async_trait;
use pushgate_ams::Message;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::{
    error::SendError,
    subscription::{PushConfig, HTTP_ENDPOINT_TYPE, MATTERMOST_TYPE},
};

const APPLICATION_JSON: &str = "application/json";

/// Statuses a generic HTTP destination may answer with on success.
const ACCEPTED_STATUSES: [u16; 4] = [200, 201, 204, 102];

/// A message wrapped with its source subscription for delivery.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PushMsg {
    /// Human readable identity of the source subscription.
    #[serde(rename = "subscription", default)]
    pub subscription: String,
    /// The message being delivered.
    #[serde(rename = "message", default)]
    pub message: Message,
}

/// The batch handed to a sender.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PushMsgs {
    /// Messages in pull order.
    #[serde(rename = "messages", default)]
    pub messages: Vec<PushMsg>,
}

/// Wire shape of the push envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageFormat {
    /// The bare `{subscription, message}` object.
    Single,
    /// The `{messages: [...]}` wrapper.
    Multiple,
}

impl MessageFormat {
    /// Chooses the envelope for a subscription's messages-per-cycle count.
    pub fn for_max_messages(max_messages: i64) -> Self {
        if max_messages == 1 {
            Self::Single
        } else {
            Self::Multiple
        }
    }
}

/// Delivers batches to a remote destination.
#[async_trait]
pub trait Sender: Send + Sync + std::fmt::Debug {
    /// Sends the batch using the given envelope shape.
    async fn send(&self, msgs: &PushMsgs, format: MessageFormat) -> Result<(), SendError>;

    /// The destination data is being sent to.
    fn destination(&self) -> &str;
}

/// Creates the sender matching a push configuration's destination tag.
///
/// An empty tag selects the generic HTTP sender; subscriptions predating
/// destination variants carry none.
pub fn new_sender(
    cfg: &PushConfig,
    client: reqwest::Client,
) -> Result<std::sync::Arc<dyn Sender>, SendError> {
    match cfg.push_type.as_str() {
        HTTP_ENDPOINT_TYPE | "" => Ok(std::sync::Arc::new(HttpSender::new(
            cfg.push_endpoint.clone(),
            cfg.authorization_header.clone(),
            client,
        ))),
        MATTERMOST_TYPE => Ok(std::sync::Arc::new(MattermostSender::new(
            cfg.mattermost_url.clone(),
            cfg.mattermost_username.clone(),
            cfg.mattermost_channel.clone(),
            client,
        ))),
        other => Err(SendError::Endpoint {
            body: format!("sender {other} not yet implemented"),
        }),
    }
}

fn encode_envelope(msgs: &PushMsgs, format: MessageFormat) -> Result<Vec<u8>, SendError> {
    match format {
        MessageFormat::Single => {
            let first = msgs.messages.first().ok_or(SendError::EmptyBatch)?;
            Ok(serde_json::to_vec(first)?)
        }
        MessageFormat::Multiple => Ok(serde_json::to_vec(msgs)?),
    }
}

/// Delivers data to any HTTP endpoint.
#[derive(Debug)]
pub struct HttpSender {
    client: reqwest::Client,
    endpoint: String,
    authorization_header: String,
}

impl HttpSender {
    /// Creates a sender for the given endpoint. A non-empty
    /// `authorization_header` is attached verbatim to every request.
    pub fn new(
        endpoint: impl Into<String>,
        authorization_header: impl Into<String>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            authorization_header: authorization_header.into(),
        }
    }
}

#[async_trait]
impl Sender for HttpSender {
    async fn send(&self, msgs: &PushMsgs, format: MessageFormat) -> Result<(), SendError> {
        let body = encode_envelope(msgs, format)?;

        debug!(destination = %self.endpoint, "trying to push message");

        let mut request = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", APPLICATION_JSON)
            .body(body);

        if !self.authorization_header.is_empty() {
            request = request.header("Authorization", &self.authorization_header);
        }

        let response = request
            .send()
            .await
            .map_err(|err| SendError::Transport {
                message: err.to_string(),
            })?;

        let status = response.status().as_u16();
        if !ACCEPTED_STATUSES.contains(&status) {
            let body = response.text().await.unwrap_or_default();
            error!(endpoint = %self.endpoint, error = %body, "could not send message");
            return Err(SendError::Endpoint { body });
        }

        debug!(destination = %self.endpoint, "message delivered successfully");
        Ok(())
    }

    fn destination(&self) -> &str {
        &self.endpoint
    }
}

/// Body posted to a chat webhook.
#[derive(Debug, Clone, Serialize)]
struct MattermostMessage {
    text: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    username: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    channel: String,
}

/// Structured error payload a chat webhook answers with on failure.
#[derive(Debug, Clone, Default, Deserialize)]
struct MattermostErrorBody {
    #[serde(default)]
    id: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    detailed_error: String,
    #[serde(default)]
    request_id: String,
    #[serde(default)]
    status_code: i32,
}

impl MattermostErrorBody {
    fn render(&self) -> String {
        if self.detailed_error.is_empty() {
            self.message.clone()
        } else {
            format!("{}.{}", self.message, self.detailed_error)
        }
    }
}

/// Delivers single messages to a chat webhook, wrapped in a channel and
/// display-name envelope.
#[derive(Debug)]
pub struct MattermostSender {
    client: reqwest::Client,
    webhook_url: String,
    username: String,
    channel: String,
}

impl MattermostSender {
    /// Creates a sender posting to the given webhook url.
    pub fn new(
        webhook_url: impl Into<String>,
        username: impl Into<String>,
        channel: impl Into<String>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            client,
            webhook_url: webhook_url.into(),
            username: username.into(),
            channel: channel.into(),
        }
    }
}

#[async_trait]
impl Sender for MattermostSender {
    async fn send(&self, msgs: &PushMsgs, _format: MessageFormat) -> Result<(), SendError> {
        let first = msgs.messages.first().ok_or(SendError::EmptyBatch)?;

        let message = MattermostMessage {
            text: first.message.data.clone(),
            username: self.username.clone(),
            channel: self.channel.clone(),
        };

        debug!(destination = %self.webhook_url, "trying to send");

        let response = self
            .client
            .post(&self.webhook_url)
            .header("Content-Type", APPLICATION_JSON)
            .json(&message)
            .send()
            .await
            .map_err(|err| SendError::Transport {
                message: err.to_string(),
            })?;

        if response.status().as_u16() != 200 {
            let body = response.text().await.unwrap_or_default();
            return match serde_json::from_str::<MattermostErrorBody>(&body) {
                Ok(parsed) => {
                    error!(
                        endpoint = %self.webhook_url,
                        id = %parsed.id,
                        message = %parsed.message,
                        detailed_error = %parsed.detailed_error,
                        request_id = %parsed.request_id,
                        status_code = parsed.status_code,
                        "could not deliver message to mattermost"
                    );
                    Err(SendError::Webhook {
                        text: parsed.render(),
                    })
                }
                Err(_) => Err(SendError::Endpoint { body }),
            };
        }

        debug!(destination = %self.webhook_url, "delivered successfully");
        Ok(())
    }

    fn destination(&self) -> &str {
        &self.webhook_url
    }
}
