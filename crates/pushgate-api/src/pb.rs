//! Message types of the push control plane RPC surface.
//!
//! Standard protobuf wire format via hand-written prost derives; no
//! `.proto` files. The service glue is generated by the build script.

use pushgate_delivery as delivery;

/// Request for the service readiness check.
#[derive(Clone, PartialEq, prost::Message)]
pub struct StatusRequest {}

/// Empty response of a successful readiness check.
#[derive(Clone, PartialEq, prost::Message)]
pub struct StatusResponse {}

/// A subscription to be activated.
#[derive(Clone, PartialEq, prost::Message)]
pub struct Subscription {
    /// Fully qualified subscription name.
    #[prost(string, tag = "1")]
    pub full_name: String,
    /// Fully qualified topic the subscription reads from.
    #[prost(string, tag = "2")]
    pub full_topic: String,
    /// Push configuration.
    #[prost(message, optional, tag = "3")]
    pub push_config: Option<PushConfig>,
}

/// Push configuration of a subscription.
#[derive(Clone, PartialEq, prost::Message)]
pub struct PushConfig {
    /// Destination variant tag, e.g. `http_endpoint` or `mattermost`.
    #[prost(string, tag = "1")]
    pub r#type: String,
    /// Remote endpoint messages are delivered to.
    #[prost(string, tag = "2")]
    pub push_endpoint: String,
    /// Amount of messages pulled per cycle.
    #[prost(int64, tag = "3")]
    pub max_messages: i64,
    /// Optional `Authorization` header value for push requests.
    #[prost(string, tag = "4")]
    pub authorization_header: String,
    /// Whether message payloads should be base64 decoded before delivery.
    #[prost(bool, tag = "5")]
    pub base_64_decode: bool,
    /// Retry policy governing the push cycle.
    #[prost(message, optional, tag = "6")]
    pub retry_policy: Option<RetryPolicy>,
    /// Webhook url for chat destinations.
    #[prost(string, tag = "7")]
    pub mattermost_url: String,
    /// Display name used when posting to chat destinations.
    #[prost(string, tag = "8")]
    pub mattermost_username: String,
    /// Channel messages are posted to.
    #[prost(string, tag = "9")]
    pub mattermost_channel: String,
}

/// Retry policy descriptor.
#[derive(Clone, PartialEq, prost::Message)]
pub struct RetryPolicy {
    /// Policy variant tag, `linear` or `slowstart`.
    #[prost(string, tag = "1")]
    pub r#type: String,
    /// Cycle period in milliseconds, used by the linear policy.
    #[prost(uint32, tag = "2")]
    pub period: u32,
}

/// Request to activate a subscription.
#[derive(Clone, PartialEq, prost::Message)]
pub struct ActivateSubscriptionRequest {
    /// The subscription to activate.
    #[prost(message, optional, tag = "1")]
    pub subscription: Option<Subscription>,
}

/// Response of a successful activation.
#[derive(Clone, PartialEq, prost::Message)]
pub struct ActivateSubscriptionResponse {
    /// Human readable confirmation.
    #[prost(string, tag = "1")]
    pub message: String,
}

/// Request to deactivate a subscription by name.
#[derive(Clone, PartialEq, prost::Message)]
pub struct DeactivateSubscriptionRequest {
    /// Fully qualified subscription name.
    #[prost(string, tag = "1")]
    pub full_name: String,
}

/// Response of a successful deactivation.
#[derive(Clone, PartialEq, prost::Message)]
pub struct DeactivateSubscriptionResponse {
    /// Human readable confirmation.
    #[prost(string, tag = "1")]
    pub message: String,
}

/// Request for a subscription's worker status.
#[derive(Clone, PartialEq, prost::Message)]
pub struct SubscriptionStatusRequest {
    /// Fully qualified subscription name.
    #[prost(string, tag = "1")]
    pub full_name: String,
}

/// A subscription's worker status.
#[derive(Clone, PartialEq, prost::Message)]
pub struct SubscriptionStatusResponse {
    /// The worker's health string.
    #[prost(string, tag = "1")]
    pub status: String,
}

impl From<Subscription> for delivery::Subscription {
    fn from(sub: Subscription) -> Self {
        Self {
            full_name: sub.full_name,
            full_topic: sub.full_topic,
            push_config: sub.push_config.map(|cfg| delivery::PushConfig {
                push_type: cfg.r#type,
                push_endpoint: cfg.push_endpoint,
                authorization_header: cfg.authorization_header,
                max_messages: cfg.max_messages,
                base_64_decode: cfg.base_64_decode,
                retry_policy: cfg.retry_policy.map(|retry| delivery::RetryPolicyConfig {
                    policy_type: retry.r#type,
                    period: retry.period,
                }),
                mattermost_url: cfg.mattermost_url,
                mattermost_username: cfg.mattermost_username,
                mattermost_channel: cfg.mattermost_channel,
            }),
        }
    }
}
