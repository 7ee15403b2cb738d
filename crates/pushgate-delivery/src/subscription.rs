//! The control record a worker is built from.
//!
//! Created by `ActivateSubscription`, immutable for the lifetime of its
//! worker, destroyed with it. The broker's own subscription DTO converts
//! into this form during bootstrap.

use pushgate_ams as ams;

/// Destination tag for generic HTTP endpoints.
pub const HTTP_ENDPOINT_TYPE: &str = "http_endpoint";
/// Destination tag for chat-webhook endpoints.
pub const MATTERMOST_TYPE: &str = "mattermost";

/// A subscription as known to the control plane.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Subscription {
    /// Fully qualified subscription name.
    pub full_name: String,
    /// Fully qualified topic the subscription reads from.
    pub full_topic: String,
    /// Push configuration; activation rejects subscriptions without one.
    pub push_config: Option<PushConfig>,
}

/// Push configuration of a subscription.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PushConfig {
    /// Destination variant tag; an empty tag means a generic HTTP endpoint.
    pub push_type: String,
    /// Remote endpoint messages are delivered to.
    pub push_endpoint: String,
    /// Optional `Authorization` header value for push requests.
    pub authorization_header: String,
    /// Amount of messages pulled per cycle; 1 selects the single-message
    /// envelope, anything larger the multi-message one.
    pub max_messages: i64,
    /// Whether message payloads should be base64 decoded before delivery.
    pub base_64_decode: bool,
    /// Retry policy governing the cycle; activation rejects configurations
    /// without one.
    pub retry_policy: Option<RetryPolicyConfig>,
    /// Webhook url for chat destinations.
    pub mattermost_url: String,
    /// Display name used when posting to chat destinations.
    pub mattermost_username: String,
    /// Channel messages are posted to.
    pub mattermost_channel: String,
}

/// Retry policy descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetryPolicyConfig {
    /// Policy variant tag, `linear` or `slowstart`.
    pub policy_type: String,
    /// Cycle period in milliseconds, used by the linear policy.
    pub period: u32,
}

impl From<ams::Subscription> for Subscription {
    fn from(sub: ams::Subscription) -> Self {
        let cfg = sub.push_config;
        Self {
            full_name: sub.full_name,
            full_topic: sub.full_topic,
            push_config: Some(PushConfig {
                push_type: cfg.push_type,
                push_endpoint: cfg.push_endpoint,
                authorization_header: cfg.authorization_header.value,
                // the broker leaves the field unset for subscriptions
                // predating batched push
                max_messages: if cfg.max_messages == 0 { 1 } else { cfg.max_messages },
                base_64_decode: cfg.base_64_decode,
                retry_policy: Some(RetryPolicyConfig {
                    policy_type: cfg.retry_policy.policy_type,
                    period: cfg.retry_policy.period,
                }),
                mattermost_url: cfg.mattermost_url,
                mattermost_username: cfg.mattermost_username,
                mattermost_channel: cfg.mattermost_channel,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broker_dto_translates_to_the_control_record() {
        let sub = ams::Subscription {
            full_name: "/projects/p1/subscriptions/sub1".to_string(),
            full_topic: "/projects/p1/topics/topic1".to_string(),
            push_config: ams::PushConfig {
                push_type: "http_endpoint".to_string(),
                push_endpoint: "https://127.0.0.1:5000/receive".to_string(),
                authorization_header: ams::AuthorizationHeader {
                    value: "auth-1".to_string(),
                },
                max_messages: 3,
                base_64_decode: true,
                retry_policy: ams::RetryPolicy {
                    policy_type: "linear".to_string(),
                    period: 300,
                },
                ..Default::default()
            },
            push_status: String::new(),
        };

        let translated = Subscription::from(sub);
        assert_eq!(translated.full_name, "/projects/p1/subscriptions/sub1");
        let cfg = translated.push_config.unwrap();
        assert_eq!(cfg.push_endpoint, "https://127.0.0.1:5000/receive");
        assert_eq!(cfg.authorization_header, "auth-1");
        assert_eq!(cfg.max_messages, 3);
        assert!(cfg.base_64_decode);
        let retry = cfg.retry_policy.unwrap();
        assert_eq!(retry.policy_type, "linear");
        assert_eq!(retry.period, 300);
    }

    #[test]
    fn unset_max_messages_defaults_to_one() {
        let sub = ams::Subscription {
            full_name: "/projects/p1/subscriptions/sub1".to_string(),
            push_config: ams::PushConfig {
                push_endpoint: "https://127.0.0.1:5000/receive".to_string(),
                retry_policy: ams::RetryPolicy {
                    policy_type: "linear".to_string(),
                    period: 300,
                },
                ..Default::default()
            },
            ..Default::default()
        };

        let translated = Subscription::from(sub);
        assert_eq!(translated.push_config.unwrap().max_messages, 1);
    }
}
