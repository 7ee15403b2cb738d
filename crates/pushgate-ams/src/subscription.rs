//! Subscription definitions as exposed by the broker's REST API.

use serde::{Deserialize, Serialize};

/// A broker subscription and its push configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    /// Fully qualified subscription name,
    /// e.g. `/projects/project_one/subscriptions/sub_one`.
    #[serde(rename = "name", default)]
    pub full_name: String,
    /// Fully qualified topic the subscription reads from.
    #[serde(rename = "topic", default)]
    pub full_topic: String,
    /// Push configuration; left at its default for pull-only subscriptions.
    #[serde(rename = "pushConfig", default)]
    pub push_config: PushConfig,
    /// Current push status text registered at the broker.
    #[serde(rename = "push_status", default, skip_serializing_if = "String::is_empty")]
    pub push_status: String,
}

impl Subscription {
    /// Whether the subscription carries any push configuration at all.
    pub fn is_push_enabled(&self) -> bool {
        self.push_config != PushConfig::default()
    }
}

/// Optional configuration for push operations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PushConfig {
    /// Destination variant tag, e.g. `http_endpoint` or `mattermost`.
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub push_type: String,
    /// Remote endpoint messages are delivered to.
    #[serde(rename = "pushEndpoint", default, skip_serializing_if = "String::is_empty")]
    pub push_endpoint: String,
    /// Optional value supplied as an `Authorization` header on push requests.
    #[serde(rename = "authorization_header", default)]
    pub authorization_header: AuthorizationHeader,
    /// Amount of messages pulled per cycle.
    #[serde(rename = "maxMessages", default)]
    pub max_messages: i64,
    /// Whether message payloads should be base64 decoded before delivery.
    #[serde(rename = "base_64_decode", default)]
    pub base_64_decode: bool,
    /// Retry policy governing the push cycle.
    #[serde(rename = "retryPolicy", default)]
    pub retry_policy: RetryPolicy,
    /// Webhook url for chat destinations.
    #[serde(rename = "mattermost_url", default, skip_serializing_if = "String::is_empty")]
    pub mattermost_url: String,
    /// Display name used when posting to chat destinations.
    #[serde(rename = "mattermost_username", default, skip_serializing_if = "String::is_empty")]
    pub mattermost_username: String,
    /// Channel messages are posted to.
    #[serde(rename = "mattermost_channel", default, skip_serializing_if = "String::is_empty")]
    pub mattermost_channel: String,
}

/// Optional `Authorization` header value for push requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationHeader {
    /// The header value, verbatim.
    #[serde(rename = "value", default, skip_serializing_if = "String::is_empty")]
    pub value: String,
}

/// Retry policy descriptor attached to a push configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Policy variant tag, e.g. `linear` or `slowstart`.
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub policy_type: String,
    /// Cycle period in milliseconds, used by the linear policy.
    #[serde(rename = "period", default)]
    pub period: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push_enabled_subscription() -> Subscription {
        Subscription {
            full_name: "/projects/p1/subscriptions/sub1".to_string(),
            full_topic: "/projects/p1/topics/topic1".to_string(),
            push_config: PushConfig {
                push_type: "http_endpoint".to_string(),
                push_endpoint: "https://127.0.0.1:5000/receive".to_string(),
                authorization_header: AuthorizationHeader {
                    value: "auth-header-1".to_string(),
                },
                max_messages: 3,
                base_64_decode: true,
                retry_policy: RetryPolicy {
                    policy_type: "linear".to_string(),
                    period: 300,
                },
                ..Default::default()
            },
            push_status: String::new(),
        }
    }

    #[test]
    fn subscription_round_trip_preserves_push_config() {
        let subscription = push_enabled_subscription();
        let json = serde_json::to_string(&subscription).unwrap();
        let reparsed: Subscription = serde_json::from_str(&json).unwrap();

        assert_eq!(reparsed.full_name, subscription.full_name);
        assert_eq!(reparsed.full_topic, subscription.full_topic);
        assert_eq!(reparsed.push_config, subscription.push_config);
    }

    #[test]
    fn subscription_parses_broker_payload() {
        let json = r#"{
            "name": "/projects/p1/subscriptions/sub1",
            "topic": "/projects/p1/topics/topic1",
            "pushConfig": {
                "type": "mattermost",
                "mattermost_url": "https://chat.example.com/hooks/h1",
                "mattermost_username": "bot",
                "mattermost_channel": "ops",
                "maxMessages": 1,
                "retryPolicy": {"type": "slowstart"}
            }
        }"#;

        let subscription: Subscription = serde_json::from_str(json).unwrap();
        assert!(subscription.is_push_enabled());
        assert_eq!(subscription.push_config.push_type, "mattermost");
        assert_eq!(subscription.push_config.retry_policy.policy_type, "slowstart");
        assert_eq!(subscription.push_config.retry_policy.period, 0);
    }

    #[test]
    fn pull_only_subscription_is_not_push_enabled() {
        let subscription: Subscription = serde_json::from_str(
            r#"{"name": "/projects/p1/subscriptions/sub1", "topic": "/projects/p1/topics/topic1"}"#,
        )
        .unwrap();
        assert!(!subscription.is_push_enabled());
    }
}
