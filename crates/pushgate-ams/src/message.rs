//! Message types for the broker's pull/acknowledge primitives.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Key/value pairs of extra data attached to a message.
pub type Attributes = HashMap<String, String>;

/// Options controlling how messages are pulled from a subscription.
///
/// The broker expects both values as JSON **strings**, not numbers or
/// booleans.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullOptions {
    /// Amount of messages to be pulled at once.
    #[serde(rename = "maxMessages")]
    pub max_messages: String,
    /// Whether to return with whatever is available instead of waiting
    /// until the requested amount of messages has gathered.
    #[serde(rename = "returnImmediately")]
    pub return_immediately: String,
}

/// A single broker message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Message id.
    #[serde(rename = "messageId", default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Attribute key/value store.
    #[serde(rename = "attributes", default, skip_serializing_if = "HashMap::is_empty")]
    pub attributes: Attributes,
    /// Base64 encoded data payload.
    #[serde(rename = "data")]
    pub data: String,
    /// Publish time of the message, as formatted by the broker.
    #[serde(rename = "publishTime", default, skip_serializing_if = "String::is_empty")]
    pub publish_time: String,
}

/// A message paired with the id needed to acknowledge it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReceivedMessage {
    /// Id to be used for acknowledgement.
    #[serde(rename = "ackId", default, skip_serializing_if = "String::is_empty")]
    pub ack_id: String,
    /// The message itself.
    #[serde(rename = "message")]
    pub message: Message,
}

/// The batch of received messages a pull returns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReceivedMessagesList {
    /// The received messages, in pull order.
    #[serde(rename = "receivedMessages", default)]
    pub received_messages: Vec<ReceivedMessage>,
}

impl ReceivedMessagesList {
    /// Whether the pull returned no messages.
    pub fn is_empty(&self) -> bool {
        self.received_messages.is_empty()
    }

    /// The last received message of the batch, if any.
    pub fn last(&self) -> Option<&ReceivedMessage> {
        self.received_messages.last()
    }
}

/// Ack ids for the messages being acknowledged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AckMsgs {
    /// The ids to acknowledge.
    #[serde(rename = "ackIds")]
    pub ack_ids: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pull_options_serialize_as_strings() {
        let options = PullOptions {
            max_messages: "3".to_string(),
            return_immediately: "true".to_string(),
        };
        let json = serde_json::to_value(&options).unwrap();
        assert_eq!(json["maxMessages"], "3");
        assert_eq!(json["returnImmediately"], "true");
    }

    #[test]
    fn received_messages_list_last() {
        let list: ReceivedMessagesList = serde_json::from_str(
            r#"{"receivedMessages":[
                {"ackId":"ackid_0","message":{"messageId":"id_0","data":"c29tZSBkYXRh"}},
                {"ackId":"ackid_1","message":{"messageId":"id_1","data":"c29tZSBkYXRh"}}
            ]}"#,
        )
        .unwrap();

        assert!(!list.is_empty());
        assert_eq!(list.last().unwrap().ack_id, "ackid_1");
    }

    #[test]
    fn empty_list_parses_from_empty_object() {
        let list: ReceivedMessagesList = serde_json::from_str("{}").unwrap();
        assert!(list.is_empty());
        assert!(list.last().is_none());
    }

    #[test]
    fn message_omits_empty_optional_fields() {
        let message = Message {
            data: "c29tZSBkYXRh".to_string(),
            ..Default::default()
        };
        let json = serde_json::to_value(&message).unwrap();
        let object = json.as_object().unwrap();
        assert_eq!(object.len(), 1);
        assert_eq!(object["data"], "c29tZSBkYXRh");
    }
}
