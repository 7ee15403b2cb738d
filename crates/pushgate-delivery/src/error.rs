//! Error types for the delivery engine.
//!
//! Consume and send failures are recorded into a worker's health string and
//! recovered locally by the retry policy; registry errors surface to RPC
//! callers. Error display text is part of the contract with both: health
//! strings embed it verbatim, and the control plane maps registry variants
//! onto RPC status codes.

use pushgate_ams::AmsError;
use thiserror::Error;

/// Errors raised on the read side of a push cycle.
#[derive(Debug, Clone, Error)]
pub enum ConsumeError {
    /// The subscription had nothing to deliver. A control signal rather
    /// than a failure: the worker skips the cycle without recording it.
    #[error("no new messages")]
    NoNewMessages,

    /// The broker rejected the pull or the request never reached it.
    #[error(transparent)]
    Broker(#[from] AmsError),

    /// Acknowledging a delivered message failed.
    #[error("an error occurred while trying to acknowledge message with ackId {ack_id} from {resource}, {body}")]
    Ack {
        /// The ack id that could not be acknowledged.
        ack_id: String,
        /// Human readable identity of the data source.
        resource: String,
        /// The broker's error text.
        body: String,
    },
}

/// Errors raised while delivering a batch to an external destination.
#[derive(Debug, Error)]
pub enum SendError {
    /// The destination answered outside the accepted status range; the
    /// display text is the raw response body.
    #[error("{body}")]
    Endpoint {
        /// Raw response body returned by the destination.
        body: String,
    },

    /// The webhook destination returned a structured error payload.
    #[error("{text}")]
    Webhook {
        /// Rendered `message` or `message.detailed_error` text.
        text: String,
    },

    /// A single-message send was attempted with an empty batch.
    #[error("no message")]
    EmptyBatch,

    /// The request never produced a response.
    #[error("{message}")]
    Transport {
        /// Description of the transport failure.
        message: String,
    },

    /// The push envelope could not be serialized.
    #[error("{0}")]
    Encode(#[from] serde_json::Error),
}

/// Errors raised while constructing a push worker.
#[derive(Debug, Clone, Error)]
pub enum WorkerError {
    /// The subscription's retry policy names an unknown variant.
    #[error("worker {policy_type} not yet implemented")]
    NotImplemented {
        /// The unrecognized policy tag.
        policy_type: String,
    },

    /// The subscription carries no push configuration.
    #[error("subscription has no push configuration")]
    MissingPushConfig,
}

/// Errors surfaced by the worker registry to RPC callers.
#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    /// The request was malformed: missing fields, an unparseable endpoint
    /// url, or an unknown policy or destination variant.
    #[error("{0}")]
    InvalidArgument(String),

    /// A worker for the subscription already exists.
    #[error("{0}")]
    AlreadyExists(String),

    /// No worker exists for the subscription.
    #[error("{0}")]
    NotFound(String),
}
