//! HTTP client for the AMS messaging broker.
//!
//! Provides a thin, stateless facade over the broker's REST API: fetching
//! the push worker's user profile, retrieving subscription definitions, and
//! the pull/acknowledge message primitives. All request and response bodies
//! use the broker's JSON field names verbatim so that payloads survive a
//! round trip through this crate unchanged.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod error;
pub mod message;
pub mod subscription;
pub mod user;

pub use client::AmsClient;
pub use error::{AmsError, Result};
pub use message::{AckMsgs, Attributes, Message, PullOptions, ReceivedMessage, ReceivedMessagesList};
pub use subscription::{AuthorizationHeader, PushConfig, RetryPolicy, Subscription};
pub use user::{Project, UserInfo};
