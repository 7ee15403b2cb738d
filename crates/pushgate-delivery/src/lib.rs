//! Push delivery engine: per-subscription workers and their control plane.
//!
//! Each activated subscription is served by one worker task driving a
//! pull → send → ack cycle against the broker, paced by a retry policy that
//! owns the cycle timer. The registry is the only mutable shared state:
//! it maps subscription names to running workers, activates and deactivates
//! them on behalf of the RPC surface, bootstraps the fleet from the broker's
//! subscription catalog, and retires workers that report their subscription
//! gone upstream.
//!
//! ```text
//!                 ┌──────────────────────────────┐
//!                 │         PushRegistry         │
//!                 │  name → worker     status    │
//!                 └──────┬────────────────▲──────┘
//!            activate /  │                │  deactivation
//!            deactivate  │                │  channel
//!                 ┌──────▼──────┐  ┌──────┴──────┐
//!                 │ PushWorker  │  │ PushWorker  │   (one task each)
//!                 │ pull→send→ack  │ pull→send→ack
//!                 └──┬───────┬──┘  └─────────────┘
//!                    │       │
//!               broker     destination
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod consumer;
pub mod error;
pub mod registry;
pub mod retry;
pub mod sender;
pub mod subscription;
pub mod worker;

pub use consumer::{AmsConsumer, CancelableError, Consumer};
pub use error::{ConsumeError, RegistryError, SendError, WorkerError};
pub use registry::PushRegistry;
pub use retry::{new_retry_policy, RetryPolicy};
pub use sender::{new_sender, HttpSender, MattermostSender, MessageFormat, PushMsg, PushMsgs, Sender};
pub use subscription::{PushConfig, RetryPolicyConfig, Subscription};
pub use worker::{PushWorker, WorkerHandle};

/// Per-request timeout applied to the shared HTTP client.
pub const DEFAULT_HTTP_TIMEOUT_SECONDS: u64 = 30;
