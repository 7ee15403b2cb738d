//! Configuration, RPC surface and request gating for the push service.
//!
//! The control plane exposes four unary calls over gRPC: `Status`,
//! `ActivateSubscription`, `DeactivateSubscription` and
//! `SubscriptionStatus`. Each is guarded by a readiness gate and, with TLS
//! enabled, a certificate-CN access control list.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod auth;
pub mod config;
pub mod pb;
pub mod server;
pub mod service;

/// Generated service glue for the control plane (see `build.rs`).
#[allow(missing_docs)]
pub mod rpc {
    include!(concat!(env!("OUT_DIR"), "/pushgate.v1.PushService.rs"));
}

pub use config::Config;
pub use server::serve;
pub use service::PushService;
