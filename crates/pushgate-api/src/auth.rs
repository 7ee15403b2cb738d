//! Request-level predicates run before any control-plane handler.
//!
//! Two gates apply to every method: the status gate refuses all traffic
//! except the readiness check while the registry is not ready, and the auth
//! gate admits only peers whose TLS leaf certificate carries an allowed
//! common name. With TLS disabled the auth gate is a no-op.

use tonic::Status;
use tracing::error;

/// Message returned while the registry is not ready to serve.
pub const SERVICE_UNAVAILABLE: &str =
    "The push service is currently unable to handle any requests";

/// Canonical method identifier of the readiness check, the only call
/// allowed through a not-ready registry.
pub const STATUS_METHOD: &str = "Status";

/// Refuses every method except [`STATUS_METHOD`] while the registry status
/// is not `"ok"`. The status value is free-form text; only that exact
/// string unlocks the gate.
pub fn check_service_status(status: &str, method: &str) -> Result<(), Status> {
    if method != STATUS_METHOD && status != "ok" {
        return Err(Status::internal(SERVICE_UNAVAILABLE));
    }
    Ok(())
}

/// Admits the peer iff TLS is disabled, or its leaf certificate's subject
/// common name appears in the ACL.
pub fn authorize(acl: &[String], tls_enabled: bool, peer_cn: Option<&str>) -> Result<(), Status> {
    if !tls_enabled {
        return Ok(());
    }

    match peer_cn {
        Some(cn) if acl.iter().any(|allowed| allowed == cn) => Ok(()),
        Some(cn) => {
            error!(cn, ?acl, "provided certificate's cn didn't match any acl entry");
            Err(Status::unauthenticated("UNAUTHORISED"))
        }
        None => {
            error!("no peer certificate provided");
            Err(Status::unauthenticated("UNAUTHORISED"))
        }
    }
}

/// Extracts the subject common name from the peer's leaf certificate.
///
/// Returns `None` when no certificate chain was presented, the leaf fails
/// to parse, or its subject carries no common name.
pub fn peer_leaf_common_name<C: AsRef<[u8]>>(certs: Option<&[C]>) -> Option<String> {
    let leaf = certs?.first()?;
    let (_, parsed) = x509_parser::parse_x509_certificate(leaf.as_ref()).ok()?;
    let name = parsed
        .subject()
        .iter_common_name()
        .next()
        .and_then(|attr| attr.as_str().ok())
        .map(str::to_string);
    name
}
