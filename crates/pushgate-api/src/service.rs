//! The control plane RPC service.
//!
//! A thin shell over the worker registry: each unary handler runs the
//! status and auth gates, delegates to the registry, and maps registry
//! errors onto RPC status codes.

use std::sync::Arc;

use pushgate_delivery::{PushRegistry, RegistryError};
use tonic::{Request, Response, Status};

use crate::{
    auth::{authorize, check_service_status, peer_leaf_common_name, SERVICE_UNAVAILABLE},
    pb,
    rpc::push_service_server,
};

/// The push control plane.
pub struct PushService {
    registry: Arc<PushRegistry>,
    acl: Vec<String>,
    tls_enabled: bool,
}

impl PushService {
    /// Creates the service over a registry, with the ACL and TLS switch the
    /// auth gate applies.
    pub fn new(registry: Arc<PushRegistry>, acl: Vec<String>, tls_enabled: bool) -> Self {
        Self {
            registry,
            acl,
            tls_enabled,
        }
    }

    /// Runs the request-level gates for a method.
    async fn gate<T>(&self, method: &str, request: &Request<T>) -> Result<(), Status> {
        let status = self.registry.status().await;
        check_service_status(&status, method)?;

        let certs = request.peer_certs();
        let peer_cn = peer_leaf_common_name(certs.as_deref().map(Vec::as_slice));
        authorize(&self.acl, self.tls_enabled, peer_cn.as_deref())?;

        Ok(())
    }
}

fn into_status(err: RegistryError) -> Status {
    match err {
        RegistryError::InvalidArgument(msg) => Status::invalid_argument(msg),
        RegistryError::AlreadyExists(msg) => Status::already_exists(msg),
        RegistryError::NotFound(msg) => Status::not_found(msg),
    }
}

#[tonic::async_trait]
impl push_service_server::PushService for PushService {
    async fn status(
        &self,
        request: Request<pb::StatusRequest>,
    ) -> Result<Response<pb::StatusResponse>, Status> {
        self.gate("Status", &request).await?;

        let status = self.registry.status().await;
        if status != "ok" {
            return Err(Status::internal(format!("{SERVICE_UNAVAILABLE}.{status}")));
        }

        Ok(Response::new(pb::StatusResponse {}))
    }

    async fn activate_subscription(
        &self,
        request: Request<pb::ActivateSubscriptionRequest>,
    ) -> Result<Response<pb::ActivateSubscriptionResponse>, Status> {
        self.gate("ActivateSubscription", &request).await?;

        let subscription = request
            .into_inner()
            .subscription
            .ok_or_else(|| Status::invalid_argument("Empty subscription"))?;

        let message = self
            .registry
            .activate_subscription(subscription.into())
            .await
            .map_err(into_status)?;

        Ok(Response::new(pb::ActivateSubscriptionResponse { message }))
    }

    async fn deactivate_subscription(
        &self,
        request: Request<pb::DeactivateSubscriptionRequest>,
    ) -> Result<Response<pb::DeactivateSubscriptionResponse>, Status> {
        self.gate("DeactivateSubscription", &request).await?;

        let message = self
            .registry
            .deactivate_subscription(&request.into_inner().full_name)
            .await
            .map_err(into_status)?;

        Ok(Response::new(pb::DeactivateSubscriptionResponse { message }))
    }

    async fn subscription_status(
        &self,
        request: Request<pb::SubscriptionStatusRequest>,
    ) -> Result<Response<pb::SubscriptionStatusResponse>, Status> {
        self.gate("SubscriptionStatus", &request).await?;

        let status = self
            .registry
            .subscription_status(&request.into_inner().full_name)
            .await
            .map_err(into_status)?;

        Ok(Response::new(pb::SubscriptionStatusResponse { status }))
    }
}
