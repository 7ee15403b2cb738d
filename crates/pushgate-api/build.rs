//! Generates the gRPC service glue for the push control plane.
//!
//! The message structs are hand-written prost derives in `src/pb.rs`; only
//! the service trait, server and client are generated here, so no `.proto`
//! files or protoc toolchain are involved.

use tonic_build::manual::{Builder, Method, Service};

fn main() {
    let service = Service::builder()
        .name("PushService")
        .package("pushgate.v1")
        .method(
            Method::builder()
                .name("status")
                .route_name("Status")
                .input_type("crate::pb::StatusRequest")
                .output_type("crate::pb::StatusResponse")
                .codec_path("tonic::codec::ProstCodec")
                .build(),
        )
        .method(
            Method::builder()
                .name("activate_subscription")
                .route_name("ActivateSubscription")
                .input_type("crate::pb::ActivateSubscriptionRequest")
                .output_type("crate::pb::ActivateSubscriptionResponse")
                .codec_path("tonic::codec::ProstCodec")
                .build(),
        )
        .method(
            Method::builder()
                .name("deactivate_subscription")
                .route_name("DeactivateSubscription")
                .input_type("crate::pb::DeactivateSubscriptionRequest")
                .output_type("crate::pb::DeactivateSubscriptionResponse")
                .codec_path("tonic::codec::ProstCodec")
                .build(),
        )
        .method(
            Method::builder()
                .name("subscription_status")
                .route_name("SubscriptionStatus")
                .input_type("crate::pb::SubscriptionStatusRequest")
                .output_type("crate::pb::SubscriptionStatusResponse")
                .codec_path("tonic::codec::ProstCodec")
                .build(),
        )
        .build();

    Builder::new().compile(&[service]);
}
