//! Full transport round trip: the control plane served over gRPC, driven
//! with the generated client, against a wiremock broker and destination.

use std::{sync::Arc, time::Duration};

use pushgate_ams::AmsClient;
use pushgate_api::{
    pb,
    rpc::{push_service_client::PushServiceClient, push_service_server::PushServiceServer},
    PushService,
};
use pushgate_delivery::PushRegistry;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::{transport::Server, Code, Request};
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

const FULL_SUB: &str = "/projects/p1/subscriptions/sub1";

async fn start_server(broker: &MockServer) -> PushServiceClient<tonic::transport::Channel> {
    let address = broker.address();
    let http = reqwest::Client::new();
    let ams = Arc::new(AmsClient::new(
        "http",
        &address.ip().to_string(),
        address.port(),
        "token-1",
        http.clone(),
    ));
    let registry = PushRegistry::new(ams, http, "token-1", true);
    registry.start().await;

    let service = PushService::new(registry, Vec::new(), false);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");

    tokio::spawn(async move {
        Server::builder()
            .add_service(PushServiceServer::new(service))
            .serve_with_incoming(TcpListenerStream::new(listener))
            .await
            .expect("server runs");
    });

    let mut last_err = None;
    for _ in 0..50 {
        match PushServiceClient::connect(format!("http://{addr}")).await {
            Ok(client) => return client,
            Err(err) => {
                last_err = Some(err);
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        }
    }
    panic!("could not connect to the test server: {last_err:?}");
}

fn subscription(endpoint: &str) -> pb::Subscription {
    pb::Subscription {
        full_name: FULL_SUB.to_string(),
        full_topic: "/projects/p1/topics/topic1".to_string(),
        push_config: Some(pb::PushConfig {
            r#type: String::new(),
            push_endpoint: endpoint.to_string(),
            max_messages: 1,
            authorization_header: String::new(),
            base_64_decode: false,
            retry_policy: Some(pb::RetryPolicy {
                r#type: "linear".to_string(),
                period: 100,
            }),
            mattermost_url: String::new(),
            mattermost_username: String::new(),
            mattermost_channel: String::new(),
        }),
    }
}

#[tokio::test]
async fn push_cycle_driven_end_to_end_over_grpc() {
    let broker = MockServer::start().await;
    let destination = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("/v1{FULL_SUB}:pull")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "receivedMessages": [{
                "ackId": "ackid_0",
                "message": {"messageId": "id_0", "data": "c29tZSBkYXRh"}
            }]
        })))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&broker)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .mount(&broker)
        .await;
    Mock::given(method("POST"))
        .and(path("/r"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1..)
        .mount(&destination)
        .await;

    let mut client = start_server(&broker).await;

    client
        .status(Request::new(pb::StatusRequest {}))
        .await
        .expect("service is ready");

    let response = client
        .activate_subscription(Request::new(pb::ActivateSubscriptionRequest {
            subscription: Some(subscription(&format!("{}/r", destination.uri()))),
        }))
        .await
        .expect("activation succeeds")
        .into_inner();
    assert_eq!(response.message, format!("Subscription {FULL_SUB} activated"));

    // wait for the cycle to deliver and settle
    let deadline = tokio::time::Instant::now() + Duration::from_secs(3);
    loop {
        let status = client
            .subscription_status(Request::new(pb::SubscriptionStatusRequest {
                full_name: FULL_SUB.to_string(),
            }))
            .await
            .expect("status query succeeds")
            .into_inner()
            .status;
        if status == format!("Subscription {FULL_SUB} is currently active")
            && !destination.received_requests().await.unwrap_or_default().is_empty()
        {
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "delivery did not settle, last status: {status}"
        );
        tokio::time::sleep(Duration::from_millis(25)).await;
    }

    let response = client
        .deactivate_subscription(Request::new(pb::DeactivateSubscriptionRequest {
            full_name: FULL_SUB.to_string(),
        }))
        .await
        .expect("deactivation succeeds")
        .into_inner();
    assert_eq!(response.message, format!("Subscription {FULL_SUB} deactivated"));

    let status = client
        .subscription_status(Request::new(pb::SubscriptionStatusRequest {
            full_name: FULL_SUB.to_string(),
        }))
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::NotFound);
}
