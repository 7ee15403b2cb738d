//! The broker API client.
//!
//! A stateless facade over a pooled HTTP client. One instance is shared by
//! every consumer and by the registry's bootstrap loader; it holds no
//! per-call state beyond the authentication headers.

use reqwest::Method;
use serde::Serialize;
use tracing::debug;

use crate::{
    error::{AmsError, Result},
    message::{AckMsgs, PullOptions, ReceivedMessagesList},
    subscription::Subscription,
    user::UserInfo,
};

const APPLICATION_JSON: &str = "application/json";

/// Client for the broker's REST API.
///
/// Cheap to clone; the underlying `reqwest::Client` pools connections
/// internally.
#[derive(Debug, Clone)]
pub struct AmsClient {
    http: reqwest::Client,
    scheme: String,
    endpoint: String,
    token: String,
}

impl AmsClient {
    /// Creates a new client for the broker at `scheme://host:port`,
    /// authenticating every request with the given token.
    pub fn new(
        scheme: impl Into<String>,
        host: &str,
        port: u16,
        token: impl Into<String>,
        http: reqwest::Client,
    ) -> Self {
        Self {
            http,
            scheme: scheme.into(),
            endpoint: format!("{host}:{port}"),
            token: token.into(),
        }
    }

    /// The broker's `host:port` endpoint string.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Uses the provided token to fetch the respective user profile.
    pub async fn get_user_by_token(&self, token: &str) -> Result<UserInfo> {
        let url = self.url(&format!("/v1/users:byToken/{token}"));
        let response = self.execute(Method::GET, &url, None::<&()>).await?;
        decode_body(response).await
    }

    /// Retrieves the definition of a subscription.
    ///
    /// Requires the full subscription path,
    /// e.g. `/projects/project_one/subscriptions/sub_one`.
    pub async fn get_subscription(&self, full_sub: &str) -> Result<Subscription> {
        let url = self.url(&format!("/v1{full_sub}"));
        let response = self.execute(Method::GET, &url, None::<&()>).await?;
        decode_body(response).await
    }

    /// Pulls up to `max_messages` messages from a subscription.
    ///
    /// An empty list is a valid success: it means the subscription currently
    /// has nothing to deliver.
    pub async fn pull(
        &self,
        full_sub: &str,
        max_messages: i64,
        return_immediately: bool,
    ) -> Result<ReceivedMessagesList> {
        let url = self.url(&format!("/v1{full_sub}:pull"));
        let options = PullOptions {
            max_messages: max_messages.to_string(),
            return_immediately: return_immediately.to_string(),
        };

        debug!(subscription = full_sub, max_messages, "pulling messages");

        let response = self.execute(Method::POST, &url, Some(&options)).await?;
        decode_body(response).await
    }

    /// Acknowledges that a message has been consumed and processed.
    pub async fn ack(&self, full_sub: &str, ack_id: &str) -> Result<()> {
        let url = self.url(&format!("/v1{full_sub}:acknowledge"));
        let body = AckMsgs {
            ack_ids: vec![ack_id.to_string()],
        };

        self.execute(Method::POST, &url, Some(&body)).await?;
        Ok(())
    }

    fn url(&self, path: &str) -> String {
        format!("{}://{}{}", self.scheme, self.endpoint, path)
    }

    async fn execute(
        &self,
        method: Method,
        url: &str,
        body: Option<&impl Serialize>,
    ) -> Result<reqwest::Response> {
        let mut request = self
            .http
            .request(method, url)
            .header("Content-Type", APPLICATION_JSON)
            .header("x-api-key", &self.token);

        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|err| AmsError::transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AmsError::upstream(body));
        }

        Ok(response)
    }
}

async fn decode_body<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    response
        .json::<T>()
        .await
        .map_err(|err| AmsError::transport(err.to_string()))
}
