use std::time::Duration;

use reqwest::{Client, StatusCode};

use super::token::{TokenError, TokenIssuer};
use super::Notification;

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error("backend request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("backend rejected notification with HTTP {0}")]
    Status(StatusCode),
}

/// HTTP client for the backend's transaction resource.
///
/// Cloning is cheap: [`reqwest::Client`] is reference counted.
#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    endpoint: String,
    tokens: TokenIssuer,
}

impl BackendClient {
    /// `backend_url` is the service root; updates go to `{backend_url}/transaction`.
    pub fn new(backend_url: &str, tokens: TokenIssuer, timeout: Duration) -> Result<Self, NotifyError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/transaction", backend_url.trim_end_matches('/')),
            tokens,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// `PUT` the outcome with a freshly minted bearer token.
    pub async fn send(&self, notification: &Notification) -> Result<StatusCode, NotifyError> {
        let token = self.tokens.issue()?;

        let response = self
            .client
            .put(&self.endpoint)
            .bearer_auth(token)
            .json(notification)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Status(status));
        }
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_without_double_slash() {
        let tokens = TokenIssuer::new("s", "payment-ms", "backend");
        let client =
            BackendClient::new("http://backend:3000/", tokens, Duration::from_secs(1)).unwrap();
        assert_eq!(client.endpoint(), "http://backend:3000/transaction");
    }

    #[tokio::test]
    async fn unreachable_backend_is_an_http_error() {
        let tokens = TokenIssuer::new("s", "payment-ms", "backend");
        // Port 9 (discard) on loopback is closed in test environments.
        let client =
            BackendClient::new("http://127.0.0.1:9", tokens, Duration::from_millis(500)).unwrap();

        let notification = Notification::new(
            1,
            crate::model::AttemptStatus::Approved,
            "Transaction approved",
        );
        let result = client.send(&notification).await;
        assert!(matches!(result, Err(NotifyError::Http(_))));
    }
}
