//! Webhook forwarder.
//!
//! Every message body becomes one `POST` to the configured webhook. The call
//! never fails the caller: all problems are folded into [`ForwardOutcome`].

use reqwest::{header, Client, StatusCode};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Why a forward attempt did not count as delivered.
#[derive(Debug, Error)]
pub enum ForwardFailure {
    #[error("error creating request: {0}")]
    Request(#[source] reqwest::Error),

    #[error("error posting to webhook: {0}")]
    Network(#[source] reqwest::Error),

    #[error("webhook returned status code {0}")]
    Status(u16),
}

/// Result of a single forward attempt.
#[derive(Debug)]
pub enum ForwardOutcome {
    Forwarded,
    Error(ForwardFailure),
}

impl ForwardOutcome {
    pub fn is_forwarded(&self) -> bool {
        matches!(self, ForwardOutcome::Forwarded)
    }
}

/// One outbound call, built per message and dropped once it completes.
#[derive(Debug)]
pub struct ForwardAttempt<'a> {
    url: &'a Url,
    content_type: &'static str,
    token: Option<&'a str>,
    payload: Vec<u8>,
}

impl ForwardAttempt<'_> {
    fn into_request(self, client: &Client) -> reqwest::RequestBuilder {
        let request = client
            .post(self.url.clone())
            .header(header::CONTENT_TYPE, self.content_type)
            .body(self.payload);

        match self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

/// Posts message bodies to a single webhook over a shared client.
#[derive(Clone)]
pub struct Forwarder {
    client: Client,
    url: Url,
    token: Option<String>,
}

impl Forwarder {
    pub fn new(client: Client, url: Url, token: Option<String>) -> Self {
        Self { client, url, token }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    fn attempt(&self, body: &[u8]) -> ForwardAttempt<'_> {
        ForwardAttempt {
            url: &self.url,
            content_type: CONTENT_TYPE_JSON,
            token: self.token.as_deref(),
            payload: body.to_vec(),
        }
    }

    /// Forward `body` to the webhook.
    ///
    /// Only an exact `200 OK` counts as [`ForwardOutcome::Forwarded`]; every
    /// other status, including other 2xx codes, is an error.
    pub async fn forward(&self, body: &[u8]) -> ForwardOutcome {
        let request = match self.attempt(body).into_request(&self.client).build() {
            Ok(request) => request,
            Err(e) => return self.failed(ForwardFailure::Request(e)),
        };

        let response = match self.client.execute(request).await {
            Ok(response) => response,
            Err(e) => return self.failed(ForwardFailure::Network(e)),
        };

        let status = response.status();
        if status != StatusCode::OK {
            return self.failed(ForwardFailure::Status(status.as_u16()));
        }

        debug!(url = %self.url, body_length = body.len(), "forward_succeeded");
        ForwardOutcome::Forwarded
    }

    fn failed(&self, failure: ForwardFailure) -> ForwardOutcome {
        warn!(url = %self.url, error = %failure, "forward_failed");
        ForwardOutcome::Error(failure)
    }
}
