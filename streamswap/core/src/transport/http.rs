//! HTTP Transport
//!
//! [`Transport`] over reqwest. The response body is exposed as reqwest's
//! `bytes_stream()`, so buffers reach the session exactly as the connection
//! delivers them.
//!
//! No total request timeout is set: a streamed response may legitimately stay
//! open for minutes. Only connection establishment is bounded.

use async_trait::async_trait;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use super::{Transport, TransportResponse};
use crate::config::StreamerConfig;
use crate::error::{StreamReadError, TransportError};
use crate::request::{DispatchRequest, HttpMethod};

/// reqwest-backed transport
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport from configuration
    pub fn from_config(config: &StreamerConfig) -> Result<Self, TransportError> {
        let mut builder = reqwest::Client::builder().connect_timeout(config.connect_timeout);
        if let Some(ref user_agent) = config.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }

        let client = builder
            .build()
            .map_err(|e| TransportError::InvalidRequest(format!("HTTP client: {e}")))?;

        Ok(Self { client })
    }

    /// Wrap an existing client
    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn method(method: HttpMethod) -> reqwest::Method {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Patch => reqwest::Method::PATCH,
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn name(&self) -> &str {
        "http"
    }

    async fn perform(
        &self,
        request: &DispatchRequest,
        cancel: &CancellationToken,
    ) -> Result<TransportResponse, TransportError> {
        let mut builder = self
            .client
            .request(Self::method(request.method), &request.url);

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(ref body) = request.body {
            builder = builder.body(body.clone());
        }

        let response = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                return Err(TransportError::Network("request cancelled".to_string()));
            }
            result = builder.send() => result.map_err(|e| {
                if e.is_builder() {
                    TransportError::InvalidRequest(e.to_string())
                } else {
                    TransportError::Network(e.to_string())
                }
            })?,
        };

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        tracing::debug!(
            url = %request.url,
            status = status,
            content_type = ?content_type,
            "Response head received"
        );

        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(StreamReadError::new))
            .boxed();

        Ok(TransportResponse::new(status, content_type, body))
    }
}
