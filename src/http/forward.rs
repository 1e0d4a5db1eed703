//! Outbound forwarding to a selected backend.
//!
//! # Responsibilities
//! - Rebuild the inbound request against the backend's base URL
//! - Strip `Host`, `Connection` and `Transfer-Encoding` on the way out
//! - Strip `Content-Encoding` and hop-by-hop headers on the way back
//! - Classify failures: unreachable (502) vs anything else (500)

use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, HeaderName, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use reqwest::Client;
use thiserror::Error;

use crate::load_balancer::Backend;

/// Headers never sent to a backend. The body is re-sent fully buffered, so
/// the inbound transfer coding does not apply.
const REQUEST_STRIP: [HeaderName; 3] = [header::HOST, header::CONNECTION, header::TRANSFER_ENCODING];

/// Headers never relayed back to the client.
const RESPONSE_STRIP: [HeaderName; 4] = [
    header::CONTENT_ENCODING,
    header::TRANSFER_ENCODING,
    header::CONNECTION,
    header::CONTENT_LENGTH,
];

#[derive(Debug, Error)]
pub enum ForwardError {
    /// Connection refused, reset, DNS failure or timeout.
    #[error("Cannot reach target server")]
    Unreachable(#[source] reqwest::Error),

    #[error("{0}")]
    Other(#[source] reqwest::Error),
}

impl ForwardError {
    pub fn status(&self) -> StatusCode {
        match self {
            ForwardError::Unreachable(_) => StatusCode::BAD_GATEWAY,
            ForwardError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<reqwest::Error> for ForwardError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() || e.is_timeout() {
            ForwardError::Unreachable(e)
        } else {
            ForwardError::Other(e)
        }
    }
}

impl IntoResponse for ForwardError {
    fn into_response(self) -> Response {
        (self.status(), format!("Gateway Error - {self}")).into_response()
    }
}

/// Issues the outbound call for admitted requests.
#[derive(Debug, Clone)]
pub struct Forwarder {
    client: Client,
    timeout: Duration,
}

impl Forwarder {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            timeout,
        }
    }

    /// Send the request to `backend` and buffer the full response.
    pub async fn forward(
        &self,
        backend: &Backend,
        method: Method,
        path_and_query: &str,
        headers: &HeaderMap,
        body: Bytes,
    ) -> Result<Response, ForwardError> {
        let url = format!("{}{}", backend.url, path_and_query);

        let mut outbound = headers.clone();
        for name in REQUEST_STRIP.iter() {
            outbound.remove(name);
        }

        let response = self
            .client
            .request(method, &url)
            .headers(outbound)
            .body(body)
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        let mut relayed = response.headers().clone();
        for name in RESPONSE_STRIP.iter() {
            relayed.remove(name);
        }
        let body = response.bytes().await?;

        let mut out = Response::new(Body::from(body));
        *out.status_mut() = status;
        *out.headers_mut() = relayed;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load_balancer::BackendTarget;

    fn closed_backend() -> Backend {
        Backend::new(BackendTarget {
            host: "127.0.0.1".into(),
            port: 1,
            priority: 1,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn refused_connection_is_unreachable() {
        let forwarder = Forwarder::new(Duration::from_secs(2));
        let err = forwarder
            .forward(
                &closed_backend(),
                Method::GET,
                "/",
                &HeaderMap::new(),
                Bytes::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ForwardError::Unreachable(_)));
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn unreachable_body_text() {
        let forwarder = Forwarder::new(Duration::from_secs(2));
        let err = forwarder
            .forward(
                &closed_backend(),
                Method::GET,
                "/",
                &HeaderMap::new(),
                Bytes::new(),
            )
            .await
            .unwrap_err();
        let response = err.into_response();
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"Gateway Error - Cannot reach target server");
    }
}
