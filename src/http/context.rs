//! Request context extraction.
//!
//! Normalizes an inbound request into the record the detection engine and
//! telemetry work from. Extraction never fails: missing or malformed fields
//! fall back to empty/zero values.

use std::net::SocketAddr;

use axum::extract::ConnectInfo;
use axum::http::{header, HeaderMap, Request, Version};

/// Header carrying an optional upstream geo-anomaly signal.
pub const GEO_ANOMALY_HEADER: &str = "x-geo-anomaly";

/// Canonical view of one inbound request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestContext {
    pub client_ip: String,
    pub method: String,
    pub path: String,
    pub query_params: usize,
    pub protocol: String,
    pub user_agent: String,
    pub referer: String,
    pub connection: String,
    pub content_length: u64,
    pub accept_encoding: String,
    pub has_cookies: bool,
    pub header_count: usize,
    pub host_mismatch: bool,
    pub geo_anomaly: Option<f64>,
}

impl RequestContext {
    /// Build the context for `request`.
    ///
    /// The socket peer is taken from the `ConnectInfo` extension when the
    /// server was started with connect info; otherwise it is unknown.
    pub fn from_request<B>(request: &Request<B>) -> Self {
        let peer = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|info| info.0);
        let headers = request.headers();
        let uri = request.uri();

        Self {
            client_ip: client_ip(headers, peer),
            method: request.method().as_str().to_string(),
            path: uri.path().to_string(),
            query_params: uri.query().map(count_query_params).unwrap_or(0),
            protocol: protocol_name(request.version()).to_string(),
            user_agent: header_str(headers, header::USER_AGENT.as_str()),
            referer: header_str(headers, header::REFERER.as_str()),
            connection: header_str(headers, header::CONNECTION.as_str()),
            content_length: header_str(headers, header::CONTENT_LENGTH.as_str())
                .trim()
                .parse()
                .unwrap_or(0),
            accept_encoding: header_str(headers, header::ACCEPT_ENCODING.as_str()),
            has_cookies: headers
                .get(header::COOKIE)
                .is_some_and(|v| !v.as_bytes().is_empty()),
            header_count: headers.len(),
            host_mismatch: host_mismatch(headers),
            geo_anomaly: headers
                .get(GEO_ANOMALY_HEADER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok()),
        }
    }
}

/// Resolve the client fingerprint.
///
/// Precedence: first `X-Forwarded-For` entry, `X-Real-IP`, socket peer,
/// then `"unknown"`.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    if let Some(first) = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return first.to_string();
    }

    if let Some(real_ip) = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return real_ip.to_string();
    }

    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn header_str(headers: &HeaderMap, name: &str) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

fn count_query_params(query: &str) -> usize {
    query.split('&').filter(|pair| !pair.is_empty()).count()
}

fn host_mismatch(headers: &HeaderMap) -> bool {
    let host = headers.get(header::HOST).and_then(|v| v.to_str().ok());
    let forwarded = headers.get("x-forwarded-host").and_then(|v| v.to_str().ok());
    match (host, forwarded) {
        (Some(host), Some(forwarded)) => !host.eq_ignore_ascii_case(forwarded.trim()),
        _ => false,
    }
}

fn protocol_name(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "HTTP/0.9",
        Version::HTTP_10 => "HTTP/1.0",
        Version::HTTP_2 => "HTTP/2.0",
        Version::HTTP_3 => "HTTP/3.0",
        _ => "HTTP/1.1",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn peer() -> Option<SocketAddr> {
        Some("198.51.100.7:40000".parse().unwrap())
    }

    #[test]
    fn forwarded_for_wins() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", " 203.0.113.9 , 10.0.0.1".parse().unwrap());
        headers.insert("x-real-ip", "10.9.9.9".parse().unwrap());
        assert_eq!(client_ip(&headers, peer()), "203.0.113.9");
    }

    #[test]
    fn real_ip_then_peer_then_unknown() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", "10.9.9.9".parse().unwrap());
        assert_eq!(client_ip(&headers, peer()), "10.9.9.9");

        let headers = HeaderMap::new();
        assert_eq!(client_ip(&headers, peer()), "198.51.100.7");
        assert_eq!(client_ip(&headers, None), "unknown");
    }

    #[test]
    fn empty_forwarded_for_falls_through() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "".parse().unwrap());
        assert_eq!(client_ip(&headers, None), "unknown");
    }

    #[test]
    fn extracts_selected_fields() {
        let request = Request::builder()
            .method("POST")
            .uri("/login?next=/home&lang=en")
            .header("user-agent", "Mozilla/5.0")
            .header("referer", "https://example.com/")
            .header("connection", "keep-alive")
            .header("content-length", "42")
            .header("accept-encoding", "gzip")
            .header("cookie", "session=abc")
            .header("host", "gateway.local")
            .header("x-forwarded-host", "other.local")
            .header(GEO_ANOMALY_HEADER, "0.7")
            .body(Body::empty())
            .unwrap();

        let ctx = RequestContext::from_request(&request);
        assert_eq!(ctx.client_ip, "unknown");
        assert_eq!(ctx.method, "POST");
        assert_eq!(ctx.path, "/login");
        assert_eq!(ctx.query_params, 2);
        assert_eq!(ctx.protocol, "HTTP/1.1");
        assert_eq!(ctx.user_agent, "Mozilla/5.0");
        assert_eq!(ctx.content_length, 42);
        assert!(ctx.has_cookies);
        assert!(ctx.host_mismatch);
        assert_eq!(ctx.header_count, 9);
        assert_eq!(ctx.geo_anomaly, Some(0.7));
    }

    #[test]
    fn missing_fields_default() {
        let request = Request::builder()
            .uri("/")
            .header("content-length", "not-a-number")
            .body(Body::empty())
            .unwrap();
        let ctx = RequestContext::from_request(&request);
        assert_eq!(ctx.method, "GET");
        assert_eq!(ctx.query_params, 0);
        assert_eq!(ctx.content_length, 0);
        assert!(ctx.user_agent.is_empty());
        assert!(!ctx.has_cookies);
        assert!(!ctx.host_mismatch);
        assert_eq!(ctx.geo_anomaly, None);
    }

    #[test]
    fn peer_comes_from_connect_info() {
        let mut request = Request::builder().uri("/").body(Body::empty()).unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo::<SocketAddr>("192.0.2.44:5555".parse().unwrap()));
        assert_eq!(RequestContext::from_request(&request).client_ip, "192.0.2.44");
    }
}
