//! HTTP server setup and the request orchestrator.
//!
//! # Responsibilities
//! - Create the Axum Router with all handlers
//! - Wire up middleware (tracing, timeout, request ID)
//! - Screen every request through the detection engine
//! - Forward admitted requests to the selected backend
//! - Report each outcome to metrics and telemetry
//! - Run the health monitor and idle sweeper for the server's lifetime

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::GatewayConfig;
use crate::detection::{Analysis, DetectionEngine, Verdict};
use crate::health::HealthMonitor;
use crate::http::context::RequestContext;
use crate::http::forward::Forwarder;
use crate::lifecycle::Shutdown;
use crate::load_balancer::BackendManager;
use crate::observability::{metrics, GatewayStats, TelemetryDispatcher, TelemetryRecord};

/// Slack given to the whole handler on top of the outbound timeout, so the
/// forwarder reports its own timeout first.
const HANDLER_GRACE: Duration = Duration::from_secs(5);

/// Application state injected into handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub detector: Arc<DetectionEngine>,
    pub backends: Arc<BackendManager>,
    pub stats: Arc<GatewayStats>,
    pub forwarder: Forwarder,
    pub telemetry: TelemetryDispatcher,
    pub gateway_id: Arc<str>,
}

impl AppState {
    pub fn new(config: GatewayConfig) -> Self {
        let detector = Arc::new(DetectionEngine::new(config.detection.clone()));
        let backends = Arc::new(BackendManager::new(config.backends.clone()));
        let forwarder = Forwarder::new(Duration::from_secs(config.timeouts.request_secs));
        let telemetry = TelemetryDispatcher::new(&config.telemetry);
        let gateway_id = config.gateway.gateway_id().into();

        Self {
            config: Arc::new(config),
            detector,
            backends,
            stats: Arc::new(GatewayStats::new()),
            forwarder,
            telemetry,
            gateway_id,
        }
    }

    /// Record metrics and telemetry for a finished request, then return it.
    fn finish(
        &self,
        ctx: &RequestContext,
        analysis: &Analysis,
        start: Instant,
        response: Response,
    ) -> Response {
        let status = response.status().as_u16();
        metrics::record_request(analysis.verdict.as_str(), status, start);
        self.telemetry.dispatch(TelemetryRecord::new(
            &ctx.client_ip,
            &ctx.path,
            &ctx.method,
            &ctx.user_agent,
            analysis.verdict,
            analysis.score,
            status,
            start.elapsed(),
            &self.gateway_id,
        ));
        response
    }
}

/// The gateway's inbound HTTP server.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: GatewayConfig) -> Self {
        Self::with_state(AppState::new(config))
    }

    pub fn with_state(state: AppState) -> Self {
        let router = Self::build_router(state.clone());
        Self { router, state }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(state: AppState) -> Router {
        let timeout = Duration::from_secs(state.config.timeouts.request_secs) + HANDLER_GRACE;
        let health_path = state.config.gateway.health_path.clone();

        Router::new()
            .route(&health_path, get(health_handler))
            .route("/", any(gateway_handler))
            .route("/{*path}", any(gateway_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(timeout))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server until `shutdown` fires.
    ///
    /// The health monitor and the idle sweeper run alongside and stop with it.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            backends = self.state.backends.len(),
            "Gateway listening"
        );

        let monitor = HealthMonitor::new(
            self.state.backends.clone(),
            self.state.config.health_check.clone(),
        );
        tokio::spawn(monitor.run(shutdown.subscribe()));
        tokio::spawn(self.state.detector.clone().run_sweeper(shutdown.subscribe()));

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        let mut stop = shutdown.subscribe();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = stop.recv().await;
            })
            .await?;

        tracing::info!("Gateway stopped");
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct HealthReport {
    status: &'static str,
    gateway: &'static str,
    version: &'static str,
    backend_targets: BTreeMap<String, bool>,
    uptime_seconds: f64,
}

/// Answered locally; never screened or forwarded.
async fn health_handler(State(state): State<AppState>) -> Json<HealthReport> {
    let backend_targets = state
        .backends
        .all_backends()
        .iter()
        .map(|b| (b.url.clone(), b.is_healthy()))
        .collect();

    Json(HealthReport {
        status: "healthy",
        gateway: "DDoS Detection Gateway",
        version: env!("CARGO_PKG_VERSION"),
        backend_targets,
        uptime_seconds: state.stats.uptime().as_secs_f64(),
    })
}

/// Screen, then forward.
async fn gateway_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let ctx = RequestContext::from_request(&request);
    state.stats.record_total();

    let analysis = match state.detector.analyze(&ctx.client_ip, &ctx) {
        Ok(analysis) => analysis,
        Err(e) => {
            tracing::error!(client_ip = %ctx.client_ip, error = %e, "Detection failed, admitting request");
            Analysis::normal()
        }
    };

    tracing::debug!(
        client_ip = %ctx.client_ip,
        path = %ctx.path,
        prediction = %analysis.verdict,
        score = analysis.score,
        "Request screened"
    );

    match analysis.verdict {
        Verdict::Ddos => {
            state.stats.record_blocked();
            state.stats.record_ddos();
            let response = (
                StatusCode::TOO_MANY_REQUESTS,
                format!("Access Denied - DDoS Detected (Score: {:.2})", analysis.score),
            );
            return state.finish(&ctx, &analysis, start, response.into_response());
        }
        Verdict::Blocked => {
            state.stats.record_blocked();
            let response = (StatusCode::FORBIDDEN, "Access Denied - IP Blacklisted");
            return state.finish(&ctx, &analysis, start, response.into_response());
        }
        Verdict::Normal => state.stats.record_allowed(),
    }

    let Some(backend) = state.backends.next_target() else {
        tracing::warn!("No backend targets configured");
        let response = (
            StatusCode::SERVICE_UNAVAILABLE,
            "Gateway Error - No backend targets available",
        );
        return state.finish(&ctx, &analysis, start, response.into_response());
    };

    let max_body = state.config.gateway.max_body_size;
    let (parts, body) = request.into_parts();
    let too_large = (StatusCode::PAYLOAD_TOO_LARGE, "Gateway Error - Request body too large");
    if ctx.content_length > max_body as u64 {
        return state.finish(&ctx, &analysis, start, too_large.into_response());
    }
    let body = match axum::body::to_bytes(body, max_body).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::debug!(client_ip = %ctx.client_ip, error = %e, "Failed to read request body");
            return state.finish(&ctx, &analysis, start, too_large.into_response());
        }
    };

    backend.record_request();
    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");

    let response = match state
        .forwarder
        .forward(&backend, parts.method, path_and_query, &parts.headers, body)
        .await
    {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(backend = %backend.url, error = %e, "Forwarding failed");
            e.into_response()
        }
    };

    state.finish(&ctx, &analysis, start, response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendConfig;
    use axum::body::to_bytes;
    use tower::ServiceExt;

    fn test_config() -> GatewayConfig {
        let mut config = GatewayConfig::default();
        config.telemetry.enabled = false;
        config.health_check.enabled = false;
        config
    }

    fn get(path: &str, client_ip: &str) -> Request<Body> {
        Request::builder()
            .uri(path)
            .header("x-forwarded-for", client_ip)
            .header("user-agent", "unit-test")
            .body(Body::empty())
            .unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn health_path_bypasses_detection() {
        let server = HttpServer::new(test_config());
        let response = server
            .router()
            .oneshot(get("/health", "10.0.0.1"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));

        let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));

        assert_eq!(server.state().stats.snapshot().total_requests, 0);
        assert_eq!(server.state().detector.tracked_clients(), 0);
    }

    #[tokio::test]
    async fn no_backends_is_503() {
        let server = HttpServer::new(test_config());
        let response = server
            .router()
            .oneshot(get("/anything?x=1", "10.0.0.2"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            body_text(response).await,
            "Gateway Error - No backend targets available"
        );

        let stats = server.state().stats.snapshot();
        assert_eq!(stats.total_requests, 1);
        assert_eq!(stats.allowed_requests, 1);
    }

    #[tokio::test]
    async fn blocked_client_gets_403() {
        let server = HttpServer::new(test_config());
        server
            .state()
            .detector
            .block("198.51.100.7", Duration::from_secs(600));

        let response = server
            .router()
            .oneshot(get("/", "198.51.100.7"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_text(response).await, "Access Denied - IP Blacklisted");
        assert_eq!(server.state().stats.snapshot().blocked_requests, 1);
    }

    #[tokio::test]
    async fn flood_is_refused_with_429_then_403() {
        let server = HttpServer::new(test_config());
        let mut statuses = Vec::new();
        for i in 0..30 {
            let response = server
                .router()
                .oneshot(get(&format!("/attack{}", i % 5), "203.0.113.50"))
                .await
                .unwrap();
            let status = response.status();
            if status == StatusCode::TOO_MANY_REQUESTS {
                assert!(body_text(response)
                    .await
                    .starts_with("Access Denied - DDoS Detected (Score: 0."));
            }
            statuses.push(status);
        }

        let first = statuses
            .iter()
            .position(|s| *s == StatusCode::TOO_MANY_REQUESTS)
            .expect("flood never detected");
        assert!(statuses[first + 1..].iter().all(|s| *s == StatusCode::FORBIDDEN));

        let stats = server.state().stats.snapshot();
        assert_eq!(stats.ddos_detected, 1);
        assert_eq!(stats.blocked_requests, 30 - first as u64);
    }

    #[tokio::test]
    async fn non_finite_geo_signal_is_admitted() {
        let server = HttpServer::new(test_config());
        let request = Request::builder()
            .uri("/")
            .header("x-forwarded-for", "10.0.0.9")
            .header("x-geo-anomaly", "NaN")
            .body(Body::empty())
            .unwrap();
        let response = server.router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(server.state().stats.snapshot().allowed_requests, 1);
    }

    fn upload(client_ip: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/upload")
            .header("x-forwarded-for", client_ip)
            .body(Body::from("way more than eight bytes"))
            .unwrap()
    }

    #[tokio::test]
    async fn oversized_body_is_413() {
        let mut config = test_config();
        config.gateway.max_body_size = 8;
        config.backends = vec![BackendConfig {
            host: "127.0.0.1".into(),
            port: 1,
            priority: 1,
        }];
        let server = HttpServer::new(config);
        let response = server.router().oneshot(upload("10.0.0.10")).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(server.state().backends.all_backends()[0].requests(), 0);
    }

    #[tokio::test]
    async fn missing_backends_win_over_oversized_body() {
        let mut config = test_config();
        config.gateway.max_body_size = 8;
        let server = HttpServer::new(config);
        let response = server.router().oneshot(upload("10.0.0.11")).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            body_text(response).await,
            "Gateway Error - No backend targets available"
        );
    }
}
