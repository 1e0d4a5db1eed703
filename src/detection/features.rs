//! Feature extraction and scoring.
//!
//! Timing features work on the *arrival series*: the retained history
//! timestamps for a client followed by the current arrival.

use std::time::{Duration, Instant};

use serde::Serialize;

use crate::http::context::RequestContext;

/// Window used for the request rate feature.
pub const RATE_WINDOW: Duration = Duration::from_secs(60);
/// Request rate that saturates the rate feature, in requests per second.
pub const RATE_CEILING: f64 = 3.0;
/// Window used for burst detection.
pub const BURST_WINDOW: Duration = Duration::from_secs(10);
/// Arrivals within [`BURST_WINDOW`] above this count are a burst.
pub const BURST_THRESHOLD: usize = 20;
/// Arrivals considered by the inter-arrival variance feature.
pub const IAT_SAMPLE: usize = 20;
/// Arrivals considered by the timing variance feature.
pub const TIMING_SAMPLE: usize = 30;
/// Arrivals inside [`RATE_WINDOW`] at which the rate feature saturates.
pub const RATE_SATURATION: usize = 180;
/// Longest arrival series any feature can tell apart from a longer one.
///
/// Covers rate saturation, the burst threshold and both variance samples.
pub const MAX_SERIES: usize = RATE_SATURATION;

/// Weights of the features that contribute to the anomaly score.
pub const SCORE_WEIGHTS: [(&str, f64); 6] = [
    ("request_rate", 0.40),
    ("iat_variance", 0.20),
    ("ua_diversity", 0.15),
    ("burst_detected", 0.20),
    ("timing_variance", 0.03),
    ("geo_anomaly", 0.02),
];

/// The full feature set for one request. Every value is in [0, 1].
///
/// Only the fields listed in [`SCORE_WEIGHTS`] affect the score; the rest
/// are kept for alerts and logs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct FeatureVector {
    pub request_rate: f64,
    pub iat_variance: f64,
    pub ua_diversity: f64,
    pub referer_presence: f64,
    pub keep_alive: f64,
    pub method_get: f64,
    pub method_post: f64,
    pub method_other: f64,
    pub path_length: f64,
    pub query_param_count: f64,
    pub header_count: f64,
    pub content_length: f64,
    pub accept_encoding: f64,
    pub host_mismatch: f64,
    pub payload_size: f64,
    pub burst_detected: f64,
    pub timing_variance: f64,
    pub cookie_presence: f64,
    pub session_persistent: f64,
    pub http2_usage: f64,
    pub geo_anomaly: f64,
}

impl FeatureVector {
    /// Weighted sum of the scoring features, clipped to 1.0.
    pub fn anomaly_score(&self) -> f64 {
        let score: f64 = SCORE_WEIGHTS
            .iter()
            .map(|(name, weight)| self.get(name).unwrap_or(0.0) * weight)
            .sum();
        score.clamp(0.0, 1.0)
    }

    /// Look up a scoring feature by name.
    pub fn get(&self, name: &str) -> Option<f64> {
        let value = match name {
            "request_rate" => self.request_rate,
            "iat_variance" => self.iat_variance,
            "ua_diversity" => self.ua_diversity,
            "burst_detected" => self.burst_detected,
            "timing_variance" => self.timing_variance,
            "geo_anomaly" => self.geo_anomaly,
            _ => return None,
        };
        Some(value)
    }
}

/// Client-level inputs to feature extraction.
#[derive(Debug, Clone, Copy)]
pub struct ClientSignals {
    /// Share of repeated user agents, or `None` when nothing was observed yet.
    pub ua_repetition: Option<f64>,
    /// Time since the client was first seen.
    pub session_age: Duration,
    /// External geo signal, already clamped to [0, 1].
    pub geo_anomaly: f64,
}

/// Compute every feature for `ctx` given the client's arrival series.
///
/// `arrivals` must be in time order and end with `now`. Only the last
/// [`MAX_SERIES`] entries matter.
pub fn extract(
    ctx: &RequestContext,
    arrivals: &[Instant],
    now: Instant,
    signals: ClientSignals,
) -> FeatureVector {
    let method = ctx.method.to_ascii_uppercase();
    FeatureVector {
        request_rate: request_rate(arrivals, now),
        iat_variance: iat_variance(arrivals),
        ua_diversity: signals.ua_repetition.unwrap_or(0.5),
        referer_presence: flag(!ctx.referer.is_empty()),
        keep_alive: flag(ctx.connection.eq_ignore_ascii_case("keep-alive")),
        method_get: flag(method == "GET"),
        method_post: flag(method == "POST"),
        method_other: flag(method != "GET" && method != "POST"),
        path_length: ratio(ctx.path.len() as f64, 100.0),
        query_param_count: ratio(ctx.query_params as f64, 10.0),
        header_count: ratio(ctx.header_count as f64, 30.0),
        content_length: flag(ctx.content_length > 0),
        accept_encoding: flag(!ctx.accept_encoding.is_empty()),
        host_mismatch: flag(ctx.host_mismatch),
        payload_size: ratio(ctx.content_length as f64, 10_000.0),
        burst_detected: flag(burst_detected(arrivals, now)),
        timing_variance: timing_variance(arrivals),
        cookie_presence: flag(ctx.has_cookies),
        session_persistent: session_persistence(signals.session_age),
        http2_usage: flag(ctx.protocol.contains('2')),
        geo_anomaly: signals.geo_anomaly,
    }
}

/// Arrivals in the last minute as a fraction of the rate ceiling.
pub fn request_rate(arrivals: &[Instant], now: Instant) -> f64 {
    let per_second = count_within(arrivals, now, RATE_WINDOW) as f64 / RATE_WINDOW.as_secs_f64();
    (per_second / RATE_CEILING).min(1.0)
}

/// One minus the clipped variance of recent inter-arrival gaps.
///
/// Low variance means machine-regular timing and scores high. Needs at least
/// two prior requests.
pub fn iat_variance(arrivals: &[Instant]) -> f64 {
    if arrivals.len() < 3 {
        return 0.0;
    }
    let gaps = gaps(tail(arrivals, IAT_SAMPLE));
    1.0 - population_variance(&gaps).min(1.0)
}

/// True when more than [`BURST_THRESHOLD`] arrivals landed in the burst window.
pub fn burst_detected(arrivals: &[Instant], now: Instant) -> bool {
    count_within(arrivals, now, BURST_WINDOW) > BURST_THRESHOLD
}

/// Clipped standard deviation of recent inter-arrival gaps.
///
/// Needs at least three prior requests.
pub fn timing_variance(arrivals: &[Instant]) -> f64 {
    if arrivals.len() < 4 {
        return 0.0;
    }
    let gaps = gaps(tail(arrivals, TIMING_SAMPLE));
    if gaps.iter().sum::<f64>() == 0.0 {
        return 0.0;
    }
    population_variance(&gaps).sqrt().min(1.0)
}

/// Longer-lived sessions look more like real users.
pub fn session_persistence(age: Duration) -> f64 {
    match age.as_secs() {
        s if s > 300 => 0.8,
        s if s > 60 => 0.5,
        _ => 0.0,
    }
}

fn count_within(arrivals: &[Instant], now: Instant, window: Duration) -> usize {
    arrivals
        .iter()
        .rev()
        .take_while(|t| now.saturating_duration_since(**t) < window)
        .count()
}

fn tail(arrivals: &[Instant], n: usize) -> &[Instant] {
    &arrivals[arrivals.len().saturating_sub(n)..]
}

fn gaps(arrivals: &[Instant]) -> Vec<f64> {
    arrivals
        .windows(2)
        .map(|pair| pair[1].saturating_duration_since(pair[0]).as_secs_f64())
        .collect()
}

/// Population variance; zero for an empty slice.
pub fn population_variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n
}

fn flag(on: bool) -> f64 {
    if on {
        1.0
    } else {
        0.0
    }
}

fn ratio(value: f64, ceiling: f64) -> f64 {
    value.min(ceiling) / ceiling
}
