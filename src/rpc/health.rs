//! Per-endpoint health tracking: EWMA latency/success-rate and the
//! composite score used to rank providers.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Instant;

use serde::Serialize;

/// Smoothing factor for the latency EWMA (20% weight to the newest sample).
const LATENCY_ALPHA: f64 = 0.2;
/// Smoothing factor for the success-rate EWMA (5% weight to the newest sample).
const SUCCESS_ALPHA: f64 = 0.05;

/// Health classification, thresholded on the composite score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
    Unknown,
}

/// Tracks the running latency/success-rate EWMAs and consecutive-failure
/// count for one RPC endpoint, and derives the composite score:
/// `0.4 * (1 - normalized_latency) + 0.4 * success_rate + 0.2 * recency_factor`.
#[derive(Debug)]
pub struct ProviderHealth {
    url: String,
    ewma_latency_ms: std::sync::Mutex<f64>,
    ewma_success_rate: std::sync::Mutex<f64>,
    consecutive_failures: AtomicU32,
    total_requests: AtomicU64,
    last_success: std::sync::Mutex<Option<Instant>>,
    last_probe: std::sync::Mutex<Option<Instant>>,
}

/// Latency above this is treated as fully saturating the normalized penalty.
const LATENCY_CEILING_MS: f64 = 2000.0;
/// A provider not contacted in this long gets zero recency credit.
const RECENCY_CEILING_SECS: f64 = 120.0;

impl ProviderHealth {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ewma_latency_ms: std::sync::Mutex::new(0.0),
            ewma_success_rate: std::sync::Mutex::new(1.0),
            consecutive_failures: AtomicU32::new(0),
            total_requests: AtomicU64::new(0),
            last_success: std::sync::Mutex::new(None),
            last_probe: std::sync::Mutex::new(None),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Record the outcome of a call against this provider.
    pub fn record(&self, success: bool, latency_ms: f64) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        *self.last_probe.lock().unwrap() = Some(Instant::now());

        {
            let mut ewma = self.ewma_latency_ms.lock().unwrap();
            *ewma = if *ewma == 0.0 { latency_ms } else { LATENCY_ALPHA * latency_ms + (1.0 - LATENCY_ALPHA) * *ewma };
        }

        let sample = if success { 1.0 } else { 0.0 };
        {
            let mut ewma = self.ewma_success_rate.lock().unwrap();
            *ewma = SUCCESS_ALPHA * sample + (1.0 - SUCCESS_ALPHA) * *ewma;
        }

        if success {
            self.consecutive_failures.store(0, Ordering::Relaxed);
            *self.last_success.lock().unwrap() = Some(Instant::now());
        } else {
            self.consecutive_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures.load(Ordering::Relaxed)
    }

    pub fn ewma_latency_ms(&self) -> f64 {
        *self.ewma_latency_ms.lock().unwrap()
    }

    pub fn ewma_success_rate(&self) -> f64 {
        *self.ewma_success_rate.lock().unwrap()
    }

    fn recency_factor(&self) -> f64 {
        match *self.last_success.lock().unwrap() {
            None => 0.0,
            Some(t) => (1.0 - t.elapsed().as_secs_f64() / RECENCY_CEILING_SECS).clamp(0.0, 1.0),
        }
    }

    /// Composite score in [0, 1]: higher is better.
    pub fn score(&self) -> f64 {
        let normalized_latency = (self.ewma_latency_ms() / LATENCY_CEILING_MS).clamp(0.0, 1.0);
        let success_rate = self.ewma_success_rate();
        let recency = self.recency_factor();
        0.4 * (1.0 - normalized_latency) + 0.4 * success_rate + 0.2 * recency
    }

    /// Status derived from the score and consecutive-failure guard.
    pub fn status(&self) -> HealthStatus {
        if self.total_requests.load(Ordering::Relaxed) == 0 {
            return HealthStatus::Unknown;
        }
        if self.consecutive_failures() >= 3 {
            return HealthStatus::Unhealthy;
        }
        let score = self.score();
        if score < 0.3 {
            HealthStatus::Unhealthy
        } else if score < 0.7 {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        }
    }

    pub fn snapshot(&self) -> ProviderHealthSnapshot {
        ProviderHealthSnapshot {
            url: self.url.clone(),
            status: self.status(),
            score: self.score(),
            ewma_latency_ms: self.ewma_latency_ms(),
            ewma_success_rate: self.ewma_success_rate(),
            consecutive_failures: self.consecutive_failures(),
            total_requests: self.total_requests.load(Ordering::Relaxed),
        }
    }
}

/// Read-only snapshot of [`ProviderHealth`], safe to serialize for status reporting.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderHealthSnapshot {
    pub url: String,
    pub status: HealthStatus,
    pub score: f64,
    pub ewma_latency_ms: f64,
    pub ewma_success_rate: f64,
    pub consecutive_failures: u32,
    pub total_requests: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_before_any_request() {
        let health = ProviderHealth::new("http://a");
        assert_eq!(health.status(), HealthStatus::Unknown);
    }

    #[test]
    fn healthy_after_fast_successes() {
        let health = ProviderHealth::new("http://a");
        for _ in 0..10 {
            health.record(true, 20.0);
        }
        assert_eq!(health.status(), HealthStatus::Healthy);
        assert!(health.score() > 0.7);
    }

    #[test]
    fn unhealthy_after_three_consecutive_failures() {
        let health = ProviderHealth::new("http://a");
        health.record(true, 20.0);
        health.record(false, 20.0);
        health.record(false, 20.0);
        health.record(false, 20.0);
        assert_eq!(health.status(), HealthStatus::Unhealthy);
        assert_eq!(health.consecutive_failures(), 3);
    }

    #[test]
    fn degraded_band() {
        let health = ProviderHealth::new("http://a");
        // High latency drags the score into the degraded band without
        // tripping the consecutive-failure guard.
        for _ in 0..20 {
            health.record(true, 1900.0);
        }
        assert!(matches!(health.status(), HealthStatus::Degraded | HealthStatus::Unhealthy));
    }

    #[test]
    fn recovers_after_success_following_failures() {
        let health = ProviderHealth::new("http://a");
        health.record(false, 50.0);
        health.record(false, 50.0);
        health.record(true, 50.0);
        assert_eq!(health.consecutive_failures(), 0);
    }
}
