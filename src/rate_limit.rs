//! Per-client token-bucket rate limiting.
//!
//! One bucket per client address, created lazily at full burst capacity and
//! refilled continuously at the configured sustained rate. A background sweep
//! evicts entries that have not been seen for a while so sustained
//! unique-address traffic cannot grow the map without bound.

use axum::{
    body::Body,
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock, watch};
use tracing::{debug, warn};

const IDLE_TIMEOUT: Duration = Duration::from_secs(3 * 60);
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

struct ClientBucket {
    /// Fractional so sub-second refill accrues between requests.
    tokens: f64,
    last_refill: Instant,
    last_seen: Instant,
}

/// Token-bucket limiter keyed by client IP.
///
/// The map takes a write lock only for first-seen inserts and sweep eviction;
/// the steady-state path is a read lock plus the per-bucket mutex. Buckets are
/// `Arc`-held, so eviction never invalidates one an in-flight request is using.
pub struct RateLimiter {
    clients: RwLock<HashMap<IpAddr, Arc<Mutex<ClientBucket>>>>,
    rate: f64,
    burst: u32,
    idle_timeout: Duration,
    shutdown: watch::Sender<bool>,
}

impl RateLimiter {
    /// Build a limiter and start its sweep task. The task runs for the
    /// process lifetime unless [`Self::shutdown`] is called.
    #[must_use]
    pub fn new(rate: f64, burst: u32) -> Arc<Self> {
        Self::with_timings(rate, burst, IDLE_TIMEOUT, SWEEP_INTERVAL)
    }

    /// Variant with injectable timings, used by tests.
    #[must_use]
    pub fn with_timings(
        rate: f64,
        burst: u32,
        idle_timeout: Duration,
        sweep_interval: Duration,
    ) -> Arc<Self> {
        let (shutdown, mut rx) = watch::channel(false);

        let limiter = Arc::new(Self {
            clients: RwLock::new(HashMap::new()),
            rate,
            burst,
            idle_timeout,
            shutdown,
        });

        let weak = Arc::downgrade(&limiter);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(sweep_interval);
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let Some(limiter) = weak.upgrade() else { break };
                        limiter.evict_idle().await;
                    }
                    changed = rx.changed() => {
                        if changed.is_err() || *rx.borrow() {
                            break;
                        }
                    }
                }
            }
        });

        limiter
    }

    /// Withdraw one token for the address, lazily creating its bucket.
    /// Returns whether the request may proceed. Updates `last_seen` on every
    /// call, allowed or not.
    pub async fn allow(&self, addr: IpAddr) -> bool {
        let now = Instant::now();

        let entry = {
            let clients = self.clients.read().await;
            clients.get(&addr).cloned()
        };

        let entry = if let Some(entry) = entry {
            entry
        } else {
            let mut clients = self.clients.write().await;
            // entry() so two first-seen requests racing here share one bucket
            clients
                .entry(addr)
                .or_insert_with(|| {
                    Arc::new(Mutex::new(ClientBucket {
                        tokens: f64::from(self.burst),
                        last_refill: now,
                        last_seen: now,
                    }))
                })
                .clone()
        };

        let mut bucket = entry.lock().await;
        bucket.last_seen = now;

        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = f64::from(self.burst).min(bucket.tokens + elapsed * self.rate);
        bucket.last_refill = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Remove entries idle past the timeout. A bucket whose mutex is
    /// currently held is in active use and survives the pass.
    pub async fn evict_idle(&self) {
        let now = Instant::now();
        let mut clients = self.clients.write().await;
        let before = clients.len();

        clients.retain(|_, entry| match entry.try_lock() {
            Ok(bucket) => now.duration_since(bucket.last_seen) <= self.idle_timeout,
            Err(_) => true,
        });

        let evicted = before - clients.len();
        if evicted > 0 {
            debug!("Rate limiter evicted {evicted} idle client(s)");
        }
    }

    /// Stop the background sweep task. Safe to call more than once.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }

    pub async fn tracked_clients(&self) -> usize {
        self.clients.read().await.len()
    }
}

/// Middleware guarding public write endpoints. Rejections are terminal for
/// the request; the client owns any retry policy.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let ip = addr.ip();

    if limiter.allow(ip).await {
        next.run(request).await
    } else {
        warn!(ip = %ip, "Rate limit exceeded");

        let body = serde_json::json!({
            "success": false,
            "error": "Rate limit exceeded. Please try again later.",
        });

        (StatusCode::TOO_MANY_REQUESTS, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn test_burst_then_reject() {
        let limiter = RateLimiter::new(2.0, 3);
        let ip = addr("10.0.0.1");

        for _ in 0..3 {
            assert!(limiter.allow(ip).await);
        }
        assert!(!limiter.allow(ip).await);
    }

    #[tokio::test]
    async fn test_addresses_are_independent() {
        let limiter = RateLimiter::new(2.0, 3);
        let first = addr("10.0.0.1");
        let second = addr("10.0.0.2");

        for _ in 0..3 {
            assert!(limiter.allow(first).await);
        }
        assert!(!limiter.allow(first).await);

        assert!(limiter.allow(second).await);
    }

    #[tokio::test]
    async fn test_refill_restores_tokens() {
        let limiter = RateLimiter::new(50.0, 2);
        let ip = addr("10.0.0.3");

        assert!(limiter.allow(ip).await);
        assert!(limiter.allow(ip).await);
        assert!(!limiter.allow(ip).await);

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(limiter.allow(ip).await);
    }

    #[tokio::test]
    async fn test_evict_idle_drops_stale_entries() {
        let limiter = RateLimiter::with_timings(
            2.0,
            3,
            Duration::from_millis(30),
            Duration::from_secs(3600),
        );

        limiter.allow(addr("10.0.0.4")).await;
        limiter.allow(addr("10.0.0.5")).await;
        assert_eq!(limiter.tracked_clients().await, 2);

        tokio::time::sleep(Duration::from_millis(80)).await;
        limiter.allow(addr("10.0.0.6")).await;

        limiter.evict_idle().await;
        assert_eq!(limiter.tracked_clients().await, 1);
    }

    #[tokio::test]
    async fn test_background_sweep_runs() {
        let limiter = RateLimiter::with_timings(
            2.0,
            3,
            Duration::from_millis(20),
            Duration::from_millis(20),
        );

        limiter.allow(addr("10.0.0.7")).await;
        assert_eq!(limiter.tracked_clients().await, 1);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(limiter.tracked_clients().await, 0);

        limiter.shutdown();
    }

    #[tokio::test]
    async fn test_fresh_bucket_starts_at_full_burst() {
        let limiter = RateLimiter::new(0.001, 5);
        let ip = addr("10.0.0.8");

        for _ in 0..5 {
            assert!(limiter.allow(ip).await);
        }
        assert!(!limiter.allow(ip).await);
    }
}
