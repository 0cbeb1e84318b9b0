use std::net::{IpAddr, SocketAddr};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use lru::LruCache;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::json_error;

pub struct CorsPolicy {
    allowed_origins: Vec<String>,
    allowed_methods: String,
}

impl CorsPolicy {
    pub fn new(allowed_origins: Vec<String>, allowed_methods: String) -> Self {
        Self {
            allowed_origins,
            allowed_methods,
        }
    }

    fn allows(&self, origin: &str) -> bool {
        self.allowed_origins.iter().any(|o| o == origin)
    }
}

/// Echo allowed origins back; answer preflight `OPTIONS` here without routing.
pub async fn cors(State(policy): State<Arc<CorsPolicy>>, req: Request, next: Next) -> Response {
    let origin = req
        .headers()
        .get(header::ORIGIN)
        .and_then(|o| o.to_str().ok())
        .filter(|o| policy.allows(o))
        .and_then(|o| HeaderValue::from_str(o).ok());

    let mut resp = if req.method() == Method::OPTIONS {
        let mut resp = StatusCode::OK.into_response();
        if let Ok(methods) = HeaderValue::from_str(&policy.allowed_methods) {
            resp.headers_mut()
                .insert(header::ACCESS_CONTROL_ALLOW_METHODS, methods);
        }
        resp
    } else {
        next.run(req).await
    };

    if let Some(origin) = origin {
        resp.headers_mut()
            .insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    }
    resp
}

pub const DEFAULT_TRACKED_CLIENTS: usize = 10_000;

/// Token bucket per client address. Only the most recently seen clients keep
/// a bucket; an evicted client starts again with a full one.
#[derive(Clone)]
pub struct RateLimiter {
    buckets: Arc<Mutex<LruCache<IpAddr, Bucket>>>,
    capacity: f64,
    refill_per_sec: f64,
}

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

impl RateLimiter {
    /// `None` when any limit is zero, which disables limiting.
    pub fn new(max_per_minute: u32, burst: u32, max_clients: usize) -> Option<Self> {
        if max_per_minute == 0 || burst == 0 {
            return None;
        }
        let max_clients = NonZeroUsize::new(max_clients)?;
        Some(Self {
            buckets: Arc::new(Mutex::new(LruCache::new(max_clients))),
            capacity: burst as f64,
            refill_per_sec: max_per_minute as f64 / 60.0,
        })
    }

    pub async fn acquire(&self, client: IpAddr) -> bool {
        let mut buckets = self.buckets.lock().await;
        let now = Instant::now();
        let bucket = buckets.get_or_insert_mut(client, || Bucket {
            tokens: self.capacity,
            last_refill: now,
        });
        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.last_refill = now;
        bucket.tokens = (bucket.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

pub async fn rate_limit(
    State(limiter): State<Option<RateLimiter>>,
    req: Request,
    next: Next,
) -> Response {
    let Some(limiter) = limiter else {
        return next.run(req).await;
    };
    let Some(peer) = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr)
    else {
        warn!("Rejecting request without a peer address");
        return json_error(StatusCode::BAD_REQUEST, "bad_request", "missing remote address");
    };
    if !limiter.acquire(peer.ip()).await {
        debug!("Rate limit hit for {}", peer.ip());
        return json_error(StatusCode::TOO_MANY_REQUESTS, "rate_limited", "rate limit exceeded");
    }
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_disables_limiter() {
        assert!(RateLimiter::new(0, 10, 100).is_none());
        assert!(RateLimiter::new(60, 0, 100).is_none());
        assert!(RateLimiter::new(60, 10, 0).is_none());
    }

    #[tokio::test]
    async fn bucket_drains_then_refuses() {
        let limiter = RateLimiter::new(1, 3, 100).unwrap();
        let ip: IpAddr = [192, 168, 1, 7].into();
        for _ in 0..3 {
            assert!(limiter.acquire(ip).await);
        }
        assert!(!limiter.acquire(ip).await);
        assert!(limiter.acquire([192, 168, 1, 8].into()).await);
    }

    #[tokio::test]
    async fn tracked_clients_stay_bounded() {
        let limiter = RateLimiter::new(1, 1, 4).unwrap();
        for last in 0..=255u8 {
            assert!(limiter.acquire([10, 0, 0, last].into()).await);
        }
        assert_eq!(limiter.buckets.lock().await.len(), 4);
    }

    #[tokio::test]
    async fn evicted_client_gets_a_fresh_bucket() {
        let limiter = RateLimiter::new(1, 1, 2).unwrap();
        let first: IpAddr = [10, 0, 0, 1].into();
        assert!(limiter.acquire(first).await);
        assert!(!limiter.acquire(first).await);
        assert!(limiter.acquire([10, 0, 0, 2].into()).await);
        assert!(limiter.acquire([10, 0, 0, 3].into()).await);
        assert!(limiter.acquire(first).await);
    }
}
