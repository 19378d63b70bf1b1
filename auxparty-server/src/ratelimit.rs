use std::{net::SocketAddr, num::NonZeroU32, sync::Arc, time::Duration};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use log::{debug, warn};

/// Requests allowed per client per minute
const MAX_REQUESTS_PER_MINUTE: u32 = 100;
/// How often idle client buckets are dropped
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Per-client request limiter shared by every route
#[derive(Clone)]
pub struct ClientRateLimit {
    limiter: Arc<DefaultKeyedRateLimiter<String>>,
}

impl ClientRateLimit {
    pub fn new() -> Self {
        let quota =
            Quota::per_minute(NonZeroU32::new(MAX_REQUESTS_PER_MINUTE).expect("limit is nonzero"));

        Self {
            limiter: Arc::new(RateLimiter::keyed(quota)),
        }
    }

    /// Spawns a task that prunes idle buckets, so the key map does not grow
    /// with every client that ever connected
    pub fn start_sweeper(&self) {
        let limiter = self.limiter.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(SWEEP_INTERVAL);

            loop {
                interval.tick().await;

                limiter.retain_recent();
                debug!("Swept rate limiter, {} clients tracked", limiter.len());
            }
        });
    }
}

pub async fn limit_by_client(
    State(limit): State<ClientRateLimit>,
    request: Request,
    next: Next,
) -> Response {
    let key = client_key(&request);

    if limit.limiter.check_key(&key).is_err() {
        warn!("Client {} exceeded the request limit", key);
        return (StatusCode::TOO_MANY_REQUESTS, "Too Many Requests").into_response();
    }

    next.run(request).await
}

/// Proxy headers identify the client when present, otherwise the peer
/// address does. "anonymous" is the last resort so a missing identity
/// shares one bucket instead of escaping the limit.
fn client_key(request: &Request) -> String {
    let headers = request.headers();

    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|x| x.to_str().ok())
        .and_then(|x| x.split(',').next())
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty());

    let real_ip = headers
        .get("x-real-ip")
        .and_then(|x| x.to_str().ok())
        .map(|x| x.to_string());

    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip().to_string());

    forwarded
        .or(real_ip)
        .or(peer)
        .unwrap_or_else(|| "anonymous".to_string())
}
