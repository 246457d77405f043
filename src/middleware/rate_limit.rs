//! Rate limiting middleware
//!
//! Requests are limited per client with a keyed GCRA limiter. The key is
//! the subject of a validly signed bearer token, otherwise the peer
//! address of the connection.

use std::net::SocketAddr;
use std::num::NonZeroU32;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use tracing::{debug, warn};

use crate::config::RateLimitConfig;
use crate::state::AppState;
use crate::utils::errors::{FixedAssetError, Result};

/// Keyed limiter built from `rate_limit` settings
pub struct RateLimitMiddleware {
    limiter: DefaultKeyedRateLimiter<String>,
}

impl RateLimitMiddleware {
    pub fn new(requests_per_minute: NonZeroU32, burst: NonZeroU32) -> Self {
        let quota = Quota::per_minute(requests_per_minute).allow_burst(burst);
        Self {
            limiter: RateLimiter::keyed(quota),
        }
    }

    /// `None` when rate limiting is disabled or the quota is zero
    pub fn from_config(config: &RateLimitConfig) -> Option<Self> {
        if !config.enabled {
            return None;
        }
        let per_minute = NonZeroU32::new(config.requests_per_minute)?;
        let burst = NonZeroU32::new(config.burst).unwrap_or(per_minute);
        Some(Self::new(per_minute, burst))
    }

    /// Check if the client is within its quota
    pub fn check_rate_limit(&self, key: &str) -> Result<()> {
        match self.limiter.check_key(&key.to_string()) {
            Ok(()) => {
                debug!(client = key, "Rate limit check passed");
                Ok(())
            }
            Err(_) => {
                warn!(client = key, "Rate limit exceeded");
                Err(FixedAssetError::RateLimitExceeded)
            }
        }
    }

    /// Drop state for clients that are back under their quota
    pub fn cleanup(&self) {
        self.limiter.retain_recent();
    }

    pub fn tracked_clients(&self) -> usize {
        self.limiter.len()
    }
}

impl std::fmt::Debug for RateLimitMiddleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimitMiddleware")
            .field("tracked_clients", &self.tracked_clients())
            .finish()
    }
}

/// Identify the caller for rate limiting purposes.
///
/// `subject` must come from a token whose signature was checked. Forwarding
/// headers are only read when `trust_forwarded` is set.
pub fn client_key(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    subject: Option<&str>,
    trust_forwarded: bool,
) -> String {
    if let Some(subject) = subject {
        return format!("user:{}", subject);
    }
    if trust_forwarded {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };
        let forwarded = header("x-forwarded-for")
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .or_else(|| header("x-real-ip"));
        if let Some(ip) = forwarded {
            return format!("ip:{}", ip);
        }
    }
    match peer {
        Some(addr) => format!("ip:{}", addr.ip()),
        None => "anonymous".to_string(),
    }
}

/// Axum middleware rejecting over-quota clients with 429
pub async fn rate_limit(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if let Some(limiter) = &state.rate_limiter {
        let subject = request
            .headers()
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .and_then(|token| state.services.auth_service.token_subject(token.trim()));
        let peer = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        let key = client_key(
            request.headers(),
            peer,
            subject.as_deref(),
            state.settings.rate_limit.trust_forwarded_headers,
        );
        if let Err(e) = limiter.check_rate_limit(&key) {
            return e.into_response();
        }
    }
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn limiter(per_minute: u32, burst: u32) -> RateLimitMiddleware {
        RateLimitMiddleware::from_config(&RateLimitConfig {
            enabled: true,
            requests_per_minute: per_minute,
            burst,
            trust_forwarded_headers: false,
        })
        .unwrap()
    }

    #[test]
    fn test_burst_then_reject() {
        let limiter = limiter(1, 2);
        assert!(limiter.check_rate_limit("ip:10.0.0.1").is_ok());
        assert!(limiter.check_rate_limit("ip:10.0.0.1").is_ok());
        assert!(matches!(
            limiter.check_rate_limit("ip:10.0.0.1"),
            Err(FixedAssetError::RateLimitExceeded)
        ));
        assert!(limiter.check_rate_limit("ip:10.0.0.2").is_ok());
        assert_eq!(limiter.tracked_clients(), 2);
    }

    #[test]
    fn test_disabled_config() {
        let config = RateLimitConfig {
            enabled: false,
            requests_per_minute: 10,
            burst: 1,
            trust_forwarded_headers: false,
        };
        assert!(RateLimitMiddleware::from_config(&config).is_none());
    }

    #[test]
    fn test_client_key() {
        let peer: SocketAddr = "198.51.100.4:40000".parse().unwrap();
        let mut headers = HeaderMap::new();
        assert_eq!(client_key(&headers, None, None, false), "anonymous");
        assert_eq!(client_key(&headers, Some(peer), None, false), "ip:198.51.100.4");

        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        assert_eq!(client_key(&headers, Some(peer), None, false), "ip:198.51.100.4");
        assert_eq!(client_key(&headers, Some(peer), None, true), "ip:203.0.113.7");

        assert_eq!(client_key(&headers, Some(peer), Some("42"), true), "user:42");
    }

    #[test]
    fn test_unverified_bearer_does_not_pick_the_bucket() {
        let peer: SocketAddr = "198.51.100.4:40000".parse().unwrap();
        let mut first = HeaderMap::new();
        first.insert("authorization", HeaderValue::from_static("Bearer junk-1"));
        let mut second = HeaderMap::new();
        second.insert("authorization", HeaderValue::from_static("Bearer junk-2"));

        assert_eq!(
            client_key(&first, Some(peer), None, false),
            client_key(&second, Some(peer), None, false)
        );
    }
}
