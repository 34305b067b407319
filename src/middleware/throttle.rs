//! Per-caller request quotas for the API routes.
//!
//! Anonymous callers are keyed by client address and authenticated callers by
//! their bearer token, each class with its own per-minute quota.

use std::{net::SocketAddr, num::NonZeroU32, sync::Arc};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};

use crate::{error::AppError, state::AppState};

pub const DEFAULT_ANON_PER_MINUTE: NonZeroU32 = match NonZeroU32::new(60) {
    Some(n) => n,
    None => unreachable!(),
};

pub const DEFAULT_USER_PER_MINUTE: NonZeroU32 = match NonZeroU32::new(300) {
    Some(n) => n,
    None => unreachable!(),
};

// Idle keys are pruned once a limiter tracks this many callers.
const RETAIN_THRESHOLD: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallerClass {
    Anonymous,
    Authenticated,
}

#[derive(Clone)]
pub struct Throttle {
    anonymous: Arc<DefaultKeyedRateLimiter<String>>,
    authenticated: Arc<DefaultKeyedRateLimiter<String>>,
}

impl Throttle {
    pub fn new(anon_per_minute: NonZeroU32, user_per_minute: NonZeroU32) -> Self {
        Self {
            anonymous: Arc::new(RateLimiter::keyed(Quota::per_minute(anon_per_minute))),
            authenticated: Arc::new(RateLimiter::keyed(Quota::per_minute(user_per_minute))),
        }
    }

    /// Spend one request from the caller's quota; `false` once it is exhausted.
    pub fn check(&self, class: CallerClass, key: &str) -> bool {
        let limiter = match class {
            CallerClass::Anonymous => &self.anonymous,
            CallerClass::Authenticated => &self.authenticated,
        };
        if limiter.len() > RETAIN_THRESHOLD {
            limiter.retain_recent();
        }
        limiter.check_key(&key.to_string()).is_ok()
    }
}

impl Default for Throttle {
    fn default() -> Self {
        Self::new(DEFAULT_ANON_PER_MINUTE, DEFAULT_USER_PER_MINUTE)
    }
}

fn bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

fn client_address(request: &Request) -> String {
    let headers = request.headers();
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|value| value.to_str().ok())
        })
        .map(str::trim)
        .filter(|ip| !ip.is_empty());

    if let Some(ip) = forwarded {
        return ip.to_string();
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

pub fn caller_key(request: &Request) -> (CallerClass, String) {
    match bearer_token(request) {
        Some(token) => (CallerClass::Authenticated, token.to_string()),
        None => (CallerClass::Anonymous, client_address(request)),
    }
}

pub async fn throttle(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let (class, key) = caller_key(&request);
    if !state.throttle.check(class, &key) {
        tracing::warn!(class = ?class, "request throttled");
        return Err(AppError::TooManyRequests);
    }
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn one_per_minute() -> Throttle {
        let one = NonZeroU32::MIN;
        Throttle::new(one, one)
    }

    fn request(headers: &[(&str, &str)]) -> Request {
        let mut builder = axum::http::Request::builder().uri("/api/menu-items");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn bearer_callers_are_keyed_by_token() {
        let (class, key) = caller_key(&request(&[("authorization", "Bearer abc")]));
        assert_eq!(class, CallerClass::Authenticated);
        assert_eq!(key, "abc");
    }

    #[test]
    fn anonymous_callers_are_keyed_by_first_forwarded_address() {
        let (class, key) =
            caller_key(&request(&[("x-forwarded-for", "203.0.113.7, 10.0.0.1")]));
        assert_eq!(class, CallerClass::Anonymous);
        assert_eq!(key, "203.0.113.7");

        let (_, key) = caller_key(&request(&[("x-real-ip", "198.51.100.2")]));
        assert_eq!(key, "198.51.100.2");

        let (_, key) = caller_key(&request(&[]));
        assert_eq!(key, "unknown");
    }

    #[test]
    fn quota_is_per_key_and_per_class() {
        let throttle = one_per_minute();
        assert!(throttle.check(CallerClass::Anonymous, "203.0.113.7"));
        assert!(!throttle.check(CallerClass::Anonymous, "203.0.113.7"));
        assert!(throttle.check(CallerClass::Anonymous, "203.0.113.8"));
        // Same key string, other class: separate bucket.
        assert!(throttle.check(CallerClass::Authenticated, "203.0.113.7"));
    }
}
