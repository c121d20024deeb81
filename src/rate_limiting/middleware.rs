// ABOUTME: Axum middleware that charges each request against the applicable limiters
// ABOUTME: Rejections become 429 responses carrying rate-limit headers
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use http::header::RETRY_AFTER;
use http::{HeaderMap, HeaderValue};
use tracing::warn;

use super::{Limiter, Limiters, PathClass, PathClassifier, RateLimitDecision, RateLimitStore};
use crate::config::ServerConfig;
use crate::errors::AppError;
use crate::logging::AuthLogger;

/// HTTP header names for rate limiting
pub mod headers {
    /// Burst of the rejecting limiter
    pub const X_RATE_LIMIT_LIMIT: &str = "X-RateLimit-Limit";
    /// Requests left in the window
    pub const X_RATE_LIMIT_REMAINING: &str = "X-RateLimit-Remaining";
}

const FORWARDED_FOR: &str = "x-forwarded-for";
const EMAIL_GLOBAL_KEY: &str = "global";
const UNKNOWN_CLIENT: &str = "unknown";

/// State shared by every invocation of [`rate_limit_middleware`]
#[derive(Debug, Clone)]
pub struct RateLimitLayerState {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    limiters: Limiters,
    classifier: PathClassifier,
    email_is_global: bool,
}

impl RateLimitLayerState {
    /// Combine limiters with a path classifier
    #[must_use]
    pub fn new(limiters: Limiters, classifier: PathClassifier, email_is_global: bool) -> Self {
        Self {
            inner: Arc::new(Inner {
                limiters,
                classifier,
                email_is_global,
            }),
        }
    }

    /// Build the limiter set and classifier from server configuration
    ///
    /// Callers install the middleware only when `rate_limit.enabled` is set.
    #[must_use]
    pub fn from_config(config: &ServerConfig, store: Arc<dyn RateLimitStore>) -> Self {
        Self::new(
            Limiters::new(&config.rate_limit, store),
            PathClassifier::new(&config.api_prefix, config.email_verification_required),
            config.rate_limit.email_is_global,
        )
    }

    /// Limiters to charge for `path`, in checking order, each with its key
    fn plan<'a>(&'a self, path: &str, client: &'a str) -> Vec<(&'a Limiter, &'a str)> {
        let inner = &*self.inner;
        let class = inner.classifier.classify(path);
        let mut plan = vec![(&inner.limiters.global, client)];
        if class.contains(PathClass::EMAIL) {
            let key = if inner.email_is_global {
                EMAIL_GLOBAL_KEY
            } else {
                client
            };
            plan.push((&inner.limiters.email, key));
        }
        let classified = [
            (PathClass::SMS, &inner.limiters.sms),
            (PathClass::BRUTE_FORCE, &inner.limiters.brute_force),
            (PathClass::SIGNUP, &inner.limiters.signups),
            (PathClass::OAUTH2_SERVER, &inner.limiters.oauth2_server),
        ];
        plan.extend(
            classified
                .into_iter()
                .filter(|(flag, _)| class.contains(*flag))
                .map(|(_, limiter)| (limiter, client)),
        );
        plan
    }
}

/// Client key: first `X-Forwarded-For` hop, else the peer address
fn client_key(request: &Request) -> String {
    request
        .headers()
        .get(FORWARDED_FOR)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToOwned::to_owned)
        .or_else(|| {
            request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        })
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_owned())
}

fn too_many_requests(limiter: &Limiter, decision: &RateLimitDecision) -> Response {
    let mut response = AppError::rate_limit_exceeded(limiter.name(), decision.limit).into_response();
    let map: &mut HeaderMap = response.headers_mut();
    map.insert(headers::X_RATE_LIMIT_LIMIT, HeaderValue::from(decision.limit));
    map.insert(
        headers::X_RATE_LIMIT_REMAINING,
        HeaderValue::from(decision.remaining),
    );
    // round up so clients never retry before the window ends
    let retry_after = decision.retry_after.as_secs()
        + u64::from(decision.retry_after.subsec_nanos() > 0);
    map.insert(RETRY_AFTER, HeaderValue::from(retry_after));
    response
}

/// Charge the request against the global limiter, then the classified ones
///
/// The first limiter to reject short-circuits, so later limiters are not
/// charged. A store failure lets the request through.
pub async fn rate_limit_middleware(
    State(state): State<RateLimitLayerState>,
    request: Request,
    next: Next,
) -> Response {
    let client = client_key(&request);
    let path = request.uri().path().to_owned();

    for (limiter, key) in state.plan(&path, &client) {
        match limiter.allow(key).await {
            Ok(decision) if decision.allowed => {}
            Ok(decision) => {
                AuthLogger::log_throttled(limiter.name(), key, &path, decision.limit);
                return too_many_requests(limiter, &decision);
            }
            Err(e) => {
                warn!(limiter = limiter.name(), error = %e, "Rate-limit store failed, allowing request");
            }
        }
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LimitConfig;
    use crate::config::RateLimitConfig;
    use crate::rate_limiting::MemoryRateLimitStore;

    fn state(email_is_global: bool) -> RateLimitLayerState {
        let store: Arc<dyn RateLimitStore> = Arc::new(MemoryRateLimitStore::new());
        let config = RateLimitConfig {
            brute_force: LimitConfig::new(3, 300),
            ..RateLimitConfig::default()
        };
        RateLimitLayerState::new(
            Limiters::new(&config, store),
            PathClassifier::new("", false),
            email_is_global,
        )
    }

    #[test]
    fn test_plan_orders_global_first() {
        let state = state(false);
        let names: Vec<_> = state
            .plan("/signin/passwordless/email", "1.2.3.4")
            .into_iter()
            .map(|(limiter, _)| limiter.name())
            .collect();
        assert_eq!(names, ["global", "email", "brute_force"]);
    }

    #[test]
    fn test_email_key_is_shared_when_global() {
        let state = state(true);
        let plan = state.plan("/user/password/reset", "1.2.3.4");
        assert_eq!(plan[1].0.name(), "email");
        assert_eq!(plan[1].1, "global");
        assert_eq!(plan[0].1, "1.2.3.4");
    }

    #[test]
    fn test_client_key_prefers_first_forwarded_hop() {
        let request = Request::builder()
            .uri("/signin/anonymous")
            .header(FORWARDED_FOR, "203.0.113.9, 10.0.0.1")
            .body(axum::body::Body::empty())
            .unwrap();
        assert_eq!(client_key(&request), "203.0.113.9");

        let mut request = Request::builder()
            .uri("/signin/anonymous")
            .body(axum::body::Body::empty())
            .unwrap();
        assert_eq!(client_key(&request), UNKNOWN_CLIENT);
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 7], 5555))));
        assert_eq!(client_key(&request), "192.0.2.7");
    }
}
