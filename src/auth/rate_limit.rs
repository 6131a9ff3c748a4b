//! Per-IP throttling for the credential endpoints

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::error::{AppError, ErrorCode};
use crate::state::AppState;

/// A fixed-window limit for one group of routes
pub struct Policy {
    name: &'static str,
    max_requests: u32,
    window: Duration,
}

/// Sign-in and password-reset requests: 5/minute per IP
pub const SIGNIN: Policy = Policy {
    name: "signin",
    max_requests: 5,
    window: Duration::from_secs(60),
};

/// Sign-up and verification-code sends: 3/minute per IP, since every
/// allowed request can cost an outbound email
pub const SIGNUP: Policy = Policy {
    name: "signup",
    max_requests: 3,
    window: Duration::from_secs(60),
};

struct Window {
    count: u32,
    started: Instant,
}

#[derive(Clone)]
pub struct RateLimiter {
    windows: Arc<Mutex<HashMap<(&'static str, String), Window>>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            windows: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Count this request against the policy's window; `false` means throttled.
    pub async fn allow(&self, policy: &Policy, ip: &str) -> bool {
        let mut windows = self.windows.lock().await;
        let now = Instant::now();

        let w = windows
            .entry((policy.name, ip.to_owned()))
            .or_insert(Window {
                count: 0,
                started: now,
            });

        if now.duration_since(w.started) >= policy.window {
            w.count = 0;
            w.started = now;
        }

        w.count += 1;
        w.count <= policy.max_requests
    }

    /// Drop windows idle for longer than any policy's span
    pub async fn cleanup(&self) {
        let cutoff = Duration::from_secs(300);
        let now = Instant::now();
        self.windows
            .lock()
            .await
            .retain(|_, w| now.duration_since(w.started) < cutoff);
    }

    #[cfg(test)]
    async fn tracked(&self) -> usize {
        self.windows.lock().await.len()
    }
}

/// Extract client IP: X-Forwarded-For header first (ALB/CloudFront), then peer address.
fn extract_ip(request: &Request) -> String {
    if let Some(forwarded) = request.headers().get("x-forwarded-for")
        && let Ok(val) = forwarded.to_str()
    {
        // X-Forwarded-For can be comma-separated; first entry is the original client
        if let Some(first) = val.split(',').next() {
            let ip = first.trim();
            if !ip.is_empty() {
                return ip.to_owned();
            }
        }
    }

    // Fallback: peer address from extensions (ConnectInfo)
    request
        .extensions()
        .get::<axum::extract::ConnectInfo<std::net::SocketAddr>>()
        .map(|ci| ci.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_owned())
}

async fn throttle(
    state: AppState,
    policy: &Policy,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    let ip = extract_ip(&request);
    if !state.rate_limiter.allow(policy, &ip).await {
        let err = AppError::with_message(
            ErrorCode::TooManyAttempts,
            "Too many requests, try again later",
        );
        return Err(err.into_response());
    }
    Ok(next.run(request).await)
}

pub async fn signin_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    throttle(state, &SIGNIN, request, next).await
}

pub async fn signup_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    throttle(state, &SIGNUP, request, next).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_allows_up_to_policy_limit() {
        let limiter = RateLimiter::new();
        for _ in 0..SIGNIN.max_requests {
            assert!(limiter.allow(&SIGNIN, "10.0.0.1").await);
        }
        assert!(!limiter.allow(&SIGNIN, "10.0.0.1").await);
    }

    #[tokio::test]
    async fn test_policies_and_ips_are_isolated() {
        let limiter = RateLimiter::new();
        for _ in 0..SIGNUP.max_requests {
            assert!(limiter.allow(&SIGNUP, "10.0.0.1").await);
        }
        assert!(!limiter.allow(&SIGNUP, "10.0.0.1").await);

        // Another IP and another policy keep their own windows
        assert!(limiter.allow(&SIGNUP, "10.0.0.2").await);
        assert!(limiter.allow(&SIGNIN, "10.0.0.1").await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_resets_after_expiry() {
        let limiter = RateLimiter::new();
        for _ in 0..SIGNIN.max_requests {
            assert!(limiter.allow(&SIGNIN, "10.0.0.1").await);
        }
        assert!(!limiter.allow(&SIGNIN, "10.0.0.1").await);

        tokio::time::advance(SIGNIN.window + Duration::from_secs(1)).await;
        assert!(limiter.allow(&SIGNIN, "10.0.0.1").await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_drops_idle_windows() {
        let limiter = RateLimiter::new();
        limiter.allow(&SIGNIN, "10.0.0.1").await;
        limiter.allow(&SIGNUP, "10.0.0.2").await;
        assert_eq!(limiter.tracked().await, 2);

        tokio::time::advance(Duration::from_secs(301)).await;
        limiter.cleanup().await;
        assert_eq!(limiter.tracked().await, 0);
    }
}
