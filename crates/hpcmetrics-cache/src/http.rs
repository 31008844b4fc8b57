// SPDX-License-Identifier: Apache-2.0

//! Caches whole HTTP responses for GET-style handlers, keyed by an application-supplied key.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use axum::body::Bytes;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};

use crate::lru::Cache;

/// A cached response snapshot: status, headers and body captured at computation time.
#[derive(Clone)]
pub struct CachedResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
    cached_at: std::time::Instant,
}

/// Wraps `handler` with GET-response caching.
///
/// Non-2xx responses are cached with a TTL of zero (served once, then recomputed on the next
/// request). A response carrying an `Expires` header overrides `default_ttl` for 2xx responses.
/// Served cached responses gain an `Age` header reporting seconds elapsed since computation.
pub async fn cached<K, F, Fut>(
    cache: &Cache<K, CachedResponse>,
    key: K,
    default_ttl: Duration,
    handler: F,
) -> Response
where
    K: std::hash::Hash + Eq + Clone,
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Response>,
{
    let result = cache
        .get_or_compute(key, || async {
            let response = handler().await;
            let status = response.status();
            let headers = response.headers().clone();
            let body = match axum::body::to_bytes(response.into_body(), usize::MAX).await {
                Ok(b) => b,
                Err(_) => Bytes::new(),
            };
            let size = body.len() + headers.iter().map(|(k, v)| k.as_str().len() + v.len()).sum::<usize>();
            let ttl = if status.is_success() {
                expires_ttl(&headers).unwrap_or(default_ttl)
            } else {
                Duration::ZERO
            };
            Ok::<_, std::convert::Infallible>((
                CachedResponse {
                    status,
                    headers,
                    body,
                    cached_at: std::time::Instant::now(),
                },
                Some(ttl),
                size,
            ))
        })
        .await;

    let cached = match result {
        Ok(cached) => cached,
        Err(never) => match never {},
    };
    render(&cached)
}

fn render(cached: &CachedResponse) -> Response {
    let mut response = (cached.status, cached.body.clone()).into_response();
    *response.headers_mut() = cached.headers.clone();
    let age = cached.cached_at.elapsed().as_secs();
    if let Ok(value) = HeaderValue::from_str(&age.to_string()) {
        let _ = response.headers_mut().insert("age", value);
    }
    response
}

/// Parses an `Expires` header into a TTL relative to now, tolerating any valid RFC 2822 date.
/// Returns `None` if the header is absent, malformed, or already in the past.
fn expires_ttl(headers: &HeaderMap) -> Option<Duration> {
    let raw = headers.get(axum::http::header::EXPIRES)?.to_str().ok()?;
    let parsed = DateTime::parse_from_rfc2822(raw).ok()?;
    let expires: DateTime<Utc> = parsed.with_timezone(&Utc);
    let now = Utc::now();
    let delta = expires.signed_duration_since(now);
    delta.to_std().ok()
}

/// Convenience helper so callers can express sizes for arbitrary cached values without pulling
/// in `CachedResponse`'s internals; also used by tests.
#[must_use]
pub fn system_time_as_ttl(at: SystemTime, now: SystemTime) -> Option<Duration> {
    at.duration_since(now).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::EXPIRES;
    use std::time::Duration as StdDuration;

    #[tokio::test]
    async fn caches_successful_response_and_serves_it_back() {
        let cache: Arc<Cache<&'static str, CachedResponse>> = Arc::new(Cache::new(1 << 20));
        let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));

        for _ in 0..3 {
            let calls = Arc::clone(&calls);
            let response = cached(&cache, "k", Duration::from_secs(60), || async move {
                calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                "hello".into_response()
            })
            .await;
            assert_eq!(response.status(), StatusCode::OK);
        }
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn non_success_status_is_not_reused() {
        let cache: Arc<Cache<&'static str, CachedResponse>> = Arc::new(Cache::new(1 << 20));
        let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));

        for _ in 0..2 {
            let calls = Arc::clone(&calls);
            let _ = cached(&cache, "k", Duration::from_secs(60), || async move {
                calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            })
            .await;
        }
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 2);
    }

    #[test]
    fn expires_header_overrides_default_ttl() {
        let future = Utc::now() + chrono::Duration::seconds(120);
        let mut headers = HeaderMap::new();
        let _ = headers.insert(
            EXPIRES,
            HeaderValue::from_str(&future.to_rfc2822()).expect("valid header value"),
        );
        let ttl = expires_ttl(&headers).expect("ttl present");
        assert!(ttl > StdDuration::from_secs(100) && ttl <= StdDuration::from_secs(120));
    }

    #[test]
    fn missing_or_past_expires_yields_none() {
        assert!(expires_ttl(&HeaderMap::new()).is_none());

        let past = Utc::now() - chrono::Duration::seconds(10);
        let mut headers = HeaderMap::new();
        let _ = headers.insert(
            EXPIRES,
            HeaderValue::from_str(&past.to_rfc2822()).expect("valid header value"),
        );
        assert!(expires_ttl(&headers).is_none());
    }
}
