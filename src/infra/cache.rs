//! Rendered-response cache for the index feed.
//!
//! Entries expire a fixed time after they were stored. Nothing invalidates
//! them on writes; [`ResponseCache::clear`] is the only way to drop them early.

use std::{
    num::NonZeroUsize,
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    body::Body,
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header},
    response::Response,
};
use bytes::Bytes;
use http_body_util::BodyExt;
use lru::LruCache;
use metrics::counter;
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Clone)]
pub struct ResponseCache {
    entries: Arc<Mutex<LruCache<String, CachedResponse>>>,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new(capacity: NonZeroUsize, ttl: Duration) -> Self {
        Self {
            entries: Arc::new(Mutex::new(LruCache::new(capacity))),
            ttl,
        }
    }

    pub async fn get(&self, key: &str) -> Option<Response<Body>> {
        self.lookup(key, Instant::now()).await
    }

    async fn lookup(&self, key: &str, now: Instant) -> Option<Response<Body>> {
        let mut guard = self.entries.lock().await;
        let fresh = guard
            .get(key)
            .map(|entry| now.saturating_duration_since(entry.stored_at) < self.ttl);

        match fresh {
            Some(true) => {
                counter!("yatube_index_cache_hit_total").increment(1);
                guard.get(key).cloned().map(CachedResponse::into_response)
            }
            Some(false) => {
                guard.pop(key);
                counter!("yatube_index_cache_miss_total").increment(1);
                None
            }
            None => {
                counter!("yatube_index_cache_miss_total").increment(1);
                None
            }
        }
    }

    pub async fn put(&self, key: String, response: CachedResponse) {
        let mut guard = self.entries.lock().await;
        guard.put(key, response);
        counter!("yatube_index_cache_store_total").increment(1);
    }

    pub async fn store_response(
        &self,
        key: &str,
        response: Response,
    ) -> Result<Response, (Response, CacheStoreError)> {
        match buffer_response(response).await {
            Ok((rebuilt, cached)) => {
                self.put(key.to_string(), cached).await;
                Ok(rebuilt)
            }
            Err((rebuilt, error)) => Err((rebuilt, error)),
        }
    }

    /// Drop every entry; returns how many were held.
    pub async fn clear(&self) -> usize {
        let mut guard = self.entries.lock().await;
        let removed = guard.len();
        guard.clear();
        counter!("yatube_index_cache_clear_total").increment(1);
        removed
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[derive(Clone)]
pub struct CachedResponse {
    status: StatusCode,
    headers: Vec<(HeaderName, HeaderValue)>,
    body: Bytes,
    stored_at: Instant,
}

impl CachedResponse {
    pub fn new(status: StatusCode, headers: &HeaderMap, body: Bytes) -> Self {
        let headers = headers
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();

        Self {
            status,
            headers,
            body,
            stored_at: Instant::now(),
        }
    }

    fn into_response(self) -> Response<Body> {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;

        let headers = response.headers_mut();
        headers.clear();
        for (name, value) in self.headers {
            headers.append(name, value);
        }

        response
    }
}

#[derive(Debug, Error)]
pub enum CacheStoreError {
    #[error("failed to buffer response body: {0}")]
    Buffer(String),
}

/// Only plain `200 OK` pages without cookies are shared.
pub fn should_store_response(response: &Response) -> bool {
    response.status() == StatusCode::OK && !response.headers().contains_key(header::SET_COOKIE)
}

pub async fn buffer_response(
    response: Response,
) -> Result<(Response, CachedResponse), (Response, CacheStoreError)> {
    let (parts, body) = response.into_parts();
    match BodyExt::collect(body).await {
        Ok(collected) => {
            let bytes = collected.to_bytes();
            let cached = CachedResponse::new(parts.status, &parts.headers, bytes.clone());
            let rebuilt = Response::from_parts(parts, Body::from(bytes));
            Ok((rebuilt, cached))
        }
        Err(error) => {
            let rebuilt = Response::from_parts(parts, Body::empty());
            Err((rebuilt, CacheStoreError::Buffer(error.to_string())))
        }
    }
}
