//! Cache orchestration for upstream requests.
//!
//! A lookup checks the store first with the TTL of the endpoint that was
//! invoked. On a miss the upstream is called once; a 200 is persisted, any
//! other status is relayed without touching the store.
//!
//! The upstream call runs in its own task, so a client that disconnects
//! mid-request does not abort a fetch that is already in flight.

use std::sync::Arc;
use std::time::Duration;

use repoproxy_client::{Endpoint, Upstream, UpstreamRequest, UrlBuilder};
use repoproxy_core::{AppConfig, CacheStore, Error};

use crate::response::ResponseEnvelope;

/// Coordinates the cache store and the upstream fetcher.
#[derive(Clone)]
pub struct CachingProxy {
    config: Arc<AppConfig>,
    store: CacheStore,
    upstream: Arc<dyn Upstream>,
    urls: UrlBuilder,
}

impl CachingProxy {
    pub fn new(config: Arc<AppConfig>, store: CacheStore, upstream: Arc<dyn Upstream>) -> Self {
        let urls = UrlBuilder::new(&config);
        Self { config, store, upstream, urls }
    }

    /// Proxy a contents-API lookup for a logical path.
    pub async fn contents(&self, path: &str) -> Result<ResponseEnvelope, Error> {
        self.fetch_endpoint(Endpoint::Contents, self.urls.contents_url(path)).await
    }

    /// Proxy a raw file lookup for a logical path.
    pub async fn raw(&self, path: &str) -> Result<ResponseEnvelope, Error> {
        self.fetch_endpoint(Endpoint::Raw, self.urls.raw_url(path)).await
    }

    async fn fetch_endpoint(&self, endpoint: Endpoint, url: String) -> Result<ResponseEnvelope, Error> {
        let request = UpstreamRequest::new(endpoint, url, &self.config);
        tracing::debug!(endpoint = endpoint.as_str(), url = %request.url, "proxy lookup");
        self.fetch_with_cache(&request, endpoint.ttl(&self.config)).await
    }

    /// Serve `request` from the cache when fresh, otherwise from the upstream.
    ///
    /// Only transport failures are returned as errors. Cache defects surface
    /// as a miss or a skipped save.
    pub async fn fetch_with_cache(&self, request: &UpstreamRequest, ttl: Duration) -> Result<ResponseEnvelope, Error> {
        if let Some(entry) = self.store.load(&request.url, ttl).await {
            tracing::debug!(url = %request.url, "cache hit");
            return Ok(ResponseEnvelope {
                status: entry.status,
                content_type: entry.content_type,
                body: entry.body.into(),
                from_cache: true,
            });
        }

        tracing::debug!(url = %request.url, "cache miss");

        let upstream = Arc::clone(&self.upstream);
        let store = self.store.clone();
        let request = request.clone();

        tokio::spawn(async move {
            let response = upstream.fetch(&request).await?;
            if response.status == 200 {
                store.save(&request.url, response.status, &response.content_type, &response.body).await;
            }
            Ok::<_, Error>(ResponseEnvelope {
                status: response.status,
                content_type: response.content_type,
                body: response.body,
                from_cache: false,
            })
        })
        .await
        .map_err(|e| Error::UpstreamUnreachable(format!("upstream task failed: {e}")))?
    }

    #[cfg(test)]
    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    #[cfg(test)]
    pub fn urls(&self) -> &UrlBuilder {
        &self.urls
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use repoproxy_client::UpstreamResponse;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Upstream double that counts calls and replies with a fixed status.
    struct FakeUpstream {
        status: u16,
        calls: AtomicUsize,
        delay: Duration,
    }

    impl FakeUpstream {
        fn new(status: u16) -> Self {
            Self { status, calls: AtomicUsize::new(0), delay: Duration::ZERO }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Upstream for FakeUpstream {
        async fn fetch(&self, request: &UpstreamRequest) -> Result<UpstreamResponse, Error> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            Ok(UpstreamResponse {
                status: self.status,
                content_type: format!("text/plain; fetch={n}"),
                body: Bytes::from(format!("fetch={n}\n{}\n{}", request.url, "x".repeat(n * 64))),
            })
        }
    }

    struct FailingUpstream;

    #[async_trait]
    impl Upstream for FailingUpstream {
        async fn fetch(&self, request: &UpstreamRequest) -> Result<UpstreamResponse, Error> {
            Err(Error::UpstreamTimeout(request.url.clone()))
        }
    }

    fn config(temp_dir: &TempDir) -> Arc<AppConfig> {
        Arc::new(AppConfig {
            owner: "acme".into(),
            repo: "docs".into(),
            cache_dir: temp_dir.path().to_path_buf(),
            ..Default::default()
        })
    }

    fn proxy(temp_dir: &TempDir, upstream: Arc<dyn Upstream>) -> CachingProxy {
        let config = config(temp_dir);
        let store = CacheStore::new(&config.cache_dir);
        CachingProxy::new(config, store, upstream)
    }

    #[tokio::test]
    async fn test_miss_then_hit() {
        let temp_dir = TempDir::new().unwrap();
        let upstream = Arc::new(FakeUpstream::new(200));
        let proxy = proxy(&temp_dir, upstream.clone());

        let first = proxy.raw("README.md").await.unwrap();
        assert!(!first.from_cache);
        assert_eq!(first.status, 200);

        let second = proxy.raw("README.md").await.unwrap();
        assert!(second.from_cache);
        assert_eq!(second.body, first.body);
        assert_eq!(second.content_type, "text/plain; fetch=0");
        assert_eq!(upstream.calls(), 1);
    }

    #[tokio::test]
    async fn test_non_200_is_never_cached() {
        let temp_dir = TempDir::new().unwrap();
        let upstream = Arc::new(FakeUpstream::new(404));
        let proxy = proxy(&temp_dir, upstream.clone());

        for _ in 0..3 {
            let envelope = proxy.raw("missing.md").await.unwrap();
            assert_eq!(envelope.status, 404);
            assert!(!envelope.from_cache);
        }

        assert_eq!(upstream.calls(), 3);
        assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_endpoints_use_distinct_keys() {
        let temp_dir = TempDir::new().unwrap();
        let upstream = Arc::new(FakeUpstream::new(200));
        let proxy = proxy(&temp_dir, upstream.clone());

        proxy.raw("spec").await.unwrap();
        let contents = proxy.contents("spec").await.unwrap();

        assert!(!contents.from_cache);
        assert_eq!(upstream.calls(), 2);
    }

    #[tokio::test]
    async fn test_expired_entry_is_refetched() {
        let temp_dir = TempDir::new().unwrap();
        let upstream = Arc::new(FakeUpstream::new(200));
        let proxy = proxy(&temp_dir, upstream.clone());

        let url = proxy.urls().raw_url("old.md");
        proxy.store().save_at(&url, 200, "text/plain", b"stale", 0.0).await;

        let envelope = proxy.raw("old.md").await.unwrap();
        assert!(!envelope.from_cache);
        assert_ne!(envelope.body.as_ref(), b"stale");
        assert_eq!(upstream.calls(), 1);
    }

    #[tokio::test]
    async fn test_cache_write_failure_still_returns_content() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("blocker");
        std::fs::write(&blocker, b"").unwrap();

        let config = config(&temp_dir);
        let upstream = Arc::new(FakeUpstream::new(200));
        let proxy = CachingProxy::new(config, CacheStore::new(blocker.join("cache")), upstream.clone());

        let first = proxy.raw("a.txt").await.unwrap();
        assert_eq!(first.status, 200);
        assert!(!first.from_cache);

        let second = proxy.raw("a.txt").await.unwrap();
        assert!(!second.from_cache);
        assert_eq!(upstream.calls(), 2);
    }

    #[tokio::test]
    async fn test_transport_failure_is_returned() {
        let temp_dir = TempDir::new().unwrap();
        let proxy = proxy(&temp_dir, Arc::new(FailingUpstream));

        let result = proxy.raw("a.txt").await;
        assert!(matches!(result, Err(Error::UpstreamTimeout(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_requests_leave_one_valid_entry() {
        const N: usize = 8;

        let temp_dir = TempDir::new().unwrap();
        let upstream =
            Arc::new(FakeUpstream { status: 200, calls: AtomicUsize::new(0), delay: Duration::from_millis(20) });
        let proxy = Arc::new(proxy(&temp_dir, upstream.clone()));

        let handles: Vec<_> = (0..N)
            .map(|_| {
                let proxy = Arc::clone(&proxy);
                tokio::spawn(async move { proxy.raw("shared.md").await })
            })
            .collect();

        let mut responses = Vec::new();
        for handle in handles {
            let envelope = handle.await.unwrap().unwrap();
            assert_eq!(envelope.status, 200);
            responses.push((envelope.content_type, envelope.body));
        }

        let calls = upstream.calls();
        assert!((1..=N).contains(&calls));

        let url = proxy.urls().raw_url("shared.md");
        let entry = proxy.store().load(&url, Duration::from_secs(60)).await.unwrap();
        assert_eq!(entry.status, 200);
        assert!(responses.iter().any(|(ct, body)| *ct == entry.content_type && body.as_ref() == entry.body.as_slice()));

        let fetch = entry.content_type.strip_prefix("text/plain; fetch=").unwrap();
        assert!(entry.body.starts_with(format!("fetch={fetch}\n").as_bytes()));

        let leftovers = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .count();
        assert_eq!(leftovers, 0);
    }
}
