use crate::TokenResolver;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

/// Static token source backed by configuration: per-page tokens with a global
/// default fallback.
pub struct StaticTokens {
    default_token: Option<String>,
    page_tokens: HashMap<String, String>,
}

impl StaticTokens {
    pub fn new(default_token: Option<String>, page_tokens: HashMap<String, String>) -> Self {
        Self {
            default_token,
            page_tokens,
        }
    }
}

#[async_trait]
impl TokenResolver for StaticTokens {
    async fn page_token(&self, page_id: Option<&str>) -> Option<String> {
        if let Some(id) = page_id {
            if let Some(token) = self.page_tokens.get(id) {
                return Some(token.clone());
            }
        }
        self.default_token.clone()
    }
}

/// Caching wrapper around another resolver. Lookups are remembered per page
/// for a short TTL so a burst of outbound calls for the same page hits the
/// underlying source once.
pub struct PageTokenCache {
    inner: Arc<dyn TokenResolver>,
    ttl: Duration,
    cache: Mutex<HashMap<String, (Option<String>, Instant)>>,
}

impl PageTokenCache {
    pub fn new(inner: Arc<dyn TokenResolver>, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            cache: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl TokenResolver for PageTokenCache {
    async fn page_token(&self, page_id: Option<&str>) -> Option<String> {
        // Default-token lookups share one cache slot.
        let key = page_id.unwrap_or("").to_string();

        {
            let cache = self.cache.lock().await;
            if let Some((token, fetched_at)) = cache.get(&key) {
                if fetched_at.elapsed() < self.ttl {
                    return token.clone();
                }
            }
        }

        let token = self.inner.page_token(page_id).await;
        debug!(page_id = %key, found = token.is_some(), "page token refreshed");

        let mut cache = self.cache.lock().await;
        cache.insert(key, (token.clone(), Instant::now()));
        token
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TokenResolver for CountingSource {
        async fn page_token(&self, page_id: Option<&str>) -> Option<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Some(format!("token-{}", page_id.unwrap_or("default")))
        }
    }

    #[tokio::test]
    async fn static_tokens_fall_back_to_default() {
        let mut pages = HashMap::new();
        pages.insert("page-1".to_string(), "tok-1".to_string());
        let source = StaticTokens::new(Some("tok-default".to_string()), pages);

        assert_eq!(
            source.page_token(Some("page-1")).await.as_deref(),
            Some("tok-1")
        );
        assert_eq!(
            source.page_token(Some("page-2")).await.as_deref(),
            Some("tok-default")
        );
        assert_eq!(source.page_token(None).await.as_deref(), Some("tok-default"));
    }

    #[tokio::test]
    async fn cache_hits_source_once_within_ttl() {
        let source = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
        });
        let cache = PageTokenCache::new(source.clone(), Duration::from_secs(60));

        for _ in 0..5 {
            assert_eq!(
                cache.page_token(Some("p")).await.as_deref(),
                Some("token-p")
            );
        }
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn zero_ttl_refreshes_every_lookup() {
        let source = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
        });
        let cache = PageTokenCache::new(source.clone(), Duration::ZERO);

        cache.page_token(Some("p")).await;
        cache.page_token(Some("p")).await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }
}
