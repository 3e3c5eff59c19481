use std::collections::{HashSet, VecDeque};
use tokio::sync::Mutex;

/// Bounded set of recently-seen delivery ids. Webhook retries re-deliver the
/// same event, sometimes near-simultaneously, so the membership test and the
/// insert happen under one lock.
///
/// No persistence: a restart resets the cache, and downstream counters are
/// expected to tolerate the occasional duplicate that lets through.
pub struct IdempotencyCache {
    max_tracked: usize,
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    ids: HashSet<String>,
    order: VecDeque<String>,
}

impl IdempotencyCache {
    pub fn new(max_tracked: usize) -> Self {
        Self {
            max_tracked: max_tracked.max(1),
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Returns true when `id` was already recorded; records it otherwise.
    /// Empty ids are never recorded — the platform does not guarantee an id
    /// on every delivery shape, and those events must all be treated as novel.
    pub async fn seen(&self, id: &str) -> bool {
        if id.is_empty() {
            return false;
        }

        let mut inner = self.inner.lock().await;
        if !inner.ids.insert(id.to_string()) {
            return true;
        }
        inner.order.push_back(id.to_string());

        // Evict the surplus as a batch once the bound is exceeded, oldest first.
        if inner.ids.len() > self.max_tracked {
            let surplus = inner.ids.len() - self.max_tracked;
            for _ in 0..surplus {
                if let Some(oldest) = inner.order.pop_front() {
                    inner.ids.remove(&oldest);
                }
            }
        }

        false
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.inner.lock().await.ids.len()
    }
}
