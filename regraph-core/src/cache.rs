use crate::Result;
use crate::registry::Lookup;
use futures::lock::Mutex;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Keyed single-flight cache. Concurrent callers for the same key share one
/// initialisation; failed initialisations are not stored.
#[derive(Debug)]
pub struct Memo<V> {
    cells: Mutex<BTreeMap<String, Arc<OnceCell<V>>>>,
}

impl<V> Default for Memo<V> {
    fn default() -> Self {
        Memo {
            cells: Mutex::new(BTreeMap::new()),
        }
    }
}

impl<V: Clone> Memo<V> {
    async fn cell(&self, key: &str) -> Arc<OnceCell<V>> {
        let mut cells = self.cells.lock().await;
        cells.entry(key.to_string()).or_default().clone()
    }

    pub async fn get_or_try_init<F, Fut>(&self, key: &str, init: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        let cell = self.cell(key).await;
        cell.get_or_try_init(init).await.cloned()
    }

    pub async fn get_or_init<F, Fut>(&self, key: &str, init: F) -> V
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V>,
    {
        let cell = self.cell(key).await;
        cell.get_or_init(init).await.clone()
    }

    pub async fn len(&self) -> usize {
        let cells = self.cells.lock().await;
        cells.values().filter(|cell| cell.initialized()).count()
    }
}

/// Everything one resolution request remembers. Built per request and
/// dropped with it.
#[derive(Debug, Default)]
pub struct RequestCache {
    /// Keyed by `author/slug`.
    pub lookups: Memo<Lookup>,
    /// Keyed by URL. `None` records a failed fetch so it is not retried.
    pub artifacts: Memo<Option<String>>,
}

impl RequestCache {
    pub fn new() -> Self {
        RequestCache::default()
    }
}
