//! Copy-on-write hostname → service map.

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::service_map::{normalize_hostname, ServiceLookup};

/// Hostname → service map that readers load as an immutable snapshot.
///
/// Writers build a new map and swap it in atomically. A reader racing a
/// write sees either the old or the new snapshot, never a mix.
#[derive(Debug)]
pub struct CowServiceMap {
    inner: ArcSwap<HashMap<String, String>>,
}

impl CowServiceMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self {
            inner: ArcSwap::from_pointee(HashMap::new()),
        }
    }

    /// Create a map from (hostname, service) pairs.
    pub fn from_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        Self {
            inner: ArcSwap::from_pointee(normalize_entries(entries)),
        }
    }

    /// Assign `hostname` to `service`.
    pub fn insert(&self, hostname: &str, service: impl Into<String>) {
        let key = normalize_hostname(hostname);
        let service = service.into();
        self.inner.rcu(|current| {
            let mut next = HashMap::clone(current);
            next.insert(key.clone(), service.clone());
            next
        });
    }

    /// Remove `hostname`, returning the service it was assigned to.
    pub fn remove(&self, hostname: &str) -> Option<String> {
        let key = normalize_hostname(hostname);
        let previous = self.inner.rcu(|current| {
            let mut next = HashMap::clone(current);
            next.remove(&key);
            next
        });
        previous.get(&key).cloned()
    }

    /// Replace every entry at once.
    pub fn replace<I, K, V>(&self, entries: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let next = normalize_entries(entries);
        tracing::info!(entries = next.len(), "Replacing hostname service mapping");
        self.inner.store(Arc::new(next));
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> Arc<HashMap<String, String>> {
        self.inner.load_full()
    }

    pub fn len(&self) -> usize {
        self.inner.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.load().is_empty()
    }
}

impl Default for CowServiceMap {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceLookup for CowServiceMap {
    fn get(&self, hostname: &str) -> Option<String> {
        self.inner.load().get(&normalize_hostname(hostname)).cloned()
    }

    fn len(&self) -> usize {
        CowServiceMap::len(self)
    }
}

fn normalize_entries<I, K, V>(entries: I) -> HashMap<String, String>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<String>,
{
    entries
        .into_iter()
        .map(|(host, service)| (normalize_hostname(host.as_ref()), service.into()))
        .collect()
}
