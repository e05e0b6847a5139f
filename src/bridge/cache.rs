use parking_lot::Mutex;

use super::topic_map::{TopicMap, diff};

/// The last topic map handed to the publisher.
///
/// Only refreshes write to it, always wholesale. Readers get a copy.
#[derive(Debug, Default)]
pub struct StateCache {
    published: Mutex<TopicMap>,
}

impl StateCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, topic: &str) -> Option<String> {
        self.published.lock().get(topic).cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.published.lock().is_empty()
    }

    pub fn snapshot(&self) -> TopicMap {
        self.published.lock().clone()
    }

    /// Replace the cache without comparing, used by the startup publish.
    pub fn replace(&self, map: TopicMap) {
        *self.published.lock() = map;
    }

    /// Diff `map` against the cache and store it, as one critical section.
    pub fn swap_changes(&self, map: TopicMap) -> TopicMap {
        let mut published = self.published.lock();
        let changes = diff(&published, &map);
        *published = map;
        changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> TopicMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn starts_empty() {
        let cache = StateCache::new();
        assert!(cache.is_empty());
        assert_eq!(cache.get("r/state"), None);
    }

    #[test]
    fn swap_returns_changes_and_stores_new_map() {
        let cache = StateCache::new();
        cache.replace(map(&[("r/state", "Idle"), ("r/details/charge", "80")]));

        let changes = cache.swap_changes(map(&[("r/state", "Busy"), ("r/details/charge", "80")]));

        assert_eq!(changes, map(&[("r/state", "Busy")]));
        assert_eq!(cache.get("r/state").as_deref(), Some("Busy"));
    }

    #[test]
    fn swap_without_changes_still_replaces() {
        let cache = StateCache::new();
        cache.replace(map(&[("r/state", "Idle"), ("r/stale", "x")]));

        let changes = cache.swap_changes(map(&[("r/state", "Idle")]));

        assert!(changes.is_empty());
        assert_eq!(cache.snapshot(), map(&[("r/state", "Idle")]));
    }
}
