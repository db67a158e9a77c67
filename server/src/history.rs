use shared::VersionDiff;
use std::collections::VecDeque;
use std::sync::Arc;

/// Bounded newest-first ring of published diffs.
#[derive(Debug)]
pub struct VersionHistory {
    capacity: usize,
    entries: VecDeque<Arc<VersionDiff>>,
}

impl VersionHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Inserts `diff` as newest, evicting the oldest entries beyond capacity.
    pub fn push(&mut self, diff: Arc<VersionDiff>) {
        while self.entries.len() >= self.capacity.max(1) {
            self.entries.pop_back();
        }
        self.entries.push_front(diff);
    }

    pub fn latest(&self) -> Option<&Arc<VersionDiff>> {
        self.entries.front()
    }

    pub fn oldest(&self) -> Option<&Arc<VersionDiff>> {
        self.entries.back()
    }

    /// Diffs whose version appears in `versions`, newest first. Unknown
    /// versions are skipped.
    pub fn versions(&self, versions: &[u64]) -> Vec<Arc<VersionDiff>> {
        self.entries
            .iter()
            .filter(|diff| versions.contains(&diff.version))
            .cloned()
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<VersionDiff>> + '_ {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diff(version: u64) -> Arc<VersionDiff> {
        Arc::new(VersionDiff {
            version,
            timestamp: 0,
            full: false,
            groups: Vec::new(),
        })
    }

    #[test]
    fn test_push_keeps_newest_first() {
        let mut history = VersionHistory::new(5);
        history.push(diff(1));
        history.push(diff(2));
        history.push(diff(3));

        assert_eq!(history.len(), 3);
        assert_eq!(history.latest().unwrap().version, 3);
        assert_eq!(history.oldest().unwrap().version, 1);
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut history = VersionHistory::new(20);
        for version in 1..=25 {
            history.push(diff(version));
            assert!(history.len() <= 20);
        }

        assert_eq!(history.len(), 20);
        assert_eq!(history.oldest().unwrap().version, 6);
        assert_eq!(history.latest().unwrap().version, 25);
    }

    #[test]
    fn test_versions_skips_missing() {
        let mut history = VersionHistory::new(3);
        for version in 1..=5 {
            history.push(diff(version));
        }

        let found: Vec<u64> = history
            .versions(&[1, 3, 5, 99])
            .iter()
            .map(|d| d.version)
            .collect();
        assert_eq!(found, vec![5, 3]);
        assert!(history.versions(&[]).is_empty());
    }
}
