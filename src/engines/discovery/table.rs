use crate::types::ScoredKernel;
use log::warn;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

/// Append-only table of every kernel structure seen during a run.
///
/// Keys are canonical text forms and are unique. An entry's tree and depth
/// never change after insertion; its score is recorded at most once.
#[derive(Debug, Default)]
pub struct ScoredKernelTable {
    entries: Vec<ScoredKernel>,
    index: HashMap<String, usize>,
}

impl ScoredKernelTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new entry. Returns `false` and leaves the table untouched if
    /// the key is already present.
    pub fn insert(&mut self, entry: ScoredKernel) -> bool {
        if self.index.contains_key(&entry.key) {
            return false;
        }
        self.index.insert(entry.key.clone(), self.entries.len());
        self.entries.push(entry);
        true
    }

    /// Attach a fit result to a pending entry.
    pub fn record_score(&mut self, key: &str, score: f64, params: Option<BTreeMap<String, f64>>) -> bool {
        let Some(&i) = self.index.get(key) else {
            warn!("Ignoring score for unknown kernel `{}`", key);
            return false;
        };
        let entry = &mut self.entries[i];
        if entry.evaluated {
            warn!("Kernel `{}` already scored, keeping {}", key, entry.score);
            return false;
        }
        entry.score = score;
        entry.params = params;
        entry.evaluated = true;
        true
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&ScoredKernel> {
        self.index.get(key).map(|&i| &self.entries[i])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.key.as_str())
    }

    /// The `n` lowest scores. Equal scores keep insertion order.
    pub fn n_best(&self, n: usize) -> Vec<&ScoredKernel> {
        let mut ranked: Vec<&ScoredKernel> = self.entries.iter().collect();
        ranked.sort_by(|a, b| a.score.partial_cmp(&b.score).unwrap_or(Ordering::Equal));
        ranked.truncate(n);
        ranked
    }

    pub fn best_score(&self) -> f64 {
        self.entries
            .iter()
            .map(|e| e.score)
            .fold(f64::INFINITY, f64::min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BaseKernel, KernelNode};

    fn entry(key: &str, depth: usize) -> ScoredKernel {
        ScoredKernel::unscored(key.to_string(), KernelNode::Leaf(BaseKernel::White), depth)
    }

    #[test]
    fn test_duplicate_keys_rejected() {
        let mut table = ScoredKernelTable::new();
        assert!(table.insert(entry("white", 0)));
        assert!(!table.insert(entry("white", 3)));
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("white").unwrap().depth, 0);
    }

    #[test]
    fn test_score_recorded_once() {
        let mut table = ScoredKernelTable::new();
        table.insert(entry("linear", 0));
        assert!(table.record_score("linear", 4.0, None));
        assert!(!table.record_score("linear", 1.0, None));
        assert_eq!(table.get("linear").unwrap().score, 4.0);
        assert!(!table.record_score("missing", 1.0, None));
    }

    #[test]
    fn test_n_best_is_stable() {
        let mut table = ScoredKernelTable::new();
        for key in ["a", "b", "c", "d"] {
            table.insert(entry(key, 1));
        }
        table.record_score("a", 5.0, None);
        table.record_score("b", 2.0, None);
        table.record_score("c", 5.0, None);
        table.record_score("d", 2.0, None);

        let best: Vec<&str> = table.n_best(3).iter().map(|e| e.key.as_str()).collect();
        assert_eq!(best, vec!["b", "d", "a"]);
        assert_eq!(table.best_score(), 2.0);
    }

    #[test]
    fn test_unscored_entries_rank_last() {
        let mut table = ScoredKernelTable::new();
        table.insert(entry("white", 0));
        table.insert(entry("rbf", 0));
        table.record_score("rbf", 10.0, None);
        assert_eq!(table.n_best(1)[0].key, "rbf");
        assert_eq!(table.n_best(10).len(), 2);
    }
}
