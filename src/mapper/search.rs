//! Fuzzy search over the paths of a unit graph.

use std::collections::BTreeMap;

use levenshtein::levenshtein;

use super::UnitGraph;
use crate::qualpath::QualPath;

/// Minimal similarity of a suffix to be reported.
pub const SIMILARITY_CUTOFF: f64 = 0.6;

/// Maximal number of suffixes a search returns paths for.
pub const MAX_MATCHES: usize = 10;

/// Suffix index over every path of a graph, rebuilt lazily after
/// [`CachedSearcher::invalidate`].
#[derive(Debug, Default)]
pub struct CachedSearcher {
    valid: bool,
    /// Lowercased dotted suffix to the paths ending with it.
    index: BTreeMap<String, Vec<QualPath>>,
}

impl CachedSearcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the index stale; the next search rebuilds it.
    pub fn invalidate(&mut self) {
        self.valid = false;
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    fn ensure(&mut self, graph: &UnitGraph) {
        if self.valid {
            return;
        }
        let mut index: BTreeMap<String, Vec<QualPath>> = BTreeMap::new();
        for (path, _) in graph.paths() {
            for suffix in path.suffixes() {
                index.entry(suffix.to_lowercase()).or_default().push(path.clone());
            }
        }
        for paths in index.values_mut() {
            paths.sort();
            paths.dedup();
        }
        tracing::debug!(suffixes = index.len(), "rebuilt search index");
        self.index = index;
        self.valid = true;
    }

    /// Paths whose dotted suffix equals `suffix`, case-insensitively.
    pub fn lookup_suffix(&mut self, graph: &UnitGraph, suffix: &str) -> &[QualPath] {
        self.ensure(graph);
        self.index
            .get(&suffix.to_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Paths whose suffixes are close to `query`, best matches first.
    pub fn search(&mut self, graph: &UnitGraph, query: &str) -> Vec<QualPath> {
        self.ensure(graph);
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<(f64, &String)> = self
            .index
            .keys()
            .filter_map(|key| {
                let score = similarity(&query, key);
                (score >= SIMILARITY_CUTOFF).then_some((score, key))
            })
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.cmp(b.1)));

        let mut results: Vec<QualPath> = Vec::new();
        for (_, key) in scored.into_iter().take(MAX_MATCHES) {
            for path in &self.index[key] {
                if !results.contains(path) {
                    results.push(path.clone());
                }
            }
        }
        results
    }
}

/// `1 - distance / longer length`, in `0.0..=1.0`.
pub fn similarity(a: &str, b: &str) -> f64 {
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 1.0;
    }
    1.0 - levenshtein(a, b) as f64 / longest as f64
}
