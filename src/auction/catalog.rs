// Available-player cache: the set of names not yet purchased by anyone.

use serde::{Deserialize, Serialize};

/// Insertion-ordered cache of available player names.
///
/// The valuation service is the source of truth for who has been taken by
/// *any* team (including ones not tracked locally), so updates are wholesale
/// replacements rather than incremental diffs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerCatalog {
    available: Vec<String>,
}

impl PlayerCatalog {
    pub fn new() -> Self {
        PlayerCatalog::default()
    }

    /// Replace the available set wholesale, preserving the given order.
    /// Duplicate names (case-insensitive) keep their first occurrence.
    pub fn refresh(&mut self, names: Vec<String>) {
        self.available.clear();
        for name in names {
            if !self.contains(&name) {
                self.available.push(name);
            }
        }
    }

    /// Remove a name (case-insensitive) after a purchase event.
    pub fn remove(&mut self, name: &str) {
        self.available.retain(|n| !n.eq_ignore_ascii_case(name));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.available.iter().any(|n| n.eq_ignore_ascii_case(name))
    }

    pub fn names(&self) -> &[String] {
        &self.available
    }

    pub fn len(&self) -> usize {
        self.available.len()
    }

    pub fn is_empty(&self) -> bool {
        self.available.is_empty()
    }

    /// Case-insensitive substring search over the available names, in
    /// catalog iteration order. An empty query yields an empty result so the
    /// UI is not flooded before the user types anything.
    pub fn search(&self, query: &str) -> Vec<String> {
        if query.is_empty() {
            return Vec::new();
        }
        let query_lower = query.to_lowercase();
        self.available
            .iter()
            .filter(|n| n.to_lowercase().contains(&query_lower))
            .cloned()
            .collect()
    }
}
