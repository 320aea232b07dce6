//! Memoized analysis results.

use std::collections::HashMap;
use std::sync::Mutex;

use prtriage_types::Issue;

use crate::identity::content_hash;

/// Analysis results keyed by a hash of `(filename, language, content)`.
///
/// Entries never expire; callers drop them with [`IssueCache::clear`]. The
/// lock is held while computing, so concurrent misses on the same cache are
/// serialized rather than duplicated.
#[derive(Debug, Default)]
pub struct IssueCache {
    entries: Mutex<HashMap<String, Vec<Issue>>>,
}

impl IssueCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache key for one analysis request.
    pub fn key(filename: &str, language: &str, content: &str) -> String {
        content_hash(&format!("{filename}\0{language}\0{content}"))
    }

    pub fn get(&self, key: &str) -> Option<Vec<Issue>> {
        self.lock().get(key).cloned()
    }

    pub fn get_or_compute(&self, key: &str, compute: impl FnOnce() -> Vec<Issue>) -> Vec<Issue> {
        let mut entries = self.lock();
        if let Some(hit) = entries.get(key) {
            return hit.clone();
        }
        let issues = compute();
        entries.insert(key.to_string(), issues.clone());
        issues
    }

    /// Like [`get_or_compute`](Self::get_or_compute); errors are returned and not cached.
    pub fn get_or_try_compute<E>(
        &self,
        key: &str,
        compute: impl FnOnce() -> Result<Vec<Issue>, E>,
    ) -> Result<Vec<Issue>, E> {
        let mut entries = self.lock();
        if let Some(hit) = entries.get(key) {
            return Ok(hit.clone());
        }
        let issues = compute()?;
        entries.insert(key.to_string(), issues.clone());
        Ok(issues)
    }

    /// Drop one entry, or everything when `key` is `None`.
    pub fn clear(&self, key: Option<&str>) {
        let mut entries = self.lock();
        match key {
            Some(k) => {
                entries.remove(k);
            }
            None => entries.clear(),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<Issue>>> {
        // A panic inside `compute` leaves the map itself consistent.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}
