use crate::persist::load_index;
use crate::{IndexError, PersistedIndex, Result};
use parking_lot::RwLock;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

pub const DEFAULT_K: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hit {
    pub id: String,
    pub score: f64,
}

/// Rank every indexed document against `caption` by cosine similarity.
///
/// Ties keep `file_list` order. `exclude_id` is removed before the top `k`
/// are taken, so fewer than `k` hits come back only when the index runs out.
pub fn query(index: &PersistedIndex, caption: &str, exclude_id: Option<&str>, k: usize) -> Vec<Hit> {
    let q = index.space.project(caption);
    let mut scored: Vec<(usize, f64)> = if q.is_zero() {
        (0..index.num_docs()).map(|i| (i, 0.0)).collect()
    } else {
        index.matrix.rows.iter().map(|row| q.dot(row)).enumerate().collect()
    };
    // stable sort keeps corpus order for equal scores
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));

    scored
        .into_iter()
        .map(|(i, score)| (&index.file_list[i], score))
        .filter(|(id, _)| exclude_id != Some(id.as_str()))
        .take(k)
        .map(|(id, score)| Hit { id: id.clone(), score })
        .collect()
}

/// Holds the active index and answers queries against it.
///
/// Queries clone the `Arc` under a short read lock and score without holding it,
/// so swapping in a rebuilt index never exposes a half-replaced one.
pub struct QueryEngine {
    active: RwLock<Option<Arc<PersistedIndex>>>,
    k: usize,
}

impl QueryEngine {
    pub fn new() -> Self { Self::with_k(DEFAULT_K) }

    pub fn with_k(k: usize) -> Self { Self { active: RwLock::new(None), k } }

    pub fn from_index(index: PersistedIndex) -> Self {
        let engine = Self::new();
        engine.install(index);
        engine
    }

    /// Replace the active index wholesale.
    pub fn install(&self, index: PersistedIndex) {
        let (num_docs, num_terms) = (index.num_docs(), index.num_terms());
        *self.active.write() = Some(Arc::new(index));
        tracing::info!(num_docs, num_terms, "installed caption index");
    }

    /// Load an index file and swap it in. The previous index stays active if loading fails.
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let index = load_index(path)?;
        self.install(index);
        Ok(())
    }

    pub fn snapshot(&self) -> Result<Arc<PersistedIndex>> {
        self.active.read().clone().ok_or(IndexError::IndexNotLoaded)
    }

    pub fn is_loaded(&self) -> bool { self.active.read().is_some() }

    pub fn k(&self) -> usize { self.k }

    pub fn query_top_k(&self, caption: &str, exclude_id: Option<&str>) -> Result<Vec<Hit>> {
        self.query(caption, exclude_id, self.k)
    }

    pub fn query(&self, caption: &str, exclude_id: Option<&str>, k: usize) -> Result<Vec<Hit>> {
        let index = self.snapshot()?;
        let hits = query(&index, caption, exclude_id, k);
        tracing::debug!(caption, ?exclude_id, k, hits = hits.len(), "caption query");
        Ok(hits)
    }
}

impl Default for QueryEngine {
    fn default() -> Self { Self::new() }
}
