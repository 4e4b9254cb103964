use crate::tokenizer::Tokenizer;
use crate::{IndexError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

pub type TermId = u32;

/// Allowed drift of a stored row's L2 norm from 1.
pub const NORM_TOLERANCE: f64 = 1e-6;

/// One indexed image: its id (usually the image filename) and its tag caption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: String,
    pub caption: String,
}

impl Document {
    pub fn new(id: impl Into<String>, caption: impl Into<String>) -> Self {
        Self { id: id.into(), caption: caption.into() }
    }
}

/// Term → column mapping. Columns are handed out in first-seen order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Vocabulary {
    terms: Vec<String>,
    lookup: HashMap<String, TermId>,
}

impl Vocabulary {
    pub fn new() -> Self { Self::default() }

    /// Rebuild a vocabulary from its column-ordered term list.
    pub fn from_terms(terms: Vec<String>) -> Result<Self> {
        let mut lookup = HashMap::with_capacity(terms.len());
        for (col, term) in terms.iter().enumerate() {
            if lookup.insert(term.clone(), col as TermId).is_some() {
                return Err(IndexError::malformed(format!("duplicate vocabulary term {term:?}")));
            }
        }
        Ok(Self { terms, lookup })
    }

    fn intern(&mut self, term: String) -> TermId {
        if let Some(&tid) = self.lookup.get(&term) {
            return tid;
        }
        let tid = self.terms.len() as TermId;
        self.lookup.insert(term.clone(), tid);
        self.terms.push(term);
        tid
    }

    pub fn get(&self, term: &str) -> Option<TermId> { self.lookup.get(term).copied() }
    pub fn term(&self, tid: TermId) -> Option<&str> { self.terms.get(tid as usize).map(String::as_str) }
    pub fn terms(&self) -> &[String] { &self.terms }
    pub fn len(&self) -> usize { self.terms.len() }
    pub fn is_empty(&self) -> bool { self.terms.is_empty() }
}

/// Sparse vector with ascending column indices.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SparseRow {
    pub indices: Vec<TermId>,
    pub values: Vec<f64>,
}

impl SparseRow {
    /// L2-normalized row from `(column, weight)` pairs. A zero vector stays zero.
    pub fn normalized(weights: impl IntoIterator<Item = (TermId, f64)>) -> Self {
        let mut pairs: Vec<(TermId, f64)> = weights.into_iter().collect();
        pairs.sort_by_key(|(tid, _)| *tid);
        let norm = pairs.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
        let (indices, mut values): (Vec<TermId>, Vec<f64>) = pairs.into_iter().unzip();
        if norm > 0.0 {
            for v in values.iter_mut() { *v /= norm; }
        }
        Self { indices, values }
    }

    pub fn norm(&self) -> f64 { self.values.iter().map(|v| v * v).sum::<f64>().sqrt() }

    pub fn is_zero(&self) -> bool { self.values.iter().all(|v| *v == 0.0) }

    /// Dot product by merging the two sorted index lists.
    pub fn dot(&self, other: &SparseRow) -> f64 {
        let (mut i, mut j, mut acc) = (0, 0, 0.0);
        while i < self.indices.len() && j < other.indices.len() {
            match self.indices[i].cmp(&other.indices[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    acc += self.values[i] * other.values[j];
                    i += 1;
                    j += 1;
                }
            }
        }
        acc
    }
}

/// Document-vector matrix; row `i` belongs to `file_list[i]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocMatrix {
    pub n_cols: u32,
    pub rows: Vec<SparseRow>,
}

impl DocMatrix {
    pub fn row_count(&self) -> usize { self.rows.len() }
}

/// Frozen vector space: tokenizer, vocabulary and per-column idf.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorSpace {
    pub tokenizer: Tokenizer,
    pub vocabulary: Vocabulary,
    pub idf: Vec<f64>,
}

impl VectorSpace {
    /// tf * idf per column, then L2-normalized.
    fn weigh(&self, tf: &BTreeMap<TermId, u32>) -> SparseRow {
        SparseRow::normalized(tf.iter().map(|(&tid, &count)| (tid, count as f64 * self.idf[tid as usize])))
    }

    /// Project a caption into this space. Terms outside the vocabulary are dropped.
    pub fn project(&self, caption: &str) -> SparseRow {
        let mut tf: BTreeMap<TermId, u32> = BTreeMap::new();
        for term in self.tokenizer.tokenize(caption) {
            if let Some(tid) = self.vocabulary.get(&term) {
                *tf.entry(tid).or_insert(0) += 1;
            }
        }
        self.weigh(&tf)
    }
}

/// Smoothed idf: ln((1 + N) / (1 + df)) + 1.
pub fn smoothed_idf(num_docs: usize, df: u32) -> f64 {
    ((1.0 + num_docs as f64) / (1.0 + df as f64)).ln() + 1.0
}

/// Immutable snapshot of a built caption index.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedIndex {
    pub file_list: Vec<String>,
    pub matrix: DocMatrix,
    pub space: VectorSpace,
}

impl PersistedIndex {
    pub fn num_docs(&self) -> usize { self.file_list.len() }
    pub fn num_terms(&self) -> usize { self.space.vocabulary.len() }

    /// Check the structural invariants a query relies on.
    pub fn validate(&self) -> Result<()> {
        if self.file_list.len() != self.matrix.row_count() {
            return Err(IndexError::malformed(format!(
                "file_list has {} entries but matrix has {} rows",
                self.file_list.len(),
                self.matrix.row_count()
            )));
        }
        let n_terms = self.space.vocabulary.len();
        if self.space.idf.len() != n_terms {
            return Err(IndexError::malformed(format!("vocabulary has {} terms but idf has {} weights", n_terms, self.space.idf.len())));
        }
        if self.matrix.n_cols as usize != n_terms {
            return Err(IndexError::malformed(format!("matrix has {} columns but vocabulary has {} terms", self.matrix.n_cols, n_terms)));
        }
        for (i, row) in self.matrix.rows.iter().enumerate() {
            if row.indices.len() != row.values.len() {
                return Err(IndexError::malformed(format!("row {i} has mismatched indices and values")));
            }
            if row.indices.windows(2).any(|w| w[0] >= w[1]) {
                return Err(IndexError::malformed(format!("row {i} columns are not strictly ascending")));
            }
            if let Some(&col) = row.indices.iter().find(|&&c| c as usize >= n_terms) {
                return Err(IndexError::malformed(format!("row {i} references column {col} outside the vocabulary")));
            }
            if row.values.iter().any(|v| !v.is_finite()) {
                return Err(IndexError::malformed(format!("row {i} holds a non-finite weight")));
            }
            let norm = row.norm();
            if norm != 0.0 && (norm - 1.0).abs() > NORM_TOLERANCE {
                return Err(IndexError::malformed(format!("row {i} has norm {norm}, expected 0 or 1")));
            }
        }
        if let Some((col, w)) = self.space.idf.iter().enumerate().find(|(_, w)| !w.is_finite() || **w <= 0.0) {
            return Err(IndexError::malformed(format!("idf of column {col} is {w}")));
        }
        Ok(())
    }
}

/// Build an index over `docs`, keeping their order as the row order.
pub fn build(docs: &[Document]) -> Result<PersistedIndex> {
    if docs.is_empty() {
        return Err(IndexError::EmptyCorpus);
    }
    let tokenizer = Tokenizer::default();
    let mut vocabulary = Vocabulary::new();
    let mut df: Vec<u32> = Vec::new();
    let mut doc_tf: Vec<BTreeMap<TermId, u32>> = Vec::with_capacity(docs.len());

    for doc in docs {
        let mut tf_counts: BTreeMap<TermId, u32> = BTreeMap::new();
        let mut seen_in_doc: HashSet<TermId> = HashSet::new();
        for term in tokenizer.tokenize(&doc.caption) {
            let tid = vocabulary.intern(term);
            if df.len() <= tid as usize { df.resize(tid as usize + 1, 0); }
            *tf_counts.entry(tid).or_insert(0) += 1;
            if seen_in_doc.insert(tid) {
                df[tid as usize] += 1;
            }
        }
        doc_tf.push(tf_counts);
    }

    let n = docs.len();
    let idf: Vec<f64> = df.iter().map(|&d| smoothed_idf(n, d)).collect();
    let space = VectorSpace { tokenizer, vocabulary, idf };
    let rows: Vec<SparseRow> = doc_tf.iter().map(|tf| space.weigh(tf)).collect();
    let matrix = DocMatrix { n_cols: space.vocabulary.len() as u32, rows };
    let file_list = docs.iter().map(|d| d.id.clone()).collect();

    tracing::info!(num_docs = n, num_terms = space.vocabulary.len(), "built caption index");
    Ok(PersistedIndex { file_list, matrix, space })
}
