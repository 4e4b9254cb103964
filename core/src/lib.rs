pub mod corpus;
pub mod error;
pub mod index;
pub mod persist;
pub mod query;
pub mod tokenizer;

pub use error::{IndexError, Result};
pub use index::{build, DocMatrix, Document, PersistedIndex, SparseRow, VectorSpace, Vocabulary};
pub use query::{query, Hit, QueryEngine, DEFAULT_K};

/// Read a caption corpus directory and build an index from it.
pub fn build_index<P: AsRef<std::path::Path>>(corpus_dir: P, image_ext: &str) -> Result<PersistedIndex> {
    let docs = corpus::load_corpus(corpus_dir, image_ext)?;
    build(&docs)
}
