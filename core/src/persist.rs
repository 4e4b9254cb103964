use crate::index::{DocMatrix, VectorSpace, Vocabulary};
use crate::tokenizer::Tokenizer;
use crate::{IndexError, PersistedIndex, Result};
use bincode::Options;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Leading bytes of every index file.
const INDEX_MAGIC: &[u8; 4] = b"TSIX";
pub const FORMAT_VERSION: u32 = 1;

// Fixed-width integers; the record must span the rest of the file.
fn codec() -> impl Options {
    bincode::options().with_fixint_encoding().reject_trailing_bytes()
}

// On-disk layout: file_list, matrix, then the vector-space state.
#[derive(Serialize)]
struct IndexRecordRef<'a> {
    file_list: &'a [String],
    matrix: &'a DocMatrix,
    space: SpaceRecordRef<'a>,
}

#[derive(Serialize)]
struct SpaceRecordRef<'a> {
    tokenizer: &'a str,
    terms: &'a [String],
    idf: &'a [f64],
}

#[derive(Deserialize)]
struct IndexRecord {
    file_list: Vec<String>,
    matrix: DocMatrix,
    space: SpaceRecord,
}

#[derive(Deserialize)]
struct SpaceRecord {
    tokenizer: String,
    terms: Vec<String>,
    idf: Vec<f64>,
}

/// Human-readable summary written next to the index file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexManifest {
    pub num_docs: usize,
    pub num_terms: usize,
    pub created_at: String,
    pub version: u32,
    pub tokenizer: String,
}

impl IndexManifest {
    pub fn describe(index: &PersistedIndex, created_at: impl Into<String>) -> Self {
        Self {
            num_docs: index.num_docs(),
            num_terms: index.num_terms(),
            created_at: created_at.into(),
            version: FORMAT_VERSION,
            tokenizer: index.space.tokenizer.id().to_string(),
        }
    }
}

/// `caption_index.bin` → `caption_index.bin.meta.json`
pub fn manifest_path<P: AsRef<Path>>(index_path: P) -> PathBuf {
    let mut os = index_path.as_ref().as_os_str().to_owned();
    os.push(".meta.json");
    PathBuf::from(os)
}

pub fn encode_index(index: &PersistedIndex) -> Result<Vec<u8>> {
    let record = IndexRecordRef {
        file_list: &index.file_list,
        matrix: &index.matrix,
        space: SpaceRecordRef {
            tokenizer: index.space.tokenizer.id(),
            terms: index.space.vocabulary.terms(),
            idf: &index.space.idf,
        },
    };
    let payload = codec().serialize(&record)?;
    let mut out = Vec::with_capacity(payload.len() + 8);
    out.extend_from_slice(INDEX_MAGIC);
    out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    out.extend_from_slice(&payload);
    Ok(out)
}

pub fn decode_index(bytes: &[u8]) -> Result<PersistedIndex> {
    if bytes.len() < 8 || &bytes[..4] != INDEX_MAGIC {
        return Err(IndexError::malformed("missing index header"));
    }
    let version = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    if version != FORMAT_VERSION {
        return Err(IndexError::UnsupportedVersion(version));
    }
    let record: IndexRecord = codec().deserialize(&bytes[8..])?;
    let tokenizer = Tokenizer::from_id(&record.space.tokenizer)?;
    let vocabulary = Vocabulary::from_terms(record.space.terms)?;
    let index = PersistedIndex {
        file_list: record.file_list,
        matrix: record.matrix,
        space: VectorSpace { tokenizer, vocabulary, idf: record.space.idf },
    };
    index.validate()?;
    Ok(index)
}

/// Write the index atomically: uniquely named temp file in the same directory,
/// synced, then renamed over `path`.
pub fn save_index<P: AsRef<Path>>(path: P, index: &PersistedIndex) -> Result<()> {
    let path = path.as_ref();
    let parent = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => parent,
        None => Path::new("."),
    };
    fs::create_dir_all(parent)?;
    let bytes = encode_index(index)?;
    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(&bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    tracing::info!(path = %path.display(), bytes = bytes.len(), num_docs = index.num_docs(), "saved caption index");
    Ok(())
}

pub fn load_index<P: AsRef<Path>>(path: P) -> Result<PersistedIndex> {
    let path = path.as_ref();
    let bytes = fs::read(path)?;
    let index = decode_index(&bytes)?;
    tracing::info!(path = %path.display(), num_docs = index.num_docs(), num_terms = index.num_terms(), "loaded caption index");
    Ok(index)
}

pub fn save_manifest<P: AsRef<Path>>(index_path: P, manifest: &IndexManifest) -> Result<()> {
    let json = serde_json::to_string_pretty(manifest)?;
    fs::write(manifest_path(index_path), json)?;
    Ok(())
}

pub fn load_manifest<P: AsRef<Path>>(index_path: P) -> Result<IndexManifest> {
    let buf = fs::read_to_string(manifest_path(index_path))?;
    let manifest: IndexManifest = serde_json::from_str(&buf)?;
    Ok(manifest)
}
