use crate::{Document, Result};
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

/// Read `<stem>.txt` caption files from `dir` (non-recursive, file-name order).
///
/// Each caption becomes a document whose id is `<stem>.<image_ext>`, the image
/// the caption was generated from. Captions are trimmed of surrounding whitespace.
pub fn load_corpus<P: AsRef<Path>>(dir: P, image_ext: &str) -> Result<Vec<Document>> {
    let dir = dir.as_ref();
    let image_ext = image_ext.trim_start_matches('.');
    let mut docs = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::from)?;
        let p = entry.path();
        if !p.is_file() || p.extension().and_then(|s| s.to_str()) != Some("txt") {
            continue;
        }
        let Some(stem) = p.file_stem().and_then(|s| s.to_str()) else {
            tracing::warn!(path = %p.display(), "skipping caption file with non UTF-8 name");
            continue;
        };
        let caption = fs::read_to_string(p)?;
        docs.push(Document::new(format!("{stem}.{image_ext}"), caption.trim()));
    }
    tracing::info!(dir = %dir.display(), num_docs = docs.len(), "loaded caption corpus");
    Ok(docs)
}
