use tagsim_core::index::smoothed_idf;
use tagsim_core::{build, Document, IndexError};

fn corpus() -> Vec<Document> {
    vec![
        Document::new("a.png", "cat, outdoor"),
        Document::new("b.png", "cat, indoor"),
        Document::new("c.png", "dog, outdoor"),
    ]
}

#[test]
fn empty_corpus_is_rejected() {
    assert!(matches!(build(&[]), Err(IndexError::EmptyCorpus)));
}

#[test]
fn builds_are_deterministic() {
    let a = build(&corpus()).unwrap();
    let b = build(&corpus()).unwrap();
    assert_eq!(a.file_list, b.file_list);
    assert_eq!(a.space.vocabulary.terms(), b.space.vocabulary.terms());
    let bits = |v: &[f64]| v.iter().map(|x| x.to_bits()).collect::<Vec<_>>();
    assert_eq!(bits(&a.space.idf), bits(&b.space.idf));
    for (ra, rb) in a.matrix.rows.iter().zip(&b.matrix.rows) {
        assert_eq!(ra.indices, rb.indices);
        assert_eq!(bits(&ra.values), bits(&rb.values));
    }
}

#[test]
fn rows_follow_corpus_order() {
    let idx = build(&corpus()).unwrap();
    assert_eq!(idx.file_list, vec!["a.png", "b.png", "c.png"]);
    assert_eq!(idx.matrix.row_count(), 3);
    idx.validate().unwrap();
}

#[test]
fn idf_is_smoothed() {
    let idx = build(&corpus()).unwrap();
    let cat = idx.space.vocabulary.get("cat").unwrap() as usize;
    let dog = idx.space.vocabulary.get("dog").unwrap() as usize;
    assert!((idx.space.idf[cat] - ((4.0f64 / 3.0).ln() + 1.0)).abs() < 1e-12);
    assert!((idx.space.idf[dog] - (2.0f64.ln() + 1.0)).abs() < 1e-12);
    assert_eq!(smoothed_idf(3, 3), 1.0);
}

#[test]
fn rows_are_unit_length() {
    let idx = build(&corpus()).unwrap();
    for row in &idx.matrix.rows {
        assert!((row.norm() - 1.0).abs() < 1e-6);
    }
}

#[test]
fn repeated_tag_counts_as_tf() {
    let idx = build(&[Document::new("a.png", "cat, cat, dog"), Document::new("b.png", "dog")]).unwrap();
    let row = &idx.matrix.rows[0];
    let cat = idx.space.vocabulary.get("cat").unwrap();
    let dog = idx.space.vocabulary.get("dog").unwrap();
    let w = |tid| row.values[row.indices.iter().position(|&c| c == tid).unwrap()];
    let raw_cat = 2.0 * idx.space.idf[cat as usize];
    let raw_dog = idx.space.idf[dog as usize];
    assert!((w(cat) / w(dog) - raw_cat / raw_dog).abs() < 1e-9);
}

#[test]
fn empty_caption_indexes_the_empty_term() {
    let idx = build(&[Document::new("blank.png", ""), Document::new("x.png", "cat")]).unwrap();
    assert_eq!(idx.space.vocabulary.get(""), Some(0));
    let row = &idx.matrix.rows[0];
    assert_eq!(row.indices, vec![0]);
    assert!((row.values[0] - 1.0).abs() < 1e-12);
}

#[test]
fn validate_catches_row_count_mismatch() {
    let mut idx = build(&corpus()).unwrap();
    idx.file_list.pop();
    assert!(matches!(idx.validate(), Err(IndexError::MalformedIndex(_))));
}

#[test]
fn validate_catches_out_of_range_column() {
    let mut idx = build(&corpus()).unwrap();
    idx.matrix.rows[0].indices[1] = 99;
    assert!(matches!(idx.validate(), Err(IndexError::MalformedIndex(_))));
}

#[test]
fn validate_catches_idf_mismatch() {
    let mut idx = build(&corpus()).unwrap();
    idx.space.idf.push(1.0);
    assert!(matches!(idx.validate(), Err(IndexError::MalformedIndex(_))));
}

#[test]
fn validate_catches_non_finite_weight() {
    let mut idx = build(&corpus()).unwrap();
    idx.matrix.rows[2].values[0] = f64::NAN;
    assert!(matches!(idx.validate(), Err(IndexError::MalformedIndex(_))));
}

#[test]
fn validate_catches_unnormalized_row() {
    let mut idx = build(&corpus()).unwrap();
    for v in idx.matrix.rows[1].values.iter_mut() { *v *= 50.0; }
    assert!(matches!(idx.validate(), Err(IndexError::MalformedIndex(_))));
}

#[test]
fn validate_catches_bad_idf() {
    let mut idx = build(&corpus()).unwrap();
    idx.space.idf[0] = 0.0;
    assert!(matches!(idx.validate(), Err(IndexError::MalformedIndex(_))));
    idx.space.idf[0] = f64::INFINITY;
    assert!(matches!(idx.validate(), Err(IndexError::MalformedIndex(_))));
}

#[test]
fn validate_accepts_zero_row() {
    let mut idx = build(&corpus()).unwrap();
    for v in idx.matrix.rows[0].values.iter_mut() { *v = 0.0; }
    idx.validate().unwrap();
}
