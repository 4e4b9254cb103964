use std::sync::Arc;
use tagsim_core::{build, query, Document, IndexError, PersistedIndex, QueryEngine};

fn example_index() -> PersistedIndex {
    build(&[
        Document::new("a.png", "cat, outdoor"),
        Document::new("b.png", "cat, indoor"),
        Document::new("c.png", "dog, outdoor"),
    ])
    .unwrap()
}

#[test]
fn exact_caption_ranks_first() {
    let idx = example_index();
    let hits = query(&idx, "cat, outdoor", None, 5);
    let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
    assert_eq!(ids, vec!["a.png", "b.png", "c.png"]);
    assert!((hits[0].score - 1.0).abs() < 1e-9);
    assert!(hits[1].score < hits[0].score);
    // b and c share one equally weighted tag with the query
    assert!((hits[1].score - hits[2].score).abs() < 1e-12);
    assert!(hits[2].score > 0.0);
}

#[test]
fn self_similarity_is_one() {
    let idx = example_index();
    for (id, caption) in [("a.png", "cat, outdoor"), ("b.png", "cat, indoor"), ("c.png", "dog, outdoor")] {
        let hit = query(&idx, caption, None, 5).into_iter().find(|h| h.id == id).unwrap();
        assert!((hit.score - 1.0).abs() < 1e-6, "{id}: {}", hit.score);
    }
}

#[test]
fn excluded_id_never_returned() {
    let idx = example_index();
    let hits = query(&idx, "cat, outdoor", Some("a.png"), 5);
    assert!(hits.iter().all(|h| h.id != "a.png"));
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].id, "b.png");
}

#[test]
fn unknown_exclude_id_is_ignored() {
    let idx = example_index();
    assert_eq!(query(&idx, "cat", Some("zzz.png"), 5).len(), 3);
}

#[test]
fn out_of_vocabulary_scores_zero() {
    let idx = example_index();
    let hits = query(&idx, "giraffe, savanna", None, 5);
    assert_eq!(hits.len(), 3);
    assert!(hits.iter().all(|h| h.score == 0.0));
    let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
    assert_eq!(ids, vec!["a.png", "b.png", "c.png"]);
}

#[test]
fn out_of_vocabulary_after_exclusion_can_be_empty() {
    let idx = build(&[Document::new("only.png", "cat")]).unwrap();
    assert!(query(&idx, "giraffe", Some("only.png"), 5).is_empty());
}

#[test]
fn result_length_is_min_of_k_and_available() {
    let idx = example_index();
    assert_eq!(query(&idx, "cat", None, 2).len(), 2);
    assert_eq!(query(&idx, "cat", None, 10).len(), 3);
    assert_eq!(query(&idx, "cat", Some("b.png"), 10).len(), 2);
    assert_eq!(query(&idx, "cat", None, 0).len(), 0);
}

#[test]
fn query_vector_is_unit_length() {
    let idx = example_index();
    let q = idx.space.project("cat, indoor, unknown");
    assert!((q.norm() - 1.0).abs() < 1e-6);
    assert!(idx.space.project("unknown").is_zero());
}

#[test]
fn empty_query_matches_empty_caption() {
    let idx = build(&[Document::new("cat.png", "cat"), Document::new("blank.png", "")]).unwrap();
    let hits = query(&idx, "", None, 5);
    assert_eq!(hits[0].id, "blank.png");
    assert!((hits[0].score - 1.0).abs() < 1e-9);
    assert_eq!(hits[1].score, 0.0);
}

#[test]
fn engine_swaps_whole_index() {
    let engine = QueryEngine::new();
    assert!(matches!(engine.query_top_k("cat", None), Err(IndexError::IndexNotLoaded)));

    engine.install(example_index());
    let before = engine.snapshot().unwrap();
    engine.install(build(&[Document::new("z.png", "zebra")]).unwrap());

    // a snapshot taken before the swap still sees the old index in full
    assert_eq!(before.num_docs(), 3);
    assert_eq!(engine.query_top_k("zebra", None).unwrap()[0].id, "z.png");
}

#[test]
fn concurrent_queries_share_the_index() {
    let engine = Arc::new(QueryEngine::from_index(example_index()));
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let engine = Arc::clone(&engine);
            std::thread::spawn(move || engine.query_top_k("cat, outdoor", None).unwrap())
        })
        .collect();
    for h in handles {
        assert_eq!(h.join().unwrap()[0].id, "a.png");
    }
}
