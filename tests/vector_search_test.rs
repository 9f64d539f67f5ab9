use semdex::vector::{DistanceMetric, Document, VectorError, VectorIndex};
use std::sync::atomic::{AtomicBool, Ordering};

fn doc(id: impl Into<String>, embedding: Vec<f32>) -> Document {
    let id = id.into();
    Document::new(id.clone(), format!("title {}", id), format!("/path/{}", id), embedding)
}

/// Small deterministic generator so rankings can be checked on many vectors
fn pseudo_random_vectors(count: usize, dimension: usize, mut seed: u64) -> Vec<Vec<f32>> {
    (0..count)
        .map(|_| {
            (0..dimension)
                .map(|_| {
                    seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                    // Coarse values so exact ties happen
                    ((seed >> 33) % 5) as f32
                })
                .collect()
        })
        .collect()
}

#[test]
fn test_vector_search_integration() {
    let index = VectorIndex::new(DistanceMetric::Cosine);

    index
        .build(vec![
            doc("Alice", vec![1.0, 0.0, 0.0]),
            doc("Bob", vec![0.0, 1.0, 0.0]),
            doc("Charlie", vec![0.0, 0.0, 1.0]),
        ])
        .unwrap();

    // Query vector is closest to Alice [1, 0, 0]
    let query = vec![0.9, 0.1, 0.0];
    let results = index.search(&query, 1).unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].document.id, "Alice");
    assert_eq!(results[0].document.url, "/path/Alice");
    assert!(results[0].distance < 0.1); // Distance should be small
}

#[test]
fn test_search_returns_only_latest_build() {
    let index = VectorIndex::new(DistanceMetric::L2);
    index
        .build(vec![doc("old-1", vec![0.0, 0.0]), doc("old-2", vec![1.0, 1.0])])
        .unwrap();
    index
        .build(vec![doc("new-1", vec![5.0, 5.0]), doc("new-2", vec![9.0, 9.0])])
        .unwrap();

    let results = index.search(&[0.0, 0.0], 10).unwrap();
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|n| n.document.id.starts_with("new-")));
    assert_eq!(index.generation(), 2);
}

#[test]
fn test_ranking_is_sorted_stable_and_clamped() {
    let vectors = pseudo_random_vectors(200, 4, 7);
    let documents: Vec<Document> = vectors
        .iter()
        .enumerate()
        .map(|(i, v)| doc(i.to_string(), v.clone()))
        .collect();
    let index = VectorIndex::new(DistanceMetric::L2);
    index.build(documents).unwrap();

    for (k, query) in [(0usize, [0.0, 0.0, 0.0, 0.0]), (10, [2.0, 2.0, 2.0, 2.0]), (500, [4.0, 0.0, 4.0, 0.0])] {
        let results = index.search(&query, k).unwrap();
        assert_eq!(results.len(), k.min(200));

        for pair in results.windows(2) {
            assert!(pair[0].distance <= pair[1].distance);
            if pair[0].distance == pair[1].distance {
                let a: usize = pair[0].document.id.parse().unwrap();
                let b: usize = pair[1].document.id.parse().unwrap();
                assert!(a < b, "ties must keep insertion order");
            }
        }

        // Same query, same generation, same answer
        let again = index.search(&query, k).unwrap();
        let ids: Vec<&str> = results.iter().map(|n| n.document.id.as_str()).collect();
        let ids_again: Vec<&str> = again.iter().map(|n| n.document.id.as_str()).collect();
        assert_eq!(ids, ids_again);
    }
}

#[test]
fn test_top_k_matches_full_ranking() {
    let vectors = pseudo_random_vectors(50, 3, 42);
    let index = VectorIndex::new(DistanceMetric::L2);
    index
        .build(vectors.iter().enumerate().map(|(i, v)| doc(i.to_string(), v.clone())).collect())
        .unwrap();

    let query = [1.0, 3.0, 2.0];
    let all = index.search(&query, 50).unwrap();
    let top = index.search(&query, 5).unwrap();
    let all_ids: Vec<&str> = all.iter().take(5).map(|n| n.document.id.as_str()).collect();
    let top_ids: Vec<&str> = top.iter().map(|n| n.document.id.as_str()).collect();
    assert_eq!(all_ids, top_ids);
}

#[test]
fn test_dimension_mismatch_leaves_state_unchanged() {
    let index = VectorIndex::new(DistanceMetric::L2);
    index.build(vec![doc("a", vec![0.0, 1.0]), doc("b", vec![1.0, 0.0])]).unwrap();

    let err = index
        .build(vec![doc("c", vec![0.0, 1.0]), doc("d", vec![1.0, 0.0, 0.0])])
        .unwrap_err();
    assert_eq!(err, VectorError::DimensionMismatch { expected: 2, got: 3 });

    let err = index.search(&[0.0, 1.0, 0.0], 1).unwrap_err();
    assert_eq!(err, VectorError::DimensionMismatch { expected: 2, got: 3 });

    assert_eq!(index.generation(), 1);
    assert_eq!(index.len(), 2);
    assert!(index.contains("a") && index.contains("b"));
    assert!(!index.contains("c"));
}

#[test]
fn test_readers_never_see_partial_builds() {
    const BATCH: usize = 64;
    let index = VectorIndex::new(DistanceMetric::L2);
    let done = AtomicBool::new(false);

    let batch = |prefix: &str| -> Vec<Document> {
        (0..BATCH).map(|i| doc(format!("{}-{}", prefix, i), vec![i as f32, 0.0])).collect()
    };

    std::thread::scope(|scope| {
        scope.spawn(|| {
            for round in 0..200 {
                let prefix = if round % 2 == 0 { "even" } else { "odd" };
                index.build(batch(prefix)).unwrap();
            }
            done.store(true, Ordering::SeqCst);
        });

        for _ in 0..3 {
            scope.spawn(|| {
                while !done.load(Ordering::SeqCst) {
                    let snapshot = index.snapshot();
                    let documents = snapshot.documents();
                    if snapshot.generation() == 0 {
                        assert!(documents.is_empty());
                        continue;
                    }
                    assert_eq!(documents.len(), BATCH);
                    let prefix = documents[0].id.split('-').next().unwrap().to_string();
                    assert!(documents.iter().all(|d| d.id.starts_with(&prefix)));

                    let hits = snapshot.search(&[0.0, 0.0], BATCH).unwrap();
                    assert_eq!(hits.len(), BATCH);
                    assert!(hits.iter().all(|n| n.document.id.starts_with(&prefix)));
                }
            });
        }
    });

    assert_eq!(index.generation(), 200);
}
