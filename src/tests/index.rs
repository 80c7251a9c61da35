//! Behavioural tests for the embedding index: ordering, dimension and
//! capacity contracts, and agreement between the scan and graph paths.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::semantic::{EmbeddingIndex, IndexError, IndexParams};

const EPS: f32 = 1e-5;

fn random_vectors(n: usize, dims: usize, seed: u64) -> Vec<Vec<f32>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| (0..dims).map(|_| rng.random_range(-1.0f32..1.0)).collect())
        .collect()
}

fn graph_params() -> IndexParams {
    IndexParams {
        m: 12,
        ef_construction: 64,
        ef_search: 64,
        exhaustive_threshold: 0,
        ..Default::default()
    }
}

fn ids(results: &[crate::semantic::NeighborResult]) -> Vec<&str> {
    results.iter().map(|r| r.id.as_str()).collect()
}

#[test]
fn test_basis_vector_scenario() {
    let mut index = EmbeddingIndex::new(4, 10).unwrap();
    index.insert(&[1.0, 0.0, 0.0, 0.0], "a").unwrap();
    index.insert(&[0.0, 1.0, 0.0, 0.0], "b").unwrap();
    index.insert(&[0.0, 0.0, 1.0, 0.0], "c").unwrap();

    let results = index.query(&[1.0, 0.0, 0.0, 0.0], 2).unwrap();

    assert_eq!(ids(&results), vec!["a", "b"]);
    assert!(results[0].distance.abs() < EPS);
    assert!((results[1].distance - 1.0).abs() < EPS);
}

#[test]
fn test_ties_follow_insertion_order_across_runs() {
    let build = || {
        let mut index = EmbeddingIndex::new(3, 10).unwrap();
        index.insert(&[0.0, 0.0, 1.0], "first").unwrap();
        index.insert(&[0.0, 1.0, 0.0], "second").unwrap();
        index.insert(&[0.0, 0.0, -1.0], "third").unwrap();
        index.insert(&[0.0, -1.0, 0.0], "fourth").unwrap();
        index
    };

    for _ in 0..3 {
        let results = build().query(&[1.0, 0.0, 0.0], 4).unwrap();
        assert_eq!(ids(&results), vec!["first", "second", "third", "fourth"]);
    }
}

#[test]
fn test_ties_on_graph_path() {
    let mut index = EmbeddingIndex::with_params(2, 10, graph_params()).unwrap();
    index.insert(&[0.0, 1.0], "far").unwrap();
    index.insert(&[1.0, 1.0], "x").unwrap();
    index.insert(&[1.0, 1.0], "y").unwrap();
    index.insert(&[1.0, 1.0], "z").unwrap();

    let results = index.query(&[1.0, 1.0], 3).unwrap();
    assert_eq!(ids(&results), vec!["x", "y", "z"]);
}

#[test]
fn test_dimension_invariant_at_every_fill_level() {
    for dims in 1..=6 {
        let capacity = 3;
        let mut index = EmbeddingIndex::new(dims, capacity).unwrap();
        let wrong_short = vec![1.0; dims - 1];
        let wrong_long = vec![1.0; dims + 1];

        for fill in 0..=capacity {
            for wrong in [&wrong_short, &wrong_long] {
                assert!(matches!(
                    index.insert(wrong, "bad"),
                    Err(IndexError::DimensionMismatch { .. })
                ));
                assert!(matches!(
                    index.query(wrong, 1),
                    Err(IndexError::DimensionMismatch { .. })
                ));
            }
            assert_eq!(index.len(), fill);

            if fill < capacity {
                let mut v = vec![0.0; dims];
                v[fill % dims] = 1.0;
                index.insert(&v, format!("v{fill}")).unwrap();
            }
        }
    }
}

#[test]
fn test_capacity_fails_exactly_on_overflow() {
    let capacity = 10;
    let vectors = random_vectors(capacity + 1, 4, 11);
    let mut index = EmbeddingIndex::new(4, capacity).unwrap();

    for (i, v) in vectors.iter().take(capacity).enumerate() {
        index.insert(v, format!("id-{i}")).unwrap();
    }
    assert_eq!(index.len(), capacity);

    let err = index.insert(&vectors[capacity], "overflow").unwrap_err();
    assert!(matches!(err, IndexError::CapacityExceeded { capacity: 10 }));
    assert_eq!(index.len(), capacity);

    let results = index.query(&vectors[capacity], capacity + 5).unwrap();
    assert_eq!(results.len(), capacity);
    assert!(results.iter().all(|r| r.id != "overflow"));
}

#[test]
fn test_query_on_empty_index() {
    let index = EmbeddingIndex::new(8, 4).unwrap();
    for k in 0..5 {
        assert!(index.query(&[0.5; 8], k).unwrap().is_empty());
    }
}

#[test]
fn test_k_larger_than_len_returns_all_sorted() {
    let vectors = random_vectors(7, 5, 3);
    let mut index = EmbeddingIndex::new(5, 20).unwrap();
    for (i, v) in vectors.iter().enumerate() {
        index.insert(v, format!("id-{i}")).unwrap();
    }

    let results = index.query(&vectors[0], 50).unwrap();
    assert_eq!(results.len(), 7);
    assert!(results.windows(2).all(|w| w[0].distance <= w[1].distance));
    assert!(results.iter().all(|r| (0.0..=2.0).contains(&r.distance)));
}

#[test]
fn test_k_larger_than_len_on_sparse_graph() {
    // tiny m and ef leave the pruned graph poorly connected
    let params = IndexParams {
        m: 2,
        ef_construction: 4,
        ef_search: 1,
        exhaustive_threshold: 0,
        ..Default::default()
    };

    for (n, dims, seed) in [(300, 2, 16), (500, 3, 19)] {
        let vectors = random_vectors(n, dims, seed);
        let mut index = EmbeddingIndex::with_params(dims, n, params).unwrap();
        for (i, v) in vectors.iter().enumerate() {
            index.insert(v, format!("id-{i}")).unwrap();
        }

        for k in [n, n + 1] {
            let results = index.query(&vectors[0], k).unwrap();
            assert_eq!(results.len(), n, "n={n} k={k}");
            assert!(results.windows(2).all(|w| w[0].distance <= w[1].distance));
            assert_eq!(results[0].id, "id-0");
        }
    }
}

#[test]
fn test_round_trip_identity() {
    let vectors = random_vectors(60, 8, 42);
    let mut index = EmbeddingIndex::new(8, 100).unwrap();
    for (i, v) in vectors.iter().enumerate() {
        index.insert(v, format!("id-{i}")).unwrap();
    }

    for (i, v) in vectors.iter().enumerate() {
        let results = index.query(v, 1).unwrap();
        assert_eq!(results[0].id, format!("id-{i}"));
        assert!(results[0].distance < EPS);
    }
}

#[test]
fn test_graph_path_round_trip_recall() {
    let n = 400;
    let vectors = random_vectors(n, 16, 7);
    let mut index = EmbeddingIndex::with_params(16, n, graph_params()).unwrap();
    for (i, v) in vectors.iter().enumerate() {
        index.insert(v, format!("id-{i}")).unwrap();
    }

    let hits = vectors
        .iter()
        .enumerate()
        .filter(|(i, v)| {
            let results = index.query(v, 1).unwrap();
            results[0].id == format!("id-{i}") && results[0].distance < EPS
        })
        .count();

    assert!(hits as f32 / n as f32 >= 0.95, "recall too low: {hits}/{n}");
}

#[test]
fn test_graph_and_scan_agree_on_top_hit() {
    let vectors = random_vectors(300, 12, 99);
    let queries = random_vectors(20, 12, 100);

    let mut exact = EmbeddingIndex::new(12, 300).unwrap();
    let mut graph = EmbeddingIndex::with_params(12, 300, graph_params()).unwrap();
    for (i, v) in vectors.iter().enumerate() {
        exact.insert(v, format!("id-{i}")).unwrap();
        graph.insert(v, format!("id-{i}")).unwrap();
    }
    graph.set_ef_search(200);

    let agree = queries
        .iter()
        .filter(|q| exact.query(q, 1).unwrap()[0].id == graph.query(q, 1).unwrap()[0].id)
        .count();

    assert!(agree >= 18, "graph search disagreed with scan too often: {agree}/20");
}
