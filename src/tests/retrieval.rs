//! BuildAndRetrieve scenarios with a scripted embedder.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::semantic::{
    ContentItem, Embedder, EmbeddingIndex, HashEmbedder, IndexError, RetrievalError,
    RetrievalService,
};

/// Returns fixed vectors for known texts and `None` for everything else.
struct ScriptedEmbedder {
    dims: usize,
    vectors: HashMap<String, Vec<f32>>,
    calls: AtomicUsize,
}

impl ScriptedEmbedder {
    fn new(dims: usize, entries: &[(&str, Vec<f32>)]) -> Self {
        Self {
            dims,
            vectors: entries
                .iter()
                .map(|(text, v)| (text.to_string(), v.clone()))
                .collect(),
            calls: AtomicUsize::new(0),
        }
    }
}

impl Embedder for ScriptedEmbedder {
    fn dimensions(&self) -> usize {
        self.dims
    }

    fn embed(&self, text: &str) -> Option<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        self.vectors.get(text).cloned()
    }
}

/// Embeds by text length and records every batch it receives.
struct BatchRecorder {
    batches: Mutex<Vec<Vec<String>>>,
}

impl Embedder for BatchRecorder {
    fn dimensions(&self) -> usize {
        2
    }

    fn embed(&self, text: &str) -> Option<Vec<f32>> {
        (!text.trim().is_empty()).then(|| vec![1.0, text.len() as f32])
    }

    fn embed_batch(&self, texts: &[&str]) -> Vec<Option<Vec<f32>>> {
        self.batches
            .lock()
            .unwrap()
            .push(texts.iter().map(|t| t.to_string()).collect());
        texts.iter().map(|t| self.embed(t)).collect()
    }
}

fn service_with(embedder: Arc<dyn Embedder>, capacity: usize) -> RetrievalService {
    let index = EmbeddingIndex::new(embedder.dimensions(), capacity).unwrap();
    RetrievalService::new(embedder, index, 4).unwrap()
}

#[test]
fn test_empty_text_item_is_skipped() {
    let embedder = Arc::new(HashEmbedder::new(64));
    let svc = service_with(embedder, 10);

    let items = vec![
        ContentItem::new("v1", "Homemade pasta from scratch"),
        ContentItem::new("v2", "   "),
        ContentItem::new("v3", "Pasta sauce in ten minutes"),
    ];

    let result = svc.build_and_retrieve(&items, "Pasta Kitchen", 10, 10).unwrap();

    assert_eq!(result.stored, 2);
    assert_eq!(result.neighbors.len(), 2);
    assert!(result.neighbors.iter().all(|n| n.id != "v2"));
    assert_eq!(svc.indexed_count().unwrap(), 2);
}

#[test]
fn test_neighbors_ranked_from_anchor() {
    let embedder = Arc::new(ScriptedEmbedder::new(
        3,
        &[
            ("alpha", vec![1.0, 0.0, 0.0]),
            ("beta", vec![0.0, 1.0, 0.0]),
            ("gamma", vec![0.9, 0.1, 0.0]),
            ("anchor", vec![1.0, 0.0, 0.0]),
        ],
    ));
    let svc = service_with(embedder, 10);

    let items = vec![
        ContentItem::new("a", "alpha"),
        ContentItem::new("b", "beta"),
        ContentItem::new("g", "gamma"),
    ];

    let result = svc.build_and_retrieve(&items, "  anchor  ", 10, 2).unwrap();
    let ids: Vec<&str> = result.neighbors.iter().map(|n| n.id.as_str()).collect();

    assert_eq!(result.stored, 3);
    assert_eq!(ids, vec!["a", "g"]);
    assert!(result.neighbors[0].distance < 1e-5);
}

#[test]
fn test_truncates_to_max_items() {
    let embedder = Arc::new(ScriptedEmbedder::new(
        2,
        &[
            ("one", vec![1.0, 0.0]),
            ("two", vec![0.0, 1.0]),
            ("three", vec![1.0, 1.0]),
        ],
    ));
    let svc = service_with(embedder.clone(), 10);

    let items = vec![
        ContentItem::new("1", "one"),
        ContentItem::new("2", "two"),
        ContentItem::new("3", "three"),
    ];

    let result = svc.build_and_retrieve(&items, "", 2, 5).unwrap();

    assert_eq!(result.stored, 2);
    assert!(result.neighbors.is_empty());
    // the third item is never embedded, and a blank anchor is not either
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_batch_is_embedded_in_one_call() {
    let embedder = Arc::new(BatchRecorder {
        batches: Mutex::new(Vec::new()),
    });
    let svc = service_with(embedder.clone(), 10);

    let items = vec![
        ContentItem::new("a", "x"),
        ContentItem::new("b", ""),
        ContentItem::new("c", "xxxx"),
        ContentItem::new("d", "xx"),
        ContentItem::new("e", "dropped by max_items"),
    ];

    let result = svc.build_and_retrieve(&items, "yyyy", 4, 1).unwrap();
    assert_eq!(result.stored, 3);

    // the anchor goes through `embed`, the items through a single batch
    let batches = embedder.batches.lock().unwrap();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0], vec!["x", "", "xxxx", "xx"]);

    // vectors stayed attached to their own ids
    let ids: Vec<&str> = result.neighbors.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, vec!["c"]);
    assert!(result.neighbors[0].distance < 1e-5);
}

#[test]
fn test_unembeddable_anchor_yields_no_neighbors() {
    let embedder = Arc::new(ScriptedEmbedder::new(2, &[("known", vec![1.0, 0.0])]));
    let svc = service_with(embedder, 10);

    let items = vec![ContentItem::new("k", "known")];
    let result = svc.build_and_retrieve(&items, "unknown anchor", 10, 5).unwrap();

    assert_eq!(result.stored, 1);
    assert!(result.neighbors.is_empty());
}

#[test]
fn test_nothing_embeddable_is_not_an_error() {
    let embedder = Arc::new(ScriptedEmbedder::new(2, &[("anchor", vec![1.0, 0.0])]));
    let svc = service_with(embedder, 10);

    let items = vec![ContentItem::new("x", ""), ContentItem::new("y", "missing")];
    let result = svc.build_and_retrieve(&items, "anchor", 10, 5).unwrap();

    assert_eq!(result.stored, 0);
    assert!(result.neighbors.is_empty());
}

#[test]
fn test_capacity_exceeded_surfaces() {
    let embedder = Arc::new(HashEmbedder::new(16));
    let svc = service_with(embedder, 2);

    let items = vec![
        ContentItem::new("a", "first video"),
        ContentItem::new("b", "second video"),
        ContentItem::new("c", "third video"),
    ];

    let err = svc.build_and_retrieve(&items, "video", 10, 5).unwrap_err();
    assert!(matches!(
        err,
        RetrievalError::Index(IndexError::CapacityExceeded { capacity: 2 })
    ));
    assert_eq!(svc.indexed_count().unwrap(), 2);
}

#[test]
fn test_index_persists_across_calls() {
    let embedder = Arc::new(HashEmbedder::new(32));
    let svc = service_with(embedder, 10);

    let first = vec![ContentItem::new("old", "retro console repair")];
    let second = vec![ContentItem::new("new", "modern console teardown")];

    assert_eq!(svc.build_and_retrieve(&first, "", 10, 5).unwrap().stored, 1);
    let result = svc.build_and_retrieve(&second, "console", 10, 5).unwrap();

    assert_eq!(result.stored, 1);
    assert_eq!(svc.indexed_count().unwrap(), 2);
    let mut ids: Vec<&str> = result.neighbors.iter().map(|n| n.id.as_str()).collect();
    ids.sort();
    assert_eq!(ids, vec!["new", "old"]);
}

#[test]
fn test_concurrent_queries_share_the_index() {
    let embedder = Arc::new(HashEmbedder::new(32));
    let svc = Arc::new(service_with(embedder, 50));

    let items: Vec<ContentItem> = (0..20)
        .map(|i| ContentItem::new(format!("v{i}"), format!("video number {i} about topic {}", i % 3)))
        .collect();
    svc.build_and_retrieve(&items, "", 20, 0).unwrap();

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let svc = svc.clone();
            std::thread::spawn(move || svc.neighbors_of(&format!("topic {t}"), 5).unwrap())
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap().len(), 5);
    }
}
