//! In-memory embedding index with cosine nearest-neighbor queries.
//!
//! Entries get a sequential internal label on insertion; callers only ever
//! see the external identifier they supplied. Small collections are scanned
//! exhaustively, larger ones go through the HNSW graph.

use serde::{Deserialize, Serialize};

use crate::semantic::hnsw::{normalize, Candidate, HnswGraph};

/// Tuning knobs for the ANN graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexParams {
    /// Graph connectivity (links per node on upper layers, doubled on layer 0)
    pub m: usize,
    /// Candidate list size while building
    pub ef_construction: usize,
    /// Candidate list size while querying
    pub ef_search: usize,
    /// Below this many entries queries scan every vector
    pub exhaustive_threshold: usize,
    /// Seed for the level generator, keeps graph layout reproducible
    pub seed: u64,
}

impl Default for IndexParams {
    fn default() -> Self {
        Self {
            m: 32,
            ef_construction: 100,
            ef_search: 64,
            exhaustive_threshold: 1000,
            seed: 0x5eed,
        }
    }
}

/// A query hit: external identifier and cosine distance (0 = same direction).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeighborResult {
    pub id: String,
    pub distance: f32,
}

/// Approximate nearest-neighbor index over fixed-dimension vectors.
///
/// Capacity is fixed at construction; there is no resize and no deletion.
pub struct EmbeddingIndex {
    dimensions: usize,
    capacity: usize,
    params: IndexParams,
    /// Internal label -> external identifier
    ids: Vec<String>,
    graph: HnswGraph,
}

impl EmbeddingIndex {
    /// Create an empty index with default graph parameters.
    pub fn new(dimensions: usize, capacity: usize) -> Result<Self, IndexError> {
        Self::with_params(dimensions, capacity, IndexParams::default())
    }

    pub fn with_params(
        dimensions: usize,
        capacity: usize,
        params: IndexParams,
    ) -> Result<Self, IndexError> {
        if dimensions == 0 {
            return Err(IndexError::Configuration(
                "dimension must be greater than 0".to_string(),
            ));
        }
        if capacity == 0 {
            return Err(IndexError::Configuration(
                "capacity must be greater than 0".to_string(),
            ));
        }
        if params.m < 2 {
            return Err(IndexError::Configuration(format!(
                "m must be at least 2, got {}",
                params.m
            )));
        }
        if params.ef_construction == 0 || params.ef_search == 0 {
            return Err(IndexError::Configuration(
                "ef_construction and ef_search must be greater than 0".to_string(),
            ));
        }

        log::debug!(
            "index init dimensions={} capacity={} m={} ef_construction={} ef_search={}",
            dimensions,
            capacity,
            params.m,
            params.ef_construction,
            params.ef_search
        );

        Ok(Self {
            dimensions,
            capacity,
            params,
            ids: Vec::new(),
            graph: HnswGraph::new(
                params.m,
                params.ef_construction,
                params.seed,
                capacity.min(params.exhaustive_threshold.max(1024)),
            ),
        })
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn params(&self) -> IndexParams {
        self.params
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Adjust the query-time candidate list size.
    pub fn set_ef_search(&mut self, ef_search: usize) {
        self.params.ef_search = ef_search.max(1);
    }

    /// Insert a vector under an external identifier.
    ///
    /// Fails without touching the index when the vector is malformed or the
    /// index is already full.
    pub fn insert(&mut self, vector: &[f32], external_id: impl Into<String>) -> Result<(), IndexError> {
        self.check_vector(vector)?;
        if self.ids.len() >= self.capacity {
            return Err(IndexError::CapacityExceeded {
                capacity: self.capacity,
            });
        }

        let label = self.graph.insert(normalize(vector));
        debug_assert_eq!(label, self.ids.len());
        debug_assert_eq!(label + 1, self.graph.len());
        self.ids.push(external_id.into());

        Ok(())
    }

    /// Up to `k` nearest entries, nearest first. Equal distances keep
    /// insertion order.
    ///
    /// A `k` that covers the whole index always scans every entry; the graph
    /// is not guaranteed to be connected.
    pub fn query(&self, vector: &[f32], k: usize) -> Result<Vec<NeighborResult>, IndexError> {
        self.check_vector(vector)?;
        if self.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let query = normalize(vector);
        let found = if self.len() < self.params.exhaustive_threshold || k >= self.len() {
            self.graph.scan(&query, k)
        } else {
            self.graph.search(&query, k, self.params.ef_search)
        };

        Ok(self.resolve(found))
    }

    fn resolve(&self, found: Vec<Candidate>) -> Vec<NeighborResult> {
        found
            .into_iter()
            .map(|c| NeighborResult {
                id: self.ids[c.label].clone(),
                distance: c.distance,
            })
            .collect()
    }

    fn check_vector(&self, vector: &[f32]) -> Result<(), IndexError> {
        if vector.len() != self.dimensions {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimensions,
                got: vector.len(),
            });
        }
        if let Some(position) = vector.iter().position(|x| !x.is_finite()) {
            return Err(IndexError::NonFiniteComponent { position });
        }
        Ok(())
    }
}

/// Errors that can occur during index operations.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("Invalid index configuration: {0}")]
    Configuration(String),

    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Index is full (capacity {capacity})")]
    CapacityExceeded { capacity: usize },

    #[error("Vector component {position} is not a finite number")]
    NonFiniteComponent { position: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_index() {
        let index = EmbeddingIndex::new(384, 100).unwrap();
        assert_eq!(index.dimensions(), 384);
        assert_eq!(index.capacity(), 100);
        assert!(index.is_empty());
        assert_eq!(index.len(), 0);
    }

    #[test]
    fn test_invalid_configuration() {
        assert!(matches!(
            EmbeddingIndex::new(0, 10),
            Err(IndexError::Configuration(_))
        ));
        assert!(matches!(
            EmbeddingIndex::new(3, 0),
            Err(IndexError::Configuration(_))
        ));

        let params = IndexParams {
            m: 1,
            ..Default::default()
        };
        assert!(matches!(
            EmbeddingIndex::with_params(3, 10, params),
            Err(IndexError::Configuration(_))
        ));

        let params = IndexParams {
            ef_search: 0,
            ..Default::default()
        };
        assert!(matches!(
            EmbeddingIndex::with_params(3, 10, params),
            Err(IndexError::Configuration(_))
        ));
    }

    #[test]
    fn test_insert_dimension_mismatch() {
        let mut index = EmbeddingIndex::new(3, 10).unwrap();
        let result = index.insert(&[1.0, 0.0, 0.0, 0.0], "a");
        assert!(matches!(
            result,
            Err(IndexError::DimensionMismatch {
                expected: 3,
                got: 4
            })
        ));
        assert!(index.is_empty());
    }

    #[test]
    fn test_query_dimension_mismatch() {
        let index = EmbeddingIndex::new(3, 10).unwrap();
        let result = index.query(&[1.0, 0.0], 1);
        assert!(matches!(result, Err(IndexError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_non_finite_vectors_rejected() {
        let mut index = EmbeddingIndex::new(3, 10).unwrap();
        index.insert(&[1.0, 0.0, 0.0], "a").unwrap();

        for bad in [
            [f32::NAN, 0.0, 0.0],
            [0.0, f32::INFINITY, 0.0],
            [0.0, 0.0, f32::NEG_INFINITY],
        ] {
            assert!(matches!(
                index.insert(&bad, "bad"),
                Err(IndexError::NonFiniteComponent { .. })
            ));
            assert!(matches!(
                index.query(&bad, 1),
                Err(IndexError::NonFiniteComponent { .. })
            ));
        }
        assert!(matches!(
            index.query(&[0.0, f32::NAN, 0.0], 1),
            Err(IndexError::NonFiniteComponent { position: 1 })
        ));

        assert_eq!(index.len(), 1);
        let results = index.query(&[1.0, 0.0, 0.0], 5).unwrap();
        assert!(results.iter().all(|r| r.distance.is_finite()));
    }

    #[test]
    fn test_query_k_zero() {
        let mut index = EmbeddingIndex::new(2, 10).unwrap();
        index.insert(&[1.0, 0.0], "a").unwrap();
        assert!(index.query(&[1.0, 0.0], 0).unwrap().is_empty());
    }

    #[test]
    fn test_magnitude_does_not_matter() {
        let mut index = EmbeddingIndex::new(2, 10).unwrap();
        index.insert(&[10.0, 0.0], "long").unwrap();
        index.insert(&[0.0, 0.5], "short").unwrap();

        let results = index.query(&[0.001, 0.0], 2).unwrap();
        assert_eq!(results[0].id, "long");
        assert!(results[0].distance < 1e-5);
        assert!((results[1].distance - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_duplicate_external_ids_are_kept() {
        let mut index = EmbeddingIndex::new(2, 10).unwrap();
        index.insert(&[1.0, 0.0], "same").unwrap();
        index.insert(&[0.0, 1.0], "same").unwrap();

        assert_eq!(index.len(), 2);
        let results = index.query(&[1.0, 1.0], 5).unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.id == "same"));
    }

    #[test]
    fn test_set_ef_search_floor() {
        let mut index = EmbeddingIndex::new(2, 10).unwrap();
        index.set_ef_search(0);
        assert_eq!(index.params().ef_search, 1);
    }
}
