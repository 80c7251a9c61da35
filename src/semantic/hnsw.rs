//! Hierarchical navigable small world graph.
//!
//! Nodes are addressed by their insertion label, which doubles as the
//! position in `vectors`/`nodes`. Vectors are stored L2-normalised so cosine
//! distance reduces to `1 - dot`.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashSet};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Hard cap on node levels; with m >= 2 anything above this is noise.
const MAX_LEVEL: usize = 16;

/// A scored node. Ordered by distance, then by insertion label, so that
/// equal distances always resolve to the earlier-inserted node.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Candidate {
    pub distance: f32,
    pub label: usize,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| self.label.cmp(&other.label))
    }
}

struct Node {
    /// Neighbor labels per layer, `links[0]` being the base layer.
    links: Vec<Vec<usize>>,
}

pub(crate) struct HnswGraph {
    vectors: Vec<Vec<f32>>,
    nodes: Vec<Node>,
    entry_point: Option<usize>,
    max_level: usize,
    m: usize,
    m_max0: usize,
    ef_construction: usize,
    level_mult: f64,
    rng: StdRng,
}

impl HnswGraph {
    pub fn new(m: usize, ef_construction: usize, seed: u64, capacity: usize) -> Self {
        Self {
            vectors: Vec::with_capacity(capacity),
            nodes: Vec::with_capacity(capacity),
            entry_point: None,
            max_level: 0,
            m,
            m_max0: m * 2,
            ef_construction,
            level_mult: 1.0 / (m as f64).ln(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    /// Cosine distance between an (already normalised) query and a stored node.
    pub fn distance_to(&self, query: &[f32], label: usize) -> f32 {
        cosine_distance(query, &self.vectors[label])
    }

    /// Insert a normalised vector. Its label is the current length.
    pub fn insert(&mut self, vector: Vec<f32>) -> usize {
        let label = self.vectors.len();
        let level = self.random_level();

        self.vectors.push(vector);
        self.nodes.push(Node {
            links: vec![Vec::new(); level + 1],
        });

        let Some(entry_point) = self.entry_point else {
            self.entry_point = Some(label);
            self.max_level = level;
            return label;
        };

        let query = self.vectors[label].clone();
        let mut entry_points = vec![entry_point];

        // greedy descent through the layers above the new node's level
        for layer in (level + 1..=self.max_level).rev() {
            if let Some(nearest) = self.search_layer(&query, &entry_points, 1, layer).first() {
                entry_points = vec![nearest.label];
            }
        }

        for layer in (0..=level.min(self.max_level)).rev() {
            let candidates = self.search_layer(&query, &entry_points, self.ef_construction, layer);
            let neighbors = self.select_neighbors(&candidates, self.m);
            self.nodes[label].links[layer] = neighbors.clone();

            let max_conn = if layer == 0 { self.m_max0 } else { self.m };
            for neighbor in neighbors {
                self.nodes[neighbor].links[layer].push(label);
                if self.nodes[neighbor].links[layer].len() > max_conn {
                    self.prune(neighbor, layer, max_conn);
                }
            }

            if !candidates.is_empty() {
                entry_points = candidates.iter().map(|c| c.label).collect();
            }
        }

        if level > self.max_level {
            self.entry_point = Some(label);
            self.max_level = level;
        }

        label
    }

    /// Approximate k nearest neighbors, exploring `ef` candidates on the base layer.
    pub fn search(&self, query: &[f32], k: usize, ef: usize) -> Vec<Candidate> {
        let Some(entry_point) = self.entry_point else {
            return Vec::new();
        };

        let mut entry_points = vec![entry_point];
        for layer in (1..=self.max_level).rev() {
            if let Some(nearest) = self.search_layer(query, &entry_points, 1, layer).first() {
                entry_points = vec![nearest.label];
            }
        }

        let mut found = self.search_layer(query, &entry_points, ef.max(k), 0);
        found.truncate(k);
        found
    }

    /// Exact scan over every stored vector, sorted ascending.
    pub fn scan(&self, query: &[f32], k: usize) -> Vec<Candidate> {
        let mut all: Vec<Candidate> = (0..self.vectors.len())
            .map(|label| Candidate {
                distance: self.distance_to(query, label),
                label,
            })
            .collect();
        all.sort();
        all.truncate(k);
        all
    }

    /// Beam search restricted to one layer. Returns candidates sorted ascending.
    fn search_layer(
        &self,
        query: &[f32],
        entry_points: &[usize],
        ef: usize,
        layer: usize,
    ) -> Vec<Candidate> {
        let mut visited: HashSet<usize> = HashSet::new();
        let mut frontier: BinaryHeap<Reverse<Candidate>> = BinaryHeap::new();
        let mut results: BinaryHeap<Candidate> = BinaryHeap::new();

        for &label in entry_points {
            if visited.insert(label) {
                let candidate = Candidate {
                    distance: self.distance_to(query, label),
                    label,
                };
                frontier.push(Reverse(candidate));
                results.push(candidate);
            }
        }
        while results.len() > ef {
            results.pop();
        }

        while let Some(Reverse(current)) = frontier.pop() {
            if let Some(worst) = results.peek() {
                if results.len() >= ef && current > *worst {
                    break;
                }
            }

            let Some(links) = self.nodes[current.label].links.get(layer) else {
                continue;
            };

            for &neighbor in links {
                if !visited.insert(neighbor) {
                    continue;
                }
                let candidate = Candidate {
                    distance: self.distance_to(query, neighbor),
                    label: neighbor,
                };
                let admit = match results.peek() {
                    Some(worst) => results.len() < ef || candidate < *worst,
                    None => true,
                };
                if admit {
                    frontier.push(Reverse(candidate));
                    results.push(candidate);
                    if results.len() > ef {
                        results.pop();
                    }
                }
            }
        }

        results.into_sorted_vec()
    }

    /// Neighbor selection heuristic: keep a candidate only if it is closer to
    /// the base point than to every neighbor already kept, then top up with
    /// the discarded ones in order.
    fn select_neighbors(&self, candidates: &[Candidate], m: usize) -> Vec<usize> {
        let mut selected: Vec<usize> = Vec::with_capacity(m);
        let mut discarded: Vec<usize> = Vec::new();

        for candidate in candidates {
            if selected.len() >= m {
                break;
            }
            let diverse = selected.iter().all(|&kept| {
                cosine_distance(&self.vectors[candidate.label], &self.vectors[kept])
                    > candidate.distance
            });
            if diverse {
                selected.push(candidate.label);
            } else {
                discarded.push(candidate.label);
            }
        }

        for label in discarded {
            if selected.len() >= m {
                break;
            }
            selected.push(label);
        }

        selected
    }

    fn prune(&mut self, label: usize, layer: usize, max_conn: usize) {
        let base = &self.vectors[label];
        let mut candidates: Vec<Candidate> = self.nodes[label].links[layer]
            .iter()
            .map(|&neighbor| Candidate {
                distance: cosine_distance(base, &self.vectors[neighbor]),
                label: neighbor,
            })
            .collect();
        candidates.sort();

        let kept = self.select_neighbors(&candidates, max_conn);
        self.nodes[label].links[layer] = kept;
    }

    fn random_level(&mut self) -> usize {
        let uniform: f64 = self.rng.random();
        // 1 - uniform is in (0, 1], so ln() is finite
        let level = (-(1.0 - uniform).ln() * self.level_mult).floor();
        (level as usize).min(MAX_LEVEL)
    }
}

/// Scale to unit length. Zero vectors are returned unchanged.
pub(crate) fn normalize(vector: &[f32]) -> Vec<f32> {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm < f32::EPSILON {
        return vector.to_vec();
    }
    vector.iter().map(|x| x / norm).collect()
}

/// `1 - dot` for unit vectors, clamped to the [0, 2] range.
pub(crate) fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    (1.0 - dot).clamp(0.0, 2.0)
}
