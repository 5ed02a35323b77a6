use std::hash::{Hash, Hasher};

/// A candidate entity pair, carrying its current utility (weight or
/// similarity).
///
/// For clean-clean runs `entity_id1` is a dataset-1 id and `entity_id2` a
/// dataset-2-relative id; for dirty runs both ids are global and
/// `entity_id1 < entity_id2`. Equality and hashing cover the id pair only,
/// so two comparisons over the same pair collapse in a set regardless of
/// their utilities.
#[derive(Debug, Clone, Copy)]
pub struct Comparison {
    entity_id1: u32,
    entity_id2: u32,
    utility: f64,
}

impl Comparison {
    pub fn new(entity_id1: u32, entity_id2: u32) -> Self {
        Comparison {
            entity_id1,
            entity_id2,
            utility: 0.0,
        }
    }

    pub fn entity_id1(&self) -> u32 {
        self.entity_id1
    }

    pub fn entity_id2(&self) -> u32 {
        self.entity_id2
    }

    pub fn ids(&self) -> (u32, u32) {
        (self.entity_id1, self.entity_id2)
    }

    pub fn utility(&self) -> f64 {
        self.utility
    }

    pub fn set_utility(&mut self, utility: f64) {
        self.utility = utility;
    }

    pub fn with_utility(mut self, utility: f64) -> Self {
        self.utility = utility;
        self
    }
}

impl PartialEq for Comparison {
    fn eq(&self, other: &Self) -> bool {
        self.entity_id1 == other.entity_id1 && self.entity_id2 == other.entity_id2
    }
}

impl Eq for Comparison {}

impl Hash for Comparison {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.entity_id1.hash(state);
        self.entity_id2.hash(state);
    }
}

/// Accumulator for the finally retained comparisons, kept as parallel arrays
/// for cheap inspection after a run.
#[derive(Debug, Default, Clone)]
pub struct SimilarityPairs {
    entities1: Vec<u32>,
    entities2: Vec<u32>,
    similarities: Vec<f64>,
}

impl SimilarityPairs {
    pub fn new() -> Self {
        SimilarityPairs::default()
    }

    pub fn add(&mut self, comparison: &Comparison) {
        self.entities1.push(comparison.entity_id1());
        self.entities2.push(comparison.entity_id2());
        self.similarities.push(comparison.utility());
    }

    pub fn len(&self) -> usize {
        self.similarities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.similarities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, u32, f64)> + '_ {
        self.entities1
            .iter()
            .zip(&self.entities2)
            .zip(&self.similarities)
            .map(|((&e1, &e2), &sim)| (e1, e2, sim))
    }
}
