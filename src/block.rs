use serde::{Deserialize, Serialize};

use crate::comparison::Comparison;

/// A group of entities sharing a blocking key. Bilateral blocks carry one
/// member list per dataset (ids relative to their own dataset); unilateral
/// blocks carry a single list of global ids. Member lists never contain
/// duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Block {
    Bilateral { index1: Vec<u32>, index2: Vec<u32> },
    Unilateral { entities: Vec<u32> },
}

impl Block {
    pub fn is_bilateral(&self) -> bool {
        matches!(self, Block::Bilateral { .. })
    }

    /// Number of entity-to-block assignments this block contributes.
    pub fn total_assignments(&self) -> usize {
        match self {
            Block::Bilateral { index1, index2 } => index1.len() + index2.len(),
            Block::Unilateral { entities } => entities.len(),
        }
    }

    /// Number of comparisons this block spans before any pruning.
    pub fn comparison_count(&self) -> f64 {
        match self {
            Block::Bilateral { index1, index2 } => (index1.len() * index2.len()) as f64,
            Block::Unilateral { entities } => {
                let n = entities.len() as f64;
                n * (n - 1.0) / 2.0
            }
        }
    }
}

/// The block collection file format consumed and produced by the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockCollection {
    pub num_entities: usize,
    pub dataset_limit: usize,
    pub blocks: Vec<Block>,
}

/// A block holding an explicit list of retained comparisons, the output unit
/// of a pruning run. Stored as parallel arrays so the comparisons can be
/// replayed exactly, weights included.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecomposedBlock {
    clean_clean: bool,
    entities1: Vec<u32>,
    entities2: Vec<u32>,
    utilities: Vec<f64>,
}

impl DecomposedBlock {
    pub fn from_comparisons(clean_clean: bool, comparisons: &[Comparison]) -> Self {
        let mut block = DecomposedBlock {
            clean_clean,
            entities1: Vec::with_capacity(comparisons.len()),
            entities2: Vec::with_capacity(comparisons.len()),
            utilities: Vec::with_capacity(comparisons.len()),
        };
        for comparison in comparisons {
            block.entities1.push(comparison.entity_id1());
            block.entities2.push(comparison.entity_id2());
            block.utilities.push(comparison.utility());
        }
        block
    }

    pub fn is_clean_clean(&self) -> bool {
        self.clean_clean
    }

    pub fn len(&self) -> usize {
        self.entities1.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities1.is_empty()
    }

    /// Replays the block back into its comparisons.
    pub fn comparisons(&self) -> impl Iterator<Item = Comparison> + '_ {
        self.entities1
            .iter()
            .zip(&self.entities2)
            .zip(&self.utilities)
            .map(|((&e1, &e2), &utility)| Comparison::new(e1, e2).with_utility(utility))
    }
}
