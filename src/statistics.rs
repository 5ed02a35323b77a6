use fixedbitset::FixedBitSet;
use tracing::debug;

use crate::block::Block;
use crate::entity_index::{DatasetSide, EntityIndex, globalize};

/// Per-entity distinct-comparison counts and their global total, required by
/// the EJS scheme.
pub struct ComparisonStatistics {
    pub distinct_comparisons: f64,
    pub comparisons_per_entity: Vec<f64>,
}

/// Per-entity IDF totals over block memberships, required by the WJS scheme.
pub struct WeightStatistics {
    pub total_weights: Vec<f64>,
}

/// For every entity, unions the co-occurring neighbors across all its blocks
/// and records the size of that set. The global total halves the per-entity
/// sum, since every undirected edge is counted from both endpoints.
pub fn compute_comparison_statistics(
    blocks: &[Block],
    index: &EntityIndex,
) -> ComparisonStatistics {
    let num_entities = index.num_entities();
    let mut comparisons_per_entity = vec![0.0; num_entities];
    let mut distinct_comparisons = 0.0;

    // Marked bits are cleared individually after each entity, so the bitset
    // allocation is reused across the whole pass.
    let mut marked = FixedBitSet::with_capacity(num_entities);
    let mut marks: Vec<u32> = Vec::new();

    for entity in 0..num_entities as u32 {
        let associated_blocks = index.block_ids_of(entity);
        if associated_blocks.is_empty() {
            continue;
        }
        marks.clear();
        for &block_id in associated_blocks {
            match &blocks[block_id as usize] {
                Block::Bilateral { index1, index2 } => {
                    let (others, other_side) = match index.side_of(entity) {
                        DatasetSide::First => (index2, DatasetSide::Second),
                        DatasetSide::Second => (index1, DatasetSide::First),
                    };
                    for &id in others {
                        let global = globalize(id, other_side, index.dataset_limit());
                        if !marked.contains(global as usize) {
                            marked.insert(global as usize);
                            marks.push(global);
                        }
                    }
                }
                Block::Unilateral { entities } => {
                    for &global in entities {
                        if !marked.contains(global as usize) {
                            marked.insert(global as usize);
                            marks.push(global);
                        }
                    }
                }
            }
        }
        let mut count = marks.len() as f64;
        if !index.is_clean_clean() {
            // The entity marks itself through its own blocks.
            count -= 1.0;
        }
        comparisons_per_entity[entity as usize] = count;
        distinct_comparisons += count;
        for &global in &marks {
            marked.set(global as usize, false);
        }
    }

    distinct_comparisons /= 2.0;
    debug!(distinct_comparisons, "computed comparison statistics");
    ComparisonStatistics {
        distinct_comparisons,
        comparisons_per_entity,
    }
}

/// For every entity, sums the IDF-like weights of its blocks, each restricted
/// to the entity's own dataset side.
pub fn compute_weight_statistics(blocks: &[Block], index: &EntityIndex) -> WeightStatistics {
    let num_entities = index.num_entities();
    let mut total_weights = vec![0.0; num_entities];

    for entity in 0..num_entities as u32 {
        let dataset_size = index.side_size(entity) as f64;
        let mut total = 0.0;
        for &block_id in index.block_ids_of(entity) {
            let members_on_side = match &blocks[block_id as usize] {
                Block::Bilateral { index1, index2 } => match index.side_of(entity) {
                    DatasetSide::First => index1.len(),
                    DatasetSide::Second => index2.len(),
                },
                Block::Unilateral { entities } => entities.len(),
            };
            total += (dataset_size / members_on_side as f64).log10();
        }
        total_weights[entity as usize] = total;
    }

    debug!("computed block-weight statistics");
    WeightStatistics { total_weights }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clean_clean_fixture() -> (Vec<Block>, EntityIndex) {
        let blocks = vec![
            Block::Bilateral {
                index1: vec![0, 1],
                index2: vec![0],
            },
            Block::Bilateral {
                index1: vec![0],
                index2: vec![0, 1],
            },
        ];
        let index = EntityIndex::build(&blocks, 4, 2).unwrap();
        (blocks, index)
    }

    #[test]
    fn test_comparison_statistics_clean_clean() {
        let (blocks, index) = clean_clean_fixture();
        let stats = compute_comparison_statistics(&blocks, &index);
        // entity 0 meets {2, 3}, entity 1 meets {2},
        // entity 2 meets {0, 1}, entity 3 meets {0}
        assert_eq!(stats.comparisons_per_entity, vec![2.0, 1.0, 2.0, 1.0]);
        assert_eq!(stats.distinct_comparisons, 3.0);
    }

    #[test]
    fn test_comparison_statistics_dirty_excludes_self() {
        let blocks = vec![
            Block::Unilateral {
                entities: vec![0, 1, 2],
            },
            Block::Unilateral {
                entities: vec![1, 2],
            },
        ];
        let index = EntityIndex::build(&blocks, 3, 0).unwrap();
        let stats = compute_comparison_statistics(&blocks, &index);
        assert_eq!(stats.comparisons_per_entity, vec![2.0, 2.0, 2.0]);
        assert_eq!(stats.distinct_comparisons, 3.0);
    }

    #[test]
    fn test_weight_statistics_per_side() {
        let (blocks, index) = clean_clean_fixture();
        let stats = compute_weight_statistics(&blocks, &index);
        // entity 0: log10(2/2) + log10(2/1)
        assert!((stats.total_weights[0] - 2.0_f64.log10()).abs() < 1e-12);
        // entity 1: log10(2/2)
        assert_eq!(stats.total_weights[1], 0.0);
        // entity 2 (dataset 2): log10(2/1) + log10(2/2)
        assert!((stats.total_weights[2] - 2.0_f64.log10()).abs() < 1e-12);
        assert_eq!(stats.total_weights[3], 0.0);
    }

    #[test]
    fn test_weight_statistics_dirty_uses_whole_dataset() {
        let blocks = vec![Block::Unilateral {
            entities: vec![0, 1],
        }];
        let index = EntityIndex::build(&blocks, 4, 0).unwrap();
        let stats = compute_weight_statistics(&blocks, &index);
        assert!((stats.total_weights[0] - 2.0_f64.log10()).abs() < 1e-12);
        assert_eq!(stats.total_weights[2], 0.0);
    }
}
