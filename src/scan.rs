use tracing::debug;

use crate::block::Block;
use crate::comparison::Comparison;
use crate::entity_index::{DatasetSide, EntityIndex, globalize};
use crate::statistics::{
    ComparisonStatistics, WeightStatistics, compute_comparison_statistics,
    compute_weight_statistics,
};
use crate::weighting::WeightingScheme;

/// Flag value meaning "slot not owned by any entity yet".
const NO_ENTITY: u32 = u32::MAX;

/// The active scheme bundled with the statistics it needs, so a scheme can
/// never be evaluated without its precomputed inputs.
enum SchemeKernel {
    Arcs,
    Cbs,
    Ecbs,
    Js,
    Ejs(ComparisonStatistics),
    Wjs(WeightStatistics),
}

/// Shared state for one pruning run: the immutable block collection and
/// entity index, the global statistics, and the per-entity scratch arrays.
///
/// The `counters`/`flags` pair is zeroed lazily: a counter slot is valid only
/// while `flags[j]` equals the entity currently being scanned, so scanning a
/// new entity implicitly invalidates the previous entity's counts. Callers
/// must run one of the scan methods for an entity before asking for any of
/// its weights. The context owns all scratch for the duration of a run and
/// releases it on drop.
pub struct ScanContext<'a> {
    blocks: &'a [Block],
    index: &'a EntityIndex,
    kernel: SchemeKernel,
    counters: Vec<f64>,
    flags: Vec<u32>,
    neighbors: Vec<u32>,
    total_block_assignments: usize,
}

impl<'a> ScanContext<'a> {
    pub fn new(blocks: &'a [Block], index: &'a EntityIndex, scheme: WeightingScheme) -> Self {
        let kernel = match scheme {
            WeightingScheme::Arcs => SchemeKernel::Arcs,
            WeightingScheme::Cbs => SchemeKernel::Cbs,
            WeightingScheme::Ecbs => SchemeKernel::Ecbs,
            WeightingScheme::Js => SchemeKernel::Js,
            WeightingScheme::Ejs => {
                SchemeKernel::Ejs(compute_comparison_statistics(blocks, index))
            }
            WeightingScheme::Wjs => SchemeKernel::Wjs(compute_weight_statistics(blocks, index)),
        };
        let total_block_assignments = blocks.iter().map(Block::total_assignments).sum();
        debug!(
            %scheme,
            total_block_assignments,
            num_blocks = blocks.len(),
            "scan context ready"
        );

        let num_entities = index.num_entities();
        ScanContext {
            blocks,
            index,
            kernel,
            counters: vec![0.0; num_entities],
            flags: vec![NO_ENTITY; num_entities],
            neighbors: Vec::new(),
            total_block_assignments,
        }
    }

    pub fn scheme(&self) -> WeightingScheme {
        match self.kernel {
            SchemeKernel::Arcs => WeightingScheme::Arcs,
            SchemeKernel::Cbs => WeightingScheme::Cbs,
            SchemeKernel::Ecbs => WeightingScheme::Ecbs,
            SchemeKernel::Js => WeightingScheme::Js,
            SchemeKernel::Ejs(_) => WeightingScheme::Ejs,
            SchemeKernel::Wjs(_) => WeightingScheme::Wjs,
        }
    }

    pub fn index(&self) -> &EntityIndex {
        self.index
    }

    pub fn num_entities(&self) -> usize {
        self.index.num_entities()
    }

    pub fn is_clean_clean(&self) -> bool {
        self.index.is_clean_clean()
    }

    pub fn total_block_assignments(&self) -> usize {
        self.total_block_assignments
    }

    /// Distinct co-occurring neighbors found by the latest scan, as global
    /// ids.
    pub fn valid_neighbors(&self) -> &[u32] {
        &self.neighbors
    }

    /// Scans one entity, counting shared blocks per neighbor. Invalidates
    /// the previous entity's counters.
    pub fn scan_entity(&mut self, entity: u32) {
        self.accumulate(entity, |_| 1.0);
    }

    /// ARCS variant: every shared block contributes the reciprocal of its
    /// comparison count instead of one.
    pub fn scan_entity_arcs(&mut self, entity: u32) {
        self.accumulate(entity, |block| 1.0 / block.comparison_count());
    }

    fn accumulate(&mut self, entity: u32, increment_of: impl Fn(&Block) -> f64) {
        let index = self.index;
        let blocks = self.blocks;
        let counters = &mut self.counters;
        let flags = &mut self.flags;
        let neighbors = &mut self.neighbors;
        neighbors.clear();

        for &block_id in index.block_ids_of(entity) {
            let block = &blocks[block_id as usize];
            let increment = increment_of(block);
            match block {
                Block::Bilateral { index1, index2 } => {
                    let (others, other_side) = match index.side_of(entity) {
                        DatasetSide::First => (index2, DatasetSide::Second),
                        DatasetSide::Second => (index1, DatasetSide::First),
                    };
                    for &id in others {
                        let neighbor = globalize(id, other_side, index.dataset_limit());
                        bump(counters, flags, neighbors, entity, neighbor, increment);
                    }
                }
                Block::Unilateral { entities } => {
                    for &neighbor in entities {
                        if neighbor != entity {
                            bump(counters, flags, neighbors, entity, neighbor, increment);
                        }
                    }
                }
            }
        }
    }

    /// Edge weight for the current entity and one of its valid neighbors.
    /// Only meaningful after a scan of `entity`.
    pub fn weight(&self, entity: u32, neighbor: u32) -> f64 {
        let cbs = self.counters[neighbor as usize];
        let blocks_of = |id: u32| self.index.block_count_of(id) as f64;
        match &self.kernel {
            SchemeKernel::Arcs | SchemeKernel::Cbs => cbs,
            SchemeKernel::Ecbs => {
                let total_blocks = self.index.num_blocks() as f64;
                cbs * (total_blocks / blocks_of(entity)).log10()
                    * (total_blocks / blocks_of(neighbor)).log10()
            }
            SchemeKernel::Js => cbs / (blocks_of(entity) + blocks_of(neighbor) - cbs),
            SchemeKernel::Ejs(stats) => {
                let probability = cbs / (blocks_of(entity) + blocks_of(neighbor) - cbs);
                probability
                    * (stats.distinct_comparisons / stats.comparisons_per_entity[entity as usize])
                        .log10()
                    * (stats.distinct_comparisons
                        / stats.comparisons_per_entity[neighbor as usize])
                        .log10()
            }
            SchemeKernel::Wjs(stats) => {
                cbs / (f64::MIN_POSITIVE
                    + stats.total_weights[entity as usize]
                    + stats.total_weights[neighbor as usize])
            }
        }
    }

    /// Builds the comparison for an entity/neighbor pair, normalizing ids to
    /// the pair's storage convention: `(dataset-1 id, dataset-2-relative id)`
    /// for clean-clean runs, ordered global ids otherwise.
    pub fn comparison(&self, entity: u32, neighbor: u32) -> Comparison {
        let limit = self.index.dataset_limit();
        if !self.index.is_clean_clean() {
            if entity < neighbor {
                Comparison::new(entity, neighbor)
            } else {
                Comparison::new(neighbor, entity)
            }
        } else if entity < limit {
            Comparison::new(entity, neighbor - limit)
        } else {
            Comparison::new(neighbor, entity - limit)
        }
    }
}

fn bump(
    counters: &mut [f64],
    flags: &mut [u32],
    neighbors: &mut Vec<u32>,
    entity: u32,
    neighbor: u32,
    increment: f64,
) {
    let slot = neighbor as usize;
    if flags[slot] != entity {
        flags[slot] = entity;
        counters[slot] = 0.0;
        neighbors.push(neighbor);
    }
    counters[slot] += increment;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity_index::EntityIndex;

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
    fn test_scan_counts_shared_blocks() {
        let (blocks, index) = clean_clean_fixture();
        let mut cx = ScanContext::new(&blocks, &index, WeightingScheme::Cbs);

        cx.scan_entity(0);
        let mut neighbors = cx.valid_neighbors().to_vec();
        neighbors.sort();
        assert_eq!(neighbors, vec![2, 3]);
        assert_eq!(cx.weight(0, 2), 2.0);
        assert_eq!(cx.weight(0, 3), 1.0);

        cx.scan_entity(1);
        assert_eq!(cx.valid_neighbors(), &[2]);
        assert_eq!(cx.weight(1, 2), 1.0);
    }

    #[test]
    fn test_scan_resets_stale_counters() {
        let (blocks, index) = clean_clean_fixture();
        let mut cx = ScanContext::new(&blocks, &index, WeightingScheme::Cbs);
        cx.scan_entity(0);
        assert_eq!(cx.weight(0, 2), 2.0);
        // Entity 1 shares only one block with global entity 2; the count from
        // entity 0's scan must not leak through.
        cx.scan_entity(1);
        assert_eq!(cx.weight(1, 2), 1.0);
    }

    #[test]
    fn test_arcs_accumulates_reciprocal_block_cardinality() {
        let (blocks, index) = clean_clean_fixture();
        let mut cx = ScanContext::new(&blocks, &index, WeightingScheme::Arcs);
        cx.scan_entity_arcs(0);
        // Both blocks span two comparisons each.
        assert_eq!(cx.weight(0, 2), 1.0);
        assert_eq!(cx.weight(0, 3), 0.5);
    }

    #[test]
    fn test_dirty_scan_skips_self() {
        let blocks = vec![Block::Unilateral {
            entities: vec![0, 1, 2],
        }];
        let index = EntityIndex::build(&blocks, 3, 0).unwrap();
        let mut cx = ScanContext::new(&blocks, &index, WeightingScheme::Cbs);
        cx.scan_entity(1);
        let mut neighbors = cx.valid_neighbors().to_vec();
        neighbors.sort();
        assert_eq!(neighbors, vec![0, 2]);
    }

    #[test]
    fn test_comparison_normalization() {
        let (blocks, index) = clean_clean_fixture();
        let cx = ScanContext::new(&blocks, &index, WeightingScheme::Cbs);
        // Dataset-1 entity against global dataset-2 neighbor.
        assert_eq!(cx.comparison(0, 2).ids(), (0, 0));
        // Dataset-2 entity against dataset-1 neighbor.
        assert_eq!(cx.comparison(3, 0).ids(), (0, 1));

        let dirty_blocks = vec![Block::Unilateral {
            entities: vec![0, 1, 2],
        }];
        let dirty_index = EntityIndex::build(&dirty_blocks, 3, 0).unwrap();
        let dirty_cx = ScanContext::new(&dirty_blocks, &dirty_index, WeightingScheme::Cbs);
        assert_eq!(dirty_cx.comparison(2, 0).ids(), (0, 2));
    }

    #[test]
    fn test_total_block_assignments() {
        let (blocks, index) = clean_clean_fixture();
        let cx = ScanContext::new(&blocks, &index, WeightingScheme::Cbs);
        assert_eq!(cx.total_block_assignments(), 6);
    }
}
