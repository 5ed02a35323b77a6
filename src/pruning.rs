use std::cmp::Ordering;
use std::collections::BinaryHeap;

use itertools::Itertools;
use rustc_hash::FxHashSet;
use tracing::{debug, info};

use crate::block::{Block, DecomposedBlock};
use crate::comparison::{Comparison, SimilarityPairs};
use crate::config::MetablockConfig;
use crate::entity_index::EntityIndex;
use crate::error::MetablockError;
use crate::scan::ScanContext;
use crate::text_model::{BagModel, RescoringModels, TextModel};
use crate::weighting::WeightingScheme;

/// A pruning strategy over a shared scan context: pick a retention budget,
/// then prune the blocking graph down to a decomposed block list.
pub trait PruningStrategy {
    fn compute_threshold(&mut self, cx: &ScanContext);
    fn prune_edges(&mut self, cx: &mut ScanContext) -> Vec<DecomposedBlock>;
}

/// Bounded-heap entry. The score is captured by value at insertion time and
/// never re-read from the comparison, so later utility updates cannot break
/// the heap invariant.
#[derive(Clone, Copy)]
struct HeapEntry {
    score: f64,
    comparison: Comparison,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.score == other.score && self.comparison == other.comparison
    }
}

impl Eq for HeapEntry {}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap pops its maximum, so ordering by descending
        // score makes pop() evict the lowest-scored edge. Ties break on the
        // id pair to keep eviction deterministic.
        other
            .score
            .total_cmp(&self.score)
            .then_with(|| other.comparison.ids().cmp(&self.comparison.ids()))
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Cardinality-bounded node-centric pruning with average-weight refinement.
///
/// Every entity keeps its top-k weighted edges; edges selected from both
/// endpoints are credited to the lower-indexed one; each entity then drops
/// the credited edges at or below its average score. When rescoring models
/// are supplied the refinement scores edges with the synthetic profile/
/// neighborhood similarity, otherwise with the original graph weight.
pub struct CardinalityNodePruning<'m, M = BagModel> {
    cardinality: Option<usize>,
    nearest: Vec<Option<FxHashSet<Comparison>>>,
    heap: BinaryHeap<HeapEntry>,
    models: Option<RescoringModels<'m, M>>,
    pairs: SimilarityPairs,
}

impl CardinalityNodePruning<'static, BagModel> {
    pub fn new() -> Self {
        Self::build(None)
    }
}

impl Default for CardinalityNodePruning<'static, BagModel> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'m, M: TextModel> CardinalityNodePruning<'m, M> {
    pub fn with_models(models: RescoringModels<'m, M>) -> Self {
        Self::build(Some(models))
    }

    fn build(models: Option<RescoringModels<'m, M>>) -> Self {
        CardinalityNodePruning {
            cardinality: None,
            nearest: Vec::new(),
            heap: BinaryHeap::new(),
            models,
            pairs: SimilarityPairs::new(),
        }
    }

    /// Overrides the derived per-entity budget.
    pub fn set_cardinality(&mut self, cardinality: usize) {
        self.cardinality = Some(cardinality);
    }

    /// Every finally retained comparison with its refinement score.
    pub fn into_pairs(self) -> SimilarityPairs {
        self.pairs
    }

    fn derived_cardinality(cx: &ScanContext) -> usize {
        let ratio = cx.total_block_assignments() as f64 / cx.num_entities() as f64;
        ratio.round().max(1.0) as usize
    }

    /// Keeps the entity's top-k weighted edges in a bounded min-heap. Edges
    /// weighing less than the running heap minimum are never pushed, and
    /// zero-weight edges never enter at all.
    fn select_nearest(&mut self, cx: &ScanContext, entity: u32, cardinality: usize) {
        let candidates = cx.valid_neighbors();
        if candidates.is_empty() {
            return;
        }
        self.heap.clear();
        let mut minimum_weight = f64::MIN_POSITIVE;
        for &neighbor in candidates {
            let weight = cx.weight(entity, neighbor);
            if weight >= minimum_weight {
                let comparison = cx.comparison(entity, neighbor).with_utility(weight);
                self.heap.push(HeapEntry { score: weight, comparison });
                if cardinality < self.heap.len() {
                    if let Some(evicted) = self.heap.pop() {
                        minimum_weight = evicted.score;
                    }
                }
            }
        }
        let selected: FxHashSet<Comparison> =
            self.heap.drain().map(|entry| entry.comparison).collect();
        self.nearest[entity as usize] = Some(selected);
    }

    /// An edge kept by both endpoints' scans is credited only to the
    /// lower-indexed entity; everything else is credited to whoever found
    /// it. Dataset-2-relative ids are globalized before the index check.
    fn is_valid(&self, cx: &ScanContext, entity: u32, comparison: &Comparison) -> bool {
        let mut neighbor = if comparison.entity_id1() == entity {
            comparison.entity_id2()
        } else {
            comparison.entity_id1()
        };
        if cx.is_clean_clean() && entity < cx.index().dataset_limit() {
            neighbor += cx.index().dataset_limit();
        }
        match &self.nearest[neighbor as usize] {
            None => true,
            Some(set) => !set.contains(comparison) || entity < neighbor,
        }
    }

    fn refinement_score(&self, comparison: &Comparison) -> f64 {
        match &self.models {
            Some(models) => models.synthetic_similarity(comparison),
            None => comparison.utility(),
        }
    }

    /// Average-weight refinement: per entity, score the credited edges,
    /// skip the entity when the scores sum to zero, and retain only edges
    /// strictly above the entity's average score.
    fn retain_valid(&mut self, cx: &ScanContext) -> Vec<DecomposedBlock> {
        let mut new_blocks = Vec::new();
        for entity in 0..cx.num_entities() as u32 {
            let mut similarity_sum = 0.0;
            let mut scored: Vec<Comparison> = Vec::new();
            if let Some(set) = &self.nearest[entity as usize] {
                for comparison in set.iter().sorted_by_key(|c| c.ids()) {
                    if !self.is_valid(cx, entity, comparison) {
                        continue;
                    }
                    let similarity = self.refinement_score(comparison);
                    similarity_sum += similarity;
                    scored.push((*comparison).with_utility(similarity));
                }
            } else {
                continue;
            }
            if similarity_sum == 0.0 {
                continue;
            }

            let average = similarity_sum / scored.len() as f64;
            debug!(entity, average, credited = scored.len(), "entity average score");

            let mut retained = Vec::new();
            for comparison in scored {
                let similarity = comparison.utility();
                if similarity > average {
                    // The average-relative ratio is diagnostic only; the
                    // propagated utility stays the refinement score.
                    debug!(
                        ids = ?comparison.ids(),
                        similarity,
                        ratio = similarity / average,
                        "retained edge"
                    );
                    self.pairs.add(&comparison);
                    retained.push(comparison);
                }
            }
            if !retained.is_empty() {
                new_blocks.push(DecomposedBlock::from_comparisons(
                    cx.is_clean_clean(),
                    &retained,
                ));
            }
        }
        new_blocks
    }
}

impl<'m, M: TextModel> PruningStrategy for CardinalityNodePruning<'m, M> {
    fn compute_threshold(&mut self, cx: &ScanContext) {
        let cardinality = self
            .cardinality
            .unwrap_or_else(|| Self::derived_cardinality(cx));
        self.cardinality = Some(cardinality);
        info!(cardinality, "selected per-entity cardinality bound");
    }

    fn prune_edges(&mut self, cx: &mut ScanContext) -> Vec<DecomposedBlock> {
        let cardinality = self
            .cardinality
            .unwrap_or_else(|| Self::derived_cardinality(cx));
        self.cardinality = Some(cardinality);

        let num_entities = cx.num_entities();
        self.nearest = (0..num_entities).map(|_| None).collect();
        let arcs = cx.scheme() == WeightingScheme::Arcs;
        for entity in 0..num_entities as u32 {
            if arcs {
                cx.scan_entity_arcs(entity);
            } else {
                cx.scan_entity(entity);
            }
            self.select_nearest(cx, entity, cardinality);
        }

        let blocks = self.retain_valid(cx);
        // Release the per-entity sets; they are consumed exactly once.
        self.nearest = Vec::new();
        blocks
    }
}

/// Result of one meta-blocking run: the decomposed block collection for the
/// downstream matcher, plus every retained pair with its score.
pub struct RefineOutput {
    pub blocks: Vec<DecomposedBlock>,
    pub pairs: SimilarityPairs,
}

/// Runs one full pruning pass without rescoring models; the refinement
/// scores edges with their original graph weights.
pub fn refine(blocks: &[Block], config: &MetablockConfig) -> Result<RefineOutput, MetablockError> {
    refine_inner::<BagModel>(blocks, config, None)
}

/// Runs one full pruning pass with synthetic-similarity rescoring.
pub fn refine_with_models<M: TextModel>(
    blocks: &[Block],
    config: &MetablockConfig,
    models: RescoringModels<'_, M>,
) -> Result<RefineOutput, MetablockError> {
    // The boundary fields must be sound before the model arrays are checked
    // against them.
    config.validate()?;
    models.validate(config.num_entities, config.dataset_limit)?;
    refine_inner(blocks, config, Some(models))
}

fn refine_inner<M: TextModel>(
    blocks: &[Block],
    config: &MetablockConfig,
    models: Option<RescoringModels<'_, M>>,
) -> Result<RefineOutput, MetablockError> {
    let scheme = config.validate()?;
    let index = EntityIndex::build(blocks, config.num_entities, config.dataset_limit)?;
    let mut cx = ScanContext::new(blocks, &index, scheme);

    let mut strategy = CardinalityNodePruning::build(models);
    if let Some(cardinality) = config.cardinality {
        strategy.set_cardinality(cardinality);
    }
    strategy.compute_threshold(&cx);
    let out_blocks = strategy.prune_edges(&mut cx);
    let pairs = strategy.into_pairs();

    info!(
        %scheme,
        blocks_in = blocks.len(),
        blocks_out = out_blocks.len(),
        retained = pairs.len(),
        "meta-blocking finished"
    );
    Ok(RefineOutput {
        blocks: out_blocks,
        pairs,
    })
}
