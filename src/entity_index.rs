use smallvec::SmallVec;

use crate::block::Block;
use crate::error::MetablockError;

/// Which side of a clean-clean run an id belongs to. Dirty runs only ever
/// see `First`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetSide {
    First,
    Second,
}

/// Converts a dataset-relative id to a global one. All id arithmetic that
/// crosses the dataset boundary goes through here.
pub fn globalize(id: u32, side: DatasetSide, dataset_limit: u32) -> u32 {
    match side {
        DatasetSide::First => id,
        DatasetSide::Second => id + dataset_limit,
    }
}

/// Maps every entity to the blocks containing it. Built once per run from
/// the input block collection and immutable afterwards.
pub struct EntityIndex {
    entity_blocks: Vec<SmallVec<[u32; 4]>>,
    num_blocks: usize,
    dataset_limit: u32,
}

impl EntityIndex {
    pub fn build(
        blocks: &[Block],
        num_entities: usize,
        dataset_limit: usize,
    ) -> Result<Self, MetablockError> {
        let clean_clean = dataset_limit != 0;
        let mut entity_blocks = vec![SmallVec::new(); num_entities];

        for (block_id, block) in blocks.iter().enumerate() {
            let block_id = block_id as u32;
            match block {
                Block::Bilateral { index1, index2 } => {
                    if !clean_clean {
                        return Err(MetablockError::Input(format!(
                            "block {} is bilateral but dataset_limit is 0",
                            block_id
                        )));
                    }
                    for &id in index1 {
                        let global = globalize(id, DatasetSide::First, dataset_limit as u32);
                        Self::record(&mut entity_blocks, global, block_id, dataset_limit)?;
                    }
                    for &id in index2 {
                        let global = globalize(id, DatasetSide::Second, dataset_limit as u32);
                        Self::record(&mut entity_blocks, global, block_id, dataset_limit)?;
                    }
                }
                Block::Unilateral { entities } => {
                    if clean_clean {
                        return Err(MetablockError::Input(format!(
                            "block {} is unilateral but dataset_limit is {}",
                            block_id, dataset_limit
                        )));
                    }
                    for &id in entities {
                        Self::record(&mut entity_blocks, id, block_id, dataset_limit)?;
                    }
                }
            }
        }

        Ok(EntityIndex {
            entity_blocks,
            num_blocks: blocks.len(),
            dataset_limit: dataset_limit as u32,
        })
    }

    fn record(
        entity_blocks: &mut [SmallVec<[u32; 4]>],
        global_id: u32,
        block_id: u32,
        dataset_limit: usize,
    ) -> Result<(), MetablockError> {
        let slot = entity_blocks.get_mut(global_id as usize).ok_or_else(|| {
            MetablockError::Input(format!(
                "block {} references entity {} beyond the entity count (dataset_limit {})",
                block_id, global_id, dataset_limit
            ))
        })?;
        slot.push(block_id);
        Ok(())
    }

    pub fn num_entities(&self) -> usize {
        self.entity_blocks.len()
    }

    pub fn num_blocks(&self) -> usize {
        self.num_blocks
    }

    pub fn dataset_limit(&self) -> u32 {
        self.dataset_limit
    }

    pub fn is_clean_clean(&self) -> bool {
        self.dataset_limit != 0
    }

    pub fn side_of(&self, global_id: u32) -> DatasetSide {
        if self.is_clean_clean() && self.dataset_limit <= global_id {
            DatasetSide::Second
        } else {
            DatasetSide::First
        }
    }

    /// Size of the dataset the entity belongs to (the whole dataset for
    /// dirty runs).
    pub fn side_size(&self, global_id: u32) -> usize {
        if !self.is_clean_clean() {
            return self.num_entities();
        }
        match self.side_of(global_id) {
            DatasetSide::First => self.dataset_limit as usize,
            DatasetSide::Second => self.num_entities() - self.dataset_limit as usize,
        }
    }

    /// Ids of the blocks containing the entity.
    pub fn block_ids_of(&self, global_id: u32) -> &[u32] {
        &self.entity_blocks[global_id as usize]
    }

    /// In how many blocks the entity appears.
    pub fn block_count_of(&self, global_id: u32) -> usize {
        self.entity_blocks[global_id as usize].len()
    }
}
