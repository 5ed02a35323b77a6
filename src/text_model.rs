use rustc_hash::FxHashMap;

use crate::comparison::Comparison;
use crate::error::MetablockError;

/// Profile/neighborhood weighting of the synthetic similarity.
const PROFILE_WEIGHT: f64 = 0.66;

/// A textual model of an entity (or of its graph neighborhood), the plug-in
/// seam for the re-weighting pass.
pub trait TextModel {
    /// Number of documents indexed into the model. Zero means the model
    /// carries no signal and any similarity against it is zero.
    fn document_count(&self) -> usize;

    fn similarity(&self, other: &Self) -> f64;
}

/// The four model arrays driving re-weighting: per-entity profile models and
/// graph-neighborhood models, with a second pair for clean-clean runs.
/// Dataset-2 arrays are indexed by dataset-2-relative ids, matching the
/// comparison storage convention.
pub struct RescoringModels<'a, M> {
    entity_models_d1: &'a [M],
    entity_models_d2: Option<&'a [M]>,
    neighbor_models_d1: &'a [M],
    neighbor_models_d2: Option<&'a [M]>,
}

impl<'a, M: TextModel> RescoringModels<'a, M> {
    pub fn bilateral(
        entity_models_d1: &'a [M],
        entity_models_d2: &'a [M],
        neighbor_models_d1: &'a [M],
        neighbor_models_d2: &'a [M],
    ) -> Self {
        RescoringModels {
            entity_models_d1,
            entity_models_d2: Some(entity_models_d2),
            neighbor_models_d1,
            neighbor_models_d2: Some(neighbor_models_d2),
        }
    }

    pub fn unilateral(entity_models: &'a [M], neighbor_models: &'a [M]) -> Self {
        RescoringModels {
            entity_models_d1: entity_models,
            entity_models_d2: None,
            neighbor_models_d1: neighbor_models,
            neighbor_models_d2: None,
        }
    }

    /// Checks the model arrays against the run's boundaries before any scan.
    pub fn validate(&self, num_entities: usize, dataset_limit: usize) -> Result<(), MetablockError> {
        let clean_clean = dataset_limit != 0;
        if clean_clean != self.entity_models_d2.is_some()
            || clean_clean != self.neighbor_models_d2.is_some()
        {
            return Err(MetablockError::Config(
                "rescoring models must carry dataset-2 arrays exactly for clean-clean runs".into(),
            ));
        }
        let d1_needed = if clean_clean { dataset_limit } else { num_entities };
        let d2_needed = num_entities.checked_sub(dataset_limit).ok_or_else(|| {
            MetablockError::Config(format!(
                "dataset limit {} exceeds entity count {}",
                dataset_limit, num_entities
            ))
        })?;
        if self.entity_models_d1.len() < d1_needed || self.neighbor_models_d1.len() < d1_needed {
            return Err(MetablockError::Config(format!(
                "dataset-1 model arrays must cover {} entities",
                d1_needed
            )));
        }
        for models in [self.entity_models_d2, self.neighbor_models_d2].into_iter().flatten() {
            if models.len() < d2_needed {
                return Err(MetablockError::Config(format!(
                    "dataset-2 model arrays must cover {} entities",
                    d2_needed
                )));
            }
        }
        Ok(())
    }

    /// Weighted sum of profile similarity and neighborhood similarity for a
    /// retained pair; zero when either side has an empty profile model.
    pub fn synthetic_similarity(&self, comparison: &Comparison) -> f64 {
        let id1 = comparison.entity_id1() as usize;
        let id2 = comparison.entity_id2() as usize;

        if self.entity_models_d1[id1].document_count() == 0 {
            return 0.0;
        }

        let (profile, neighbor) = match (self.entity_models_d2, self.neighbor_models_d2) {
            (Some(entity_d2), Some(neighbor_d2)) => {
                if entity_d2[id2].document_count() == 0 {
                    return 0.0;
                }
                (
                    self.entity_models_d1[id1].similarity(&entity_d2[id2]),
                    self.neighbor_models_d1[id1].similarity(&neighbor_d2[id2]),
                )
            }
            _ => {
                if self.entity_models_d1[id2].document_count() == 0 {
                    return 0.0;
                }
                (
                    self.entity_models_d1[id1].similarity(&self.entity_models_d1[id2]),
                    self.neighbor_models_d1[id1].similarity(&self.neighbor_models_d1[id2]),
                )
            }
        };
        PROFILE_WEIGHT * profile + (1.0 - PROFILE_WEIGHT) * neighbor
    }
}

/// Token-bag model with cosine similarity over term frequencies.
#[derive(Debug, Clone, Default)]
pub struct BagModel {
    documents: usize,
    frequencies: FxHashMap<String, f64>,
}

impl BagModel {
    pub fn new() -> Self {
        BagModel::default()
    }

    pub fn from_text(text: &str) -> Self {
        let mut model = BagModel::new();
        model.index(text);
        model
    }

    /// Indexes one document into the bag.
    pub fn index(&mut self, text: &str) {
        self.documents += 1;
        for token in text.split_whitespace() {
            *self.frequencies.entry(token.to_lowercase()).or_insert(0.0) += 1.0;
        }
    }

    fn norm(&self) -> f64 {
        self.frequencies.values().map(|f| f * f).sum::<f64>().sqrt()
    }
}

impl TextModel for BagModel {
    fn document_count(&self) -> usize {
        self.documents
    }

    fn similarity(&self, other: &Self) -> f64 {
        let (small, large) = if self.frequencies.len() <= other.frequencies.len() {
            (self, other)
        } else {
            (other, self)
        };
        let mut dot = 0.0;
        for (token, frequency) in &small.frequencies {
            if let Some(other_frequency) = large.frequencies.get(token) {
                dot += frequency * other_frequency;
            }
        }
        let denominator = self.norm() * other.norm();
        if denominator == 0.0 {
            0.0
        } else {
            dot / denominator
        }
    }
}
