use serde::{Deserialize, Serialize};

use crate::error::MetablockError;
use crate::weighting::WeightingScheme;

/// Run configuration for one meta-blocking pass. The scheme is optional at
/// the type level (it may be absent in a deserialized config) and checked by
/// `validate` before any processing starts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetablockConfig {
    /// Edge-weighting scheme. A run without one is a configuration error.
    pub scheme: Option<WeightingScheme>,
    /// Total entity count across both datasets.
    pub num_entities: usize,
    /// Boundary between dataset 1 and dataset 2; zero for dirty ER.
    pub dataset_limit: usize,
    /// Explicit per-entity cardinality bound. When unset the bound is
    /// derived from the block collection.
    pub cardinality: Option<usize>,
}

impl MetablockConfig {
    pub fn new(scheme: WeightingScheme, num_entities: usize, dataset_limit: usize) -> Self {
        MetablockConfig {
            scheme: Some(scheme),
            num_entities,
            dataset_limit,
            cardinality: None,
        }
    }

    pub fn with_cardinality(mut self, cardinality: usize) -> Self {
        self.cardinality = Some(cardinality);
        self
    }

    pub fn is_clean_clean(&self) -> bool {
        self.dataset_limit != 0
    }

    /// Fail-fast gate for the whole run: every configuration problem
    /// surfaces here, before any scan starts.
    pub fn validate(&self) -> Result<WeightingScheme, MetablockError> {
        let scheme = self
            .scheme
            .ok_or_else(|| MetablockError::Config("no weighting scheme set".into()))?;
        if self.num_entities == 0 {
            return Err(MetablockError::Config("entity count is zero".into()));
        }
        if self.num_entities < self.dataset_limit {
            return Err(MetablockError::Config(format!(
                "dataset limit {} exceeds entity count {}",
                self.dataset_limit, self.num_entities
            )));
        }
        if let Some(0) = self.cardinality {
            return Err(MetablockError::Config("cardinality bound is zero".into()));
        }
        Ok(scheme)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_scheme_is_rejected() {
        let config = MetablockConfig {
            scheme: None,
            num_entities: 4,
            dataset_limit: 2,
            cardinality: None,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_boundary_is_rejected() {
        let config = MetablockConfig::new(WeightingScheme::Cbs, 2, 5);
        assert!(config.validate().is_err());
        assert!(MetablockConfig::new(WeightingScheme::Cbs, 0, 0).validate().is_err());
    }

    #[test]
    fn test_valid_config_yields_scheme() {
        let config = MetablockConfig::new(WeightingScheme::Js, 4, 2).with_cardinality(3);
        assert_eq!(config.validate().unwrap(), WeightingScheme::Js);
    }

    #[test]
    fn test_zero_cardinality_is_rejected() {
        let config = MetablockConfig::new(WeightingScheme::Js, 4, 2).with_cardinality(0);
        assert!(config.validate().is_err());
    }
}
