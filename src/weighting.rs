use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Edge-weighting scheme for the blocking graph, fixed for a whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "UPPERCASE")]
pub enum WeightingScheme {
    /// Block-weighted co-occurrence: each shared block contributes the
    /// reciprocal of its comparison count.
    Arcs,
    /// Common-blocks count.
    Cbs,
    /// CBS dampened by each endpoint's block frequency.
    Ecbs,
    /// Jaccard similarity over block-membership sets.
    Js,
    /// JS dampened by each endpoint's distinct-comparison count.
    Ejs,
    /// Weighted Jaccard over IDF-weighted block memberships.
    Wjs,
}

impl WeightingScheme {
    /// EJS needs the distinct-comparison statistics pass.
    pub fn needs_comparison_statistics(self) -> bool {
        self == WeightingScheme::Ejs
    }

    /// WJS needs the per-entity IDF-total pass.
    pub fn needs_weight_statistics(self) -> bool {
        self == WeightingScheme::Wjs
    }
}

impl fmt::Display for WeightingScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WeightingScheme::Arcs => "ARCS",
            WeightingScheme::Cbs => "CBS",
            WeightingScheme::Ecbs => "ECBS",
            WeightingScheme::Js => "JS",
            WeightingScheme::Ejs => "EJS",
            WeightingScheme::Wjs => "WJS",
        };
        write!(f, "{}", name)
    }
}
