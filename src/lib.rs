pub mod block;
pub mod comparison;
pub mod config;
pub mod entity_index;
pub mod error;
pub mod pruning;
pub mod scan;
pub mod statistics;
pub mod text_model;
pub mod weighting;

pub use error::*;
