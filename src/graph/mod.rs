//! Counterparty relationship graph and structural scoring

pub mod builder;
pub mod scorer;

pub use builder::{EdgeAttributes, RelationshipGraph};
pub use scorer::{NodeScore, StructuralScorer, StructuralScores};
