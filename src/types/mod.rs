//! Type definitions for the analysis pipeline

pub mod result;
pub mod transaction;

pub use result::{AnalysisResult, AnomalyDetail, EdgeView, GraphView, NodeView, Summary};
pub use transaction::{CounterpartyId, TransactionRecord};
