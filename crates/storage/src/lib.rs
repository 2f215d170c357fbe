//! Candidate storage for PromptEvo.
//!
//! This crate provides the in-memory candidate store, the append-only
//! evaluation history and lineage queries over stored candidates.

#![warn(missing_docs)]

pub mod candidate_store;
pub mod history;
pub mod lineage;

pub use candidate_store::{CandidateStore, ChildSpec, Result};
pub use history::OptimizationHistory;
pub use lineage::{base_name, AncestryStep, Lineage, Namer};
