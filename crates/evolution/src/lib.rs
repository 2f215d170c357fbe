//! Evolution layer - genetic operators and selection.
//!
//! Mutation and crossover delegate text generation to a
//! [`GenerativeMutator`](promptevo_core::GenerativeMutator), validate what
//! comes back, and fall back to deterministic text when it is unusable.
//! Selection keeps the Pareto frontier over per-criterion improvements.

#![warn(missing_docs, unused_crate_dependencies)]

mod text;
mod validation;
mod profile;
mod diversity;
mod operator;
mod mutator;
mod crossover;
mod pareto;

pub use text::{jaccard, words};
pub use validation::{clean, validate, ValidationFailure, MIN_LENGTH, ROLE_PHRASE, ROLE_WINDOW};
pub use profile::{
    classify, ApproachAnalysis, CoachingApproach, PerformanceProfile, StructureFeatures,
    STRENGTH_COUNT, WEAKNESS_COUNT,
};
pub use diversity::{
    diversity_score, performance_score, recent_texts, score_offspring, PopulationPatterns,
};
pub use operator::{FallbackReason, OperatorOutput};
pub use mutator::{mutation_instruction, Mutator};
pub use crossover::{crossover_instruction, Crossover};
pub use pareto::{dominates, Objectives, ParetoFrontier, ParetoSelector};
