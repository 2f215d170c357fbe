//! PromptEvo core data models.
//!
//! This crate defines the data structures shared by the evolutionary prompt
//! optimization engine: candidates and their metrics, the fixed criteria set,
//! evaluation records, configuration, errors and the external collaborator
//! contracts.

#![warn(missing_docs)]

// Core identities
mod id;

// Scoring model
mod criteria;
mod candidate;
mod record;

// Configuration and errors
mod config;
mod error;

/// Contracts for external collaborators.
pub mod external;

// Re-exports
pub use id::*;

pub use criteria::{Criterion, CriteriaVector, CRITERIA_COUNT};
pub use candidate::{Candidate, CreationMethod, OffspringScore, PerformanceMetrics};
pub use record::{EvaluationOutcome, EvaluationRecord, EvaluationScores};

pub use config::OptimizerConfig;
pub use error::{ConfigError, ConsistencyError, ExternalError, OptimizerError, Service};

pub use external::{
    AssessmentOracle, ContextSnapshot, DialogueSimulator, GenerativeMutator, Milestone,
    SimulationOptions, Transcript, Turn,
};

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;
