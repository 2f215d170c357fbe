//! Error taxonomy shared across the workspace.

use crate::id::CandidateId;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// External collaborator a call was made to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Service {
    /// Dialogue simulator
    Simulator,
    /// Assessment oracle
    Oracle,
    /// Generative mutator
    Generator,
}

impl std::fmt::Display for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Service::Simulator => write!(f, "simulator"),
            Service::Oracle => write!(f, "oracle"),
            Service::Generator => write!(f, "generator"),
        }
    }
}

/// Failure of a call to an external collaborator.
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize, Deserialize)]
pub enum ExternalError {
    /// The call did not finish within its timeout
    #[error("{service} call timed out after {elapsed:?}")]
    Timeout {
        /// Which collaborator
        service: Service,
        /// How long we waited
        elapsed: Duration,
    },

    /// Transport or upstream API failure
    #[error("{service} transport error: {message}")]
    Transport {
        /// Which collaborator
        service: Service,
        /// Error message
        message: String,
    },

    /// The request or response was rejected (malformed persona, bad scores)
    #[error("{service} rejected the request: {message}")]
    Rejected {
        /// Which collaborator
        service: Service,
        /// Error message
        message: String,
    },
}

impl ExternalError {
    /// Shorthand for a transport failure.
    pub fn transport(service: Service, message: impl Into<String>) -> Self {
        Self::Transport { service, message: message.into() }
    }

    /// Shorthand for a rejection.
    pub fn rejected(service: Service, message: impl Into<String>) -> Self {
        Self::Rejected { service, message: message.into() }
    }

    /// Which collaborator failed.
    pub fn service(&self) -> Service {
        match self {
            Self::Timeout { service, .. }
            | Self::Transport { service, .. }
            | Self::Rejected { service, .. } => *service,
        }
    }

    /// Whether retrying may help.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Transport { .. })
    }
}

/// Invalid configuration, fatal at construction.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// A size or count must be strictly positive
    #[error("{field} must be greater than zero")]
    NotPositive {
        /// Offending option
        field: &'static str,
    },

    /// A rate or weight is outside its range
    #[error("{field} must be within [{min}, {max}], got {value}")]
    OutOfRange {
        /// Offending option
        field: &'static str,
        /// Supplied value
        value: f64,
        /// Lower bound
        min: f64,
        /// Upper bound
        max: f64,
    },

    /// Crossover and mutation rates do not describe a usable split
    #[error("mutation_rate + crossover_rate must be in (0, 1], got {sum}")]
    RateSum {
        /// The sum of both rates
        sum: f64,
    },

    /// Score range is empty or starts below one
    #[error("score range {min}..={max} is invalid")]
    ScoreRange {
        /// Lowest ordinal
        min: u8,
        /// Highest ordinal
        max: u8,
    },

    /// A run needs at least one seed prompt
    #[error("at least one seed prompt is required")]
    NoSeeds,

    /// A run needs at least one persona
    #[error("at least one persona is required")]
    NoPersonas,

    /// The configuration document could not be parsed
    #[error("invalid configuration document: {0}")]
    Parse(String),
}

/// Store inconsistency, indicating a programming defect.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConsistencyError {
    /// A referenced candidate is not in the store
    #[error("candidate {0} is not in the store")]
    UnknownCandidate(CandidateId),

    /// Parent count does not match the creation method
    #[error("{method} child cannot have {count} parent(s)")]
    ParentCount {
        /// Creation method name
        method: String,
        /// Number of parents supplied
        count: usize,
    },
}

/// Fatal error aborting an optimization run.
#[derive(Debug, thiserror::Error)]
pub enum OptimizerError {
    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Store corruption or programming defect
    #[error("data consistency error: {0}")]
    Consistency(#[from] ConsistencyError),
}
