//! Evaluation records - atoms of the optimization history.

use crate::criteria::CriteriaVector;
use crate::error::ExternalError;
use crate::id::{CandidateId, PersonaId, RecordId};
use crate::Time;
use serde::{Deserialize, Serialize};

/// Scores and improvement from a successful evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationScores {
    /// Baseline ordinals
    pub pre: Vec<u8>,
    /// Post-conversation ordinals
    pub post: Vec<u8>,
    /// Normalized per-criterion improvement
    pub improvement: CriteriaVector,
    /// Mean of `improvement`
    pub aggregate: f64,
    /// Conversation turns observed
    pub turns: usize,
    /// Milestones reported by the simulator
    pub milestones: usize,
}

/// How an evaluation attempt ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EvaluationOutcome {
    /// Scores were obtained
    Succeeded(EvaluationScores),
    /// The attempt was given up on
    Failed {
        /// The last error seen
        error: ExternalError,
    },
}

/// One (candidate, persona) evaluation, successful or not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    /// Unique identifier
    pub id: RecordId,

    /// Candidate evaluated
    pub candidate_id: CandidateId,

    /// Persona used
    pub persona_id: PersonaId,

    /// Generation in which the evaluation ran
    pub generation: u32,

    /// Result
    pub outcome: EvaluationOutcome,

    /// Qualitative reflection lines for later analysis
    pub reflection: Vec<String>,

    /// External call attempts spent, retries included
    pub attempts: u32,

    /// When the evaluation started
    pub started_at: Time,

    /// When the evaluation finished
    pub finished_at: Time,
}

impl EvaluationRecord {
    /// Whether the evaluation produced scores.
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, EvaluationOutcome::Succeeded(_))
    }

    /// Scores, if the evaluation succeeded.
    pub fn scores(&self) -> Option<&EvaluationScores> {
        match &self.outcome {
            EvaluationOutcome::Succeeded(scores) => Some(scores),
            EvaluationOutcome::Failed { .. } => None,
        }
    }
}
