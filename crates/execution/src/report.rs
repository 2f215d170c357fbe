//! Run results.

use crate::scheduler::GenerationReport;
use promptevo_core::{Candidate, CandidateId, EvaluationRecord};
use promptevo_evolution::ParetoFrontier;
use promptevo_storage::Lineage;
use serde::{Deserialize, Serialize};

/// The best candidate as of the end of one generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestSnapshot {
    /// Generation that just finished
    pub generation: u32,
    /// Best candidate
    pub candidate_id: CandidateId,
    /// Its display name
    pub name: String,
    /// Its text
    pub text: String,
    /// Its aggregate improvement at that point
    pub avg_improvement: f64,
    /// Successful evaluations it had at that point
    pub test_count: u32,
}

impl BestSnapshot {
    /// Snapshot `candidate` for `generation`.
    pub fn of(generation: u32, candidate: &Candidate) -> Self {
        Self {
            generation,
            candidate_id: candidate.id,
            name: candidate.name.clone(),
            text: candidate.text.clone(),
            avg_improvement: candidate.metrics.avg_improvement,
            test_count: candidate.metrics.test_count,
        }
    }
}

/// Everything an optimization run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationReport {
    /// Every candidate ever created, in creation order
    pub candidates: Vec<Candidate>,
    /// Final Pareto frontier with dominator counts
    pub frontier: ParetoFrontier,
    /// Per-generation counters
    pub generations: Vec<GenerationReport>,
    /// Best candidate after each generation
    pub best_per_generation: Vec<BestSnapshot>,
    /// Every evaluation attempt, in completion order
    pub history: Vec<EvaluationRecord>,
    /// Whether a stop request ended the run before the generation limit
    pub stopped_early: bool,
    /// External call attempts made, retries included
    pub total_attempts: u64,
}

impl OptimizationReport {
    /// Final best candidate.
    pub fn best(&self) -> Option<&Candidate> {
        let id = self.frontier.best()?;
        self.candidate(id)
    }

    /// Look up a candidate by id.
    pub fn candidate(&self, id: CandidateId) -> Option<&Candidate> {
        self.candidates.iter().find(|c| c.id == id)
    }

    /// Frontier members, best first.
    pub fn frontier_candidates(&self) -> Vec<&Candidate> {
        self.frontier.members.iter().filter_map(|id| self.candidate(*id)).collect()
    }

    /// Text rendering of the genealogy.
    pub fn family_tree(&self, max_depth: usize) -> String {
        Lineage::new(&self.candidates).family_tree(max_depth)
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
