//! Candidate model - one prompt-text variant under evaluation.

use crate::criteria::CriteriaVector;
use crate::id::CandidateId;
use crate::Time;
use serde::{Deserialize, Serialize};

/// How a candidate came into existence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreationMethod {
    /// Supplied by the caller at run start
    Seed,
    /// Rewritten from one parent
    Mutation,
    /// Combined from two parents
    Crossover,
}

impl std::fmt::Display for CreationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CreationMethod::Seed => write!(f, "seed"),
            CreationMethod::Mutation => write!(f, "mutation"),
            CreationMethod::Crossover => write!(f, "crossover"),
        }
    }
}

/// Realized performance of a candidate across persona evaluations.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// Running mean improvement per criterion
    pub per_criterion: CriteriaVector,

    /// Running mean of the aggregate improvement
    pub avg_improvement: f64,

    /// Successful evaluations folded into the means
    pub test_count: u32,

    /// Evaluations that were attempted but failed
    pub failed_count: u32,

    /// When the last successful evaluation was folded in
    pub last_evaluated: Option<Time>,
}

impl PerformanceMetrics {
    /// Fold one successful evaluation into the running means.
    pub fn fold(&mut self, improvement: &CriteriaVector) {
        self.per_criterion.fold_mean(improvement, self.test_count);
        let n = f64::from(self.test_count + 1);
        self.avg_improvement += (improvement.mean() - self.avg_improvement) / n;
        self.test_count += 1;
        self.last_evaluated = Some(chrono::Utc::now());
    }

    /// Account for a failed evaluation attempt.
    pub fn record_failure(&mut self) {
        self.failed_count += 1;
    }

    /// Number of evaluations attempted, successful or not.
    pub fn attempted(&self) -> u32 {
        self.test_count + self.failed_count
    }

    /// Whether at least one evaluation succeeded.
    pub fn is_evaluated(&self) -> bool {
        self.test_count > 0
    }
}

/// Advisory performance/diversity score computed for an offspring at creation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OffspringScore {
    /// How well parent strengths are preserved (0.0 to 1.0)
    pub performance: f64,
    /// How different the text is from the existing population (0.0 to 1.0)
    pub diversity: f64,
    /// `0.6 * performance + 0.4 * diversity`
    pub combined: f64,
}

impl OffspringScore {
    /// Combine the two component scores.
    pub fn new(performance: f64, diversity: f64) -> Self {
        Self {
            performance,
            diversity,
            combined: 0.6 * performance + 0.4 * diversity,
        }
    }
}

/// A prompt candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    /// Unique identifier
    pub id: CandidateId,

    /// Genealogy display name (e.g. "G2C01 from Genesis & G1M00")
    pub name: String,

    /// The prompt text
    pub text: String,

    /// Generation the candidate was created in
    pub generation: u32,

    /// Zero, one or two parents
    pub parents: Vec<CandidateId>,

    /// How it was created
    pub method: CreationMethod,

    /// Whether the text is a deterministic fallback rather than generated output
    pub fallback: bool,

    /// Advisory offspring score, if computed
    pub advisory: Option<OffspringScore>,

    /// Realized metrics
    pub metrics: PerformanceMetrics,

    /// When created
    pub created_at: Time,
}

impl Candidate {
    /// Create a new, unevaluated candidate.
    pub fn new(
        name: impl Into<String>,
        text: impl Into<String>,
        generation: u32,
        parents: Vec<CandidateId>,
        method: CreationMethod,
    ) -> Self {
        Self {
            id: CandidateId::new(),
            name: name.into(),
            text: text.into(),
            generation,
            parents,
            method,
            fallback: false,
            advisory: None,
            metrics: PerformanceMetrics::default(),
            created_at: chrono::Utc::now(),
        }
    }

    /// Mark the text as a fallback.
    pub fn with_fallback(mut self, fallback: bool) -> Self {
        self.fallback = fallback;
        self
    }

    /// Attach an advisory score.
    pub fn with_advisory(mut self, advisory: Option<OffspringScore>) -> Self {
        self.advisory = advisory;
        self
    }

    /// Objective vector used by selection; zero-filled when never evaluated.
    pub fn objectives(&self) -> &CriteriaVector {
        &self.metrics.per_criterion
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_fold_counts_and_averages() {
        let mut metrics = PerformanceMetrics::default();
        metrics.fold(&CriteriaVector::splat(0.25));
        metrics.fold(&CriteriaVector::splat(0.75));
        assert_eq!(metrics.test_count, 2);
        assert!((metrics.avg_improvement - 0.5).abs() < 1e-12);
        assert!(metrics.last_evaluated.is_some());
    }

    #[test]
    fn test_failures_do_not_touch_test_count() {
        let mut metrics = PerformanceMetrics::default();
        metrics.fold(&CriteriaVector::splat(0.25));
        metrics.record_failure();
        assert_eq!(metrics.test_count, 1);
        assert_eq!(metrics.failed_count, 1);
        assert_eq!(metrics.attempted(), 2);
        assert!((metrics.avg_improvement - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_offspring_score_weights() {
        let score = OffspringScore::new(1.0, 0.5);
        assert!((score.combined - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_new_candidate_is_unevaluated() {
        let c = Candidate::new("Genesis", "You are a coach.", 0, vec![], CreationMethod::Seed);
        assert!(!c.metrics.is_evaluated());
        assert!(!c.fallback);
        assert_eq!(c.objectives(), &CriteriaVector::zeros());
    }
}
