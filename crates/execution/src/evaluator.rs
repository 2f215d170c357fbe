//! Fitness evaluation: pre-assessment, conversation, post-assessment.

use crate::gate::CallGate;
use promptevo_core::{
    AssessmentOracle, Candidate, ContextSnapshot, Criterion, CriteriaVector, DialogueSimulator,
    EvaluationOutcome, EvaluationRecord, EvaluationScores, ExternalError, OptimizerConfig,
    PersonaId, RecordId, Service, SimulationOptions, Transcript, CRITERIA_COUNT,
};
use std::sync::Arc;
use tracing::{debug, warn};

/// Conversations with at least this many turns count as engaged.
const ENGAGED_TURNS: usize = 4;

/// Scores one candidate against one persona.
///
/// Every external call goes through the shared [`CallGate`].
pub struct FitnessEvaluator {
    simulator: Arc<dyn DialogueSimulator>,
    oracle: Arc<dyn AssessmentOracle>,
    gate: Arc<CallGate>,
    options: SimulationOptions,
    score_min: u8,
    score_max: u8,
}

impl FitnessEvaluator {
    /// Create an evaluator.
    pub fn new(
        simulator: Arc<dyn DialogueSimulator>,
        oracle: Arc<dyn AssessmentOracle>,
        gate: Arc<CallGate>,
        config: &OptimizerConfig,
    ) -> Self {
        Self {
            simulator,
            oracle,
            gate,
            options: SimulationOptions {
                rounds: config.simulation_rounds,
                scenario: config.scenario.clone(),
            },
            score_min: config.score_min,
            score_max: config.score_max,
        }
    }

    /// Evaluate `candidate` against `persona` and describe the attempt.
    ///
    /// Failures are part of the record, never an `Err`; the caller decides
    /// how to account for them.
    pub async fn evaluate(&self, candidate: &Candidate, persona: &PersonaId, generation: u32) -> EvaluationRecord {
        let started_at = chrono::Utc::now();
        let mut attempts = 0;
        let result = self.run(candidate, persona, &mut attempts).await;
        let finished_at = chrono::Utc::now();

        let (outcome, reflection) = match result {
            Ok(scores) => {
                debug!(
                    "Evaluated {} with {}: aggregate {:+.3}",
                    candidate.id, persona, scores.aggregate
                );
                let reflection = reflect(&scores);
                (EvaluationOutcome::Succeeded(scores), reflection)
            }
            Err(error) => {
                warn!("Evaluation of {} with {} failed: {}", candidate.id, persona, error);
                (EvaluationOutcome::Failed { error }, Vec::new())
            }
        };

        EvaluationRecord {
            id: RecordId::new(),
            candidate_id: candidate.id,
            persona_id: persona.clone(),
            generation,
            outcome,
            reflection,
            attempts,
            started_at,
            finished_at,
        }
    }

    async fn run(
        &self,
        candidate: &Candidate,
        persona: &PersonaId,
        attempts: &mut u32,
    ) -> Result<EvaluationScores, ExternalError> {
        let pre = self.assess(persona, &ContextSnapshot::Baseline, attempts).await?;

        let outcome = self
            .gate
            .call(Service::Simulator, || {
                self.simulator.simulate(&candidate.text, persona, &self.options)
            })
            .await;
        *attempts += outcome.attempts;
        let transcript: Transcript = outcome.result?;

        let turns = transcript.turns.len();
        let milestones = transcript.milestones.len();
        let post = self
            .assess(persona, &ContextSnapshot::AfterConversation { transcript }, attempts)
            .await?;

        let improvement = self.improvement(&pre, &post);
        Ok(EvaluationScores {
            aggregate: improvement.mean(),
            improvement,
            pre,
            post,
            turns,
            milestones,
        })
    }

    async fn assess(
        &self,
        persona: &PersonaId,
        snapshot: &ContextSnapshot,
        attempts: &mut u32,
    ) -> Result<Vec<u8>, ExternalError> {
        let outcome = self
            .gate
            .call(Service::Oracle, || self.oracle.assess(persona, snapshot))
            .await;
        *attempts += outcome.attempts;
        let scores = outcome.result?;
        self.check_scores(&scores)?;
        Ok(scores)
    }

    fn check_scores(&self, scores: &[u8]) -> Result<(), ExternalError> {
        if scores.len() != CRITERIA_COUNT {
            return Err(ExternalError::rejected(
                Service::Oracle,
                format!("expected {} scores, got {}", CRITERIA_COUNT, scores.len()),
            ));
        }
        if let Some(bad) = scores.iter().find(|s| !(self.score_min..=self.score_max).contains(*s)) {
            return Err(ExternalError::rejected(
                Service::Oracle,
                format!("score {} outside {}..={}", bad, self.score_min, self.score_max),
            ));
        }
        Ok(())
    }

    /// Per-criterion `(post - pre) / score_max`.
    pub fn improvement(&self, pre: &[u8], post: &[u8]) -> CriteriaVector {
        let mut v = CriteriaVector::zeros();
        for ((criterion, before), after) in Criterion::ALL.iter().zip(pre).zip(post) {
            v.set(*criterion, (f64::from(*after) - f64::from(*before)) / f64::from(self.score_max));
        }
        v
    }
}

/// Natural-language observations about one evaluation.
pub fn reflect(scores: &EvaluationScores) -> Vec<String> {
    let mut lines = Vec::new();

    let raw_delta = scores
        .pre
        .iter()
        .zip(&scores.post)
        .map(|(pre, post)| f64::from(*post) - f64::from(*pre))
        .sum::<f64>()
        / scores.pre.len().max(1) as f64;

    lines.push(
        if raw_delta > 0.5 {
            "This prompt successfully facilitated significant improvement in social skills"
        } else if raw_delta > 0.0 {
            "This prompt showed moderate effectiveness in improving social skills"
        } else {
            "This prompt did not effectively improve social skills"
        }
        .to_string(),
    );

    lines.push(
        if scores.turns >= ENGAGED_TURNS {
            "The conversation maintained good engagement throughout the session"
        } else {
            "The conversation may have been too brief or lacked engagement"
        }
        .to_string(),
    );

    let improved: Vec<&str> = Criterion::ALL
        .iter()
        .zip(scores.pre.iter().zip(&scores.post))
        .filter(|(_, (pre, post))| post > pre)
        .take(3)
        .map(|(c, _)| c.as_str())
        .collect();
    if !improved.is_empty() {
        lines.push(format!("Specific improvements observed in: {}", improved.join(", ")));
    }

    lines
}
