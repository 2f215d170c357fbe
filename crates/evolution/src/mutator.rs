//! Mutation: rewrite one parent to shore up its weakest criteria.

use crate::diversity::score_offspring;
use crate::operator::{accept_or_fallback, OperatorOutput};
use crate::profile::PerformanceProfile;
use promptevo_core::{Candidate, Criterion, GenerativeMutator};
use std::sync::Arc;
use tracing::debug;

/// Number of weakest criteria named in the instruction.
const WEAKEST: usize = 5;

/// Number of strongest criteria named in the instruction.
const STRONGEST: usize = 3;

/// Mutation operator.
pub struct Mutator {
    generator: Arc<dyn GenerativeMutator>,
}

impl Mutator {
    /// Create a mutator backed by `generator`.
    pub fn new(generator: Arc<dyn GenerativeMutator>) -> Self {
        Self { generator }
    }

    /// Produce one mutated text from `parent`.
    ///
    /// `existing` is the recent population used for the advisory diversity
    /// score. On any failure the parent's text is returned unchanged.
    pub async fn mutate(&self, parent: &Candidate, existing: &[String]) -> OperatorOutput {
        let profile = PerformanceProfile::with_counts(parent, STRONGEST, WEAKEST);
        let instruction = mutation_instruction(&profile);
        debug!("Mutating {} ({})", parent.id, parent.name);

        let reply = self.generator.generate(&instruction).await;
        let (text, fallback) = accept_or_fallback("Mutation", reply, || parent.text.clone());
        let advisory = score_offspring(&text, &profile, &profile, existing);

        OperatorOutput {
            text,
            fallback,
            advisory: Some(advisory),
        }
    }
}

fn scored(criteria: &[(Criterion, f64)]) -> String {
    if criteria.is_empty() {
        return "none identified".to_string();
    }
    criteria
        .iter()
        .map(|(c, v)| format!("{c}: {v:.3}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Instruction asking the generator for an improved version of a prompt.
pub fn mutation_instruction(profile: &PerformanceProfile) -> String {
    // Strongest last, matching the ascending listing of the weak areas
    let mut strongest = profile.strengths.clone();
    strongest.reverse();

    format!(
        r#"You are an expert prompt engineer improving a social skills coaching system prompt.

CURRENT SYSTEM PROMPT: "{text}"
CURRENT APPROACH: {approach}

WEAKEST PERFORMING AREAS (need improvement):
{weak}

STRONGEST PERFORMING AREAS (maintain these):
{strong}

TASK: Create an improved system prompt that:
1. MUST start with "You are..." (system prompt format)
2. Addresses the weakest performing areas
3. Preserves the strongest performing areas
4. Improves overall effectiveness for social skills coaching

Respond with ONLY the improved system prompt text, no explanations."#,
        text = profile.text,
        approach = profile.approach_label(),
        weak = scored(&profile.weaknesses),
        strong = scored(&strongest),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use promptevo_core::{CreationMethod, CriteriaVector, ExternalError, Service};
    use crate::operator::FallbackReason;
    use crate::validation::ValidationFailure;

    struct Reply(Result<String, ExternalError>);

    #[async_trait]
    impl GenerativeMutator for Reply {
        async fn generate(&self, _instruction: &str) -> Result<String, ExternalError> {
            self.0.clone()
        }
    }

    fn parent() -> Candidate {
        Candidate::new("Genesis", "You are a calm, supportive coach.", 0, vec![], CreationMethod::Seed)
    }

    #[tokio::test]
    async fn test_mutation_accepts_valid_reply() {
        let mutator = Mutator::new(Arc::new(Reply(Ok(
            "\"You are a patient coach who asks what students feel.\"".to_string(),
        ))));
        let out = mutator.mutate(&parent(), &[]).await;
        assert_eq!(out.text, "You are a patient coach who asks what students feel.");
        assert!(!out.is_fallback());
        assert_eq!(out.advisory.map(|a| a.diversity), Some(1.0));
    }

    #[tokio::test]
    async fn test_invalid_reply_falls_back_to_parent_text() {
        let mutator = Mutator::new(Arc::new(Reply(Ok("Be supportive.".to_string()))));
        let out = mutator.mutate(&parent(), &[]).await;
        assert_eq!(out.text, "You are a calm, supportive coach.");
        assert!(matches!(
            out.fallback,
            Some(FallbackReason::Validation(ValidationFailure::TooShort { .. }))
        ));
    }

    #[tokio::test]
    async fn test_external_failure_falls_back_to_parent_text() {
        let mutator = Mutator::new(Arc::new(Reply(Err(ExternalError::rejected(
            Service::Generator,
            "quota exhausted",
        )))));
        let out = mutator.mutate(&parent(), &[]).await;
        assert_eq!(out.text, parent().text);
        assert!(matches!(out.fallback, Some(FallbackReason::External(_))));
    }

    #[test]
    fn test_instruction_lists_weak_and_strong_areas() {
        let mut candidate = parent();
        let mut v = CriteriaVector::zeros();
        v.set(Criterion::BuildConfidence, 0.75);
        v.set(Criterion::StayCalm, -0.25);
        candidate.metrics.fold(&v);

        let profile = PerformanceProfile::with_counts(&candidate, STRONGEST, WEAKEST);
        let instruction = mutation_instruction(&profile);
        assert!(instruction.contains("CURRENT SYSTEM PROMPT: \"You are a calm, supportive coach.\""));
        assert!(instruction.contains("stay_calm: -0.250"));
        assert!(instruction.contains("build_confidence: 0.750"));
        assert!(instruction.contains("CURRENT APPROACH: supportive"));
    }

    #[test]
    fn test_unevaluated_parent_has_no_listed_areas() {
        let profile = PerformanceProfile::with_counts(&parent(), STRONGEST, WEAKEST);
        let instruction = mutation_instruction(&profile);
        assert!(instruction.contains("(need improvement):\nnone identified"));
        assert!(instruction.contains("(maintain these):\nnone identified"));
    }
}
