//! Crossover: blend two parents while steering away from crowded patterns.

use crate::diversity::{score_offspring, PopulationPatterns};
use crate::operator::{accept_or_fallback, OperatorOutput};
use crate::profile::{CoachingApproach, PerformanceProfile};
use promptevo_core::{Candidate, Criterion, GenerativeMutator};
use std::sync::Arc;
use tracing::debug;

/// Crossover operator.
pub struct Crossover {
    generator: Arc<dyn GenerativeMutator>,
    diversity_weight: f64,
}

impl Crossover {
    /// Create a crossover operator backed by `generator`.
    pub fn new(generator: Arc<dyn GenerativeMutator>, diversity_weight: f64) -> Self {
        Self {
            generator,
            diversity_weight,
        }
    }

    /// Produce one offspring text from two parents.
    ///
    /// `recent` holds the non-fallback texts used for pattern analysis and the
    /// advisory diversity score. Passing the same candidate twice is a
    /// self-paired crossover.
    pub async fn cross(&self, p1: &Candidate, p2: &Candidate, recent: &[String]) -> OperatorOutput {
        let profile1 = PerformanceProfile::build(p1);
        let profile2 = PerformanceProfile::build(p2);
        let patterns = PopulationPatterns::analyze(recent);
        let instruction = crossover_instruction(&profile1, &profile2, &patterns, self.diversity_weight);
        debug!("Crossing {} with {}", p1.id, p2.id);

        let reply = self.generator.generate(&instruction).await;
        let (text, fallback) = accept_or_fallback("Crossover", reply, || {
            if p1.id == p2.id {
                p1.text.clone()
            } else {
                format!("{} {}", p1.text, p2.text)
            }
        });
        let advisory = score_offspring(&text, &profile1, &profile2, recent);

        OperatorOutput {
            text,
            fallback,
            advisory: Some(advisory),
        }
    }
}

fn criteria_list(criteria: &[Criterion]) -> String {
    if criteria.is_empty() {
        return "general effectiveness".to_string();
    }
    criteria.iter().map(|c| c.as_str()).collect::<Vec<_>>().join(", ")
}

fn strategy_list(criteria: &[Criterion]) -> String {
    if criteria.is_empty() {
        return "general effectiveness".to_string();
    }
    criteria
        .iter()
        .map(|c| c.strategy_phrase())
        .collect::<Vec<_>>()
        .join("; ")
}

fn approach_list(approaches: &[CoachingApproach]) -> String {
    if approaches.is_empty() {
        return "none identified".to_string();
    }
    approaches.iter().map(|a| a.as_str()).collect::<Vec<_>>().join(", ")
}

fn or_none(items: &[String], n: usize) -> String {
    if items.is_empty() {
        "none detected".to_string()
    } else {
        items.iter().take(n).cloned().collect::<Vec<_>>().join(", ")
    }
}

fn diversity_section(patterns: &PopulationPatterns, weight: f64) -> String {
    if patterns.is_empty() || weight <= 0.0 {
        return "DIVERSITY REQUIREMENT:\n\
- Create a unique approach not seen before\n\
- Vary the tone, structure, and focus from common patterns"
            .to_string();
    }

    let verb = if weight >= 0.67 {
        "AVOID"
    } else if weight >= 0.34 {
        "Avoid"
    } else {
        "Where possible, avoid"
    };

    format!(
        "DIVERSITY REQUIREMENT (Weight: {weight:.1}):\n\
- {verb} these overused words: {words}\n\
- {verb} these common structures: {structures}\n\
- {verb} these common themes: {themes}\n\
- Vary sentence structure: questions vs statements vs invitations",
        words = or_none(&patterns.common_words, 3),
        structures = or_none(&patterns.common_structures, 2),
        themes = or_none(&patterns.common_themes, 2),
    )
}

/// Instruction asking the generator to combine two parents.
pub fn crossover_instruction(
    p1: &PerformanceProfile,
    p2: &PerformanceProfile,
    patterns: &PopulationPatterns,
    diversity_weight: f64,
) -> String {
    let top1 = p1.top_criteria(3);
    let top2 = p2.top_criteria(3);
    let unique1: Vec<Criterion> = top1.iter().filter(|c| !top2.contains(c)).copied().collect();
    let unique2: Vec<Criterion> = top2.iter().filter(|c| !top1.contains(c)).copied().collect();
    let shared: Vec<Criterion> = top1.iter().filter(|c| top2.contains(c)).copied().collect();

    let scored = |profile: &PerformanceProfile| {
        if profile.strengths.is_empty() {
            return "none identified".to_string();
        }
        profile
            .strengths
            .iter()
            .take(3)
            .map(|(c, v)| format!("{c}: {v:.3}"))
            .collect::<Vec<_>>()
            .join(", ")
    };

    let target = p1.length.max(p2.length);

    format!(
        r#"You are an expert prompt engineer creating a child prompt that excels in both performance and diversity.

PARENT 1: "{t1}"
PARENT 1 TOP PERFORMING CRITERIA: {s1}
PARENT 1 EFFECTIVE PATTERN: {a1} approach, {c1}

PARENT 2: "{t2}"
PARENT 2 TOP PERFORMING CRITERIA: {s2}
PARENT 2 EFFECTIVE PATTERN: {a2} approach, {c2}

PERFORMANCE PRESERVATION:
- Parent 1 excels at: {u1}
- Parent 2 excels at: {u2}
- Both excel at: {sh}
- Strategies to keep: {strategies}

{diversity}

BALANCE REQUIREMENTS:
- MUST start with "You are..." (system prompt format)
- Preserve the assessment performance that made both parents successful
- Target length: {target} characters (+/-20%, {min} to {max})

Respond with ONLY the new prompt text, no explanations."#,
        t1 = p1.text,
        s1 = scored(p1),
        a1 = p1.approach_label(),
        c1 = approach_list(&p1.contributing),
        t2 = p2.text,
        s2 = scored(p2),
        a2 = p2.approach_label(),
        c2 = approach_list(&p2.contributing),
        u1 = criteria_list(&unique1),
        u2 = criteria_list(&unique2),
        sh = criteria_list(&shared),
        strategies = strategy_list(&[unique1.as_slice(), unique2.as_slice(), shared.as_slice()].concat()),
        diversity = diversity_section(patterns, diversity_weight),
        min = target * 4 / 5,
        max = target * 6 / 5,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::FallbackReason;
    use async_trait::async_trait;
    use promptevo_core::{CreationMethod, CriteriaVector, ExternalError, Service};
    use std::sync::Mutex;

    /// Records the last instruction and replies with a fixed result.
    struct Recording {
        reply: Result<String, ExternalError>,
        seen: Mutex<Vec<String>>,
    }

    impl Recording {
        fn new(reply: Result<String, ExternalError>) -> Self {
            Self {
                reply,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl GenerativeMutator for Recording {
        async fn generate(&self, instruction: &str) -> Result<String, ExternalError> {
            self.seen.lock().unwrap().push(instruction.to_string());
            self.reply.clone()
        }
    }

    fn seed(text: &str) -> Candidate {
        Candidate::new("Genesis", text, 0, vec![], CreationMethod::Seed)
    }

    fn timeout() -> ExternalError {
        ExternalError::Timeout {
            service: Service::Generator,
            elapsed: std::time::Duration::from_secs(60),
        }
    }

    #[tokio::test]
    async fn test_fallback_concatenates_parents() {
        let crossover = Crossover::new(Arc::new(Recording::new(Err(timeout()))), 0.7);
        let a = seed("You are a calm, supportive coach.");
        let b = seed("You are a practical mentor for teens.");

        let out = crossover.cross(&a, &b, &[]).await;
        assert_eq!(out.text, "You are a calm, supportive coach. You are a practical mentor for teens.");
        assert!(matches!(out.fallback, Some(FallbackReason::External(_))));
    }

    #[tokio::test]
    async fn test_self_paired_fallback_keeps_single_text() {
        let crossover = Crossover::new(Arc::new(Recording::new(Err(timeout()))), 0.7);
        let a = seed("You are a calm, supportive coach.");

        let first = crossover.cross(&a, &a, &[]).await;
        let second = crossover.cross(&a, &a, &[]).await;
        assert_eq!(first.text, "You are a calm, supportive coach.");
        assert_eq!(first.text, second.text);
        assert!(first.is_fallback());
    }

    #[tokio::test]
    async fn test_valid_reply_is_cleaned_and_scored() {
        let generator = Arc::new(Recording::new(Ok(
            "  'You are a curious guide who asks how students feel.'  ".to_string(),
        )));
        let crossover = Crossover::new(generator.clone(), 0.7);
        let a = seed("Be supportive and practical with students.");
        let b = seed("Be patient and practical when students struggle.");
        let recent = vec![a.text.clone(), b.text.clone()];

        let out = crossover.cross(&a, &b, &recent).await;
        assert_eq!(out.text, "You are a curious guide who asks how students feel.");
        assert!(out.fallback.is_none());
        let advisory = out.advisory.unwrap();
        assert!(advisory.diversity > 0.5);

        let seen = generator.seen.lock().unwrap();
        assert!(seen[0].contains("AVOID these overused words: practical, students"));
        assert!(seen[0].contains("AVOID these common structures: Be + adjective"));
    }

    #[test]
    fn test_instruction_splits_unique_and_shared_strengths() {
        let mut a = seed("You are a calm, supportive coach.");
        let mut b = seed("You are a practical mentor for teens who listens.");
        let mut va = CriteriaVector::zeros();
        va.set(Criterion::BuildConfidence, 0.9);
        va.set(Criterion::ShowEmpathy, 0.8);
        va.set(Criterion::StayCalm, 0.7);
        a.metrics.fold(&va);
        let mut vb = CriteriaVector::zeros();
        vb.set(Criterion::ProvideFeedback, 0.9);
        vb.set(Criterion::BuildConfidence, 0.8);
        vb.set(Criterion::HandleConflict, 0.7);
        b.metrics.fold(&vb);

        let instruction = crossover_instruction(
            &PerformanceProfile::build(&a),
            &PerformanceProfile::build(&b),
            &PopulationPatterns::default(),
            0.7,
        );
        assert!(instruction.contains("Parent 1 excels at: show_empathy, stay_calm"));
        assert!(instruction.contains("Parent 2 excels at: provide_feedback, handle_conflict"));
        assert!(instruction.contains("Both excel at: build_confidence"));
        assert!(instruction.contains("Target length: 49 characters"));
        assert!(instruction.contains("Create a unique approach not seen before"));
    }

    #[test]
    fn test_instruction_for_unevaluated_parents_claims_no_strengths() {
        let a = seed("You are a calm, supportive coach.");
        let b = seed("You are a practical mentor for teens who listens.");

        let instruction = crossover_instruction(
            &PerformanceProfile::build(&a),
            &PerformanceProfile::build(&b),
            &PopulationPatterns::default(),
            0.7,
        );
        assert!(instruction.contains("PARENT 1 TOP PERFORMING CRITERIA: none identified"));
        assert!(instruction.contains("PARENT 2 TOP PERFORMING CRITERIA: none identified"));
        assert!(instruction.contains("Parent 1 excels at: general effectiveness"));
        assert!(instruction.contains("Both excel at: general effectiveness"));
        assert!(instruction.contains("Strategies to keep: general effectiveness"));
        assert!(!instruction.contains("0.000"));
    }
}
