//! Performance profiles and coaching-approach classification.
//!
//! A profile summarizes what a candidate is good and bad at, and which
//! lexical coaching approach its text leans on. Everything here is advisory:
//! it shapes operator instructions but never gates selection.

use crate::text::{has_indicator, word_set};
use promptevo_core::{Candidate, CandidateId, Criterion};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// How many top criteria a profile keeps.
pub const STRENGTH_COUNT: usize = 5;

/// How many bottom criteria a profile keeps.
pub const WEAKNESS_COUNT: usize = 3;

/// Coaching style inferred from the words a prompt uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoachingApproach {
    /// Asks questions
    Questioning,
    /// Encouraging and patient
    Supportive,
    /// Concrete, step-based
    Practical,
    /// Works alongside the student
    Collaborative,
    /// Builds self-belief
    ConfidenceFocused,
    /// Listens and relates
    EmpathyFocused,
    /// Gives constructive input
    FeedbackFocused,
}

impl CoachingApproach {
    /// All approaches; ties in classification resolve to the earliest.
    pub const ALL: [CoachingApproach; 7] = [
        CoachingApproach::Questioning,
        CoachingApproach::Supportive,
        CoachingApproach::Practical,
        CoachingApproach::Collaborative,
        CoachingApproach::ConfidenceFocused,
        CoachingApproach::EmpathyFocused,
        CoachingApproach::FeedbackFocused,
    ];

    /// Lexical indicators for this approach.
    pub fn indicators(self) -> &'static [&'static str] {
        match self {
            CoachingApproach::Questioning => &["?", "what", "how", "why", "which", "ask"],
            CoachingApproach::Supportive => &["supportive", "encouraging", "helpful", "patient", "gentle"],
            CoachingApproach::Practical => &["practical", "step", "action", "concrete", "specific"],
            CoachingApproach::Collaborative => &["together", "we", "us", "let's", "guide", "mentor"],
            CoachingApproach::ConfidenceFocused => {
                &["confidence", "believe", "assurance", "self-esteem", "strength"]
            }
            CoachingApproach::EmpathyFocused => &["empathy", "understand", "feel", "emotion", "listen"],
            CoachingApproach::FeedbackFocused => &["feedback", "constructive", "improve", "develop", "grow"],
        }
    }

    /// Short label.
    pub fn as_str(self) -> &'static str {
        match self {
            CoachingApproach::Questioning => "questioning",
            CoachingApproach::Supportive => "supportive",
            CoachingApproach::Practical => "practical",
            CoachingApproach::Collaborative => "collaborative",
            CoachingApproach::ConfidenceFocused => "confidence_focused",
            CoachingApproach::EmpathyFocused => "empathy_focused",
            CoachingApproach::FeedbackFocused => "feedback_focused",
        }
    }

    /// Whether any indicator of this approach appears in `text`.
    pub fn present_in(self, text: &str) -> bool {
        let lower = text.to_lowercase();
        let tokens = word_set(&lower);
        self.indicators().iter().any(|i| has_indicator(&lower, &tokens, i))
    }

    /// Approaches that plausibly drive a criterion, if any are known.
    pub fn contributing_to(criterion: Criterion) -> &'static [CoachingApproach] {
        use CoachingApproach::*;
        match criterion {
            Criterion::AskForHelp => &[Questioning, Collaborative],
            Criterion::StayCalm => &[Supportive, EmpathyFocused],
            Criterion::ListenActively => &[EmpathyFocused, Collaborative],
            Criterion::ExpressClearly => &[Practical, FeedbackFocused],
            Criterion::ShowEmpathy => &[EmpathyFocused, Supportive],
            Criterion::BuildConfidence => &[ConfidenceFocused, Supportive],
            Criterion::EncourageParticipation => &[Collaborative, Supportive],
            Criterion::ProvideFeedback => &[FeedbackFocused, Practical],
            Criterion::HandleConflict => &[Practical, EmpathyFocused],
            Criterion::FosterConnection => &[Collaborative, EmpathyFocused],
            _ => &[],
        }
    }
}

impl fmt::Display for CoachingApproach {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Surface features of a prompt's phrasing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureFeatures {
    /// Contains a question mark
    pub has_question: bool,
    /// Uses an action verb such as "help" or "guide"
    pub has_action_verb: bool,
    /// Uses a qualifier such as "practical" or "step-by-step"
    pub has_qualifier: bool,
    /// Opens as a directive ("Be ", "You are", "Help" ...)
    pub is_directive: bool,
    /// Uses inclusive language ("together", "we" ...)
    pub is_collaborative: bool,
}

impl StructureFeatures {
    /// Number of features equal between two prompts.
    pub fn agreement(&self, other: &StructureFeatures) -> usize {
        [
            self.has_question == other.has_question,
            self.has_action_verb == other.has_action_verb,
            self.has_qualifier == other.has_qualifier,
            self.is_directive == other.is_directive,
            self.is_collaborative == other.is_collaborative,
        ]
        .iter()
        .filter(|same| **same)
        .count()
    }

    /// Total number of features compared by [`agreement`](Self::agreement).
    pub const COUNT: usize = 5;
}

/// Lexical analysis of one prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApproachAnalysis {
    /// Indicator hits per approach, in [`CoachingApproach::ALL`] order
    pub scores: Vec<(CoachingApproach, usize)>,
    /// Approach with the most hits; `None` when nothing matched
    pub dominant: Option<CoachingApproach>,
    /// Phrasing features
    pub structure: StructureFeatures,
}

/// Classify the coaching approach and phrasing of a prompt.
pub fn classify(text: &str) -> ApproachAnalysis {
    let lower = text.to_lowercase();
    let tokens = word_set(&lower);
    let hit = |i: &&str| has_indicator(&lower, &tokens, i);

    let scores: Vec<(CoachingApproach, usize)> = CoachingApproach::ALL
        .iter()
        .map(|a| (*a, a.indicators().iter().filter(|i| hit(*i)).count()))
        .collect();

    let mut dominant = None;
    let mut best = 0;
    for (approach, score) in &scores {
        if *score > best {
            best = *score;
            dominant = Some(*approach);
        }
    }

    let structure = StructureFeatures {
        has_question: text.contains('?'),
        has_action_verb: ["help", "guide", "support", "provide", "offer", "build"].iter().any(hit),
        has_qualifier: ["practical", "step-by-step", "constructive", "effective", "confident"]
            .iter()
            .any(hit),
        is_directive: ["Be ", "You are", "I am", "Help", "Guide"]
            .iter()
            .any(|p| text.trim_start().starts_with(p)),
        is_collaborative: ["together", "we", "us", "let's"].iter().any(hit),
    };

    ApproachAnalysis { scores, dominant, structure }
}

/// What a candidate is strong and weak at, and how its text reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceProfile {
    /// Profiled candidate
    pub candidate_id: CandidateId,
    /// Its text
    pub text: String,
    /// Its generation
    pub generation: u32,
    /// Highest per-criterion improvements, best first
    pub strengths: Vec<(Criterion, f64)>,
    /// Lowest per-criterion improvements, worst first
    pub weaknesses: Vec<(Criterion, f64)>,
    /// Lexical analysis of the text
    pub analysis: ApproachAnalysis,
    /// Approaches linked to the top three criteria, deduplicated
    pub contributing: Vec<CoachingApproach>,
    /// Aggregate improvement
    pub avg_improvement: f64,
    /// Text length in characters
    pub length: usize,
}

impl PerformanceProfile {
    /// Profile a candidate using its current metrics.
    pub fn build(candidate: &Candidate) -> Self {
        Self::with_counts(candidate, STRENGTH_COUNT, WEAKNESS_COUNT)
    }

    /// Profile keeping `top` strengths and `bottom` weaknesses.
    ///
    /// A candidate with no successful evaluation has no strengths,
    /// weaknesses, or contributing approaches.
    pub fn with_counts(candidate: &Candidate, top: usize, bottom: usize) -> Self {
        let ranked = if candidate.metrics.is_evaluated() {
            candidate.metrics.per_criterion.ranked()
        } else {
            Vec::new()
        };
        let strengths: Vec<_> = ranked.iter().take(top).copied().collect();
        let weaknesses: Vec<_> = ranked.iter().rev().take(bottom).copied().collect();

        let mut seen = HashSet::new();
        let contributing = ranked
            .iter()
            .take(3)
            .flat_map(|(c, _)| CoachingApproach::contributing_to(*c).iter().copied())
            .filter(|a| seen.insert(*a))
            .collect();

        Self {
            candidate_id: candidate.id,
            text: candidate.text.clone(),
            generation: candidate.generation,
            strengths,
            weaknesses,
            analysis: classify(&candidate.text),
            contributing,
            avg_improvement: candidate.metrics.avg_improvement,
            length: candidate.text.chars().count(),
        }
    }

    /// The `n` strongest criteria.
    pub fn top_criteria(&self, n: usize) -> Vec<Criterion> {
        self.strengths.iter().take(n).map(|(c, _)| *c).collect()
    }

    /// Dominant approach label, or "general" when none dominates.
    pub fn approach_label(&self) -> &'static str {
        self.analysis.dominant.map(CoachingApproach::as_str).unwrap_or("general")
    }
}
