//! The fixed set of behavioral criteria and per-criterion vectors.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of behavioral criteria scored per assessment.
pub const CRITERIA_COUNT: usize = 20;

/// One of the 20 behavioral dimensions scored before and after a conversation.
///
/// Declaration order is the canonical order used by every vector in the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    /// Asks for help when needed
    AskForHelp,
    /// Stays calm when dealing with problems
    StayCalm,
    /// Listens actively
    ListenActively,
    /// Expresses themselves clearly
    ExpressClearly,
    /// Shows empathy
    ShowEmpathy,
    /// Asks clarifying questions
    AskClarifying,
    /// Gives constructive input
    GiveConstructive,
    /// Handles conflict
    HandleConflict,
    /// Builds confidence
    BuildConfidence,
    /// Encourages participation
    EncourageParticipation,
    /// Respects boundaries
    RespectBoundaries,
    /// Offers support
    OfferSupport,
    /// Celebrates success
    CelebrateSuccess,
    /// Addresses concerns
    AddressConcerns,
    /// Fosters connection
    FosterConnection,
    /// Models good behavior
    ModelBehavior,
    /// Provides feedback
    ProvideFeedback,
    /// Creates a sense of safety
    CreateSafety,
    /// Promotes growth
    PromoteGrowth,
    /// Maintains balance
    MaintainBalance,
}

impl Criterion {
    /// All criteria in canonical order.
    pub const ALL: [Criterion; CRITERIA_COUNT] = [
        Criterion::AskForHelp,
        Criterion::StayCalm,
        Criterion::ListenActively,
        Criterion::ExpressClearly,
        Criterion::ShowEmpathy,
        Criterion::AskClarifying,
        Criterion::GiveConstructive,
        Criterion::HandleConflict,
        Criterion::BuildConfidence,
        Criterion::EncourageParticipation,
        Criterion::RespectBoundaries,
        Criterion::OfferSupport,
        Criterion::CelebrateSuccess,
        Criterion::AddressConcerns,
        Criterion::FosterConnection,
        Criterion::ModelBehavior,
        Criterion::ProvideFeedback,
        Criterion::CreateSafety,
        Criterion::PromoteGrowth,
        Criterion::MaintainBalance,
    ];

    /// Position of this criterion in every criteria vector.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Stable snake_case name.
    pub fn as_str(self) -> &'static str {
        match self {
            Criterion::AskForHelp => "ask_for_help",
            Criterion::StayCalm => "stay_calm",
            Criterion::ListenActively => "listen_actively",
            Criterion::ExpressClearly => "express_clearly",
            Criterion::ShowEmpathy => "show_empathy",
            Criterion::AskClarifying => "ask_clarifying",
            Criterion::GiveConstructive => "give_constructive",
            Criterion::HandleConflict => "handle_conflict",
            Criterion::BuildConfidence => "build_confidence",
            Criterion::EncourageParticipation => "encourage_participation",
            Criterion::RespectBoundaries => "respect_boundaries",
            Criterion::OfferSupport => "offer_support",
            Criterion::CelebrateSuccess => "celebrate_success",
            Criterion::AddressConcerns => "address_concerns",
            Criterion::FosterConnection => "foster_connection",
            Criterion::ModelBehavior => "model_behavior",
            Criterion::ProvideFeedback => "provide_feedback",
            Criterion::CreateSafety => "create_safety",
            Criterion::PromoteGrowth => "promote_growth",
            Criterion::MaintainBalance => "maintain_balance",
        }
    }

    /// Coaching-strategy phrase used when asking a generator to preserve this strength.
    pub fn strategy_phrase(self) -> &'static str {
        match self {
            Criterion::AskForHelp => "encourage questioning and seeking assistance",
            Criterion::StayCalm => "promote calmness and emotional regulation",
            Criterion::ListenActively => "emphasize active listening and attention",
            Criterion::ExpressClearly => "focus on clear communication and expression",
            Criterion::ShowEmpathy => "demonstrate understanding and emotional connection",
            Criterion::AskClarifying => "model curiosity through clarifying questions",
            Criterion::GiveConstructive => "frame observations as constructive next steps",
            Criterion::HandleConflict => "address disagreements and difficult situations",
            Criterion::BuildConfidence => "boost self-esteem and belief in abilities",
            Criterion::EncourageParticipation => "motivate engagement and involvement",
            Criterion::RespectBoundaries => "respect personal limits and pacing",
            Criterion::OfferSupport => "offer steady, visible support",
            Criterion::CelebrateSuccess => "notice and celebrate small wins",
            Criterion::AddressConcerns => "surface worries and address them directly",
            Criterion::FosterConnection => "build relationships and social bonds",
            Criterion::ModelBehavior => "demonstrate the behavior being taught",
            Criterion::ProvideFeedback => "offer constructive guidance and improvement",
            Criterion::CreateSafety => "create a safe, judgment-free space",
            Criterion::PromoteGrowth => "frame setbacks as opportunities to grow",
            Criterion::MaintainBalance => "balance challenge with reassurance",
        }
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One value per criterion, in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CriteriaVector([f64; CRITERIA_COUNT]);

impl CriteriaVector {
    /// A vector of zeros (the "unknown" performance vector).
    pub fn zeros() -> Self {
        Self([0.0; CRITERIA_COUNT])
    }

    /// Same value for every criterion.
    pub fn splat(value: f64) -> Self {
        Self([value; CRITERIA_COUNT])
    }

    /// Wrap a raw array.
    pub fn from_array(values: [f64; CRITERIA_COUNT]) -> Self {
        Self(values)
    }

    /// Value for one criterion.
    pub fn get(&self, criterion: Criterion) -> f64 {
        self.0[criterion.index()]
    }

    /// Set the value for one criterion.
    pub fn set(&mut self, criterion: Criterion, value: f64) {
        self.0[criterion.index()] = value;
    }

    /// Raw values in canonical order.
    pub fn values(&self) -> &[f64; CRITERIA_COUNT] {
        &self.0
    }

    /// Iterate `(criterion, value)` pairs in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (Criterion, f64)> + '_ {
        Criterion::ALL.iter().map(move |c| (*c, self.0[c.index()]))
    }

    /// Mean over all criteria.
    pub fn mean(&self) -> f64 {
        self.0.iter().sum::<f64>() / CRITERIA_COUNT as f64
    }

    /// Criteria sorted by value, highest first. Ties keep canonical order.
    pub fn ranked(&self) -> Vec<(Criterion, f64)> {
        let mut ranked: Vec<_> = self.iter().collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        ranked
    }

    /// Fold one more sample into a running mean that already covers `count` samples.
    pub fn fold_mean(&mut self, sample: &CriteriaVector, count: u32) {
        let n = f64::from(count + 1);
        for (current, value) in self.0.iter_mut().zip(sample.0.iter()) {
            *current += (value - *current) / n;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_is_in_index_order() {
        for (i, c) in Criterion::ALL.iter().enumerate() {
            assert_eq!(c.index(), i);
        }
        assert_eq!(Criterion::MaintainBalance.as_str(), "maintain_balance");
    }

    #[test]
    fn test_ranked_keeps_canonical_order_on_ties() {
        let mut v = CriteriaVector::zeros();
        v.set(Criterion::ShowEmpathy, 0.5);
        v.set(Criterion::StayCalm, 0.5);
        let ranked = v.ranked();
        assert_eq!(ranked[0].0, Criterion::StayCalm);
        assert_eq!(ranked[1].0, Criterion::ShowEmpathy);
        assert_eq!(ranked[2].0, Criterion::AskForHelp);
    }

    #[test]
    fn test_fold_mean_matches_arithmetic_mean() {
        let mut mean = CriteriaVector::zeros();
        mean.fold_mean(&CriteriaVector::splat(0.25), 0);
        mean.fold_mean(&CriteriaVector::splat(0.75), 1);
        mean.fold_mean(&CriteriaVector::splat(0.5), 2);
        for (_, value) in mean.iter() {
            assert!((value - 0.5).abs() < 1e-12);
        }
    }

    #[test]
    fn test_serializes_as_array() {
        let json = serde_json::to_value(CriteriaVector::splat(1.0)).unwrap();
        assert_eq!(json.as_array().map(|a| a.len()), Some(CRITERIA_COUNT));
    }
}
