//! Pareto-frontier selection over per-criterion improvements.

use crate::text::{jaccard_sets, word_set};
use promptevo_core::{Candidate, CandidateId};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;

/// Which objective vector candidates are compared on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objectives {
    /// One objective per behavioral criterion
    #[default]
    Criteria,
    /// Aggregate improvement and textual distinctness from the rest
    AggregateAndDiversity,
}

/// `a` dominates `b`: no worse on every objective, strictly better on one.
pub fn dominates(a: &[f64], b: &[f64]) -> bool {
    let mut strictly_better = false;
    for (x, y) in a.iter().zip(b.iter()) {
        if x < y {
            return false;
        }
        if x > y {
            strictly_better = true;
        }
    }
    strictly_better
}

/// Non-dominated candidates and per-candidate dominator counts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParetoFrontier {
    /// Frontier members, best first
    pub members: Vec<CandidateId>,
    /// How many candidates dominate each candidate, in creation order
    pub dominators: Vec<(CandidateId, usize)>,
}

impl ParetoFrontier {
    /// Preferred frontier member.
    pub fn best(&self) -> Option<CandidateId> {
        self.members.first().copied()
    }

    /// Whether `id` is on the frontier.
    pub fn contains(&self, id: CandidateId) -> bool {
        self.members.contains(&id)
    }

    /// Frontier size.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the frontier is empty.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Dominator count of one candidate.
    pub fn rank_of(&self, id: CandidateId) -> Option<usize> {
        self.dominators.iter().find(|(c, _)| *c == id).map(|(_, n)| *n)
    }
}

/// Computes the Pareto frontier of a candidate population.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParetoSelector {
    objectives: Objectives,
}

impl ParetoSelector {
    /// Selector over the given objectives.
    pub fn new(objectives: Objectives) -> Self {
        Self { objectives }
    }

    /// Objective vectors, aligned with `candidates`.
    pub fn objective_vectors(&self, candidates: &[Candidate]) -> Vec<Vec<f64>> {
        match self.objectives {
            Objectives::Criteria => candidates
                .iter()
                .map(|c| c.objectives().values().to_vec())
                .collect(),
            Objectives::AggregateAndDiversity => {
                let sets: Vec<HashSet<String>> = candidates.iter().map(|c| word_set(&c.text)).collect();
                candidates
                    .iter()
                    .enumerate()
                    .map(|(i, c)| {
                        let others = candidates.len().saturating_sub(1);
                        let distinct = if others == 0 {
                            1.0
                        } else {
                            let total: f64 = sets
                                .iter()
                                .enumerate()
                                .filter(|(j, _)| *j != i)
                                .map(|(_, s)| jaccard_sets(&sets[i], s))
                                .sum();
                            1.0 - total / others as f64
                        };
                        vec![c.metrics.avg_improvement, distinct]
                    })
                    .collect()
            }
        }
    }

    /// Compute the frontier over `candidates`, given in creation order.
    ///
    /// Members are ordered by aggregate improvement, then earlier generation,
    /// then creation order.
    pub fn select(&self, candidates: &[Candidate]) -> ParetoFrontier {
        let vectors = self.objective_vectors(candidates);

        let counts: Vec<usize> = vectors
            .iter()
            .map(|v| vectors.iter().filter(|other| dominates(other, v)).count())
            .collect();

        let mut members: Vec<usize> = (0..candidates.len()).filter(|i| counts[*i] == 0).collect();
        members.sort_by(|a, b| {
            let (ca, cb) = (&candidates[*a], &candidates[*b]);
            cb.metrics
                .avg_improvement
                .partial_cmp(&ca.metrics.avg_improvement)
                .unwrap_or(Ordering::Equal)
                .then(ca.generation.cmp(&cb.generation))
                .then(a.cmp(b))
        });

        ParetoFrontier {
            members: members.into_iter().map(|i| candidates[i].id).collect(),
            dominators: candidates.iter().zip(counts).map(|(c, n)| (c.id, n)).collect(),
        }
    }
}
