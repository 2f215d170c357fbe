//! Parent selection strategies.

use promptevo_core::CandidateId;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;

/// Strategy for choosing parents from the current population.
pub trait ParentSelector: Send + Sync {
    /// Pick one parent from `pool`. `frontier` lists the current
    /// non-dominated candidates.
    fn pick(&self, pool: &[CandidateId], frontier: &[CandidateId], rng: &mut StdRng) -> Option<CandidateId>;

    /// Pick two parents, distinct whenever the pool has two members.
    fn pick_pair(
        &self,
        pool: &[CandidateId],
        frontier: &[CandidateId],
        rng: &mut StdRng,
    ) -> Option<(CandidateId, CandidateId)> {
        let first = self.pick(pool, frontier, rng)?;
        let rest: Vec<CandidateId> = pool.iter().filter(|id| **id != first).copied().collect();
        let rest_frontier: Vec<CandidateId> = frontier.iter().filter(|id| **id != first).copied().collect();
        let second = self.pick(&rest, &rest_frontier, rng).unwrap_or(first);
        Some((first, second))
    }
}

/// Uniform random choice over the whole population.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformSelector;

impl ParentSelector for UniformSelector {
    fn pick(&self, pool: &[CandidateId], _frontier: &[CandidateId], rng: &mut StdRng) -> Option<CandidateId> {
        pool.choose(rng).copied()
    }
}

/// Prefers frontier members, exploring the rest of the population sometimes.
#[derive(Debug, Clone, Copy)]
pub struct FrontierBiasedSelector {
    /// Probability of drawing from the frontier
    exploitation: f64,
}

impl FrontierBiasedSelector {
    /// Create a selector drawing from the frontier 80% of the time.
    pub fn new() -> Self {
        Self { exploitation: 0.8 }
    }

    /// Set the frontier probability, clamped to [0, 1].
    pub fn with_exploitation(mut self, exploitation: f64) -> Self {
        self.exploitation = exploitation.clamp(0.0, 1.0);
        self
    }
}

impl Default for FrontierBiasedSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl ParentSelector for FrontierBiasedSelector {
    fn pick(&self, pool: &[CandidateId], frontier: &[CandidateId], rng: &mut StdRng) -> Option<CandidateId> {
        let elite: Vec<CandidateId> = frontier.iter().filter(|id| pool.contains(id)).copied().collect();
        if !elite.is_empty() && rng.gen_bool(self.exploitation) {
            return elite.choose(rng).copied();
        }
        pool.choose(rng).copied()
    }
}

/// Selector strategies available.
#[derive(Debug, Clone, Copy)]
pub enum SelectorStrategy {
    /// Uniform random choice
    Uniform(UniformSelector),
    /// Frontier-biased choice
    FrontierBiased(FrontierBiasedSelector),
}

impl Default for SelectorStrategy {
    fn default() -> Self {
        Self::Uniform(UniformSelector)
    }
}

impl ParentSelector for SelectorStrategy {
    fn pick(&self, pool: &[CandidateId], frontier: &[CandidateId], rng: &mut StdRng) -> Option<CandidateId> {
        match self {
            Self::Uniform(s) => s.pick(pool, frontier, rng),
            Self::FrontierBiased(s) => s.pick(pool, frontier, rng),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn ids(n: usize) -> Vec<CandidateId> {
        (0..n).map(|_| CandidateId::new()).collect()
    }

    #[test]
    fn test_empty_pool_yields_nothing() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(UniformSelector.pick(&[], &[], &mut rng), None);
        assert_eq!(SelectorStrategy::default().pick_pair(&[], &[], &mut rng), None);
    }

    #[test]
    fn test_pair_is_distinct_when_possible() {
        let mut rng = StdRng::seed_from_u64(7);
        let pool = ids(2);
        for _ in 0..50 {
            let (a, b) = UniformSelector.pick_pair(&pool, &[], &mut rng).unwrap();
            assert_ne!(a, b);
        }

        let single = ids(1);
        let (a, b) = UniformSelector.pick_pair(&single, &[], &mut rng).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_full_exploitation_stays_on_frontier() {
        let mut rng = StdRng::seed_from_u64(11);
        let pool = ids(5);
        let frontier = vec![pool[3]];
        let selector = SelectorStrategy::FrontierBiased(FrontierBiasedSelector::new().with_exploitation(1.0));
        for _ in 0..20 {
            assert_eq!(selector.pick(&pool, &frontier, &mut rng), Some(pool[3]));
        }
    }

    #[test]
    fn test_same_seed_same_choices() {
        let pool = ids(10);
        let draw = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            (0..5)
                .map(|_| UniformSelector.pick(&pool, &[], &mut rng).unwrap())
                .collect::<Vec<_>>()
        };
        assert_eq!(draw(42), draw(42));
    }
}
