//! Generation scheduling.
//!
//! One generation runs as:
//! ```text
//! PLAN → DISPATCH → COLLECT/APPLY
//! ```
//! Evaluation and operator tasks are polled together; the collect loop is
//! the only writer to the store and history. Offspring are inserted as soon
//! as their operator finishes and are evaluated in the same generation.

use crate::evaluator::FitnessEvaluator;
use crate::gate::{CallGate, GatedGenerator};
use crate::selector::ParentSelector;
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use promptevo_core::{
    AssessmentOracle, Candidate, CandidateId, ConsistencyError, CreationMethod, DialogueSimulator,
    EvaluationRecord, GenerativeMutator, OptimizerConfig, PersonaId,
};
use promptevo_evolution::{recent_texts, Crossover, Mutator, OperatorOutput};
use promptevo_storage::{CandidateStore, ChildSpec, OptimizationHistory};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Split `needed` offspring into `(crossovers, mutations)` by the configured rates.
pub fn split_offspring(needed: usize, crossover_rate: f64, mutation_rate: f64) -> (usize, usize) {
    let total = crossover_rate + mutation_rate;
    if needed == 0 || total <= 0.0 {
        return (0, 0);
    }
    let crossovers = ((needed as f64 * crossover_rate / total).round() as usize).min(needed);
    (crossovers, needed - crossovers)
}

/// Offspring planned for one generation.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationPlan {
    /// Generation index
    pub generation: u32,
    /// Target population size
    pub target: usize,
    /// Population size when planning
    pub population: usize,
    /// Parent pairs; equal ids mean a self-paired crossover
    pub crossovers: Vec<(CandidateId, CandidateId)>,
    /// Mutation parents
    pub mutations: Vec<CandidateId>,
}

impl GenerationPlan {
    /// Offspring this plan will create.
    pub fn offspring(&self) -> usize {
        self.crossovers.len() + self.mutations.len()
    }
}

/// Counters for one generation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationReport {
    /// Generation index
    pub generation: u32,
    /// Target population size
    pub target_size: usize,
    /// Population size when planning
    pub starting_population: usize,
    /// Crossovers planned
    pub planned_crossovers: usize,
    /// Mutations planned
    pub planned_mutations: usize,
    /// Successful evaluations
    pub evaluations_succeeded: usize,
    /// Failed evaluations
    pub evaluations_failed: usize,
    /// Offspring inserted
    pub offspring_created: usize,
    /// Offspring whose text is a fallback
    pub fallbacks: usize,
    /// Population size after the generation
    pub population_size: usize,
    /// Frontier size after selection
    pub frontier_size: usize,
    /// Most external calls running at once
    pub peak_concurrency: usize,
    /// Best candidate after selection
    pub best: Option<CandidateId>,
}

/// Result of one dispatched task.
enum TaskOutput {
    Evaluated(EvaluationRecord),
    Offspring {
        parents: Vec<CandidateId>,
        method: CreationMethod,
        output: OperatorOutput,
    },
}

/// Runs the tasks of a generation against shared store and history.
pub struct GenerationScheduler {
    config: OptimizerConfig,
    store: Arc<CandidateStore>,
    history: Arc<OptimizationHistory>,
    gate: Arc<CallGate>,
    evaluator: FitnessEvaluator,
    mutator: Mutator,
    crossover: Crossover,
    personas: Vec<PersonaId>,
}

impl GenerationScheduler {
    /// Create a scheduler. Every collaborator call goes through `gate`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: OptimizerConfig,
        store: Arc<CandidateStore>,
        history: Arc<OptimizationHistory>,
        gate: Arc<CallGate>,
        simulator: Arc<dyn DialogueSimulator>,
        oracle: Arc<dyn AssessmentOracle>,
        generator: Arc<dyn GenerativeMutator>,
        personas: Vec<PersonaId>,
    ) -> Self {
        let generator: Arc<dyn GenerativeMutator> = Arc::new(GatedGenerator::new(generator, Arc::clone(&gate)));
        Self {
            evaluator: FitnessEvaluator::new(simulator, oracle, Arc::clone(&gate), &config),
            mutator: Mutator::new(Arc::clone(&generator)),
            crossover: Crossover::new(generator, config.diversity_weight),
            config,
            store,
            history,
            gate,
            personas,
        }
    }

    /// PLAN: decide how many offspring to create and pick their parents.
    pub async fn plan(
        &self,
        generation: u32,
        frontier: &[CandidateId],
        selector: &dyn ParentSelector,
        rng: &mut StdRng,
    ) -> GenerationPlan {
        let pool = self.store.ids().await;
        let target = self.config.target_size(generation);
        let needed = target.saturating_sub(pool.len());
        let (crossovers, mutations) =
            split_offspring(needed, self.config.crossover_rate, self.config.mutation_rate);

        let crossovers = (0..crossovers)
            .filter_map(|_| selector.pick_pair(&pool, frontier, rng))
            .collect();
        let mutations = (0..mutations)
            .filter_map(|_| selector.pick(&pool, frontier, rng))
            .collect();

        GenerationPlan {
            generation,
            target,
            population: pool.len(),
            crossovers,
            mutations,
        }
    }

    /// DISPATCH and COLLECT/APPLY every task of `plan`.
    ///
    /// Returns once every evaluation, including those of new offspring, has
    /// been folded into the store.
    pub async fn execute(&self, plan: &GenerationPlan) -> Result<GenerationReport, ConsistencyError> {
        let generation = plan.generation;
        let mut report = GenerationReport {
            generation,
            target_size: plan.target,
            starting_population: plan.population,
            planned_crossovers: plan.crossovers.len(),
            planned_mutations: plan.mutations.len(),
            ..Default::default()
        };

        self.gate.reset_peak();
        let population = self.store.all().await;
        let recent = recent_texts(&population, self.config.pattern_window);
        let by_id: HashMap<CandidateId, &Candidate> = population.iter().map(|c| (c.id, c)).collect();
        let lookup = |id: &CandidateId| {
            by_id
                .get(id)
                .map(|c| (*c).clone())
                .ok_or(ConsistencyError::UnknownCandidate(*id))
        };

        let mut tasks: FuturesUnordered<BoxFuture<'_, TaskOutput>> = FuturesUnordered::new();

        let pending = population
            .iter()
            .filter(|c| self.config.reevaluate_existing || c.metrics.attempted() == 0);
        for candidate in pending {
            self.dispatch_evaluations(&mut tasks, candidate, generation);
        }
        for (a, b) in &plan.crossovers {
            tasks.push(self.crossover_task(lookup(a)?, lookup(b)?, &recent));
        }
        for parent in &plan.mutations {
            tasks.push(self.mutation_task(lookup(parent)?, &recent));
        }
        debug!("Generation {}: dispatched {} tasks", generation, tasks.len());

        while let Some(output) = tasks.next().await {
            match output {
                TaskOutput::Evaluated(record) => self.apply_evaluation(record, &mut report).await?,
                TaskOutput::Offspring { parents, method, output } => {
                    let child = self
                        .store
                        .create_child(ChildSpec {
                            parents,
                            text: output.text,
                            method,
                            generation,
                            fallback: output.fallback.is_some(),
                            advisory: output.advisory,
                        })
                        .await?;
                    report.offspring_created += 1;
                    if child.fallback {
                        report.fallbacks += 1;
                    }
                    self.dispatch_evaluations(&mut tasks, &child, generation);
                }
            }
        }

        report.population_size = self.store.len().await;
        report.peak_concurrency = self.gate.peak();
        Ok(report)
    }

    fn dispatch_evaluations<'a>(
        &'a self,
        tasks: &mut FuturesUnordered<BoxFuture<'a, TaskOutput>>,
        candidate: &Candidate,
        generation: u32,
    ) {
        for persona in &self.personas {
            let candidate = candidate.clone();
            tasks.push(Box::pin(async move {
                TaskOutput::Evaluated(self.evaluator.evaluate(&candidate, persona, generation).await)
            }));
        }
    }

    fn crossover_task<'a>(&'a self, p1: Candidate, p2: Candidate, recent: &'a [String]) -> BoxFuture<'a, TaskOutput> {
        Box::pin(async move {
            let output = self.crossover.cross(&p1, &p2, recent).await;
            TaskOutput::Offspring {
                parents: vec![p1.id, p2.id],
                method: CreationMethod::Crossover,
                output,
            }
        })
    }

    fn mutation_task<'a>(&'a self, parent: Candidate, recent: &'a [String]) -> BoxFuture<'a, TaskOutput> {
        Box::pin(async move {
            let output = self.mutator.mutate(&parent, recent).await;
            TaskOutput::Offspring {
                parents: vec![parent.id],
                method: CreationMethod::Mutation,
                output,
            }
        })
    }

    async fn apply_evaluation(
        &self,
        record: EvaluationRecord,
        report: &mut GenerationReport,
    ) -> Result<(), ConsistencyError> {
        match record.scores() {
            Some(scores) => {
                self.store
                    .record_evaluation(record.candidate_id, &record.persona_id, &scores.improvement)
                    .await?;
                report.evaluations_succeeded += 1;
            }
            None => {
                self.store.record_failure(record.candidate_id).await?;
                report.evaluations_failed += 1;
            }
        }
        self.history.append(record).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::Budget;
    use crate::selector::SelectorStrategy;
    use async_trait::async_trait;
    use promptevo_core::{ContextSnapshot, ExternalError, SimulationOptions, Transcript, CRITERIA_COUNT};
    use rand::SeedableRng;

    struct Quiet;

    #[async_trait]
    impl DialogueSimulator for Quiet {
        async fn simulate(&self, _: &str, _: &PersonaId, _: &SimulationOptions) -> Result<Transcript, ExternalError> {
            Ok(Transcript::default())
        }
    }

    #[async_trait]
    impl AssessmentOracle for Quiet {
        async fn assess(&self, _: &PersonaId, snapshot: &ContextSnapshot) -> Result<Vec<u8>, ExternalError> {
            Ok(match snapshot {
                ContextSnapshot::Baseline => vec![2; CRITERIA_COUNT],
                ContextSnapshot::AfterConversation { .. } => vec![3; CRITERIA_COUNT],
            })
        }
    }

    #[async_trait]
    impl GenerativeMutator for Quiet {
        async fn generate(&self, _: &str) -> Result<String, ExternalError> {
            Ok("You are a steady, curious mentor for students.".to_string())
        }
    }

    fn scheduler(config: OptimizerConfig, personas: &[&str]) -> (GenerationScheduler, Arc<CandidateStore>, Arc<OptimizationHistory>) {
        let store = Arc::new(CandidateStore::new());
        let history = Arc::new(OptimizationHistory::new());
        let gate = Arc::new(CallGate::new(Budget::from_config(&config)));
        let scheduler = GenerationScheduler::new(
            config,
            Arc::clone(&store),
            Arc::clone(&history),
            gate,
            Arc::new(Quiet),
            Arc::new(Quiet),
            Arc::new(Quiet),
            personas.iter().map(|p| PersonaId::from(*p)).collect(),
        );
        (scheduler, store, history)
    }

    #[test]
    fn test_split_offspring() {
        assert_eq!(split_offspring(1, 0.6, 0.3), (1, 0));
        assert_eq!(split_offspring(2, 0.6, 0.3), (1, 1));
        assert_eq!(split_offspring(3, 0.6, 0.3), (2, 1));
        assert_eq!(split_offspring(4, 0.0, 0.5), (0, 4));
        assert_eq!(split_offspring(0, 0.6, 0.3), (0, 0));
    }

    #[tokio::test]
    async fn test_plan_fills_to_target() {
        let config = OptimizerConfig::default().with_population_cap(4).with_rates(0.6, 0.3);
        let (scheduler, store, _) = scheduler(config, &["p1"]);
        let seed = store.create_seed("You are a calm, supportive coach.").await;
        let mut rng = StdRng::seed_from_u64(1);
        let selector = SelectorStrategy::default();

        let plan = scheduler.plan(0, &[], &selector, &mut rng).await;
        assert_eq!(plan.offspring(), 0);

        let plan = scheduler.plan(1, &[], &selector, &mut rng).await;
        assert_eq!(plan.target, 2);
        assert_eq!(plan.crossovers, vec![(seed.id, seed.id)]);
        assert!(plan.mutations.is_empty());
    }

    #[tokio::test]
    async fn test_offspring_are_evaluated_in_same_generation() {
        let config = OptimizerConfig::default().with_population_cap(4).with_rates(0.6, 0.3);
        let (scheduler, store, history) = scheduler(config, &["p1", "p2"]);
        let seed = store.create_seed("You are a calm, supportive coach.").await;
        let plan = GenerationPlan {
            generation: 1,
            target: 3,
            population: 1,
            crossovers: vec![(seed.id, seed.id)],
            mutations: vec![seed.id],
        };

        let report = scheduler.execute(&plan).await.unwrap();
        assert_eq!(report.starting_population, 1);
        assert_eq!(report.offspring_created, 2);
        assert_eq!(report.fallbacks, 0);
        assert_eq!(report.evaluations_succeeded, 6);
        assert_eq!(report.population_size, 3);
        assert_eq!(history.len().await, 6);
        for candidate in store.all().await {
            assert_eq!(candidate.metrics.test_count, 2);
            assert!((candidate.metrics.avg_improvement - 0.25).abs() < 1e-12);
        }
        assert_eq!(store.by_generation(1).await.len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_parent_is_a_consistency_error() {
        let (scheduler, _, _) = scheduler(OptimizerConfig::default(), &["p1"]);
        let missing = CandidateId::new();
        let plan = GenerationPlan {
            generation: 1,
            target: 2,
            population: 1,
            crossovers: Vec::new(),
            mutations: vec![missing],
        };
        assert_eq!(
            scheduler.execute(&plan).await.unwrap_err(),
            ConsistencyError::UnknownCandidate(missing)
        );
    }
}
