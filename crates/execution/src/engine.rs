//! The optimization driver - runs the generation loop.

use crate::gate::{Budget, CallGate};
use crate::report::{BestSnapshot, OptimizationReport};
use crate::scheduler::{GenerationReport, GenerationScheduler};
use crate::selector::{ParentSelector, SelectorStrategy};
use promptevo_core::{
    AssessmentOracle, ConfigError, DialogueSimulator, GenerativeMutator, OptimizerConfig,
    OptimizerError, PersonaId,
};
use promptevo_evolution::{Objectives, ParetoFrontier, ParetoSelector};
use promptevo_storage::{CandidateStore, OptimizationHistory};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Requests that a running optimization stop after the current generation.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    stopped: Arc<AtomicBool>,
}

impl StopHandle {
    /// Ask the driver to stop; no further generations are dispatched.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    /// Whether a stop was requested.
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

/// The optimization driver.
///
/// Runs one state machine per generation:
/// ```text
/// PLAN → DISPATCH → COLLECT → APPLY → SELECT
/// ```
pub struct OptimizationDriver {
    config: OptimizerConfig,
    store: Arc<CandidateStore>,
    history: Arc<OptimizationHistory>,
    gate: Arc<CallGate>,
    scheduler: GenerationScheduler,
    selector: Box<dyn ParentSelector>,
    pareto: ParetoSelector,
    rng: StdRng,
    stop: StopHandle,
    frontier: ParetoFrontier,
}

impl OptimizationDriver {
    /// Create a driver. The configuration is validated here, once.
    pub fn new(
        config: OptimizerConfig,
        simulator: Arc<dyn DialogueSimulator>,
        oracle: Arc<dyn AssessmentOracle>,
        generator: Arc<dyn GenerativeMutator>,
        personas: Vec<PersonaId>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        if personas.is_empty() {
            return Err(ConfigError::NoPersonas);
        }

        let store = Arc::new(CandidateStore::new());
        let history = Arc::new(OptimizationHistory::new());
        let gate = Arc::new(CallGate::new(Budget::from_config(&config)));
        let scheduler = GenerationScheduler::new(
            config.clone(),
            Arc::clone(&store),
            Arc::clone(&history),
            Arc::clone(&gate),
            simulator,
            oracle,
            generator,
            personas,
        );
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            config,
            store,
            history,
            gate,
            scheduler,
            selector: Box::new(SelectorStrategy::default()),
            pareto: ParetoSelector::default(),
            rng,
            stop: StopHandle::default(),
            frontier: ParetoFrontier::default(),
        })
    }

    /// Set the parent selection strategy.
    pub fn with_selector(mut self, selector: Box<dyn ParentSelector>) -> Self {
        self.selector = selector;
        self
    }

    /// Set the objectives used for the frontier.
    pub fn with_objectives(mut self, objectives: Objectives) -> Self {
        self.pareto = ParetoSelector::new(objectives);
        self
    }

    /// Handle that stops the run between generations.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Shared candidate store.
    pub fn store(&self) -> &Arc<CandidateStore> {
        &self.store
    }

    /// Shared evaluation history.
    pub fn history(&self) -> &Arc<OptimizationHistory> {
        &self.history
    }

    /// Current frontier.
    pub fn frontier(&self) -> &ParetoFrontier {
        &self.frontier
    }

    /// Run one generation: plan, execute, then select.
    pub async fn run_generation(&mut self, generation: u32) -> Result<GenerationReport, OptimizerError> {
        info!("Starting generation {}", generation);

        let plan = self
            .scheduler
            .plan(generation, &self.frontier.members, self.selector.as_ref(), &mut self.rng)
            .await;
        debug!(
            "Generation {} plan: target {}, {} crossovers, {} mutations",
            generation,
            plan.target,
            plan.crossovers.len(),
            plan.mutations.len()
        );

        let mut report = match self.scheduler.execute(&plan).await {
            Ok(report) => report,
            Err(e) => {
                error!("Generation {} aborted: {}", generation, e);
                return Err(e.into());
            }
        };

        // SELECT
        let candidates = self.store.all().await;
        self.frontier = self.pareto.select(&candidates);
        report.frontier_size = self.frontier.len();
        report.best = self.frontier.best();

        info!(
            "Generation {} done: population {}, frontier {}, {} ok / {} failed evaluations, {} fallbacks",
            generation,
            report.population_size,
            report.frontier_size,
            report.evaluations_succeeded,
            report.evaluations_failed,
            report.fallbacks
        );
        Ok(report)
    }

    /// Seed the population and run every configured generation.
    pub async fn run(&mut self, seeds: Vec<String>) -> Result<OptimizationReport, OptimizerError> {
        if seeds.is_empty() {
            return Err(ConfigError::NoSeeds.into());
        }

        info!(
            "Starting optimization: {} seeds, {} generations, population cap {}",
            seeds.len(),
            self.config.generations,
            self.config.population_cap
        );
        for seed in seeds {
            self.store.create_seed(seed).await;
        }
        self.frontier = self.pareto.select(&self.store.all().await);

        let mut generations = Vec::new();
        let mut best_per_generation = Vec::new();
        let mut stopped_early = false;

        for generation in 0..self.config.generations {
            if self.stop.is_stopped() {
                info!("Stop requested, skipping generation {} onwards", generation);
                stopped_early = true;
                break;
            }

            let report = self.run_generation(generation).await?;
            if let Some(best) = report.best {
                if let Some(candidate) = self.store.get(best).await {
                    best_per_generation.push(BestSnapshot::of(generation, &candidate));
                }
            }
            generations.push(report);
        }

        let report = OptimizationReport {
            candidates: self.store.all().await,
            frontier: self.frontier.clone(),
            generations,
            best_per_generation,
            history: self.history.snapshot().await,
            stopped_early,
            total_attempts: self.gate.total_attempts(),
        };

        if let Some(best) = report.best() {
            info!(
                "Optimization finished: best {} ({}) with avg improvement {:+.3}",
                best.name, best.id, best.metrics.avg_improvement
            );
        }
        Ok(report)
    }
}
