//! Execution layer - evaluation, scheduling, and the optimization loop.

#![warn(missing_docs)]

pub mod gate;
pub mod evaluator;
pub mod selector;
pub mod scheduler;
pub mod report;
pub mod engine;

pub use gate::{Budget, CallGate, CallOutcome, GatedGenerator};
pub use evaluator::{reflect, FitnessEvaluator};
pub use selector::{FrontierBiasedSelector, ParentSelector, SelectorStrategy, UniformSelector};
pub use scheduler::{split_offspring, GenerationPlan, GenerationReport, GenerationScheduler};
pub use report::{BestSnapshot, OptimizationReport};
pub use engine::{OptimizationDriver, StopHandle};
