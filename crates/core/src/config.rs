//! Typed optimizer configuration.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Every option the optimization engine recognizes.
///
/// Construct with [`OptimizerConfig::default`] and the `with_*` setters, or load
/// a JSON document with [`OptimizerConfig::from_json`]. Call [`validate`] before
/// use; the driver does this once at construction.
///
/// [`validate`]: OptimizerConfig::validate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Ceiling on the population size
    pub population_cap: usize,

    /// Number of generations to run (generation 0 included)
    pub generations: u32,

    /// Share of new candidates produced by mutation
    pub mutation_rate: f64,

    /// Share of new candidates produced by crossover
    pub crossover_rate: f64,

    /// Max external calls in flight at once
    pub max_concurrency: usize,

    /// Timeout for a single external call attempt (milliseconds)
    pub call_timeout_ms: u64,

    /// Retries after the first attempt for transient failures
    pub max_retries: u32,

    /// Base delay for exponential backoff (milliseconds)
    pub retry_base_delay_ms: u64,

    /// How strongly crossover instructions push away from common patterns
    pub diversity_weight: f64,

    /// Lowest assessment ordinal
    pub score_min: u8,

    /// Highest assessment ordinal
    pub score_max: u8,

    /// How many recent non-fallback texts feed population pattern analysis
    pub pattern_window: usize,

    /// Re-run the persona panel on every candidate each generation
    pub reevaluate_existing: bool,

    /// RNG seed for parent sampling; entropy when unset
    pub seed: Option<u64>,

    /// Conversation rounds requested from the simulator
    pub simulation_rounds: u32,

    /// Scenario description passed to the simulator
    pub scenario: String,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            population_cap: 20,
            generations: 5,
            mutation_rate: 0.3,
            crossover_rate: 0.6,
            max_concurrency: 10,
            call_timeout_ms: 60_000,
            max_retries: 2,
            retry_base_delay_ms: 500,
            diversity_weight: 0.7,
            score_min: 1,
            score_max: 4,
            pattern_window: 10,
            reevaluate_existing: false,
            seed: None,
            simulation_rounds: 5,
            scenario: "Social skills coaching session".to_string(),
        }
    }
}

impl OptimizerConfig {
    /// Parse and validate a JSON configuration document.
    ///
    /// Missing fields take their default values.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check every option, failing on the first invalid one.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.population_cap == 0 {
            return Err(ConfigError::NotPositive { field: "population_cap" });
        }
        if self.generations == 0 {
            return Err(ConfigError::NotPositive { field: "generations" });
        }
        if self.max_concurrency == 0 {
            return Err(ConfigError::NotPositive { field: "max_concurrency" });
        }
        if self.call_timeout_ms == 0 {
            return Err(ConfigError::NotPositive { field: "call_timeout_ms" });
        }
        if self.pattern_window == 0 {
            return Err(ConfigError::NotPositive { field: "pattern_window" });
        }
        if self.simulation_rounds == 0 {
            return Err(ConfigError::NotPositive { field: "simulation_rounds" });
        }
        check_unit("mutation_rate", self.mutation_rate)?;
        check_unit("crossover_rate", self.crossover_rate)?;
        check_unit("diversity_weight", self.diversity_weight)?;

        let sum = self.mutation_rate + self.crossover_rate;
        if sum <= 0.0 || sum > 1.0 + f64::EPSILON {
            return Err(ConfigError::RateSum { sum });
        }
        if self.score_min == 0 || self.score_min >= self.score_max {
            return Err(ConfigError::ScoreRange {
                min: self.score_min,
                max: self.score_max,
            });
        }
        Ok(())
    }

    /// Set the population ceiling.
    pub fn with_population_cap(mut self, cap: usize) -> Self {
        self.population_cap = cap;
        self
    }

    /// Set the generation count.
    pub fn with_generations(mut self, generations: u32) -> Self {
        self.generations = generations;
        self
    }

    /// Set crossover and mutation rates.
    pub fn with_rates(mut self, crossover_rate: f64, mutation_rate: f64) -> Self {
        self.crossover_rate = crossover_rate;
        self.mutation_rate = mutation_rate;
        self
    }

    /// Set max concurrent external calls.
    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max;
        self
    }

    /// Set per-call timeout.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set retry bound and base backoff delay.
    pub fn with_retries(mut self, max_retries: u32, base_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_base_delay_ms = base_delay.as_millis() as u64;
        self
    }

    /// Set the diversity weight.
    pub fn with_diversity_weight(mut self, weight: f64) -> Self {
        self.diversity_weight = weight;
        self
    }

    /// Set the RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Re-evaluate existing candidates every generation.
    pub fn with_reevaluation(mut self, enabled: bool) -> Self {
        self.reevaluate_existing = enabled;
        self
    }

    /// Per-call timeout.
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    /// Base backoff delay.
    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    /// `min(2^generation, population_cap)`.
    pub fn target_size(&self, generation: u32) -> usize {
        if generation >= usize::BITS - 1 {
            return self.population_cap;
        }
        (1usize << generation).min(self.population_cap)
    }
}

fn check_unit(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::OutOfRange { field, value, min: 0.0, max: 1.0 });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(OptimizerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_non_positive_sizes() {
        let config = OptimizerConfig::default().with_population_cap(0);
        assert_eq!(
            config.validate(),
            Err(ConfigError::NotPositive { field: "population_cap" })
        );
        let config = OptimizerConfig::default().with_max_concurrency(0);
        assert!(config.validate().is_err());
        let config = OptimizerConfig::default().with_generations(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_rates_summing_above_one() {
        let config = OptimizerConfig::default().with_rates(0.7, 0.5);
        assert!(matches!(config.validate(), Err(ConfigError::RateSum { .. })));
        let config = OptimizerConfig::default().with_rates(0.0, 0.0);
        assert!(matches!(config.validate(), Err(ConfigError::RateSum { .. })));
    }

    #[test]
    fn test_rejects_out_of_range_weight() {
        let config = OptimizerConfig::default().with_diversity_weight(1.5);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange { field: "diversity_weight", .. })
        ));
    }

    #[test]
    fn test_target_size_policy() {
        let config = OptimizerConfig::default().with_population_cap(4);
        let sizes: Vec<_> = (0..5).map(|g| config.target_size(g)).collect();
        assert_eq!(sizes, vec![1, 2, 4, 4, 4]);
        assert_eq!(config.target_size(200), 4);
    }

    #[test]
    fn test_from_json_fills_defaults_and_validates() {
        let config = OptimizerConfig::from_json(r#"{"population_cap": 8, "generations": 3}"#).unwrap();
        assert_eq!(config.population_cap, 8);
        assert_eq!(config.max_concurrency, 10);

        let err = OptimizerConfig::from_json(r#"{"crossover_rate": 0.9, "mutation_rate": 0.9}"#);
        assert!(matches!(err, Err(ConfigError::RateSum { .. })));

        let err = OptimizerConfig::from_json("not json");
        assert!(matches!(err, Err(ConfigError::Parse(_))));
    }
}
