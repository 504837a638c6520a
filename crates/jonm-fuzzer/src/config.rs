//! Engine configuration

use serde::{Deserialize, Serialize};

/// Configuration for the fuzzing engines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Consecutive mutations derived from one seed per round (default: 5)
    pub num_consecutive_mutations: usize,
    /// Template-based generation budget for the generative engine (default: 3)
    pub num_consecutive_jenerations: usize,
    /// Hybrid weight of the mutation engine (default: 6)
    pub weight_mutation: u32,
    /// Hybrid weight of the generative engine (default: 2)
    pub weight_jeneration: u32,
    /// Hybrid weight of the JoN mutation engine (default: 2)
    pub weight_jon_mutation: u32,
    /// Trip count of injected warmup loops, chosen to cross the OSR
    /// threshold of common JIT tiers (default: 921)
    pub max_loop_trip_count_in_jit: i64,
    /// Instruction budget for generated neutral code blocks (default: 10)
    pub small_code_block_size: usize,
    /// Per-subroutine cap on checksum updates under the Modest policy
    /// (default: 50)
    pub max_updates_per_subroutine: i64,
    /// Probability of inserting a checksum update after an instruction
    /// (default: 0.2)
    pub checksum_insertion_prob: f64,
    /// Attempts per mutator pick before falling back (default: 5)
    pub max_mutation_attempts: usize,
    /// Executions required by the determinism gate (default: 3)
    pub determinism_executions: usize,
    /// Per-execution timeout in milliseconds, applied by the runner
    /// (default: 2000)
    pub execution_timeout_ms: u64,
    /// Reserved; accepted but never consumed
    pub probability_of_generating_new: f64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            num_consecutive_mutations: 5,
            num_consecutive_jenerations: 3,
            weight_mutation: 6,
            weight_jeneration: 2,
            weight_jon_mutation: 2,
            max_loop_trip_count_in_jit: 921,
            small_code_block_size: 10,
            max_updates_per_subroutine: 50,
            checksum_insertion_prob: 0.2,
            max_mutation_attempts: 5,
            determinism_executions: 3,
            execution_timeout_ms: 2000,
            probability_of_generating_new: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.num_consecutive_mutations, 5);
        assert_eq!(config.max_loop_trip_count_in_jit, 921);
        assert_eq!(config.max_updates_per_subroutine, 50);
        assert_eq!(config.checksum_insertion_prob, 0.2);
        assert_eq!(config.weight_mutation, 6);
        assert_eq!(config.weight_jon_mutation, 2);
    }
}
