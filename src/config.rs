//! Tunables for the probabilistic prime search.

use std::num::NonZeroUsize;

/// Default Miller-Rabin certainty: false-positive probability at most 2^-100
pub const DEFAULT_CERTAINTY: u32 = 100;

/// Prime search configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrimeSearchConfig {
    /// Primality certainty passed to `BigInt::is_probable_prime`
    pub certainty: u32,
    /// Number of workers used by the parallel Blum search
    pub parallelism: usize,
}

impl Default for PrimeSearchConfig {
    fn default() -> Self {
        let cores = std::thread::available_parallelism().map_or(1, NonZeroUsize::get);
        Self {
            certainty: DEFAULT_CERTAINTY,
            parallelism: (cores / 2).max(1),
        }
    }
}

impl PrimeSearchConfig {
    /// Override the certainty
    #[must_use]
    pub const fn with_certainty(mut self, certainty: u32) -> Self {
        self.certainty = certainty;
        self
    }

    /// Override the worker count (zero is treated as one)
    #[must_use]
    pub const fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism;
        self
    }

    /// Worker count actually used
    #[must_use]
    pub fn workers(&self) -> usize {
        self.parallelism.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_has_at_least_one_worker() {
        let config = PrimeSearchConfig::default();
        assert!(config.workers() >= 1);
        assert_eq!(config.certainty, DEFAULT_CERTAINTY);
    }

    #[test]
    fn test_zero_parallelism_means_one_worker() {
        let config = PrimeSearchConfig::default().with_parallelism(0);
        assert_eq!(config.workers(), 1);
    }
}
