//! Runner - repeated checks over seeded random buffers
//!
//! A single check consumes one caller-supplied buffer. The runner fills
//! buffers from a seeded ChaCha stream and checks a property (or runs a
//! state machine) against each until one fails or the example budget is
//! spent. Buffers that run dry are skipped and counted as overruns.

use byteorder::{ByteOrder, LittleEndian};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use crate::generator::Generator;
use crate::property::{CheckResult, Failure, Property};
use crate::stateful::{SequenceFailure, StateMachine, StatefulResult};

/// Configuration for the Runner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
    /// Maximum number of buffers to check
    pub max_examples: u32,

    /// Size in bytes of every generated buffer
    pub buffer_size: usize,

    /// Seed of the buffer stream
    pub seed: u64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_examples: 100,
            buffer_size: 1024,
            seed: 0,
        }
    }
}

impl RunnerConfig {
    /// Default configuration with a seed derived from `label`, so every
    /// named test gets its own stable buffer stream.
    pub fn for_label(label: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(label.as_bytes());
        let digest = hasher.finalize();
        Self {
            seed: LittleEndian::read_u64(&digest[..8]),
            ..Self::default()
        }
    }
}

/// Statistics about a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunnerStats {
    /// Buffers handed out
    pub examples_generated: u32,

    /// Checks that passed
    pub passed: u32,

    /// Checks skipped because their buffer ran out of entropy
    pub overruns: u32,
}

/// Main test execution loop
#[derive(Debug)]
pub struct Runner {
    config: RunnerConfig,
    stats: RunnerStats,
    rng: ChaCha8Rng,
}

/// Outcome of checking a single buffer
enum Outcome<F> {
    Valid,
    Interesting(F),
    Overrun,
}

impl Runner {
    pub fn new(config: RunnerConfig) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        Self {
            config,
            stats: RunnerStats::default(),
            rng,
        }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub fn stats(&self) -> &RunnerStats {
        &self.stats
    }

    /// The next buffer of the seeded stream.
    pub fn next_buffer(&mut self) -> Vec<u8> {
        let mut buffer = vec![0u8; self.config.buffer_size];
        self.rng.fill_bytes(&mut buffer);
        buffer
    }

    /// Checks `property` against fresh buffers until one fails.
    pub fn run<G, P, C>(&mut self, property: &mut Property<G, P, C>) -> Result<RunResult<Failure<G::Value>>>
    where
        G: Generator,
        P: FnMut(&G::Value) -> bool,
    {
        self.drive(|buffer| {
            Ok(match property.check(buffer)? {
                CheckResult::Passed => Outcome::Valid,
                CheckResult::Failed(failure) => Outcome::Interesting(failure),
            })
        })
    }

    /// Runs `machine` against fresh buffers until model and system disagree.
    pub fn run_state_machine<M, S>(&mut self, machine: &StateMachine<M, S>) -> Result<RunResult<SequenceFailure>> {
        self.drive(|buffer| {
            Ok(match machine.run(buffer)? {
                StatefulResult::Passed { .. } => Outcome::Valid,
                StatefulResult::Failed(failure) => Outcome::Interesting(failure),
            })
        })
    }

    fn drive<F, T>(&mut self, mut check: T) -> Result<RunResult<F>>
    where
        T: FnMut(&[u8]) -> Result<Outcome<F>>,
    {
        for _ in 0..self.config.max_examples {
            let buffer = self.next_buffer();
            self.stats.examples_generated += 1;
            let outcome = match check(&buffer) {
                Err(Error::OutOfEntropy { needed, remaining }) => {
                    log::debug!(
                        "example {} overran its buffer: needed {} bytes, {} left",
                        self.stats.examples_generated,
                        needed,
                        remaining
                    );
                    Outcome::Overrun
                }
                other => other?,
            };
            match outcome {
                Outcome::Valid => self.stats.passed += 1,
                Outcome::Overrun => self.stats.overruns += 1,
                Outcome::Interesting(failure) => {
                    log::debug!("example {} failed", self.stats.examples_generated);
                    return Ok(RunResult::Failed { failure, buffer });
                }
            }
        }
        log::debug!(
            "all {} examples done: {} passed, {} overran",
            self.stats.examples_generated,
            self.stats.passed,
            self.stats.overruns
        );
        Ok(RunResult::Passed)
    }
}

/// Result of running the entire test
#[derive(Debug, Clone, PartialEq)]
pub enum RunResult<F> {
    /// No failing buffer within the example budget
    Passed,
    /// A failure, with the buffer that produced it
    Failed { failure: F, buffer: Vec<u8> },
}

impl<F> RunResult<F> {
    pub fn is_passed(&self) -> bool {
        matches!(self, RunResult::Passed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::{booleans, ints, vecs};
    use crate::property::property;

    #[test]
    fn test_runner_creation() {
        let config = RunnerConfig::default();
        let runner = Runner::new(config.clone());

        assert_eq!(runner.config().max_examples, 100);
        assert_eq!(runner.config().buffer_size, 1024);
        assert_eq!(runner.stats(), &RunnerStats::default());
    }

    #[test]
    fn test_buffers_follow_the_seed() {
        let mut a = Runner::new(RunnerConfig::default());
        let mut b = Runner::new(RunnerConfig::default());
        let mut c = Runner::new(RunnerConfig {
            seed: 1,
            ..RunnerConfig::default()
        });
        let first = a.next_buffer();
        assert_eq!(first.len(), 1024);
        assert_eq!(first, b.next_buffer());
        assert_ne!(first, c.next_buffer());
        assert_ne!(first, a.next_buffer());
    }

    #[test]
    fn test_label_seeds() {
        assert_eq!(RunnerConfig::for_label("a"), RunnerConfig::for_label("a"));
        assert_ne!(
            RunnerConfig::for_label("a").seed,
            RunnerConfig::for_label("b").seed
        );
        assert_eq!(RunnerConfig::for_label("a").max_examples, 100);
    }

    #[test]
    fn test_passing_property() {
        let mut runner = Runner::new(RunnerConfig::default());
        let mut p = property(ints::<i64>(), |_: &i64| true);
        assert!(runner.run(&mut p).unwrap().is_passed());
        assert_eq!(runner.stats().examples_generated, 100);
        assert_eq!(runner.stats().passed, 100);
    }

    #[test]
    fn test_failing_property_keeps_buffer() {
        let mut runner = Runner::new(RunnerConfig::default());
        let mut p = property(ints::<u8>(), |x: &u8| *x < 100);
        match runner.run(&mut p).unwrap() {
            RunResult::Failed { failure, buffer } => {
                assert!(failure.counterexample >= 100);
                assert!(failure.counterexample <= failure.original);
                let reproducer = failure.reproducer(&buffer).unwrap();
                let mut again = property(ints::<u8>(), |x: &u8| *x < 100);
                let replayed = again.check(reproducer).unwrap().into_failure().unwrap();
                assert_eq!(replayed.original, failure.original);
            }
            RunResult::Passed => panic!("expected a failure"),
        }
    }

    #[test]
    fn test_overruns_are_skipped() {
        let mut runner = Runner::new(RunnerConfig {
            max_examples: 10,
            buffer_size: 8,
            seed: 3,
        });
        let mut p = property(vecs(booleans()).len(32, 32), |_: &Vec<bool>| false);
        assert!(runner.run(&mut p).unwrap().is_passed());
        assert_eq!(runner.stats().overruns, 10);
        assert_eq!(runner.stats().passed, 0);
    }
}
