//! # Conjecture Finite
//!
//! Property-based and stateful testing driven by a finite byte buffer.
//!
//! Every random decision is a typed draw from an [`Entropy`] source over a
//! caller-supplied buffer, so the same bytes always produce the same test
//! case. Failing values are shrunk greedily through their generators, and
//! the byte range that produced the original failure is reported for
//! replay. Command sequences of stateful tests are drawn from the same
//! buffer and narrowed by bisection when the model and the system disagree.

pub mod engine;
pub mod entropy;
pub mod error;
pub mod floats;
pub mod generator;
pub mod ints;
pub mod property;
pub mod stateful;

// Re-export core types for easy access
pub use engine::{RunResult, Runner, RunnerConfig, RunnerStats};
pub use entropy::{Entropy, Random};
pub use error::{Error, Result};
pub use generator::{any, Generate, Generated, Generator, ShrinkContext};
pub use property::{property, CheckResult, Failure, Property};
pub use stateful::{
    Command, CommandList, SequenceFailure, StateMachine, StateMachineConfig, StatefulResult,
};
