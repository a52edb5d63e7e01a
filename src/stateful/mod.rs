//! # Stateful testing
//!
//! A [`StateMachine`] drives a reference model and a system under test with
//! the same sequence of [`Command`]s, drawn one at a time from the byte
//! buffer. Every command checks its precondition against the model, then
//! [`Command::apply_to_pair`] advances both sides and reports whether they
//! still agree.
//!
//! When they disagree the failing window of the recorded history is
//! narrowed by bisection: model and system are rebuilt from their factories
//! and only the right half of the window is replayed, then only the left
//! half. Whichever half still reproduces the disagreement becomes the new
//! window. The search stops when neither half does on its own, so the
//! commands never have to be reversible, only rebuildable.

use std::fmt;
use std::ops::Range;

use crate::entropy::Entropy;
use crate::error::Result;

pub mod command_list;

pub use self::command_list::{CommandList, Entry, Recorder, Replayer};

/// An operation applied to the model alone or to the model and system in
/// lockstep.
pub trait Command<M, S>: fmt::Debug {
    /// Whether the command may run in the model's current state. Commands
    /// whose precondition fails are skipped without being reported.
    fn check_precondition(&self, _model: &M) -> bool {
        true
    }

    fn apply_to_model(&self, model: &mut M);

    /// Applies the command to both sides and returns whether their
    /// observable states still agree.
    fn apply_to_pair(&self, model: &mut M, system: &mut S) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateMachineConfig {
    /// Commands drawn per forward run, skipped ones included.
    pub max_steps: usize,
}

impl Default for StateMachineConfig {
    fn default() -> Self {
        StateMachineConfig { max_steps: 100 }
    }
}

pub struct StateMachine<M, S> {
    commands: Vec<Box<dyn Command<M, S>>>,
    new_model: Box<dyn Fn() -> M>,
    new_system: Box<dyn Fn() -> S>,
    config: StateMachineConfig,
}

impl<M, S> StateMachine<M, S> {
    /// A machine with no commands yet. The factories build the initial
    /// model and system, and are called again before every replay.
    pub fn new<FM, FS>(new_model: FM, new_system: FS) -> StateMachine<M, S>
    where
        FM: Fn() -> M + 'static,
        FS: Fn() -> S + 'static,
    {
        StateMachine {
            commands: Vec::new(),
            new_model: Box::new(new_model),
            new_system: Box::new(new_system),
            config: StateMachineConfig::default(),
        }
    }

    pub fn command<C: Command<M, S> + 'static>(mut self, command: C) -> StateMachine<M, S> {
        self.commands.push(Box::new(command));
        self
    }

    pub fn with_config(mut self, config: StateMachineConfig) -> StateMachine<M, S> {
        self.config = config;
        self
    }

    pub fn config(&self) -> &StateMachineConfig {
        &self.config
    }

    pub fn commands(&self) -> &[Box<dyn Command<M, S>>] {
        &self.commands
    }

    fn assert_has_commands(&self) {
        assert!(!self.commands.is_empty(), "state machine has no commands");
    }

    /// Runs one command sequence drawn from `bytes` and, on a disagreement,
    /// narrows the sequence down.
    pub fn run(&self, bytes: &[u8]) -> Result<StatefulResult> {
        self.assert_has_commands();
        let mut entropy = Entropy::new(bytes);
        let mut list = CommandList::new();
        let mut model = (self.new_model)();
        let mut system = (self.new_system)();
        let mut passed_steps = 0;
        let mut failed_at = None;

        let recorder = Recorder::new(
            entropy.random(),
            &mut list,
            self.commands.len(),
            self.config.max_steps,
        );
        for (position, index) in recorder.enumerate() {
            let command = &self.commands[index?];
            if !command.check_precondition(&model) {
                log::trace!("precondition rejected {:?}", command);
                continue;
            }
            if !command.apply_to_pair(&mut model, &mut system) {
                failed_at = Some(position);
                break;
            }
            passed_steps += 1;
        }

        let failed_at = match failed_at {
            Some(position) => position,
            None => return Ok(StatefulResult::Passed { steps: passed_steps }),
        };
        let original_window = 0..failed_at + 1;
        log::debug!(
            "model and system disagree after {} steps, window {:?}",
            passed_steps,
            original_window
        );

        let (window, probes) = self.shrink_window(bytes, &list, original_window.clone())?;
        let commands = list.entries()[window.clone()]
            .iter()
            .map(|entry| format!("{:?}", self.commands[entry.index]))
            .collect();
        Ok(StatefulResult::Failed(SequenceFailure {
            passed_steps,
            original_window,
            window,
            commands,
            list,
            probes,
        }))
    }

    /// Rebuilds model and system, replays `window` of a recorded history and
    /// returns whether the two sides disagree at some point.
    pub fn replay(&self, bytes: &[u8], list: &CommandList, window: Range<usize>) -> Result<bool> {
        assert!(
            window.start <= window.end && window.end <= list.len(),
            "window {:?} outside a history of {} commands",
            window,
            list.len()
        );
        let mut entropy = Entropy::new(bytes);
        let mut model = (self.new_model)();
        let mut system = (self.new_system)();
        let replayer = Replayer::new(entropy.random(), &list.entries()[window], self.commands.len());
        for index in replayer {
            let command = &self.commands[index?];
            if !command.check_precondition(&model) {
                continue;
            }
            if !command.apply_to_pair(&mut model, &mut system) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Draws a command sequence from `bytes` and runs it against the model
    /// alone, returning the indices of the commands that were applied.
    pub fn preview(&self, bytes: &[u8]) -> Result<Vec<usize>> {
        self.assert_has_commands();
        let mut entropy = Entropy::new(bytes);
        let mut list = CommandList::new();
        let mut model = (self.new_model)();
        let mut applied = Vec::new();
        let recorder = Recorder::new(
            entropy.random(),
            &mut list,
            self.commands.len(),
            self.config.max_steps,
        );
        for index in recorder {
            let index = index?;
            let command = &self.commands[index];
            if command.check_precondition(&model) {
                command.apply_to_model(&mut model);
                applied.push(index);
            }
        }
        Ok(applied)
    }

    /// Bisects `window` until neither half reproduces on its own. Returns
    /// the final window and the number of replays it took.
    fn shrink_window(
        &self,
        bytes: &[u8],
        list: &CommandList,
        mut window: Range<usize>,
    ) -> Result<(Range<usize>, usize)> {
        let mut probes = 0;
        while window.len() > 1 {
            let mid = window.start + window.len() / 2;

            probes += 1;
            if self.replay(bytes, list, mid..window.end)? {
                log::debug!("narrowed failing window to {:?}", mid..window.end);
                window = mid..window.end;
                continue;
            }

            probes += 1;
            if self.replay(bytes, list, window.start..mid)? {
                log::debug!("narrowed failing window to {:?}", window.start..mid);
                window = window.start..mid;
                continue;
            }

            log::debug!("neither half of {:?} fails alone", window);
            break;
        }
        Ok((window, probes))
    }
}

impl<M, S> fmt::Debug for StateMachine<M, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateMachine")
            .field("commands", &self.commands)
            .field("config", &self.config)
            .finish()
    }
}

/// Outcome of a stateful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatefulResult {
    /// Model and system agreed throughout; `steps` commands were applied.
    Passed { steps: usize },
    Failed(SequenceFailure),
}

impl StatefulResult {
    pub fn is_passed(&self) -> bool {
        matches!(self, StatefulResult::Passed { .. })
    }

    pub fn failure(&self) -> Option<&SequenceFailure> {
        match self {
            StatefulResult::Passed { .. } => None,
            StatefulResult::Failed(failure) => Some(failure),
        }
    }
}

/// A narrowed command sequence on which model and system disagree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceFailure {
    /// Commands applied without disagreement before the failure.
    pub passed_steps: usize,
    /// History positions of the forward run up to the failing command.
    pub original_window: Range<usize>,
    /// The narrowed positions. Replaying them from scratch still fails.
    pub window: Range<usize>,
    /// The commands in `window`, formatted with `Debug`.
    pub commands: Vec<String>,
    /// History of the forward run.
    pub list: CommandList,
    /// Replays spent narrowing the window.
    pub probes: usize,
}

impl fmt::Display for SequenceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "model and system disagree after {} steps; commands {:?} of {:?} reproduce it: {}",
            self.passed_steps,
            self.window,
            self.original_window,
            self.commands.join(", ")
        )
    }
}
