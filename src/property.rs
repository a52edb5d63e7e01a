//! Property driver: generate one value from a byte buffer, check it, and
//! greedily shrink it if the check fails.
//!
//! ```
//! use conjecture_finite::generator::ints;
//! use conjecture_finite::property::{property, CheckResult};
//!
//! let mut large = property(ints::<i32>().between(0, 100), |n: &i32| *n >= 10);
//! match large.check(&[0xff, 0, 0, 0, 0x0d]).unwrap() {
//!     CheckResult::Failed(failure) => assert_eq!(failure.counterexample, 0),
//!     CheckResult::Passed => unreachable!(),
//! }
//! ```

use std::fmt;
use std::ops::Range;

use crate::entropy::Entropy;
use crate::error::Result;
use crate::generator::{Generated, Generator};

/// A hook run around every evaluation of the predicate.
enum Hook<C> {
    Plain(Box<dyn FnMut()>),
    WithContext(Box<dyn FnMut(&mut C)>),
}

impl<C> Hook<C> {
    fn run(&mut self, context: &mut C) {
        match self {
            Hook::Plain(hook) => hook(),
            Hook::WithContext(hook) => hook(context),
        }
    }
}

impl Hook<()> {
    /// Rebinds a hook registered before a context was attached.
    fn rebind<D: 'static>(self) -> Hook<D> {
        match self {
            Hook::Plain(hook) => Hook::Plain(hook),
            Hook::WithContext(mut hook) => Hook::WithContext(Box::new(move |_: &mut D| hook(&mut ()))),
        }
    }
}

/// A generator paired with the predicate every generated value must satisfy.
pub struct Property<G, P, C = ()> {
    generator: G,
    predicate: P,
    context: C,
    before: Option<Hook<C>>,
    after: Option<Hook<C>>,
    shrink_limit: Option<usize>,
}

pub fn property<G, P>(generator: G, predicate: P) -> Property<G, P>
where
    G: Generator,
    P: FnMut(&G::Value) -> bool,
{
    Property {
        generator,
        predicate,
        context: (),
        before: None,
        after: None,
        shrink_limit: None,
    }
}

impl<G, P> Property<G, P, ()> {
    /// Attaches a context that `*_with` hooks receive mutably.
    pub fn with_context<D: 'static>(self, context: D) -> Property<G, P, D> {
        Property {
            generator: self.generator,
            predicate: self.predicate,
            context,
            before: self.before.map(Hook::rebind),
            after: self.after.map(Hook::rebind),
            shrink_limit: self.shrink_limit,
        }
    }
}

impl<G, P, C> Property<G, P, C>
where
    G: Generator,
    P: FnMut(&G::Value) -> bool,
{
    pub fn before_each<H: FnMut() + 'static>(mut self, hook: H) -> Self {
        self.before = Some(Hook::Plain(Box::new(hook)));
        self
    }

    pub fn before_each_with<H: FnMut(&mut C) + 'static>(mut self, hook: H) -> Self {
        self.before = Some(Hook::WithContext(Box::new(hook)));
        self
    }

    pub fn after_each<H: FnMut() + 'static>(mut self, hook: H) -> Self {
        self.after = Some(Hook::Plain(Box::new(hook)));
        self
    }

    pub fn after_each_with<H: FnMut(&mut C) + 'static>(mut self, hook: H) -> Self {
        self.after = Some(Hook::WithContext(Box::new(hook)));
        self
    }

    /// Stops shrinking after `limit` accepted steps.
    pub fn with_shrink_limit(mut self, limit: usize) -> Self {
        self.shrink_limit = Some(limit);
        self
    }

    pub fn context(&self) -> &C {
        &self.context
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    /// Runs the predicate on one value with the hooks around it.
    fn holds(&mut self, value: &G::Value) -> bool {
        if let Some(hook) = self.before.as_mut() {
            hook.run(&mut self.context);
        }
        let holds = (self.predicate)(value);
        if let Some(hook) = self.after.as_mut() {
            hook.run(&mut self.context);
        }
        holds
    }

    /// Generates one value from `bytes` and checks it.
    ///
    /// A failing value is shrunk greedily: each round takes the first
    /// candidate that still fails, and shrinking stops when a round finds
    /// none or the shrink limit is reached. Running out of bytes during
    /// generation is an error, never a pass.
    pub fn check(&mut self, bytes: &[u8]) -> Result<CheckResult<G::Value>> {
        let mut entropy = Entropy::new(bytes);
        let generated = self.generator.generate(&mut entropy.random())?;
        if self.holds(&generated.value) {
            return Ok(CheckResult::Passed);
        }

        log::debug!("property failed for {:?}, shrinking", generated.value);
        let original = generated.value.clone();
        let reproduction = generated.provenance.clone();
        let mut current = generated;
        let mut shrinks = 0;
        while self.shrink_limit.map_or(true, |limit| shrinks < limit) {
            match self.first_failing(&current)? {
                Some(simpler) => {
                    shrinks += 1;
                    log::debug!("shrink step {}: {:?}", shrinks, simpler.value);
                    current = simpler;
                }
                None => break,
            }
        }

        Ok(CheckResult::Failed(Failure {
            counterexample: current.value,
            original,
            shrinks,
            reproduction,
        }))
    }

    fn first_failing(&mut self, current: &Generated<G::Value>) -> Result<Option<Generated<G::Value>>> {
        if current.context.is_none() && !self.generator.can_shrink_without_context(&current.value) {
            return Ok(None);
        }
        for candidate in self.generator.shrink(&current.value, current.context())? {
            if !self.holds(&candidate.value) {
                return Ok(Some(candidate));
            }
        }
        Ok(None)
    }
}

impl<G: fmt::Debug, P, C: fmt::Debug> fmt::Debug for Property<G, P, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("generator", &self.generator)
            .field("context", &self.context)
            .field("shrink_limit", &self.shrink_limit)
            .finish()
    }
}

/// Outcome of a single check.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckResult<T> {
    Passed,
    Failed(Failure<T>),
}

impl<T> CheckResult<T> {
    pub fn is_passed(&self) -> bool {
        matches!(self, CheckResult::Passed)
    }

    pub fn failure(&self) -> Option<&Failure<T>> {
        match self {
            CheckResult::Passed => None,
            CheckResult::Failed(failure) => Some(failure),
        }
    }

    pub fn into_failure(self) -> Option<Failure<T>> {
        match self {
            CheckResult::Passed => None,
            CheckResult::Failed(failure) => Some(failure),
        }
    }
}

/// A shrunk counterexample together with what produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Failure<T> {
    /// The simplest failing value found.
    pub counterexample: T,
    /// The value first generated from the buffer.
    pub original: T,
    /// Accepted shrink steps.
    pub shrinks: usize,
    /// Bytes of the input buffer that generate `original` on their own.
    pub reproduction: Option<Range<usize>>,
}

impl<T> Failure<T> {
    /// The slice of `bytes` that reproduces the original failure.
    pub fn reproducer<'b>(&self, bytes: &'b [u8]) -> Option<&'b [u8]> {
        self.reproduction
            .clone()
            .and_then(|range| bytes.get(range))
    }
}

impl<T: fmt::Debug> fmt::Display for Failure<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "falsified by {:?} after {} shrinks (originally {:?})",
            self.counterexample, self.shrinks, self.original
        )?;
        if let Some(range) = &self.reproduction {
            write!(f, ", reproduce with bytes {}..{}", range.start, range.end)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::generator::{booleans, ints, vecs};
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_passing_property() {
        let mut p = property(booleans(), |_: &bool| true);
        assert!(p.check(&[1]).unwrap().is_passed());
    }

    #[test]
    fn test_exhaustion_is_an_error() {
        let mut p = property(ints::<u32>(), |_: &u32| false);
        let err = p.check(&[0xff, 1, 2]).unwrap_err();
        assert!(matches!(err, Error::OutOfEntropy { .. }));
    }

    #[test]
    fn test_bool_shrinks_in_one_step() {
        let mut p = property(booleans(), |_: &bool| false);
        let failure = p.check(&[1]).unwrap().into_failure().unwrap();
        assert!(!failure.counterexample);
        assert!(failure.original);
        assert_eq!(failure.shrinks, 1);
        assert_eq!(failure.reproduction, Some(0..1));
    }

    #[test]
    fn test_shrinks_to_zero() {
        // 0x0d000000 * 101 >> 32 = 5 in [0, 100].
        let mut p = property(ints::<i32>().between(0, 100), |n: &i32| *n >= 10);
        let failure = p.check(&[0xff, 0, 0, 0, 0x0d]).unwrap().into_failure().unwrap();
        assert_eq!(failure.original, 5);
        assert_eq!(failure.counterexample, 0);
        assert_eq!(failure.shrinks, 3);
    }

    #[test]
    fn test_greedy_shrink_stops_at_local_minimum() {
        // 0x40000000 * 101 >> 32 = 25; halving to 12 fails, then every
        // candidate of 12 passes.
        let mut p = property(ints::<i32>().between(0, 100), |n: &i32| *n < 10);
        let failure = p.check(&[0xff, 0, 0, 0, 0x40]).unwrap().into_failure().unwrap();
        assert_eq!(failure.original, 25);
        assert_eq!(failure.counterexample, 12);
        assert_eq!(failure.shrinks, 1);
    }

    #[test]
    fn test_shrink_limit() {
        let mut p = property(vecs(booleans()).len(0, 16), |v: &Vec<bool>| v.is_empty())
            .with_shrink_limit(1);
        let bytes = [0xff, 0xff, 0xff, 0xff, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1];
        let failure = p.check(&bytes).unwrap().into_failure().unwrap();
        assert_eq!(failure.shrinks, 1);
        assert_eq!(failure.original.len(), 16);
        assert_eq!(failure.counterexample.len(), 8);
    }

    #[test]
    fn test_hooks_wrap_every_evaluation() {
        let before = Rc::new(Cell::new(0));
        let after = Rc::new(Cell::new(0));
        let (b, a) = (Rc::clone(&before), Rc::clone(&after));
        let mut p = property(booleans(), |_: &bool| false)
            .before_each(move || b.set(b.get() + 1))
            .after_each(move || a.set(a.get() + 1));
        p.check(&[1]).unwrap();
        // The original value plus the single `false` candidate.
        assert_eq!(before.get(), 2);
        assert_eq!(after.get(), 2);
    }

    #[test]
    fn test_context_hooks() {
        let mut p = property(booleans(), |b: &bool| !*b)
            .before_each(|| {})
            .with_context(Vec::<&'static str>::new())
            .before_each_with(|log: &mut Vec<&'static str>| log.push("before"))
            .after_each_with(|log: &mut Vec<&'static str>| log.push("after"));
        assert!(p.check(&[0]).unwrap().is_passed());
        assert_eq!(p.context(), &vec!["before", "after"]);
    }

    #[test]
    fn test_unit_context_hooks_survive_with_context() {
        let calls = Rc::new(Cell::new(0));
        let c = Rc::clone(&calls);
        let mut p = property(booleans(), |_: &bool| true)
            .before_each_with(move |_: &mut ()| c.set(c.get() + 1))
            .with_context(5u8);
        p.check(&[0]).unwrap();
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_failure_display_and_reproducer() {
        let failure = Failure {
            counterexample: 0,
            original: 9,
            shrinks: 2,
            reproduction: Some(1..3),
        };
        assert_eq!(
            failure.to_string(),
            "falsified by 0 after 2 shrinks (originally 9), reproduce with bytes 1..3"
        );
        assert_eq!(failure.reproducer(&[7, 8, 9, 10]), Some(&[8, 9][..]));
        assert_eq!(failure.reproducer(&[7]), None);
    }
}
