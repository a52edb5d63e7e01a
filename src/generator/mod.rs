//! # Generator algebra
//!
//! A [`Generator`] turns draws from a [`Random`] handle into a value, and
//! knows how to propose simpler variants of a value it produced. Values come
//! back wrapped in [`Generated`], which also carries:
//!
//! - an optional [`ShrinkContext`]: whatever extra state the generator needs
//!   to shrink the value later without going back to the bytes (the
//!   pre-image of a mapped value, the arm of a union, per-element contexts
//!   of a collection);
//! - an optional provenance range: the `[start, end)` slice of the buffer
//!   that produced the value. Feeding exactly those bytes to the same
//!   generator as a standalone buffer reproduces the value.
//!
//! Shape dispatch is static. Every supported type implements [`Generate`],
//! so `any::<Vec<Option<i16>>>()` assembles the generator tree for that type
//! at compile time, and the builders in the submodules configure ranges,
//! lengths and ratios per node of the tree.

use std::any::Any;
use std::fmt;
use std::ops::Range;
use std::rc::Rc;

use crate::entropy::Random;
use crate::error::Result;

pub mod collections;
pub mod combinators;
pub mod pointers;
pub mod primitives;
pub mod products;
pub mod sums;

pub use self::collections::{
    arrays, strings, vecs, vectors, ArrayGenerator, SliceGenerator, StringGenerator,
    VectorGenerator,
};
pub use self::combinators::{just, Filter, Just, Map, MAX_FILTER_ATTEMPTS};
pub use self::pointers::{boxes, options, BoxGenerator, OptionGenerator};
pub use self::primitives::{booleans, floats, ints, BoolGenerator, FloatGenerator, IntGenerator};
pub use self::products::{structs, StructGenerator};
pub use self::sums::{one_of, unions, weighted, OneOf, UnionGenerator};

/// Type-erased state retained next to a generated value for shrinking.
///
/// Contexts are immutable once built and shared by reference count, so a
/// composite candidate can reuse the contexts of the elements it did not
/// touch. The payload is dropped with the last value that refers to it.
#[derive(Clone)]
pub struct ShrinkContext(Rc<dyn Any>);

impl ShrinkContext {
    pub fn new<C: Any>(context: C) -> ShrinkContext {
        ShrinkContext(Rc::new(context))
    }

    pub fn downcast_ref<C: Any>(&self) -> Option<&C> {
        self.0.downcast_ref::<C>()
    }
}

impl fmt::Debug for ShrinkContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ShrinkContext(..)")
    }
}

/// A value produced by a generator, with its shrink context and provenance.
#[derive(Debug, Clone)]
pub struct Generated<T> {
    pub value: T,
    pub context: Option<ShrinkContext>,
    pub provenance: Option<Range<usize>>,
}

impl<T> Generated<T> {
    /// A synthetic value: no context, no provenance.
    pub fn new(value: T) -> Generated<T> {
        Generated {
            value,
            context: None,
            provenance: None,
        }
    }

    pub fn with_context<C: Any>(mut self, context: C) -> Generated<T> {
        self.context = Some(ShrinkContext::new(context));
        self
    }

    pub fn with_shrink_context(mut self, context: Option<ShrinkContext>) -> Generated<T> {
        self.context = context;
        self
    }

    pub fn with_provenance(mut self, provenance: Range<usize>) -> Generated<T> {
        self.provenance = Some(provenance);
        self
    }

    pub fn context(&self) -> Option<&ShrinkContext> {
        self.context.as_ref()
    }

    pub fn into_value(self) -> T {
        self.value
    }
}

/// The generate/shrink pair for one value shape.
pub trait Generator {
    type Value: Clone + fmt::Debug + 'static;

    /// Draws a value. Fails only when the buffer runs dry or an allocation
    /// cannot be made.
    fn generate(&self, random: &mut Random<'_, '_>) -> Result<Generated<Self::Value>>;

    /// Simpler variants of `value`, most preferred first. Needs no entropy.
    fn shrink(
        &self,
        value: &Self::Value,
        context: Option<&ShrinkContext>,
    ) -> Result<Vec<Generated<Self::Value>>>;

    /// Whether `shrink` can do anything useful for `value` when no context
    /// was retained.
    fn can_shrink_without_context(&self, _value: &Self::Value) -> bool {
        true
    }

    /// Applies `map` to every generated value. Shrinking goes through the
    /// retained pre-image.
    fn map<U, F>(self, map: F) -> Map<Self, F, U>
    where
        Self: Sized,
        F: Fn(&Self::Value) -> U,
        U: Clone + fmt::Debug + 'static,
    {
        Map::new(self, map, None)
    }

    /// Like [`map`](Generator::map), with an inverse used to recover a
    /// pre-image when a value arrives without its context.
    fn map_with_inverse<U, F, I>(self, map: F, inverse: I) -> Map<Self, F, U>
    where
        Self: Sized,
        F: Fn(&Self::Value) -> U,
        I: Fn(&U) -> Self::Value + 'static,
        U: Clone + fmt::Debug + 'static,
    {
        Map::new(self, map, Some(Box::new(inverse)))
    }

    /// Keeps only values satisfying `predicate`, retrying generation up to
    /// [`MAX_FILTER_ATTEMPTS`] times.
    fn filter<P>(self, predicate: P) -> Filter<Self, P>
    where
        Self: Sized,
        P: Fn(&Self::Value) -> bool,
    {
        Filter::new(self, predicate)
    }

    fn boxed(self) -> BoxedGenerator<Self::Value>
    where
        Self: Sized + 'static,
    {
        Box::new(self)
    }
}

/// A generator behind dynamic dispatch.
pub type BoxedGenerator<T> = Box<dyn Generator<Value = T>>;

impl<G: Generator + ?Sized> Generator for Box<G> {
    type Value = G::Value;

    fn generate(&self, random: &mut Random<'_, '_>) -> Result<Generated<Self::Value>> {
        (**self).generate(random)
    }

    fn shrink(
        &self,
        value: &Self::Value,
        context: Option<&ShrinkContext>,
    ) -> Result<Vec<Generated<Self::Value>>> {
        (**self).shrink(value, context)
    }

    fn can_shrink_without_context(&self, value: &Self::Value) -> bool {
        (**self).can_shrink_without_context(value)
    }
}

/// Types with a default generator.
pub trait Generate: Sized + Clone + fmt::Debug + 'static {
    type Generator: Generator<Value = Self>;

    fn generator() -> Self::Generator;
}

/// The default generator for `T`.
pub fn any<T: Generate>() -> T::Generator {
    T::generator()
}

/// Runs `draw` and stamps the result with the byte range it consumed.
pub(crate) fn traced<T, F>(random: &mut Random<'_, '_>, draw: F) -> Result<Generated<T>>
where
    F: FnOnce(&mut Random<'_, '_>) -> Result<Generated<T>>,
{
    let start = random.position();
    let generated = draw(random)?;
    let end = random.position();
    Ok(generated.with_provenance(start..end))
}

/// Per-element contexts of a composite value.
pub(crate) type ElementContexts = Vec<Option<ShrinkContext>>;

/// Recovers per-element contexts, or a row of `None` when the composite
/// was shrunk without one.
pub(crate) fn element_contexts(context: Option<&ShrinkContext>, len: usize) -> ElementContexts {
    match context.and_then(|c| c.downcast_ref::<ElementContexts>()) {
        Some(contexts) if contexts.len() == len => contexts.clone(),
        _ => vec![None; len],
    }
}

/// One candidate per (element, element candidate) pair, in element order.
pub(crate) fn element_candidates<G: Generator>(
    element: &G,
    values: &[G::Value],
    contexts: &[Option<ShrinkContext>],
) -> Result<Vec<(usize, Generated<G::Value>)>> {
    let mut candidates = Vec::new();
    for (i, value) in values.iter().enumerate() {
        let context = contexts.get(i).and_then(Option::as_ref);
        if context.is_none() && !element.can_shrink_without_context(value) {
            continue;
        }
        for candidate in element.shrink(value, context)? {
            candidates.push((i, candidate));
        }
    }
    Ok(candidates)
}

/// Generates a value from a fresh view of `bytes`.
pub fn generate_from<G: Generator>(generator: &G, bytes: &[u8]) -> Result<Generated<G::Value>> {
    let mut entropy = crate::entropy::Entropy::new(bytes);
    let mut random = entropy.random();
    generator.generate(&mut random)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_downcast() {
        let context = ShrinkContext::new(41u32);
        assert_eq!(context.downcast_ref::<u32>(), Some(&41));
        assert!(context.downcast_ref::<i64>().is_none());
    }

    #[test]
    fn test_context_dropped_with_last_value() {
        let payload = Rc::new(());
        let generated = Generated::new(1u8).with_context(Rc::clone(&payload));
        let copy = generated.clone();
        assert_eq!(Rc::strong_count(&payload), 2);
        drop(generated);
        assert_eq!(Rc::strong_count(&payload), 2);
        drop(copy);
        assert_eq!(Rc::strong_count(&payload), 1);
    }

    #[test]
    fn test_element_contexts_fallback() {
        let contexts = element_contexts(None, 3);
        assert_eq!(contexts.len(), 3);
        assert!(contexts.iter().all(Option::is_none));

        let wrong_len = ShrinkContext::new::<ElementContexts>(vec![None]);
        assert_eq!(element_contexts(Some(&wrong_len), 2).len(), 2);
    }

    #[test]
    fn test_generate_from_is_deterministic() {
        let bytes = [3, 1, 4, 1, 5, 9, 2, 6, 5, 3, 5, 8, 9, 7, 9, 3];
        let generator = any::<(u16, bool, i32)>();
        let first = generate_from(&generator, &bytes).unwrap();
        let second = generate_from(&generator, &bytes).unwrap();
        assert_eq!(first.value, second.value);
        assert_eq!(first.provenance, second.provenance);
    }
}
