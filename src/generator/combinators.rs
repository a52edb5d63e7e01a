// Combinators that wrap another generator: `Map`, `Filter` and `Just`.

use std::fmt;

use super::{traced, Generated, Generator, ShrinkContext};
use crate::entropy::Random;
use crate::error::Result;

/// Generation attempts a `Filter` makes before giving up on its predicate.
pub const MAX_FILTER_ATTEMPTS: usize = 100;

/// What a mapped value remembers about where it came from.
struct MapContext<P> {
    pre_image: P,
    context: Option<ShrinkContext>,
}

/// Applies a function to every value of the inner generator.
///
/// The pre-image and its context travel with each mapped value, so shrinking
/// happens on the inner generator's terms and the results are mapped again.
pub struct Map<G: Generator, F, U> {
    inner: G,
    map: F,
    inverse: Option<Box<dyn Fn(&U) -> G::Value>>,
}

impl<G, F, U> Map<G, F, U>
where
    G: Generator,
    F: Fn(&G::Value) -> U,
    U: Clone + fmt::Debug + 'static,
{
    pub(crate) fn new(
        inner: G,
        map: F,
        inverse: Option<Box<dyn Fn(&U) -> G::Value>>,
    ) -> Map<G, F, U> {
        Map {
            inner,
            map,
            inverse,
        }
    }

    fn mapped(&self, pre_image: Generated<G::Value>) -> Generated<U> {
        let value = (self.map)(&pre_image.value);
        let provenance = pre_image.provenance;
        let mut generated = Generated::new(value).with_context(MapContext {
            pre_image: pre_image.value,
            context: pre_image.context,
        });
        generated.provenance = provenance;
        generated
    }
}

impl<G: Generator + fmt::Debug, F, U> fmt::Debug for Map<G, F, U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Map")
            .field("inner", &self.inner)
            .field("invertible", &self.inverse.is_some())
            .finish()
    }
}

impl<G, F, U> Generator for Map<G, F, U>
where
    G: Generator,
    F: Fn(&G::Value) -> U,
    U: Clone + fmt::Debug + 'static,
{
    type Value = U;

    fn generate(&self, random: &mut Random<'_, '_>) -> Result<Generated<U>> {
        let pre_image = self.inner.generate(random)?;
        Ok(self.mapped(pre_image))
    }

    fn shrink(&self, value: &U, context: Option<&ShrinkContext>) -> Result<Vec<Generated<U>>> {
        let (pre_image, inner_context) =
            match context.and_then(|c| c.downcast_ref::<MapContext<G::Value>>()) {
                Some(retained) => (retained.pre_image.clone(), retained.context.clone()),
                None => match &self.inverse {
                    Some(inverse) => (inverse(value), None),
                    None => return Ok(Vec::new()),
                },
            };
        if inner_context.is_none() && !self.inner.can_shrink_without_context(&pre_image) {
            return Ok(Vec::new());
        }
        Ok(self
            .inner
            .shrink(&pre_image, inner_context.as_ref())?
            .into_iter()
            .map(|candidate| self.mapped(candidate))
            .collect())
    }

    fn can_shrink_without_context(&self, value: &U) -> bool {
        match &self.inverse {
            Some(inverse) => self.inner.can_shrink_without_context(&inverse(value)),
            None => false,
        }
    }
}

/// Keeps only the values of the inner generator that satisfy a predicate.
#[derive(Clone)]
pub struct Filter<G, P> {
    inner: G,
    predicate: P,
}

impl<G, P> Filter<G, P>
where
    G: Generator,
    P: Fn(&G::Value) -> bool,
{
    pub(crate) fn new(inner: G, predicate: P) -> Filter<G, P> {
        Filter { inner, predicate }
    }
}

impl<G: fmt::Debug, P> fmt::Debug for Filter<G, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filter").field("inner", &self.inner).finish()
    }
}

impl<G, P> Generator for Filter<G, P>
where
    G: Generator,
    P: Fn(&G::Value) -> bool,
{
    type Value = G::Value;

    /// Retries the inner generator until the predicate holds. If every
    /// attempt is rejected the last value is returned anyway, so callers
    /// must not assume the predicate holds for generated values.
    ///
    /// The provenance spans every attempt, rejected ones included.
    fn generate(&self, random: &mut Random<'_, '_>) -> Result<Generated<G::Value>> {
        traced(random, |random| {
            let mut attempt = 1;
            loop {
                let generated = self.inner.generate(random)?;
                if (self.predicate)(&generated.value) {
                    return Ok(generated);
                }
                if attempt == MAX_FILTER_ATTEMPTS {
                    log::warn!(
                        "filter rejected {} attempts in a row, keeping {:?}",
                        MAX_FILTER_ATTEMPTS, generated.value
                    );
                    return Ok(generated);
                }
                log::trace!("filter rejected attempt {}: {:?}", attempt, generated.value);
                attempt += 1;
            }
        })
    }

    fn shrink(
        &self,
        value: &G::Value,
        context: Option<&ShrinkContext>,
    ) -> Result<Vec<Generated<G::Value>>> {
        let mut candidates = self.inner.shrink(value, context)?;
        candidates.retain(|candidate| (self.predicate)(&candidate.value));
        Ok(candidates)
    }

    fn can_shrink_without_context(&self, value: &G::Value) -> bool {
        self.inner.can_shrink_without_context(value)
    }
}

/// Always produces the same value and consumes no entropy.
#[derive(Debug, Clone)]
pub struct Just<T> {
    value: T,
}

pub fn just<T: Clone + fmt::Debug + 'static>(value: T) -> Just<T> {
    Just { value }
}

impl<T: Clone + fmt::Debug + 'static> Generator for Just<T> {
    type Value = T;

    fn generate(&self, random: &mut Random<'_, '_>) -> Result<Generated<T>> {
        let position = random.position();
        Ok(Generated::new(self.value.clone()).with_provenance(position..position))
    }

    fn shrink(&self, _value: &T, _context: Option<&ShrinkContext>) -> Result<Vec<Generated<T>>> {
        Ok(Vec::new())
    }

    fn can_shrink_without_context(&self, _value: &T) -> bool {
        false
    }
}
