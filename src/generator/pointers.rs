// Optional and boxed values.

use super::{traced, Generate, Generated, Generator, ShrinkContext};
use crate::entropy::Random;
use crate::error::Result;

/// `None` with probability `numerator / denominator`, otherwise `Some` of
/// the inner generator's value.
#[derive(Debug, Clone)]
pub struct OptionGenerator<G> {
    inner: G,
    numerator: u32,
    denominator: u32,
}

pub fn options<G: Generator>(inner: G) -> OptionGenerator<G> {
    OptionGenerator {
        inner,
        numerator: 1,
        denominator: 2,
    }
}

impl<G: Generator> OptionGenerator<G> {
    pub fn null_ratio(mut self, numerator: u32, denominator: u32) -> OptionGenerator<G> {
        assert!(
            denominator > 0 && numerator <= denominator,
            "invalid null ratio {}/{}",
            numerator,
            denominator
        );
        self.numerator = numerator;
        self.denominator = denominator;
        self
    }
}

impl<G: Generator> Generator for OptionGenerator<G> {
    type Value = Option<G::Value>;

    fn generate(&self, random: &mut Random<'_, '_>) -> Result<Generated<Self::Value>> {
        traced(random, |random| {
            if random.chance(self.numerator, self.denominator)? {
                return Ok(Generated::new(None));
            }
            let inner = self.inner.generate(random)?;
            Ok(Generated::new(Some(inner.value)).with_shrink_context(inner.context))
        })
    }

    fn shrink(
        &self,
        value: &Self::Value,
        context: Option<&ShrinkContext>,
    ) -> Result<Vec<Generated<Self::Value>>> {
        let inner = match value {
            Some(inner) => inner,
            None => return Ok(Vec::new()),
        };
        let mut candidates = vec![Generated::new(None)];
        if context.is_some() || self.inner.can_shrink_without_context(inner) {
            for candidate in self.inner.shrink(inner, context)? {
                candidates.push(
                    Generated::new(Some(candidate.value)).with_shrink_context(candidate.context),
                );
            }
        }
        Ok(candidates)
    }

    fn can_shrink_without_context(&self, value: &Self::Value) -> bool {
        value.is_some()
    }
}

impl<T: Generate> Generate for Option<T> {
    type Generator = OptionGenerator<T::Generator>;

    fn generator() -> Self::Generator {
        options(T::generator())
    }
}

/// Heap-allocates the inner generator's value.
#[derive(Debug, Clone)]
pub struct BoxGenerator<G> {
    inner: G,
}

pub fn boxes<G: Generator>(inner: G) -> BoxGenerator<G> {
    BoxGenerator { inner }
}

impl<G: Generator> Generator for BoxGenerator<G> {
    type Value = Box<G::Value>;

    fn generate(&self, random: &mut Random<'_, '_>) -> Result<Generated<Self::Value>> {
        let inner = self.inner.generate(random)?;
        Ok(Generated {
            value: Box::new(inner.value),
            context: inner.context,
            provenance: inner.provenance,
        })
    }

    fn shrink(
        &self,
        value: &Self::Value,
        context: Option<&ShrinkContext>,
    ) -> Result<Vec<Generated<Self::Value>>> {
        Ok(self
            .inner
            .shrink(value, context)?
            .into_iter()
            .map(|candidate| Generated {
                value: Box::new(candidate.value),
                context: candidate.context,
                provenance: None,
            })
            .collect())
    }

    fn can_shrink_without_context(&self, value: &Self::Value) -> bool {
        self.inner.can_shrink_without_context(value)
    }
}

impl<T: Generate> Generate for Box<T> {
    type Generator = BoxGenerator<T::Generator>;

    fn generator() -> Self::Generator {
        boxes(T::generator())
    }
}
