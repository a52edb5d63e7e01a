// Sum generators: tagged unions and choices between alternative generators.
//
// Both pick an arm first and then generate that arm's payload. The arm is
// remembered in the shrink context and shrinking never switches arms.

use std::fmt;
use std::mem;

use super::{just, traced, BoxedGenerator, Generated, Generator, ShrinkContext};
use crate::entropy::{total_weight, Random};
use crate::error::Result;

struct ChoiceContext {
    arm: usize,
    payload: Option<ShrinkContext>,
}

fn with_arm<T>(arm: usize, payload: Generated<T>) -> Generated<T> {
    let provenance = payload.provenance;
    let mut generated = Generated::new(payload.value).with_context(ChoiceContext {
        arm,
        payload: payload.context,
    });
    generated.provenance = provenance;
    generated
}

fn retained_arm(context: Option<&ShrinkContext>) -> Option<(usize, Option<ShrinkContext>)> {
    context
        .and_then(|c| c.downcast_ref::<ChoiceContext>())
        .map(|c| (c.arm, c.payload.clone()))
}

/// One variant of a tagged union, with its payload type erased.
trait Arm<T> {
    fn name(&self) -> &'static str;

    fn generate(&self, random: &mut Random<'_, '_>) -> Result<Generated<T>>;

    fn shrink(&self, value: &T, context: Option<&ShrinkContext>) -> Result<Vec<Generated<T>>>;

    /// Whether `value` is tagged with this arm.
    fn matches(&self, value: &T) -> bool;

    fn can_shrink_without_context(&self, value: &T) -> bool;
}

struct VariantArm<G, W, U> {
    name: &'static str,
    payload: G,
    wrap: W,
    unwrap: U,
}

impl<T, G, W, U> Arm<T> for VariantArm<G, W, U>
where
    G: Generator,
    W: Fn(G::Value) -> T,
    U: Fn(&T) -> Option<G::Value>,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn generate(&self, random: &mut Random<'_, '_>) -> Result<Generated<T>> {
        let payload = self.payload.generate(random)?;
        Ok(Generated {
            value: (self.wrap)(payload.value),
            context: payload.context,
            provenance: payload.provenance,
        })
    }

    fn shrink(&self, value: &T, context: Option<&ShrinkContext>) -> Result<Vec<Generated<T>>> {
        let payload = match (self.unwrap)(value) {
            Some(payload) => payload,
            None => return Ok(Vec::new()),
        };
        if context.is_none() && !self.payload.can_shrink_without_context(&payload) {
            return Ok(Vec::new());
        }
        Ok(self
            .payload
            .shrink(&payload, context)?
            .into_iter()
            .map(|candidate| Generated {
                value: (self.wrap)(candidate.value),
                context: candidate.context,
                provenance: None,
            })
            .collect())
    }

    fn matches(&self, value: &T) -> bool {
        (self.unwrap)(value).is_some()
    }

    fn can_shrink_without_context(&self, value: &T) -> bool {
        (self.unwrap)(value).map_or(false, |payload| self.payload.can_shrink_without_context(&payload))
    }
}

/// Tagged unions: one arm per variant, picked uniformly.
pub struct UnionGenerator<T> {
    arms: Vec<Box<dyn Arm<T>>>,
}

pub fn unions<T: Clone + fmt::Debug + 'static>() -> UnionGenerator<T> {
    UnionGenerator { arms: Vec::new() }
}

impl<T: Clone + fmt::Debug + 'static> UnionGenerator<T> {
    /// Adds a variant carrying a payload. `wrap` tags a payload with the
    /// variant and `unwrap` extracts it again, returning `None` for values
    /// of other variants.
    pub fn variant<G, W, U>(mut self, name: &'static str, payload: G, wrap: W, unwrap: U) -> UnionGenerator<T>
    where
        G: Generator + 'static,
        W: Fn(G::Value) -> T + 'static,
        U: Fn(&T) -> Option<G::Value> + 'static,
    {
        self.arms.push(Box::new(VariantArm {
            name,
            payload,
            wrap,
            unwrap,
        }));
        self
    }

    /// Adds a variant without a payload.
    pub fn unit(self, name: &'static str, value: T) -> UnionGenerator<T> {
        let tag = mem::discriminant(&value);
        let payload = value.clone();
        self.variant(
            name,
            just(payload),
            |value| value,
            move |candidate: &T| {
                if mem::discriminant(candidate) == tag {
                    Some(value.clone())
                } else {
                    None
                }
            },
        )
    }

    pub fn variant_names(&self) -> Vec<&'static str> {
        self.arms.iter().map(|arm| arm.name()).collect()
    }

    fn arm_of(&self, value: &T, context: Option<&ShrinkContext>) -> Option<(usize, Option<ShrinkContext>)> {
        retained_arm(context)
            .filter(|(arm, _)| *arm < self.arms.len())
            .or_else(|| {
                self.arms
                    .iter()
                    .position(|arm| arm.matches(value))
                    .map(|arm| (arm, None))
            })
    }
}

impl<T> fmt::Debug for UnionGenerator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.arms.iter().map(|arm| arm.name()))
            .finish()
    }
}

impl<T: Clone + fmt::Debug + 'static> Generator for UnionGenerator<T> {
    type Value = T;

    fn generate(&self, random: &mut Random<'_, '_>) -> Result<Generated<T>> {
        assert!(!self.arms.is_empty(), "union generator has no variants");
        traced(random, |random| {
            let arm = random.index(self.arms.len())?;
            let payload = self.arms[arm].generate(random)?;
            Ok(with_arm(arm, payload))
        })
    }

    fn shrink(&self, value: &T, context: Option<&ShrinkContext>) -> Result<Vec<Generated<T>>> {
        let (arm, payload_context) = match self.arm_of(value, context) {
            Some(found) => found,
            None => return Ok(Vec::new()),
        };
        Ok(self.arms[arm]
            .shrink(value, payload_context.as_ref())?
            .into_iter()
            .map(|candidate| with_arm(arm, candidate))
            .collect())
    }

    fn can_shrink_without_context(&self, value: &T) -> bool {
        self.arms
            .iter()
            .find(|arm| arm.matches(value))
            .map_or(false, |arm| arm.can_shrink_without_context(value))
    }
}

/// A choice between generators of the same type, uniform or weighted.
pub struct OneOf<T> {
    options: Vec<BoxedGenerator<T>>,
    weights: Option<Vec<u64>>,
}

/// Picks one of `options` uniformly.
pub fn one_of<T: Clone + fmt::Debug + 'static>(options: Vec<BoxedGenerator<T>>) -> OneOf<T> {
    assert!(!options.is_empty(), "one_of needs at least one option");
    OneOf {
        options,
        weights: None,
    }
}

/// Picks one of `options` with probability proportional to its weight.
pub fn weighted<T: Clone + fmt::Debug + 'static>(options: Vec<(u64, BoxedGenerator<T>)>) -> OneOf<T> {
    let (weights, options): (Vec<u64>, Vec<BoxedGenerator<T>>) = options.into_iter().unzip();
    assert!(total_weight(&weights) > 0, "weighted needs a positive weight");
    OneOf {
        options,
        weights: Some(weights),
    }
}

impl<T> fmt::Debug for OneOf<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OneOf")
            .field("options", &self.options.len())
            .field("weights", &self.weights)
            .finish()
    }
}

impl<T: Clone + fmt::Debug + 'static> Generator for OneOf<T> {
    type Value = T;

    fn generate(&self, random: &mut Random<'_, '_>) -> Result<Generated<T>> {
        traced(random, |random| {
            let option = match &self.weights {
                Some(weights) => random.weighted_index(weights)?,
                None => random.index(self.options.len())?,
            };
            let payload = self.options[option].generate(random)?;
            Ok(with_arm(option, payload))
        })
    }

    fn shrink(&self, value: &T, context: Option<&ShrinkContext>) -> Result<Vec<Generated<T>>> {
        let (option, payload_context) = match retained_arm(context) {
            Some((option, payload)) if option < self.options.len() => (option, payload),
            _ => return Ok(Vec::new()),
        };
        let generator = &self.options[option];
        if payload_context.is_none() && !generator.can_shrink_without_context(value) {
            return Ok(Vec::new());
        }
        Ok(generator
            .shrink(value, payload_context.as_ref())?
            .into_iter()
            .map(|candidate| with_arm(option, candidate))
            .collect())
    }

    /// Without a context there is no telling which option produced a value.
    fn can_shrink_without_context(&self, _value: &T) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::{booleans, generate_from, ints, Generator};

    #[derive(Debug, Clone, PartialEq)]
    enum Shape {
        Empty,
        Circle(u8),
        Flag(bool),
    }

    fn shapes() -> UnionGenerator<Shape> {
        unions()
            .unit("empty", Shape::Empty)
            .variant("circle", ints::<u8>(), Shape::Circle, |s| match s {
                Shape::Circle(r) => Some(*r),
                _ => None,
            })
            .variant("flag", booleans(), Shape::Flag, |s| match s {
                Shape::Flag(f) => Some(*f),
                _ => None,
            })
    }

    #[test]
    fn test_union_variant_names() {
        assert_eq!(shapes().variant_names(), vec!["empty", "circle", "flag"]);
    }

    #[test]
    fn test_union_generates_chosen_arm() {
        // index(3) at width 8: byte 100 selects arm 1.
        let bytes = [100, 0xff, 9];
        let generated = generate_from(&shapes(), &bytes).unwrap();
        assert_eq!(generated.value, Shape::Circle(9));
        assert_eq!(generated.provenance, Some(0..3));
    }

    #[test]
    fn test_unit_arm_consumes_only_the_tag() {
        let generated = generate_from(&shapes(), &[1]).unwrap();
        assert_eq!(generated.value, Shape::Empty);
        assert_eq!(generated.provenance, Some(0..1));
        assert!(shapes().shrink(&Shape::Empty, generated.context()).unwrap().is_empty());
    }

    #[test]
    fn test_union_shrinks_within_arm() {
        let generator = shapes();
        let generated = generate_from(&generator, &[100, 0xff, 9]).unwrap();
        let candidates: Vec<Shape> = generator
            .shrink(&generated.value, generated.context())
            .unwrap()
            .into_iter()
            .map(Generated::into_value)
            .collect();
        assert_eq!(
            candidates,
            vec![Shape::Circle(4), Shape::Circle(0), Shape::Circle(1)]
        );
    }

    #[test]
    fn test_union_finds_arm_without_context() {
        let generator = shapes();
        assert!(generator.can_shrink_without_context(&Shape::Flag(true)));
        assert!(!generator.can_shrink_without_context(&Shape::Flag(false)));
        let candidates = generator.shrink(&Shape::Flag(true), None).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].value, Shape::Flag(false));
    }

    #[test]
    fn test_one_of_delegates_to_chosen_option() {
        let generator = one_of(vec![
            ints::<u8>().between(0, 9).boxed(),
            ints::<u8>().between(200, 255).boxed(),
        ]);
        // index(2): byte 0x80 selects option 1, then 0xff skips the
        // boundary table and 0x01 gives the range minimum.
        let generated = generate_from(&generator, &[0x80, 0xff, 0x01]).unwrap();
        assert_eq!(generated.value, 200);
        assert!(generator.shrink(&200, generated.context()).unwrap().is_empty());
        assert!(!generator.can_shrink_without_context(&200));
    }

    #[test]
    #[should_panic(expected = "overflows u64")]
    fn test_weighted_rejects_overflowing_weights() {
        weighted(vec![
            (u64::MAX, ints::<u8>().between(0, 9).boxed()),
            (1, ints::<u8>().between(100, 109).boxed()),
        ]);
    }

    #[test]
    fn test_weighted_skips_zero_weights() {
        let generator = weighted(vec![
            (0, ints::<u8>().between(0, 9).boxed()),
            (3, ints::<u8>().between(100, 109).boxed()),
        ]);
        let bytes: Vec<u8> = (0..64u32).map(|i| (i * 37 + 11) as u8).collect();
        let mut entropy = crate::entropy::Entropy::new(&bytes);
        let mut random = entropy.random();
        for _ in 0..10 {
            let value = generator.generate(&mut random).unwrap().value;
            assert!((100..=109).contains(&value));
        }
    }
}
