// Leaf generators: integers, floats and booleans.
//
// Integers and floats over-sample boundary values: one draw in five picks
// uniformly from a small table of edge cases instead of the full range.

use half::f16;

use super::{traced, Generate, Generated, Generator, ShrinkContext};
use crate::entropy::Random;
use crate::error::Result;
use crate::floats::{self, Float};
use crate::ints::{self, Int};

/// Odds of drawing from the boundary table instead of the full range.
const BOUNDARY_NUMERATOR: u32 = 1;
const BOUNDARY_DENOMINATOR: u32 = 5;

/// Integers in `[min, max]`.
#[derive(Debug, Clone)]
pub struct IntGenerator<T> {
    min: T,
    max: T,
}

/// Integers over the whole range of `T`.
pub fn ints<T: Int>() -> IntGenerator<T> {
    IntGenerator {
        min: T::MIN,
        max: T::MAX,
    }
}

impl<T: Int> IntGenerator<T> {
    pub fn between(mut self, min: T, max: T) -> IntGenerator<T> {
        assert!(min <= max, "empty integer range {:?}..={:?}", min, max);
        self.min = min;
        self.max = max;
        self
    }

    pub fn min(&self) -> T {
        self.min
    }

    pub fn max(&self) -> T {
        self.max
    }

    fn contains(&self, value: T) -> bool {
        self.min <= value && value <= self.max
    }
}

impl<T: Int> Generator for IntGenerator<T> {
    type Value = T;

    fn generate(&self, random: &mut Random<'_, '_>) -> Result<Generated<T>> {
        traced(random, |random| {
            let value = if random.chance(BOUNDARY_NUMERATOR, BOUNDARY_DENOMINATOR)? {
                let table = ints::boundary_values(self.min.to_i128(), self.max.to_i128());
                T::from_i128(*random.choose(&table)?)
            } else {
                random.int_range_at_most(self.min, self.max)?
            };
            Ok(Generated::new(value))
        })
    }

    fn shrink(&self, value: &T, _context: Option<&ShrinkContext>) -> Result<Vec<Generated<T>>> {
        if !self.contains(*value) {
            return Ok(Vec::new());
        }
        Ok(
            ints::shrink_candidates(value.to_i128(), self.min.to_i128(), self.max.to_i128())
                .into_iter()
                .map(|candidate| Generated::new(T::from_i128(candidate)))
                .collect(),
        )
    }
}

/// Floats in `[min, max]`.
#[derive(Debug, Clone)]
pub struct FloatGenerator<F> {
    min: F,
    max: F,
}

/// Floats in the default range `[-100, 100]`.
pub fn floats<F: Float>() -> FloatGenerator<F> {
    FloatGenerator {
        min: F::from_f64(-100.0),
        max: F::from_f64(100.0),
    }
}

impl<F: Float> FloatGenerator<F> {
    pub fn between(mut self, min: F, max: F) -> FloatGenerator<F> {
        assert!(min <= max, "empty float range {:?}..={:?}", min, max);
        self.min = min;
        self.max = max;
        self
    }

    /// Every non-NaN value, infinities included.
    pub fn unbounded(self) -> FloatGenerator<F> {
        self.between(F::NEG_INFINITY, F::INFINITY)
    }

    pub fn min(&self) -> F {
        self.min
    }

    pub fn max(&self) -> F {
        self.max
    }

    fn clamp(&self, value: F) -> F {
        if value < self.min {
            self.min
        } else if value > self.max {
            self.max
        } else {
            value
        }
    }

    fn sample(&self, random: &mut Random<'_, '_>) -> Result<F> {
        let (lo, hi) = (self.min.to_f64(), self.max.to_f64());
        if lo.is_finite() && hi.is_finite() {
            let u = random.float_normalized::<F>()?.to_f64();
            // Interpolating this way cannot overflow for ranges near ±MAX.
            return Ok(self.clamp(F::from_f64(lo * (1.0 - u) + hi * u)));
        }

        let raw = random.float_bits::<F>()?.to_f64();
        let value = if raw.is_nan() {
            0.0
        } else if lo <= raw && raw <= hi {
            raw
        } else if lo <= -raw && -raw <= hi {
            -raw
        } else {
            raw.max(lo).min(hi)
        };
        Ok(self.clamp(F::from_f64(value)))
    }
}

impl<F: Float> Generator for FloatGenerator<F> {
    type Value = F;

    fn generate(&self, random: &mut Random<'_, '_>) -> Result<Generated<F>> {
        traced(random, |random| {
            let value = if random.chance(BOUNDARY_NUMERATOR, BOUNDARY_DENOMINATOR)? {
                let table = floats::special_values(self.min, self.max);
                *random.choose(&table)?
            } else {
                self.sample(random)?
            };
            Ok(Generated::new(value))
        })
    }

    fn shrink(&self, value: &F, _context: Option<&ShrinkContext>) -> Result<Vec<Generated<F>>> {
        Ok(floats::shrink_candidates(*value, self.min, self.max)
            .into_iter()
            .map(Generated::new)
            .collect())
    }

    fn can_shrink_without_context(&self, value: &F) -> bool {
        value.to_f64().is_finite()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BoolGenerator;

pub fn booleans() -> BoolGenerator {
    BoolGenerator
}

impl Generator for BoolGenerator {
    type Value = bool;

    fn generate(&self, random: &mut Random<'_, '_>) -> Result<Generated<bool>> {
        traced(random, |random| Ok(Generated::new(random.boolean()?)))
    }

    fn shrink(&self, value: &bool, _context: Option<&ShrinkContext>) -> Result<Vec<Generated<bool>>> {
        if *value {
            Ok(vec![Generated::new(false)])
        } else {
            Ok(Vec::new())
        }
    }

    fn can_shrink_without_context(&self, value: &bool) -> bool {
        *value
    }
}

impl Generate for bool {
    type Generator = BoolGenerator;

    fn generator() -> BoolGenerator {
        BoolGenerator
    }
}

macro_rules! generate_ints {
    ($($t:ty),*) => {
        $(
            impl Generate for $t {
                type Generator = IntGenerator<$t>;

                fn generator() -> IntGenerator<$t> {
                    ints()
                }
            }
        )*
    };
}

generate_ints!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize);

macro_rules! generate_floats {
    ($($t:ty),*) => {
        $(
            impl Generate for $t {
                type Generator = FloatGenerator<$t>;

                fn generator() -> FloatGenerator<$t> {
                    floats()
                }
            }
        )*
    };
}

generate_floats!(f16, f32, f64);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entropy::Entropy;
    use crate::error::Error;
    use crate::generator::generate_from;

    fn pseudo_random_bytes(len: usize, seed: u32) -> Vec<u8> {
        (0..len as u32)
            .map(|i| (i.wrapping_mul(2654435761).wrapping_add(seed) >> 13) as u8)
            .collect()
    }

    #[test]
    fn test_int_generation_respects_range() {
        let generator = ints::<i32>().between(-10, 25);
        let bytes = pseudo_random_bytes(8192, 1);
        let mut entropy = Entropy::new(&bytes);
        let mut random = entropy.random();
        for _ in 0..500 {
            let value = generator.generate(&mut random).unwrap().value;
            assert!((-10..=25).contains(&value));
        }
    }

    #[test]
    fn test_int_boundary_draw() {
        // chance(1, 5) on byte 1 succeeds, then index 0 of the table is `min`.
        let bytes = [1, 0];
        let generated = generate_from(&ints::<u8>().between(3, 90), &bytes).unwrap();
        assert_eq!(generated.value, 3);
        assert_eq!(generated.provenance, Some(0..2));
    }

    #[test]
    fn test_int_full_range_draw() {
        // 0xff misses the boundary table, then two bytes give the value.
        let bytes = [0xff, 0x34, 0x12];
        let generated = generate_from(&ints::<u16>(), &bytes).unwrap();
        assert_eq!(generated.value, 0x1234);
        assert_eq!(generated.provenance, Some(0..3));
    }

    #[test]
    fn test_int_generation_needs_entropy() {
        let bytes = [0xff, 0x34];
        let err = generate_from(&ints::<u16>(), &bytes).unwrap_err();
        assert!(matches!(err, Error::OutOfEntropy { needed: 2, remaining: 1 }));
    }

    #[test]
    fn test_boundaries_are_oversampled() {
        let generator = ints::<u32>().between(0, 1_000_000);
        let bytes = pseudo_random_bytes(60_000, 7);
        let mut entropy = Entropy::new(&bytes);
        let mut random = entropy.random();
        let mut boundary = 0;
        let mut total = 0;
        while let Ok(generated) = generator.generate(&mut random) {
            total += 1;
            if [0, 1, 999_999, 1_000_000].contains(&generated.value) {
                boundary += 1;
            }
        }
        assert!(total > 1000);
        assert!(boundary * 10 > total, "{} of {}", boundary, total);
    }

    #[test]
    fn test_int_shrink_toward_zero() {
        let generator = ints::<i32>().between(0, 100);
        let candidates: Vec<i32> = generator
            .shrink(&9, None)
            .unwrap()
            .into_iter()
            .map(Generated::into_value)
            .collect();
        assert_eq!(candidates, vec![4, 0, 1]);
    }

    #[test]
    fn test_int_shrink_of_foreign_value_is_empty() {
        let generator = ints::<i32>().between(0, 100);
        assert!(generator.shrink(&-5, None).unwrap().is_empty());
    }

    #[test]
    fn test_float_generation_in_range() {
        let generator = floats::<f64>();
        let bytes = pseudo_random_bytes(8192, 3);
        let mut entropy = Entropy::new(&bytes);
        let mut random = entropy.random();
        for _ in 0..300 {
            let value = generator.generate(&mut random).unwrap().value;
            assert!((-100.0..=100.0).contains(&value), "{}", value);
        }
    }

    #[test]
    fn test_unbounded_floats_never_nan() {
        let generator = floats::<f32>().unbounded();
        let bytes = pseudo_random_bytes(8192, 11);
        let mut entropy = Entropy::new(&bytes);
        let mut random = entropy.random();
        for _ in 0..300 {
            let value = generator.generate(&mut random).unwrap().value;
            assert!(!value.is_nan());
        }
    }

    #[test]
    fn test_half_floats() {
        let generator = floats::<f16>().between(f16::from_f32(-2.0), f16::from_f32(2.0));
        let bytes = pseudo_random_bytes(2048, 5);
        let mut entropy = Entropy::new(&bytes);
        let mut random = entropy.random();
        for _ in 0..100 {
            let value = generator.generate(&mut random).unwrap().value;
            assert!(value >= f16::from_f32(-2.0) && value <= f16::from_f32(2.0));
        }
    }

    #[test]
    fn test_float_infinity_is_terminal() {
        let generator = floats::<f64>().unbounded();
        assert!(!generator.can_shrink_without_context(&f64::INFINITY));
        assert!(generator.shrink(&f64::INFINITY, None).unwrap().is_empty());
    }

    #[test]
    fn test_bool_shrinks_once() {
        let candidates = booleans().shrink(&true, None).unwrap();
        assert_eq!(candidates.len(), 1);
        assert!(!candidates[0].value);
        assert!(booleans().shrink(&false, None).unwrap().is_empty());
    }
}
