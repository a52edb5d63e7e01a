// Integer plumbing for the conjecture engine.
// This module contains the `Int` abstraction used by the entropy source
// for fixed-width draws, plus the boundary and shrink candidate tables
// that the integer generator is built from.

use std::fmt;

/// A fixed-width primitive integer that can be drawn from an entropy source.
///
/// All arithmetic on ranges is done in `i128`, which holds every value of
/// every supported type without overflow.
pub trait Int: Copy + Ord + fmt::Debug + 'static {
    /// Width of the type in bits; a raw draw consumes `BITS / 8` bytes.
    const BITS: u32;
    const MIN: Self;
    const MAX: Self;

    fn to_i128(self) -> i128;

    /// Converts back from `i128`. Callers guarantee the value is in range.
    fn from_i128(value: i128) -> Self;

    /// Reinterprets the low `BITS` bits of a raw draw.
    fn from_bits(raw: u64) -> Self;
}

macro_rules! impl_int {
    ($($t:ty),*) => {
        $(
            impl Int for $t {
                const BITS: u32 = <$t>::BITS;
                const MIN: Self = <$t>::MIN;
                const MAX: Self = <$t>::MAX;

                fn to_i128(self) -> i128 {
                    self as i128
                }

                fn from_i128(value: i128) -> Self {
                    value as $t
                }

                fn from_bits(raw: u64) -> Self {
                    raw as $t
                }
            }
        )*
    };
}

impl_int!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize);

/// Strict "simpler than" order used by integer shrinking: smaller magnitude
/// first, and a positive value beats the negative value of equal magnitude.
pub fn is_simpler(candidate: i128, than: i128) -> bool {
    (candidate.unsigned_abs(), candidate < 0) < (than.unsigned_abs(), than < 0)
}

/// Values over-sampled by the integer generator: `min`, `min+1`, `-1`, `0`,
/// `1`, `max-1` and `max`, restricted to `[min, max]` and deduplicated.
pub fn boundary_values(min: i128, max: i128) -> Vec<i128> {
    let mut values = Vec::with_capacity(7);
    for value in [min, min + 1, -1, 0, 1, max - 1, max] {
        if value >= min && value <= max && !values.contains(&value) {
            values.push(value);
        }
    }
    values
}

/// Ordered shrink candidates for `value` within `[min, max]`.
///
/// The core table is `value / 2`, then `0` and `±1` on the value's side of
/// zero, then `-value` for negatives. When zero is outside the range the
/// bound nearest zero and the midpoint towards it are appended. Every
/// returned candidate is in range and strictly simpler than `value`.
pub fn shrink_candidates(value: i128, min: i128, max: i128) -> Vec<i128> {
    let mut raw = vec![value / 2];
    if value > 0 {
        raw.push(0);
        raw.push(1);
    } else if value < 0 {
        raw.push(0);
        raw.push(-1);
        raw.push(-value);
    }
    if !(min..=max).contains(&0) {
        let nearest = if min > 0 { min } else { max };
        raw.push(nearest);
        raw.push(nearest + (value - nearest) / 2);
    }

    let mut candidates = Vec::with_capacity(raw.len());
    for candidate in raw {
        if candidate >= min
            && candidate <= max
            && is_simpler(candidate, value)
            && !candidates.contains(&candidate)
        {
            candidates.push(candidate);
        }
    }
    candidates
}
