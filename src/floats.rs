// Floating point plumbing for the conjecture engine.
// Floats are drawn by reinterpreting raw unsigned draws, so every supported
// type exposes its bit width and mantissa width. Candidate tables are
// computed in f64 and converted back into the target type.

use half::f16;
use std::fmt;

/// An IEEE 754 binary float that can be drawn from an entropy source.
pub trait Float: Copy + PartialOrd + fmt::Debug + 'static {
    const BITS: u32;
    /// Number of explicitly stored mantissa bits.
    const MANTISSA_BITS: u32;
    /// Smallest positive normal value.
    const MIN_POSITIVE: Self;
    const INFINITY: Self;
    const NEG_INFINITY: Self;
    const MAX: Self;

    fn from_bits_u64(raw: u64) -> Self;
    fn to_bits_u64(self) -> u64;
    fn from_f64(value: f64) -> Self;
    fn to_f64(self) -> f64;
}

impl Float for f16 {
    const BITS: u32 = 16;
    const MANTISSA_BITS: u32 = 10;
    const MIN_POSITIVE: Self = f16::MIN_POSITIVE;
    const INFINITY: Self = f16::INFINITY;
    const NEG_INFINITY: Self = f16::NEG_INFINITY;
    const MAX: Self = f16::MAX;

    fn from_bits_u64(raw: u64) -> Self {
        f16::from_bits(raw as u16)
    }

    fn to_bits_u64(self) -> u64 {
        self.to_bits() as u64
    }

    fn from_f64(value: f64) -> Self {
        f16::from_f64(value)
    }

    fn to_f64(self) -> f64 {
        f16::to_f64(self)
    }
}

impl Float for f32 {
    const BITS: u32 = 32;
    const MANTISSA_BITS: u32 = 23;
    const MIN_POSITIVE: Self = f32::MIN_POSITIVE;
    const INFINITY: Self = f32::INFINITY;
    const NEG_INFINITY: Self = f32::NEG_INFINITY;
    const MAX: Self = f32::MAX;

    fn from_bits_u64(raw: u64) -> Self {
        f32::from_bits(raw as u32)
    }

    fn to_bits_u64(self) -> u64 {
        self.to_bits() as u64
    }

    fn from_f64(value: f64) -> Self {
        value as f32
    }

    fn to_f64(self) -> f64 {
        self as f64
    }
}

impl Float for f64 {
    const BITS: u32 = 64;
    const MANTISSA_BITS: u32 = 52;
    const MIN_POSITIVE: Self = f64::MIN_POSITIVE;
    const INFINITY: Self = f64::INFINITY;
    const NEG_INFINITY: Self = f64::NEG_INFINITY;
    const MAX: Self = f64::MAX;

    fn from_bits_u64(raw: u64) -> Self {
        f64::from_bits(raw)
    }

    fn to_bits_u64(self) -> u64 {
        self.to_bits()
    }

    fn from_f64(value: f64) -> Self {
        value
    }

    fn to_f64(self) -> f64 {
        self
    }
}

/// Strict "simpler than" order for finite floats, mirroring the integer
/// order: smaller magnitude, then positive before negative.
pub fn is_simpler(candidate: f64, than: f64) -> bool {
    let (a, b) = (candidate.abs(), than.abs());
    a < b || (a == b && !candidate.is_sign_negative() && than.is_sign_negative())
}

fn push_unique<F: Float>(values: &mut Vec<F>, value: F) {
    let bits = value.to_bits_u64();
    if !values.iter().any(|v| v.to_bits_u64() == bits) {
        values.push(value);
    }
}

/// Special values over-sampled by the float generator, restricted to
/// `[min, max]`: the integer boundary table plus the smallest normal values
/// and the infinities.
pub fn special_values<F: Float>(min: F, max: F) -> Vec<F> {
    let (lo, hi) = (min.to_f64(), max.to_f64());
    let mut values = Vec::with_capacity(11);
    let table = [
        lo,
        lo + 1.0,
        -1.0,
        0.0,
        1.0,
        hi - 1.0,
        hi,
        F::MIN_POSITIVE.to_f64(),
        -F::MIN_POSITIVE.to_f64(),
        f64::INFINITY,
        f64::NEG_INFINITY,
    ];
    for raw in table {
        let value = F::from_f64(raw);
        if value >= min && value <= max {
            push_unique(&mut values, value);
        }
    }
    values
}

/// Ordered shrink candidates for a float within `[min, max]`.
///
/// NaN and the infinities are terminal.
pub fn shrink_candidates<F: Float>(value: F, min: F, max: F) -> Vec<F> {
    let v = value.to_f64();
    if !v.is_finite() {
        return Vec::new();
    }

    let negative = v.is_sign_negative();
    let mut raw = vec![v / 2.0];
    if v != 0.0 {
        raw.push(0.0);
        raw.push(if negative { -1.0 } else { 1.0 });
    }
    if negative {
        raw.push(-v);
    }
    if v.fract() != 0.0 {
        raw.push(v.round());
    }
    let (lo, hi) = (min.to_f64(), max.to_f64());
    if lo > 0.0 || hi < 0.0 {
        let nearest = if lo > 0.0 { lo } else { hi };
        raw.push(nearest);
        raw.push(nearest + (v - nearest) / 2.0);
    }

    let mut candidates = Vec::with_capacity(raw.len());
    for candidate in raw {
        let converted = F::from_f64(candidate);
        let c = converted.to_f64();
        if c.is_finite() && converted >= min && converted <= max && is_simpler(c, v) {
            push_unique(&mut candidates, converted);
        }
    }
    candidates
}
