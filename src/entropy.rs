//! # Finite entropy source
//!
//! Every random decision the engine makes is a draw against a fixed,
//! caller-supplied byte buffer. Draws consume bytes from the front of the
//! remaining buffer, and the number of bytes a draw consumes is fixed by the
//! type being drawn: an N-bit integer always takes `ceil(N / 8)` bytes, read
//! little-endian. When the buffer cannot satisfy a draw the source fails with
//! [`Error::OutOfEntropy`] instead of wrapping around or reseeding, so the same
//! bytes always replay the same decisions.
//!
//! ```rust
//! use conjecture_finite::entropy::Entropy;
//!
//! let bytes = [7, 0, 0, 0, 1];
//! let mut entropy = Entropy::new(&bytes);
//! let mut random = entropy.random();
//! assert_eq!(random.int::<u32>().unwrap(), 7);
//! assert!(random.boolean().unwrap());
//! assert!(random.boolean().is_err());
//! ```

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{Error, Result};
use crate::floats::Float;
use crate::ints::Int;

/// A finite byte buffer plus a read cursor.
///
/// The buffer is borrowed from the caller; the source never copies or
/// extends it.
#[derive(Debug, Clone)]
pub struct Entropy<'a> {
    bytes: &'a [u8],
    cursor: usize,
}

impl<'a> Entropy<'a> {
    pub fn new(bytes: &'a [u8]) -> Entropy<'a> {
        Entropy { bytes, cursor: 0 }
    }

    /// The whole underlying buffer.
    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Resets the cursor to the start of the buffer and returns a draw handle.
    ///
    /// Calling this again replays exactly the same sequence of draws.
    pub fn random(&mut self) -> Random<'_, 'a> {
        self.cursor = 0;
        Random { source: self }
    }
}

/// Draw handle bound to an [`Entropy`] source.
#[derive(Debug)]
pub struct Random<'s, 'a> {
    source: &'s mut Entropy<'a>,
}

/// Sum of `weights`, which must fit in a `u64`.
pub(crate) fn total_weight(weights: &[u64]) -> u64 {
    let total = weights
        .iter()
        .try_fold(0u64, |total, &weight| total.checked_add(weight));
    assert!(total.is_some(), "total weight of {:?} overflows u64", weights);
    total.unwrap_or_default()
}

/// Smallest of 8, 16, 32 or 64 bits such that `bound <= 2^width`.
fn width_for(bound: u64) -> u32 {
    let largest = bound.saturating_sub(1);
    if largest <= u8::MAX as u64 {
        8
    } else if largest <= u16::MAX as u64 {
        16
    } else if largest <= u32::MAX as u64 {
        32
    } else {
        64
    }
}

impl<'s, 'a> Random<'s, 'a> {
    /// Offset of the next byte to be consumed.
    pub fn position(&self) -> usize {
        self.source.cursor
    }

    pub fn remaining(&self) -> usize {
        self.source.bytes.len() - self.source.cursor
    }

    /// Moves the cursor to a previously recorded offset.
    pub fn seek(&mut self, offset: usize) {
        assert!(
            offset <= self.source.bytes.len(),
            "seek to {} past end of {}-byte buffer",
            offset,
            self.source.bytes.len()
        );
        self.source.cursor = offset;
    }

    /// Consumes `count` raw bytes. The cursor does not move on failure.
    pub fn bytes(&mut self, count: usize) -> Result<&'a [u8]> {
        let remaining = self.remaining();
        if count > remaining {
            return Err(Error::OutOfEntropy {
                needed: count,
                remaining,
            });
        }
        let bytes = self.source.bytes;
        let start = self.source.cursor;
        self.source.cursor += count;
        Ok(&bytes[start..start + count])
    }

    /// Draws an unsigned value of `bits` bits from `ceil(bits / 8)` bytes.
    pub fn bits(&mut self, bits: u32) -> Result<u64> {
        assert!(bits > 0 && bits <= 64, "cannot draw {} bits", bits);
        let count = ((bits + 7) / 8) as usize;
        let raw = LittleEndian::read_uint(self.bytes(count)?, count);
        if bits == 64 {
            Ok(raw)
        } else {
            Ok(raw & ((1u64 << bits) - 1))
        }
    }

    /// One byte; the low bit decides.
    pub fn boolean(&mut self) -> Result<bool> {
        Ok(self.bits(1)? == 1)
    }

    /// A uniformly distributed value over the whole of `T`.
    pub fn int<T: Int>(&mut self) -> Result<T> {
        Ok(T::from_bits(self.bits(T::BITS)?))
    }

    /// Multiply-high bounded draw at a fixed width.
    ///
    /// The draw is widened to double width and multiplied by `bound`; the
    /// high half is the result. Unless `biased`, draws whose low half falls
    /// under `(2^width - bound) mod bound` are rejected and redrawn, which
    /// removes the modulo bias for bounds that are not powers of two.
    fn bounded(&mut self, bound: u64, width: u32, biased: bool) -> Result<u64> {
        assert!(bound > 0, "bounded draw needs a positive bound");
        debug_assert!(width == 64 || bound <= 1u64 << width);

        let bound = bound as u128;
        let mask = if width == 64 {
            u64::MAX as u128
        } else {
            (1u128 << width) - 1
        };
        let mut product = self.bits(width)? as u128 * bound;
        if !biased {
            let mut low = product & mask;
            if low < bound {
                let threshold = ((1u128 << width) - bound) % bound;
                while low < threshold {
                    product = self.bits(width)? as u128 * bound;
                    low = product & mask;
                }
            }
        }
        Ok((product >> width) as u64)
    }

    /// Unbiased draw in `[0, bound)`.
    pub fn uint_less_than<T: Int>(&mut self, bound: T) -> Result<T> {
        let raw = bound.to_i128();
        assert!(raw > 0, "uint_less_than needs a positive bound, got {:?}", bound);
        let value = self.bounded(raw as u64, T::BITS, false)?;
        Ok(T::from_i128(value as i128))
    }

    /// Like [`uint_less_than`](Random::uint_less_than) but never redraws, so
    /// it always consumes exactly one draw at the cost of a small bias.
    pub fn uint_less_than_biased<T: Int>(&mut self, bound: T) -> Result<T> {
        let raw = bound.to_i128();
        assert!(raw > 0, "uint_less_than_biased needs a positive bound, got {:?}", bound);
        let value = self.bounded(raw as u64, T::BITS, true)?;
        Ok(T::from_i128(value as i128))
    }

    fn range_at_most<T: Int>(&mut self, min: T, max: T, biased: bool) -> Result<T> {
        assert!(min <= max, "empty range {:?}..={:?}", min, max);
        let span = (max.to_i128() - min.to_i128()) as u128;
        let offset = if span == u64::MAX as u128 {
            self.bits(64)?
        } else {
            self.bounded(span as u64 + 1, T::BITS, biased)?
        };
        Ok(T::from_i128(min.to_i128() + offset as i128))
    }

    /// Unbiased draw in `[min, max]`.
    pub fn int_range_at_most<T: Int>(&mut self, min: T, max: T) -> Result<T> {
        self.range_at_most(min, max, false)
    }

    pub fn int_range_at_most_biased<T: Int>(&mut self, min: T, max: T) -> Result<T> {
        self.range_at_most(min, max, true)
    }

    /// Unbiased draw in `[min, max)`.
    pub fn int_range_less_than<T: Int>(&mut self, min: T, max: T) -> Result<T> {
        assert!(min < max, "empty range {:?}..{:?}", min, max);
        self.range_at_most(min, T::from_i128(max.to_i128() - 1), false)
    }

    /// Unbiased index in `[0, len)`. The draw width is the smallest of
    /// 8/16/32/64 bits that holds `len - 1`.
    pub fn index(&mut self, len: usize) -> Result<usize> {
        assert!(len > 0, "cannot pick an index from an empty range");
        let bound = len as u64;
        Ok(self.bounded(bound, width_for(bound), false)? as usize)
    }

    /// True with probability `numerator / denominator`.
    pub fn chance(&mut self, numerator: u32, denominator: u32) -> Result<bool> {
        assert!(denominator > 0, "chance needs a positive denominator");
        let bound = denominator as u64;
        Ok(self.bounded(bound, width_for(bound), false)? < numerator as u64)
    }

    /// Picks an index with probability proportional to its weight.
    ///
    /// Panics if the weights sum to zero or overflow a `u64`.
    pub fn weighted_index(&mut self, weights: &[u64]) -> Result<usize> {
        let total = total_weight(weights);
        assert!(total > 0, "weighted choice needs a positive total weight");

        let mut target = self.bounded(total, width_for(total), true)?;
        for (i, &weight) in weights.iter().enumerate() {
            if target < weight {
                return Ok(i);
            }
            target -= weight;
        }
        unreachable!("bounded draw exceeded total weight")
    }

    pub fn choose<'t, T>(&mut self, items: &'t [T]) -> Result<&'t T> {
        Ok(&items[self.index(items.len())?])
    }

    /// Fisher-Yates shuffle in place.
    pub fn shuffle<T>(&mut self, items: &mut [T]) -> Result<()> {
        for i in (1..items.len()).rev() {
            let j = self.index(i + 1)?;
            items.swap(i, j);
        }
        Ok(())
    }

    /// Reinterprets a raw draw of `F`'s width as a float. May produce NaN,
    /// infinities and subnormals.
    pub fn float_bits<F: Float>(&mut self) -> Result<F> {
        Ok(F::from_bits_u64(self.bits(F::BITS)?))
    }

    /// Uniform float in `[0, 1)` built from `F`'s mantissa width.
    pub fn float_normalized<F: Float>(&mut self) -> Result<F> {
        let raw = self.bits(F::BITS)? & ((1u64 << F::MANTISSA_BITS) - 1);
        let scale = (1u64 << F::MANTISSA_BITS) as f64;
        Ok(F::from_f64(raw as f64 / scale))
    }

    /// Exponentially distributed float with rate 1, computed as
    /// `-ln(1 - u)` rather than `-ln(u)` so that `u = 0` gives `0`.
    pub fn float_exponential<F: Float>(&mut self) -> Result<F> {
        let u = self.float_normalized::<F>()?.to_f64();
        Ok(F::from_f64((1.0 / (1.0 - u)).ln()))
    }
}
