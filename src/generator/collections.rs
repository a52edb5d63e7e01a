// Collection generators: fixed arrays, growable slices (Vec), fixed-width
// vectors and strings.
//
// Every collection keeps one shrink context per element and shrinks one
// element at a time. Slices and strings additionally try shorter prefixes
// before touching individual elements.

use super::{
    element_candidates, element_contexts, traced, ElementContexts, Generate, Generated, Generator,
    ShrinkContext,
};
use crate::entropy::Random;
use crate::error::Result;

const DEFAULT_MAX_LEN: usize = 16;

/// Draws `len` elements, keeping each element's context.
fn generate_elements<G: Generator>(
    element: &G,
    random: &mut Random<'_, '_>,
    len: usize,
) -> Result<(Vec<G::Value>, ElementContexts)> {
    let mut values = Vec::new();
    values.try_reserve_exact(len)?;
    let mut contexts = Vec::new();
    contexts.try_reserve_exact(len)?;
    for _ in 0..len {
        let generated = element.generate(random)?;
        values.push(generated.value);
        contexts.push(generated.context);
    }
    Ok((values, contexts))
}

/// Shrinks one element at a time, rebuilding the collection with `build`.
fn shrink_elements<G, T, B>(
    element: &G,
    values: &[G::Value],
    contexts: &ElementContexts,
    build: B,
    candidates: &mut Vec<Generated<T>>,
) -> Result<()>
where
    G: Generator,
    B: Fn(Vec<G::Value>) -> T,
{
    for (i, candidate) in element_candidates(element, values, contexts)? {
        let mut next = values.to_vec();
        next[i] = candidate.value;
        let mut next_contexts = contexts.clone();
        next_contexts[i] = candidate.context;
        candidates.push(Generated::new(build(next)).with_context(next_contexts));
    }
    Ok(())
}

fn into_array<T, const N: usize>(values: Vec<T>) -> [T; N] {
    match values.try_into() {
        Ok(array) => array,
        Err(values) => unreachable!("expected {} elements, got {}", N, values.len()),
    }
}

/// Draws a collection length in `[min_len, max_len]` from a 32-bit draw.
fn draw_len(random: &mut Random<'_, '_>, min_len: usize, max_len: usize) -> Result<usize> {
    Ok(random.int_range_at_most(min_len as u32, max_len as u32)? as usize)
}

/// Lengths to try, shortest first: half the length, then one shorter.
fn shorter_lengths(len: usize, min_len: usize) -> Vec<usize> {
    let mut lengths = Vec::with_capacity(2);
    let half = (len / 2).max(min_len);
    if half < len {
        lengths.push(half);
    }
    if len > min_len && len - 1 != half {
        lengths.push(len - 1);
    }
    lengths
}

/// Fixed-size arrays `[T; N]`.
#[derive(Debug, Clone)]
pub struct ArrayGenerator<G, const N: usize> {
    element: G,
}

pub fn arrays<G: Generator, const N: usize>(element: G) -> ArrayGenerator<G, N> {
    ArrayGenerator { element }
}

impl<G: Generator, const N: usize> Generator for ArrayGenerator<G, N> {
    type Value = [G::Value; N];

    fn generate(&self, random: &mut Random<'_, '_>) -> Result<Generated<Self::Value>> {
        traced(random, |random| {
            let (values, contexts) = generate_elements(&self.element, random, N)?;
            Ok(Generated::new(into_array(values)).with_context(contexts))
        })
    }

    fn shrink(
        &self,
        value: &Self::Value,
        context: Option<&ShrinkContext>,
    ) -> Result<Vec<Generated<Self::Value>>> {
        let contexts = element_contexts(context, N);
        let mut candidates = Vec::new();
        shrink_elements(&self.element, value, &contexts, into_array, &mut candidates)?;
        Ok(candidates)
    }

    fn can_shrink_without_context(&self, value: &Self::Value) -> bool {
        value
            .iter()
            .any(|element| self.element.can_shrink_without_context(element))
    }
}

impl<T: Generate, const N: usize> Generate for [T; N] {
    type Generator = ArrayGenerator<T::Generator, N>;

    fn generator() -> Self::Generator {
        arrays(T::generator())
    }
}

/// Growable sequences with a length in `[min_len, max_len]`.
#[derive(Debug, Clone)]
pub struct SliceGenerator<G> {
    element: G,
    min_len: usize,
    max_len: usize,
}

pub fn vecs<G: Generator>(element: G) -> SliceGenerator<G> {
    SliceGenerator {
        element,
        min_len: 0,
        max_len: DEFAULT_MAX_LEN,
    }
}

impl<G: Generator> SliceGenerator<G> {
    pub fn len(mut self, min_len: usize, max_len: usize) -> SliceGenerator<G> {
        assert!(min_len <= max_len, "empty length range {}..={}", min_len, max_len);
        assert!(max_len <= u32::MAX as usize, "max_len {} too large", max_len);
        self.min_len = min_len;
        self.max_len = max_len;
        self
    }

    pub fn min_len(&self) -> usize {
        self.min_len
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }
}

impl<G: Generator> Generator for SliceGenerator<G> {
    type Value = Vec<G::Value>;

    fn generate(&self, random: &mut Random<'_, '_>) -> Result<Generated<Self::Value>> {
        traced(random, |random| {
            let len = draw_len(random, self.min_len, self.max_len)?;
            let (values, contexts) = generate_elements(&self.element, random, len)?;
            Ok(Generated::new(values).with_context(contexts))
        })
    }

    fn shrink(
        &self,
        value: &Self::Value,
        context: Option<&ShrinkContext>,
    ) -> Result<Vec<Generated<Self::Value>>> {
        let contexts = element_contexts(context, value.len());
        let mut candidates = Vec::new();
        for len in shorter_lengths(value.len(), self.min_len) {
            candidates.push(Generated::new(value[..len].to_vec()).with_context(contexts[..len].to_vec()));
        }
        shrink_elements(&self.element, value, &contexts, |values| values, &mut candidates)?;
        Ok(candidates)
    }

    fn can_shrink_without_context(&self, value: &Self::Value) -> bool {
        value.len() > self.min_len
            || value
                .iter()
                .any(|element| self.element.can_shrink_without_context(element))
    }
}

impl<T: Generate> Generate for Vec<T> {
    type Generator = SliceGenerator<T::Generator>;

    fn generator() -> Self::Generator {
        vecs(T::generator())
    }
}

/// Fixed-width lane vectors: the width is chosen when the generator is
/// built and never changes while shrinking.
#[derive(Debug, Clone)]
pub struct VectorGenerator<G> {
    element: G,
    width: usize,
}

pub fn vectors<G: Generator>(element: G, width: usize) -> VectorGenerator<G> {
    VectorGenerator { element, width }
}

impl<G: Generator> VectorGenerator<G> {
    pub fn width(&self) -> usize {
        self.width
    }
}

impl<G: Generator> Generator for VectorGenerator<G> {
    type Value = Vec<G::Value>;

    fn generate(&self, random: &mut Random<'_, '_>) -> Result<Generated<Self::Value>> {
        traced(random, |random| {
            let (values, contexts) = generate_elements(&self.element, random, self.width)?;
            Ok(Generated::new(values).with_context(contexts))
        })
    }

    fn shrink(
        &self,
        value: &Self::Value,
        context: Option<&ShrinkContext>,
    ) -> Result<Vec<Generated<Self::Value>>> {
        if value.len() != self.width {
            return Ok(Vec::new());
        }
        let contexts = element_contexts(context, self.width);
        let mut candidates = Vec::new();
        shrink_elements(&self.element, value, &contexts, |values| values, &mut candidates)?;
        Ok(candidates)
    }

    fn can_shrink_without_context(&self, value: &Self::Value) -> bool {
        value
            .iter()
            .any(|element| self.element.can_shrink_without_context(element))
    }
}

/// Strings over an alphabet. Characters shrink toward the start of the
/// alphabet, so order the alphabet simplest first.
#[derive(Debug, Clone)]
pub struct StringGenerator {
    alphabet: Vec<char>,
    min_len: usize,
    max_len: usize,
}

/// Printable ASCII strings, lowercase letters first.
pub fn strings() -> StringGenerator {
    let alphabet = ('a'..='z')
        .chain('A'..='Z')
        .chain('0'..='9')
        .chain(" !\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~".chars())
        .collect();
    StringGenerator {
        alphabet,
        min_len: 0,
        max_len: DEFAULT_MAX_LEN,
    }
}

impl StringGenerator {
    pub fn alphabet<I: IntoIterator<Item = char>>(mut self, alphabet: I) -> StringGenerator {
        self.alphabet = alphabet.into_iter().collect();
        assert!(!self.alphabet.is_empty(), "string alphabet is empty");
        self
    }

    pub fn len(mut self, min_len: usize, max_len: usize) -> StringGenerator {
        assert!(min_len <= max_len, "empty length range {}..={}", min_len, max_len);
        assert!(max_len <= u32::MAX as usize, "max_len {} too large", max_len);
        self.min_len = min_len;
        self.max_len = max_len;
        self
    }

    fn simpler_chars(&self, c: char) -> Vec<char> {
        match self.alphabet.iter().position(|&a| a == c) {
            Some(0) => Vec::new(),
            Some(i) if i / 2 > 0 => vec![self.alphabet[0], self.alphabet[i / 2]],
            _ => vec![self.alphabet[0]],
        }
    }
}

impl Generator for StringGenerator {
    type Value = String;

    fn generate(&self, random: &mut Random<'_, '_>) -> Result<Generated<String>> {
        traced(random, |random| {
            let len = draw_len(random, self.min_len, self.max_len)?;
            let mut value = String::new();
            value.try_reserve(len)?;
            for _ in 0..len {
                value.push(*random.choose(&self.alphabet)?);
            }
            Ok(Generated::new(value))
        })
    }

    fn shrink(&self, value: &String, _context: Option<&ShrinkContext>) -> Result<Vec<Generated<String>>> {
        let chars: Vec<char> = value.chars().collect();
        let mut candidates = Vec::new();
        for len in shorter_lengths(chars.len(), self.min_len) {
            candidates.push(Generated::new(chars[..len].iter().collect()));
        }
        for (i, &c) in chars.iter().enumerate() {
            for simpler in self.simpler_chars(c) {
                let mut next = chars.clone();
                next[i] = simpler;
                candidates.push(Generated::new(next.into_iter().collect()));
            }
        }
        Ok(candidates)
    }
}

impl Generate for String {
    type Generator = StringGenerator;

    fn generator() -> StringGenerator {
        strings()
    }
}
