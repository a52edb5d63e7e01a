//! # Entropy Source Test Suite
//!
//! Statistical and byte-accounting checks for the finite entropy source.
//!
//! - Bounded draws are uniform for bounds that are not powers of two
//!   (chi-square goodness of fit over ChaCha buffers with fixed seeds).
//! - The biased variant is measurably non-uniform where rejection matters.
//! - Every draw consumes a fixed number of bytes, so replays line up.

use conjecture_finite::entropy::Entropy;
use conjecture_finite::error::Error;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Test helper producing a reproducible random buffer
fn random_buffer(seed: u64, len: usize) -> Vec<u8> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut buffer = vec![0u8; len];
    rng.fill_bytes(&mut buffer);
    buffer
}

/// Pearson's chi-square statistic against the uniform distribution
fn chi_square(counts: &[u64]) -> f64 {
    let total: u64 = counts.iter().sum();
    let expected = total as f64 / counts.len() as f64;
    counts
        .iter()
        .map(|&observed| {
            let diff = observed as f64 - expected;
            diff * diff / expected
        })
        .sum()
}

/// Critical values at p = 0.0001 for `n - 1` degrees of freedom
const CASES: [(usize, f64); 5] = [(3, 18.42), (5, 23.51), (7, 27.86), (10, 33.72), (100, 160.0)];

#[test]
fn test_index_is_uniform() {
    for (i, &(n, critical)) in CASES.iter().enumerate() {
        let bytes = random_buffer(i as u64, 400 * n);
        let mut entropy = Entropy::new(&bytes);
        let mut random = entropy.random();
        let mut counts = vec![0u64; n];
        for _ in 0..200 * n {
            counts[random.index(n).unwrap()] += 1;
        }
        let statistic = chi_square(&counts);
        assert!(statistic < critical, "n = {}: chi-square {} >= {}", n, statistic, critical);
    }
}

#[test]
fn test_wide_bounded_draws_are_uniform() {
    for (i, &(n, critical)) in CASES.iter().enumerate() {
        let bytes = random_buffer(100 + i as u64, 4 * 300 * n);
        let mut entropy = Entropy::new(&bytes);
        let mut random = entropy.random();
        let mut counts = vec![0u64; n];
        for _ in 0..200 * n {
            counts[random.uint_less_than(n as u32).unwrap() as usize] += 1;
        }
        let statistic = chi_square(&counts);
        assert!(statistic < critical, "n = {}: chi-square {} >= {}", n, statistic, critical);
    }
}

#[test]
fn test_ranges_are_uniform() {
    let bytes = random_buffer(7, 8 * 4000);
    let mut entropy = Entropy::new(&bytes);
    let mut random = entropy.random();
    let mut counts = vec![0u64; 7];
    for _ in 0..1400 {
        let value = random.int_range_at_most(-3i16, 3).unwrap();
        counts[(value + 3) as usize] += 1;
    }
    assert!(chi_square(&counts) < 27.86);
}

#[test]
fn test_rejection_removes_modulo_bias() {
    // 256 byte values onto 192 outcomes: without rejection a third of the
    // outcomes are hit twice as often as the rest.
    let n = 192u8;
    let critical = 275.0;

    let bytes = random_buffer(11, 60_000);
    let mut entropy = Entropy::new(&bytes);
    let mut random = entropy.random();
    let mut unbiased = vec![0u64; n as usize];
    for _ in 0..100 * n as usize {
        unbiased[random.uint_less_than(n).unwrap() as usize] += 1;
    }
    assert!(chi_square(&unbiased) < critical);

    let mut random = entropy.random();
    let mut biased = vec![0u64; n as usize];
    for _ in 0..100 * n as usize {
        biased[random.uint_less_than_biased(n).unwrap() as usize] += 1;
    }
    assert!(chi_square(&biased) > critical);
}

#[test]
fn test_biased_draws_consume_exactly_one_draw() {
    let bytes = random_buffer(5, 1000);
    let mut entropy = Entropy::new(&bytes);
    let mut random = entropy.random();
    for i in 1..=250 {
        random.uint_less_than_biased(3u32).unwrap();
        assert_eq!(random.position(), 4 * i);
    }
}

#[test]
fn test_replay_draws_the_same_values() {
    let bytes = random_buffer(9, 512);
    let mut entropy = Entropy::new(&bytes);

    let mut first = Vec::new();
    let mut random = entropy.random();
    while let Ok(value) = random.int_range_at_most(0u64, 1_000_000_007) {
        first.push(value);
    }

    let mut second = Vec::new();
    let mut random = entropy.random();
    while let Ok(value) = random.int_range_at_most(0u64, 1_000_000_007) {
        second.push(value);
    }
    assert!(first.len() > 50);
    assert_eq!(first, second);
}

#[test]
fn test_exhaustion_reports_shortfall() {
    let bytes = random_buffer(1, 6);
    let mut entropy = Entropy::new(&bytes);
    let mut random = entropy.random();
    random.int::<u32>().unwrap();
    assert_eq!(
        random.int::<u64>(),
        Err(Error::OutOfEntropy {
            needed: 8,
            remaining: 2
        })
    );
    assert_eq!(random.position(), 4);
    assert_eq!(random.int::<u16>().unwrap().to_le_bytes(), [bytes[4], bytes[5]]);
}

#[test]
fn test_shuffle_is_a_permutation() {
    let bytes = random_buffer(21, 256);
    let mut entropy = Entropy::new(&bytes);
    let mut random = entropy.random();
    let mut items: Vec<u32> = (0..20).collect();
    random.shuffle(&mut items).unwrap();
    let mut sorted = items.clone();
    sorted.sort_unstable();
    assert_eq!(sorted, (0..20).collect::<Vec<_>>());
    assert_ne!(items, sorted);
}

#[test]
fn test_exponential_floats_are_non_negative() {
    let bytes = random_buffer(33, 8 * 500);
    let mut entropy = Entropy::new(&bytes);
    let mut random = entropy.random();
    let mut total = 0.0;
    for _ in 0..500 {
        let value = random.float_exponential::<f64>().unwrap();
        assert!(value >= 0.0 && value.is_finite());
        total += value;
    }
    // Mean of Exp(1) is 1.
    let mean = total / 500.0;
    assert!(mean > 0.8 && mean < 1.2, "mean {}", mean);
}
