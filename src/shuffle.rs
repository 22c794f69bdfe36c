//! Uniform shuffling of a line index.

use crate::index::LineDescriptor;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Apply `repeats` independent uniform permutations to `lines` in place.
///
/// Only the last pass is observable, but every requested pass runs.
/// Returns the number of passes performed.
pub fn shuffle_lines<R: Rng + ?Sized>(
    lines: &mut [LineDescriptor],
    repeats: usize,
    rng: &mut R,
) -> usize {
    for _ in 0..repeats {
        lines.shuffle(rng);
    }
    repeats
}

/// Build the RNG for one file's shuffle.
///
/// With a job seed, each file gets its own deterministic stream derived from
/// the seed and the file name, so concurrent runs stay reproducible no matter
/// which worker picks up which file. Without one, the RNG is seeded from OS
/// entropy.
#[must_use]
pub fn file_rng(seed: Option<u64>, file_name: &str) -> ChaCha8Rng {
    seed.map_or_else(ChaCha8Rng::from_entropy, |s| {
        ChaCha8Rng::seed_from_u64(s ^ fnv1a(file_name.as_bytes()))
    })
}

/// 64-bit FNV-1a.
const fn fnv1a(bytes: &[u8]) -> u64 {
    let mut h: u64 = 0xCBF2_9CE4_8422_2325;
    let mut i = 0;
    while i < bytes.len() {
        h ^= bytes[i] as u64;
        h = h.wrapping_mul(0x0000_0100_0000_01B3);
        i += 1;
    }
    h
}
