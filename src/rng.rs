//! Deterministic, tag-addressed pseudo-random rolls (spec.md §4.1, C1).
//!
//! Every random decision anywhere in the core is expressed as a call to
//! [`roll`] with a constant string tag and an integer nonce (usually an
//! entity id). Two calls with the same `(seed, tag, nonce)` always produce
//! the same `f64 ∈ [0, 1)`, regardless of call order, thread, or how many
//! other rolls have happened — this is what makes replay (spec.md §8
//! "Determinism") possible: the outcome of a roll never depends on hidden
//! generator state, only on its three explicit inputs.
//!
//! Deliberately **not** built on the `rand` crate's seedable generators:
//! `StdRng`/`SmallRng` guarantee reproducibility only for a fixed sequence of
//! draws from one mutable generator, which would tie every outcome to call
//! order. A tag+nonce keyed hash has no such ordering dependency, and is
//! stable across crate/dependency version bumps, which a `rand`-backed
//! stream is not guaranteed to be. This is a deliberate point of divergence
//! from the teacher's `rand`-based sampling — see DESIGN.md.

/// Mixes a 64-bit value with the SplitMix64 finalizer. A small, well-known
/// bit-mixing function; used here purely as a counter-based hash, not as a
/// stateful generator.
fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

/// FNV-1a over a byte slice, used to fold the tag string into the mix.
fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

/// Produces a deterministic `f64 ∈ [0, 1)` from `(seed, tag, nonce)`.
///
/// `tag` should be a short constant string describing the decision being
/// made (e.g. `"dna"`, `"personality"`, `"negotiate.outcome"`,
/// `"negotiate.standfirm"`, `"malfunction.stall"`, `"seizure"`,
/// `"serviceTruck.offer"`, `"inspect.pick"`). `nonce` is usually an entity
/// id, but may be composed (e.g. `vehicle_id ^ (repair_count << 32)`) by the
/// caller when more than one roll is needed for the same tag against the
/// same entity.
pub fn roll(seed: u64, tag: &str, nonce: u64) -> f64 {
    let tag_hash = fnv1a(tag.as_bytes());
    let mixed = splitmix64(seed ^ tag_hash.rotate_left(17) ^ splitmix64(nonce));
    // Top 53 bits give a uniform f64 in [0, 1) without denormal bias.
    (mixed >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
}

/// Rolls and scales into `[lo, hi)`. Used for "uniform N–M" ranges in
/// spec.md §4.4 (search completion times, generation ages, damage/wear).
pub fn roll_range(seed: u64, tag: &str, nonce: u64, lo: f64, hi: f64) -> f64 {
    lo + roll(seed, tag, nonce) * (hi - lo)
}

/// Picks an index from `weights` proportional to their magnitude, using a
/// single roll. Weights need not sum to 1; they are normalized internally.
/// Used for the generation/DNA-tier distributions in spec.md §4.4.
pub fn weighted_pick(seed: u64, tag: &str, nonce: u64, weights: &[f64]) -> usize {
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return 0;
    }
    let mut target = roll(seed, tag, nonce) * total;
    for (i, w) in weights.iter().enumerate() {
        if target < *w {
            return i;
        }
        target -= w;
    }
    weights.len() - 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roll_is_deterministic() {
        let a = roll(42, "dna", 7);
        let b = roll(42, "dna", 7);
        assert_eq!(a, b);
    }

    #[test]
    fn roll_is_in_unit_interval() {
        for nonce in 0..1000u64 {
            let v = roll(42, "negotiate.standfirm", nonce);
            assert!((0.0..1.0).contains(&v), "roll out of range: {v}");
        }
    }

    #[test]
    fn different_tags_diverge() {
        let a = roll(42, "dna", 7);
        let b = roll(42, "personality", 7);
        assert_ne!(a, b);
    }

    #[test]
    fn different_nonces_diverge() {
        let a = roll(42, "dna", 7);
        let b = roll(42, "dna", 8);
        assert_ne!(a, b);
    }

    #[test]
    fn roll_range_respects_bounds() {
        for nonce in 0..500u64 {
            let v = roll_range(1, "search.completion", nonce, 1.0, 7.0);
            assert!((1.0..7.0).contains(&v));
        }
    }

    #[test]
    fn weighted_pick_respects_zero_weight() {
        // With weights [0, 1, 0] the pick must always land on index 1.
        for nonce in 0..200u64 {
            let i = weighted_pick(99, "dna.tier", nonce, &[0.0, 1.0, 0.0]);
            assert_eq!(i, 1);
        }
    }

    #[test]
    fn stand_firm_distribution_matches_spec() {
        // Over >=10_000 rolls the <0.30 / <0.80 / else split should match
        // 30/50/20 within 1% (spec.md §8 "Stand-firm distribution").
        let mut caves = 0u32;
        let mut holds = 0u32;
        let mut walks = 0u32;
        let n = 10_000u64;
        for nonce in 0..n {
            let v = roll(42, "negotiate.standfirm", nonce);
            if v < 0.30 {
                caves += 1;
            } else if v < 0.80 {
                holds += 1;
            } else {
                walks += 1;
            }
        }
        let pct = |c: u32| c as f64 / n as f64 * 100.0;
        assert!((pct(caves) - 30.0).abs() < 1.0, "caves% = {}", pct(caves));
        assert!((pct(holds) - 50.0).abs() < 1.0, "holds% = {}", pct(holds));
        assert!((pct(walks) - 20.0).abs() < 1.0, "walks% = {}", pct(walks));
    }
}
