// Deterministic, portable pseudo-random number generator for Markov Composer.
//
// Implements xoshiro256++ (Blackman & Vigna, 2019) with SplitMix64 seeding.
// The generator core uses only integer arithmetic, so a given seed produces
// the same stream on every platform and compiler.
//
// One `ComposerRng` is created per run and passed by `&mut` into every
// component that makes a random decision: the sampler's initial context,
// weighted next-pitch choice, the unseen-context fallback, and rhythm
// pattern selection. Nothing in the composer reaches for an ambient or
// thread-local source, so a run is fully reproducible from its seed.

/// Xoshiro256++ PRNG, the composer's sole source of randomness.
#[derive(Clone, Debug)]
pub struct ComposerRng {
    s: [u64; 4],
}

impl ComposerRng {
    /// Create a new PRNG seeded from a `u64`.
    ///
    /// Uses SplitMix64 to expand the seed into the 256-bit internal state.
    /// Two generators created with the same seed produce identical streams.
    pub fn new(seed: u64) -> Self {
        let mut sm = seed;
        Self {
            s: [
                splitmix64(&mut sm),
                splitmix64(&mut sm),
                splitmix64(&mut sm),
                splitmix64(&mut sm),
            ],
        }
    }

    /// Generate the next `u64` in the sequence.
    pub fn next_u64(&mut self) -> u64 {
        let result = (self.s[0].wrapping_add(self.s[3]))
            .rotate_left(23)
            .wrapping_add(self.s[0]);

        let t = self.s[1] << 17;

        self.s[2] ^= self.s[0];
        self.s[3] ^= self.s[1];
        self.s[1] ^= self.s[2];
        self.s[0] ^= self.s[3];

        self.s[2] ^= t;
        self.s[3] = self.s[3].rotate_left(45);

        result
    }

    /// Generate a uniform `f64` in [0, 1) from the upper 53 bits.
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Generate a uniform random integer in `[low, high)`.
    ///
    /// Uses rejection sampling to avoid modulo bias.
    /// Panics if `low >= high`.
    pub fn range_u64(&mut self, low: u64, high: u64) -> u64 {
        assert!(low < high, "range_u64: low must be less than high");
        let range = high - low;
        if range.is_power_of_two() {
            return low + (self.next_u64() & (range - 1));
        }
        let threshold = range.wrapping_neg() % range;
        loop {
            let r = self.next_u64();
            if r >= threshold {
                return low + (r % range);
            }
        }
    }

    /// Generate a uniform random `usize` in `[low, high)`.
    ///
    /// Panics if `low >= high`.
    pub fn range_usize(&mut self, low: usize, high: usize) -> usize {
        self.range_u64(low as u64, high as u64) as usize
    }

    /// Pick a uniformly random element of `items`, or `None` if it is empty.
    pub fn choose<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        Some(&items[self.range_usize(0, items.len())])
    }

    /// Pick an index with probability proportional to its weight.
    ///
    /// Walks the cumulative sum and returns the first index whose running
    /// total exceeds `u * total`. Negative and NaN weights count as zero.
    /// Returns `None` if there are no weights or they sum to zero. If
    /// floating-point rounding lets the walk fall off the end, the last
    /// index with a positive weight is returned.
    pub fn weighted_index(&mut self, weights: &[f64]) -> Option<usize> {
        let weight = |w: f64| if w > 0.0 { w } else { 0.0 };
        let total: f64 = weights.iter().copied().map(weight).sum();
        if total <= 0.0 {
            return None;
        }

        let target = self.next_f64() * total;
        let mut cumulative = 0.0;
        for (i, &w) in weights.iter().enumerate() {
            cumulative += weight(w);
            if cumulative > target {
                return Some(i);
            }
        }
        weights.iter().rposition(|&w| weight(w) > 0.0)
    }
}

/// SplitMix64, used only to expand a `u64` seed into xoshiro state.
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_stream() {
        let mut a = ComposerRng::new(42);
        let mut b = ComposerRng::new(42);
        for _ in 0..1000 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
    }

    #[test]
    fn known_sequence_from_seed_zero() {
        // Pinned outputs. If this breaks, every seeded composition changes.
        let mut rng = ComposerRng::new(0);
        let vals: Vec<u64> = (0..5).map(|_| rng.next_u64()).collect();
        assert_eq!(
            vals,
            [
                0x5317_5d61_490b_23df,
                0x61da_6f3d_c380_d507,
                0x5c0f_df91_ec9a_7bfc,
                0x02ee_bf8c_3bbe_5e1a,
                0x7eca_04eb_af4a_5eea,
            ]
        );
    }

    #[test]
    fn known_sequence_from_seed_42() {
        let mut rng = ComposerRng::new(42);
        assert_eq!(rng.next_u64(), 0xd076_4d4f_4476_689f);
        assert_eq!(rng.next_u64(), 0x519e_4174_576f_3791);
    }

    #[test]
    fn splitmix_reference_value() {
        let mut state = 0;
        assert_eq!(splitmix64(&mut state), 0xe220_a839_7b1d_cdaf);
    }

    #[test]
    fn different_seeds_diverge() {
        let mut a = ComposerRng::new(42);
        let mut b = ComposerRng::new(43);
        assert_ne!(a.next_u64(), b.next_u64());
    }

    #[test]
    fn clone_continues_identically() {
        let mut rng = ComposerRng::new(7);
        for _ in 0..10 {
            rng.next_u64();
        }
        let mut copy = rng.clone();
        for _ in 0..100 {
            assert_eq!(rng.next_u64(), copy.next_u64());
        }
    }

    #[test]
    fn f64_in_unit_range() {
        let mut rng = ComposerRng::new(12345);
        for _ in 0..10_000 {
            let v = rng.next_f64();
            assert!((0.0..1.0).contains(&v), "f64 out of range: {v}");
        }
    }

    #[test]
    fn range_usize_within_bounds() {
        let mut rng = ComposerRng::new(555);
        for _ in 0..10_000 {
            let v = rng.range_usize(5, 15);
            assert!((5..15).contains(&v), "range_usize out of range: {v}");
        }
    }

    #[test]
    fn range_usize_single_value() {
        let mut rng = ComposerRng::new(1);
        for _ in 0..100 {
            assert_eq!(rng.range_usize(3, 4), 3);
        }
    }

    #[test]
    fn choose_empty_is_none() {
        let mut rng = ComposerRng::new(1);
        let empty: [u8; 0] = [];
        assert!(rng.choose(&empty).is_none());
    }

    #[test]
    fn choose_reaches_every_element() {
        let mut rng = ComposerRng::new(99);
        let items = ['a', 'b', 'c', 'd'];
        let mut seen = [false; 4];
        for _ in 0..1000 {
            let c = *rng.choose(&items).unwrap();
            seen[items.iter().position(|&x| x == c).unwrap()] = true;
        }
        assert!(seen.iter().all(|&s| s), "some element never chosen: {seen:?}");
    }

    #[test]
    fn weighted_index_skips_zero_weights() {
        let mut rng = ComposerRng::new(2024);
        let weights = [0.0, 3.0, 0.0, 1.0];
        let mut counts = [0usize; 4];
        for _ in 0..10_000 {
            counts[rng.weighted_index(&weights).unwrap()] += 1;
        }
        assert_eq!(counts[0], 0);
        assert_eq!(counts[2], 0);
        // Index 1 should get roughly three quarters of the draws.
        let share = counts[1] as f64 / 10_000.0;
        assert!((0.70..0.80).contains(&share), "share of index 1: {share}");
    }

    #[test]
    fn weighted_index_degenerate_inputs() {
        let mut rng = ComposerRng::new(5);
        assert_eq!(rng.weighted_index(&[]), None);
        assert_eq!(rng.weighted_index(&[0.0, 0.0]), None);
        assert_eq!(rng.weighted_index(&[-1.0, f64::NAN]), None);
        for _ in 0..100 {
            assert_eq!(rng.weighted_index(&[0.0, 1.0]), Some(1));
        }
    }
}
