use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Random draws the Gibbs sampler needs.
///
/// The same seed must always yield the same sequence of draws.
pub trait RandomSource {
    /// Uniform draw from `0..n`.
    fn uniform_topic(&mut self, n: usize) -> usize;

    /// Draw an index from a normalized probability vector.
    fn categorical(&mut self, probs: &[f64]) -> usize;
}

#[derive(Debug, Clone)]
pub struct SeededRandom {
    rng: StdRng,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        SeededRandom {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl RandomSource for SeededRandom {
    fn uniform_topic(&mut self, n: usize) -> usize {
        self.rng.gen_range(0..n)
    }

    fn categorical(&mut self, probs: &[f64]) -> usize {
        let threshold: f64 = self.rng.gen();
        let mut cumsum = 0.0;
        for (i, &p) in probs.iter().enumerate() {
            cumsum += p;
            if threshold < cumsum {
                return i;
            }
        }

        // Rounding left the total just under 1.
        probs.iter().rposition(|&p| p > 0.0).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_draws() {
        let mut a = SeededRandom::new(42);
        let mut b = SeededRandom::new(42);
        let probs = [0.2, 0.3, 0.5];
        for _ in 0..100 {
            assert_eq!(a.uniform_topic(7), b.uniform_topic(7));
            assert_eq!(a.categorical(&probs), b.categorical(&probs));
        }
    }

    #[test]
    fn categorical_never_picks_zero_mass() {
        let mut rng = SeededRandom::new(7);
        let probs = [0.0, 1.0, 0.0];
        for _ in 0..200 {
            assert_eq!(rng.categorical(&probs), 1);
        }
    }

    #[test]
    fn categorical_roughly_follows_weights() {
        let mut rng = SeededRandom::new(1);
        let probs = [0.1, 0.9];
        let hits = (0..10_000).filter(|_| rng.categorical(&probs) == 1).count();
        assert!((8_500..9_500).contains(&hits));
    }

    #[test]
    fn uniform_stays_in_range() {
        let mut rng = SeededRandom::new(3);
        assert!((0..1000).all(|_| rng.uniform_topic(4) < 4));
        assert!((0..10).all(|_| rng.uniform_topic(1) == 0));
    }
}
