// tallybot-core/src/rng.rs

use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tallybot_common::models::blackjack::{Card, Rank, Suit};

/// The randomness collaborator. Every engine that gambles, deals, or
/// draws winners takes one of these, so tests can inject a seeded or
/// scripted source and production wires in [`ThreadRngSource`].
///
/// The default methods derive everything from `uniform_int`, which keeps
/// a scripted test source in full control of card draws and winner picks.
pub trait RandomSource: Send + Sync {
    /// Uniform integer in `[min, max]`, both ends inclusive.
    fn uniform_int(&self, min: i64, max: i64) -> i64;

    /// Uniform float in `[min, max)`.
    fn uniform_float(&self, min: f64, max: f64) -> f64;

    /// One card from an infinite shoe: rank and suit drawn independently,
    /// with replacement.
    fn draw_card(&self) -> Card {
        let rank = Rank::ALL[self.uniform_int(0, 12) as usize];
        let suit = Suit::ALL[self.uniform_int(0, 3) as usize];
        Card::new(rank, suit)
    }

    /// `k` distinct indices into a pool of `pool_len`, uniform without
    /// replacement (partial Fisher-Yates). Returns all indices when
    /// `k >= pool_len`.
    fn pick_without_replacement(&self, pool_len: usize, k: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..pool_len).collect();
        let k = k.min(pool_len);
        for i in 0..k {
            let j = self.uniform_int(i as i64, pool_len.saturating_sub(1) as i64) as usize;
            indices.swap(i, j);
        }
        indices.truncate(k);
        indices
    }
}

/// Production source backed by the thread-local generator.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRngSource;

impl RandomSource for ThreadRngSource {
    fn uniform_int(&self, min: i64, max: i64) -> i64 {
        rand::rng().random_range(min..=max)
    }

    fn uniform_float(&self, min: f64, max: f64) -> f64 {
        rand::rng().random_range(min..max)
    }
}

/// Deterministic source for tests: a seeded StdRng behind a mutex.
pub struct SeededSource {
    rng: Mutex<StdRng>,
}

impl SeededSource {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl RandomSource for SeededSource {
    fn uniform_int(&self, min: i64, max: i64) -> i64 {
        self.rng.lock().unwrap().random_range(min..=max)
    }

    fn uniform_float(&self, min: f64, max: f64) -> f64 {
        self.rng.lock().unwrap().random_range(min..max)
    }
}
