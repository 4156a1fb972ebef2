// File: tallybot-core/src/test_utils/scripted.rs

use std::collections::VecDeque;
use std::sync::Mutex;

use tallybot_common::models::blackjack::Card;

use crate::rng::RandomSource;

/// A random source that replays queued values, so a test can force rob
/// coin flips, steal percentages, and exact card sequences. Panics when a
/// queue runs dry: a test that consumes more randomness than it scripted
/// is wrong.
#[derive(Default)]
pub struct ScriptedSource {
    ints: Mutex<VecDeque<i64>>,
    floats: Mutex<VecDeque<f64>>,
    cards: Mutex<VecDeque<Card>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_int(&self, value: i64) {
        self.ints.lock().unwrap().push_back(value);
    }

    pub fn push_float(&self, value: f64) {
        self.floats.lock().unwrap().push_back(value);
    }

    pub fn push_card(&self, card: Card) {
        self.cards.lock().unwrap().push_back(card);
    }

    pub fn push_cards<I: IntoIterator<Item = Card>>(&self, cards: I) {
        let mut queue = self.cards.lock().unwrap();
        queue.extend(cards);
    }
}

impl RandomSource for ScriptedSource {
    fn uniform_int(&self, min: i64, max: i64) -> i64 {
        let value = self
            .ints
            .lock()
            .unwrap()
            .pop_front()
            .expect("scripted source ran out of ints");
        assert!(
            (min..=max).contains(&value),
            "scripted int {value} outside [{min}, {max}]"
        );
        value
    }

    fn uniform_float(&self, min: f64, max: f64) -> f64 {
        let value = self
            .floats
            .lock()
            .unwrap()
            .pop_front()
            .expect("scripted source ran out of floats");
        assert!(
            value >= min && value < max,
            "scripted float {value} outside [{min}, {max})"
        );
        value
    }

    fn draw_card(&self) -> Card {
        self.cards
            .lock()
            .unwrap()
            .pop_front()
            .expect("scripted source ran out of cards")
    }
}
