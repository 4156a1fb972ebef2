// File: tallybot-common/src/models/blackjack.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Suit {
    Clubs,
    Diamonds,
    Hearts,
    Spades,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Clubs, Suit::Diamonds, Suit::Hearts, Suit::Spades];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rank {
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
    Jack,
    Queen,
    King,
    Ace,
}

impl Rank {
    pub const ALL: [Rank; 13] = [
        Rank::Two,
        Rank::Three,
        Rank::Four,
        Rank::Five,
        Rank::Six,
        Rank::Seven,
        Rank::Eight,
        Rank::Nine,
        Rank::Ten,
        Rank::Jack,
        Rank::Queen,
        Rank::King,
        Rank::Ace,
    ];

    /// Base blackjack value: pip cards count face value, face cards 10,
    /// an ace starts at 11 and may later be downgraded to 1.
    pub fn base_value(self) -> i64 {
        match self {
            Rank::Two => 2,
            Rank::Three => 3,
            Rank::Four => 4,
            Rank::Five => 5,
            Rank::Six => 6,
            Rank::Seven => 7,
            Rank::Eight => 8,
            Rank::Nine => 9,
            Rank::Ten | Rank::Jack | Rank::Queen | Rank::King => 10,
            Rank::Ace => 11,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub rank: Rank,
    pub suit: Suit,
}

impl Card {
    pub fn new(rank: Rank, suit: Suit) -> Self {
        Self { rank, suit }
    }
}

/// Ace-reconciled hand total: every ace starts at 11, then aces are
/// downgraded to 1 one at a time while the total exceeds 21.
pub fn hand_total(cards: &[Card]) -> i64 {
    let mut total = 0;
    let mut aces = 0;
    for card in cards {
        if card.rank == Rank::Ace {
            aces += 1;
        }
        total += card.rank.base_value();
    }
    while total > 21 && aces > 0 {
        total -= 10;
        aces -= 1;
    }
    total
}

/// A natural blackjack: 21 from exactly the initial two cards.
pub fn is_natural(cards: &[Card]) -> bool {
    cards.len() == 2 && hand_total(cards) == 21
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameStatus {
    InProgress,
    PlayerWin,
    DealerWin,
    Push,
}

impl GameStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            GameStatus::InProgress => "in_progress",
            GameStatus::PlayerWin => "player_win",
            GameStatus::DealerWin => "dealer_win",
            GameStatus::Push => "push",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "in_progress" => Some(GameStatus::InProgress),
            "player_win" => Some(GameStatus::PlayerWin),
            "dealer_win" => Some(GameStatus::DealerWin),
            "push" => Some(GameStatus::Push),
            _ => None,
        }
    }
}

/// One open blackjack table per user. The bet has already been moved out
/// of the wallet when the row exists (escrow); settlement deletes the row
/// and credits any payout back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlackjackGame {
    pub game_id: Uuid,
    pub user_id: String,
    pub bet: i64,
    pub player_hand: Vec<Card>,
    pub dealer_hand: Vec<Card>,
    pub status: GameStatus,
    pub created_at: DateTime<Utc>,
}

impl BlackjackGame {
    pub fn player_total(&self) -> i64 {
        hand_total(&self.player_hand)
    }

    pub fn dealer_total(&self) -> i64 {
        hand_total(&self.dealer_hand)
    }
}
