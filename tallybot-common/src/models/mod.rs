// File: tallybot-common/src/models/mod.rs
pub mod account;
pub mod blackjack;
pub mod job;
pub mod raffle;
pub mod shop;

pub use account::Account;
pub use blackjack::{BlackjackGame, Card, GameStatus, Rank, Suit};
pub use job::{Job, JobAssignment, JobWithAssignees};
pub use raffle::{Prize, Raffle, RaffleEntry};
pub use shop::{InventoryEntry, ShopItem};
