// src/repositories/mod.rs

pub mod postgres;

pub use tallybot_common::traits::repository_traits::{
    BlackjackRepository, InventoryRepository, JobRepository, LedgerRepository, RaffleRepository,
    ShopRepository,
};

pub use postgres::blackjack::PostgresBlackjackRepository;
pub use postgres::inventory::PostgresInventoryRepository;
pub use postgres::jobs::PostgresJobRepository;
pub use postgres::ledger::PostgresLedgerRepository;
pub use postgres::raffles::PostgresRaffleRepository;
pub use postgres::shop::PostgresShopRepository;
