// src/repositories/postgres/mod.rs

pub mod blackjack;
pub mod inventory;
pub mod jobs;
pub mod ledger;
pub mod raffles;
pub mod shop;
