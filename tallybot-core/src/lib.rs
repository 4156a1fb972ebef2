// src/lib.rs

pub mod db;
pub mod repositories;
pub mod rng;
pub mod services;
pub mod tasks;
pub mod test_utils;

pub use db::Database;
pub use tallybot_common::error::Error;
