// File: tallybot-core/src/tasks/mod.rs

pub mod raffle_conclusion;
