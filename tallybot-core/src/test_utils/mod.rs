// File: tallybot-core/src/test_utils/mod.rs
//
// Test-support implementations: a fully in-memory store satisfying every
// repository trait, and a scripted random source. Service-level tests use
// these instead of a live Postgres.

pub mod memory;
pub mod scripted;

pub use memory::MemStore;
pub use scripted::ScriptedSource;
