// File: tallybot-core/src/services/mod.rs

pub mod blackjack_service;
pub mod economy_service;
pub mod job_service;
pub mod raffle_service;
pub mod shop_service;

pub use blackjack_service::{BlackjackService, HandView, HitOutcome, Settlement};
pub use economy_service::{EconomyService, RobOutcome};
pub use job_service::{AssignmentMode, JobService};
pub use raffle_service::{ConclusionReport, RaffleService};
pub use shop_service::ShopService;
