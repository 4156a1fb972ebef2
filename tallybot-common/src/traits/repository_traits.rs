// File: tallybot-common/src/traits/repository_traits.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Error;
use crate::models::account::Account;
use crate::models::blackjack::BlackjackGame;
use crate::models::job::{Job, JobWithAssignees};
use crate::models::raffle::Raffle;
use crate::models::shop::{InventoryEntry, ShopItem};

/// Wallet/bank storage. Every method that moves money is a single atomic
/// unit inside the implementation (one transaction or one conditional
/// update); callers never sequence a read against a later write.
///
/// Any negative delta that would take a balance below zero fails with
/// `Error::InsufficientFunds`, even though engine call sites pre-check.
#[async_trait]
pub trait LedgerRepository: Send + Sync {
    /// Lazily creates the account with zero balances on first reference.
    async fn get_or_create_account(&self, user_id: &str) -> Result<Account, Error>;

    /// Atomic wallet add; returns the account after the change.
    async fn adjust_wallet(&self, user_id: &str, delta: i64) -> Result<Account, Error>;

    /// Atomic bank add; returns the account after the change.
    async fn adjust_bank(&self, user_id: &str, delta: i64) -> Result<Account, Error>;

    /// Deposit: wallet -> bank, one atomic step.
    async fn move_wallet_to_bank(&self, user_id: &str, amount: i64) -> Result<Account, Error>;

    /// Withdraw: bank -> wallet, one atomic step.
    async fn move_bank_to_wallet(&self, user_id: &str, amount: i64) -> Result<Account, Error>;

    /// Wallet-to-wallet transfer; debit and credit commit together or not
    /// at all.
    async fn transfer_wallet(&self, from_id: &str, to_id: &str, amount: i64) -> Result<(), Error>;

    /// The richest accounts by wallet + bank, descending. Ties are broken
    /// by storage order.
    async fn top_accounts(&self, limit: i64) -> Result<Vec<Account>, Error>;
}

#[async_trait]
pub trait ShopRepository: Send + Sync {
    /// Fails with `Error::DuplicateName` if an item with this name exists.
    async fn create_item(&self, item: &ShopItem) -> Result<(), Error>;

    async fn get_item_by_name(&self, name: &str) -> Result<Option<ShopItem>, Error>;

    /// Available items only, in listing order.
    async fn list_available(&self) -> Result<Vec<ShopItem>, Error>;

    /// Returns false when no such item existed (caller formats a notice).
    async fn remove_item(&self, name: &str) -> Result<bool, Error>;

    /// The composed buy: wallet debit, inventory credit, and stock
    /// decrement as one transaction. Fails `ItemNotFound`, `OutOfStock`,
    /// or `InsufficientFunds`; on any failure nothing is applied.
    async fn purchase_item(&self, user_id: &str, name: &str) -> Result<ShopItem, Error>;
}

#[async_trait]
pub trait InventoryRepository: Send + Sync {
    /// 0 when the user holds none (absent row).
    async fn quantity_of(&self, user_id: &str, item_id: Uuid) -> Result<i64, Error>;

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<InventoryEntry>, Error>;

    /// Upsert-increment.
    async fn grant(&self, user_id: &str, item: &ShopItem, qty: i64) -> Result<(), Error>;

    /// Decrement, deleting the row when it reaches 0. Fails
    /// `InsufficientQuantity` without changes when the user holds less
    /// than `qty`.
    async fn consume(&self, user_id: &str, item: &ShopItem, qty: i64) -> Result<(), Error>;

    /// Sender decrement (row deleted at 0) plus recipient increment in
    /// one transaction.
    async fn transfer_item(
        &self,
        from_id: &str,
        to_id: &str,
        item: &ShopItem,
        qty: i64,
    ) -> Result<(), Error>;
}

#[async_trait]
pub trait JobRepository: Send + Sync {
    async fn create_job(&self, job: &Job) -> Result<(), Error>;

    async fn get_job(&self, job_id: Uuid) -> Result<Option<Job>, Error>;

    async fn all_jobs(&self) -> Result<Vec<Job>, Error>;

    /// Every job with its current assignee set.
    async fn list_jobs(&self) -> Result<Vec<JobWithAssignees>, Error>;

    /// Deletes the job row and cascades its assignments. Returns false
    /// when no such job existed.
    async fn remove_job(&self, job_id: Uuid) -> Result<bool, Error>;

    /// Jobs the user is not currently linked to (multi-assignee pick pool).
    async fn jobs_unassigned_to(&self, user_id: &str) -> Result<Vec<Job>, Error>;

    /// Creates the (job, user) link. Fails `AlreadyAssigned` if the link
    /// exists; the uniqueness check and the insert are one atomic unit.
    async fn assign(&self, job_id: Uuid, user_id: &str) -> Result<(), Error>;

    /// Creates the link only if the user holds no job anywhere
    /// (single-assignee mode). Guard and insert are one atomic unit.
    async fn assign_sole(&self, job_id: Uuid, user_id: &str) -> Result<(), Error>;

    /// The job a user holds, if any (meaningful in single-assignee mode;
    /// in multi mode returns an arbitrary held job).
    async fn user_assignment(&self, user_id: &str) -> Result<Option<Job>, Error>;

    /// Removes exactly the (job, user) link and credits `reward` into the
    /// user's wallet, together or not at all. Fails `NotAssigned` when no
    /// such link exists.
    async fn complete(&self, job_id: Uuid, user_id: &str, reward: i64) -> Result<(), Error>;
}

#[async_trait]
pub trait BlackjackRepository: Send + Sync {
    /// Escrow plus insert: debits `game.bet` from the wallet and stores
    /// the game in one transaction. Fails `ActiveGameExists` when the
    /// user already has an in-progress game, `InsufficientFunds` when the
    /// wallet cannot cover the bet.
    async fn create_game(&self, game: &BlackjackGame) -> Result<(), Error>;

    async fn get_active_game(&self, user_id: &str) -> Result<Option<BlackjackGame>, Error>;

    /// Persists updated hands/status for an in-progress game.
    async fn update_game(&self, game: &BlackjackGame) -> Result<(), Error>;

    /// Deletes the game row and credits `payout` (0 for a loss) into the
    /// user's wallet in one transaction.
    async fn settle_game(&self, game_id: Uuid, user_id: &str, payout: i64) -> Result<(), Error>;
}

#[async_trait]
pub trait RaffleRepository: Send + Sync {
    /// Fails `DuplicateName` when an active raffle already uses the name.
    async fn create_raffle(&self, raffle: &Raffle) -> Result<(), Error>;

    async fn get_raffle(&self, raffle_id: Uuid) -> Result<Option<Raffle>, Error>;

    async fn list_active(&self) -> Result<Vec<Raffle>, Error>;

    /// Raffles whose `ends_at` is at or before `now` (conclusion poll).
    async fn due_raffles(&self, now: DateTime<Utc>) -> Result<Vec<Raffle>, Error>;

    /// Upsert: a repeat entry adds tickets to the existing row.
    async fn add_entry(&self, raffle_id: Uuid, user_id: &str, tickets: i64) -> Result<(), Error>;

    /// Deduplicated entrant ids.
    async fn distinct_entrants(&self, raffle_id: Uuid) -> Result<Vec<String>, Error>;

    /// Deletes the raffle and cascades its entries.
    async fn delete_raffle(&self, raffle_id: Uuid) -> Result<(), Error>;
}
