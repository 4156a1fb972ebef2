// File: tallybot-core/src/test_utils/memory.rs

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tallybot_common::error::Error;
use tallybot_common::models::account::Account;
use tallybot_common::models::blackjack::{BlackjackGame, GameStatus};
use tallybot_common::models::job::{Job, JobWithAssignees};
use tallybot_common::models::raffle::Raffle;
use tallybot_common::models::shop::{InventoryEntry, ShopItem};
use tallybot_common::traits::repository_traits::{
    BlackjackRepository, InventoryRepository, JobRepository, LedgerRepository, RaffleRepository,
    ShopRepository,
};
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    /// user_id -> (wallet, bank)
    accounts: BTreeMap<String, (i64, i64)>,
    items: Vec<ShopItem>,
    inventory: BTreeMap<(String, Uuid), i64>,
    jobs: Vec<Job>,
    assignments: Vec<(Uuid, String)>,
    games: Vec<BlackjackGame>,
    raffles: Vec<Raffle>,
    entries: BTreeMap<(Uuid, String), i64>,
}

impl Inner {
    fn account(&mut self, user_id: &str) -> &mut (i64, i64) {
        self.accounts.entry(user_id.to_string()).or_insert((0, 0))
    }

    fn credit_wallet(&mut self, user_id: &str, amount: i64) {
        self.account(user_id).0 += amount;
    }
}

/// One mutex over the whole store, so every trait method is atomic by
/// construction, matching the guarantee the Postgres implementations get
/// from transactions and conditional updates.
#[derive(Default)]
pub struct MemStore {
    inner: Mutex<Inner>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerRepository for MemStore {
    async fn get_or_create_account(&self, user_id: &str) -> Result<Account, Error> {
        let mut inner = self.inner.lock().unwrap();
        let (wallet, bank) = *inner.account(user_id);
        Ok(Account {
            user_id: user_id.to_string(),
            wallet,
            bank,
        })
    }

    async fn adjust_wallet(&self, user_id: &str, delta: i64) -> Result<Account, Error> {
        let mut inner = self.inner.lock().unwrap();
        let acct = inner.account(user_id);
        if acct.0 + delta < 0 {
            return Err(Error::InsufficientFunds {
                needed: -delta,
                available: acct.0,
            });
        }
        acct.0 += delta;
        Ok(Account {
            user_id: user_id.to_string(),
            wallet: acct.0,
            bank: acct.1,
        })
    }

    async fn adjust_bank(&self, user_id: &str, delta: i64) -> Result<Account, Error> {
        let mut inner = self.inner.lock().unwrap();
        let acct = inner.account(user_id);
        if acct.1 + delta < 0 {
            return Err(Error::InsufficientFunds {
                needed: -delta,
                available: acct.1,
            });
        }
        acct.1 += delta;
        Ok(Account {
            user_id: user_id.to_string(),
            wallet: acct.0,
            bank: acct.1,
        })
    }

    async fn move_wallet_to_bank(&self, user_id: &str, amount: i64) -> Result<Account, Error> {
        let mut inner = self.inner.lock().unwrap();
        let acct = inner.account(user_id);
        if acct.0 < amount {
            return Err(Error::InsufficientFunds {
                needed: amount,
                available: acct.0,
            });
        }
        acct.0 -= amount;
        acct.1 += amount;
        Ok(Account {
            user_id: user_id.to_string(),
            wallet: acct.0,
            bank: acct.1,
        })
    }

    async fn move_bank_to_wallet(&self, user_id: &str, amount: i64) -> Result<Account, Error> {
        let mut inner = self.inner.lock().unwrap();
        let acct = inner.account(user_id);
        if acct.1 < amount {
            return Err(Error::InsufficientFunds {
                needed: amount,
                available: acct.1,
            });
        }
        acct.1 -= amount;
        acct.0 += amount;
        Ok(Account {
            user_id: user_id.to_string(),
            wallet: acct.0,
            bank: acct.1,
        })
    }

    async fn transfer_wallet(&self, from_id: &str, to_id: &str, amount: i64) -> Result<(), Error> {
        let mut inner = self.inner.lock().unwrap();
        let from = inner.account(from_id);
        if from.0 < amount {
            return Err(Error::InsufficientFunds {
                needed: amount,
                available: from.0,
            });
        }
        from.0 -= amount;
        inner.credit_wallet(to_id, amount);
        Ok(())
    }

    async fn top_accounts(&self, limit: i64) -> Result<Vec<Account>, Error> {
        let inner = self.inner.lock().unwrap();
        let mut list: Vec<Account> = inner
            .accounts
            .iter()
            .map(|(user_id, &(wallet, bank))| Account {
                user_id: user_id.clone(),
                wallet,
                bank,
            })
            .collect();
        list.sort_by_key(|a| std::cmp::Reverse(a.total()));
        list.truncate(limit as usize);
        Ok(list)
    }
}

#[async_trait]
impl ShopRepository for MemStore {
    async fn create_item(&self, item: &ShopItem) -> Result<(), Error> {
        let mut inner = self.inner.lock().unwrap();
        if inner.items.iter().any(|i| i.name == item.name) {
            return Err(Error::DuplicateName(item.name.clone()));
        }
        inner.items.push(item.clone());
        Ok(())
    }

    async fn get_item_by_name(&self, name: &str) -> Result<Option<ShopItem>, Error> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.items.iter().find(|i| i.name == name).cloned())
    }

    async fn list_available(&self) -> Result<Vec<ShopItem>, Error> {
        let inner = self.inner.lock().unwrap();
        let mut list: Vec<ShopItem> =
            inner.items.iter().filter(|i| i.is_available).cloned().collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(list)
    }

    async fn remove_item(&self, name: &str) -> Result<bool, Error> {
        let mut inner = self.inner.lock().unwrap();
        let before = inner.items.len();
        inner.items.retain(|i| i.name != name);
        Ok(inner.items.len() != before)
    }

    async fn purchase_item(&self, user_id: &str, name: &str) -> Result<ShopItem, Error> {
        let mut inner = self.inner.lock().unwrap();

        let idx = inner
            .items
            .iter()
            .position(|i| i.name == name && i.is_available)
            .ok_or_else(|| Error::ItemNotFound(name.to_string()))?;
        if inner.items[idx].quantity <= 0 {
            return Err(Error::OutOfStock(name.to_string()));
        }
        let price = inner.items[idx].price;
        let item_id = inner.items[idx].item_id;

        let acct = inner.account(user_id);
        if acct.0 < price {
            return Err(Error::InsufficientFunds {
                needed: price,
                available: acct.0,
            });
        }
        acct.0 -= price;

        inner.items[idx].quantity -= 1;
        *inner
            .inventory
            .entry((user_id.to_string(), item_id))
            .or_insert(0) += 1;

        Ok(inner.items[idx].clone())
    }
}

#[async_trait]
impl InventoryRepository for MemStore {
    async fn quantity_of(&self, user_id: &str, item_id: Uuid) -> Result<i64, Error> {
        let inner = self.inner.lock().unwrap();
        Ok(*inner
            .inventory
            .get(&(user_id.to_string(), item_id))
            .unwrap_or(&0))
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<InventoryEntry>, Error> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .inventory
            .iter()
            .filter(|((user, _), _)| user == user_id)
            .map(|((user, item_id), &quantity)| InventoryEntry {
                user_id: user.clone(),
                item_id: *item_id,
                quantity,
            })
            .collect())
    }

    async fn grant(&self, user_id: &str, item: &ShopItem, qty: i64) -> Result<(), Error> {
        let mut inner = self.inner.lock().unwrap();
        *inner
            .inventory
            .entry((user_id.to_string(), item.item_id))
            .or_insert(0) += qty;
        Ok(())
    }

    async fn consume(&self, user_id: &str, item: &ShopItem, qty: i64) -> Result<(), Error> {
        let mut inner = self.inner.lock().unwrap();
        let key = (user_id.to_string(), item.item_id);
        let held = *inner.inventory.get(&key).unwrap_or(&0);
        if held < qty {
            return Err(Error::InsufficientQuantity {
                item: item.name.clone(),
                needed: qty,
                held,
            });
        }
        if held == qty {
            inner.inventory.remove(&key);
        } else {
            inner.inventory.insert(key, held - qty);
        }
        Ok(())
    }

    async fn transfer_item(
        &self,
        from_id: &str,
        to_id: &str,
        item: &ShopItem,
        qty: i64,
    ) -> Result<(), Error> {
        let mut inner = self.inner.lock().unwrap();
        let from_key = (from_id.to_string(), item.item_id);
        let held = *inner.inventory.get(&from_key).unwrap_or(&0);
        if held < qty {
            return Err(Error::InsufficientQuantity {
                item: item.name.clone(),
                needed: qty,
                held,
            });
        }
        if held == qty {
            inner.inventory.remove(&from_key);
        } else {
            inner.inventory.insert(from_key, held - qty);
        }
        *inner
            .inventory
            .entry((to_id.to_string(), item.item_id))
            .or_insert(0) += qty;
        Ok(())
    }
}

#[async_trait]
impl JobRepository for MemStore {
    async fn create_job(&self, job: &Job) -> Result<(), Error> {
        let mut inner = self.inner.lock().unwrap();
        inner.jobs.push(job.clone());
        Ok(())
    }

    async fn get_job(&self, job_id: Uuid) -> Result<Option<Job>, Error> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.jobs.iter().find(|j| j.job_id == job_id).cloned())
    }

    async fn all_jobs(&self) -> Result<Vec<Job>, Error> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.jobs.clone())
    }

    async fn list_jobs(&self) -> Result<Vec<JobWithAssignees>, Error> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .jobs
            .iter()
            .map(|job| JobWithAssignees {
                job: job.clone(),
                assignees: inner
                    .assignments
                    .iter()
                    .filter(|(id, _)| *id == job.job_id)
                    .map(|(_, user)| user.clone())
                    .collect(),
            })
            .collect())
    }

    async fn remove_job(&self, job_id: Uuid) -> Result<bool, Error> {
        let mut inner = self.inner.lock().unwrap();
        let before = inner.jobs.len();
        inner.jobs.retain(|j| j.job_id != job_id);
        inner.assignments.retain(|(id, _)| *id != job_id);
        Ok(inner.jobs.len() != before)
    }

    async fn jobs_unassigned_to(&self, user_id: &str) -> Result<Vec<Job>, Error> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .jobs
            .iter()
            .filter(|job| {
                !inner
                    .assignments
                    .iter()
                    .any(|(id, user)| *id == job.job_id && user == user_id)
            })
            .cloned()
            .collect())
    }

    async fn assign(&self, job_id: Uuid, user_id: &str) -> Result<(), Error> {
        let mut inner = self.inner.lock().unwrap();
        if inner
            .assignments
            .iter()
            .any(|(id, user)| *id == job_id && user == user_id)
        {
            return Err(Error::AlreadyAssigned);
        }
        inner.assignments.push((job_id, user_id.to_string()));
        Ok(())
    }

    async fn assign_sole(&self, job_id: Uuid, user_id: &str) -> Result<(), Error> {
        let mut inner = self.inner.lock().unwrap();
        if inner.assignments.iter().any(|(_, user)| user == user_id) {
            return Err(Error::AlreadyAssigned);
        }
        inner.assignments.push((job_id, user_id.to_string()));
        Ok(())
    }

    async fn user_assignment(&self, user_id: &str) -> Result<Option<Job>, Error> {
        let inner = self.inner.lock().unwrap();
        let job_id = inner
            .assignments
            .iter()
            .find(|(_, user)| user == user_id)
            .map(|(id, _)| *id);
        Ok(job_id.and_then(|id| inner.jobs.iter().find(|j| j.job_id == id).cloned()))
    }

    async fn complete(&self, job_id: Uuid, user_id: &str, reward: i64) -> Result<(), Error> {
        let mut inner = self.inner.lock().unwrap();
        let before = inner.assignments.len();
        inner
            .assignments
            .retain(|(id, user)| !(*id == job_id && user == user_id));
        if inner.assignments.len() == before {
            return Err(Error::NotAssigned);
        }
        if reward > 0 {
            inner.credit_wallet(user_id, reward);
        }
        Ok(())
    }
}

#[async_trait]
impl BlackjackRepository for MemStore {
    async fn create_game(&self, game: &BlackjackGame) -> Result<(), Error> {
        let mut inner = self.inner.lock().unwrap();

        let acct = inner.account(&game.user_id);
        if acct.0 < game.bet {
            return Err(Error::InsufficientFunds {
                needed: game.bet,
                available: acct.0,
            });
        }
        if inner
            .games
            .iter()
            .any(|g| g.user_id == game.user_id && g.status == GameStatus::InProgress)
        {
            return Err(Error::ActiveGameExists);
        }
        inner.account(&game.user_id).0 -= game.bet;
        inner.games.push(game.clone());
        Ok(())
    }

    async fn get_active_game(&self, user_id: &str) -> Result<Option<BlackjackGame>, Error> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .games
            .iter()
            .find(|g| g.user_id == user_id && g.status == GameStatus::InProgress)
            .cloned())
    }

    async fn update_game(&self, game: &BlackjackGame) -> Result<(), Error> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(stored) = inner.games.iter_mut().find(|g| g.game_id == game.game_id) {
            *stored = game.clone();
        }
        Ok(())
    }

    async fn settle_game(&self, game_id: Uuid, user_id: &str, payout: i64) -> Result<(), Error> {
        let mut inner = self.inner.lock().unwrap();
        inner.games.retain(|g| g.game_id != game_id);
        if payout > 0 {
            inner.credit_wallet(user_id, payout);
        }
        Ok(())
    }
}

#[async_trait]
impl RaffleRepository for MemStore {
    async fn create_raffle(&self, raffle: &Raffle) -> Result<(), Error> {
        let mut inner = self.inner.lock().unwrap();
        if inner.raffles.iter().any(|r| r.name == raffle.name) {
            return Err(Error::DuplicateName(raffle.name.clone()));
        }
        inner.raffles.push(raffle.clone());
        Ok(())
    }

    async fn get_raffle(&self, raffle_id: Uuid) -> Result<Option<Raffle>, Error> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.raffles.iter().find(|r| r.raffle_id == raffle_id).cloned())
    }

    async fn list_active(&self) -> Result<Vec<Raffle>, Error> {
        let inner = self.inner.lock().unwrap();
        let mut list = inner.raffles.clone();
        list.sort_by_key(|r| r.ends_at);
        Ok(list)
    }

    async fn due_raffles(&self, now: DateTime<Utc>) -> Result<Vec<Raffle>, Error> {
        let inner = self.inner.lock().unwrap();
        let mut list: Vec<Raffle> = inner
            .raffles
            .iter()
            .filter(|r| r.ends_at <= now)
            .cloned()
            .collect();
        list.sort_by_key(|r| r.ends_at);
        Ok(list)
    }

    async fn add_entry(&self, raffle_id: Uuid, user_id: &str, tickets: i64) -> Result<(), Error> {
        let mut inner = self.inner.lock().unwrap();
        *inner
            .entries
            .entry((raffle_id, user_id.to_string()))
            .or_insert(0) += tickets;
        Ok(())
    }

    async fn distinct_entrants(&self, raffle_id: Uuid) -> Result<Vec<String>, Error> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .entries
            .keys()
            .filter(|(id, _)| *id == raffle_id)
            .map(|(_, user)| user.clone())
            .collect())
    }

    async fn delete_raffle(&self, raffle_id: Uuid) -> Result<(), Error> {
        let mut inner = self.inner.lock().unwrap();
        inner.raffles.retain(|r| r.raffle_id != raffle_id);
        inner.entries.retain(|(id, _), _| *id != raffle_id);
        Ok(())
    }
}
