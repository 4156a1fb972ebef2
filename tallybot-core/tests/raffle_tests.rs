use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tallybot_common::models::account::Account;
use tallybot_common::models::raffle::{Prize, Raffle};
use tallybot_common::traits::repository_traits::{LedgerRepository, RaffleRepository};
use tallybot_core::rng::SeededSource;
use tallybot_core::services::economy_service::EconomyService;
use tallybot_core::services::raffle_service::RaffleService;
use tallybot_core::services::shop_service::ShopService;
use tallybot_core::test_utils::MemStore;
use tallybot_core::Error;
use uuid::Uuid;

struct Fixture {
    store: Arc<MemStore>,
    raffles: RaffleService,
    shop: ShopService,
    economy: EconomyService,
}

fn setup() -> Fixture {
    let store = Arc::new(MemStore::new());
    let rng = Arc::new(SeededSource::new(11));
    Fixture {
        raffles: RaffleService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            rng.clone(),
        ),
        shop: ShopService::new(store.clone(), store.clone()),
        economy: EconomyService::new(store.clone(), rng),
        store,
    }
}

#[tokio::test]
async fn numeric_prizes_become_currency_at_creation() -> anyhow::Result<()> {
    let fx = setup();
    let raffle = fx
        .raffles
        .create_raffle("weekly", "#general", "500", 1, 3600, 0)
        .await?;
    assert_eq!(raffle.prize, Prize::Currency(500));
    Ok(())
}

#[tokio::test]
async fn item_prizes_must_exist_in_the_shop() -> anyhow::Result<()> {
    let fx = setup();

    let err = fx
        .raffles
        .create_raffle("weekly", "#general", "Phantom Sword", 1, 3600, 0)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidPrize(_)));

    fx.shop.add_shop_item("Sword", "pointy", 50, Some(5)).await?;
    let raffle = fx
        .raffles
        .create_raffle("weekly", "#general", "Sword", 1, 3600, 0)
        .await?;
    assert_eq!(raffle.prize, Prize::Item("Sword".to_string()));
    Ok(())
}

#[tokio::test]
async fn creation_validates_counts_and_duration() -> anyhow::Result<()> {
    let fx = setup();
    assert!(matches!(
        fx.raffles.create_raffle("r", "#c", "100", 0, 3600, 0).await,
        Err(Error::Parse(_))
    ));
    assert!(matches!(
        fx.raffles.create_raffle("r", "#c", "100", 1, 0, 0).await,
        Err(Error::Parse(_))
    ));
    assert!(matches!(
        fx.raffles.create_raffle("r", "#c", "100", 1, 3600, -1).await,
        Err(Error::Parse(_))
    ));
    Ok(())
}

#[tokio::test]
async fn duplicate_active_names_are_rejected() -> anyhow::Result<()> {
    let fx = setup();
    fx.raffles.create_raffle("weekly", "#c", "100", 1, 3600, 0).await?;
    let err = fx
        .raffles
        .create_raffle("weekly", "#c", "200", 1, 3600, 0)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::DuplicateName(_)));
    Ok(())
}

#[tokio::test]
async fn conclusion_picks_exactly_the_requested_distinct_winners() -> anyhow::Result<()> {
    let fx = setup();
    let raffle = fx
        .raffles
        .create_raffle("weekly", "#c", "100", 2, 3600, 0)
        .await?;
    for user in ["alice", "bob", "carol"] {
        fx.raffles.enter(raffle.raffle_id, user, 1).await?;
    }

    let report = fx.raffles.conclude(raffle.raffle_id).await?;
    assert_eq!(report.winners.len(), 2);
    let unique: HashSet<_> = report.winners.iter().collect();
    assert_eq!(unique.len(), 2, "winners must be distinct");
    for winner in &report.winners {
        assert!(["alice", "bob", "carol"].contains(&winner.as_str()));
        // Full amount per winner, not split.
        assert_eq!(fx.economy.get_balances(winner).await?.wallet, 100);
    }

    // Raffle and entries are gone.
    assert!(fx.raffles.list_active().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn more_winner_slots_than_entrants_awards_everyone_once() -> anyhow::Result<()> {
    let fx = setup();
    let raffle = fx
        .raffles
        .create_raffle("weekly", "#c", "100", 5, 3600, 0)
        .await?;
    fx.raffles.enter(raffle.raffle_id, "alice", 1).await?;
    // Entering again only adds tickets; the draw stays per-entrant.
    fx.raffles.enter(raffle.raffle_id, "alice", 3).await?;

    let report = fx.raffles.conclude(raffle.raffle_id).await?;
    assert_eq!(report.winners, vec!["alice".to_string()]);
    assert_eq!(fx.economy.get_balances("alice").await?.wallet, 100);
    Ok(())
}

#[tokio::test]
async fn zero_entrants_concludes_quietly() -> anyhow::Result<()> {
    let fx = setup();
    let raffle = fx
        .raffles
        .create_raffle("weekly", "#c", "100", 2, 3600, 0)
        .await?;

    let report = fx.raffles.conclude(raffle.raffle_id).await?;
    assert!(report.winners.is_empty());
    assert!(fx.raffles.list_active().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn item_prizes_land_in_the_winner_inventory() -> anyhow::Result<()> {
    let fx = setup();
    fx.shop.add_shop_item("Sword", "pointy", 50, Some(5)).await?;
    let raffle = fx
        .raffles
        .create_raffle("weekly", "#c", "Sword", 1, 3600, 0)
        .await?;
    fx.raffles.enter(raffle.raffle_id, "alice", 1).await?;

    fx.raffles.conclude(raffle.raffle_id).await?;
    let inv = fx.shop.get_inventory("alice").await?;
    assert_eq!(inv.len(), 1);
    assert_eq!(inv[0].quantity, 1);
    Ok(())
}

#[tokio::test]
async fn repeats_chain_with_a_decremented_count() -> anyhow::Result<()> {
    let fx = setup();
    let raffle = fx
        .raffles
        .create_raffle("weekly", "#c", "100", 1, 3600, 2)
        .await?;

    let report = fx.raffles.conclude(raffle.raffle_id).await?;
    let next_id = report.next_raffle.expect("a successor was scheduled");

    let active = fx.raffles.list_active().await?;
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].raffle_id, next_id);
    assert_eq!(active[0].name, "weekly");
    assert_eq!(active[0].repeat_count, 1);

    let report = fx.raffles.conclude(next_id).await?;
    let last_id = report.next_raffle.expect("one repeat left");
    let report = fx.raffles.conclude(last_id).await?;
    assert!(report.next_raffle.is_none());
    assert!(fx.raffles.list_active().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn entering_an_unknown_raffle_fails() -> anyhow::Result<()> {
    let fx = setup();
    let err = fx.raffles.enter(Uuid::new_v4(), "alice", 1).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    Ok(())
}

#[tokio::test]
async fn the_poll_concludes_only_what_is_due() -> anyhow::Result<()> {
    let fx = setup();
    // A raffle already past its end, stored directly as the poll would
    // find it after a restart.
    let overdue = Raffle {
        raffle_id: Uuid::new_v4(),
        name: "overdue".to_string(),
        channel_ref: "#c".to_string(),
        prize: Prize::Currency(100),
        winners_count: 1,
        repeat_count: 0,
        duration_secs: 60,
        ends_at: Utc::now() - Duration::seconds(5),
        created_at: Utc::now() - Duration::seconds(65),
    };
    fx.store.create_raffle(&overdue).await?;
    fx.store.add_entry(overdue.raffle_id, "alice", 1).await?;

    // And one still running.
    fx.raffles.create_raffle("later", "#c", "100", 1, 3600, 0).await?;

    let reports = fx.raffles.conclude_due().await?;
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].raffle_name, "overdue");
    assert_eq!(reports[0].winners, vec!["alice".to_string()]);

    let remaining = fx.raffles.list_active().await?;
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].name, "later");
    Ok(())
}

/// Ledger that errors when crediting one chosen user, standing in for a
/// storage failure partway through prize distribution.
struct FailingLedger {
    inner: Arc<MemStore>,
    fail_for: &'static str,
}

#[async_trait]
impl LedgerRepository for FailingLedger {
    async fn get_or_create_account(&self, user_id: &str) -> Result<Account, Error> {
        self.inner.get_or_create_account(user_id).await
    }

    async fn adjust_wallet(&self, user_id: &str, delta: i64) -> Result<Account, Error> {
        if user_id == self.fail_for {
            return Err(Error::Database(sqlx::Error::PoolTimedOut));
        }
        self.inner.adjust_wallet(user_id, delta).await
    }

    async fn adjust_bank(&self, user_id: &str, delta: i64) -> Result<Account, Error> {
        self.inner.adjust_bank(user_id, delta).await
    }

    async fn move_wallet_to_bank(&self, user_id: &str, amount: i64) -> Result<Account, Error> {
        self.inner.move_wallet_to_bank(user_id, amount).await
    }

    async fn move_bank_to_wallet(&self, user_id: &str, amount: i64) -> Result<Account, Error> {
        self.inner.move_bank_to_wallet(user_id, amount).await
    }

    async fn transfer_wallet(&self, from_id: &str, to_id: &str, amount: i64) -> Result<(), Error> {
        self.inner.transfer_wallet(from_id, to_id, amount).await
    }

    async fn top_accounts(&self, limit: i64) -> Result<Vec<Account>, Error> {
        self.inner.top_accounts(limit).await
    }
}

#[tokio::test]
async fn a_failed_distribution_never_pays_a_winner_twice() -> anyhow::Result<()> {
    let store = Arc::new(MemStore::new());
    let rng = Arc::new(SeededSource::new(11));
    let ledger = Arc::new(FailingLedger {
        inner: store.clone(),
        fail_for: "bob",
    });
    let raffles = RaffleService::new(
        store.clone(),
        store.clone(),
        ledger,
        store.clone(),
        rng,
    );

    let raffle = raffles.create_raffle("weekly", "#c", "100", 2, 3600, 0).await?;
    raffles.enter(raffle.raffle_id, "alice", 1).await?;
    raffles.enter(raffle.raffle_id, "bob", 1).await?;

    // Both entrants win; paying bob fails mid-distribution.
    assert!(raffles.conclude(raffle.raffle_id).await.is_err());

    // The raffle was deleted before any payout, so the poll finds nothing
    // to redo and whoever was paid stays paid exactly once.
    assert!(raffles.list_active().await?.is_empty());
    let alice_after_failure = store.get_or_create_account("alice").await?.wallet;
    assert!(raffles.conclude_due().await?.is_empty());
    assert_eq!(
        store.get_or_create_account("alice").await?.wallet,
        alice_after_failure
    );
    Ok(())
}
