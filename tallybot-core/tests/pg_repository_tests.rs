// Postgres-backed repository tests. These need a live database and are
// skipped unless TEST_DATABASE_URL is set, e.g.
//   TEST_DATABASE_URL=postgres://tally@localhost/tallybot_test cargo test
//
// One test function runs the scenarios in sequence: they share a schema
// and each starts by wiping it.

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use tallybot_common::traits::repository_traits::{JobRepository, LedgerRepository, ShopRepository};
use tallybot_core::repositories::{
    PostgresInventoryRepository, PostgresJobRepository, PostgresLedgerRepository,
    PostgresShopRepository,
};
use tallybot_core::rng::SeededSource;
use tallybot_core::services::economy_service::EconomyService;
use tallybot_core::services::job_service::{AssignmentMode, JobService};
use tallybot_core::services::shop_service::ShopService;
use tallybot_core::Error;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

async fn test_pool() -> Option<Pool<Postgres>> {
    let url = std::env::var("TEST_DATABASE_URL").ok()?;
    PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .ok()
}

async fn clean_database(pool: &Pool<Postgres>) -> Result<(), Error> {
    sqlx::query("DROP SCHEMA public CASCADE")
        .execute(pool)
        .await?;
    sqlx::query("CREATE SCHEMA public").execute(pool).await?;
    sqlx::migrate!("../migrations").run(pool).await?;
    Ok(())
}

#[tokio::test]
async fn postgres_repositories_enforce_the_ledger_invariants() -> anyhow::Result<()> {
    init_tracing();
    let Some(pool) = test_pool().await else {
        eprintln!("TEST_DATABASE_URL not set; skipping Postgres tests");
        return Ok(());
    };
    clean_database(&pool).await?;

    let ledger = Arc::new(PostgresLedgerRepository::new(pool.clone()));

    // Lazy init and conditional updates.
    let acct = ledger.get_or_create_account("alice").await?;
    assert_eq!((acct.wallet, acct.bank), (0, 0));

    ledger.adjust_wallet("alice", 500).await?;
    let err = ledger.adjust_wallet("alice", -501).await.unwrap_err();
    assert!(matches!(
        err,
        Error::InsufficientFunds { needed: 501, available: 500 }
    ));

    let acct = ledger.move_wallet_to_bank("alice", 200).await?;
    assert_eq!((acct.wallet, acct.bank), (300, 200));
    let acct = ledger.move_bank_to_wallet("alice", 200).await?;
    assert_eq!((acct.wallet, acct.bank), (500, 0));

    ledger.transfer_wallet("alice", "bob", 100).await?;
    assert_eq!(ledger.get_or_create_account("bob").await?.wallet, 100);
    assert!(matches!(
        ledger.transfer_wallet("alice", "bob", 401).await,
        Err(Error::InsufficientFunds { .. })
    ));

    // The purchase transaction debits, decrements stock, and credits
    // inventory together.
    let shop_repo = Arc::new(PostgresShopRepository::new(pool.clone()));
    let inventory = Arc::new(PostgresInventoryRepository::new(pool.clone()));
    let shop = ShopService::new(shop_repo.clone(), inventory);
    let sword = shop.add_shop_item("Sword", "pointy", 50, Some(3)).await?;

    let err = shop.add_shop_item("Sword", "again", 10, None).await.unwrap_err();
    assert!(matches!(err, Error::DuplicateName(_)));

    shop.purchase("alice", "Sword").await?;
    let acct = ledger.get_or_create_account("alice").await?;
    assert_eq!(acct.wallet, 350);
    assert_eq!(
        shop_repo.get_item_by_name("Sword").await?.unwrap().quantity,
        2
    );

    let err = shop.purchase("pauper", "Sword").await.unwrap_err();
    assert!(matches!(err, Error::InsufficientFunds { .. }));
    // A failed purchase applies nothing.
    assert_eq!(
        shop_repo.get_item_by_name("Sword").await?.unwrap().quantity,
        2
    );

    shop.transfer_item("alice", "bob", "Sword", 1).await?;
    assert!(shop.get_inventory("alice").await?.is_empty());
    assert_eq!(shop.get_inventory("bob").await?[0].item_id, sword.item_id);

    // Single-assignee jobs against the same schema.
    let repo = Arc::new(PostgresJobRepository::new(pool.clone()));
    let rng = Arc::new(SeededSource::new(5));
    let jobs = JobService::new(repo, rng.clone(), AssignmentMode::Single);
    let economy = EconomyService::new(
        Arc::new(PostgresLedgerRepository::new(pool.clone())),
        rng,
    );

    jobs.add_job("sweep the floors").await?;
    jobs.assign_job("worker").await?.unwrap();
    assert!(matches!(
        jobs.assign_job("worker").await,
        Err(Error::AlreadyAssigned)
    ));

    jobs.complete_user_job("worker", 60).await?;
    assert_eq!(economy.get_balances("worker").await?.wallet, 60);
    assert!(jobs.get_user_job("worker").await?.is_none());

    // Two racing sole assignments for one user, aimed at different jobs so
    // the (job_id, user_id) primary key stops neither: exactly one may land.
    let job_a = jobs.add_job("walk the dog").await?;
    let job_b = jobs.add_job("paint the fence").await?;
    let repo_a = Arc::new(PostgresJobRepository::new(pool.clone()));
    let repo_b = repo_a.clone();
    let a = tokio::spawn(async move { repo_a.assign_sole(job_a.job_id, "racer").await });
    let b = tokio::spawn(async move { repo_b.assign_sole(job_b.job_id, "racer").await });
    let (ra, rb) = (a.await?, b.await?);

    let wins = [&ra, &rb].iter().filter(|r| r.is_ok()).count();
    assert_eq!(wins, 1, "exactly one sole assignment may land");
    let failure = if ra.is_err() { ra } else { rb };
    assert!(matches!(failure, Err(Error::AlreadyAssigned)));
    assert!(jobs.get_user_job("racer").await?.is_some());

    Ok(())
}
