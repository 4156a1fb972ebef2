// File: tallybot-core/src/repositories/postgres/ledger.rs

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};
use tallybot_common::error::Error;
use tallybot_common::models::account::Account;
use tallybot_common::traits::repository_traits::LedgerRepository;

pub struct PostgresLedgerRepository {
    pub pool: Pool<Postgres>,
}

impl PostgresLedgerRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

/// Inserts the zero-balance row if the user has never been seen.
async fn ensure_account<'e, E>(executor: E, user_id: &str) -> Result<(), Error>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    sqlx::query(
        r#"
        INSERT INTO accounts (user_id, wallet, bank)
        VALUES ($1, 0, 0)
        ON CONFLICT (user_id) DO NOTHING
        "#,
    )
    .bind(user_id)
    .execute(executor)
    .await?;
    Ok(())
}

async fn fetch_account<'e, E>(executor: E, user_id: &str) -> Result<Account, Error>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    let row = sqlx::query(
        "SELECT user_id, wallet, bank FROM accounts WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_one(executor)
    .await?;

    Ok(Account {
        user_id: row.try_get("user_id")?,
        wallet: row.try_get("wallet")?,
        bank: row.try_get("bank")?,
    })
}

#[async_trait]
impl LedgerRepository for PostgresLedgerRepository {
    async fn get_or_create_account(&self, user_id: &str) -> Result<Account, Error> {
        ensure_account(&self.pool, user_id).await?;
        fetch_account(&self.pool, user_id).await
    }

    async fn adjust_wallet(&self, user_id: &str, delta: i64) -> Result<Account, Error> {
        ensure_account(&self.pool, user_id).await?;

        // The guard in the WHERE clause makes the sufficiency check and
        // the mutation one atomic statement.
        let row_opt = sqlx::query(
            r#"
            UPDATE accounts
            SET wallet = wallet + $2
            WHERE user_id = $1 AND wallet + $2 >= 0
            RETURNING user_id, wallet, bank
            "#,
        )
        .bind(user_id)
        .bind(delta)
        .fetch_optional(&self.pool)
        .await?;

        match row_opt {
            Some(row) => Ok(Account {
                user_id: row.try_get("user_id")?,
                wallet: row.try_get("wallet")?,
                bank: row.try_get("bank")?,
            }),
            None => {
                let acct = fetch_account(&self.pool, user_id).await?;
                Err(Error::InsufficientFunds {
                    needed: -delta,
                    available: acct.wallet,
                })
            }
        }
    }

    async fn adjust_bank(&self, user_id: &str, delta: i64) -> Result<Account, Error> {
        ensure_account(&self.pool, user_id).await?;

        let row_opt = sqlx::query(
            r#"
            UPDATE accounts
            SET bank = bank + $2
            WHERE user_id = $1 AND bank + $2 >= 0
            RETURNING user_id, wallet, bank
            "#,
        )
        .bind(user_id)
        .bind(delta)
        .fetch_optional(&self.pool)
        .await?;

        match row_opt {
            Some(row) => Ok(Account {
                user_id: row.try_get("user_id")?,
                wallet: row.try_get("wallet")?,
                bank: row.try_get("bank")?,
            }),
            None => {
                let acct = fetch_account(&self.pool, user_id).await?;
                Err(Error::InsufficientFunds {
                    needed: -delta,
                    available: acct.bank,
                })
            }
        }
    }

    async fn move_wallet_to_bank(&self, user_id: &str, amount: i64) -> Result<Account, Error> {
        ensure_account(&self.pool, user_id).await?;

        let row_opt = sqlx::query(
            r#"
            UPDATE accounts
            SET wallet = wallet - $2, bank = bank + $2
            WHERE user_id = $1 AND wallet >= $2
            RETURNING user_id, wallet, bank
            "#,
        )
        .bind(user_id)
        .bind(amount)
        .fetch_optional(&self.pool)
        .await?;

        match row_opt {
            Some(row) => Ok(Account {
                user_id: row.try_get("user_id")?,
                wallet: row.try_get("wallet")?,
                bank: row.try_get("bank")?,
            }),
            None => {
                let acct = fetch_account(&self.pool, user_id).await?;
                Err(Error::InsufficientFunds {
                    needed: amount,
                    available: acct.wallet,
                })
            }
        }
    }

    async fn move_bank_to_wallet(&self, user_id: &str, amount: i64) -> Result<Account, Error> {
        ensure_account(&self.pool, user_id).await?;

        let row_opt = sqlx::query(
            r#"
            UPDATE accounts
            SET bank = bank - $2, wallet = wallet + $2
            WHERE user_id = $1 AND bank >= $2
            RETURNING user_id, wallet, bank
            "#,
        )
        .bind(user_id)
        .bind(amount)
        .fetch_optional(&self.pool)
        .await?;

        match row_opt {
            Some(row) => Ok(Account {
                user_id: row.try_get("user_id")?,
                wallet: row.try_get("wallet")?,
                bank: row.try_get("bank")?,
            }),
            None => {
                let acct = fetch_account(&self.pool, user_id).await?;
                Err(Error::InsufficientFunds {
                    needed: amount,
                    available: acct.bank,
                })
            }
        }
    }

    async fn transfer_wallet(&self, from_id: &str, to_id: &str, amount: i64) -> Result<(), Error> {
        let mut tx = self.pool.begin().await?;

        ensure_account(&mut *tx, from_id).await?;
        ensure_account(&mut *tx, to_id).await?;

        let debited = sqlx::query(
            r#"
            UPDATE accounts
            SET wallet = wallet - $2
            WHERE user_id = $1 AND wallet >= $2
            "#,
        )
        .bind(from_id)
        .bind(amount)
        .execute(&mut *tx)
        .await?;

        if debited.rows_affected() == 0 {
            let acct = fetch_account(&mut *tx, from_id).await?;
            return Err(Error::InsufficientFunds {
                needed: amount,
                available: acct.wallet,
            });
        }

        sqlx::query("UPDATE accounts SET wallet = wallet + $2 WHERE user_id = $1")
            .bind(to_id)
            .bind(amount)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn top_accounts(&self, limit: i64) -> Result<Vec<Account>, Error> {
        let rows = sqlx::query(
            r#"
            SELECT user_id, wallet, bank
            FROM accounts
            ORDER BY wallet + bank DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let mut list = Vec::new();
        for row in rows {
            list.push(Account {
                user_id: row.try_get("user_id")?,
                wallet: row.try_get("wallet")?,
                bank: row.try_get("bank")?,
            });
        }
        Ok(list)
    }
}
