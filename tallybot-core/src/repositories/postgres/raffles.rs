// File: tallybot-core/src/repositories/postgres/raffles.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Row};
use tallybot_common::error::Error;
use tallybot_common::models::raffle::{Prize, Raffle};
use tallybot_common::traits::repository_traits::RaffleRepository;
use uuid::Uuid;

pub struct PostgresRaffleRepository {
    pub pool: Pool<Postgres>,
}

impl PostgresRaffleRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn raffle_from_row(row: &sqlx::postgres::PgRow) -> Result<Raffle, Error> {
    let kind: String = row.try_get("prize_kind")?;
    let prize = match kind.as_str() {
        "currency" => {
            let amount: Option<i64> = row.try_get("prize_amount")?;
            Prize::Currency(
                amount.ok_or_else(|| Error::Parse("currency prize without amount".to_string()))?,
            )
        }
        "item" => {
            let name: Option<String> = row.try_get("prize_item")?;
            Prize::Item(
                name.ok_or_else(|| Error::Parse("item prize without name".to_string()))?,
            )
        }
        other => return Err(Error::Parse(format!("unknown prize kind '{other}'"))),
    };

    Ok(Raffle {
        raffle_id: row.try_get("raffle_id")?,
        name: row.try_get("name")?,
        channel_ref: row.try_get("channel_ref")?,
        prize,
        winners_count: row.try_get("winners_count")?,
        repeat_count: row.try_get("repeat_count")?,
        duration_secs: row.try_get("duration_secs")?,
        ends_at: row.try_get("ends_at")?,
        created_at: row.try_get("created_at")?,
    })
}

const RAFFLE_COLUMNS: &str = "raffle_id, name, channel_ref, prize_kind, prize_amount, prize_item, \
                              winners_count, repeat_count, duration_secs, ends_at, created_at";

#[async_trait]
impl RaffleRepository for PostgresRaffleRepository {
    async fn create_raffle(&self, raffle: &Raffle) -> Result<(), Error> {
        let (kind, amount, item) = match &raffle.prize {
            Prize::Currency(amount) => ("currency", Some(*amount), None),
            Prize::Item(name) => ("item", None, Some(name.as_str())),
        };

        let res = sqlx::query(
            r#"
            INSERT INTO raffles
                (raffle_id, name, channel_ref, prize_kind, prize_amount, prize_item,
                 winners_count, repeat_count, duration_secs, ends_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(raffle.raffle_id)
        .bind(&raffle.name)
        .bind(&raffle.channel_ref)
        .bind(kind)
        .bind(amount)
        .bind(item)
        .bind(raffle.winners_count)
        .bind(raffle.repeat_count)
        .bind(raffle.duration_secs)
        .bind(raffle.ends_at)
        .bind(raffle.created_at)
        .execute(&self.pool)
        .await;

        match res {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(Error::DuplicateName(raffle.name.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get_raffle(&self, raffle_id: Uuid) -> Result<Option<Raffle>, Error> {
        let row_opt = sqlx::query(&format!(
            "SELECT {RAFFLE_COLUMNS} FROM raffles WHERE raffle_id = $1"
        ))
        .bind(raffle_id)
        .fetch_optional(&self.pool)
        .await?;

        match row_opt {
            Some(row) => Ok(Some(raffle_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn list_active(&self) -> Result<Vec<Raffle>, Error> {
        let rows = sqlx::query(&format!(
            "SELECT {RAFFLE_COLUMNS} FROM raffles ORDER BY ends_at ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        let mut list = Vec::new();
        for row in rows {
            list.push(raffle_from_row(&row)?);
        }
        Ok(list)
    }

    async fn due_raffles(&self, now: DateTime<Utc>) -> Result<Vec<Raffle>, Error> {
        let rows = sqlx::query(&format!(
            "SELECT {RAFFLE_COLUMNS} FROM raffles WHERE ends_at <= $1 ORDER BY ends_at ASC"
        ))
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        let mut list = Vec::new();
        for row in rows {
            list.push(raffle_from_row(&row)?);
        }
        Ok(list)
    }

    async fn add_entry(&self, raffle_id: Uuid, user_id: &str, tickets: i64) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO raffle_entries (raffle_id, user_id, ticket_count)
            VALUES ($1, $2, $3)
            ON CONFLICT (raffle_id, user_id)
            DO UPDATE SET ticket_count = raffle_entries.ticket_count + EXCLUDED.ticket_count
            "#,
        )
        .bind(raffle_id)
        .bind(user_id)
        .bind(tickets)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn distinct_entrants(&self, raffle_id: Uuid) -> Result<Vec<String>, Error> {
        let rows = sqlx::query(
            "SELECT user_id FROM raffle_entries WHERE raffle_id = $1 ORDER BY user_id ASC",
        )
        .bind(raffle_id)
        .fetch_all(&self.pool)
        .await?;

        let mut list = Vec::new();
        for row in rows {
            list.push(row.try_get("user_id")?);
        }
        Ok(list)
    }

    async fn delete_raffle(&self, raffle_id: Uuid) -> Result<(), Error> {
        // Entries cascade.
        sqlx::query("DELETE FROM raffles WHERE raffle_id = $1")
            .bind(raffle_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
