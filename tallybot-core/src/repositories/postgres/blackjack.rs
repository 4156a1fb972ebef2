// File: tallybot-core/src/repositories/postgres/blackjack.rs

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};
use tallybot_common::error::Error;
use tallybot_common::models::blackjack::{BlackjackGame, Card, GameStatus};
use tallybot_common::traits::repository_traits::BlackjackRepository;
use uuid::Uuid;

pub struct PostgresBlackjackRepository {
    pub pool: Pool<Postgres>,
}

impl PostgresBlackjackRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn game_from_row(row: &sqlx::postgres::PgRow) -> Result<BlackjackGame, Error> {
    let player_hand: serde_json::Value = row.try_get("player_hand")?;
    let dealer_hand: serde_json::Value = row.try_get("dealer_hand")?;
    let status: String = row.try_get("status")?;

    Ok(BlackjackGame {
        game_id: row.try_get("game_id")?,
        user_id: row.try_get("user_id")?,
        bet: row.try_get("bet")?,
        player_hand: serde_json::from_value::<Vec<Card>>(player_hand)?,
        dealer_hand: serde_json::from_value::<Vec<Card>>(dealer_hand)?,
        status: GameStatus::parse(&status)
            .ok_or_else(|| Error::Parse(format!("unknown game status '{status}'")))?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl BlackjackRepository for PostgresBlackjackRepository {
    async fn create_game(&self, game: &BlackjackGame) -> Result<(), Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO accounts (user_id, wallet, bank)
            VALUES ($1, 0, 0)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(&game.user_id)
        .execute(&mut *tx)
        .await?;

        // Escrow: the bet leaves the wallet in the same transaction that
        // stores the game.
        let debited = sqlx::query(
            r#"
            UPDATE accounts
            SET wallet = wallet - $2
            WHERE user_id = $1 AND wallet >= $2
            "#,
        )
        .bind(&game.user_id)
        .bind(game.bet)
        .execute(&mut *tx)
        .await?;

        if debited.rows_affected() == 0 {
            let wallet: i64 =
                sqlx::query("SELECT wallet FROM accounts WHERE user_id = $1")
                    .bind(&game.user_id)
                    .fetch_one(&mut *tx)
                    .await?
                    .try_get("wallet")?;
            return Err(Error::InsufficientFunds {
                needed: game.bet,
                available: wallet,
            });
        }

        let inserted = sqlx::query(
            r#"
            INSERT INTO blackjack_games
                (game_id, user_id, bet, player_hand, dealer_hand, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(game.game_id)
        .bind(&game.user_id)
        .bind(game.bet)
        .bind(serde_json::to_value(&game.player_hand)?)
        .bind(serde_json::to_value(&game.dealer_hand)?)
        .bind(game.status.as_str())
        .bind(game.created_at)
        .execute(&mut *tx)
        .await;

        match inserted {
            Ok(_) => {}
            // The partial unique index on (user_id) WHERE in_progress
            // catches a second open game; the escrow debit rolls back.
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                return Err(Error::ActiveGameExists);
            }
            Err(e) => return Err(e.into()),
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get_active_game(&self, user_id: &str) -> Result<Option<BlackjackGame>, Error> {
        let row_opt = sqlx::query(
            r#"
            SELECT game_id, user_id, bet, player_hand, dealer_hand, status, created_at
            FROM blackjack_games
            WHERE user_id = $1 AND status = 'in_progress'
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        match row_opt {
            Some(row) => Ok(Some(game_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn update_game(&self, game: &BlackjackGame) -> Result<(), Error> {
        sqlx::query(
            r#"
            UPDATE blackjack_games
            SET player_hand = $1, dealer_hand = $2, status = $3
            WHERE game_id = $4
            "#,
        )
        .bind(serde_json::to_value(&game.player_hand)?)
        .bind(serde_json::to_value(&game.dealer_hand)?)
        .bind(game.status.as_str())
        .bind(game.game_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn settle_game(&self, game_id: Uuid, user_id: &str, payout: i64) -> Result<(), Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM blackjack_games WHERE game_id = $1")
            .bind(game_id)
            .execute(&mut *tx)
            .await?;

        if payout > 0 {
            sqlx::query(
                r#"
                INSERT INTO accounts (user_id, wallet, bank)
                VALUES ($1, $2, 0)
                ON CONFLICT (user_id)
                DO UPDATE SET wallet = accounts.wallet + EXCLUDED.wallet
                "#,
            )
            .bind(user_id)
            .bind(payout)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
