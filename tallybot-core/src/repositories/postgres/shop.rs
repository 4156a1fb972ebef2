// File: tallybot-core/src/repositories/postgres/shop.rs

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};
use tallybot_common::error::Error;
use tallybot_common::models::shop::ShopItem;
use tallybot_common::traits::repository_traits::ShopRepository;

pub struct PostgresShopRepository {
    pub pool: Pool<Postgres>,
}

impl PostgresShopRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn item_from_row(row: &sqlx::postgres::PgRow) -> Result<ShopItem, Error> {
    Ok(ShopItem {
        item_id: row.try_get("item_id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        price: row.try_get("price")?,
        quantity: row.try_get("quantity")?,
        is_available: row.try_get("is_available")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl ShopRepository for PostgresShopRepository {
    async fn create_item(&self, item: &ShopItem) -> Result<(), Error> {
        let res = sqlx::query(
            r#"
            INSERT INTO shop_items (item_id, name, description, price, quantity, is_available, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(item.item_id)
        .bind(&item.name)
        .bind(&item.description)
        .bind(item.price)
        .bind(item.quantity)
        .bind(item.is_available)
        .bind(item.created_at)
        .execute(&self.pool)
        .await;

        match res {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(Error::DuplicateName(item.name.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get_item_by_name(&self, name: &str) -> Result<Option<ShopItem>, Error> {
        let row_opt = sqlx::query(
            r#"
            SELECT item_id, name, description, price, quantity, is_available, created_at
            FROM shop_items
            WHERE name = $1
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        match row_opt {
            Some(row) => Ok(Some(item_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn list_available(&self) -> Result<Vec<ShopItem>, Error> {
        let rows = sqlx::query(
            r#"
            SELECT item_id, name, description, price, quantity, is_available, created_at
            FROM shop_items
            WHERE is_available
            ORDER BY name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut list = Vec::new();
        for row in rows {
            list.push(item_from_row(&row)?);
        }
        Ok(list)
    }

    async fn remove_item(&self, name: &str) -> Result<bool, Error> {
        let res = sqlx::query("DELETE FROM shop_items WHERE name = $1")
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn purchase_item(&self, user_id: &str, name: &str) -> Result<ShopItem, Error> {
        let mut tx = self.pool.begin().await?;

        // Lock the item row for the stock check + decrement.
        let row_opt = sqlx::query(
            r#"
            SELECT item_id, name, description, price, quantity, is_available, created_at
            FROM shop_items
            WHERE name = $1
            FOR UPDATE
            "#,
        )
        .bind(name)
        .fetch_optional(&mut *tx)
        .await?;

        let mut item = match row_opt {
            Some(row) => item_from_row(&row)?,
            None => return Err(Error::ItemNotFound(name.to_string())),
        };
        if !item.is_available {
            return Err(Error::ItemNotFound(name.to_string()));
        }
        if item.quantity <= 0 {
            return Err(Error::OutOfStock(name.to_string()));
        }

        sqlx::query(
            r#"
            INSERT INTO accounts (user_id, wallet, bank)
            VALUES ($1, 0, 0)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        let debited = sqlx::query(
            r#"
            UPDATE accounts
            SET wallet = wallet - $2
            WHERE user_id = $1 AND wallet >= $2
            "#,
        )
        .bind(user_id)
        .bind(item.price)
        .execute(&mut *tx)
        .await?;

        if debited.rows_affected() == 0 {
            let wallet: i64 =
                sqlx::query("SELECT wallet FROM accounts WHERE user_id = $1")
                    .bind(user_id)
                    .fetch_one(&mut *tx)
                    .await?
                    .try_get("wallet")?;
            return Err(Error::InsufficientFunds {
                needed: item.price,
                available: wallet,
            });
        }

        sqlx::query("UPDATE shop_items SET quantity = quantity - 1 WHERE item_id = $1")
            .bind(item.item_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO inventory (user_id, item_id, quantity)
            VALUES ($1, $2, 1)
            ON CONFLICT (user_id, item_id)
            DO UPDATE SET quantity = inventory.quantity + 1
            "#,
        )
        .bind(user_id)
        .bind(item.item_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        item.quantity -= 1;
        Ok(item)
    }
}
