// File: tallybot-core/src/repositories/postgres/inventory.rs

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};
use tallybot_common::error::Error;
use tallybot_common::models::shop::{InventoryEntry, ShopItem};
use tallybot_common::traits::repository_traits::InventoryRepository;
use uuid::Uuid;

pub struct PostgresInventoryRepository {
    pub pool: Pool<Postgres>,
}

impl PostgresInventoryRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

/// Conditional decrement; deletes the row when it hits 0 so absence stays
/// equivalent to "owns none". Returns false when the holder has less than
/// `qty` (nothing applied).
async fn take_from<'e>(
    tx: &mut sqlx::Transaction<'e, Postgres>,
    user_id: &str,
    item_id: Uuid,
    qty: i64,
) -> Result<bool, Error> {
    let res = sqlx::query(
        r#"
        UPDATE inventory
        SET quantity = quantity - $3
        WHERE user_id = $1 AND item_id = $2 AND quantity >= $3
        "#,
    )
    .bind(user_id)
    .bind(item_id)
    .bind(qty)
    .execute(&mut **tx)
    .await?;

    if res.rows_affected() == 0 {
        return Ok(false);
    }

    sqlx::query("DELETE FROM inventory WHERE user_id = $1 AND item_id = $2 AND quantity = 0")
        .bind(user_id)
        .bind(item_id)
        .execute(&mut **tx)
        .await?;

    Ok(true)
}

async fn give_to<'e>(
    tx: &mut sqlx::Transaction<'e, Postgres>,
    user_id: &str,
    item_id: Uuid,
    qty: i64,
) -> Result<(), Error> {
    sqlx::query(
        r#"
        INSERT INTO inventory (user_id, item_id, quantity)
        VALUES ($1, $2, $3)
        ON CONFLICT (user_id, item_id)
        DO UPDATE SET quantity = inventory.quantity + EXCLUDED.quantity
        "#,
    )
    .bind(user_id)
    .bind(item_id)
    .bind(qty)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[async_trait]
impl InventoryRepository for PostgresInventoryRepository {
    async fn quantity_of(&self, user_id: &str, item_id: Uuid) -> Result<i64, Error> {
        let row_opt = sqlx::query(
            "SELECT quantity FROM inventory WHERE user_id = $1 AND item_id = $2",
        )
        .bind(user_id)
        .bind(item_id)
        .fetch_optional(&self.pool)
        .await?;

        match row_opt {
            Some(row) => Ok(row.try_get("quantity")?),
            None => Ok(0),
        }
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<InventoryEntry>, Error> {
        let rows = sqlx::query(
            r#"
            SELECT user_id, item_id, quantity
            FROM inventory
            WHERE user_id = $1
            ORDER BY item_id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut list = Vec::new();
        for row in rows {
            list.push(InventoryEntry {
                user_id: row.try_get("user_id")?,
                item_id: row.try_get("item_id")?,
                quantity: row.try_get("quantity")?,
            });
        }
        Ok(list)
    }

    async fn grant(&self, user_id: &str, item: &ShopItem, qty: i64) -> Result<(), Error> {
        let mut tx = self.pool.begin().await?;
        give_to(&mut tx, user_id, item.item_id, qty).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn consume(&self, user_id: &str, item: &ShopItem, qty: i64) -> Result<(), Error> {
        let mut tx = self.pool.begin().await?;

        if !take_from(&mut tx, user_id, item.item_id, qty).await? {
            let held = self.quantity_of(user_id, item.item_id).await?;
            return Err(Error::InsufficientQuantity {
                item: item.name.clone(),
                needed: qty,
                held,
            });
        }

        tx.commit().await?;
        Ok(())
    }

    async fn transfer_item(
        &self,
        from_id: &str,
        to_id: &str,
        item: &ShopItem,
        qty: i64,
    ) -> Result<(), Error> {
        let mut tx = self.pool.begin().await?;

        if !take_from(&mut tx, from_id, item.item_id, qty).await? {
            let held = self.quantity_of(from_id, item.item_id).await?;
            return Err(Error::InsufficientQuantity {
                item: item.name.clone(),
                needed: qty,
                held,
            });
        }

        give_to(&mut tx, to_id, item.item_id, qty).await?;

        tx.commit().await?;
        Ok(())
    }
}
