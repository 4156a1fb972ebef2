// File: tallybot-common/src/models/shop.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A purchasable catalog entry. `name` is the unique, case-sensitive
/// lookup key used by every user-facing command.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ShopItem {
    pub item_id: Uuid,
    pub name: String,
    pub description: String,
    pub price: i64,
    /// Remaining stock. Decremented by each purchase; an item at 0 is
    /// listed but not buyable.
    pub quantity: i64,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
}

/// One (user, item) inventory row. A row with quantity 0 is never kept;
/// the repository deletes it so "owns item" stays a simple existence check.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct InventoryEntry {
    pub user_id: String,
    pub item_id: Uuid,
    pub quantity: i64,
}
