// File: tallybot-core/src/services/shop_service.rs

use std::sync::Arc;

use chrono::Utc;
use tallybot_common::error::Error;
use tallybot_common::models::shop::{InventoryEntry, ShopItem};
use tallybot_common::traits::repository_traits::{InventoryRepository, ShopRepository};
use tracing::info;
use uuid::Uuid;

/// Catalog CRUD, purchases, gifting, and redemption. The three-part
/// purchase update (wallet debit, stock decrement, inventory credit) is a
/// single repository transaction; this layer only validates and composes.
pub struct ShopService {
    shop: Arc<dyn ShopRepository>,
    inventory: Arc<dyn InventoryRepository>,
}

impl ShopService {
    pub fn new(shop: Arc<dyn ShopRepository>, inventory: Arc<dyn InventoryRepository>) -> Self {
        Self { shop, inventory }
    }

    pub async fn add_shop_item(
        &self,
        name: &str,
        description: &str,
        price: i64,
        quantity: Option<i64>,
    ) -> Result<ShopItem, Error> {
        if price <= 0 {
            return Err(Error::Parse("price must be positive".to_string()));
        }
        let quantity = quantity.unwrap_or(1);
        if quantity < 1 {
            return Err(Error::Parse("quantity must be at least 1".to_string()));
        }

        let item = ShopItem {
            item_id: Uuid::new_v4(),
            name: name.to_string(),
            description: description.to_string(),
            price,
            quantity,
            is_available: true,
            created_at: Utc::now(),
        };
        self.shop.create_item(&item).await?;
        info!("added shop item '{}' at price {}", item.name, item.price);
        Ok(item)
    }

    /// Returns false when no such item existed, so the caller can reply
    /// with a notice rather than an error.
    pub async fn remove_shop_item(&self, name: &str) -> Result<bool, Error> {
        self.shop.remove_item(name).await
    }

    pub async fn get_shop_item_by_name(&self, name: &str) -> Result<Option<ShopItem>, Error> {
        self.shop.get_item_by_name(name).await
    }

    /// Available items only.
    pub async fn get_shop_items(&self) -> Result<Vec<ShopItem>, Error> {
        self.shop.list_available().await
    }

    /// The buy command. Returns the item as it looks after the purchase
    /// (stock already decremented).
    pub async fn purchase(&self, user_id: &str, item_name: &str) -> Result<ShopItem, Error> {
        let item = self.shop.purchase_item(user_id, item_name).await?;
        info!("{} bought '{}' for {}", user_id, item.name, item.price);
        Ok(item)
    }

    /// Gift: moves `qty` units of an item from one inventory to another.
    pub async fn transfer_item(
        &self,
        from_id: &str,
        to_id: &str,
        item_name: &str,
        qty: i64,
    ) -> Result<(), Error> {
        if qty <= 0 {
            return Err(Error::Parse("quantity must be positive".to_string()));
        }
        let item = self
            .shop
            .get_item_by_name(item_name)
            .await?
            .ok_or_else(|| Error::ItemNotFound(item_name.to_string()))?;

        self.inventory.transfer_item(from_id, to_id, &item, qty).await
    }

    /// Consumes one unit from the caller's own inventory, with no
    /// compensating credit anywhere.
    pub async fn redeem_item(&self, user_id: &str, item_name: &str) -> Result<(), Error> {
        let item = self
            .shop
            .get_item_by_name(item_name)
            .await?
            .ok_or_else(|| Error::ItemNotFound(item_name.to_string()))?;

        self.inventory.consume(user_id, &item, 1).await?;
        info!("{} redeemed one '{}'", user_id, item.name);
        Ok(())
    }

    pub async fn get_inventory(&self, user_id: &str) -> Result<Vec<InventoryEntry>, Error> {
        self.inventory.list_for_user(user_id).await
    }
}
