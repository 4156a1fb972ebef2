// File: tallybot-core/src/services/raffle_service.rs

use std::sync::Arc;

use chrono::{Duration, Utc};
use tallybot_common::error::Error;
use tallybot_common::models::raffle::{Prize, Raffle};
use tallybot_common::traits::repository_traits::{
    InventoryRepository, LedgerRepository, RaffleRepository, ShopRepository,
};
use tracing::{info, warn};
use uuid::Uuid;

/// What a conclusion produced, for the announcement layer to format.
#[derive(Debug, Clone)]
pub struct ConclusionReport {
    pub raffle_name: String,
    pub channel_ref: String,
    pub prize: Prize,
    /// Empty when nobody entered.
    pub winners: Vec<String>,
    /// The successor instance, when the raffle had repeats left.
    pub next_raffle: Option<Uuid>,
}

/// Timed drawings. Entries accrue until `ends_at`; conclusion samples
/// winners uniformly without replacement over distinct entrants (tickets
/// do not weight the draw), distributes the prize through the economy or
/// inventory, and deletes the raffle. The stored row doubles as the
/// durable schedule record, so a restart loses nothing.
pub struct RaffleService {
    raffles: Arc<dyn RaffleRepository>,
    shop: Arc<dyn ShopRepository>,
    ledger: Arc<dyn LedgerRepository>,
    inventory: Arc<dyn InventoryRepository>,
    rng: Arc<dyn crate::rng::RandomSource>,
}

impl RaffleService {
    pub fn new(
        raffles: Arc<dyn RaffleRepository>,
        shop: Arc<dyn ShopRepository>,
        ledger: Arc<dyn LedgerRepository>,
        inventory: Arc<dyn InventoryRepository>,
        rng: Arc<dyn crate::rng::RandomSource>,
    ) -> Self {
        Self {
            raffles,
            shop,
            ledger,
            inventory,
            rng,
        }
    }

    /// Validates everything once, up front: positive counts and duration,
    /// and a prize that is either a positive all-digit amount or the name
    /// of an existing shop item.
    pub async fn create_raffle(
        &self,
        name: &str,
        channel_ref: &str,
        prize_raw: &str,
        winners_count: i64,
        duration_secs: i64,
        repeat_count: i64,
    ) -> Result<Raffle, Error> {
        if winners_count <= 0 {
            return Err(Error::Parse("winners count must be positive".to_string()));
        }
        if duration_secs <= 0 {
            return Err(Error::Parse("duration must be positive".to_string()));
        }
        if repeat_count < 0 {
            return Err(Error::Parse("repeat count must not be negative".to_string()));
        }

        let prize = Prize::parse(prize_raw)?;
        if let Prize::Item(item_name) = &prize {
            if self.shop.get_item_by_name(item_name).await?.is_none() {
                return Err(Error::InvalidPrize(format!(
                    "'{item_name}' is neither an amount nor a shop item"
                )));
            }
        }

        let now = Utc::now();
        let raffle = Raffle {
            raffle_id: Uuid::new_v4(),
            name: name.to_string(),
            channel_ref: channel_ref.to_string(),
            prize,
            winners_count,
            repeat_count,
            duration_secs,
            ends_at: now + Duration::seconds(duration_secs),
            created_at: now,
        };
        self.raffles.create_raffle(&raffle).await?;
        info!("raffle '{}' created, ends at {}", raffle.name, raffle.ends_at);
        Ok(raffle)
    }

    pub async fn enter(&self, raffle_id: Uuid, user_id: &str, tickets: i64) -> Result<(), Error> {
        if tickets <= 0 {
            return Err(Error::Parse("ticket count must be positive".to_string()));
        }
        if self.raffles.get_raffle(raffle_id).await?.is_none() {
            return Err(Error::NotFound(format!("raffle {raffle_id}")));
        }
        self.raffles.add_entry(raffle_id, user_id, tickets).await
    }

    pub async fn list_active(&self) -> Result<Vec<Raffle>, Error> {
        self.raffles.list_active().await
    }

    /// Draws winners, deletes the raffle, pays out, and chains the next
    /// instance when repeats remain. Deletion comes first so each winner
    /// is paid at most once even if distribution fails partway.
    pub async fn conclude(&self, raffle_id: Uuid) -> Result<ConclusionReport, Error> {
        let raffle = self
            .raffles
            .get_raffle(raffle_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("raffle {raffle_id}")))?;

        let entrants = self.raffles.distinct_entrants(raffle_id).await?;

        let winners: Vec<String> = if entrants.is_empty() {
            Vec::new()
        } else {
            let count = (raffle.winners_count as usize).min(entrants.len());
            self.rng
                .pick_without_replacement(entrants.len(), count)
                .into_iter()
                .map(|i| entrants[i].clone())
                .collect()
        };

        // The raffle goes away before anything is paid. A storage error
        // mid-distribution then loses at most the remaining payouts; with
        // the row still present the next poll would pay the early winners
        // a second time.
        self.raffles.delete_raffle(raffle_id).await?;

        for winner in &winners {
            match &raffle.prize {
                Prize::Currency(amount) => {
                    // Full amount per winner, not split.
                    self.ledger.adjust_wallet(winner, *amount).await?;
                }
                Prize::Item(item_name) => {
                    match self.shop.get_item_by_name(item_name).await? {
                        Some(item) => self.inventory.grant(winner, &item, 1).await?,
                        None => {
                            // Item removed after creation; the winner is
                            // announced but gets nothing to grant.
                            warn!(
                                "prize item '{}' no longer exists; skipping grant for {}",
                                item_name, winner
                            );
                        }
                    }
                }
            }
        }

        info!(
            "raffle '{}' concluded with {} winner(s)",
            raffle.name,
            winners.len()
        );

        let next_raffle = if raffle.repeat_count > 0 {
            let now = Utc::now();
            let next = Raffle {
                raffle_id: Uuid::new_v4(),
                name: raffle.name.clone(),
                channel_ref: raffle.channel_ref.clone(),
                prize: raffle.prize.clone(),
                winners_count: raffle.winners_count,
                repeat_count: raffle.repeat_count - 1,
                duration_secs: raffle.duration_secs,
                ends_at: now + Duration::seconds(raffle.duration_secs),
                created_at: now,
            };
            self.raffles.create_raffle(&next).await?;
            Some(next.raffle_id)
        } else {
            None
        };

        Ok(ConclusionReport {
            raffle_name: raffle.name,
            channel_ref: raffle.channel_ref,
            prize: raffle.prize,
            winners,
            next_raffle,
        })
    }

    /// Concludes everything past its end time. The poll loop in
    /// `tasks::raffle_conclusion` calls this on an interval.
    pub async fn conclude_due(&self) -> Result<Vec<ConclusionReport>, Error> {
        let due = self.raffles.due_raffles(Utc::now()).await?;
        let mut reports = Vec::with_capacity(due.len());
        for raffle in due {
            reports.push(self.conclude(raffle.raffle_id).await?);
        }
        Ok(reports)
    }
}
