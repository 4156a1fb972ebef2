// File: tallybot-common/src/models/raffle.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;

/// What a raffle pays out. Decided and validated once at creation time;
/// the legacy "string that might be a number" form is parsed exactly once
/// via [`Prize::parse`] and carried as this tagged value thereafter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Prize {
    /// Every winner's wallet is credited this amount (full amount per
    /// winner, not split).
    Currency(i64),
    /// Every winner receives one unit of the named shop item.
    Item(String),
}

impl Prize {
    /// Parses the user-supplied prize string: an all-digit literal is a
    /// currency amount, anything else is taken as a shop item name. Item
    /// existence is checked by the raffle service against the catalog.
    pub fn parse(raw: &str) -> Result<Prize, Error> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidPrize("prize must not be empty".to_string()));
        }
        if trimmed.chars().all(|ch| ch.is_ascii_digit()) {
            let amount: i64 = trimmed
                .parse()
                .map_err(|_| Error::InvalidPrize(format!("amount '{trimmed}' is too large")))?;
            if amount <= 0 {
                return Err(Error::InvalidPrize("prize amount must be positive".to_string()));
            }
            Ok(Prize::Currency(amount))
        } else {
            Ok(Prize::Item(trimmed.to_string()))
        }
    }
}

/// A timed drawing. The row itself is the durable schedule record: a
/// background task concludes any raffle whose `ends_at` has passed, so a
/// restart never loses a pending conclusion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Raffle {
    pub raffle_id: Uuid,
    pub name: String,
    pub channel_ref: String,
    pub prize: Prize,
    pub winners_count: i64,
    /// How many fresh instances to chain after this one concludes.
    pub repeat_count: i64,
    /// Original run length, kept so repeats can re-derive their own end.
    pub duration_secs: i64,
    pub ends_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// One user's entry into a raffle. Tickets accumulate per user but do not
/// weight the draw; winner selection is uniform over distinct entrants.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RaffleEntry {
    pub raffle_id: Uuid,
    pub user_id: String,
    pub ticket_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digits_parse_as_currency() {
        assert_eq!(Prize::parse("500").unwrap(), Prize::Currency(500));
    }

    #[test]
    fn zero_amount_is_rejected() {
        assert!(matches!(Prize::parse("0"), Err(Error::InvalidPrize(_))));
    }

    #[test]
    fn names_parse_as_items() {
        assert_eq!(
            Prize::parse("Golden Sword").unwrap(),
            Prize::Item("Golden Sword".to_string())
        );
    }

    #[test]
    fn mixed_digits_and_letters_are_an_item_name() {
        // "100xp" is a legitimate item name, not a malformed amount.
        assert_eq!(Prize::parse("100xp").unwrap(), Prize::Item("100xp".to_string()));
    }

    #[test]
    fn empty_prize_is_rejected() {
        assert!(matches!(Prize::parse("   "), Err(Error::InvalidPrize(_))));
    }
}
