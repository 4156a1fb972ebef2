// ================================================================
// File: tallybot-common/src/error.rs
// ================================================================

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Not found error: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    // Expected, user-facing conditions below. None of these are fatal:
    // the dispatch layer formats them back to the user.
    #[error("Insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: i64, available: i64 },

    #[error("Not enough '{item}': need {needed}, have {held}")]
    InsufficientQuantity { item: String, needed: i64, held: i64 },

    #[error("Shop item not found: {0}")]
    ItemNotFound(String),

    #[error("The name '{0}' is already taken")]
    DuplicateName(String),

    #[error("'{0}' is out of stock")]
    OutOfStock(String),

    #[error("User already has a blackjack game in progress")]
    ActiveGameExists,

    #[error("No blackjack game in progress")]
    NoActiveGame,

    #[error("User is already assigned")]
    AlreadyAssigned,

    #[error("User is not assigned to that job")]
    NotAssigned,

    #[error("Invalid prize: {0}")]
    InvalidPrize(String),
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Parse(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Parse(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_facing_errors_carry_their_numbers() {
        let err = Error::InsufficientFunds { needed: 100, available: 40 };
        assert_eq!(err.to_string(), "Insufficient funds: need 100, have 40");

        let err = Error::InsufficientQuantity {
            item: "Sword".to_string(),
            needed: 2,
            held: 1,
        };
        assert_eq!(err.to_string(), "Not enough 'Sword': need 2, have 1");
    }

    #[test]
    fn strings_convert_to_parse_errors() {
        let err: Error = "bad input".into();
        assert!(matches!(err, Error::Parse(s) if s == "bad input"));
    }
}
