// File: tallybot-common/src/models/account.rs

use serde::{Deserialize, Serialize};

/// One currency account per user. Created lazily with zero balances the
/// first time a user id is referenced.
///
/// The wallet is the spendable balance (purchases, transfers, rob targets);
/// the bank is the protected balance reachable only via deposit/withdraw.
/// Both are always non-negative.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Account {
    pub user_id: String,
    pub wallet: i64,
    pub bank: i64,
}

impl Account {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            wallet: 0,
            bank: 0,
        }
    }

    /// Wallet + bank, the leaderboard sort key.
    pub fn total(&self) -> i64 {
        self.wallet + self.bank
    }
}
