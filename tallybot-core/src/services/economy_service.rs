// File: tallybot-core/src/services/economy_service.rs

use std::sync::Arc;

use tallybot_common::error::Error;
use tallybot_common::models::account::Account;
use tallybot_common::traits::repository_traits::LedgerRepository;
use tracing::{debug, info};

use crate::rng::RandomSource;

/// Bounds for the `bake` earn command.
const BAKE_MIN: i64 = 25;
const BAKE_MAX: i64 = 75;

/// How a rob or drain attempt resolved. The reported amount is always
/// what actually moved; a penalty the robber could not cover is reported
/// as 0, not as the computed value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RobOutcome {
    /// Target wallet was empty; nothing happened.
    NothingToSteal,
    Success { amount_stolen: i64 },
    Failure { penalty_paid: i64 },
}

/// Balance queries and every way money moves between wallets and banks:
/// deposit/withdraw, peer transfers, the rob/drain adversarial transfers,
/// and the explicit creation points (bake, admin credit).
pub struct EconomyService {
    ledger: Arc<dyn LedgerRepository>,
    rng: Arc<dyn RandomSource>,
}

impl EconomyService {
    pub fn new(ledger: Arc<dyn LedgerRepository>, rng: Arc<dyn RandomSource>) -> Self {
        Self { ledger, rng }
    }

    /// Never fails for an unknown user: the account is created with zero
    /// balances on first reference.
    pub async fn get_balances(&self, user_id: &str) -> Result<Account, Error> {
        self.ledger.get_or_create_account(user_id).await
    }

    /// Wallet -> bank.
    pub async fn deposit(&self, user_id: &str, amount: i64) -> Result<Account, Error> {
        if amount <= 0 {
            return Err(Error::Parse("deposit amount must be positive".to_string()));
        }
        self.ledger.move_wallet_to_bank(user_id, amount).await
    }

    /// Bank -> wallet.
    pub async fn withdraw(&self, user_id: &str, amount: i64) -> Result<Account, Error> {
        if amount <= 0 {
            return Err(Error::Parse("withdraw amount must be positive".to_string()));
        }
        self.ledger.move_bank_to_wallet(user_id, amount).await
    }

    /// Peer transfer between wallets. Self-transfer is permitted here;
    /// forbidding it is a UX-layer choice.
    pub async fn transfer_from_wallet(
        &self,
        from_id: &str,
        to_id: &str,
        amount: i64,
    ) -> Result<(), Error> {
        if amount <= 0 {
            return Err(Error::Parse("transfer amount must be positive".to_string()));
        }
        self.ledger.transfer_wallet(from_id, to_id, amount).await?;
        debug!("transferred {} from {} to {}", amount, from_id, to_id);
        Ok(())
    }

    /// Fair-coin rob: on success the robber takes a uniform 10-40% cut of
    /// the target's wallet; on failure the robber pays a quarter of the
    /// would-be haul to the target, if the robber can cover it.
    pub async fn rob_user(&self, robber_id: &str, target_id: &str) -> Result<RobOutcome, Error> {
        let target = self.ledger.get_or_create_account(target_id).await?;
        if target.wallet == 0 {
            return Ok(RobOutcome::NothingToSteal);
        }

        let percent = self.rng.uniform_float(0.10, 0.40);
        let amount = (target.wallet as f64 * percent).floor() as i64;
        let succeeded = self.rng.uniform_int(0, 1) == 1;

        if succeeded {
            if amount > 0 {
                self.ledger.transfer_wallet(target_id, robber_id, amount).await?;
            }
            info!("{} robbed {} for {}", robber_id, target_id, amount);
            return Ok(RobOutcome::Success { amount_stolen: amount });
        }

        let penalty = amount / 4;
        let penalty_paid = self.pay_penalty(robber_id, target_id, penalty).await?;
        info!("{} failed to rob {}, paid penalty {}", robber_id, target_id, penalty_paid);
        Ok(RobOutcome::Failure { penalty_paid })
    }

    /// The harsher adversarial transfer: one-in-four odds, but a success
    /// empties the target's wallet entirely. Failure costs a quarter of
    /// the target's wallet, when the drainer can cover it. Banked funds
    /// are immune, as for rob.
    pub async fn drain_user(&self, drainer_id: &str, target_id: &str) -> Result<RobOutcome, Error> {
        let target = self.ledger.get_or_create_account(target_id).await?;
        if target.wallet == 0 {
            return Ok(RobOutcome::NothingToSteal);
        }

        let succeeded = self.rng.uniform_int(0, 3) == 0;

        if succeeded {
            self.ledger
                .transfer_wallet(target_id, drainer_id, target.wallet)
                .await?;
            info!("{} drained {} for {}", drainer_id, target_id, target.wallet);
            return Ok(RobOutcome::Success { amount_stolen: target.wallet });
        }

        let penalty = target.wallet / 4;
        let penalty_paid = self.pay_penalty(drainer_id, target_id, penalty).await?;
        info!("{} failed to drain {}, paid penalty {}", drainer_id, target_id, penalty_paid);
        Ok(RobOutcome::Failure { penalty_paid })
    }

    /// Moves the penalty only when the payer can cover it; returns the
    /// amount that actually moved.
    async fn pay_penalty(&self, payer_id: &str, payee_id: &str, penalty: i64) -> Result<i64, Error> {
        if penalty <= 0 {
            return Ok(0);
        }
        match self.ledger.transfer_wallet(payer_id, payee_id, penalty).await {
            Ok(()) => Ok(penalty),
            Err(Error::InsufficientFunds { .. }) => Ok(0),
            Err(e) => Err(e),
        }
    }

    /// The earn command: mints a uniform random amount into the wallet
    /// and returns it. One of the explicit money-creation points.
    pub async fn bake(&self, user_id: &str) -> Result<i64, Error> {
        let amount = self.rng.uniform_int(BAKE_MIN, BAKE_MAX);
        self.ledger.adjust_wallet(user_id, amount).await?;
        Ok(amount)
    }

    /// Privileged mint. The caller's right to do this is the host
    /// platform's concern.
    pub async fn admin_credit(&self, user_id: &str, amount: i64) -> Result<Account, Error> {
        if amount <= 0 {
            return Err(Error::Parse("credit amount must be positive".to_string()));
        }
        self.ledger.adjust_wallet(user_id, amount).await
    }

    /// Top 10 accounts by wallet + bank, descending. Ties fall in storage
    /// order.
    pub async fn get_leaderboard(&self) -> Result<Vec<Account>, Error> {
        self.ledger.top_accounts(10).await
    }
}
