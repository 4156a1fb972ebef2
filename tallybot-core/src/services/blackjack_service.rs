// File: tallybot-core/src/services/blackjack_service.rs

use std::sync::Arc;

use chrono::Utc;
use tallybot_common::error::Error;
use tallybot_common::models::blackjack::{
    hand_total, is_natural, BlackjackGame, Card, GameStatus,
};
use tallybot_common::traits::repository_traits::BlackjackRepository;
use tracing::{debug, info};
use uuid::Uuid;

/// Dealer draws to 17 and stands on all 17s.
const DEALER_STAND: i64 = 17;

/// What the player is shown while a round is open: their own hand and
/// only the dealer's first card. The dealer's hole card stays stored but
/// hidden until settlement.
#[derive(Debug, Clone)]
pub struct HandView {
    pub player_hand: Vec<Card>,
    pub player_total: i64,
    pub dealer_upcard: Card,
    /// True when the initial deal already totals 21; the round stays open
    /// awaiting a stand.
    pub is_blackjack: bool,
}

#[derive(Debug, Clone)]
pub enum HitOutcome {
    Continue(HandView),
    /// Over 21: the round settled on the spot, escrow forfeited.
    Bust(Settlement),
}

/// The finished round. `payout` is what came back to the wallet: 0 for a
/// dealer win (the escrowed bet is simply gone), `bet` for a push,
/// `2 * bet` for a win, `bet * 5 / 2` for a natural.
#[derive(Debug, Clone)]
pub struct Settlement {
    pub status: GameStatus,
    pub bet: i64,
    pub payout: i64,
    pub player_hand: Vec<Card>,
    pub dealer_hand: Vec<Card>,
    pub player_total: i64,
    pub dealer_total: i64,
    pub player_natural: bool,
}

/// The turn-based blackjack state machine: deal, hit*, stand, settle.
/// Cards come from an infinite shoe (each draw independent). One open
/// game per user, keyed by the user id; the bet is escrowed from the
/// wallet when the game row is created.
pub struct BlackjackService {
    games: Arc<dyn BlackjackRepository>,
    rng: Arc<dyn crate::rng::RandomSource>,
}

impl BlackjackService {
    pub fn new(
        games: Arc<dyn BlackjackRepository>,
        rng: Arc<dyn crate::rng::RandomSource>,
    ) -> Self {
        Self { games, rng }
    }

    /// Deals 2 + 2 and escrows the bet. Fails `ActiveGameExists` when a
    /// round is already open and `InsufficientFunds` when the wallet
    /// cannot cover the bet.
    pub async fn start_game(&self, user_id: &str, bet: i64) -> Result<HandView, Error> {
        if bet <= 0 {
            return Err(Error::Parse("bet must be positive".to_string()));
        }

        let game = BlackjackGame {
            game_id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            bet,
            player_hand: vec![self.rng.draw_card(), self.rng.draw_card()],
            dealer_hand: vec![self.rng.draw_card(), self.rng.draw_card()],
            status: GameStatus::InProgress,
            created_at: Utc::now(),
        };

        self.games.create_game(&game).await?;
        info!("{} started blackjack with bet {}", user_id, bet);
        Ok(Self::view_of(&game))
    }

    /// One more card for the player. A total over 21 settles the round
    /// immediately as a dealer win.
    pub async fn hit(&self, user_id: &str) -> Result<HitOutcome, Error> {
        let mut game = self
            .games
            .get_active_game(user_id)
            .await?
            .ok_or(Error::NoActiveGame)?;

        game.player_hand.push(self.rng.draw_card());
        let total = game.player_total();
        debug!("{} hit to {}", user_id, total);

        if total > 21 {
            game.status = GameStatus::DealerWin;
            // Escrow is forfeited; nothing comes back.
            self.games.settle_game(game.game_id, user_id, 0).await?;
            return Ok(HitOutcome::Bust(Self::settlement_of(&game, 0)));
        }

        self.games.update_game(&game).await?;
        Ok(HitOutcome::Continue(Self::view_of(&game)))
    }

    /// Dealer plays out, hands are compared, the game row is deleted and
    /// any payout credited back to the wallet.
    pub async fn stand(&self, user_id: &str) -> Result<Settlement, Error> {
        let mut game = self
            .games
            .get_active_game(user_id)
            .await?
            .ok_or(Error::NoActiveGame)?;

        while game.dealer_total() < DEALER_STAND {
            game.dealer_hand.push(self.rng.draw_card());
        }

        let player = game.player_total();
        let dealer = game.dealer_total();
        let natural = is_natural(&game.player_hand);

        game.status = if dealer > 21 || player > dealer {
            GameStatus::PlayerWin
        } else if player < dealer {
            GameStatus::DealerWin
        } else {
            GameStatus::Push
        };

        let payout = match game.status {
            GameStatus::PlayerWin if natural => game.bet * 5 / 2,
            GameStatus::PlayerWin => game.bet * 2,
            GameStatus::Push => game.bet,
            _ => 0,
        };

        self.games.settle_game(game.game_id, user_id, payout).await?;
        info!(
            "{} stood at {} vs dealer {}: {:?}, payout {}",
            user_id, player, dealer, game.status, payout
        );
        Ok(Self::settlement_of(&game, payout))
    }

    /// The open round, if any, as the player may see it.
    pub async fn current_hand(&self, user_id: &str) -> Result<Option<HandView>, Error> {
        Ok(self
            .games
            .get_active_game(user_id)
            .await?
            .as_ref()
            .map(Self::view_of))
    }

    fn view_of(game: &BlackjackGame) -> HandView {
        HandView {
            player_hand: game.player_hand.clone(),
            player_total: game.player_total(),
            dealer_upcard: game.dealer_hand[0],
            is_blackjack: is_natural(&game.player_hand),
        }
    }

    fn settlement_of(game: &BlackjackGame, payout: i64) -> Settlement {
        Settlement {
            status: game.status,
            bet: game.bet,
            payout,
            player_hand: game.player_hand.clone(),
            dealer_hand: game.dealer_hand.clone(),
            player_total: game.player_total(),
            dealer_total: game.dealer_total(),
            player_natural: is_natural(&game.player_hand),
        }
    }
}
