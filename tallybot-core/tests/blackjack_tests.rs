use std::sync::Arc;

use tallybot_common::models::blackjack::{Card, GameStatus, Rank, Suit};
use tallybot_core::services::blackjack_service::{BlackjackService, HitOutcome};
use tallybot_core::services::economy_service::EconomyService;
use tallybot_core::test_utils::{MemStore, ScriptedSource};
use tallybot_core::Error;

fn c(rank: Rank) -> Card {
    Card::new(rank, Suit::Hearts)
}

fn setup() -> (Arc<ScriptedSource>, BlackjackService, EconomyService) {
    let store = Arc::new(MemStore::new());
    let rng = Arc::new(ScriptedSource::new());
    let blackjack = BlackjackService::new(store.clone(), rng.clone());
    let economy = EconomyService::new(store, rng.clone());
    (rng, blackjack, economy)
}

// Deal order: two player cards, then two dealer cards.

#[tokio::test]
async fn starting_escrows_the_bet() -> anyhow::Result<()> {
    let (rng, blackjack, economy) = setup();
    economy.admin_credit("player", 1000).await?;
    rng.push_cards([c(Rank::Ten), c(Rank::Eight), c(Rank::Nine), c(Rank::Seven)]);

    let view = blackjack.start_game("player", 100).await?;
    assert_eq!(economy.get_balances("player").await?.wallet, 900);
    assert_eq!(view.player_total, 18);
    assert_eq!(view.dealer_upcard, c(Rank::Nine));
    assert!(!view.is_blackjack);
    Ok(())
}

#[tokio::test]
async fn natural_blackjack_pays_two_and_a_half_to_one() -> anyhow::Result<()> {
    let (rng, blackjack, economy) = setup();
    economy.admin_credit("player", 1000).await?;
    rng.push_cards([c(Rank::Ace), c(Rank::King), c(Rank::Five), c(Rank::Nine)]);

    let view = blackjack.start_game("player", 100).await?;
    assert!(view.is_blackjack, "initial 21 is flagged, game stays open");
    assert_eq!(economy.get_balances("player").await?.wallet, 900);

    // Dealer sits at 14 and must draw; a king busts them.
    rng.push_card(c(Rank::King));
    let settlement = blackjack.stand("player").await?;

    assert_eq!(settlement.status, GameStatus::PlayerWin);
    assert!(settlement.player_natural);
    assert_eq!(settlement.payout, 250);
    assert_eq!(economy.get_balances("player").await?.wallet, 1150);
    Ok(())
}

#[tokio::test]
async fn ordinary_win_pays_double() -> anyhow::Result<()> {
    let (rng, blackjack, economy) = setup();
    economy.admin_credit("player", 1000).await?;
    rng.push_cards([c(Rank::Ten), c(Rank::Eight), c(Rank::Ten), c(Rank::Six)]);

    blackjack.start_game("player", 100).await?;
    rng.push_card(c(Rank::King)); // dealer 16 -> 26, bust
    let settlement = blackjack.stand("player").await?;

    assert_eq!(settlement.status, GameStatus::PlayerWin);
    assert!(!settlement.player_natural);
    assert_eq!(settlement.payout, 200);
    assert_eq!(settlement.dealer_total, 26);
    assert_eq!(economy.get_balances("player").await?.wallet, 1100);
    Ok(())
}

#[tokio::test]
async fn push_refunds_the_bet() -> anyhow::Result<()> {
    let (rng, blackjack, economy) = setup();
    economy.admin_credit("player", 1000).await?;
    rng.push_cards([c(Rank::Ten), c(Rank::Eight), c(Rank::Ten), c(Rank::Eight)]);

    blackjack.start_game("player", 100).await?;
    // Dealer already has 18: stands, equal totals.
    let settlement = blackjack.stand("player").await?;

    assert_eq!(settlement.status, GameStatus::Push);
    assert_eq!(settlement.payout, 100);
    assert_eq!(economy.get_balances("player").await?.wallet, 1000);
    Ok(())
}

#[tokio::test]
async fn dealer_win_forfeits_the_escrow() -> anyhow::Result<()> {
    let (rng, blackjack, economy) = setup();
    economy.admin_credit("player", 1000).await?;
    rng.push_cards([c(Rank::Ten), c(Rank::Seven), c(Rank::Ten), c(Rank::Nine)]);

    blackjack.start_game("player", 100).await?;
    let settlement = blackjack.stand("player").await?;

    assert_eq!(settlement.status, GameStatus::DealerWin);
    assert_eq!(settlement.payout, 0);
    assert_eq!(economy.get_balances("player").await?.wallet, 900);

    // The table is free again.
    rng.push_cards([c(Rank::Two), c(Rank::Three), c(Rank::Four), c(Rank::Five)]);
    blackjack.start_game("player", 100).await?;
    Ok(())
}

#[tokio::test]
async fn hit_appends_and_bust_settles_on_the_spot() -> anyhow::Result<()> {
    let (rng, blackjack, economy) = setup();
    economy.admin_credit("player", 1000).await?;
    rng.push_cards([c(Rank::King), c(Rank::Queen), c(Rank::Two), c(Rank::Three)]);

    blackjack.start_game("player", 100).await?;
    rng.push_card(c(Rank::King));
    let outcome = blackjack.hit("player").await?;

    match outcome {
        HitOutcome::Bust(settlement) => {
            assert_eq!(settlement.status, GameStatus::DealerWin);
            assert_eq!(settlement.player_total, 30);
            assert_eq!(settlement.payout, 0);
        }
        HitOutcome::Continue(_) => panic!("30 is a bust"),
    }
    assert_eq!(economy.get_balances("player").await?.wallet, 900);
    assert!(matches!(blackjack.stand("player").await, Err(Error::NoActiveGame)));
    Ok(())
}

#[tokio::test]
async fn hit_under_twenty_one_keeps_the_round_open() -> anyhow::Result<()> {
    let (rng, blackjack, economy) = setup();
    economy.admin_credit("player", 1000).await?;
    rng.push_cards([c(Rank::Two), c(Rank::Three), c(Rank::Ten), c(Rank::Seven)]);

    blackjack.start_game("player", 100).await?;
    rng.push_card(c(Rank::Five));
    match blackjack.hit("player").await? {
        HitOutcome::Continue(view) => {
            assert_eq!(view.player_total, 10);
            assert_eq!(view.player_hand.len(), 3);
        }
        HitOutcome::Bust(_) => panic!("10 is not a bust"),
    }

    // An ace drawn later still reconciles: 10 + A = 21 soft.
    rng.push_card(c(Rank::Ace));
    match blackjack.hit("player").await? {
        HitOutcome::Continue(view) => {
            assert_eq!(view.player_total, 21);
            // A multi-card 21 is not a natural.
            assert!(!view.is_blackjack);
        }
        HitOutcome::Bust(_) => panic!("21 is not a bust"),
    }
    Ok(())
}

#[tokio::test]
async fn dealer_draws_to_seventeen_with_ace_reconciliation() -> anyhow::Result<()> {
    let (rng, blackjack, economy) = setup();
    economy.admin_credit("player", 1000).await?;
    // Dealer: A,5 = soft 16, draws; K makes it hard 16, draws again; 3 -> 19.
    rng.push_cards([c(Rank::Ten), c(Rank::Nine), c(Rank::Ace), c(Rank::Five)]);

    blackjack.start_game("player", 100).await?;
    rng.push_cards([c(Rank::King), c(Rank::Three)]);
    let settlement = blackjack.stand("player").await?;

    assert_eq!(settlement.dealer_total, 19);
    assert_eq!(settlement.dealer_hand.len(), 4);
    // 19 against 19.
    assert_eq!(settlement.status, GameStatus::Push);
    Ok(())
}

#[tokio::test]
async fn one_open_game_per_user() -> anyhow::Result<()> {
    let (rng, blackjack, economy) = setup();
    economy.admin_credit("player", 1000).await?;
    // Cards are drawn before the store refuses the second game, so both
    // attempts consume a deal.
    rng.push_cards([c(Rank::Two), c(Rank::Three), c(Rank::Four), c(Rank::Five)]);
    rng.push_cards([c(Rank::Two), c(Rank::Three), c(Rank::Four), c(Rank::Five)]);

    blackjack.start_game("player", 100).await?;
    let err = blackjack.start_game("player", 100).await.unwrap_err();
    assert!(matches!(err, Error::ActiveGameExists));
    // Only one escrow happened.
    assert_eq!(economy.get_balances("player").await?.wallet, 900);
    Ok(())
}

#[tokio::test]
async fn bets_beyond_the_wallet_are_refused() -> anyhow::Result<()> {
    let (rng, blackjack, economy) = setup();
    economy.admin_credit("player", 50).await?;

    rng.push_cards([c(Rank::Two), c(Rank::Three), c(Rank::Four), c(Rank::Five)]);
    let err = blackjack.start_game("player", 100).await.unwrap_err();
    assert!(matches!(
        err,
        Error::InsufficientFunds { needed: 100, available: 50 }
    ));
    assert!(matches!(blackjack.start_game("player", 0).await, Err(Error::Parse(_))));
    Ok(())
}

#[tokio::test]
async fn acting_without_a_game_fails() -> anyhow::Result<()> {
    let (_, blackjack, _) = setup();
    assert!(matches!(blackjack.hit("nobody").await, Err(Error::NoActiveGame)));
    assert!(matches!(blackjack.stand("nobody").await, Err(Error::NoActiveGame)));
    assert!(blackjack.current_hand("nobody").await?.is_none());
    Ok(())
}
