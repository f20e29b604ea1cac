#![allow(non_snake_case)]
use coinflip_client::{
    Error,
    authority::{
        FlipRequest,
        PlayerId,
    },
    error::TransportError,
    notify::NoticeLevel,
    session::{
        CoinSide,
        FlipPhase,
    },
    test_helpers::{
        Call,
        TestContext,
        outcome,
    },
    validator::Rejection,
};
use std::time::Duration;
use tokio::time::{
    self,
    Instant,
};

fn assert_elapsed(expected: Duration, start: Instant) {
    let elapsed = start.elapsed();
    assert!(
        elapsed >= expected && elapsed < expected + Duration::from_millis(50),
        "expected ~{expected:?}, got {elapsed:?}"
    );
}

#[tokio::test(start_paused = true)]
async fn flip__win_updates_balance_and_stats_after_reveal() {
    // given
    let ctx = TestContext::ready(100.0);
    ctx.store.select_side(CoinSide::Heads).unwrap();
    ctx.authority
        .push_flip(Ok(outcome(CoinSide::Heads, true, 20.0, 120.0, 1, 1, 20.0)));
    let start = Instant::now();

    // when
    let result = ctx.flips.flip().await.unwrap();

    // then
    assert_elapsed(Duration::from_millis(2000), start);
    assert!(result.won);
    let snapshot = ctx.store.snapshot();
    assert_eq!(120.0, snapshot.player.balance);
    assert_eq!(1, snapshot.player.total_games);
    assert_eq!(1, snapshot.player.wins);
    assert_eq!(20.0, snapshot.player.total_winnings);
    assert_eq!(Some(CoinSide::Heads), snapshot.last_result);
    assert_eq!(FlipPhase::Resolved, snapshot.phase);
    assert_eq!(
        vec![Call::Play(FlipRequest {
            player_id: PlayerId(1),
            bet_amount: 10.0,
            selected_side: CoinSide::Heads,
        })],
        ctx.authority.calls()
    );
    assert_eq!(
        Some((NoticeLevel::Success, "You won 20 TON!".to_string())),
        ctx.notifier.last()
    );
}

#[tokio::test(start_paused = true)]
async fn flip__loss_shows_authority_balance_after_reveal() {
    // given
    let ctx = TestContext::ready(100.0);
    ctx.store.select_side(CoinSide::Heads).unwrap();
    ctx.authority
        .push_flip(Ok(outcome(CoinSide::Tails, false, 0.0, 90.0, 1, 0, 0.0)));
    let start = Instant::now();

    // when
    ctx.flips.flip().await.unwrap();

    // then
    assert_elapsed(Duration::from_millis(2000), start);
    let snapshot = ctx.store.snapshot();
    assert_eq!(90.0, snapshot.player.balance);
    assert_eq!(Some(CoinSide::Tails), snapshot.last_result);
    assert_eq!(
        Some((NoticeLevel::Error, "You lost 10 TON".to_string())),
        ctx.notifier.last()
    );
}

#[tokio::test(start_paused = true)]
async fn flip__loss_reports_stake_and_keeps_winnings() {
    // given
    let ctx = TestContext::ready(100.0);
    ctx.store.select_side(CoinSide::Tails).unwrap();
    ctx.store.set_bet_amount(25.0).unwrap();
    ctx.authority
        .push_flip(Ok(outcome(CoinSide::Heads, false, 0.0, 75.0, 1, 0, 0.0)));

    // when
    ctx.flips.flip().await.unwrap();

    // then
    let snapshot = ctx.store.snapshot();
    assert_eq!(75.0, snapshot.player.balance);
    assert_eq!(1, snapshot.losses());
    assert_eq!(0.0, snapshot.win_rate());
    assert_eq!(Some(CoinSide::Heads), snapshot.last_result);
    assert_eq!(
        Some((NoticeLevel::Error, "You lost 25 TON".to_string())),
        ctx.notifier.last()
    );
}

#[tokio::test(start_paused = true)]
async fn flip__result_is_hidden_until_reveal_delay_elapses() {
    // given
    let ctx = TestContext::ready(100.0);
    ctx.store.select_side(CoinSide::Heads).unwrap();
    ctx.authority
        .push_flip(Ok(outcome(CoinSide::Heads, true, 20.0, 110.0, 1, 1, 20.0)));
    let flip = ctx.flips.flip();
    tokio::pin!(flip);

    // when
    let early = time::timeout(Duration::from_millis(1999), &mut flip).await;

    // then
    assert!(early.is_err());
    let snapshot = ctx.store.snapshot();
    assert_eq!(FlipPhase::AwaitingReveal, snapshot.phase);
    assert_eq!(100.0, snapshot.player.balance);
    assert_eq!(None, snapshot.last_result);
    assert!(ctx.notifier.notices().is_empty());

    flip.await.unwrap();
    assert_eq!(110.0, ctx.store.snapshot().player.balance);
}

#[tokio::test(start_paused = true)]
async fn flip__slow_response_is_shown_as_soon_as_it_arrives() {
    // given
    let ctx = TestContext::ready(100.0);
    ctx.store.select_side(CoinSide::Heads).unwrap();
    ctx.authority.set_latency(Duration::from_millis(3000));
    ctx.authority
        .push_flip(Ok(outcome(CoinSide::Tails, false, 0.0, 90.0, 1, 0, 0.0)));
    let start = Instant::now();

    // when
    ctx.flips.flip().await.unwrap();

    // then
    assert_elapsed(Duration::from_millis(3000), start);
    assert_eq!(90.0, ctx.store.snapshot().player.balance);
}

#[tokio::test(start_paused = true)]
async fn flip__second_flip_while_busy_is_rejected_without_request() {
    // given
    let ctx = TestContext::ready(100.0);
    ctx.store.select_side(CoinSide::Heads).unwrap();
    ctx.authority.set_latency(Duration::from_millis(500));
    ctx.authority
        .push_flip(Ok(outcome(CoinSide::Heads, true, 20.0, 110.0, 1, 1, 20.0)));
    let first = ctx.flips.flip();
    tokio::pin!(first);
    let _ = time::timeout(Duration::from_millis(10), &mut first).await;
    assert_eq!(FlipPhase::Submitting, ctx.store.phase());

    // when
    let second = ctx.flips.flip().await;

    // then
    assert!(matches!(
        second,
        Err(Error::Validation(Rejection::FlipInProgress))
    ));
    assert_eq!(1, ctx.authority.play_calls());
    assert_eq!(
        Some((
            NoticeLevel::Error,
            "Wait for the current flip to finish".to_string()
        )),
        ctx.notifier.last()
    );
    assert_eq!(
        Err(Rejection::FlipInProgress),
        ctx.store.set_bet_amount(50.0)
    );

    first.await.unwrap();
    assert_eq!(1, ctx.store.snapshot().player.total_games);
}

#[tokio::test(start_paused = true)]
async fn flip__transport_failure_releases_lock_immediately() {
    // given
    let ctx = TestContext::ready(100.0);
    ctx.store.select_side(CoinSide::Heads).unwrap();
    ctx.authority.push_flip(Err(TransportError::Status(
        reqwest::StatusCode::BAD_GATEWAY,
    )
    .into()));
    let start = Instant::now();

    // when
    let result = ctx.flips.flip().await;

    // then
    assert!(result.unwrap_err().is_transport());
    assert_eq!(Duration::ZERO, start.elapsed());
    let snapshot = ctx.store.snapshot();
    assert_eq!(FlipPhase::Idle, snapshot.phase);
    assert_eq!(100.0, snapshot.player.balance);
    assert_eq!(0, snapshot.player.total_games);
    assert_eq!(Some(CoinSide::Heads), snapshot.wager.selected_side);
    assert_eq!(
        Some((
            NoticeLevel::Error,
            "Flip failed, please try again".to_string()
        )),
        ctx.notifier.last()
    );
}

#[tokio::test(start_paused = true)]
async fn flip__authority_error_gets_generic_notice() {
    let ctx = TestContext::ready(100.0);
    ctx.store.select_side(CoinSide::Tails).unwrap();
    ctx.authority
        .push_flip(Err(Error::Authority("game paused".to_string())));

    let result = ctx.flips.flip().await;

    assert_eq!(Some("game paused"), result.unwrap_err().authority_message());
    assert_eq!(FlipPhase::Idle, ctx.store.phase());
    assert_eq!(
        Some((
            NoticeLevel::Error,
            "Flip failed, please try again".to_string()
        )),
        ctx.notifier.last()
    );
}

#[tokio::test(start_paused = true)]
async fn flip__resolution_clears_side_but_keeps_bet() {
    // given
    let ctx = TestContext::ready(100.0);
    ctx.store.select_side(CoinSide::Heads).unwrap();
    ctx.store.set_bet_amount(50.0).unwrap();
    ctx.authority
        .push_flip(Ok(outcome(CoinSide::Heads, true, 100.0, 150.0, 1, 1, 100.0)));

    // when
    ctx.flips.flip().await.unwrap();

    // then
    let wager = ctx.store.snapshot().wager;
    assert_eq!(None, wager.selected_side);
    assert_eq!(50.0, wager.bet_amount);

    let again = ctx.flips.flip().await;
    assert!(matches!(
        again,
        Err(Error::Validation(Rejection::NoSideSelected))
    ));
    assert_eq!(1, ctx.authority.play_calls());
}

#[tokio::test(start_paused = true)]
async fn flip__invalid_wager_never_reaches_authority() {
    let ctx = TestContext::ready(100.0);
    ctx.store.select_side(CoinSide::Heads).unwrap();

    ctx.store.set_bet_amount(150.0).unwrap();
    let too_much = ctx.flips.flip().await;
    ctx.store.set_bet_amount(0.0).unwrap();
    let zero = ctx.flips.flip().await;

    assert!(matches!(
        too_much,
        Err(Error::Validation(Rejection::InsufficientFunds))
    ));
    assert!(matches!(
        zero,
        Err(Error::Validation(Rejection::InvalidAmount))
    ));
    assert!(ctx.authority.calls().is_empty());
    assert_eq!(FlipPhase::Idle, ctx.store.phase());
}

#[tokio::test(start_paused = true)]
async fn flip__before_bootstrap_is_not_ready() {
    let ctx = TestContext::new();
    ctx.store.select_side(CoinSide::Heads).unwrap();

    let result = ctx.flips.flip().await;

    assert!(matches!(result, Err(Error::Validation(Rejection::NotReady))));
    assert!(ctx.authority.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn flip__inconsistent_outcome_is_discarded() {
    // given
    let ctx = TestContext::ready(100.0);
    ctx.store.select_side(CoinSide::Heads).unwrap();
    ctx.authority
        .push_flip(Ok(outcome(CoinSide::Heads, true, 20.0, 110.0, 1, 3, 20.0)));
    let start = Instant::now();

    // when
    let result = ctx.flips.flip().await;

    // then
    assert!(matches!(result, Err(Error::InvalidOutcome(_))));
    assert_eq!(Duration::ZERO, start.elapsed());
    assert_eq!(
        Some((
            NoticeLevel::Error,
            "Flip failed, please try again".to_string()
        )),
        ctx.notifier.last()
    );
    let snapshot = ctx.store.snapshot();
    assert_eq!(FlipPhase::Idle, snapshot.phase);
    assert_eq!(100.0, snapshot.player.balance);
    assert_eq!(None, snapshot.last_result);
}

#[tokio::test(start_paused = true)]
async fn flip__dropped_mid_reveal_releases_lock_without_writing() {
    // given
    let ctx = TestContext::ready(100.0);
    ctx.store.select_side(CoinSide::Heads).unwrap();
    ctx.authority
        .push_flip(Ok(outcome(CoinSide::Heads, true, 20.0, 110.0, 1, 1, 20.0)));

    // when
    let cancelled = time::timeout(Duration::from_millis(1000), ctx.flips.flip()).await;

    // then
    assert!(cancelled.is_err());
    let snapshot = ctx.store.snapshot();
    assert_eq!(FlipPhase::Idle, snapshot.phase);
    assert_eq!(100.0, snapshot.player.balance);
    assert_eq!(Some(CoinSide::Heads), snapshot.wager.selected_side);
}
