//! Preconditions checked before any request reaches the authority.
//!
//! Every check here is pure. The flip check is run twice: once by the host
//! before it asks for a flip, and again by the session store under the same
//! lock that marks the flip as in flight.

use crate::{
    authority::{
        DepositRequest,
        FlipRequest,
        PlayerId,
        WithdrawalRequest,
    },
    session::{
        FlipPhase,
        PlayerSession,
        WagerIntent,
    },
};
use thiserror::Error;

/// Why a user action was refused locally.
#[derive(Error, Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Rejection {
    #[error("a flip is already in progress")]
    FlipInProgress,
    #[error("no side selected")]
    NoSideSelected,
    #[error("player not ready")]
    NotReady,
    #[error("invalid amount")]
    InvalidAmount,
    #[error("insufficient funds")]
    InsufficientFunds,
    #[error("fill all fields")]
    MissingFields,
}

impl Rejection {
    /// Text shown to the player for this rejection.
    pub fn user_message(self) -> &'static str {
        match self {
            Rejection::FlipInProgress => "Wait for the current flip to finish",
            Rejection::NoSideSelected => "Choose a side of the coin",
            Rejection::NotReady => "Not connected to the game server yet",
            Rejection::InvalidAmount => "Enter a valid amount",
            Rejection::InsufficientFunds => "Insufficient funds",
            Rejection::MissingFields => "Fill in all fields",
        }
    }
}

/// Checks a flip in order: lock, side, player, amount, funds. First failure wins.
pub fn validate_flip(
    phase: FlipPhase,
    player: &PlayerSession,
    wager: &WagerIntent,
) -> Result<FlipRequest, Rejection> {
    if phase.is_busy() {
        return Err(Rejection::FlipInProgress);
    }
    let selected_side = wager.selected_side.ok_or(Rejection::NoSideSelected)?;
    let player_id = player.player_id.ok_or(Rejection::NotReady)?;
    let bet_amount = wager.bet_amount;
    if !is_positive_amount(bet_amount) {
        return Err(Rejection::InvalidAmount);
    }
    if bet_amount > player.balance {
        return Err(Rejection::InsufficientFunds);
    }
    Ok(FlipRequest {
        player_id,
        bet_amount,
        selected_side,
    })
}

pub fn validate_deposit(
    player_id: Option<PlayerId>,
    amount: &str,
) -> Result<DepositRequest, Rejection> {
    let player_id = player_id.ok_or(Rejection::NotReady)?;
    let amount = parse_amount(amount)?;
    Ok(DepositRequest { player_id, amount })
}

pub fn validate_withdrawal(
    player_id: Option<PlayerId>,
    amount: &str,
    address: &str,
) -> Result<WithdrawalRequest, Rejection> {
    let player_id = player_id.ok_or(Rejection::NotReady)?;
    let address = address.trim();
    if amount.trim().is_empty() || address.is_empty() {
        return Err(Rejection::MissingFields);
    }
    let amount = parse_amount(amount)?;
    Ok(WithdrawalRequest {
        player_id,
        amount,
        ton_address: address.to_string(),
    })
}

fn parse_amount(raw: &str) -> Result<f64, Rejection> {
    let amount = raw
        .trim()
        .parse::<f64>()
        .map_err(|_| Rejection::InvalidAmount)?;
    if is_positive_amount(amount) {
        Ok(amount)
    } else {
        Err(Rejection::InvalidAmount)
    }
}

fn is_positive_amount(amount: f64) -> bool {
    amount.is_finite() && amount > 0.0
}
