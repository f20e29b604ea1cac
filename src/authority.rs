//! The remote game authority: the only source of outcomes, balances and
//! transfer instructions.

use crate::{
    Result,
    session::CoinSide,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::fmt;

pub mod http;

pub use http::HttpAuthority;

/// Player identifier assigned by the authority.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PlayerRequest {
    pub telegram_id: u64,
    pub username: String,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct PlayerAccount {
    pub player_id: PlayerId,
    pub balance: f64,
    pub total_games: u64,
    pub wins: u64,
    pub total_winnings: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FlipRequest {
    pub player_id: PlayerId,
    pub bet_amount: f64,
    pub selected_side: CoinSide,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct FlipOutcome {
    pub result_side: CoinSide,
    pub won: bool,
    #[serde(default)]
    pub win_amount: f64,
    pub balance: f64,
    pub total_games: u64,
    pub wins: u64,
    pub total_winnings: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DepositRequest {
    pub player_id: PlayerId,
    pub amount: f64,
}

/// Where and how to send funds for a deposit.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct DepositInstructions {
    pub amount: f64,
    pub ton_wallet: String,
    pub memo: String,
    #[serde(default)]
    pub transaction_id: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WithdrawalRequest {
    pub player_id: PlayerId,
    pub amount: f64,
    pub ton_address: String,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct WithdrawalReceipt {
    pub transaction_id: u64,
    pub status: String,
}

/// Request/response surface of the game authority.
///
/// Implementations return [`crate::Error::Authority`] when the authority
/// answers with an explicit error payload and [`crate::Error::Transport`]
/// when the exchange itself fails or the payload is malformed.
pub trait Authority {
    fn get_or_create_player(
        &self,
        request: &PlayerRequest,
    ) -> impl Future<Output = Result<PlayerAccount>>;

    fn play(&self, request: &FlipRequest) -> impl Future<Output = Result<FlipOutcome>>;

    fn create_deposit(
        &self,
        request: &DepositRequest,
    ) -> impl Future<Output = Result<DepositInstructions>>;

    fn create_withdrawal(
        &self,
        request: &WithdrawalRequest,
    ) -> impl Future<Output = Result<WithdrawalReceipt>>;
}
