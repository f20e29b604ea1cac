use crate::{
    Error,
    Result,
    authority::{
        FlipOutcome,
        FlipRequest,
        PlayerAccount,
        PlayerId,
    },
    identity::UserIdentity,
    validator::{
        self,
        Rejection,
    },
};
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    fmt,
    str::FromStr,
    sync::{
        Arc,
        Mutex,
        MutexGuard,
        PoisonError,
    },
};
use tracing::warn;

pub const DEFAULT_BET: f64 = 10.0;
pub const BET_PRESETS: [f64; 4] = [5.0, 10.0, 25.0, 50.0];

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoinSide {
    Heads,
    Tails,
}

impl fmt::Display for CoinSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoinSide::Heads => write!(f, "heads"),
            CoinSide::Tails => write!(f, "tails"),
        }
    }
}

impl FromStr for CoinSide {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "heads" | "h" => Ok(CoinSide::Heads),
            "tails" | "t" => Ok(CoinSide::Tails),
            other => Err(format!("unknown coin side: {other}")),
        }
    }
}

/// Where the current flip is in its request/reveal sequence.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum FlipPhase {
    #[default]
    Idle,
    Submitting,
    AwaitingReveal,
    Resolved,
}

impl FlipPhase {
    pub fn is_busy(self) -> bool {
        matches!(self, FlipPhase::Submitting | FlipPhase::AwaitingReveal)
    }
}

/// Client view of the server-owned player ledger.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlayerSession {
    pub player_id: Option<PlayerId>,
    pub balance: f64,
    pub total_games: u64,
    pub wins: u64,
    pub total_winnings: f64,
}

impl PlayerSession {
    fn apply_account(&mut self, account: &PlayerAccount) -> Result<()> {
        check_ledger(
            account.balance,
            account.total_games,
            account.wins,
            account.total_winnings,
        )?;
        self.player_id = Some(account.player_id);
        self.balance = account.balance;
        self.total_games = account.total_games;
        self.wins = account.wins;
        self.total_winnings = account.total_winnings;
        Ok(())
    }

    fn apply_outcome(&mut self, outcome: &FlipOutcome) -> Result<()> {
        check_outcome(outcome)?;
        if outcome.total_games != self.total_games + 1 {
            warn!(
                before = self.total_games,
                after = outcome.total_games,
                "authority game count moved by more than one flip"
            );
        }
        self.balance = outcome.balance;
        self.total_games = outcome.total_games;
        self.wins = outcome.wins;
        self.total_winnings = outcome.total_winnings;
        Ok(())
    }
}

fn check_outcome(outcome: &FlipOutcome) -> Result<()> {
    check_ledger(
        outcome.balance,
        outcome.total_games,
        outcome.wins,
        outcome.total_winnings,
    )?;
    if !outcome.win_amount.is_finite() || outcome.win_amount < 0.0 {
        return Err(Error::InvalidOutcome(format!(
            "win amount {}",
            outcome.win_amount
        )));
    }
    Ok(())
}

fn check_ledger(balance: f64, total_games: u64, wins: u64, total_winnings: f64) -> Result<()> {
    if !balance.is_finite() || balance < 0.0 {
        return Err(Error::InvalidOutcome(format!("balance {balance}")));
    }
    if !total_winnings.is_finite() || total_winnings < 0.0 {
        return Err(Error::InvalidOutcome(format!(
            "total winnings {total_winnings}"
        )));
    }
    if wins > total_games {
        return Err(Error::InvalidOutcome(format!(
            "{wins} wins out of {total_games} games"
        )));
    }
    Ok(())
}

#[derive(Clone, Debug, PartialEq)]
pub struct WagerIntent {
    pub bet_amount: f64,
    pub selected_side: Option<CoinSide>,
}

impl Default for WagerIntent {
    fn default() -> Self {
        Self {
            bet_amount: DEFAULT_BET,
            selected_side: None,
        }
    }
}

/// Point-in-time copy of everything the host renders.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SessionSnapshot {
    pub player: PlayerSession,
    pub wager: WagerIntent,
    pub last_result: Option<CoinSide>,
    pub phase: FlipPhase,
    pub identity: Option<UserIdentity>,
}

impl SessionSnapshot {
    pub fn is_ready(&self) -> bool {
        self.player.player_id.is_some()
    }

    pub fn is_busy(&self) -> bool {
        self.phase.is_busy()
    }

    pub fn losses(&self) -> u64 {
        self.player.total_games.saturating_sub(self.player.wins)
    }

    /// Percentage of games won, 0 before the first game.
    pub fn win_rate(&self) -> f64 {
        if self.player.total_games == 0 {
            return 0.0;
        }
        self.player.wins as f64 / self.player.total_games as f64 * 100.0
    }

    /// Winnings pay out double the stake, so half the winnings per game
    /// approximates the average stake.
    pub fn average_bet(&self) -> f64 {
        if self.player.total_games == 0 {
            return 0.0;
        }
        self.player.total_winnings / self.player.total_games as f64 / 2.0
    }
}

#[derive(Debug, Default)]
struct SessionState {
    player: PlayerSession,
    wager: WagerIntent,
    last_result: Option<CoinSide>,
    phase: FlipPhase,
    identity: Option<UserIdentity>,
}

impl SessionState {
    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            player: self.player.clone(),
            wager: self.wager.clone(),
            last_result: self.last_result,
            phase: self.phase,
            identity: self.identity.clone(),
        }
    }
}

/// Single owner of the player session.
///
/// Clones share the same state. Every update takes the lock once, so a
/// reader never observes a half-applied outcome. The lock is never held
/// across an await point.
#[derive(Clone, Debug, Default)]
pub struct SessionStore {
    state: Arc<Mutex<SessionState>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.lock().snapshot()
    }

    pub fn player_id(&self) -> Option<PlayerId> {
        self.lock().player.player_id
    }

    pub fn phase(&self) -> FlipPhase {
        self.lock().phase
    }

    /// Bet controls are locked while a flip is in flight.
    pub fn select_side(&self, side: CoinSide) -> Result<(), Rejection> {
        let mut state = self.lock();
        if state.phase.is_busy() {
            return Err(Rejection::FlipInProgress);
        }
        state.wager.selected_side = Some(side);
        Ok(())
    }

    pub fn set_bet_amount(&self, amount: f64) -> Result<(), Rejection> {
        let mut state = self.lock();
        if state.phase.is_busy() {
            return Err(Rejection::FlipInProgress);
        }
        state.wager.bet_amount = amount;
        Ok(())
    }

    /// Writes the bootstrapped account. Only the first successful call lands.
    pub fn seed(&self, identity: UserIdentity, account: &PlayerAccount) -> Result<()> {
        let mut state = self.lock();
        if state.player.player_id.is_some() {
            return Err(Error::AlreadyBootstrapped);
        }
        state.player.apply_account(account)?;
        state.identity = Some(identity);
        Ok(())
    }

    /// Overwrites balance and stats with a fresh fetch of the same account.
    pub fn refresh_account(&self, account: &PlayerAccount) -> Result<()> {
        let mut state = self.lock();
        let Some(current) = state.player.player_id else {
            return Err(Error::NotBootstrapped);
        };
        if state.phase.is_busy() {
            return Err(Rejection::FlipInProgress.into());
        }
        if current != account.player_id {
            return Err(Error::InvalidOutcome(format!(
                "refresh returned player {} for session player {}",
                account.player_id, current
            )));
        }
        state.player.apply_account(account)
    }

    /// Validates the wager and marks the flip as submitting in one step.
    ///
    /// The returned ticket holds the busy lock until it is resolved or dropped.
    pub fn begin_flip(&self) -> Result<FlipTicket, Rejection> {
        let mut state = self.lock();
        let request = validator::validate_flip(state.phase, &state.player, &state.wager)?;
        state.phase = FlipPhase::Submitting;
        Ok(FlipTicket {
            store: self.clone(),
            request,
            settled: false,
        })
    }
}

/// Proof that a flip holds the busy lock.
#[derive(Debug)]
pub struct FlipTicket {
    store: SessionStore,
    request: FlipRequest,
    settled: bool,
}

impl FlipTicket {
    pub fn request(&self) -> &FlipRequest {
        &self.request
    }

    /// Checks the authority's outcome and moves on to awaiting the reveal.
    ///
    /// A rejected outcome leaves the phase alone; dropping the ticket then
    /// releases the lock without waiting for the reveal.
    pub fn response_received(&self, outcome: &FlipOutcome) -> Result<()> {
        check_outcome(outcome)?;
        self.store.lock().phase = FlipPhase::AwaitingReveal;
        Ok(())
    }

    /// Commits the authority's outcome and releases the lock.
    ///
    /// On error nothing is written and the lock is released by drop.
    pub fn resolve(mut self, outcome: &FlipOutcome) -> Result<()> {
        let mut state = self.store.lock();
        let mut player = state.player.clone();
        player.apply_outcome(outcome)?;
        state.player = player;
        state.last_result = Some(outcome.result_side);
        state.wager.selected_side = None;
        state.phase = FlipPhase::Resolved;
        drop(state);
        self.settled = true;
        Ok(())
    }
}

impl Drop for FlipTicket {
    fn drop(&mut self) {
        if !self.settled {
            self.store.lock().phase = FlipPhase::Idle;
        }
    }
}
