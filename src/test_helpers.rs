//! Scripted collaborators for exercising the session without a server.

use crate::{
    Error,
    Result,
    authority::{
        Authority,
        DepositInstructions,
        DepositRequest,
        FlipOutcome,
        FlipRequest,
        PlayerAccount,
        PlayerId,
        PlayerRequest,
        WithdrawalReceipt,
        WithdrawalRequest,
    },
    flip::FlipOrchestrator,
    identity::{
        Bootstrapper,
        UserIdentity,
    },
    notify::{
        Notice,
        NoticeLevel,
        Notifier,
    },
    session::{
        CoinSide,
        SessionStore,
    },
    wallet::WalletOrchestrator,
};
use std::{
    collections::VecDeque,
    sync::{
        Arc,
        Mutex,
    },
    time::Duration,
};
use tokio::time;

/// A request the fake authority received.
#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    GetOrCreatePlayer(PlayerRequest),
    Play(FlipRequest),
    CreateDeposit(DepositRequest),
    CreateWithdrawal(WithdrawalRequest),
}

#[derive(Default)]
struct Script {
    players: VecDeque<Result<PlayerAccount>>,
    flips: VecDeque<Result<FlipOutcome>>,
    deposits: VecDeque<Result<DepositInstructions>>,
    withdrawals: VecDeque<Result<WithdrawalReceipt>>,
    latency: Duration,
    calls: Vec<Call>,
}

/// Authority answering from queued responses, optionally after a delay.
///
/// An action with nothing queued answers with an authority error.
#[derive(Clone, Default)]
pub struct FakeAuthority {
    script: Arc<Mutex<Script>>,
}

impl FakeAuthority {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_player(&self, response: Result<PlayerAccount>) {
        self.script.lock().unwrap().players.push_back(response);
    }

    pub fn push_flip(&self, response: Result<FlipOutcome>) {
        self.script.lock().unwrap().flips.push_back(response);
    }

    pub fn push_deposit(&self, response: Result<DepositInstructions>) {
        self.script.lock().unwrap().deposits.push_back(response);
    }

    pub fn push_withdrawal(&self, response: Result<WithdrawalReceipt>) {
        self.script.lock().unwrap().withdrawals.push_back(response);
    }

    /// Every response is delayed by `latency` of (tokio) time.
    pub fn set_latency(&self, latency: Duration) {
        self.script.lock().unwrap().latency = latency;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.script.lock().unwrap().calls.clone()
    }

    pub fn play_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, Call::Play(_)))
            .count()
    }

    async fn answer<T>(
        &self,
        call: Call,
        pick: impl FnOnce(&mut Script) -> Option<Result<T>>,
    ) -> Result<T> {
        let (latency, response) = {
            let mut script = self.script.lock().unwrap();
            script.calls.push(call);
            (script.latency, pick(&mut *script))
        };
        if !latency.is_zero() {
            time::sleep(latency).await;
        }
        response.unwrap_or_else(|| Err(Error::Authority("no scripted response".into())))
    }
}

impl Authority for FakeAuthority {
    async fn get_or_create_player(&self, request: &PlayerRequest) -> Result<PlayerAccount> {
        self.answer(Call::GetOrCreatePlayer(request.clone()), |s| {
            s.players.pop_front()
        })
        .await
    }

    async fn play(&self, request: &FlipRequest) -> Result<FlipOutcome> {
        self.answer(Call::Play(request.clone()), |s| s.flips.pop_front())
            .await
    }

    async fn create_deposit(&self, request: &DepositRequest) -> Result<DepositInstructions> {
        self.answer(Call::CreateDeposit(request.clone()), |s| {
            s.deposits.pop_front()
        })
        .await
    }

    async fn create_withdrawal(
        &self,
        request: &WithdrawalRequest,
    ) -> Result<WithdrawalReceipt> {
        self.answer(Call::CreateWithdrawal(request.clone()), |s| {
            s.withdrawals.pop_front()
        })
        .await
    }
}

/// Keeps every notice for later inspection.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    notices: Arc<Mutex<Vec<Notice>>>,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<(NoticeLevel, String)> {
        self.notices()
            .into_iter()
            .map(|notice| (notice.level, notice.message))
            .collect()
    }

    pub fn last(&self) -> Option<(NoticeLevel, String)> {
        self.messages().pop()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().unwrap().push(notice);
    }
}

pub fn account(player_id: u64, balance: f64) -> PlayerAccount {
    PlayerAccount {
        player_id: PlayerId(player_id),
        balance,
        total_games: 0,
        wins: 0,
        total_winnings: 0.0,
    }
}

pub fn identity(user_id: u64, display_name: &str) -> UserIdentity {
    UserIdentity {
        user_id,
        display_name: display_name.to_string(),
    }
}

pub fn outcome(
    result_side: CoinSide,
    won: bool,
    win_amount: f64,
    balance: f64,
    total_games: u64,
    wins: u64,
    total_winnings: f64,
) -> FlipOutcome {
    FlipOutcome {
        result_side,
        won,
        win_amount,
        balance,
        total_games,
        wins,
        total_winnings,
    }
}

pub struct TestContext {
    pub store: SessionStore,
    pub authority: FakeAuthority,
    pub notifier: RecordingNotifier,
    pub bootstrapper: Bootstrapper<FakeAuthority, RecordingNotifier>,
    pub flips: FlipOrchestrator<FakeAuthority, RecordingNotifier>,
    pub wallet: WalletOrchestrator<FakeAuthority, RecordingNotifier>,
}

impl TestContext {
    /// A session that has not been bootstrapped.
    pub fn new() -> Self {
        let store = SessionStore::new();
        let authority = FakeAuthority::new();
        let notifier = RecordingNotifier::default();
        Self {
            bootstrapper: Bootstrapper::new(
                authority.clone(),
                store.clone(),
                notifier.clone(),
            ),
            flips: FlipOrchestrator::new(authority.clone(), store.clone(), notifier.clone()),
            wallet: WalletOrchestrator::new(
                authority.clone(),
                store.clone(),
                notifier.clone(),
            ),
            store,
            authority,
            notifier,
        }
    }

    /// A session seeded with player 1 holding `balance`, without any request.
    pub fn ready(balance: f64) -> Self {
        let ctx = Self::new();
        ctx.store
            .seed(identity(42, "alice"), &account(1, balance))
            .unwrap();
        ctx
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}
