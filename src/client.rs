use crate::input::{
    self,
    UserEvent,
};
use coinflip_client::{
    Error,
    authority::HttpAuthority,
    config::ClientConfig,
    flip::FlipOrchestrator,
    identity::{
        Bootstrapper,
        Chain,
        EnvIdentity,
        StaticIdentity,
        UserIdentity,
    },
    notify::{
        ChannelNotifier,
        LogNotifier,
        Notice,
        Notifier,
    },
    session::{
        SessionSnapshot,
        SessionStore,
    },
    validator::{
        self,
        Rejection,
    },
    wallet::{
        DepositForm,
        WalletOrchestrator,
        WithdrawalForm,
    },
};
use color_eyre::eyre::{
    Result,
    WrapErr,
};
use std::rc::Rc;
use tokio::{
    io::{
        AsyncBufReadExt,
        BufReader,
    },
    sync::mpsc,
    task,
};
use tracing::{
    debug,
    info,
};

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub client: ClientConfig,
    pub host_identity: Option<UserIdentity>,
}

pub struct AppController {
    store: SessionStore,
    bootstrapper: Bootstrapper<HttpAuthority, ChannelNotifier>,
    flips: Rc<FlipOrchestrator<HttpAuthority, ChannelNotifier>>,
    wallet: WalletOrchestrator<HttpAuthority, ChannelNotifier>,
    deposit_form: DepositForm,
    withdrawal_form: WithdrawalForm,
}

impl AppController {
    pub fn new(config: &ClientConfig, notifier: ChannelNotifier) -> Result<Self> {
        let authority = HttpAuthority::new(&config.api_url, config.request_timeout())
            .wrap_err("building game server client failed")?;
        let store = SessionStore::new();
        let flips = FlipOrchestrator::new(authority.clone(), store.clone(), notifier.clone())
            .with_reveal_delay(config.reveal_delay());
        Ok(Self {
            bootstrapper: Bootstrapper::new(authority.clone(), store.clone(), notifier.clone()),
            flips: Rc::new(flips),
            wallet: WalletOrchestrator::new(authority, store.clone(), notifier),
            store,
            deposit_form: DepositForm::default(),
            withdrawal_form: WithdrawalForm::default(),
        })
    }

    /// Starts a flip on the local task set; the result arrives as a notice.
    fn start_flip(&self) {
        let flips = Rc::clone(&self.flips);
        task::spawn_local(async move {
            if let Err(err) = flips.flip().await {
                debug!(%err, "flip ended without a result");
            }
        });
    }

    /// Applies one event. Returns `false` when the player asked to quit.
    async fn handle(&mut self, event: UserEvent) -> bool {
        match event {
            UserEvent::Quit => return false,
            UserEvent::Help => println!("{}", input::HELP),
            UserEvent::SelectSide(side) => match self.store.select_side(side) {
                Ok(()) => println!("side: {side}"),
                Err(rejection) => println!("{}", rejection.user_message()),
            },
            UserEvent::SetBet(amount) => match self.store.set_bet_amount(amount) {
                Ok(()) => println!("bet: {amount} TON"),
                Err(rejection) => println!("{}", rejection.user_message()),
            },
            UserEvent::Flip => match flip_preview(&self.store.snapshot()) {
                Ok(preview) => {
                    println!("{preview}");
                    self.start_flip();
                }
                Err(rejection) => println!("{}", rejection.user_message()),
            },
            UserEvent::Deposit { amount } => {
                self.deposit_form.amount = amount;
                if let Err(err) = self.wallet.deposit(&mut self.deposit_form).await {
                    debug!(%err, "deposit ended without instructions");
                }
            }
            UserEvent::Withdraw { amount, address } => {
                self.withdrawal_form = WithdrawalForm { amount, address };
                if let Err(err) = self.wallet.withdraw(&mut self.withdrawal_form).await {
                    debug!(%err, "withdrawal ended without a receipt");
                }
            }
            UserEvent::Profile => print_profile(&self.store.snapshot()),
            UserEvent::Refresh => match self.bootstrapper.refresh().await {
                Ok(snapshot) => print_profile(&snapshot),
                Err(Error::NotBootstrapped) => {
                    println!("Not connected to the game server yet")
                }
                Err(_) => {}
            },
        }
        true
    }
}

/// Checks the wager the way the orchestrator will, before announcing it.
fn flip_preview(snapshot: &SessionSnapshot) -> Result<String, Rejection> {
    let request = validator::validate_flip(snapshot.phase, &snapshot.player, &snapshot.wager)?;
    Ok(format!(
        "flipping {} TON on {}...",
        request.bet_amount, request.selected_side
    ))
}

fn print_profile(snapshot: &SessionSnapshot) {
    let name = snapshot
        .identity
        .as_ref()
        .map(|identity| identity.display_name.as_str())
        .unwrap_or("-");
    let side = snapshot
        .wager
        .selected_side
        .map(|side| side.to_string())
        .unwrap_or_else(|| "none".to_string());
    let last = snapshot
        .last_result
        .map(|side| side.to_string())
        .unwrap_or_else(|| "-".to_string());
    println!(
        "{name}: balance {} TON | games {} | wins {} | losses {} | win rate {:.1}% | avg bet {:.2}\n\
         bet {} TON on {side} | last result {last}{}",
        snapshot.player.balance,
        snapshot.player.total_games,
        snapshot.player.wins,
        snapshot.losses(),
        snapshot.win_rate(),
        snapshot.average_bet(),
        snapshot.wager.bet_amount,
        if snapshot.is_busy() { " | flipping" } else { "" },
    );
}

pub async fn run_app(config: AppConfig) -> Result<()> {
    let (notifier, notices) = ChannelNotifier::channel();
    let controller = AppController::new(&config.client, notifier)?;

    let provider = Chain(StaticIdentity(config.host_identity), EnvIdentity);
    info!(api_url = %config.client.api_url, "connecting to game server");
    if let Ok(snapshot) = controller.bootstrapper.bootstrap(&provider).await {
        print_profile(&snapshot);
    }
    println!("{}", input::HELP);

    run_loop(controller, notices).await
}

async fn run_loop(
    mut controller: AppController,
    mut notices: mpsc::UnboundedReceiver<Notice>,
) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            Some(notice) = notices.recv() => {
                println!("{notice}");
                LogNotifier.notify(notice);
            }
            line = lines.next_line() => {
                let Some(line) = line.wrap_err("reading input failed")? else {
                    break;
                };
                let event = match input::interpret_line(&line) {
                    Ok(Some(event)) => event,
                    Ok(None) => continue,
                    Err(message) => {
                        println!("{message}");
                        continue;
                    }
                };
                if !controller.handle(event).await {
                    break;
                }
            }
        }
    }
    info!("session closed");
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use coinflip_client::{
        session::CoinSide,
        test_helpers::{
            account,
            identity,
        },
    };

    #[test]
    fn flip_preview__announces_valid_wager() {
        // given
        let store = SessionStore::new();
        store.seed(identity(42, "alice"), &account(1, 100.0)).unwrap();
        store.select_side(CoinSide::Tails).unwrap();

        // when
        let preview = flip_preview(&store.snapshot());

        // then
        assert_eq!(Ok("flipping 10 TON on tails...".to_string()), preview);
    }

    #[test]
    fn flip_preview__reports_rejection_instead_of_announcing() {
        let store = SessionStore::new();
        store.seed(identity(42, "alice"), &account(1, 5.0)).unwrap();

        assert_eq!(
            Err(Rejection::NoSideSelected),
            flip_preview(&store.snapshot())
        );

        store.select_side(CoinSide::Heads).unwrap();
        assert_eq!(
            Err(Rejection::InsufficientFunds),
            flip_preview(&store.snapshot())
        );
    }
}
