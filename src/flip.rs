//! One flip: lock, request, reveal gate, commit.

use crate::{
    Result,
    authority::{
        Authority,
        FlipOutcome,
    },
    notify::{
        Notice,
        Notifier,
    },
    session::SessionStore,
};
use std::time::Duration;
use tokio::time;
use tracing::{
    debug,
    info,
    warn,
};

/// Minimum time between submitting a flip and revealing its result.
pub const REVEAL_DELAY: Duration = Duration::from_millis(2000);

const FLIP_FAILED: &str = "Flip failed, please try again";

pub struct FlipOrchestrator<A, N> {
    authority: A,
    store: SessionStore,
    notifier: N,
    reveal_delay: Duration,
}

impl<A, N> FlipOrchestrator<A, N> {
    pub fn new(authority: A, store: SessionStore, notifier: N) -> Self {
        Self {
            authority,
            store,
            notifier,
            reveal_delay: REVEAL_DELAY,
        }
    }

    pub fn with_reveal_delay(mut self, reveal_delay: Duration) -> Self {
        self.reveal_delay = reveal_delay;
        self
    }

    pub fn reveal_delay(&self) -> Duration {
        self.reveal_delay
    }
}

impl<A: Authority, N: Notifier> FlipOrchestrator<A, N> {
    /// Runs a flip with the session's current wager.
    ///
    /// The session is written at most once, after both the authority's
    /// response and the reveal delay (counted from submission). Failures
    /// release the lock at once and leave the session untouched.
    pub async fn flip(&self) -> Result<FlipOutcome> {
        let ticket = match self.store.begin_flip() {
            Ok(ticket) => ticket,
            Err(rejection) => {
                debug!(%rejection, "flip rejected");
                self.notifier.notify(Notice::error(rejection.user_message()));
                return Err(rejection.into());
            }
        };
        let request = ticket.request().clone();
        let reveal = time::sleep(self.reveal_delay);
        debug!(?request, "submitting flip");

        let outcome = match self.authority.play(&request).await {
            Ok(outcome) => outcome,
            Err(err) => {
                drop(ticket);
                warn!(%err, "flip request failed");
                self.notifier.notify(Notice::error(FLIP_FAILED));
                return Err(err);
            }
        };
        if let Err(err) = ticket.response_received(&outcome) {
            drop(ticket);
            warn!(%err, "discarding flip outcome");
            self.notifier.notify(Notice::error(FLIP_FAILED));
            return Err(err);
        }
        reveal.await;

        if let Err(err) = ticket.resolve(&outcome) {
            warn!(%err, "discarding flip outcome");
            self.notifier.notify(Notice::error(FLIP_FAILED));
            return Err(err);
        }
        info!(
            side = %request.selected_side,
            result = %outcome.result_side,
            won = outcome.won,
            balance = outcome.balance,
            "flip resolved"
        );
        let notice = if outcome.won {
            Notice::success(format!("You won {} TON!", outcome.win_amount))
        } else {
            Notice::error(format!("You lost {} TON", request.bet_amount))
        };
        self.notifier.notify(notice);
        Ok(outcome)
    }
}
