//! Deposit and withdrawal requests.
//!
//! Neither flow touches the session ledger: balance only moves through a
//! flip or an explicit account refresh.

use crate::{
    Error,
    Result,
    authority::{
        Authority,
        DepositInstructions,
        WithdrawalReceipt,
    },
    notify::{
        Notice,
        Notifier,
    },
    session::SessionStore,
    validator,
};
use tracing::{
    info,
    warn,
};

const DEPOSIT_FAILED: &str = "Failed to create deposit request";
const WITHDRAWAL_FAILED: &str = "Withdrawal request failed";
const WITHDRAWAL_SUBMITTED: &str = "Withdrawal request submitted";

/// Deposit input as typed by the player.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DepositForm {
    pub amount: String,
}

/// Withdrawal input as typed by the player.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct WithdrawalForm {
    pub amount: String,
    pub address: String,
}

pub struct WalletOrchestrator<A, N> {
    authority: A,
    store: SessionStore,
    notifier: N,
}

impl<A, N> WalletOrchestrator<A, N> {
    pub fn new(authority: A, store: SessionStore, notifier: N) -> Self {
        Self {
            authority,
            store,
            notifier,
        }
    }
}

impl<A: Authority, N: Notifier> WalletOrchestrator<A, N> {
    /// Requests deposit instructions. The form is cleared only on success.
    pub async fn deposit(&self, form: &mut DepositForm) -> Result<DepositInstructions> {
        let request = match validator::validate_deposit(self.store.player_id(), &form.amount)
        {
            Ok(request) => request,
            Err(rejection) => {
                self.notifier.notify(Notice::error(rejection.user_message()));
                return Err(rejection.into());
            }
        };
        match self.authority.create_deposit(&request).await {
            Ok(instructions) => {
                info!(
                    amount = instructions.amount,
                    memo = %instructions.memo,
                    "deposit instructions received"
                );
                self.notifier.notify(Notice::info(format!(
                    "Send {} TON to {} with memo {}",
                    instructions.amount, instructions.ton_wallet, instructions.memo
                )));
                *form = DepositForm::default();
                Ok(instructions)
            }
            Err(err) => {
                warn!(%err, "deposit request failed");
                self.notifier.notify(Notice::error(DEPOSIT_FAILED));
                Err(err)
            }
        }
    }

    /// Requests a withdrawal. The authority's own error text is shown as is.
    pub async fn withdraw(&self, form: &mut WithdrawalForm) -> Result<WithdrawalReceipt> {
        let request = match validator::validate_withdrawal(
            self.store.player_id(),
            &form.amount,
            &form.address,
        ) {
            Ok(request) => request,
            Err(rejection) => {
                self.notifier.notify(Notice::error(rejection.user_message()));
                return Err(rejection.into());
            }
        };
        match self.authority.create_withdrawal(&request).await {
            Ok(receipt) => {
                info!(
                    amount = request.amount,
                    transaction_id = receipt.transaction_id,
                    status = %receipt.status,
                    "withdrawal submitted"
                );
                self.notifier.notify(Notice::success(WITHDRAWAL_SUBMITTED));
                *form = WithdrawalForm::default();
                Ok(receipt)
            }
            Err(Error::Authority(message)) => {
                warn!(%message, "withdrawal rejected by authority");
                self.notifier.notify(Notice::error(message.clone()));
                Err(Error::Authority(message))
            }
            Err(err) => {
                warn!(%err, "withdrawal request failed");
                self.notifier.notify(Notice::error(WITHDRAWAL_FAILED));
                Err(err)
            }
        }
    }
}
