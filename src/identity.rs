//! Resolving who is playing and registering them with the authority.

use crate::{
    Error,
    Result,
    authority::{
        Authority,
        PlayerRequest,
    },
    notify::{
        Notice,
        Notifier,
    },
    session::{
        SessionSnapshot,
        SessionStore,
    },
};
use rand::Rng;
use std::sync::atomic::{
    AtomicBool,
    Ordering,
};
use tracing::{
    info,
    warn,
};

pub const DEFAULT_DISPLAY_NAME: &str = "Player";
pub const USER_ID_VAR: &str = "COINFLIP_USER_ID";
pub const USERNAME_VAR: &str = "COINFLIP_USERNAME";

const CONNECTION_FAILED: &str = "Failed to connect to the game server";
const REFRESH_FAILED: &str = "Failed to refresh account";

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct UserIdentity {
    pub user_id: u64,
    pub display_name: String,
}

/// A source of the host environment's user, if it has one.
pub trait IdentityProvider {
    fn try_get_user(&self) -> Option<UserIdentity>;
}

/// Identity handed over by the host directly.
#[derive(Clone, Debug, Default)]
pub struct StaticIdentity(pub Option<UserIdentity>);

impl IdentityProvider for StaticIdentity {
    fn try_get_user(&self) -> Option<UserIdentity> {
        self.0.clone()
    }
}

/// Identity read from `COINFLIP_USER_ID` / `COINFLIP_USERNAME`.
#[derive(Clone, Copy, Debug, Default)]
pub struct EnvIdentity;

impl EnvIdentity {
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<UserIdentity> {
        let user_id = lookup(USER_ID_VAR)?.trim().parse::<u64>().ok()?;
        let display_name = lookup(USERNAME_VAR)
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| DEFAULT_DISPLAY_NAME.to_string());
        Some(UserIdentity {
            user_id,
            display_name,
        })
    }
}

impl IdentityProvider for EnvIdentity {
    fn try_get_user(&self) -> Option<UserIdentity> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}

/// Fallback provider: a random numeric id under the default display name.
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomIdentity;

impl RandomIdentity {
    pub fn generate(&self) -> UserIdentity {
        UserIdentity {
            user_id: rand::rng().random_range(100_000_000..=999_999_999),
            display_name: DEFAULT_DISPLAY_NAME.to_string(),
        }
    }
}

impl IdentityProvider for RandomIdentity {
    fn try_get_user(&self) -> Option<UserIdentity> {
        Some(self.generate())
    }
}

/// Asks the first provider, then the second.
#[derive(Clone, Debug, Default)]
pub struct Chain<A, B>(pub A, pub B);

impl<A: IdentityProvider, B: IdentityProvider> IdentityProvider for Chain<A, B> {
    fn try_get_user(&self) -> Option<UserIdentity> {
        self.0.try_get_user().or_else(|| self.1.try_get_user())
    }
}

/// The provider's user, or a freshly generated fallback.
pub fn resolve_identity(provider: &impl IdentityProvider) -> UserIdentity {
    provider
        .try_get_user()
        .unwrap_or_else(|| RandomIdentity.generate())
}

/// Registers the player once at startup and seeds the session.
pub struct Bootstrapper<A, N> {
    authority: A,
    store: SessionStore,
    notifier: N,
    attempted: AtomicBool,
}

impl<A, N> Bootstrapper<A, N> {
    pub fn new(authority: A, store: SessionStore, notifier: N) -> Self {
        Self {
            authority,
            store,
            notifier,
            attempted: AtomicBool::new(false),
        }
    }
}

impl<A: Authority, N: Notifier> Bootstrapper<A, N> {
    /// Issues the single get-or-create request.
    ///
    /// On failure the session keeps its defaults and no retry is made; a
    /// second call is refused without contacting the authority.
    pub async fn bootstrap(
        &self,
        provider: &impl IdentityProvider,
    ) -> Result<SessionSnapshot> {
        if self.attempted.swap(true, Ordering::SeqCst) {
            return Err(Error::AlreadyBootstrapped);
        }
        let identity = resolve_identity(provider);
        let request = PlayerRequest {
            telegram_id: identity.user_id,
            username: identity.display_name.clone(),
        };
        let seeded = match self.authority.get_or_create_player(&request).await {
            Ok(account) => self.store.seed(identity, &account),
            Err(err) => Err(err),
        };
        match seeded {
            Ok(()) => {
                let snapshot = self.store.snapshot();
                info!(
                    user_id = request.telegram_id,
                    player_id = ?snapshot.player.player_id,
                    balance = snapshot.player.balance,
                    "player session bootstrapped"
                );
                Ok(snapshot)
            }
            Err(err) => {
                warn!(%err, "player bootstrap failed");
                self.notifier.notify(Notice::error(CONNECTION_FAILED));
                Err(err)
            }
        }
    }

    /// Re-fetches the bootstrapped account and overwrites balance and stats.
    pub async fn refresh(&self) -> Result<SessionSnapshot> {
        let snapshot = self.store.snapshot();
        let (Some(_), Some(identity)) = (snapshot.player.player_id, snapshot.identity) else {
            return Err(Error::NotBootstrapped);
        };
        let request = PlayerRequest {
            telegram_id: identity.user_id,
            username: identity.display_name,
        };
        let refreshed = match self.authority.get_or_create_player(&request).await {
            Ok(account) => self.store.refresh_account(&account),
            Err(err) => Err(err),
        };
        match refreshed {
            Ok(()) => Ok(self.store.snapshot()),
            Err(Error::Validation(rejection)) => {
                self.notifier.notify(Notice::error(rejection.user_message()));
                Err(rejection.into())
            }
            Err(err) => {
                warn!(%err, "account refresh failed");
                self.notifier.notify(Notice::error(REFRESH_FAILED));
                Err(err)
            }
        }
    }
}
