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
        PlayerRequest,
        WithdrawalReceipt,
        WithdrawalRequest,
    },
    error::TransportError,
};
use reqwest::Client as HttpClient;
use serde::{
    Serialize,
    de::DeserializeOwned,
};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Default timeout for a single authority request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Request body: the action name next to the action's own fields.
#[derive(Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum Action<'a> {
    GetOrCreatePlayer(&'a PlayerRequest),
    Play(&'a FlipRequest),
    CreateDeposit(&'a DepositRequest),
    CreateWithdrawal(&'a WithdrawalRequest),
}

impl Action<'_> {
    fn name(&self) -> &'static str {
        match self {
            Action::GetOrCreatePlayer(_) => "get_or_create_player",
            Action::Play(_) => "play",
            Action::CreateDeposit(_) => "create_deposit",
            Action::CreateWithdrawal(_) => "create_withdrawal",
        }
    }
}

/// Authority reached over a single JSON POST endpoint.
#[derive(Clone, Debug)]
pub struct HttpAuthority {
    endpoint: Url,
    http: HttpClient,
}

impl HttpAuthority {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let endpoint = Url::parse(endpoint).map_err(TransportError::from)?;
        match endpoint.scheme() {
            "http" | "https" => {}
            scheme => {
                return Err(Error::Config(format!(
                    "invalid URL scheme: {scheme} (expected http or https)"
                )));
            }
        }
        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .map_err(TransportError::from)?;
        Ok(Self { endpoint, http })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn call<T: DeserializeOwned>(&self, action: Action<'_>) -> Result<T> {
        debug!(action = action.name(), url = %self.endpoint, "calling authority");
        let res = self
            .http
            .post(self.endpoint.clone())
            .json(&action)
            .send()
            .await
            .map_err(TransportError::from)?;
        let status = res.status();
        let bytes = res.bytes().await.map_err(TransportError::from)?;
        decode_response(status, &bytes)
    }
}

/// Any non-null `error` payload wins over the status code; everything else
/// must be a success status carrying every required field.
fn decode_response<T: DeserializeOwned>(
    status: reqwest::StatusCode,
    bytes: &[u8],
) -> Result<T> {
    let body: Option<Value> = serde_json::from_slice(bytes).ok();
    if let Some(error) = body
        .as_ref()
        .and_then(|value| value.get("error"))
        .filter(|error| !error.is_null())
    {
        let message = match error.as_str() {
            Some(text) => text.to_string(),
            None => error.to_string(),
        };
        debug!(%status, %message, "authority rejected request");
        return Err(Error::Authority(message));
    }
    if !status.is_success() {
        return Err(TransportError::Status(status).into());
    }
    match body {
        Some(value) => Ok(serde_json::from_value(value).map_err(TransportError::from)?),
        None => Ok(serde_json::from_slice(bytes).map_err(TransportError::from)?),
    }
}

impl Authority for HttpAuthority {
    async fn get_or_create_player(&self, request: &PlayerRequest) -> Result<PlayerAccount> {
        self.call(Action::GetOrCreatePlayer(request)).await
    }

    async fn play(&self, request: &FlipRequest) -> Result<FlipOutcome> {
        self.call(Action::Play(request)).await
    }

    async fn create_deposit(&self, request: &DepositRequest) -> Result<DepositInstructions> {
        self.call(Action::CreateDeposit(request)).await
    }

    async fn create_withdrawal(
        &self,
        request: &WithdrawalRequest,
    ) -> Result<WithdrawalReceipt> {
        self.call(Action::CreateWithdrawal(request)).await
    }
}
