use crate::{
    Error,
    Result,
    authority::http::DEFAULT_TIMEOUT,
    flip::REVEAL_DELAY,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    fs,
    path::{
        Path,
        PathBuf,
    },
    time::Duration,
};
use url::Url;

pub const CONFIG_ROOT: &str = "~/.coinflip";
const CONFIG_FILE: &str = "config.json";
pub const DEFAULT_API_URL: &str = "http://localhost:8080/game";
pub const API_URL_VAR: &str = "COINFLIP_API_URL";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub api_url: String,
    pub reveal_delay_ms: u64,
    pub request_timeout_secs: u64,
    pub log_dir: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            reveal_delay_ms: REVEAL_DELAY.as_millis() as u64,
            request_timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            log_dir: format!("{CONFIG_ROOT}/logs"),
        }
    }
}

impl ClientConfig {
    /// Reads the config at `path`, or the default location when `None`.
    ///
    /// The default file is created with default values if it does not exist
    /// yet; an explicit path must exist.
    pub fn load(path: Option<&str>) -> Result<Self> {
        match path {
            Some(raw) => Self::from_file(expand(raw)),
            None => {
                let path = ensure_default_file()?;
                Self::from_file(path)
            }
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read(path).map_err(|e| {
            Error::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        if data.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(&data).map_err(|e| {
            Error::Config(format!("failed to parse {}: {e}", path.display()))
        })
    }

    /// Applies environment overrides using `lookup` for variable access.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(API_URL_VAR).filter(|url| !url.trim().is_empty()) {
            self.api_url = url.trim().to_string();
        }
    }

    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.api_url)
            .map_err(|e| Error::Config(format!("invalid api_url {}: {e}", self.api_url)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "api_url must be http or https, got {}",
                url.scheme()
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(Error::Config("request_timeout_secs must be positive".into()));
        }
        Ok(())
    }

    pub fn reveal_delay(&self) -> Duration {
        Duration::from_millis(self.reveal_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn log_dir(&self) -> PathBuf {
        expand(&self.log_dir)
    }
}

fn expand(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).into_owned())
}

fn ensure_default_file() -> Result<PathBuf> {
    let root = expand(CONFIG_ROOT);
    if !root.exists() {
        fs::create_dir_all(&root).map_err(|e| {
            Error::Config(format!("failed to create {}: {e}", root.display()))
        })?;
    }
    let file_path = root.join(CONFIG_FILE);
    if !file_path.exists() {
        let json = serde_json::to_vec_pretty(&ClientConfig::default())
            .map_err(|e| Error::Config(format!("failed to serialize defaults: {e}")))?;
        fs::write(&file_path, json).map_err(|e| {
            Error::Config(format!("failed to write {}: {e}", file_path.display()))
        })?;
    }
    Ok(file_path)
}
