use coinflip_client::{
    config::{
        self,
        ClientConfig,
    },
    identity::{
        DEFAULT_DISPLAY_NAME,
        UserIdentity,
    },
};
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use std::{
    path::Path,
    sync::OnceLock,
};
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling,
};
use tracing_subscriber::{
    EnvFilter,
    fmt,
};

mod client;
mod input;

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

fn print_usage_and_exit() -> ! {
    println!(
        "Usage: coinflip [--config <path>] [--api-url <url>] [--reveal-delay-ms <ms>]\n\
         [--log-dir <path>] [--user-id <id>] [--username <name>]\n\
         \n\
         Flags:\n\
           --config <path>         Read settings from this file (default {}/config.json)\n\
           --api-url <url>         Game server endpoint (default {})\n\
           --reveal-delay-ms <ms>  Minimum time before a flip result is shown\n\
           --log-dir <path>        Where daily log files are written\n\
           --user-id <id>          Play as this numeric user id\n\
           --username <name>       Display name for --user-id (default {})\n\
         \n\
         Environment: {} overrides the endpoint; {} and {} supply an identity.",
        config::CONFIG_ROOT,
        config::DEFAULT_API_URL,
        DEFAULT_DISPLAY_NAME,
        config::API_URL_VAR,
        coinflip_client::identity::USER_ID_VAR,
        coinflip_client::identity::USERNAME_VAR,
    );
    std::process::exit(0);
}

fn next_value(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<String> {
    args.next().ok_or_else(|| eyre!("{flag} requires an argument"))
}

fn parse_cli_args() -> Result<client::AppConfig> {
    let mut args = std::env::args().skip(1);
    let mut config_path: Option<String> = None;
    let mut api_url: Option<String> = None;
    let mut reveal_delay_ms: Option<u64> = None;
    let mut log_dir: Option<String> = None;
    let mut user_id: Option<u64> = None;
    let mut username: Option<String> = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => config_path = Some(next_value(&mut args, "--config")?),
            "--api-url" => api_url = Some(next_value(&mut args, "--api-url")?),
            "--reveal-delay-ms" => {
                let raw = next_value(&mut args, "--reveal-delay-ms")?;
                let ms = raw
                    .parse()
                    .map_err(|_| eyre!("--reveal-delay-ms expects milliseconds, got {raw}"))?;
                reveal_delay_ms = Some(ms);
            }
            "--log-dir" => log_dir = Some(next_value(&mut args, "--log-dir")?),
            "--user-id" => {
                let raw = next_value(&mut args, "--user-id")?;
                let id = raw
                    .parse()
                    .map_err(|_| eyre!("--user-id expects a number, got {raw}"))?;
                user_id = Some(id);
            }
            "--username" => username = Some(next_value(&mut args, "--username")?),
            "--help" | "-h" => print_usage_and_exit(),
            other => return Err(eyre!("Unknown argument: {other}")),
        }
    }

    let mut client = ClientConfig::load(config_path.as_deref())
        .wrap_err("loading configuration failed")?;
    client.apply_env(|key| std::env::var(key).ok());
    if let Some(url) = api_url {
        client.api_url = url;
    }
    if let Some(ms) = reveal_delay_ms {
        client.reveal_delay_ms = ms;
    }
    if let Some(dir) = log_dir {
        client.log_dir = dir;
    }
    client.validate()?;

    if username.is_some() && user_id.is_none() {
        return Err(eyre!("--username requires --user-id"));
    }
    let host_identity = user_id.map(|user_id| UserIdentity {
        user_id,
        display_name: username.unwrap_or_else(|| DEFAULT_DISPLAY_NAME.to_string()),
    });

    Ok(client::AppConfig {
        client,
        host_identity,
    })
}

fn init_tracing(log_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(log_dir)
        .wrap_err_with(|| format!("creating log directory {} failed", log_dir.display()))?;
    let appender = rolling::daily(log_dir, "coinflip.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let _ = LOG_GUARD.set(guard);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|e| eyre!("installing log subscriber failed: {e}"))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let app_config = parse_cli_args()?;
    init_tracing(&app_config.client.log_dir())?;
    tracing::info!("starting coinflip client");
    let local = tokio::task::LocalSet::new();
    local.run_until(client::run_app(app_config)).await
}
