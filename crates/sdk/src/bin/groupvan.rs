//! `groupvan` command-line client
//!
//! - `groupvan token` prints a freshly issued client assertion with its
//!   decoded header and claims
//! - `groupvan get <path>` sends client assertions directly as the bearer
//!   token and prints the JSON response body; `--exchange` signs in at the
//!   token endpoint first

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use groupvan_domain::{ClientConfig, JwtMode, SignOutOptions};
use groupvan_infra::config;
use groupvan_infra::jwt::{decode_header, JwtIssuer};
use groupvan_sdk::{logging, GroupVan, RequestOptions};
use serde_json::json;

#[derive(Debug, Parser)]
#[command(name = "groupvan", version, about = "GroupVAN API client")]
struct Cli {
    /// Config file (TOML or JSON); defaults to the standard locations
    #[arg(long, env = "GROUPVAN_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Issue a client-assertion JWT and show its contents
    Token {
        /// Lifetime in seconds; defaults to the configured lifetime
        #[arg(long)]
        expires_in: Option<u64>,
    },
    /// Authenticated GET against an API path
    Get {
        /// Path relative to the base URL, e.g. `/catalogs`
        path: String,
        /// Query parameter as `key=value`; repeatable
        #[arg(long = "query", short = 'q', value_parser = parse_key_value)]
        query: Vec<(String, String)>,
        /// Trade the assertion for a session instead of sending it directly
        #[arg(long)]
        exchange: bool,
    },
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))
}

fn load_config(path: Option<PathBuf>) -> Result<ClientConfig> {
    let config = match path {
        Some(path) => {
            let from_file = config::load_from_file(Some(path))?;
            let merged = config::apply_env_overrides(from_file)?;
            config::validate(&merged)?;
            merged
        }
        None => config::load()?,
    };
    Ok(config)
}

fn print_token(config: &ClientConfig, expires_in: Option<u64>) -> Result<()> {
    let jwt = config.jwt.as_ref().ok_or_else(|| {
        anyhow!("no jwt section; set GROUPVAN_DEVELOPER_ID, GROUPVAN_KEY_ID, GROUPVAN_PRIVATE_KEY_PATH")
    })?;
    let issuer = JwtIssuer::new(jwt)?;
    let token = match expires_in {
        Some(secs) => issuer.issue_with_lifetime(Duration::from_secs(secs))?,
        None => issuer.issue()?,
    };

    let header = decode_header(&token)?;
    let claims = groupvan_core::auth::decode_unverified(&token)
        .context("issued token has no readable claims")?;
    println!("{token}");
    println!("{}", serde_json::to_string_pretty(&json!({ "header": header, "claims": claims }))?);
    Ok(())
}

async fn get(
    mut config: ClientConfig,
    path: &str,
    query: Vec<(String, String)>,
    exchange: bool,
) -> Result<()> {
    let jwt = config.jwt.as_mut().ok_or_else(|| {
        anyhow!("no jwt section; set GROUPVAN_DEVELOPER_ID, GROUPVAN_KEY_ID, GROUPVAN_PRIVATE_KEY_PATH")
    })?;
    jwt.mode = if exchange { JwtMode::Exchange } else { JwtMode::Direct };

    let groupvan = GroupVan::init(config).await?;
    if exchange {
        groupvan.sign_in_with_assertion().await.context("client-assertion sign-in failed")?;
    }

    let options = query.into_iter().fold(RequestOptions::new(), |options, (key, value)| {
        options.query(key, value)
    });
    let outcome = groupvan.get::<serde_json::Value>(path, options).await;

    if exchange {
        groupvan.sign_out(SignOutOptions::default()).await;
    }
    groupvan.dispose();

    let response = outcome?;
    tracing::info!(
        status = response.status(),
        correlation_id = %response.correlation_id(),
        attempts = response.response.attempts,
        "request completed"
    );
    println!("{}", serde_json::to_string_pretty(&response.data)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config)?;
    logging::init(&config.logging);

    match cli.command {
        Command::Token { expires_in } => print_token(&config, expires_in),
        Command::Get { path, query, exchange } => get(config, &path, query, exchange).await,
    }
}
