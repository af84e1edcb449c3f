mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use tracing::warn;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use accountmint_core::config::{AppConfig, MailApiConfig};

use crate::cli::{Cli, Commands};

fn main() -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async_main())
}

async fn async_main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config_str = std::fs::read_to_string(&cli.config).unwrap_or_else(|_| {
        warn!(path = %cli.config, "config file not found, using defaults");
        include_str!("../config/default.toml").to_string()
    });
    let mut config: AppConfig = toml::from_str(&config_str)?;

    apply_env_overrides(&mut config);

    match cli.command {
        Commands::Register {
            count,
            concurrency,
            visible,
        } => {
            commands::register::run(config, count, concurrency, visible).await?;
        }
        Commands::Accounts => {
            commands::accounts::run(config).await?;
        }
        Commands::TestMail => {
            commands::test_mail::run(config).await?;
        }
    }

    Ok(())
}

/// Environment overrides for deployment tuning; the config file stays the
/// source of defaults.
fn apply_env_overrides(config: &mut AppConfig) {
    if let Ok(v) = std::env::var("MAX_CONCURRENT") {
        if let Some(n) = v.parse::<usize>().ok().filter(|&n| n > 0 && n <= 16) {
            config.batch.max_concurrent = n;
        }
    }
    if let Ok(v) = std::env::var("SIGNUP_URL") {
        if !v.is_empty() {
            config.signup.url = v;
        }
    }
    if let Ok(v) = std::env::var("ACCOUNTS_FILE") {
        if !v.is_empty() {
            config.store.accounts_file = v;
        }
    }
    if let Ok(v) = std::env::var("HEADLESS") {
        config.browser.headless = v != "0" && v.to_lowercase() != "false";
    }

    // The mailbox API can be configured entirely from the environment, which
    // keeps admin credentials out of the config file.
    let server_url = std::env::var("MAIL_API_URL").ok().filter(|v| !v.is_empty());
    if let Some(server_url) = server_url {
        let admin_email = std::env::var("MAIL_API_ADMIN_EMAIL").unwrap_or_default();
        let admin_password = std::env::var("MAIL_API_ADMIN_PASSWORD").unwrap_or_default();
        let email_domain = std::env::var("MAIL_API_DOMAIN").unwrap_or_default();
        config.mail_api = Some(MailApiConfig {
            server_url,
            admin_email,
            admin_password,
            email_domain,
        });
    }
}
