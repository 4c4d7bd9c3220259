//! watch-sql - run SQL statements as watcher side effects.

mod cli;

use anyhow::Context;
use cli::Cli;
use std::time::Duration;
use tracing::{error, info};
use watch_sql::config::Settings;
use watch_sql::error::IntegrationError;
use watch_sql::integration::SqlIntegration;
use watch_sql::logging;

#[tokio::main]
async fn main() {
    // .env is optional
    let _ = dotenvy::dotenv();

    let cli = Cli::parse_args();
    if cli.log_file {
        logging::init_file_logging(&logging::get_log_path());
    } else {
        logging::init_stderr_logging();
    }

    if let Err(e) = run(cli).await {
        match e.downcast_ref::<IntegrationError>() {
            Some(err) => error!("{}: {:#}", err.category(), e),
            None => error!("{:#}", e),
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Precedence: CLI arguments, then config file, then environment
    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let mut settings = Settings::load_from_file(&config_path)?;
    settings.merge(&cli.to_settings());
    settings.apply_env_defaults();

    let integration = SqlIntegration::create(Some(settings.into_builder()?.build()))?;
    info!(
        "Connection: {}",
        integration.configuration().connection_string()
    );

    let timeout = cli.timeout.map(Duration::from_secs);
    if cli.execute {
        integration
            .execute(cli.query.as_deref(), None, timeout)
            .await
            .context("SQL statement failed")?;
        return Ok(());
    }

    let rows = integration
        .query::<serde_json::Value>(cli.query.as_deref(), None, timeout)
        .await
        .context("SQL query failed")?;
    for row in rows {
        println!("{row}");
    }
    Ok(())
}
