//! Command-line argument parsing for watch-sql.

use clap::Parser;
use std::path::PathBuf;
use watch_sql::config::Settings;
use watch_sql::db::{Parameters, Value};

/// Run a SQL statement the way a watcher integration would.
#[derive(Parser, Debug)]
#[command(name = "watch-sql")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Connection string (postgres://..., sqlite:..., or "Server=...;Database=...")
    #[arg(value_name = "CONNECTION_STRING")]
    pub connection_string: Option<String>,

    /// SQL to run (overrides the configured query)
    #[arg(short = 'q', long, value_name = "SQL")]
    pub query: Option<String>,

    /// Bind parameter as name=value; repeatable
    #[arg(short = 'P', long = "param", value_name = "NAME=VALUE", value_parser = parse_param)]
    pub params: Vec<(String, Value)>,

    /// Query timeout in seconds
    #[arg(short = 't', long, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Run the statement for its effect and print nothing
    #[arg(short = 'x', long)]
    pub execute: bool,

    /// Config file path
    #[arg(long, value_name = "PATH", env = "WATCH_SQL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Write logs to a file instead of stderr
    #[arg(long)]
    pub log_file: bool,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path (CLI arg or default).
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Settings::default_path)
    }

    /// Settings given on the command line. Parameters are only set when at
    /// least one `--param` was passed.
    pub fn to_settings(&self) -> Settings {
        Settings {
            connection_string: self.connection_string.clone(),
            query: None,
            timeout_secs: None,
            parameters: self.params.iter().cloned().collect::<Parameters>(),
        }
    }
}

fn parse_param(s: &str) -> Result<(String, Value), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("Invalid parameter '{s}'. Expected NAME=VALUE"))?;
    let name = name.trim().trim_start_matches('@');
    if name.is_empty() {
        return Err(format!("Invalid parameter '{s}'. Name is empty"));
    }
    Ok((name.to_string(), Value::parse_literal(value)))
}
