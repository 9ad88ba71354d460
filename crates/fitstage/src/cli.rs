use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "fitstage",
    author,
    version,
    about = "Fitness demo stage controller",
    arg_required_else_help = false
)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Stage configuration file or directory containing `stage.toml`.
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Length of each simulated clip (seconds or e.g. `8s`, `1m`).
    #[arg(long, value_name = "DURATION", value_parser = parse_duration, default_value = "12s")]
    pub clip_length: Duration,

    /// Interval between controller ticks in milliseconds.
    #[arg(long, value_name = "MILLISECONDS", default_value_t = 30)]
    pub tick_ms: u64,

    /// Skip backend notifications even when the config enables them.
    #[arg(long)]
    pub offline: bool,

    /// Make the raw rendition of the given exercise id refuse to play.
    #[arg(long = "reject-raw", value_name = "ID")]
    pub reject_raw: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the exercise catalog resolved from configuration.
    Catalog(CatalogArgs),
    /// Print the configuration path that would be loaded.
    Where,
}

#[derive(Parser, Debug)]
pub struct CatalogArgs {
    /// Emit JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_duration(value: &str) -> Result<Duration, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("duration must not be empty".to_string());
    }
    if let Ok(seconds) = trimmed.parse::<f64>() {
        if !seconds.is_finite() || seconds <= 0.0 {
            return Err(format!("duration '{trimmed}' must be positive"));
        }
        return Ok(Duration::from_secs_f64(seconds));
    }
    let parsed = humantime::parse_duration(trimmed)
        .map_err(|err| format!("invalid duration '{trimmed}': {err}"))?;
    if parsed.is_zero() {
        return Err(format!("duration '{trimmed}' must be positive"));
    }
    Ok(parsed)
}
