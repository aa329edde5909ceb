// listcheck - reconcile InvenTree part links against active eBay listings

mod exit_codes;
mod fetch;
mod recon;
mod stock;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use listcheck_recon::{ReconConfig, ReconError};

use exit_codes::{
    EXIT_IO, EXIT_RECON_INVALID_CONFIG, EXIT_RECON_SNAPSHOT, EXIT_SUCCESS, EXIT_USAGE,
};

/// Config file picked up from the working directory when `--config` is absent.
const DEFAULT_CONFIG_FILE: &str = "listcheck.toml";

fn long_version() -> &'static str {
    if cfg!(debug_assertions) {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("LISTCHECK_COMMIT"), ")",
            "\nengine:  listcheck-recon ", env!("CARGO_PKG_VERSION"),
            "\nbuild:   debug",
            "\ntarget:  ", env!("LISTCHECK_TARGET"),
        )
    } else {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("LISTCHECK_COMMIT"), ")",
            "\nengine:  listcheck-recon ", env!("CARGO_PKG_VERSION"),
            "\nbuild:   release",
            "\ntarget:  ", env!("LISTCHECK_TARGET"),
        )
    }
}

#[derive(Parser)]
#[command(name = "listcheck")]
#[command(about = "Check that inventory part links point at the right marketplace listings")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Config file (default: ./listcheck.toml when present, else built-in defaults)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log filter (error, warn, info, debug, trace or a RUST_LOG directive)
    #[arg(long, global = true, env = "RUST_LOG", default_value = "warn")]
    log_level: String,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pull parts or listings into JSON snapshot files
    #[command(subcommand)]
    Fetch(fetch::FetchCommands),

    /// Reconcile part links against active listings
    #[command(after_help = "\
Examples:
  listcheck run
  listcheck run --inventory stock_listings.json --listings active_listings.json
  listcheck run --json > report.json
  listcheck run --csv details.csv --output report.json
  listcheck run --fix-links")]
    Run {
        /// Inventory snapshot (default: fetch live from InvenTree)
        #[arg(long)]
        inventory: Option<PathBuf>,

        /// Listings snapshot (default: fetch live from eBay)
        #[arg(long)]
        listings: Option<PathBuf>,

        /// Output JSON to stdout instead of human summary
        #[arg(long)]
        json: bool,

        /// Write JSON report to file
        #[arg(long)]
        output: Option<PathBuf>,

        /// Write detail rows to a CSV file
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Update InvenTree part links that point at the wrong listing
        #[arg(long)]
        fix_links: bool,

        /// InvenTree API token (default: INVENTREE_TOKEN env)
        #[arg(long)]
        inventree_token: Option<String>,

        /// eBay Trading API user token (default: EBAY_TOKEN env)
        #[arg(long)]
        ebay_token: Option<String>,

        /// Suppress progress on stderr
        #[arg(long, short = 'q')]
        quiet: bool,
    },

    /// Physical stock checks against InvenTree
    #[command(subcommand)]
    Stock(stock::StockCommands),

    /// Config file utilities
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Parse and validate a config file without running
    #[command(after_help = "\
Examples:
  listcheck config validate
  listcheck config validate ebay-it.toml")]
    Validate {
        /// Config file (default: --config or ./listcheck.toml)
        file: Option<PathBuf>,
    },
}

fn init_logging(level: &str, json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_new(level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.log_level, cli.log_json);

    let config_path = cli.config;
    let result = match cli.command {
        Commands::Config(ConfigCommands::Validate { file }) => {
            cmd_config_validate(file.or(config_path))
        }
        Commands::Fetch(cmd) => {
            load_config(config_path.as_deref()).and_then(|config| fetch::cmd_fetch(&config, cmd))
        }
        Commands::Run {
            inventory,
            listings,
            json,
            output,
            csv,
            fix_links,
            inventree_token,
            ebay_token,
            quiet,
        } => load_config(config_path.as_deref()).and_then(|config| {
            recon::cmd_run(
                &config,
                recon::RunArgs {
                    inventory,
                    listings,
                    json,
                    output,
                    csv,
                    fix_links,
                    inventree_token,
                    ebay_token,
                    quiet,
                },
            )
        }),
        Commands::Stock(cmd) => {
            load_config(config_path.as_deref()).and_then(|config| stock::cmd_stock(&config, cmd))
        }
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

/// Explicit `--config` must exist; the implicit `./listcheck.toml` is optional.
fn load_config(path: Option<&Path>) -> Result<ReconConfig, CliError> {
    match path {
        Some(path) => {
            if !path.exists() {
                return Err(CliError::io(format!("config file not found: {}", path.display())));
            }
            tracing::debug!(path = %path.display(), "loading config");
            Ok(ReconConfig::from_file(path)?)
        }
        None => {
            let default = Path::new(DEFAULT_CONFIG_FILE);
            if default.exists() {
                tracing::debug!(path = DEFAULT_CONFIG_FILE, "loading config");
                Ok(ReconConfig::from_file(default)?)
            } else {
                tracing::debug!("no config file, using defaults");
                Ok(ReconConfig::default())
            }
        }
    }
}

fn cmd_config_validate(file: Option<PathBuf>) -> Result<(), CliError> {
    let path = file.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    let config = load_config(Some(&path))?;
    println!(
        "ok: {} (name: {}, identifier width: {})",
        path.display(),
        config.name,
        config.matching.identifier_width
    );
    if config.inventree.server.is_none() {
        eprintln!("note: [inventree] server is not set; live fetch and --fix-links are unavailable");
    }
    Ok(())
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO, message: msg.into(), hint: None }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self { code: EXIT_RECON_INVALID_CONFIG, message: msg.into(), hint: None }
    }

    pub fn snapshot(msg: impl Into<String>) -> Self {
        Self { code: EXIT_RECON_SNAPSHOT, message: msg.into(), hint: None }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<ReconError> for CliError {
    fn from(err: ReconError) -> Self {
        let message = err.to_string();
        match err {
            ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => Self::config(message),
            ReconError::SnapshotParse { .. } => Self::snapshot(message),
            ReconError::SnapshotWrite { .. } | ReconError::Io(_) => Self::io(message),
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}
